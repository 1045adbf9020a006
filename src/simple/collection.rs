// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use super::backend::CollectionBackend;
use crate::error::Error;

use std::collections::HashMap;
use tracing::{debug, warn};
use zeroize::{Zeroize, Zeroizing};

/// Secrets fetched through one handle, keyed by item path.
#[derive(Default)]
struct SecretCache {
    entries: HashMap<String, Zeroizing<Vec<u8>>>,
    /// Contents of each secret right after it was wiped.
    #[cfg(test)]
    wiped: std::rc::Rc<std::cell::RefCell<Vec<Vec<u8>>>>,
}

impl SecretCache {
    /// Stores `secret` for `item`, zeroizing whatever was cached for it before.
    fn insert(&mut self, item: &str, secret: Zeroizing<Vec<u8>>) -> &[u8] {
        self.entries.insert(item.to_owned(), secret);
        &self.entries[item]
    }

    fn evict(&mut self, item: &str) {
        self.entries.remove(item);
    }

    /// Overwrites every cached secret with zeros, in place.
    fn wipe(&mut self) {
        for secret in self.entries.values_mut() {
            secret.as_mut_slice().zeroize();
            #[cfg(test)]
            self.wiped.borrow_mut().push(secret.to_vec());
        }
    }

    fn clear(&mut self) {
        self.wipe();
        self.entries.clear();
    }
}

/// A handle on one collection, with its own connection and session.
///
/// Obtained from [super::SimpleService]. Items are identified by their object path strings as
/// returned from [SimpleCollection::create_item] and [SimpleCollection::get_items].
///
/// Secrets returned by [SimpleCollection::get_secret] are borrowed from the handle. When the
/// handle is closed or dropped they are overwritten with zeros and the session is closed.
pub struct SimpleCollection {
    backend: Box<dyn CollectionBackend>,
    secrets: SecretCache,
    closed: bool,
}

impl SimpleCollection {
    pub(crate) fn new(backend: Box<dyn CollectionBackend>) -> Self {
        SimpleCollection {
            backend,
            secrets: SecretCache::default(),
            closed: false,
        }
    }

    /// Wraps `backend`, unlocking the collection first.
    pub(crate) fn open(backend: Box<dyn CollectionBackend>) -> Result<Self, Error> {
        let collection = Self::new(backend);
        collection.ensure_unlocked()?;
        Ok(collection)
    }

    /// Whether this handle is on the user's default collection.
    pub fn is_default(&self) -> bool {
        self.backend.is_default()
    }

    pub fn is_locked(&self) -> Result<bool, Error> {
        self.backend.is_locked()
    }

    pub fn lock(&self) -> Result<(), Error> {
        debug!("lock collection");
        self.backend.lock()
    }

    /// Unlocks the collection, with its passphrase when it has one, otherwise through a prompt.
    pub fn unlock(&self) -> Result<(), Error> {
        debug!("unlock collection");
        self.backend.unlock()
    }

    /// Stores a new item and returns its path.
    pub fn create_item(&self, label: &str, secret: impl AsRef<[u8]>) -> Result<String, Error> {
        self.create_item_with_attributes(label, secret, HashMap::new())
    }

    /// Stores a new item with lookup attributes and returns its path.
    pub fn create_item_with_attributes(
        &self,
        label: &str,
        secret: impl AsRef<[u8]>,
        attributes: HashMap<&str, &str>,
    ) -> Result<String, Error> {
        self.ensure_unlocked()?;
        let item = self
            .backend
            .create_item(label, secret.as_ref(), attributes)?;
        debug!(item = %item, label, "created item");

        Ok(item)
    }

    /// Paths of the items whose attributes include all of `attributes`.
    ///
    /// Empty when nothing matches or the collection no longer exists.
    pub fn get_items(&self, attributes: HashMap<&str, &str>) -> Result<Vec<String>, Error> {
        let items = self.backend.search_items(attributes)?;
        debug!(count = items.len(), "searched items");

        Ok(items)
    }

    /// The secret of `item`, or `None` if there is no such item in this collection.
    pub fn get_secret(&mut self, item: &str) -> Result<Option<&[u8]>, Error> {
        debug!(item, "get secret");
        self.ensure_unlocked()?;
        match self.backend.get_secret(item)? {
            Some(secret) => Ok(Some(self.secrets.insert(item, secret))),
            None => {
                self.secrets.evict(item);
                Ok(None)
            }
        }
    }

    pub fn get_label(&self, item: &str) -> Result<Option<String>, Error> {
        self.backend.get_label(item)
    }

    pub fn get_attributes(&self, item: &str) -> Result<Option<HashMap<String, String>>, Error> {
        self.backend.get_attributes(item)
    }

    /// Replaces the given parts of `item`. Parts passed as `None` are left as they are.
    ///
    /// Fails with [Error::NoResult] if there is no such item in this collection.
    pub fn update_item(
        &mut self,
        item: &str,
        label: Option<&str>,
        secret: Option<&[u8]>,
        attributes: Option<HashMap<&str, &str>>,
    ) -> Result<(), Error> {
        debug!(item, "update item");
        self.ensure_unlocked()?;
        self.secrets.evict(item);
        if self.backend.update_item(item, label, secret, attributes)? {
            Ok(())
        } else {
            Err(Error::NoResult)
        }
    }

    /// Deletes `item`. Deleting an item that does not exist succeeds.
    pub fn delete_item(&mut self, item: &str) -> Result<(), Error> {
        debug!(item, "delete item");
        self.ensure_unlocked()?;
        self.secrets.evict(item);
        self.backend.delete_item(item)
    }

    /// Deletes the collection with all of its items.
    ///
    /// The default collection is never deleted through this API.
    pub fn delete(&mut self) -> Result<(), Error> {
        if self.backend.is_default() {
            return Err(Error::DefaultCollection);
        }

        debug!("delete collection");
        self.ensure_unlocked()?;
        self.secrets.clear();
        self.backend.delete()
    }

    /// Wipes the secrets fetched so far. The handle stays usable.
    pub fn clear(&mut self) {
        self.secrets.clear();
    }

    /// Wipes fetched secrets and closes the session, reporting a failure to close.
    ///
    /// Dropping the handle does the same and only logs failures.
    pub fn close(mut self) -> Result<(), Error> {
        self.release()
    }

    fn release(&mut self) -> Result<(), Error> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.secrets.clear();
        self.backend.close()
    }

    fn ensure_unlocked(&self) -> Result<(), Error> {
        match self.backend.is_locked() {
            Ok(false) => Ok(()),
            Ok(true) => {
                debug!("collection is locked, unlocking");
                self.backend.unlock()?;
                if self.backend.is_locked()? {
                    Err(Error::Locked)
                } else {
                    Ok(())
                }
            }
            // nothing to unlock; the operation itself reports the absence
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(err),
        }
    }
}

impl Drop for SimpleCollection {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            warn!(%err, "failed to close secret service session");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::simple::memory::{MemoryCollection, State, COLLECTION_PATH};

    use std::cell::RefCell;
    use std::rc::Rc;

    fn open() -> (SimpleCollection, Rc<RefCell<State>>) {
        let (backend, state) = MemoryCollection::new();
        (SimpleCollection::open(Box::new(backend)).unwrap(), state)
    }

    #[test]
    fn should_store_and_read_back_item() {
        let (mut collection, _) = open();

        let item = collection.create_item("My Item", "secret").unwrap();
        assert_eq!(collection.get_secret(&item).unwrap(), Some(&b"secret"[..]));
        assert_eq!(collection.get_label(&item).unwrap().as_deref(), Some("My Item"));
        assert_eq!(collection.get_attributes(&item).unwrap(), Some(HashMap::new()));

        collection.delete_item(&item).unwrap();
        assert_eq!(collection.get_secret(&item).unwrap(), None);
        assert_eq!(collection.get_label(&item).unwrap(), None);
    }

    #[test]
    fn should_find_item_by_attributes() {
        let (mut collection, _) = open();
        let attributes = HashMap::from([("uuid", "42")]);

        collection
            .create_item_with_attributes("My Item", "secret", attributes.clone())
            .unwrap();
        collection
            .create_item_with_attributes("Other", "other", HashMap::from([("uuid", "43")]))
            .unwrap();

        let items = collection.get_items(attributes).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];

        assert_eq!(collection.get_secret(item).unwrap(), Some(&b"secret"[..]));
        assert_eq!(collection.get_label(item).unwrap().as_deref(), Some("My Item"));
        let stored = collection.get_attributes(item).unwrap().unwrap();
        assert_eq!(stored.get("uuid").map(String::as_str), Some("42"));

        collection.delete_item(item).unwrap();
        assert!(collection
            .get_items(HashMap::from([("uuid", "42")]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn should_match_attribute_superset() {
        let (collection, _) = open();
        let item = collection
            .create_item_with_attributes(
                "My Item",
                "secret",
                HashMap::from([("uuid", "42"), ("service", "mail")]),
            )
            .unwrap();

        assert_eq!(
            collection.get_items(HashMap::from([("service", "mail")])).unwrap(),
            vec![item.clone()]
        );
        assert_eq!(collection.get_items(HashMap::new()).unwrap(), vec![item]);
        assert!(collection
            .get_items(HashMap::from([("service", "mail"), ("uuid", "7")]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn should_treat_unknown_items_as_absent() {
        let (mut collection, _) = open();
        let unknown = format!("{COLLECTION_PATH}/999");

        assert_eq!(collection.get_secret(&unknown).unwrap(), None);
        assert_eq!(collection.get_label(&unknown).unwrap(), None);
        assert_eq!(collection.get_attributes(&unknown).unwrap(), None);
        collection.delete_item(&unknown).unwrap();
        assert!(matches!(
            collection.update_item(&unknown, Some("label"), None, None),
            Err(Error::NoResult)
        ));
    }

    #[test]
    fn should_update_item() {
        let (mut collection, state) = open();
        let item = collection
            .create_item_with_attributes("My Item", "secret", HashMap::from([("uuid", "42")]))
            .unwrap();
        assert_eq!(collection.get_secret(&item).unwrap(), Some(&b"secret"[..]));

        collection
            .update_item(
                &item,
                None,
                Some(&b"changed"[..]),
                Some(HashMap::from([("uuid", "43")])),
            )
            .unwrap();

        assert_eq!(collection.get_secret(&item).unwrap(), Some(&b"changed"[..]));
        assert_eq!(collection.get_label(&item).unwrap().as_deref(), Some("My Item"));
        assert_eq!(state.borrow().items[&item].attributes["uuid"], "43");
    }

    #[test]
    fn should_delete_collection_with_items() {
        let (mut collection, state) = open();
        let item = collection
            .create_item_with_attributes("My Item", "secret", HashMap::from([("uuid", "42")]))
            .unwrap();
        collection.get_secret(&item).unwrap();

        collection.delete().unwrap();

        assert!(state.borrow().deleted);
        assert!(collection.secrets.entries.is_empty());
        assert!(collection
            .get_items(HashMap::from([("uuid", "42")]))
            .unwrap()
            .is_empty());
        assert_eq!(collection.get_secret(&item).unwrap(), None);
        assert_eq!(collection.get_label(&item).unwrap(), None);
    }

    #[test]
    fn should_refuse_to_delete_default_collection() {
        let (backend, state) = MemoryCollection::new();
        state.borrow_mut().is_default = true;
        let mut collection = SimpleCollection::open(Box::new(backend)).unwrap();

        assert!(collection.is_default());
        assert!(matches!(collection.delete(), Err(Error::DefaultCollection)));
        assert!(!state.borrow().deleted);
    }

    #[test]
    fn should_unlock_on_open_and_before_writing() {
        let (backend, state) = MemoryCollection::new();
        state.borrow_mut().locked = true;

        let collection = SimpleCollection::open(Box::new(backend)).unwrap();
        assert_eq!(state.borrow().unlocks, 1);
        assert!(!collection.is_locked().unwrap());

        collection.lock().unwrap();
        collection.create_item("My Item", "secret").unwrap();
        assert_eq!(state.borrow().unlocks, 2);

        // no unlock needed while it stays unlocked
        collection.create_item("Other", "secret").unwrap();
        assert_eq!(state.borrow().unlocks, 2);
    }

    #[test]
    fn should_fail_when_unlock_is_refused() {
        let (backend, state) = MemoryCollection::new();
        {
            let mut state = state.borrow_mut();
            state.locked = true;
            state.refuse_unlock = true;
        }

        assert!(matches!(
            SimpleCollection::open(Box::new(backend)),
            Err(Error::Prompt)
        ));
        // the handle was still released
        assert_eq!(state.borrow().closes, 1);
    }

    #[test]
    fn should_propagate_service_failures() {
        let (mut collection, state) = open();
        let item = collection.create_item("My Item", "secret").unwrap();
        state.borrow_mut().broken = true;

        assert!(matches!(collection.get_items(HashMap::new()), Err(Error::Zbus(_))));
        assert!(matches!(collection.get_secret(&item), Err(Error::Zbus(_))));
        assert!(matches!(collection.get_label(&item), Err(Error::Zbus(_))));
        assert!(matches!(collection.create_item("x", "y"), Err(Error::Zbus(_))));
    }

    #[test]
    fn should_zero_cached_secrets_in_place() {
        let mut cache = SecretCache::default();
        cache.insert("a", Zeroizing::new(b"secret".to_vec()));
        cache.insert("b", Zeroizing::new(b"super secret".to_vec()));

        cache.wipe();

        assert_eq!(cache.entries["a"].as_slice(), &[0u8; 6]);
        assert_eq!(cache.entries["b"].as_slice(), &[0u8; 12]);
    }

    #[test]
    fn should_replace_cached_secret_on_refetch() {
        let mut cache = SecretCache::default();
        cache.insert("a", Zeroizing::new(b"old".to_vec()));
        assert_eq!(cache.insert("a", Zeroizing::new(b"new".to_vec())), b"new");
        assert_eq!(cache.entries.len(), 1);
    }

    #[test]
    fn should_wipe_secrets_on_clear() {
        let (mut collection, _) = open();
        let item = collection.create_item("My Item", "secret").unwrap();
        collection.get_secret(&item).unwrap();
        assert_eq!(collection.secrets.entries.len(), 1);

        collection.clear();
        assert!(collection.secrets.entries.is_empty());

        // still usable
        assert_eq!(collection.get_secret(&item).unwrap(), Some(&b"secret"[..]));
    }

    #[test]
    fn should_zero_fetched_secrets_when_released() {
        for close in [true, false] {
            let (mut collection, _) = open();
            let wiped = collection.secrets.wiped.clone();
            for (label, secret) in [("a", "secret"), ("b", "super secret")] {
                let item = collection.create_item(label, secret).unwrap();
                collection.get_secret(&item).unwrap();
            }
            assert!(wiped.borrow().is_empty());

            if close {
                collection.close().unwrap();
            } else {
                drop(collection);
            }

            let mut lengths: Vec<_> = wiped.borrow().iter().map(Vec::len).collect();
            lengths.sort_unstable();
            assert_eq!(lengths, [6, 12]);
            assert!(wiped.borrow().iter().flatten().all(|&byte| byte == 0));
        }
    }

    #[test]
    fn should_release_once_on_close_or_drop() {
        let (collection, state) = open();
        collection.close().unwrap();
        assert_eq!(state.borrow().closes, 1);

        let (mut collection, state) = open();
        let item = collection.create_item("My Item", "secret").unwrap();
        collection.get_secret(&item).unwrap();
        drop(collection);
        assert_eq!(state.borrow().closes, 1);
    }
}
