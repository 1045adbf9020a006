// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use super::item::Item;
use crate::error::Error;
use crate::proxy::collection::CollectionProxyBlocking;
use crate::proxy::keyring::KeyringProxyBlocking;
use crate::proxy::service::ServiceProxyBlocking;
use crate::session::Session;
use crate::ss::{CONTENT_TYPE_TEXT, SS_DBUS_NAME, SS_ITEM_ATTRIBUTES, SS_ITEM_LABEL};
use crate::util::{
    bounded, exec_prompt_blocking, format_secret, is_no_object, lock_or_unlock_blocking,
    LockAction,
};

use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use zbus::{
    zvariant::{Dict, OwnedObjectPath, Value},
    proxy::CacheProperties,
};

// Collection struct.
// Should always be created from the SecretService entry point,
// whether through a new collection or a collection search
pub struct Collection<'a> {
    conn: zbus::blocking::Connection,
    session: &'a Session,
    pub collection_path: OwnedObjectPath,
    collection_proxy: CollectionProxyBlocking<'a>,
    service_proxy: &'a ServiceProxyBlocking<'a>,
    prompt_timeout: Duration,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(
        conn: zbus::blocking::Connection,
        session: &'a Session,
        service_proxy: &'a ServiceProxyBlocking,
        collection_path: OwnedObjectPath,
        prompt_timeout: Duration,
    ) -> Result<Self, Error> {
        let collection_proxy = CollectionProxyBlocking::builder(&conn)
            .destination(SS_DBUS_NAME)?
            .path(collection_path.clone())?
            .cache_properties(CacheProperties::No)
            .build()?;
        Ok(Collection {
            conn,
            session,
            collection_path,
            collection_proxy,
            service_proxy,
            prompt_timeout,
        })
    }

    pub fn is_locked(&self) -> Result<bool, Error> {
        Ok(self.collection_proxy.locked()?)
    }

    pub fn ensure_unlocked(&self) -> Result<(), Error> {
        if self.is_locked()? {
            Err(Error::Locked)
        } else {
            Ok(())
        }
    }

    pub fn unlock(&self) -> Result<(), Error> {
        lock_or_unlock_blocking(
            self.conn.clone(),
            self.service_proxy,
            &self.collection_path,
            LockAction::Unlock,
            self.prompt_timeout,
        )
    }

    /// Unlocks the collection with its password instead of prompting the user.
    ///
    /// This uses gnome-keyring's master password interface. Providers without it answer with an
    /// error for which [Error::is_unsupported] is true.
    pub fn unlock_with_password(&self, password: &[u8]) -> Result<(), Error> {
        let master = format_secret(self.session, password, CONTENT_TYPE_TEXT)?;
        let keyring_proxy = KeyringProxyBlocking::new(&self.conn)?;
        bounded(
            keyring_proxy.unlock_with_master_password(&self.collection_path, master),
            self.prompt_timeout,
        )?;
        debug!(collection = %self.collection_path.as_str(), "unlocked with master password");

        Ok(())
    }

    pub fn lock(&self) -> Result<(), Error> {
        lock_or_unlock_blocking(
            self.conn.clone(),
            self.service_proxy,
            &self.collection_path,
            LockAction::Lock,
            self.prompt_timeout,
        )
    }

    /// Deletes dbus object, but struct instance still exists (current implementation)
    pub fn delete(&self) -> Result<(), Error> {
        // ensure_unlocked handles prompt for unlocking if necessary
        self.ensure_unlocked()?;
        let prompt_path = self.collection_proxy.delete()?;

        // "/" means no prompt necessary
        if !is_no_object(&prompt_path) {
            exec_prompt_blocking(self.conn.clone(), &prompt_path, self.prompt_timeout)?;
        }
        debug!(collection = %self.collection_path.as_str(), "deleted collection");

        Ok(())
    }

    pub fn get_all_items(&self) -> Result<Vec<Item>, Error> {
        let item_paths = self.collection_proxy.items()?;
        self.items_at(item_paths)
    }

    pub fn search_items(&self, attributes: HashMap<&str, &str>) -> Result<Vec<Item>, Error> {
        let item_paths = self.collection_proxy.search_items(attributes)?;
        self.items_at(item_paths)
    }

    fn items_at(&self, item_paths: Vec<OwnedObjectPath>) -> Result<Vec<Item>, Error> {
        item_paths
            .into_iter()
            .map(|item_path| {
                Item::new(
                    self.conn.clone(),
                    self.session,
                    self.service_proxy,
                    item_path,
                    self.prompt_timeout,
                )
            })
            .collect()
    }

    pub fn get_label(&self) -> Result<String, Error> {
        Ok(self.collection_proxy.label()?)
    }

    pub fn set_label(&self, new_label: &str) -> Result<(), Error> {
        Ok(self.collection_proxy.set_label(new_label)?)
    }

    pub fn create_item(
        &self,
        label: &str,
        attributes: HashMap<&str, &str>,
        secret: &[u8],
        replace: bool,
        content_type: &str,
    ) -> Result<Item, Error> {
        let secret_struct = format_secret(self.session, secret, content_type)?;

        let mut properties: HashMap<&str, Value> = HashMap::new();
        let attributes: Dict = attributes.into();

        properties.insert(SS_ITEM_LABEL, label.into());
        properties.insert(SS_ITEM_ATTRIBUTES, attributes.into());

        let created_item = self
            .collection_proxy
            .create_item(properties, secret_struct, replace)?;

        // Get path of created object
        let created_path = created_item.item;

        // Check if that path is "/", if so should execute a prompt
        let item_path = if is_no_object(&created_path) {
            let prompt_path = created_item.prompt;

            // Exec prompt and parse result
            let prompt_res =
                exec_prompt_blocking(self.conn.clone(), &prompt_path, self.prompt_timeout)?;
            OwnedObjectPath::try_from(prompt_res)?
        } else {
            // if not, just return created path
            created_path
        };
        debug!(item = %item_path.as_str(), "created item");

        Item::new(
            self.conn.clone(),
            self.session,
            self.service_proxy,
            item_path,
            self.prompt_timeout,
        )
    }
}

#[cfg(test)]
mod test {
    use crate::blocking::*;

    const COLLECTION_LABEL: &str = "Blocking Test Collection";

    fn connect() -> SecretService<'static> {
        SecretService::connect(EncryptionType::Plain).unwrap()
    }

    #[test_with::env(SECRET_SERVICE_LIVE_TESTS)]
    #[test]
    fn should_report_lock_state_of_default_collection() {
        let ss = connect();
        let collection = ss.get_default_collection().unwrap();
        let locked = collection.is_locked().unwrap();
        assert_eq!(collection.ensure_unlocked().is_err(), locked);
    }

    #[test_with::env(SECRET_SERVICE_LIVE_TESTS)]
    #[test]
    fn should_find_created_item_by_attributes_only() {
        let ss = connect();
        let collection = ss.get_default_collection().unwrap();
        let attributes = HashMap::from([("blocking_collection_search", "present")]);
        let item = collection
            .create_item("search me", attributes.clone(), b"hidden", false, "text/plain")
            .unwrap();

        let all = collection.get_all_items().unwrap();
        assert!(all.iter().any(|other| other.item_path == item.item_path));

        let missing = collection
            .search_items(HashMap::from([("blocking_collection_search", "absent")]))
            .unwrap();
        assert!(missing.is_empty());

        let hits = collection.search_items(attributes).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item_path, item.item_path);

        item.delete().unwrap();
    }

    #[test]
    #[ignore] // prompts for the collection password
    fn should_lock_unlock_and_relabel_new_collection() {
        let ss = connect();
        let collection = ss.create_collection(COLLECTION_LABEL, "").unwrap();
        assert_eq!(collection.get_label().unwrap(), COLLECTION_LABEL);

        collection.set_label("Relabelled Test Collection").unwrap();
        assert_eq!(collection.get_label().unwrap(), "Relabelled Test Collection");

        collection.lock().unwrap();
        assert!(matches!(collection.ensure_unlocked(), Err(Error::Locked)));
        collection.unlock().unwrap();
        assert!(!collection.is_locked().unwrap());

        let path = collection.collection_path.clone();
        collection.delete().unwrap();
        let remaining = ss.get_all_collections().unwrap();
        assert!(remaining.iter().all(|other| other.collection_path != path));
    }
}
