// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use crate::blocking::{Collection, Item, SecretService};
use crate::error::Error;
use crate::ss::CONTENT_TYPE_TEXT;

use std::collections::HashMap;
use tracing::warn;
use zbus::zvariant::{ObjectPath, OwnedObjectPath};
use zeroize::Zeroizing;

/// The collection operations a [super::SimpleCollection] is built on.
///
/// Items are addressed by their object path. Lookups return `Ok(None)` when `item` names
/// nothing in this collection.
pub(crate) trait CollectionBackend {
    fn is_default(&self) -> bool;

    fn is_locked(&self) -> Result<bool, Error>;

    fn unlock(&self) -> Result<(), Error>;

    fn lock(&self) -> Result<(), Error>;

    fn create_item(
        &self,
        label: &str,
        secret: &[u8],
        attributes: HashMap<&str, &str>,
    ) -> Result<String, Error>;

    fn search_items(&self, attributes: HashMap<&str, &str>) -> Result<Vec<String>, Error>;

    fn get_secret(&self, item: &str) -> Result<Option<Zeroizing<Vec<u8>>>, Error>;

    fn get_label(&self, item: &str) -> Result<Option<String>, Error>;

    fn get_attributes(&self, item: &str) -> Result<Option<HashMap<String, String>>, Error>;

    /// Returns `false` when there was no such item to update.
    fn update_item(
        &self,
        item: &str,
        label: Option<&str>,
        secret: Option<&[u8]>,
        attributes: Option<HashMap<&str, &str>>,
    ) -> Result<bool, Error>;

    fn delete_item(&self, item: &str) -> Result<(), Error>;

    fn delete(&self) -> Result<(), Error>;

    /// Ends the session. Called once, when the handle is released.
    fn close(&mut self) -> Result<(), Error>;
}

/// A collection reached over dbus, with a connection and session of its own.
pub(crate) struct DbusCollection {
    service: SecretService<'static>,
    collection_path: OwnedObjectPath,
    passphrase: Option<Zeroizing<Vec<u8>>>,
    is_default: bool,
}

impl DbusCollection {
    pub(crate) fn new(
        service: SecretService<'static>,
        collection_path: OwnedObjectPath,
        passphrase: Option<&str>,
        is_default: bool,
    ) -> Self {
        DbusCollection {
            service,
            collection_path,
            passphrase: passphrase.map(|p| Zeroizing::new(p.as_bytes().to_vec())),
            is_default,
        }
    }

    fn collection(&self) -> Result<Collection<'_>, Error> {
        self.service.collection_at(self.collection_path.clone())
    }

    fn item(&self, item: &str) -> Result<Option<Item<'_>>, Error> {
        match ObjectPath::try_from(item) {
            Ok(path) if is_item_of(self.collection_path.as_str(), path.as_str()) => {
                self.service.item_at(path.into()).map(Some)
            }
            _ => Ok(None),
        }
    }
}

impl CollectionBackend for DbusCollection {
    fn is_default(&self) -> bool {
        self.is_default
    }

    fn is_locked(&self) -> Result<bool, Error> {
        let path = self.collection_path.as_str();
        match found(self.collection()?.is_locked(), path)? {
            Some(locked) => Ok(locked),
            None => Err(zbus::fdo::Error::UnknownObject(path.to_owned()).into()),
        }
    }

    fn unlock(&self) -> Result<(), Error> {
        let collection = self.collection()?;
        if let Some(passphrase) = &self.passphrase {
            match collection.unlock_with_password(passphrase) {
                Err(err) if err.is_unsupported() => {
                    warn!(%err, "master password unlock unsupported, prompting instead");
                }
                res => return res,
            }
        }

        collection.unlock()
    }

    fn lock(&self) -> Result<(), Error> {
        self.collection()?.lock()
    }

    fn create_item(
        &self,
        label: &str,
        secret: &[u8],
        attributes: HashMap<&str, &str>,
    ) -> Result<String, Error> {
        let collection = self.collection()?;
        let item = collection.create_item(label, attributes, secret, false, CONTENT_TYPE_TEXT)?;

        Ok(item.item_path.as_str().to_owned())
    }

    fn search_items(&self, attributes: HashMap<&str, &str>) -> Result<Vec<String>, Error> {
        let collection = self.collection()?;
        let items = found(
            collection.search_items(attributes),
            self.collection_path.as_str(),
        )?
        .unwrap_or_default();

        Ok(items
            .iter()
            .map(|item| item.item_path.as_str().to_owned())
            .collect())
    }

    fn get_secret(&self, item: &str) -> Result<Option<Zeroizing<Vec<u8>>>, Error> {
        match self.item(item)? {
            Some(item) => found(item.get_secret().map(Zeroizing::new), item.item_path.as_str()),
            None => Ok(None),
        }
    }

    fn get_label(&self, item: &str) -> Result<Option<String>, Error> {
        match self.item(item)? {
            Some(item) => found(item.get_label(), item.item_path.as_str()),
            None => Ok(None),
        }
    }

    fn get_attributes(&self, item: &str) -> Result<Option<HashMap<String, String>>, Error> {
        match self.item(item)? {
            Some(item) => found(item.get_attributes(), item.item_path.as_str()),
            None => Ok(None),
        }
    }

    fn update_item(
        &self,
        item: &str,
        label: Option<&str>,
        secret: Option<&[u8]>,
        attributes: Option<HashMap<&str, &str>>,
    ) -> Result<bool, Error> {
        let Some(item) = self.item(item)? else {
            return Ok(false);
        };

        let update = || -> Result<(), Error> {
            if let Some(label) = label {
                item.set_label(label)?;
            }
            if let Some(attributes) = attributes {
                item.set_attributes(attributes)?;
            }
            if let Some(secret) = secret {
                item.set_secret(secret, CONTENT_TYPE_TEXT)?;
            }
            Ok(())
        };

        Ok(found(update(), item.item_path.as_str())?.is_some())
    }

    fn delete_item(&self, item: &str) -> Result<(), Error> {
        match self.item(item)? {
            Some(item) => found(item.delete(), item.item_path.as_str()).map(drop),
            None => Ok(()),
        }
    }

    fn delete(&self) -> Result<(), Error> {
        found(self.collection()?.delete(), self.collection_path.as_str()).map(drop)
    }

    fn close(&mut self) -> Result<(), Error> {
        self.service.close()
    }
}

/// Maps replies saying there is no object at `path` to `Ok(None)`.
fn found<T>(res: Result<T, Error>, path: &str) -> Result<Option<T>, Error> {
    match res {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_missing_object(path) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Whether `item` is an object path directly below `collection`.
fn is_item_of(collection: &str, item: &str) -> bool {
    item.strip_prefix(collection)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty() && !name.contains('/'))
}
