// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The simple API: one handle per collection, secrets wiped when it goes away.
//!
//! [SimpleService] connects to a collection and hands out a [SimpleCollection]. Every handle
//! opens its own dbus connection and session, so handles on different threads don't share any
//! prompt or session state.

use crate::blocking::SecretService;
use crate::{Config, Error};

use tracing::{debug, warn};
use zbus::zvariant::OwnedObjectPath;

mod backend;
mod collection;
#[cfg(test)]
mod memory;

use backend::DbusCollection;
pub use collection::SimpleCollection;

/// Entry point of the simple API.
#[derive(Debug, Clone, Default)]
pub struct SimpleService {
    config: Config,
}

impl SimpleService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        SimpleService { config }
    }

    /// Whether a secret service provider is running on the session bus.
    pub fn is_available() -> bool {
        SecretService::is_available()
    }

    /// Connects to the user's default collection, unlocking it if needed.
    ///
    /// Unlocking may prompt the user. Fails if the service can't be reached or the prompt is
    /// dismissed or times out.
    pub fn connect(&self) -> Result<SimpleCollection, Error> {
        let service = SecretService::connect_with(&self.config)?;
        let collection_path = service.get_default_collection()?.collection_path;
        debug!(collection = %collection_path.as_str(), "connecting to default collection");

        SimpleCollection::open(Box::new(DbusCollection::new(
            service,
            collection_path,
            None,
            true,
        )))
    }

    /// Connects to the collection labelled `name`, creating it if there is none.
    ///
    /// `passphrase` protects a newly created collection and unlocks an existing one. Providers
    /// that can't take a password from the caller prompt the user instead.
    pub fn connect_to(&self, name: &str, passphrase: &str) -> Result<SimpleCollection, Error> {
        let service = SecretService::connect_with(&self.config)?;
        let collection_path = match service.get_collection_by_label(name) {
            Ok(collection) => collection.collection_path,
            Err(Error::NoResult) => create_collection(&service, name, passphrase)?,
            Err(err) => return Err(err),
        };
        let is_default = service
            .get_default_collection()
            .is_ok_and(|default| default.collection_path == collection_path);
        debug!(collection = %collection_path.as_str(), is_default, "connecting to collection");

        SimpleCollection::open(Box::new(DbusCollection::new(
            service,
            collection_path,
            Some(passphrase),
            is_default,
        )))
    }
}

fn create_collection(
    service: &SecretService<'_>,
    name: &str,
    passphrase: &str,
) -> Result<OwnedObjectPath, Error> {
    match service.create_collection_with_password(name, passphrase.as_bytes()) {
        Ok(collection) => Ok(collection.collection_path),
        Err(err) if err.is_unsupported() => {
            warn!(%err, "master password creation unsupported, prompting instead");
            Ok(service.create_collection(name, "")?.collection_path)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    // Each scenario opens its own handle and collection, so they can run in parallel.

    #[test]
    #[ignore] // may prompt to unlock the default collection
    fn should_create_password_in_default_collection() {
        let mut collection = SimpleService::new().connect().unwrap();
        assert!(collection.is_default());

        let item = collection.create_item("My Item", "secret").unwrap();
        assert_eq!(collection.get_secret(&item).unwrap(), Some(&b"secret"[..]));
        assert_eq!(collection.get_label(&item).unwrap().as_deref(), Some("My Item"));

        collection.delete_item(&item).unwrap();
        assert_eq!(collection.get_secret(&item).unwrap(), None);
        assert!(matches!(collection.delete(), Err(Error::DefaultCollection)));
    }

    #[test_with::env(SECRET_SERVICE_LIVE_TESTS)]
    #[test]
    fn should_create_password_in_non_default_collection() {
        let mut collection = SimpleService::new()
            .connect_to("My Plain Collection", "super secret")
            .unwrap();
        assert!(!collection.is_default());

        let item = collection.create_item("My Item", "secret").unwrap();
        assert_eq!(collection.get_secret(&item).unwrap(), Some(&b"secret"[..]));
        assert_eq!(collection.get_label(&item).unwrap().as_deref(), Some("My Item"));

        collection.delete_item(&item).unwrap();
        collection.delete().unwrap();
        collection.close().unwrap();
    }

    #[test_with::env(SECRET_SERVICE_LIVE_TESTS)]
    #[test]
    fn should_create_password_with_attributes() {
        let config = Config::default().prompt_timeout(Duration::from_secs(60));
        let mut collection = SimpleService::with_config(config)
            .connect_to("My Collection", "super secret")
            .unwrap();

        let attributes = HashMap::from([("uuid", "42")]);
        collection
            .create_item_with_attributes("My Item", "secret", attributes.clone())
            .unwrap();

        let items = collection.get_items(attributes.clone()).unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];

        assert_eq!(collection.get_secret(item).unwrap(), Some(&b"secret"[..]));
        assert_eq!(collection.get_label(item).unwrap().as_deref(), Some("My Item"));
        let stored = collection.get_attributes(item).unwrap().unwrap();
        assert_eq!(stored.get("uuid").map(String::as_str), Some("42"));

        collection.delete_item(item).unwrap();
        collection.delete().unwrap();
        assert!(collection.get_items(attributes).unwrap().is_empty());
        assert_eq!(collection.get_label(item).unwrap(), None);
    }

    #[test]
    #[ignore] // may prompt to unlock the default collection
    fn should_not_see_items_of_other_collections() {
        let mut named = SimpleService::new()
            .connect_to("My Other Collection", "super secret")
            .unwrap();
        let mut default = SimpleService::new().connect().unwrap();

        let item = default.create_item("My Item", "secret").unwrap();
        assert_eq!(named.get_secret(&item).unwrap(), None);
        assert_eq!(named.get_label(&item).unwrap(), None);

        default.delete_item(&item).unwrap();
        named.delete().unwrap();
    }
}
