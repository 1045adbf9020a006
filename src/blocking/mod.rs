// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A blocking secret service API.
//!
//! This `SecretService` will block the current thread when making requests to the
//! secret service server instead of returning futures.
//!
//! It is important to not call this these functions in an async context or otherwise the runtime
//! may stall. See [zbus's blocking documentation] for more details.
//!
//! Calls that need the user's authorization run a prompt and wait for it, at most for
//! [Config::prompt_timeout].
//!
//! [zbus's blocking documentation]: https://docs.rs/zbus/latest/zbus/blocking/index.html

use crate::proxy::keyring::KeyringProxyBlocking;
use crate::session::Session;
use crate::ss::{
    CONTENT_TYPE_TEXT, DEFAULT_ALIAS, SESSION_ALIAS, SS_COLLECTION_LABEL, SS_DBUS_NAME,
};
use crate::util;
use crate::{proxy::service::ServiceProxyBlocking, util::exec_prompt_blocking};
use crate::{Config, EncryptionType, Error, SearchItemsResult};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use zbus::names::BusName;
use zbus::zvariant::{OwnedObjectPath, Value};

mod collection;
pub use collection::Collection;
mod item;
pub use item::Item;

/// Secret Service Struct.
///
/// This the main entry point for usage of the library.
///
/// Creating a new [SecretService] will also initialize dbus
/// and negotiate a new cryptographic session
/// ([EncryptionType::Plain] or [EncryptionType::Dh])
pub struct SecretService<'a> {
    conn: zbus::blocking::Connection,
    session: Session,
    service_proxy: ServiceProxyBlocking<'a>,
    prompt_timeout: Duration,
}

impl<'a> SecretService<'a> {
    /// Create a new `SecretService` instance
    pub fn connect(encryption: EncryptionType) -> Result<Self, Error> {
        Self::connect_with(&Config::new(encryption))
    }

    /// Create a new `SecretService` instance on its own dbus connection.
    ///
    /// Method calls on the connection give up after [Config::prompt_timeout], so a provider that
    /// stops answering can't block the caller for longer.
    pub fn connect_with(config: &Config) -> Result<Self, Error> {
        let conn = util::connect_session(config.prompt_timeout)?;
        let service_proxy = ServiceProxyBlocking::new(&conn).map_err(util::handle_conn_error)?;

        let session = Session::new_blocking(&service_proxy, config.encryption)?;

        Ok(SecretService {
            conn,
            session,
            service_proxy,
            prompt_timeout: config.prompt_timeout,
        })
    }

    /// Whether a secret service provider currently owns its bus name.
    pub fn is_available() -> bool {
        let available = || -> Result<bool, Error> {
            let conn = zbus::blocking::Connection::session().map_err(util::handle_conn_error)?;
            let dbus_proxy = zbus::blocking::fdo::DBusProxy::new(&conn)?;
            let name = BusName::try_from(SS_DBUS_NAME).map_err(zbus::Error::from)?;
            Ok(dbus_proxy.name_has_owner(name)?)
        };

        available().unwrap_or_else(|err| {
            debug!(%err, "secret service is not available");
            false
        })
    }

    /// Get all collections
    pub fn get_all_collections(&self) -> Result<Vec<Collection>, Error> {
        let collections = self.service_proxy.collections()?;
        collections
            .into_iter()
            .map(|object_path| self.collection_at(object_path))
            .collect()
    }

    /// Get collection by alias.
    ///
    /// Most common would be the `default` alias, but there
    /// is also a specific method for getting the collection
    /// by default alias.
    pub fn get_collection_by_alias(&self, alias: &str) -> Result<Collection, Error> {
        let object_path = self.service_proxy.read_alias(alias)?;

        if util::is_no_object(&object_path) {
            Err(Error::NoResult)
        } else {
            self.collection_at(object_path)
        }
    }

    /// Get default collection.
    /// (The collection whos alias is `default`)
    pub fn get_default_collection(&self) -> Result<Collection, Error> {
        self.get_collection_by_alias(DEFAULT_ALIAS)
    }

    /// Get any collection.
    /// First tries `default` collection, then `session`
    /// collection, then the first collection when it
    /// gets all collections.
    pub fn get_any_collection(&self) -> Result<Collection, Error> {
        // default first, then session, then first

        self.get_default_collection()
            .or_else(|_| self.get_collection_by_alias(SESSION_ALIAS))
            .or_else(|_| {
                let mut collections = self.get_all_collections()?;
                if collections.is_empty() {
                    Err(Error::NoResult)
                } else {
                    Ok(collections.swap_remove(0))
                }
            })
    }

    /// Get the first collection whose label is `label`.
    pub fn get_collection_by_label(&self, label: &str) -> Result<Collection, Error> {
        for collection in self.get_all_collections()? {
            if collection.get_label()? == label {
                return Ok(collection);
            }
        }

        Err(Error::NoResult)
    }

    /// Creates a new collection with a label and an alias.
    pub fn create_collection(&self, label: &str, alias: &str) -> Result<Collection, Error> {
        let mut properties: HashMap<&str, Value> = HashMap::new();
        properties.insert(SS_COLLECTION_LABEL, label.into());

        let created_collection = util::bounded(
            self.service_proxy.create_collection(properties, alias),
            self.prompt_timeout,
        )?;

        // Get path of created object
        let created_path = created_collection.collection;

        // Check if that path is "/", if so should execute a prompt
        let collection_path = if util::is_no_object(&created_path) {
            let prompt_path = created_collection.prompt;

            // Exec prompt and parse result
            let prompt_res =
                exec_prompt_blocking(self.conn.clone(), &prompt_path, self.prompt_timeout)?;
            OwnedObjectPath::try_from(prompt_res)?
        } else {
            // if not, just return created path
            created_path
        };
        debug!(collection = %collection_path.as_str(), "created collection");

        self.collection_at(collection_path)
    }

    /// Creates a new collection protected by `password`, without prompting the user.
    ///
    /// This uses gnome-keyring's master password interface. Providers without it answer with an
    /// error for which [Error::is_unsupported] is true.
    pub fn create_collection_with_password(
        &self,
        label: &str,
        password: &[u8],
    ) -> Result<Collection, Error> {
        let mut properties: HashMap<&str, Value> = HashMap::new();
        properties.insert(SS_COLLECTION_LABEL, label.into());

        let master = util::format_secret(&self.session, password, CONTENT_TYPE_TEXT)?;
        let keyring_proxy = KeyringProxyBlocking::new(&self.conn)?;
        let collection_path = util::bounded(
            keyring_proxy.create_with_master_password(properties, master),
            self.prompt_timeout,
        )?;
        debug!(collection = %collection_path.as_str(), "created collection with master password");

        self.collection_at(collection_path)
    }

    /// Searches all items by attributes
    pub fn search_items(
        &self,
        attributes: HashMap<&str, &str>,
    ) -> Result<SearchItemsResult<Item>, Error> {
        let items = self.service_proxy.search_items(attributes)?;

        let object_paths_to_items = |items: Vec<_>| {
            items
                .into_iter()
                .map(|item_path| self.item_at(item_path))
                .collect::<Result<_, _>>()
        };

        Ok(SearchItemsResult {
            unlocked: object_paths_to_items(items.unlocked)?,
            locked: object_paths_to_items(items.locked)?,
        })
    }

    /// Unlock all items in a batch
    pub fn unlock_all(&self, items: &[&Item<'_>]) -> Result<(), Error> {
        let objects = items.iter().map(|i| &*i.item_path).collect();
        let lock_action_res =
            util::bounded(self.service_proxy.unlock(objects), self.prompt_timeout)?;

        if lock_action_res.object_paths.is_empty() {
            exec_prompt_blocking(
                self.conn.clone(),
                &lock_action_res.prompt,
                self.prompt_timeout,
            )?;
        }

        Ok(())
    }

    /// Closes the session with the service.
    pub fn close(&self) -> Result<(), Error> {
        self.session.close_blocking(&self.conn)
    }

    /// Handle to the collection at `collection_path`. Does not check that it exists.
    pub(crate) fn collection_at(
        &self,
        collection_path: OwnedObjectPath,
    ) -> Result<Collection, Error> {
        Collection::new(
            self.conn.clone(),
            &self.session,
            &self.service_proxy,
            collection_path,
            self.prompt_timeout,
        )
    }

    /// Handle to the item at `item_path`. Does not check that it exists.
    pub(crate) fn item_at(&self, item_path: OwnedObjectPath) -> Result<Item, Error> {
        Item::new(
            self.conn.clone(),
            &self.session,
            &self.service_proxy,
            item_path,
            self.prompt_timeout,
        )
    }
}

// Closing the connection ends any prompt waiter still subscribed on it.
impl Drop for SecretService<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.conn.clone().close() {
            debug!(%err, "failed to close secret service connection");
        }
    }
}
