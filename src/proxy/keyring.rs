//Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A dbus proxy for gnome-keyring's master password interface.
//!
//! gnome-keyring exports this next to the standard `Service` interface. It creates and unlocks
//! collections with a password supplied by the caller instead of an interactive prompt. Other
//! providers do not implement it, and callers fall back to the prompting calls.

use std::collections::HashMap;
use zbus::zvariant::{ObjectPath, OwnedObjectPath, Value};

use super::SecretStruct;

/// This will derive KeyringProxy and KeyringProxyBlocking
#[zbus::proxy(
    interface = "org.gnome.keyring.InternalUnsupportedGuiltRiddenInterface",
    default_service = "org.freedesktop.secrets",
    default_path = "/org/freedesktop/secrets"
)]
pub trait Keyring {
    /// Returns collection
    fn create_with_master_password(
        &self,
        properties: HashMap<&str, Value<'_>>,
        master: SecretStruct,
    ) -> zbus::Result<OwnedObjectPath>;

    fn unlock_with_master_password(
        &self,
        collection: &ObjectPath<'_>,
        master: SecretStruct,
    ) -> zbus::Result<()>;
}
