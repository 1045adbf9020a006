//Copyright 2016 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

// Definitions for secret service interactions

// DBus Name
pub const SS_DBUS_NAME: &str = "org.freedesktop.secrets";

// DBus Object paths
pub const SS_PATH: &str = "/org/freedesktop/secrets";

// Returned in place of an object path when no object exists or no prompt is needed
pub const NO_OBJECT: &str = "/";

// Aliases
pub const DEFAULT_ALIAS: &str = "default";
pub const SESSION_ALIAS: &str = "session";

// Item Properties
pub const SS_ITEM_LABEL: &str = "org.freedesktop.Secret.Item.Label";
pub const SS_ITEM_ATTRIBUTES: &str = "org.freedesktop.Secret.Item.Attributes";

// Collection properties
pub const SS_COLLECTION_LABEL: &str = "org.freedesktop.Secret.Collection.Label";

// Algorithm Names
pub const ALGORITHM_PLAIN: &str = "plain";
pub const ALGORITHM_DH: &str = "dh-ietf1024-sha256-aes128-cbc-pkcs7";

// Content type used by the simple API
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

// Error names that mean "this object is not there"
pub const NOT_FOUND_ERRORS: &[&str] = &[
    "org.freedesktop.Secret.Error.NoSuchObject",
    "org.freedesktop.DBus.Error.UnknownObject",
];

// Also "not there", but only when the message names the addressed path. GDBus services
// (gnome-keyring) reply with these for objects that were removed.
pub const MISSING_OBJECT_ERRORS: &[&str] = &[
    "org.freedesktop.DBus.Error.UnknownMethod",
    "org.freedesktop.DBus.Error.UnknownInterface",
];

// Error names that mean "this service does not offer the call"
pub const UNSUPPORTED_ERRORS: &[&str] = &[
    "org.freedesktop.DBus.Error.UnknownMethod",
    "org.freedesktop.DBus.Error.UnknownInterface",
    "org.freedesktop.DBus.Error.NotSupported",
    "org.freedesktop.DBus.Error.ServiceUnknown",
];
