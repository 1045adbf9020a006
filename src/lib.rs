//Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Simple Secret Service
//!
//! A small, blocking API for storing passwords in the freedesktop
//! [Secret Service](https://specifications.freedesktop.org/secret-service/latest/)
//! (gnome-keyring, KeePassXC, KWallet...), and the lower level client it is built on.
//!
//! ## Usage
//!
//! ```no_run
//! use simple_secret_service::{Error, SimpleService};
//! use std::collections::HashMap;
//!
//! # fn main() -> Result<(), Error> {
//! // A named collection, created and unlocked with its passphrase when needed.
//! let mut collection = SimpleService::new().connect_to("My Collection", "super secret")?;
//!
//! let attributes = HashMap::from([("uuid", "42")]);
//! collection.create_item_with_attributes("My Item", "secret", attributes.clone())?;
//!
//! let items = collection.get_items(attributes)?;
//! let item = &items[0];
//! assert_eq!(collection.get_secret(item)?, Some(&b"secret"[..]));
//! assert_eq!(collection.get_label(item)?.as_deref(), Some("My Item"));
//!
//! collection.delete_item(item)?;
//! collection.delete()?;
//! # Ok(())
//! # }
//! // Dropping the handle wipes every secret it fetched and closes its session.
//! ```
//!
//! Secrets fetched through a [SimpleCollection] are kept in zeroizing buffers owned by the
//! handle. They are borrowed out of it, so none of them can outlive the handle, and they are
//! overwritten with zeros when it is closed or dropped.
//!
//! Lookups distinguish "nothing there" from "it failed": a missing item gives `Ok(None)`
//! (or an empty `Vec`), while any failure to talk to the service is an `Err`.
//!
//! ## Prompts
//!
//! Unlocking or creating collections may require the user's authorization through a prompt. The
//! calling thread blocks until the prompt completes, at most for [Config::prompt_timeout]
//! (60 seconds by default); an unanswered prompt is dismissed and [Error::Timeout] returned.
//!
//! ## Lower level API
//!
//! [blocking::SecretService] exposes collections and items of the Secret Service directly.
//!
//! ### Crypto
//!
//! Specifics in SecretService API Draft Proposal:
//! <https://standards.freedesktop.org/secret-service/>
//!
//! Secrets are transferred encrypted ([EncryptionType::Dh], the default) or in plain text
//! ([EncryptionType::Plain]) over the session bus.

pub mod blocking;
mod config;
mod error;
mod proxy;
mod session;
pub mod simple;
mod ss;
mod util;

pub use config::{Config, DEFAULT_PROMPT_TIMEOUT};
pub use error::Error;
pub use session::EncryptionType;
pub use simple::{SimpleCollection, SimpleService};

/// Used to indicate locked and unlocked items in the
/// return value of [blocking::SecretService::search_items]
pub struct SearchItemsResult<T> {
    pub unlocked: Vec<T>,
    pub locked: Vec<T>,
}
