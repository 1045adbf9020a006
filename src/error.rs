// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Errors returned by the secret service client and the simple API.
//!
//! Absence is not an error in the simple API: lookups that find nothing return `Ok(None)` or an
//! empty `Vec`. An `Err` always means the operation itself failed.

use std::time::Duration;

use thiserror::Error;
use zbus::DBusError;

use crate::ss::{MISSING_OBJECT_ERRORS, NOT_FOUND_ERRORS, UNSUPPORTED_ERRORS};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An error occurred decrypting a response message.
    #[error("crypto error: {0}")]
    Crypto(&'static str),
    /// A call into the secret service provider failed.
    #[error("zbus error: {0}")]
    Zbus(#[from] zbus::Error),
    /// A call into a standard dbus interface failed.
    #[error("zbus fdo error: {0}")]
    ZbusFdo(#[from] zbus::fdo::Error),
    /// A message could not be converted to the expected type.
    #[error("zbus zvariant error: {0}")]
    Zvariant(#[from] zbus::zvariant::Error),
    /// The secret service object must be unlocked first.
    #[error("object locked")]
    Locked,
    /// No object was found for the lookup.
    #[error("no result found")]
    NoResult,
    /// An authorization prompt was dismissed.
    #[error("prompt dismissed")]
    Prompt,
    /// No secret service provider or dbus session was found.
    #[error("no secret service provider or dbus session found")]
    Unavailable,
    /// An authorization prompt did not complete in time.
    #[error("prompt did not complete within {0:?}")]
    Timeout(Duration),
    /// The simple API does not delete the user's default collection.
    #[error("the default collection cannot be deleted")]
    DefaultCollection,
}

impl Error {
    /// Whether the service reported that the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.dbus_error()
            .is_some_and(|(name, _)| NOT_FOUND_ERRORS.contains(&name.as_str()))
    }

    /// Whether the service reported that the object at `path` does not exist.
    ///
    /// Besides the not-found errors, GDBus based providers such as gnome-keyring answer calls on
    /// removed objects with `UnknownMethod` or `UnknownInterface`, naming the path in the
    /// message. Those only count when they name `path`, so a provider that lacks a method is
    /// still a failure.
    pub fn is_missing_object(&self, path: &str) -> bool {
        self.is_not_found()
            || self.dbus_error().is_some_and(|(name, description)| {
                MISSING_OBJECT_ERRORS.contains(&name.as_str())
                    && description.is_some_and(|description| names_path(&description, path))
            })
    }

    /// Whether the service does not provide the called method or interface.
    pub fn is_unsupported(&self) -> bool {
        self.dbus_error()
            .is_some_and(|(name, _)| UNSUPPORTED_ERRORS.contains(&name.as_str()))
    }

    /// Whether a method call got no reply within the connection's method timeout.
    pub(crate) fn is_timed_out(&self) -> bool {
        match self {
            Error::Zbus(err) => zbus_timed_out(err),
            Error::ZbusFdo(zbus::fdo::Error::ZBus(err)) => zbus_timed_out(err),
            _ => false,
        }
    }

    /// Name and message of the dbus error reply, if this is one.
    fn dbus_error(&self) -> Option<(String, Option<String>)> {
        match self {
            Error::Zbus(err) => zbus_error(err),
            Error::ZbusFdo(err) => fdo_error(err),
            _ => None,
        }
    }
}

fn zbus_error(err: &zbus::Error) -> Option<(String, Option<String>)> {
    match err {
        zbus::Error::MethodError(name, description, _) => {
            Some((name.as_str().to_owned(), description.clone()))
        }
        zbus::Error::FDO(fdo) => fdo_error(fdo),
        _ => None,
    }
}

// Replies with names zbus does not know about arrive wrapped in `fdo::Error::ZBus`.
fn fdo_error(err: &zbus::fdo::Error) -> Option<(String, Option<String>)> {
    match err {
        zbus::fdo::Error::ZBus(inner) => zbus_error(inner),
        other => Some((
            other.name().as_str().to_owned(),
            other.description().map(str::to_owned),
        )),
    }
}

fn zbus_timed_out(err: &zbus::Error) -> bool {
    matches!(err, zbus::Error::InputOutput(io) if io.kind() == std::io::ErrorKind::TimedOut)
}

// The path must not continue past the match, so `/collection/a` is not named by `/collection/ab`.
fn names_path(description: &str, path: &str) -> bool {
    description.match_indices(path).any(|(start, _)| {
        !description[start + path.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '/')
    })
}
