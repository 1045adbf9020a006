//Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

// Contains helpers for:
//   exec_prompt
//   formatting secrets
//   mapping connection errors

use crate::error::Error;
use crate::proxy::prompt::{Completed, PromptProxyBlocking};
use crate::proxy::service::ServiceProxyBlocking;
use crate::proxy::SecretStruct;
use crate::session::encrypt;
use crate::session::Session;
use crate::ss::{NO_OBJECT, SS_DBUS_NAME};

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use zbus::zvariant::{self, ObjectPath, OwnedValue};

// Helper enum for locking
pub(crate) enum LockAction {
    Lock,
    Unlock,
}

pub(crate) fn lock_or_unlock_blocking(
    conn: zbus::blocking::Connection,
    service_proxy: &ServiceProxyBlocking,
    object_path: &ObjectPath<'_>,
    lock_action: LockAction,
    prompt_timeout: Duration,
) -> Result<(), Error> {
    let objects = vec![object_path];

    let lock_action_res = match lock_action {
        LockAction::Lock => bounded(service_proxy.lock(objects), prompt_timeout)?,
        LockAction::Unlock => bounded(service_proxy.unlock(objects), prompt_timeout)?,
    };

    if lock_action_res.object_paths.is_empty() {
        exec_prompt_blocking(conn, &lock_action_res.prompt, prompt_timeout)?;
    }

    Ok(())
}

pub(crate) fn format_secret(
    session: &Session,
    secret: &[u8],
    content_type: &str,
) -> Result<SecretStruct, Error> {
    let content_type = content_type.to_owned();

    if let Some(session_key) = session.get_aes_key() {
        let mut aes_iv = [0; 16];
        getrandom::getrandom(&mut aes_iv).map_err(|_| Error::Crypto("failed to generate iv"))?;

        let encrypted_secret = encrypt(secret, session_key, &aes_iv);

        // Construct secret struct
        let parameters = aes_iv.to_vec();
        let value = encrypted_secret;

        Ok(SecretStruct {
            session: session.object_path.clone(),
            parameters,
            value,
            content_type,
        })
    } else {
        // just Plain for now
        let parameters = Vec::new();
        let value = secret.to_vec();

        Ok(SecretStruct {
            session: session.object_path.clone(),
            parameters,
            value,
            content_type,
        })
    }
}

/// Runs the prompt at `prompt` and blocks until its `Completed` signal arrives.
///
/// The signal subscription is made on this prompt's own path before `Prompt` is called, so a
/// completion can't be missed or delivered to another waiter. `timeout` bounds the `Prompt` call
/// and the wait for completion together. When it elapses the prompt is dismissed and
/// [Error::Timeout] is returned.
pub(crate) fn exec_prompt_blocking(
    conn: zbus::blocking::Connection,
    prompt: &ObjectPath<'_>,
    timeout: Duration,
) -> Result<OwnedValue, Error> {
    let prompt_proxy: PromptProxyBlocking<'static> = PromptProxyBlocking::builder(&conn)
        .destination(SS_DBUS_NAME)?
        .path(prompt.to_owned())?
        .build()?;

    let mut completed = prompt_proxy.receive_completed()?;
    let waiter_proxy = prompt_proxy.clone();

    info!(prompt = %prompt.as_str(), ?timeout, "awaiting prompt completion");
    let res = await_exchange(
        move || {
            // FIXME figure out window_id
            waiter_proxy.prompt("")?;
            completed
                .next()
                .map_or(Err(Error::Prompt), handle_signal)
        },
        timeout,
        || {
            if let Err(err) = prompt_proxy.dismiss() {
                warn!(prompt = %prompt.as_str(), %err, "failed to dismiss timed out prompt");
            }
        },
    );

    bounded(res, timeout)
}

/// Runs `exchange` on a worker thread and waits at most `timeout` for its result.
///
/// `on_timeout` runs once when `timeout` elapses first. The worker then finishes on its own, at
/// the latest when the connection it calls on times out or is closed.
pub(crate) fn await_exchange<T: Send + 'static>(
    exchange: impl FnOnce() -> Result<T, Error> + Send + 'static,
    timeout: Duration,
    on_timeout: impl FnOnce(),
) -> Result<T, Error> {
    let (tx, rx) = mpsc::channel();
    let worker = thread::Builder::new()
        .name("secret-service-prompt".to_owned())
        .spawn(move || {
            // The receiver is gone once the caller timed out; nothing left to report to.
            let _ = tx.send(exchange());
        })
        .map_err(zbus::Error::from)?;

    match rx.recv_timeout(timeout) {
        Ok(res) => {
            // sending was the worker's last step
            let _ = worker.join();
            res
        }
        // the worker panicked
        Err(RecvTimeoutError::Disconnected) => Err(Error::Prompt),
        Err(RecvTimeoutError::Timeout) => {
            on_timeout();
            Err(Error::Timeout(timeout))
        }
    }
}

/// Maps a call that got no reply within the connection's method timeout to [Error::Timeout].
pub(crate) fn bounded<T, E: Into<Error>>(
    res: Result<T, E>,
    timeout: Duration,
) -> Result<T, Error> {
    res.map_err(|err| {
        let err = err.into();
        if err.is_timed_out() {
            Error::Timeout(timeout)
        } else {
            err
        }
    })
}

/// A session bus connection on which method calls give up after `method_timeout`.
pub(crate) fn connect_session(
    method_timeout: Duration,
) -> Result<zbus::blocking::Connection, Error> {
    zbus::blocking::connection::Builder::session()
        .and_then(|builder| builder.method_timeout(method_timeout).build())
        .map_err(handle_conn_error)
}

fn handle_signal(signal: Completed) -> Result<OwnedValue, Error> {
    let args = signal.args()?;
    if args.dismissed {
        debug!("prompt dismissed");
        Err(Error::Prompt)
    } else {
        zvariant::OwnedValue::try_from(args.result).map_err(From::from)
    }
}

/// Whether `path` is the placeholder the service returns instead of an object or prompt.
pub(crate) fn is_no_object(path: &ObjectPath<'_>) -> bool {
    path.as_str() == NO_OBJECT
}

pub(crate) fn handle_conn_error(e: zbus::Error) -> Error {
    match e {
        zbus::Error::InterfaceNotFound | zbus::Error::Address(_) => Error::Unavailable,
        zbus::Error::InputOutput(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Error::Unavailable
        }
        e => e.into(),
    }
}
