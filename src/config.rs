// Copyright 2022 secret-service-rs Developers
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Connection settings.
//!
//! [Config] can be built in code or deserialized from an application's own configuration, for
//! example:
//!
//! ```toml
//! encryption = "dh"
//! prompt_timeout_secs = 30
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::session::EncryptionType;

/// How long an authorization prompt may stay open before the waiting call fails.
pub const DEFAULT_PROMPT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Session algorithm negotiated with the service.
    pub encryption: EncryptionType,
    /// Upper bound on waiting for a prompt's `Completed` signal.
    #[serde(rename = "prompt_timeout_secs", deserialize_with = "seconds")]
    pub prompt_timeout: Duration,
}

impl Config {
    pub fn new(encryption: EncryptionType) -> Self {
        Config {
            encryption,
            ..Config::default()
        }
    }

    pub fn prompt_timeout(mut self, timeout: Duration) -> Self {
        self.prompt_timeout = timeout;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            encryption: EncryptionType::Dh,
            prompt_timeout: DEFAULT_PROMPT_TIMEOUT,
        }
    }
}

fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
