/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Tunables for the bridge.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ACTIVATION_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_ASK_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long a freshly created component waits for its owner to activate it.
    pub activation_timeout_ms: u64,
    /// How long the API waits for a manager to answer a request.
    pub ask_timeout_ms: u64,
}

impl BridgeConfig {
    pub fn activation_timeout(&self) -> Duration {
        Duration::from_millis(self.activation_timeout_ms)
    }

    pub fn ask_timeout(&self) -> Duration {
        Duration::from_millis(self.ask_timeout_ms)
    }

    pub fn with_activation_timeout(mut self, timeout: Duration) -> Self {
        self.activation_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_ask_timeout(mut self, timeout: Duration) -> Self {
        self.ask_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            activation_timeout_ms: DEFAULT_ACTIVATION_TIMEOUT_MS,
            ask_timeout_ms: DEFAULT_ASK_TIMEOUT_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BridgeConfig;
    use std::time::Duration;

    #[test]
    fn defaults_match_documented_timeouts() {
        let config = BridgeConfig::default();

        assert_eq!(config.activation_timeout(), Duration::from_secs(5));
        assert_eq!(config.ask_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{ "activation_timeout_ms": 250 }"#).expect("valid config");

        assert_eq!(config.activation_timeout(), Duration::from_millis(250));
        assert_eq!(config.ask_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn builders_override_timeouts() {
        let config = BridgeConfig::default()
            .with_activation_timeout(Duration::from_millis(100))
            .with_ask_timeout(Duration::from_secs(1));

        assert_eq!(config.activation_timeout_ms, 100);
        assert_eq!(config.ask_timeout_ms, 1_000);
    }
}
