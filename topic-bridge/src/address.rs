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

//! Server endpoint addresses.

use crate::error::BridgeError;
use std::fmt::{Display, Formatter};
use url::Url;

const WEBSOCKET_SCHEMES: [&str; 2] = ["ws", "wss"];

/// Endpoint address of a server, keyed by scheme, host, port and path.
///
/// Only websocket schemes are accepted; the port defaults to the scheme's well-known
/// port when the address does not name one.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    scheme: String,
    host: String,
    port: u16,
    path: String,
}

impl ServerAddress {
    pub fn parse(address: &str) -> Result<Self, BridgeError> {
        let url = Url::parse(address.trim()).map_err(|err| BridgeError::InvalidAddress {
            address: address.to_string(),
            reason: err.to_string(),
        })?;

        if !WEBSOCKET_SCHEMES.contains(&url.scheme()) {
            return Err(BridgeError::UnsupportedScheme {
                address: address.to_string(),
                scheme: url.scheme().to_string(),
            });
        }

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| BridgeError::InvalidAddress {
                address: address.to_string(),
                reason: "missing host".to_string(),
            })?;

        let port = url
            .port_or_known_default()
            .ok_or_else(|| BridgeError::InvalidAddress {
                address: address.to_string(),
                reason: "missing port".to_string(),
            })?;

        Ok(Self {
            scheme: url.scheme().to_string(),
            host: host.to_string(),
            port,
            path: url.path().to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Request path the websocket endpoint is mapped to; `/` for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// `host:port` pair suitable for binding a listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Display for ServerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)?;
        if self.path != "/" {
            write!(f, "{}", self.path)?;
        }
        Ok(())
    }
}

impl TryFrom<&str> for ServerAddress {
    type Error = BridgeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
