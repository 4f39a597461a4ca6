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

//! Error taxonomy shared by the bridge API, the managers and the external seams.

use crate::address::ServerAddress;
use crate::arguments::ArgumentType;
use std::time::Duration;
use thiserror::Error;

/// Failure returned to a requester of the bridge API or of a manager.
///
/// Configuration errors are raised before any manager is consulted. Lifecycle and
/// transport errors are answered by the server manager, which keeps its state.
/// [`BridgeError::AskTimeout`] means no answer arrived at all, which is distinct from
/// a rejection.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("invalid server address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("unsupported scheme '{scheme}' in server address '{address}' (expected ws or wss)")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("server listening on '{0}' is already running")]
    AlreadyRunning(ServerAddress),

    #[error("server listening on '{0}' is not running")]
    NotRunning(ServerAddress),

    #[error("failed to start server listening on '{address}'")]
    StartFailed {
        address: ServerAddress,
        #[source]
        source: TransportError,
    },

    #[error("failed to stop server listening on '{address}'")]
    StopFailed {
        address: ServerAddress,
        #[source]
        source: TransportError,
    },

    #[error("failed to open realm '{realm}' on '{address}'")]
    RealmUnavailable {
        address: ServerAddress,
        realm: String,
        #[source]
        source: TransportError,
    },

    #[error("no reply from '{target}' within {timeout:?}")]
    AskTimeout { target: String, timeout: Duration },

    #[error("'{target}' is no longer reachable")]
    Undeliverable { target: String },

    #[error("failed to spawn '{target}': {reason}")]
    SpawnFailed { target: String, reason: String },
}

impl BridgeError {
    pub(crate) fn blank_argument(name: &'static str) -> Self {
        BridgeError::InvalidArgument {
            name,
            reason: "cannot be empty or entirely composed of whitespace".to_string(),
        }
    }

    pub(crate) fn ensure_not_blank(name: &'static str, value: &str) -> Result<(), Self> {
        if value.trim().is_empty() {
            return Err(Self::blank_argument(name));
        }
        Ok(())
    }

    pub(crate) fn ensure_argument_types(argument_types: &[ArgumentType]) -> Result<(), Self> {
        if argument_types.is_empty() {
            return Err(BridgeError::InvalidArgument {
                name: "argument_types",
                reason: "a subscription needs at least one argument type".to_string(),
            });
        }
        Ok(())
    }

    /// `true` for the lifecycle rejections a server manager answers with while keeping
    /// its current state.
    pub fn is_lifecycle_rejection(&self) -> bool {
        matches!(
            self,
            BridgeError::AlreadyRunning(_) | BridgeError::NotRunning(_)
        )
    }
}

/// Failure raised by the hosting layer while starting, stopping or serving a listener.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport is already running")]
    AlreadyRunning,

    #[error("transport is not running")]
    NotRunning,

    #[error("transport has been disposed")]
    Disposed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure raised by an event-bus topic subject when an event cannot be pushed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("topic '{topic}' rejected event: {reason}")]
pub struct EventBusError {
    pub topic: String,
    pub reason: String,
}

impl EventBusError {
    pub fn new(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}
