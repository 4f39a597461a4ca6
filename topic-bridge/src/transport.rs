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

//! Hosting-layer seam: the listening endpoint a server manager starts and stops.

use crate::address::ServerAddress;
use crate::error::TransportError;
use crate::event_bus::Realm;
use async_trait::async_trait;
use std::sync::Arc;

/// A listening endpoint exposing the event bus over a transport.
///
/// Only the owning server manager calls into a transport, one call at a time.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    fn address(&self) -> &ServerAddress;

    fn is_running(&self) -> bool;

    /// Fails with [`TransportError::AlreadyRunning`] if already started.
    async fn start(&mut self) -> Result<(), TransportError>;

    /// Fails with [`TransportError::NotRunning`] if not started.
    async fn stop(&mut self) -> Result<(), TransportError>;

    /// Returns the realm named `name` from the running host's realm container.
    fn realm(&self, name: &str) -> Result<Arc<dyn Realm>, TransportError>;
}

/// Builds the transport for a server address.
pub trait TransportFactory: Send + Sync {
    fn create(&self, address: &ServerAddress) -> Box<dyn ServerTransport>;
}
