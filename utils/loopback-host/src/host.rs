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

use crate::event_bus::{MemoryRealm, DEFAULT_TOPIC_CAPACITY};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use topic_bridge::event_bus::Realm;
use topic_bridge::transport::{ServerTransport, TransportFactory};
use topic_bridge::{ServerAddress, TransportError};
use tracing::{debug, info, warn};

const LOOPBACK_HOST_TAG: &str = "LoopbackHost:";

/// Pause after a failed accept, so persistent errors such as fd exhaustion do not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Realms of one running period of a host. A new container is created on every start.
struct RealmContainer {
    capacity: usize,
    realms: Mutex<HashMap<String, Arc<MemoryRealm>>>,
}

impl RealmContainer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            realms: Mutex::new(HashMap::new()),
        }
    }

    fn realm(&self, name: &str) -> Arc<MemoryRealm> {
        let mut realms = self.realms.lock().unwrap_or_else(PoisonError::into_inner);
        realms
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryRealm::new(name, self.capacity)))
            .clone()
    }

    fn close(&self) {
        let realms = self.realms.lock().unwrap_or_else(PoisonError::into_inner);
        for realm in realms.values() {
            realm.close();
        }
    }
}

/// State of a host that outlives the host itself, so it can be inspected through the
/// factory.
#[derive(Default)]
struct HostSlot {
    container: Mutex<Option<Arc<RealmContainer>>>,
}

impl HostSlot {
    fn container(&self) -> Option<Arc<RealmContainer>> {
        self.container
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace(&self, container: Option<Arc<RealmContainer>>) -> Option<Arc<RealmContainer>> {
        let mut slot = self.container.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, container)
    }
}

/// Listening host serving in-memory realms.
///
/// `start` binds a TCP listener on the address's host and port and `stop` releases it.
/// Connections are accepted and closed right away: the wire protocol is not spoken
/// here, the realms are reached in-process.
pub struct LoopbackHost {
    address: ServerAddress,
    capacity: usize,
    slot: Arc<HostSlot>,
    listener: Option<JoinHandle<()>>,
}

impl LoopbackHost {
    pub fn new(address: ServerAddress) -> Self {
        Self::with_slot(address, DEFAULT_TOPIC_CAPACITY, Arc::default())
    }

    fn with_slot(address: ServerAddress, capacity: usize, slot: Arc<HostSlot>) -> Self {
        Self {
            address,
            capacity,
            slot,
            listener: None,
        }
    }

    async fn accept_loop(address: ServerAddress, listener: TcpListener) {
        serve_connections(address, || listener.accept()).await
    }
}

/// Accepts and closes connections until cancelled.
async fn serve_connections<C, P, A, F>(address: ServerAddress, mut accept: A)
where
    P: Display,
    A: FnMut() -> F,
    F: Future<Output = io::Result<(C, P)>>,
{
    loop {
        match accept().await {
            Ok((connection, peer)) => {
                debug!(
                    "{}:{} closing connection from {}",
                    LOOPBACK_HOST_TAG, address, peer
                );
                drop(connection);
            }
            Err(err) => {
                warn!(
                    "{}:{} accept failed, retrying in {:?}: {}",
                    LOOPBACK_HOST_TAG, address, ACCEPT_ERROR_BACKOFF, err
                );
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

#[async_trait]
impl ServerTransport for LoopbackHost {
    fn address(&self) -> &ServerAddress {
        &self.address
    }

    fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    async fn start(&mut self) -> Result<(), TransportError> {
        if self.listener.is_some() {
            return Err(TransportError::AlreadyRunning);
        }

        let listener = TcpListener::bind(self.address.listen_addr()).await?;
        let local_addr = listener.local_addr()?;
        self.listener = Some(tokio::spawn(Self::accept_loop(
            self.address.clone(),
            listener,
        )));
        self.slot
            .replace(Some(Arc::new(RealmContainer::new(self.capacity))));

        info!(
            "{}:{} listening on {}",
            LOOPBACK_HOST_TAG, self.address, local_addr
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        let listener = self.listener.take().ok_or(TransportError::NotRunning)?;
        listener.abort();
        // Waiting for the cancelled task guarantees the socket is closed before a
        // restart binds the same port again.
        let _ = listener.await;

        if let Some(container) = self.slot.replace(None) {
            container.close();
        }
        info!("{}:{} stopped", LOOPBACK_HOST_TAG, self.address);
        Ok(())
    }

    fn realm(&self, name: &str) -> Result<Arc<dyn Realm>, TransportError> {
        let container = self.slot.container().ok_or(TransportError::NotRunning)?;
        Ok(container.realm(name))
    }
}

impl Drop for LoopbackHost {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some(container) = self.slot.replace(None) {
            container.close();
        }
    }
}

/// Builds a [`LoopbackHost`] per address and keeps a handle on each, so the realms a
/// running host serves can be reached directly.
#[derive(Clone)]
pub struct LoopbackHostFactory {
    capacity: usize,
    slots: Arc<Mutex<HashMap<ServerAddress, Arc<HostSlot>>>>,
}

impl Default for LoopbackHostFactory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }
}

impl LoopbackHostFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose topics queue at most `capacity` events per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Arc::default(),
        }
    }

    /// The realm `name` served by the host of `address`, if that host is running.
    pub fn running_realm(
        &self,
        address: &ServerAddress,
        name: &str,
    ) -> Option<Arc<MemoryRealm>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let container = slots.get(address)?.container()?;
        Some(container.realm(name))
    }
}

impl TransportFactory for LoopbackHostFactory {
    fn create(&self, address: &ServerAddress) -> Box<dyn ServerTransport> {
        let slot = Arc::new(HostSlot::default());
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone(), slot.clone());
        Box::new(LoopbackHost::with_slot(
            address.clone(),
            self.capacity,
            slot,
        ))
    }
}
