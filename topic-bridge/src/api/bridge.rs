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

use crate::actor::Handle;
use crate::address::ServerAddress;
use crate::arguments::ArgumentType;
use crate::component::{PublicationRef, SubscriptionRef};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::manager::{spawn_top_level, RealmRef, ServerRef, TopLevelCommand};
use crate::messages::{Owner, PublishEvent};
use crate::observability::events;
use crate::transport::TransportFactory;
use std::sync::Arc;
use tracing::{debug, info};

const COMPONENT: &str = "topic_bridge";

/// Entry point into the manager tree.
///
/// A bridge owns the top-level registry of server managers for as long as it lives.
/// Every request is answered within the configured ask timeout; configuration errors
/// are returned before any manager is consulted.
pub struct TopicBridge {
    config: BridgeConfig,
    top_level: Handle<TopLevelCommand>,
}

impl TopicBridge {
    /// Spawns the top-level manager. Must be called from within a tokio runtime.
    pub async fn new(
        config: BridgeConfig,
        transports: Arc<dyn TransportFactory>,
    ) -> Result<Self, BridgeError> {
        let (top_level, _task) = spawn_top_level(transports, config.activation_timeout()).await?;
        info!(
            event = events::BRIDGE_CREATED,
            component = COMPONENT,
            activation_timeout_ms = config.activation_timeout_ms,
            ask_timeout_ms = config.ask_timeout_ms,
            "topic bridge created"
        );
        Ok(Self { config, top_level })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Returns the server manager for `address`, creating it on first use.
    pub async fn create_server(&self, address: &str) -> Result<ServerRef, BridgeError> {
        let address = ServerAddress::parse(address)?;
        debug!(component = COMPONENT, address = %address, "requesting server manager");
        self.top_level
            .ask(
                |reply| TopLevelCommand::GetOrCreateServer { address, reply },
                self.config.ask_timeout(),
            )
            .await?
    }

    pub async fn start_server(&self, server: &ServerRef) -> Result<(), BridgeError> {
        server.start(self.config.ask_timeout()).await
    }

    pub async fn stop_server(&self, server: &ServerRef) -> Result<(), BridgeError> {
        server.stop(self.config.ask_timeout()).await
    }

    /// Returns the realm manager for `realm`. Fails with [`BridgeError::NotRunning`]
    /// while the server is stopped.
    pub async fn get_realm(
        &self,
        server: &ServerRef,
        realm: &str,
    ) -> Result<RealmRef, BridgeError> {
        BridgeError::ensure_not_blank("realm", realm)?;
        server.realm(realm, self.config.ask_timeout()).await
    }

    /// Creates (or returns) the subscription of `owner` to `topic`. The owner must
    /// activate it before events are delivered.
    pub async fn subscribe(
        &self,
        realm: &RealmRef,
        topic: &str,
        owner: &Owner,
        argument_types: &[ArgumentType],
    ) -> Result<SubscriptionRef, BridgeError> {
        BridgeError::ensure_not_blank("topic", topic)?;
        BridgeError::ensure_argument_types(argument_types)?;
        realm
            .subscribe(topic, owner, argument_types, self.config.ask_timeout())
            .await
    }

    /// Creates (or returns) the publication of `owner` on `topic`. The owner must
    /// activate it before events are published.
    pub async fn publisher(
        &self,
        realm: &RealmRef,
        topic: &str,
        owner: &Owner,
    ) -> Result<PublicationRef, BridgeError> {
        BridgeError::ensure_not_blank("topic", topic)?;
        realm
            .publisher(topic, owner, self.config.ask_timeout())
            .await
    }

    pub fn unsubscribe(&self, subscription: &SubscriptionRef) -> Result<(), BridgeError> {
        subscription.unsubscribe()
    }

    pub fn publish(
        &self,
        publication: &PublicationRef,
        event: PublishEvent,
    ) -> Result<(), BridgeError> {
        publication.publish(event)
    }

    /// Stops every server manager, disposing running transports, and waits for the
    /// whole tree to terminate.
    pub async fn shutdown(&self) {
        self.top_level.stop();
        self.top_level.terminated().await;
        info!(
            event = events::BRIDGE_SHUTDOWN,
            component = COMPONENT,
            "topic bridge shut down"
        );
    }
}

impl Drop for TopicBridge {
    fn drop(&mut self) {
        self.top_level.stop();
    }
}
