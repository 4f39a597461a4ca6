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

//! # topic-bridge
//!
//! `topic-bridge` lets actor-style code create pub/sub servers, join realms and
//! exchange events on topics without touching the event bus's own streams and
//! disposables.
//!
//! Typical usage goes through [`TopicBridge`]: get a [`ServerRef`] for an endpoint,
//! start it, get a [`RealmRef`], then ask for a [`SubscriptionRef`] or a
//! [`PublicationRef`] on behalf of an [`Owner`].
//!
//! ## Ownership handshake
//!
//! Every subscription or publication is created waiting for its owner. The owner
//! claims it with `activate(owner, error_notifications)`; only then is the event-bus
//! subscription opened (or publish requests accepted). A component that is not
//! claimed within [`BridgeConfig::activation_timeout`] stops itself silently.
//!
//! ```no_run
//! use std::sync::Arc;
//! use loopback_host::LoopbackHostFactory;
//! use topic_bridge::{ArgumentType, BridgeConfig, OwnerNotification, Recipient, TopicBridge};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let bridge = TopicBridge::new(BridgeConfig::default(), Arc::new(LoopbackHostFactory::new()))
//!     .await
//!     .unwrap();
//! let server = bridge.create_server("ws://localhost:19929").await.unwrap();
//! bridge.start_server(&server).await.unwrap();
//! let realm = bridge.get_realm(&server, "default").await.unwrap();
//!
//! let (tx, mut notifications) = tokio::sync::mpsc::unbounded_channel();
//! let owner = Recipient::from_channel("price-watcher", tx);
//! let prices = bridge
//!     .subscribe(&realm, "prices", &owner, &[ArgumentType::Float])
//!     .await
//!     .unwrap();
//! prices.activate(&owner, true).unwrap();
//!
//! while let Some(OwnerNotification::Received(event)) = notifications.recv().await {
//!     let (price,): (f64,) = event.decode().unwrap();
//!     println!("price: {price}");
//! }
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - Actor layer: one `ractor` actor per manager or component, with liveness and child tracking on top
//! - Components: activation handshake, subscription and publication
//! - Managers: top-level registry, server state machine, realm registry
//! - API facade: outward [`TopicBridge`] surface
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber. Binaries and
//! tests are responsible for one-time `tracing_subscriber` initialization at process
//! boundaries.

mod actor;
mod address;
mod api;
mod arguments;
mod component;
mod config;
mod error;
pub mod event_bus;
mod manager;
mod messages;
#[doc(hidden)]
pub mod observability;
pub mod transport;

pub use actor::{OwnerId, Recipient};
pub use address::ServerAddress;
pub use api::TopicBridge;
pub use arguments::{decode_arguments, Argument, ArgumentType, DecodeError};
pub use component::{PublicationRef, SubscriptionRef};
pub use config::{BridgeConfig, DEFAULT_ACTIVATION_TIMEOUT_MS, DEFAULT_ASK_TIMEOUT_MS};
pub use error::{BridgeError, EventBusError, TransportError};
pub use manager::{RealmCommand, RealmRef, ServerRef};
pub use messages::{
    Activate, ComponentError, ComponentFailure, ComponentOperation, Owner, OwnerNotification,
    PublishEvent, ReceivedEvent,
};
