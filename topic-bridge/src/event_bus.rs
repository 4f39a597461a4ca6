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

//! Event-bus seam consumed by the subscription and publication components.
//!
//! The wire protocol behind a realm is opaque to the bridge: all it needs per topic is
//! somewhere to push events and a stream of incoming ones.

use crate::error::EventBusError;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;

/// One event as carried by the event bus: an ordered list of serialized arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub arguments: Vec<Value>,
}

impl Event {
    pub fn new(arguments: Vec<Value>) -> Self {
        Self { arguments }
    }
}

/// Stream of incoming events for one subscription. Dropping it disposes the
/// subscription on the event bus.
pub type EventStream = BoxStream<'static, Event>;

/// The event-bus subject for one topic, shared by every component on that topic.
pub trait TopicSubject: Send + Sync {
    fn topic(&self) -> &str;

    fn publish(&self, event: Event) -> Result<(), EventBusError>;

    fn subscribe(&self) -> EventStream;
}

/// A realm's topic container.
pub trait Realm: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the subject for `topic`, creating it on first use.
    fn topic(&self, topic: &str) -> Arc<dyn TopicSubject>;
}
