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

use async_broadcast::{broadcast, InactiveReceiver, Sender, TrySendError};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use topic_bridge::event_bus::{Event, EventStream, Realm, TopicSubject};
use topic_bridge::EventBusError;
use tracing::{debug, trace};

pub const DEFAULT_TOPIC_CAPACITY: usize = 64;

/// In-memory topic: every subscriber gets its own broadcast receiver.
///
/// Slow subscribers lose the oldest events once `capacity` events are queued for them.
pub struct MemoryTopic {
    name: String,
    sender: Sender<Event>,
    // Keeps the channel open while nobody is subscribed.
    _idle: InactiveReceiver<Event>,
    rejection: Mutex<Option<String>>,
}

impl MemoryTopic {
    pub fn new(name: &str, capacity: usize) -> Self {
        let (mut sender, receiver) = broadcast(capacity.max(1));
        sender.set_overflow(true);
        Self {
            name: name.to_string(),
            sender,
            _idle: receiver.deactivate(),
            rejection: Mutex::new(None),
        }
    }

    /// Number of live subscriptions on this topic.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Makes every following publish fail with `reason`.
    pub fn reject_publishes(&self, reason: &str) {
        *self.rejection.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.to_string());
    }

    pub fn accept_publishes(&self) {
        *self.rejection.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Ends every subscription stream; later publishes fail.
    pub fn close(&self) {
        if self.sender.close() {
            debug!(topic = self.name.as_str(), "topic closed");
        }
    }
}

impl TopicSubject for MemoryTopic {
    fn topic(&self) -> &str {
        &self.name
    }

    fn publish(&self, event: Event) -> Result<(), EventBusError> {
        let rejection = self
            .rejection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(reason) = rejection {
            return Err(EventBusError::new(&self.name, reason));
        }

        match self.sender.try_broadcast(event) {
            Ok(_) => Ok(()),
            // Nobody is subscribed; the event is simply not delivered.
            Err(TrySendError::Inactive(_)) => {
                trace!(topic = self.name.as_str(), "no subscribers, event dropped");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(EventBusError::new(&self.name, "topic is closed")),
            Err(TrySendError::Full(_)) => Err(EventBusError::new(&self.name, "topic is full")),
        }
    }

    fn subscribe(&self) -> EventStream {
        self.sender.new_receiver().boxed()
    }
}

/// In-memory realm: a get-or-create container of [`MemoryTopic`]s.
pub struct MemoryRealm {
    name: String,
    capacity: usize,
    topics: Mutex<HashMap<String, Arc<MemoryTopic>>>,
}

impl MemoryRealm {
    pub fn new(name: &str, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            capacity,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the concrete topic `name`, creating it on first use.
    pub fn memory_topic(&self, name: &str) -> Arc<MemoryTopic> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(realm = self.name.as_str(), topic = name, "topic created");
                Arc::new(MemoryTopic::new(name, self.capacity))
            })
            .clone()
    }

    pub fn close(&self) {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        for topic in topics.values() {
            topic.close();
        }
    }
}

impl Realm for MemoryRealm {
    fn name(&self) -> &str {
        &self.name
    }

    fn topic(&self, topic: &str) -> Arc<dyn TopicSubject> {
        self.memory_topic(topic)
    }
}
