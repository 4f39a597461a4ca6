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

//! In-process hosting layer and event bus for `topic-bridge`.
//!
//! [`LoopbackHostFactory`] plugs into [`topic_bridge::TopicBridge`]: every server it
//! builds binds a real TCP port while running and serves realms made of in-memory
//! broadcast topics.

mod event_bus;
mod host;

pub use event_bus::{MemoryRealm, MemoryTopic, DEFAULT_TOPIC_CAPACITY};
pub use host::{LoopbackHost, LoopbackHostFactory};
