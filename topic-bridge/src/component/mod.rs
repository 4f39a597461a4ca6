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

//! Topic components owned by a single owner: subscriptions deliver events to it,
//! publications push its events to the event bus.

mod activation;
mod publication;
mod subscription;

pub(crate) use publication::{spawn_publication, PublicationArguments};
pub use publication::PublicationRef;
pub(crate) use subscription::{spawn_subscription, SubscriptionArguments};
pub use subscription::SubscriptionRef;
