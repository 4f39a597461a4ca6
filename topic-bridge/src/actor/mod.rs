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


//! Thin layer over `ractor`.
//!
//! Every manager and component is a `ractor` actor: one task owning its state and
//! draining one mailbox, so at most one handler per actor runs at any instant and
//! messages from one sender arrive in send order. This module adds what the rest of
//! the crate needs on top:
//!
//! - [`Handle`]: an `ActorRef` paired with a lifecycle view, with `tell`/`ask` mapped
//!   onto [`BridgeError`](crate::BridgeError) and a retired state that is visible
//!   before the mailbox closes
//! - [`Recipient`]: identity-carrying owner addresses ([`OwnerId`])
//! - cancellable delayed self-messages ([`send_after`])
//! - [`Children`]: actors a manager spawned, stopped and awaited on teardown

mod children;
mod handle;
mod lifecycle;
mod recipient;
mod scheduler;

pub(crate) use children::Children;
pub(crate) use handle::{spawn, Handle};
pub(crate) use lifecycle::Lifecycle;
pub use recipient::{OwnerId, Recipient};
pub use scheduler::Cancelable;
pub(crate) use scheduler::send_after;
#[cfg(test)]
pub(crate) use scheduler::run_after;
