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


use crate::error::BridgeError;
use ractor::{ActorRef, Message};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of the owner of a component.
///
/// Recipients built from the same actor share its identity; every channel-backed
/// recipient gets a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerId(Source);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Source {
    Channel(Uuid),
    Actor(ractor::ActorId),
}

impl OwnerId {
    pub fn new() -> Self {
        Self(Source::Channel(Uuid::new_v4()))
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ractor::ActorId> for OwnerId {
    fn from(id: ractor::ActorId) -> Self {
        Self(Source::Actor(id))
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Source::Channel(id) => write!(f, "{}", id.simple()),
            Source::Actor(id) => write!(f, "actor-{id}"),
        }
    }
}

/// Identity-carrying address for anything that accepts `M`.
///
/// Owners of components are addressed through a recipient, so an owner may be a
/// `ractor` actor of any message type or, outside of actors, a plain channel.
pub struct Recipient<M> {
    id: OwnerId,
    name: Arc<str>,
    deliver: Arc<dyn Fn(M) -> bool + Send + Sync>,
}

impl<M: Send + 'static> Recipient<M> {
    /// Address backed by an unbounded channel, with a fresh identity.
    pub fn from_channel(name: &str, sender: mpsc::UnboundedSender<M>) -> Self {
        Self {
            id: OwnerId::new(),
            name: Arc::from(name),
            deliver: Arc::new(move |msg: M| sender.send(msg).is_ok()),
        }
    }

    /// Address of an actor whose messages can be built from `M`.
    pub fn from_actor<T>(name: &str, actor: &ActorRef<T>) -> Self
    where
        T: Message + From<M>,
    {
        let actor = actor.clone();
        Self {
            id: OwnerId::from(actor.get_id()),
            name: Arc::from(name),
            deliver: Arc::new(move |msg: M| actor.send_message(T::from(msg)).is_ok()),
        }
    }

    pub fn id(&self) -> OwnerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tell(&self, msg: M) -> Result<(), BridgeError> {
        if (self.deliver)(msg) {
            Ok(())
        } else {
            Err(BridgeError::Undeliverable {
                target: self.name.to_string(),
            })
        }
    }
}

impl<M> Clone for Recipient<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            deliver: self.deliver.clone(),
        }
    }
}

impl<M> Debug for Recipient<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipient")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
