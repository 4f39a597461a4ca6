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


use crate::actor::{self, Children, Handle, Lifecycle, OwnerId};
use crate::address::ServerAddress;
use crate::arguments::ArgumentType;
use crate::component::{
    spawn_publication, spawn_subscription, PublicationArguments, PublicationRef,
    SubscriptionArguments, SubscriptionRef,
};
use crate::error::BridgeError;
use crate::event_bus::{Realm, TopicSubject};
use crate::messages::Owner;
use crate::observability::events;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COMPONENT: &str = "realm_manager";

/// Commands a realm manager answers. They may also be addressed to the server
/// manager, which forwards them to the named realm.
pub enum RealmCommand {
    Subscribe {
        topic: String,
        owner: Owner,
        argument_types: Vec<ArgumentType>,
        reply: RpcReplyPort<Result<SubscriptionRef, BridgeError>>,
    },
    Publisher {
        topic: String,
        owner: Owner,
        reply: RpcReplyPort<Result<PublicationRef, BridgeError>>,
    },
}

impl RealmCommand {
    /// Answers the requester with `err` instead of executing the command.
    pub(crate) fn reject(self, err: BridgeError) {
        match self {
            RealmCommand::Subscribe { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            RealmCommand::Publisher { reply, .. } => {
                let _ = reply.send(Err(err));
            }
        }
    }
}

impl Debug for RealmCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RealmCommand::Subscribe {
                topic,
                owner,
                argument_types,
                ..
            } => f
                .debug_struct("Subscribe")
                .field("topic", topic)
                .field("owner", owner)
                .field("argument_types", argument_types)
                .finish_non_exhaustive(),
            RealmCommand::Publisher { topic, owner, .. } => f
                .debug_struct("Publisher")
                .field("topic", topic)
                .field("owner", owner)
                .finish_non_exhaustive(),
        }
    }
}

/// Components are kept per topic and per owner: each owner gets its own component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ComponentKey {
    topic: String,
    owner: OwnerId,
}

/// Registry of the subscription and publication components of one realm.
pub(crate) struct RealmManagerDef;

pub(crate) struct RealmArguments {
    pub(crate) realm: Arc<dyn Realm>,
    pub(crate) activation_timeout: Duration,
}

pub(crate) struct RealmState {
    realm: Arc<dyn Realm>,
    activation_timeout: Duration,
    subjects: HashMap<String, Arc<dyn TopicSubject>>,
    subscriptions: HashMap<ComponentKey, SubscriptionRef>,
    publications: HashMap<ComponentKey, PublicationRef>,
    children: Children,
    lifecycle: Lifecycle,
}

impl RealmState {
    /// Forgets components that retired or terminated.
    fn prune(&mut self) {
        self.children.reap();
        self.subscriptions
            .retain(|_, subscription| subscription.is_alive());
        self.publications
            .retain(|_, publication| publication.is_alive());
    }

    fn subject(&mut self, topic: &str) -> Arc<dyn TopicSubject> {
        if let Some(subject) = self.subjects.get(topic) {
            return subject.clone();
        }

        let subject = self.realm.topic(topic);
        debug!(
            event = events::REALM_TOPIC_RESOLVED,
            component = COMPONENT,
            realm = self.realm.name(),
            topic,
            "resolved event-bus subject"
        );
        self.subjects.insert(topic.to_string(), subject.clone());
        subject
    }

    fn reused(&self, key: &ComponentKey, role: &'static str) {
        debug!(
            event = events::REALM_COMPONENT_REUSED,
            component = COMPONENT,
            realm = self.realm.name(),
            topic = key.topic.as_str(),
            role,
            "returning existing component"
        );
    }

    fn created(&self, key: &ComponentKey, role: &'static str) {
        info!(
            event = events::REALM_COMPONENT_CREATED,
            component = COMPONENT,
            realm = self.realm.name(),
            topic = key.topic.as_str(),
            role,
            "created component"
        );
    }

    async fn subscription(
        &mut self,
        topic: String,
        owner: Owner,
        argument_types: Vec<ArgumentType>,
    ) -> Result<SubscriptionRef, BridgeError> {
        BridgeError::ensure_not_blank("topic", &topic)?;
        BridgeError::ensure_argument_types(&argument_types)?;

        let key = ComponentKey {
            topic,
            owner: owner.id(),
        };
        if let Some(existing) = self.subscriptions.get(&key).filter(|s| s.is_alive()) {
            self.reused(&key, "subscription");
            return Ok(existing.clone());
        }

        self.prune();
        let (subscription, task) = spawn_subscription(SubscriptionArguments {
            subject: self.subject(&key.topic),
            owner,
            argument_types,
            activation_timeout: self.activation_timeout,
        })
        .await?;
        self.children.track(subscription.handle(), task);
        self.created(&key, "subscription");
        self.subscriptions.insert(key, subscription.clone());
        Ok(subscription)
    }

    async fn publication(
        &mut self,
        topic: String,
        owner: Owner,
    ) -> Result<PublicationRef, BridgeError> {
        BridgeError::ensure_not_blank("topic", &topic)?;

        let key = ComponentKey {
            topic,
            owner: owner.id(),
        };
        if let Some(existing) = self.publications.get(&key).filter(|p| p.is_alive()) {
            self.reused(&key, "publication");
            return Ok(existing.clone());
        }

        self.prune();
        let (publication, task) = spawn_publication(PublicationArguments {
            subject: self.subject(&key.topic),
            owner,
            activation_timeout: self.activation_timeout,
        })
        .await?;
        self.children.track(publication.handle(), task);
        self.created(&key, "publication");
        self.publications.insert(key, publication.clone());
        Ok(publication)
    }
}

impl Actor for RealmManagerDef {
    type Msg = RealmCommand;
    type State = RealmState;
    type Arguments = (RealmArguments, Lifecycle);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (args, lifecycle): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(RealmState {
            realm: args.realm,
            activation_timeout: args.activation_timeout,
            subjects: HashMap::new(),
            subscriptions: HashMap::new(),
            publications: HashMap::new(),
            children: Children::default(),
            lifecycle,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            RealmCommand::Subscribe {
                topic,
                owner,
                argument_types,
                reply,
            } => {
                let subscription = state.subscription(topic, owner, argument_types).await;
                let _ = reply.send(subscription);
            }
            RealmCommand::Publisher {
                topic,
                owner,
                reply,
            } => {
                let publication = state.publication(topic, owner).await;
                let _ = reply.send(publication);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.lifecycle.retire();
        state.children.stop_all().await;
        Ok(())
    }
}

/// Spawns the manager of the realm `name` on the server listening on `server`.
pub(crate) async fn spawn_realm(
    server: ServerAddress,
    name: &str,
    args: RealmArguments,
) -> Result<(RealmRef, JoinHandle<()>), BridgeError> {
    let (handle, task) =
        actor::spawn(&format!("realm-{name}"), RealmManagerDef, |lifecycle| {
            (args, lifecycle)
        })
        .await?;
    Ok((
        RealmRef {
            handle,
            server,
            name: Arc::from(name),
        },
        task,
    ))
}

/// Handle on a realm manager.
///
/// Realm references are only valid for one running period of their server: stopping
/// the server terminates the realm manager along with every component it created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RealmRef {
    handle: Handle<RealmCommand>,
    server: ServerAddress,
    name: Arc<str>,
}

impl RealmRef {
    pub(crate) fn handle(&self) -> &Handle<RealmCommand> {
        &self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn server(&self) -> &ServerAddress {
        &self.server
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Returns the subscription of `owner` to `topic`, creating it if there is no live
    /// one. Fails with [`BridgeError::InvalidArgument`] for a blank topic or an empty
    /// list of argument types.
    pub async fn subscribe(
        &self,
        topic: &str,
        owner: &Owner,
        argument_types: &[ArgumentType],
        timeout: Duration,
    ) -> Result<SubscriptionRef, BridgeError> {
        self.handle
            .ask(
                |reply| RealmCommand::Subscribe {
                    topic: topic.to_string(),
                    owner: owner.clone(),
                    argument_types: argument_types.to_vec(),
                    reply,
                },
                timeout,
            )
            .await?
    }

    /// Returns the publication of `owner` on `topic`, creating it if there is no live
    /// one. Fails with [`BridgeError::InvalidArgument`] for a blank topic.
    pub async fn publisher(
        &self,
        topic: &str,
        owner: &Owner,
        timeout: Duration,
    ) -> Result<PublicationRef, BridgeError> {
        self.handle
            .ask(
                |reply| RealmCommand::Publisher {
                    topic: topic.to_string(),
                    owner: owner.clone(),
                    reply,
                },
                timeout,
            )
            .await?
    }

    /// Hands `command` to the realm manager, answering the requester directly if the
    /// realm manager is gone.
    pub(crate) fn forward(&self, command: RealmCommand) {
        if let Err(Some(command)) = self.handle.try_tell(command) {
            command.reject(BridgeError::Undeliverable {
                target: self.handle.name().to_string(),
            });
        }
    }
}
