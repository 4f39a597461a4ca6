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


use super::activation::{ActivationHandshake, TimeoutOutcome};
use crate::actor::{self, send_after, Handle, Lifecycle};
use crate::arguments::{decode_arguments, ArgumentType};
use crate::error::BridgeError;
use crate::event_bus::{Event, TopicSubject};
use crate::messages::{Activate, ComponentOperation, Owner, OwnerNotification, ReceivedEvent};
use crate::observability::{events, fields};
use futures::StreamExt;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

const COMPONENT: &str = "subscription";

pub(crate) enum SubscriptionMsg {
    Activate(Activate),
    ActivationTimeout,
    Incoming(Event),
    StreamEnded,
    Unsubscribe,
}

/// Live event-bus subscription. Releasing it aborts the forwarding task, which drops
/// the event stream and with it the subscription on the event bus.
struct SubscriptionGuard {
    topic: String,
    forwarder: Option<JoinHandle<()>>,
}

impl SubscriptionGuard {
    fn dispose(&mut self) -> Option<JoinHandle<()>> {
        let forwarder = self.forwarder.take()?;
        forwarder.abort();
        debug!(
            event = events::SUBSCRIPTION_DISPOSED,
            component = COMPONENT,
            topic = self.topic.as_str(),
            "event-bus subscription disposed"
        );
        Some(forwarder)
    }

    /// Disposes the subscription and waits until the event stream has been dropped.
    async fn release(mut self) {
        if let Some(forwarder) = self.dispose() {
            let _ = forwarder.await;
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}

/// Forwards events of one topic to the owner, decoded against fixed argument types.
///
/// The event-bus subscription is opened on activation, never earlier, and released on
/// every exit path.
pub(crate) struct SubscriptionActorDef;

pub(crate) struct SubscriptionArguments {
    pub(crate) subject: Arc<dyn TopicSubject>,
    pub(crate) owner: Owner,
    pub(crate) argument_types: Vec<ArgumentType>,
    pub(crate) activation_timeout: Duration,
}

pub(crate) struct SubscriptionState {
    handshake: ActivationHandshake,
    subject: Arc<dyn TopicSubject>,
    argument_types: Vec<ArgumentType>,
    subscription: Option<SubscriptionGuard>,
    // Last, so it is released after the event stream.
    lifecycle: Lifecycle,
}

impl SubscriptionState {
    fn open_subscription(&mut self, myself: &ActorRef<SubscriptionMsg>) {
        let mut stream = self.subject.subscribe();
        let mailbox = myself.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                if mailbox
                    .send_message(SubscriptionMsg::Incoming(event))
                    .is_err()
                {
                    return;
                }
            }
            let _ = mailbox.send_message(SubscriptionMsg::StreamEnded);
        });

        self.subscription = Some(SubscriptionGuard {
            topic: self.handshake.topic().to_string(),
            forwarder: Some(forwarder),
        });
    }

    fn deliver(&self, event: Event) {
        match decode_arguments(&self.argument_types, &event.arguments) {
            Ok(arguments) => {
                trace!(
                    event = events::SUBSCRIPTION_EVENT_FORWARDED,
                    component = COMPONENT,
                    topic = self.handshake.topic(),
                    arguments = %fields::format_arguments(&event.arguments),
                    "forwarding event to owner"
                );
                self.handshake
                    .notify_owner(OwnerNotification::Received(ReceivedEvent {
                        topic: self.handshake.topic().to_string(),
                        arguments,
                    }));
            }
            Err(err) => self
                .handshake
                .notify_error(ComponentOperation::ReceiveEvent, err.into()),
        }
    }

    fn terminate(&mut self, myself: &ActorRef<SubscriptionMsg>) {
        self.lifecycle.retire();
        self.handshake.stop();
        myself.stop(None);
    }
}

impl Actor for SubscriptionActorDef {
    type Msg = SubscriptionMsg;
    type State = SubscriptionState;
    type Arguments = (SubscriptionArguments, Lifecycle);

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        (args, lifecycle): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let mut handshake = ActivationHandshake::new(COMPONENT, args.subject.topic(), args.owner);
        handshake.arm(send_after(&myself, args.activation_timeout, || {
            SubscriptionMsg::ActivationTimeout
        }));

        Ok(SubscriptionState {
            handshake,
            subject: args.subject,
            argument_types: args.argument_types,
            subscription: None,
            lifecycle,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SubscriptionMsg::Activate(activate) => {
                if state.handshake.on_activate(activate) {
                    state.open_subscription(&myself);
                }
            }
            SubscriptionMsg::ActivationTimeout => {
                if state.handshake.on_timeout() == TimeoutOutcome::Stop {
                    state.terminate(&myself);
                }
            }
            SubscriptionMsg::Incoming(event) => {
                if state.handshake.is_active() {
                    state.deliver(event);
                }
            }
            SubscriptionMsg::StreamEnded => {
                info!(
                    event = events::SUBSCRIPTION_STREAM_ENDED,
                    component = COMPONENT,
                    topic = state.handshake.topic(),
                    "event stream completed, stopping subscription"
                );
                state.terminate(&myself);
            }
            SubscriptionMsg::Unsubscribe => {
                debug!(
                    event = events::SUBSCRIPTION_TERMINATED,
                    component = COMPONENT,
                    topic = state.handshake.topic(),
                    "unsubscribed by owner"
                );
                state.terminate(&myself);
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
        state.handshake.stop();
        if let Some(subscription) = state.subscription.take() {
            subscription.release().await;
        }
        Ok(())
    }
}

/// Spawns a subscription component waiting for its owner.
pub(crate) async fn spawn_subscription(
    args: SubscriptionArguments,
) -> Result<(SubscriptionRef, JoinHandle<()>), BridgeError> {
    let topic = args.subject.topic().to_string();
    let (handle, task) = actor::spawn(
        &format!("subscription-{topic}"),
        SubscriptionActorDef,
        |lifecycle| (args, lifecycle),
    )
    .await?;
    Ok((
        SubscriptionRef {
            handle,
            topic: Arc::from(topic.as_str()),
        },
        task,
    ))
}

/// Handle on a subscription component, returned to the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionRef {
    handle: Handle<SubscriptionMsg>,
    topic: Arc<str>,
}

impl SubscriptionRef {
    pub(crate) fn handle(&self) -> &Handle<SubscriptionMsg> {
        &self.handle
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Claims the subscription for `owner`. Events start flowing only after this.
    pub fn activate(&self, owner: &Owner, error_notifications: bool) -> Result<(), BridgeError> {
        self.handle.tell(SubscriptionMsg::Activate(Activate {
            by: owner.id(),
            error_notifications,
        }))
    }

    /// Ends the subscription. From here on the component counts as dead, so the next
    /// request for the same topic and owner creates a new one.
    pub fn unsubscribe(&self) -> Result<(), BridgeError> {
        let sent = self.handle.tell(SubscriptionMsg::Unsubscribe);
        self.handle.retire();
        sent
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Resolves once the component has terminated and released its subscription.
    pub async fn terminated(&self) {
        self.handle.terminated().await
    }
}
