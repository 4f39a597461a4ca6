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
use crate::error::BridgeError;
use crate::event_bus::{Event, TopicSubject};
use crate::messages::{Activate, ComponentOperation, Owner, PublishEvent};
use crate::observability::{events, fields};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

const COMPONENT: &str = "publication";

pub(crate) enum PublicationMsg {
    Activate(Activate),
    ActivationTimeout,
    Publish(PublishEvent),
    Stop,
}

/// Pushes the owner's events to one topic. A failed publish is reported and the
/// component keeps accepting further events.
pub(crate) struct PublicationActorDef;

pub(crate) struct PublicationArguments {
    pub(crate) subject: Arc<dyn TopicSubject>,
    pub(crate) owner: Owner,
    pub(crate) activation_timeout: Duration,
}

pub(crate) struct PublicationState {
    handshake: ActivationHandshake,
    subject: Arc<dyn TopicSubject>,
    lifecycle: Lifecycle,
}

impl PublicationState {
    fn publish(&self, event: PublishEvent) {
        let arguments = event.into_arguments();
        let rendered = fields::format_arguments(&arguments);

        match self.subject.publish(Event::new(arguments)) {
            Ok(()) => trace!(
                event = events::PUBLICATION_EVENT_SENT,
                component = COMPONENT,
                topic = self.handshake.topic(),
                arguments = %rendered,
                "event published"
            ),
            Err(err) => self
                .handshake
                .notify_error(ComponentOperation::SendEvent, err.into()),
        }
    }
}

impl Actor for PublicationActorDef {
    type Msg = PublicationMsg;
    type State = PublicationState;
    type Arguments = (PublicationArguments, Lifecycle);

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        (args, lifecycle): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        let mut handshake = ActivationHandshake::new(COMPONENT, args.subject.topic(), args.owner);
        handshake.arm(send_after(&myself, args.activation_timeout, || {
            PublicationMsg::ActivationTimeout
        }));

        Ok(PublicationState {
            handshake,
            subject: args.subject,
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
            PublicationMsg::Activate(activate) => {
                state.handshake.on_activate(activate);
            }
            PublicationMsg::ActivationTimeout => {
                if state.handshake.on_timeout() == TimeoutOutcome::Stop {
                    state.lifecycle.retire();
                    myself.stop(None);
                }
            }
            PublicationMsg::Publish(event) => {
                if state.handshake.is_active() {
                    state.publish(event);
                } else {
                    debug!(
                        event = events::COMPONENT_MESSAGE_IGNORED,
                        component = COMPONENT,
                        topic = state.handshake.topic(),
                        phase = ?state.handshake.phase(),
                        "dropping publish request received before activation"
                    );
                }
            }
            PublicationMsg::Stop => {
                state.lifecycle.retire();
                state.handshake.stop();
                myself.stop(None);
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
        Ok(())
    }
}

/// Spawns a publication component waiting for its owner.
pub(crate) async fn spawn_publication(
    args: PublicationArguments,
) -> Result<(PublicationRef, JoinHandle<()>), BridgeError> {
    let topic = args.subject.topic().to_string();
    let (handle, task) = actor::spawn(
        &format!("publication-{topic}"),
        PublicationActorDef,
        |lifecycle| (args, lifecycle),
    )
    .await?;
    Ok((
        PublicationRef {
            handle,
            topic: Arc::from(topic.as_str()),
        },
        task,
    ))
}

/// Handle on a publication component, returned to the requester.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicationRef {
    handle: Handle<PublicationMsg>,
    topic: Arc<str>,
}

impl PublicationRef {
    pub(crate) fn handle(&self) -> &Handle<PublicationMsg> {
        &self.handle
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Claims the publication for `owner`. Publish requests are dropped until then.
    pub fn activate(&self, owner: &Owner, error_notifications: bool) -> Result<(), BridgeError> {
        self.handle.tell(PublicationMsg::Activate(Activate {
            by: owner.id(),
            error_notifications,
        }))
    }

    pub fn publish(&self, event: PublishEvent) -> Result<(), BridgeError> {
        self.handle.tell(PublicationMsg::Publish(event))
    }

    /// Ends the publication. Like [`SubscriptionRef::unsubscribe`], the component
    /// counts as dead from here on.
    ///
    /// [`SubscriptionRef::unsubscribe`]: crate::SubscriptionRef::unsubscribe
    pub fn stop(&self) -> Result<(), BridgeError> {
        let sent = self.handle.tell(PublicationMsg::Stop);
        self.handle.retire();
        sent
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    pub async fn terminated(&self) {
        self.handle.terminated().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Recipient;
    use crate::error::EventBusError;
    use crate::event_bus::EventStream;
    use crate::messages::{ComponentFailure, OwnerNotification};
    use futures::stream::{self, StreamExt};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Records every accepted event; rejects while `failing` is set.
    #[derive(Default)]
    struct RecordingSink {
        accepted: Mutex<Vec<Vec<Value>>>,
        failing: AtomicBool,
    }

    impl RecordingSink {
        fn accepted(&self) -> Vec<Vec<Value>> {
            self.accepted.lock().unwrap().clone()
        }
    }

    impl TopicSubject for RecordingSink {
        fn topic(&self) -> &str {
            "orders"
        }

        fn publish(&self, event: Event) -> Result<(), EventBusError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(EventBusError::new("orders", "sink unavailable"));
            }
            self.accepted.lock().unwrap().push(event.arguments);
            Ok(())
        }

        fn subscribe(&self) -> EventStream {
            stream::empty().boxed()
        }
    }

    fn owner() -> (Owner, mpsc::UnboundedReceiver<OwnerNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Recipient::from_channel("owner", tx), rx)
    }

    async fn start(sink: &Arc<RecordingSink>, owner: &Owner) -> PublicationRef {
        let (publication, _task) = spawn_publication(PublicationArguments {
            subject: sink.clone(),
            owner: owner.clone(),
            activation_timeout: Duration::from_secs(5),
        })
        .await
        .unwrap();
        publication
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn event(value: Value) -> PublishEvent {
        PublishEvent::new(vec![value]).unwrap()
    }

    #[tokio::test]
    async fn publish_before_activation_is_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let (owner, _rx) = owner();
        let publication = start(&sink, &owner).await;

        publication.publish(event(json!(1))).unwrap();
        publication.activate(&owner, false).unwrap();
        publication.publish(event(json!(2))).unwrap();
        settle().await;

        assert_eq!(sink.accepted(), vec![vec![json!(2)]]);
    }

    #[tokio::test]
    async fn failed_publish_is_silent_without_opt_in() {
        let sink = Arc::new(RecordingSink::default());
        let (owner, mut rx) = owner();
        let publication = start(&sink, &owner).await;
        publication.activate(&owner, false).unwrap();

        sink.failing.store(true, Ordering::SeqCst);
        publication.publish(event(json!("lost"))).unwrap();
        settle().await;
        sink.failing.store(false, Ordering::SeqCst);
        publication.publish(event(json!("kept"))).unwrap();
        settle().await;

        assert!(rx.try_recv().is_err());
        assert_eq!(sink.accepted(), vec![vec![json!("kept")]]);
        assert!(publication.is_alive());
    }

    #[tokio::test]
    async fn failed_publish_reaches_opted_in_owner() {
        let sink = Arc::new(RecordingSink::default());
        sink.failing.store(true, Ordering::SeqCst);
        let (owner, mut rx) = owner();
        let publication = start(&sink, &owner).await;
        publication.activate(&owner, true).unwrap();

        publication.publish(event(json!(3))).unwrap();

        match rx.recv().await {
            Some(OwnerNotification::Error(err)) => {
                assert_eq!(err.topic, "orders");
                assert_eq!(err.operation, ComponentOperation::SendEvent);
                assert!(matches!(err.failure, ComponentFailure::Publish(_)));
            }
            other => panic!("expected an error notification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_terminates_the_publication() {
        let sink = Arc::new(RecordingSink::default());
        let (owner, _rx) = owner();
        let publication = start(&sink, &owner).await;
        publication.activate(&owner, false).unwrap();

        publication.stop().unwrap();
        assert!(!publication.is_alive());
        publication.terminated().await;

        assert!(publication.publish(event(json!(4))).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn unactivated_publication_stops_after_timeout() {
        let sink = Arc::new(RecordingSink::default());
        let (owner, _rx) = owner();
        let publication = start(&sink, &owner).await;

        tokio::time::sleep(Duration::from_secs(6)).await;
        publication.terminated().await;

        assert!(!publication.is_alive());
    }
}
