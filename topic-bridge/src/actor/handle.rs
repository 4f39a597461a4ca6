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


use super::lifecycle::{lifecycle, Lifecycle, Liveness};
use crate::error::BridgeError;
use crate::observability::events;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorCell, ActorRef, Message, MessagingErr, RpcReplyPort};
use std::fmt::{Debug, Formatter};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const COMPONENT: &str = "actor_handle";

/// Spawns `handler` as an unnamed `ractor` actor. `args` receives the actor's
/// [`Lifecycle`], which must end up in the actor state.
pub(crate) async fn spawn<A>(
    name: &str,
    handler: A,
    args: impl FnOnce(Lifecycle) -> A::Arguments,
) -> Result<(Handle<A::Msg>, JoinHandle<()>), BridgeError>
where
    A: Actor,
{
    let (lifecycle, liveness) = lifecycle(name);
    let (actor, task) = A::spawn(None, handler, args(lifecycle))
        .await
        .map_err(|err| BridgeError::SpawnFailed {
            target: name.to_string(),
            reason: err.to_string(),
        })?;

    debug!(
        event = events::ACTOR_STARTED,
        component = COMPONENT,
        actor = name,
        id = %actor.get_id(),
        "actor started"
    );
    Ok((Handle { actor, liveness }, task))
}

/// Address of one of the bridge's actors.
pub(crate) struct Handle<M: Message> {
    actor: ActorRef<M>,
    liveness: Liveness,
}

impl<M: Message> Handle<M> {
    pub(crate) fn id(&self) -> ractor::ActorId {
        self.actor.get_id()
    }

    pub(crate) fn name(&self) -> &str {
        self.liveness.name()
    }

    pub(crate) fn cell(&self) -> ActorCell {
        self.actor.get_cell()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    /// See [`Lifecycle::retire`].
    pub(crate) fn retire(&self) {
        self.liveness.retire();
    }

    /// Resolves once the actor has released its state.
    pub(crate) async fn terminated(&self) {
        self.liveness.terminated().await
    }

    /// Retires the actor and stops it after the handler in progress. Queued messages
    /// are dropped.
    pub(crate) fn stop(&self) {
        self.retire();
        self.actor.stop(None);
    }

    /// Enqueues `msg`. Fails once the actor has retired.
    pub(crate) fn tell(&self, msg: M) -> Result<(), BridgeError> {
        self.try_tell(msg).map_err(|_| self.undeliverable())
    }

    /// Like [`Handle::tell`], but hands the message back if it can be recovered.
    pub(crate) fn try_tell(&self, msg: M) -> Result<(), Option<M>> {
        if !self.is_alive() {
            return Err(Some(msg));
        }
        match self.actor.send_message(msg) {
            Ok(()) => Ok(()),
            Err(MessagingErr::SendErr(msg)) => Err(Some(msg)),
            Err(_) => Err(None),
        }
    }

    /// Sends the request built by `make_request` and waits up to `timeout` for the
    /// answer.
    ///
    /// A timeout is reported as [`BridgeError::AskTimeout`]; an actor that terminates
    /// without answering is reported as [`BridgeError::Undeliverable`].
    pub(crate) async fn ask<R>(
        &self,
        make_request: impl FnOnce(RpcReplyPort<R>) -> M,
        timeout: Duration,
    ) -> Result<R, BridgeError>
    where
        R: Send + 'static,
    {
        match self.actor.call(make_request, Some(timeout)).await {
            Ok(CallResult::Success(answer)) => Ok(answer),
            Ok(CallResult::Timeout) => Err(BridgeError::AskTimeout {
                target: self.name().to_string(),
                timeout,
            }),
            Ok(CallResult::SenderError) | Err(_) => Err(self.undeliverable()),
        }
    }

    fn undeliverable(&self) -> BridgeError {
        BridgeError::Undeliverable {
            target: self.name().to_string(),
        }
    }
}

impl<M: Message> Clone for Handle<M> {
    fn clone(&self) -> Self {
        Self {
            actor: self.actor.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<M: Message> PartialEq for Handle<M> {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<M: Message> Eq for Handle<M> {}

impl<M: Message> Debug for Handle<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{spawn, Handle};
    use crate::actor::Lifecycle;
    use crate::error::BridgeError;
    use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
    use std::time::Duration;

    enum CounterMsg {
        Add(u64),
        Get(RpcReplyPort<u64>),
        Ignore(RpcReplyPort<u64>),
        Stall(RpcReplyPort<()>),
    }

    struct CounterActorDef;

    struct CounterState {
        total: u64,
        _lifecycle: Lifecycle,
    }

    impl Actor for CounterActorDef {
        type Msg = CounterMsg;
        type State = CounterState;
        type Arguments = Lifecycle;

        async fn pre_start(
            &self,
            _myself: ActorRef<Self::Msg>,
            lifecycle: Lifecycle,
        ) -> Result<Self::State, ActorProcessingErr> {
            Ok(CounterState {
                total: 0,
                _lifecycle: lifecycle,
            })
        }

        async fn handle(
            &self,
            _myself: ActorRef<Self::Msg>,
            message: Self::Msg,
            state: &mut Self::State,
        ) -> Result<(), ActorProcessingErr> {
            match message {
                CounterMsg::Add(n) => state.total += n,
                CounterMsg::Get(reply) => {
                    let _ = reply.send(state.total);
                }
                CounterMsg::Ignore(_reply) => {}
                CounterMsg::Stall(reply) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    let _ = reply.send(());
                }
            }
            Ok(())
        }
    }

    const ASK: Duration = Duration::from_secs(1);

    async fn counter() -> Handle<CounterMsg> {
        let (counter, _task) = spawn("counter", CounterActorDef, |lifecycle| lifecycle)
            .await
            .unwrap();
        counter
    }

    #[tokio::test]
    async fn messages_from_one_sender_are_handled_in_order() {
        let counter = counter().await;

        for n in 1..=10 {
            counter.tell(CounterMsg::Add(n)).unwrap();
        }

        assert_eq!(counter.ask(CounterMsg::Get, ASK).await.unwrap(), 55);
    }

    #[tokio::test]
    async fn stopped_actor_terminates_and_rejects_later_messages() {
        let counter = counter().await;
        let clone = counter.clone();

        counter.stop();
        counter.terminated().await;

        assert!(!clone.is_alive());
        assert!(matches!(
            clone.tell(CounterMsg::Add(1)),
            Err(BridgeError::Undeliverable { ref target }) if target == "counter"
        ));
    }

    #[tokio::test]
    async fn retired_actor_refuses_messages_while_still_running() {
        let counter = counter().await;

        counter.retire();

        assert!(!counter.is_alive());
        assert!(matches!(
            counter.try_tell(CounterMsg::Add(1)),
            Err(Some(CounterMsg::Add(1)))
        ));
        // The mailbox is still served for requests already addressed to it.
        assert_eq!(counter.ask(CounterMsg::Get, ASK).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dropped_reply_reads_as_undeliverable() {
        let counter = counter().await;

        let result = counter.ask(CounterMsg::Ignore, ASK).await;

        assert!(matches!(result, Err(BridgeError::Undeliverable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn ask_to_busy_actor_reports_timeout() {
        let counter = counter().await;

        let result = counter.ask(CounterMsg::Stall, ASK).await;

        assert!(matches!(
            result,
            Err(BridgeError::AskTimeout { ref target, timeout }) if target == "counter" && timeout == ASK
        ));
    }
}
