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


use super::realm::{spawn_realm, RealmArguments, RealmCommand, RealmRef};
use crate::actor::{self, Children, Handle, Lifecycle};
use crate::address::ServerAddress;
use crate::error::BridgeError;
use crate::observability::events;
use crate::transport::ServerTransport;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "server_manager";

pub(crate) enum ServerCommand {
    Start(RpcReplyPort<Result<(), BridgeError>>),
    Stop(RpcReplyPort<Result<(), BridgeError>>),
    GetRealm {
        name: String,
        reply: RpcReplyPort<Result<RealmRef, BridgeError>>,
    },
    /// Forwarded to the named realm, which is created if needed.
    Realm { realm: String, command: RealmCommand },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunState {
    Stopped,
    Running,
}

/// Owns one transport and the realm managers of its current running period.
pub(crate) struct ServerManagerDef;

pub(crate) struct ServerArguments {
    pub(crate) transport: Box<dyn ServerTransport>,
    pub(crate) activation_timeout: Duration,
}

pub(crate) struct ServerManagerState {
    transport: Box<dyn ServerTransport>,
    activation_timeout: Duration,
    run_state: RunState,
    realms: HashMap<String, RealmRef>,
    children: Children,
    lifecycle: Lifecycle,
}

impl ServerManagerState {
    fn address(&self) -> &ServerAddress {
        self.transport.address()
    }

    fn rejected(&self, err: BridgeError, request: &'static str) -> BridgeError {
        debug!(
            event = events::SERVER_REQUEST_REJECTED,
            component = COMPONENT,
            address = %self.address(),
            request,
            state = ?self.run_state,
            reason = %err,
            "request rejected"
        );
        err
    }

    async fn start(&mut self) -> Result<(), BridgeError> {
        if self.run_state == RunState::Running {
            let err = BridgeError::AlreadyRunning(self.address().clone());
            return Err(self.rejected(err, "start"));
        }

        match self.transport.start().await {
            Ok(()) => {
                self.run_state = RunState::Running;
                info!(
                    event = events::SERVER_STARTED,
                    component = COMPONENT,
                    address = %self.address(),
                    "server started"
                );
                Ok(())
            }
            Err(source) => {
                error!(
                    event = events::SERVER_START_FAILED,
                    component = COMPONENT,
                    address = %self.address(),
                    err = %source,
                    "server failed to start"
                );
                Err(BridgeError::StartFailed {
                    address: self.address().clone(),
                    source,
                })
            }
        }
    }

    async fn stop(&mut self) -> Result<(), BridgeError> {
        if self.run_state == RunState::Stopped {
            let err = BridgeError::NotRunning(self.address().clone());
            return Err(self.rejected(err, "stop"));
        }

        if let Err(source) = self.transport.stop().await {
            error!(
                event = events::SERVER_STOP_FAILED,
                component = COMPONENT,
                address = %self.address(),
                err = %source,
                "server failed to stop, keeping it running"
            );
            return Err(BridgeError::StopFailed {
                address: self.address().clone(),
                source,
            });
        }

        self.run_state = RunState::Stopped;
        let realms: Vec<ractor::ActorId> = self
            .realms
            .drain()
            .map(|(_, realm)| realm.handle().id())
            .collect();
        for realm in realms {
            self.children.stop(realm).await;
        }
        info!(
            event = events::SERVER_STOPPED,
            component = COMPONENT,
            address = %self.address(),
            "server stopped"
        );
        Ok(())
    }

    async fn realm(&mut self, name: &str) -> Result<RealmRef, BridgeError> {
        if let Err(err) = BridgeError::ensure_not_blank("realm", name) {
            return Err(self.rejected(err, "realm"));
        }
        if self.run_state == RunState::Stopped {
            let err = BridgeError::NotRunning(self.address().clone());
            return Err(self.rejected(err, "realm"));
        }

        if let Some(realm) = self.realms.get(name).filter(|realm| realm.is_alive()) {
            return Ok(realm.clone());
        }

        let container =
            self.transport
                .realm(name)
                .map_err(|source| BridgeError::RealmUnavailable {
                    address: self.address().clone(),
                    realm: name.to_string(),
                    source,
                })?;

        self.children.reap();
        let (realm, task) = spawn_realm(
            self.address().clone(),
            name,
            RealmArguments {
                realm: container,
                activation_timeout: self.activation_timeout,
            },
        )
        .await?;
        self.children.track(realm.handle(), task);
        info!(
            event = events::SERVER_REALM_CREATED,
            component = COMPONENT,
            address = %self.address(),
            realm = name,
            "realm manager created"
        );
        self.realms.insert(name.to_string(), realm.clone());
        Ok(realm)
    }

    async fn dispose(&mut self) {
        if !self.transport.is_running() {
            return;
        }

        match self.transport.stop().await {
            Ok(()) => debug!(
                event = events::SERVER_TRANSPORT_DISPOSED,
                component = COMPONENT,
                address = %self.address(),
                "transport disposed on teardown"
            ),
            Err(err) => warn!(
                event = events::SERVER_TRANSPORT_DISPOSED,
                component = COMPONENT,
                address = %self.address(),
                err = %err,
                "transport failed to stop on teardown"
            ),
        }
    }
}

impl Actor for ServerManagerDef {
    type Msg = ServerCommand;
    type State = ServerManagerState;
    type Arguments = (ServerArguments, Lifecycle);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (args, lifecycle): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(ServerManagerState {
            transport: args.transport,
            activation_timeout: args.activation_timeout,
            run_state: RunState::Stopped,
            realms: HashMap::new(),
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
            ServerCommand::Start(reply) => {
                let _ = reply.send(state.start().await);
            }
            ServerCommand::Stop(reply) => {
                let _ = reply.send(state.stop().await);
            }
            ServerCommand::GetRealm { name, reply } => {
                let _ = reply.send(state.realm(&name).await);
            }
            ServerCommand::Realm { realm, command } => match state.realm(&realm).await {
                Ok(realm) => realm.forward(command),
                Err(err) => command.reject(err),
            },
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.lifecycle.retire();
        state.realms.clear();
        state.children.stop_all().await;
        state.dispose().await;
        Ok(())
    }
}

/// Spawns the server manager owning `transport`, initially stopped.
pub(crate) async fn spawn_server(
    args: ServerArguments,
) -> Result<(ServerRef, JoinHandle<()>), BridgeError> {
    let address = args.transport.address().clone();
    let (handle, task) =
        actor::spawn(&format!("server-{address}"), ServerManagerDef, |lifecycle| {
            (args, lifecycle)
        })
        .await?;
    Ok((ServerRef { handle, address }, task))
}

/// Handle on the server manager of one endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerRef {
    handle: Handle<ServerCommand>,
    address: ServerAddress,
}

impl ServerRef {
    pub(crate) fn handle(&self) -> &Handle<ServerCommand> {
        &self.handle
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    pub async fn start(&self, timeout: Duration) -> Result<(), BridgeError> {
        self.handle.ask(ServerCommand::Start, timeout).await?
    }

    pub async fn stop(&self, timeout: Duration) -> Result<(), BridgeError> {
        self.handle.ask(ServerCommand::Stop, timeout).await?
    }

    /// Returns the realm manager for `name`. Fails with
    /// [`BridgeError::InvalidArgument`] for a blank name and with
    /// [`BridgeError::NotRunning`] while the server is stopped.
    pub async fn realm(&self, name: &str, timeout: Duration) -> Result<RealmRef, BridgeError> {
        self.handle
            .ask(
                |reply| ServerCommand::GetRealm {
                    name: name.to_string(),
                    reply,
                },
                timeout,
            )
            .await?
    }

    /// Sends `command` to the realm `realm` through the server manager. The command's
    /// reply port is answered with a rejection if the realm name is blank or the
    /// server is not running.
    pub fn realm_command(&self, realm: &str, command: RealmCommand) -> Result<(), BridgeError> {
        self.handle.tell(ServerCommand::Realm {
            realm: realm.to_string(),
            command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Recipient;
    use crate::arguments::ArgumentType;
    use crate::error::{EventBusError, TransportError};
    use crate::event_bus::{Event, EventStream, Realm, TopicSubject};
    use crate::messages::Owner;
    use async_trait::async_trait;
    use futures::stream::{self, StreamExt};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{mpsc, oneshot};

    struct NullSubject;

    impl TopicSubject for NullSubject {
        fn topic(&self) -> &str {
            "null"
        }

        fn publish(&self, _event: Event) -> Result<(), EventBusError> {
            Ok(())
        }

        fn subscribe(&self) -> EventStream {
            stream::pending().boxed()
        }
    }

    struct NullRealm;

    impl Realm for NullRealm {
        fn name(&self) -> &str {
            "null"
        }

        fn topic(&self, _topic: &str) -> Arc<dyn TopicSubject> {
            Arc::new(NullSubject)
        }
    }

    /// Transport whose failures are switched on by the test.
    #[derive(Default)]
    struct Switches {
        running: AtomicBool,
        fail_start: AtomicBool,
        fail_stop: AtomicBool,
        stops: AtomicUsize,
        realms_opened: AtomicUsize,
    }

    struct ScriptedTransport {
        address: ServerAddress,
        switches: Arc<Switches>,
    }

    #[async_trait]
    impl ServerTransport for ScriptedTransport {
        fn address(&self) -> &ServerAddress {
            &self.address
        }

        fn is_running(&self) -> bool {
            self.switches.running.load(Ordering::SeqCst)
        }

        async fn start(&mut self) -> Result<(), TransportError> {
            if self.switches.fail_start.load(Ordering::SeqCst) {
                return Err(TransportError::Other("address in use".to_string()));
            }
            self.switches.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), TransportError> {
            if self.switches.fail_stop.load(Ordering::SeqCst) {
                return Err(TransportError::Other("listener stuck".to_string()));
            }
            self.switches.stops.fetch_add(1, Ordering::SeqCst);
            self.switches.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn realm(&self, _name: &str) -> Result<Arc<dyn Realm>, TransportError> {
            self.switches.realms_opened.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NullRealm))
        }
    }

    const ASK: Duration = Duration::from_secs(1);

    async fn server() -> (ServerRef, Arc<Switches>, JoinHandle<()>) {
        let address = ServerAddress::parse("ws://localhost:19929").unwrap();
        let switches = Arc::new(Switches::default());
        let transport = ScriptedTransport {
            address,
            switches: switches.clone(),
        };
        let (server, task) = spawn_server(ServerArguments {
            transport: Box::new(transport),
            activation_timeout: Duration::from_secs(5),
        })
        .await
        .unwrap();
        (server, switches, task)
    }

    fn owner() -> Owner {
        let (tx, _rx) = mpsc::unbounded_channel();
        Recipient::from_channel("owner", tx)
    }

    #[tokio::test]
    async fn lifecycle_requests_in_the_wrong_state_are_rejected() {
        let (server, _switches, _task) = server().await;

        assert!(matches!(
            server.stop(ASK).await,
            Err(BridgeError::NotRunning(_))
        ));
        assert!(matches!(
            server.realm("default", ASK).await,
            Err(BridgeError::NotRunning(_))
        ));

        server.start(ASK).await.unwrap();
        assert!(matches!(
            server.start(ASK).await,
            Err(BridgeError::AlreadyRunning(_))
        ));
        server.stop(ASK).await.unwrap();
    }

    #[tokio::test]
    async fn failed_start_stays_stopped() {
        let (server, switches, _task) = server().await;
        switches.fail_start.store(true, Ordering::SeqCst);

        let err = server.start(ASK).await.unwrap_err();
        assert!(matches!(err, BridgeError::StartFailed { .. }));
        assert!(err.to_string().contains("ws://localhost:19929"));

        assert!(matches!(
            server.realm("default", ASK).await,
            Err(BridgeError::NotRunning(_))
        ));
        switches.fail_start.store(false, Ordering::SeqCst);
        server.start(ASK).await.unwrap();
    }

    #[tokio::test]
    async fn failed_stop_stays_running() {
        let (server, switches, _task) = server().await;
        server.start(ASK).await.unwrap();
        let realm = server.realm("default", ASK).await.unwrap();
        switches.fail_stop.store(true, Ordering::SeqCst);

        assert!(matches!(
            server.stop(ASK).await,
            Err(BridgeError::StopFailed { .. })
        ));
        assert_eq!(server.realm("default", ASK).await.unwrap(), realm);
    }

    #[tokio::test]
    async fn stop_discards_realms_and_restart_creates_fresh_ones() {
        let (server, _switches, _task) = server().await;
        server.start(ASK).await.unwrap();
        let first = server.realm("default", ASK).await.unwrap();
        assert_eq!(server.realm("default", ASK).await.unwrap(), first);

        server.stop(ASK).await.unwrap();
        assert!(!first.is_alive());

        server.start(ASK).await.unwrap();
        let second = server.realm("default", ASK).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn blank_realm_names_are_rejected_by_the_server_manager() {
        let (server, switches, _task) = server().await;
        server.start(ASK).await.unwrap();

        assert!(matches!(
            server.realm(" \t", ASK).await,
            Err(BridgeError::InvalidArgument { name: "realm", .. })
        ));

        let (reply, response) = oneshot::channel();
        server
            .realm_command(
                "",
                RealmCommand::Publisher {
                    topic: "prices".to_string(),
                    owner: owner(),
                    reply: reply.into(),
                },
            )
            .unwrap();
        assert!(matches!(
            response.await.unwrap(),
            Err(BridgeError::InvalidArgument { name: "realm", .. })
        ));
        assert_eq!(switches.realms_opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn realm_commands_are_forwarded_or_rejected() {
        let (server, _switches, _task) = server().await;
        let owner = owner();

        let (reply, response) = oneshot::channel();
        server
            .realm_command(
                "default",
                RealmCommand::Publisher {
                    topic: "prices".to_string(),
                    owner: owner.clone(),
                    reply: reply.into(),
                },
            )
            .unwrap();
        assert!(matches!(
            response.await.unwrap(),
            Err(BridgeError::NotRunning(_))
        ));

        server.start(ASK).await.unwrap();
        let (reply, response) = oneshot::channel();
        server
            .realm_command(
                "default",
                RealmCommand::Publisher {
                    topic: "prices".to_string(),
                    owner: owner.clone(),
                    reply: reply.into(),
                },
            )
            .unwrap();
        let publication = response.await.unwrap().unwrap();
        assert_eq!(publication.topic(), "prices");

        let (reply, response) = oneshot::channel();
        server
            .realm_command(
                "default",
                RealmCommand::Subscribe {
                    topic: "prices".to_string(),
                    owner,
                    argument_types: Vec::<ArgumentType>::new(),
                    reply: reply.into(),
                },
            )
            .unwrap();
        assert!(matches!(
            response.await.unwrap(),
            Err(BridgeError::InvalidArgument {
                name: "argument_types",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn teardown_disposes_a_running_transport() {
        let (server, switches, task) = server().await;
        server.start(ASK).await.unwrap();
        let realm = server.realm("default", ASK).await.unwrap();

        server.handle().stop();
        task.await.unwrap();

        assert!(!realm.is_alive());
        assert!(!switches.running.load(Ordering::SeqCst));
        assert_eq!(switches.stops.load(Ordering::SeqCst), 1);
    }
}
