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


use super::server::{spawn_server, ServerArguments, ServerRef};
use crate::actor::{self, Children, Handle, Lifecycle};
use crate::address::ServerAddress;
use crate::error::BridgeError;
use crate::observability::events;
use crate::transport::TransportFactory;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const COMPONENT: &str = "top_level_manager";

pub(crate) enum TopLevelCommand {
    GetOrCreateServer {
        address: ServerAddress,
        reply: RpcReplyPort<Result<ServerRef, BridgeError>>,
    },
}

/// Registry of server managers keyed by endpoint address.
pub(crate) struct TopLevelManagerDef;

pub(crate) struct TopLevelState {
    transports: Arc<dyn TransportFactory>,
    activation_timeout: Duration,
    servers: HashMap<ServerAddress, ServerRef>,
    children: Children,
    lifecycle: Lifecycle,
}

impl TopLevelState {
    async fn server(&mut self, address: ServerAddress) -> Result<ServerRef, BridgeError> {
        if let Some(server) = self.servers.get(&address).filter(|server| server.is_alive()) {
            debug!(
                event = events::MANAGER_SERVER_REUSED,
                component = COMPONENT,
                address = %address,
                "returning existing server manager"
            );
            return Ok(server.clone());
        }

        self.children.reap();
        let (server, task) = spawn_server(ServerArguments {
            transport: self.transports.create(&address),
            activation_timeout: self.activation_timeout,
        })
        .await?;
        self.children.track(server.handle(), task);
        info!(
            event = events::MANAGER_SERVER_CREATED,
            component = COMPONENT,
            address = %address,
            "server manager created"
        );
        self.servers.insert(address, server.clone());
        Ok(server)
    }
}

impl Actor for TopLevelManagerDef {
    type Msg = TopLevelCommand;
    type State = TopLevelState;
    type Arguments = (Arc<dyn TransportFactory>, Duration, Lifecycle);

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        (transports, activation_timeout, lifecycle): Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(TopLevelState {
            transports,
            activation_timeout,
            servers: HashMap::new(),
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
            TopLevelCommand::GetOrCreateServer { address, reply } => {
                let _ = reply.send(state.server(address).await);
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
        state.servers.clear();
        state.children.stop_all().await;
        Ok(())
    }
}

/// Spawns the root of the manager tree.
pub(crate) async fn spawn_top_level(
    transports: Arc<dyn TransportFactory>,
    activation_timeout: Duration,
) -> Result<(Handle<TopLevelCommand>, JoinHandle<()>), BridgeError> {
    actor::spawn("topic-bridge", TopLevelManagerDef, |lifecycle| {
        (transports, activation_timeout, lifecycle)
    })
    .await
}
