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


use ractor::{Actor, ActorProcessingErr, ActorRef};
use topic_bridge::OwnerNotification;
use tracing::{info, warn};

const EVENT_LOGGER_TAG: &str = "EventLogger:";

/// Owner of every configured subscription; writes what it is told to the log.
pub struct EventLoggerDef;

#[derive(Debug, Default)]
pub struct EventLoggerState {
    received: u64,
    errors: u64,
}

impl Actor for EventLoggerDef {
    type Msg = OwnerNotification;
    type State = EventLoggerState;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(EventLoggerState::default())
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            OwnerNotification::Received(event) => {
                state.received += 1;
                info!(
                    "{} received on '{}': {:?}",
                    EVENT_LOGGER_TAG, event.topic, event.arguments
                );
            }
            OwnerNotification::Error(err) => {
                state.errors += 1;
                warn!("{} {}", EVENT_LOGGER_TAG, err);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        info!(
            "{} done, {} events received, {} errors",
            EVENT_LOGGER_TAG, state.received, state.errors
        );
        Ok(())
    }
}
