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

use crate::actor::Cancelable;
use crate::messages::{
    Activate, ComponentError, ComponentFailure, ComponentOperation, Owner, OwnerNotification,
};
use crate::observability::{events, fields};
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    WaitingForActivation,
    Active,
    Stopped,
}

/// What the component should do after an activation timeout fired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimeoutOutcome {
    Stop,
    Ignore,
}

/// Two-phase lifecycle shared by subscription and publication components.
///
/// A component starts out waiting for its owner with a pending timeout. Only an
/// [`Activate`] from the owner it was created for moves it to `Active`, cancelling the
/// timeout. A timeout that was already in flight when activation happened is ignored.
pub(crate) struct ActivationHandshake {
    component: &'static str,
    topic: String,
    owner: Owner,
    phase: Phase,
    error_notifications: bool,
    pending_timeout: Option<Cancelable>,
}

impl ActivationHandshake {
    pub(crate) fn new(component: &'static str, topic: &str, owner: Owner) -> Self {
        Self {
            component,
            topic: topic.to_string(),
            owner,
            phase: Phase::WaitingForActivation,
            error_notifications: false,
            pending_timeout: None,
        }
    }

    /// Records the token of the scheduled activation timeout.
    pub(crate) fn arm(&mut self, timeout: Cancelable) {
        debug!(
            event = events::COMPONENT_WAITING_FOR_ACTIVATION,
            component = self.component,
            topic = self.topic.as_str(),
            owner = self.owner.name(),
            "waiting for activation"
        );
        self.pending_timeout = Some(timeout);
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub(crate) fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns `true` if this message activated the component. Activation from anyone
    /// but the owner, or a repeated activation, leaves the phase untouched.
    pub(crate) fn on_activate(&mut self, activate: Activate) -> bool {
        if activate.by != self.owner.id() {
            warn!(
                event = events::COMPONENT_ACTIVATION_REJECTED,
                component = self.component,
                topic = self.topic.as_str(),
                owner = %self.owner.id(),
                sender = %activate.by,
                "ignoring activation from an actor that does not own this component"
            );
            return false;
        }

        if self.phase != Phase::WaitingForActivation {
            debug!(
                event = events::COMPONENT_MESSAGE_IGNORED,
                component = self.component,
                topic = self.topic.as_str(),
                phase = ?self.phase,
                "ignoring repeated activation"
            );
            return false;
        }

        self.cancel_timeout();
        self.error_notifications = activate.error_notifications;
        self.phase = Phase::Active;
        info!(
            event = events::COMPONENT_ACTIVATED,
            component = self.component,
            topic = self.topic.as_str(),
            owner = self.owner.name(),
            error_notifications = fields::format_opt_in(self.error_notifications),
            "component activated"
        );
        true
    }

    pub(crate) fn on_timeout(&mut self) -> TimeoutOutcome {
        if self.phase != Phase::WaitingForActivation {
            debug!(
                event = events::COMPONENT_STALE_TIMEOUT_IGNORED,
                component = self.component,
                topic = self.topic.as_str(),
                phase = ?self.phase,
                "ignoring activation timeout delivered after activation"
            );
            return TimeoutOutcome::Ignore;
        }

        self.pending_timeout = None;
        self.phase = Phase::Stopped;
        info!(
            event = events::COMPONENT_ACTIVATION_TIMEOUT,
            component = self.component,
            topic = self.topic.as_str(),
            owner = self.owner.name(),
            "timed out waiting for activation"
        );
        TimeoutOutcome::Stop
    }

    pub(crate) fn stop(&mut self) {
        self.cancel_timeout();
        self.phase = Phase::Stopped;
    }

    /// Delivers a data notification to the owner.
    pub(crate) fn notify_owner(&self, notification: OwnerNotification) {
        if self.owner.tell(notification).is_err() {
            warn!(
                event = events::COMPONENT_OWNER_UNREACHABLE,
                component = self.component,
                topic = self.topic.as_str(),
                owner = self.owner.name(),
                "owner is no longer reachable, dropping notification"
            );
        }
    }

    /// Logs `failure` and, if the owner opted in at activation, forwards it as a
    /// [`ComponentError`].
    pub(crate) fn notify_error(&self, operation: ComponentOperation, failure: ComponentFailure) {
        error!(
            event = events::COMPONENT_ERROR,
            component = self.component,
            topic = self.topic.as_str(),
            operation = %operation,
            error_notifications = fields::format_opt_in(self.error_notifications),
            err = %failure,
            "component operation failed"
        );

        if self.error_notifications {
            self.notify_owner(OwnerNotification::Error(ComponentError {
                topic: self.topic.clone(),
                operation,
                failure,
            }));
        }
    }

    fn cancel_timeout(&mut self) {
        if let Some(timeout) = self.pending_timeout.take() {
            timeout.cancel();
        }
    }
}

impl Drop for ActivationHandshake {
    fn drop(&mut self) {
        self.cancel_timeout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{run_after, OwnerId, Recipient};
    use crate::arguments::{ArgumentType, DecodeError};
    use crate::error::EventBusError;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn owner() -> (Owner, mpsc::UnboundedReceiver<OwnerNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Recipient::from_channel("owner", tx), rx)
    }

    fn decode_failure() -> ComponentFailure {
        DecodeError::Type {
            position: 0,
            expected: ArgumentType::Float,
            found: "string",
        }
        .into()
    }

    #[test]
    fn activation_from_owner_records_opt_in() {
        let (owner, _rx) = owner();
        let mut handshake = ActivationHandshake::new("test", "prices", owner.clone());

        assert_eq!(handshake.phase(), Phase::WaitingForActivation);
        assert!(handshake.on_activate(Activate {
            by: owner.id(),
            error_notifications: true,
        }));
        assert!(handshake.is_active());
        assert!(handshake.error_notifications);
    }

    #[test]
    fn activation_from_stranger_is_ignored() {
        let (owner, _rx) = owner();
        let mut handshake = ActivationHandshake::new("test", "prices", owner);

        assert!(!handshake.on_activate(Activate {
            by: OwnerId::new(),
            error_notifications: true,
        }));
        assert_eq!(handshake.phase(), Phase::WaitingForActivation);
    }

    #[test]
    fn repeated_activation_keeps_first_opt_in() {
        let (owner, _rx) = owner();
        let mut handshake = ActivationHandshake::new("test", "prices", owner.clone());

        handshake.on_activate(Activate {
            by: owner.id(),
            error_notifications: false,
        });
        assert!(!handshake.on_activate(Activate {
            by: owner.id(),
            error_notifications: true,
        }));
        assert!(!handshake.error_notifications);
    }

    #[test]
    fn timeout_after_activation_is_ignored() {
        let (owner, _rx) = owner();
        let mut handshake = ActivationHandshake::new("test", "prices", owner.clone());
        handshake.on_activate(Activate {
            by: owner.id(),
            error_notifications: false,
        });

        assert_eq!(handshake.on_timeout(), TimeoutOutcome::Ignore);
        assert!(handshake.is_active());
    }

    #[test]
    fn timeout_while_waiting_stops() {
        let (owner, _rx) = owner();
        let mut handshake = ActivationHandshake::new("test", "prices", owner);

        assert_eq!(handshake.on_timeout(), TimeoutOutcome::Stop);
        assert_eq!(handshake.phase(), Phase::Stopped);
    }

    #[test]
    fn errors_reach_owner_only_when_opted_in() {
        let (silent_owner, mut silent_rx) = owner();
        let mut silent = ActivationHandshake::new("test", "prices", silent_owner.clone());
        silent.on_activate(Activate {
            by: silent_owner.id(),
            error_notifications: false,
        });
        silent.notify_error(ComponentOperation::ReceiveEvent, decode_failure());
        assert!(silent_rx.try_recv().is_err());

        let (loud_owner, mut loud_rx) = owner();
        let mut loud = ActivationHandshake::new("test", "prices", loud_owner.clone());
        loud.on_activate(Activate {
            by: loud_owner.id(),
            error_notifications: true,
        });
        loud.notify_error(
            ComponentOperation::SendEvent,
            EventBusError::new("prices", "closed").into(),
        );

        match loud_rx.try_recv() {
            Ok(OwnerNotification::Error(err)) => {
                assert_eq!(err.topic, "prices");
                assert_eq!(err.operation, ComponentOperation::SendEvent);
            }
            other => panic!("expected an error notification, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn activation_cancels_pending_timeout() {
        let (owner, _rx) = owner();
        let mut handshake = ActivationHandshake::new("test", "prices", owner.clone());
        let (fired_tx, mut fired_rx) = mpsc::unbounded_channel::<()>();
        handshake.arm(run_after(Duration::from_secs(5), move || {
            let _ = fired_tx.send(());
        }));

        handshake.on_activate(Activate {
            by: owner.id(),
            error_notifications: false,
        });
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(fired_rx.recv().await, None);
    }
}
