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


use crate::observability::events;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

const COMPONENT: &str = "actor_lifecycle";

/// Creates the two halves tracking one actor: the [`Lifecycle`] moves into the actor
/// state, the [`Liveness`] goes into every handle on it.
pub(crate) fn lifecycle(name: &str) -> (Lifecycle, Liveness) {
    let name: Arc<str> = Arc::from(name);
    let retired = Arc::new(AtomicBool::new(false));
    let (terminated_tx, terminated_rx) = watch::channel(());

    (
        Lifecycle {
            name: name.clone(),
            retired: retired.clone(),
            _terminated: terminated_tx,
        },
        Liveness {
            name,
            retired,
            terminated: terminated_rx,
        },
    )
}

/// Owned by the actor state. Dropping it, which happens once the actor task has run
/// `post_stop` and released its state, marks the actor as terminated.
pub(crate) struct Lifecycle {
    name: Arc<str>,
    retired: Arc<AtomicBool>,
    _terminated: watch::Sender<()>,
}

impl Lifecycle {
    /// Marks the actor as on its way out. Handles report it as dead from now on, even
    /// while the mailbox still drains.
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.retire();
        debug!(
            event = events::ACTOR_STOPPED,
            component = COMPONENT,
            actor = &*self.name,
            "actor stopped"
        );
    }
}

/// Shared view of an actor's lifecycle.
#[derive(Clone, Debug)]
pub(crate) struct Liveness {
    name: Arc<str>,
    retired: Arc<AtomicBool>,
    terminated: watch::Receiver<()>,
}

impl Liveness {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    /// `false` as soon as the actor retired, not only once it terminated.
    pub(crate) fn is_alive(&self) -> bool {
        !self.retired.load(Ordering::SeqCst) && self.terminated.has_changed().is_ok()
    }

    pub(crate) async fn terminated(&self) {
        let mut terminated = self.terminated.clone();
        while terminated.changed().await.is_ok() {}
    }
}

#[cfg(test)]
mod tests {
    use super::lifecycle;
    use std::time::Duration;

    #[test]
    fn retiring_is_visible_before_termination() {
        let (actor_side, liveness) = lifecycle("component");
        assert!(liveness.is_alive());

        actor_side.retire();

        assert!(!liveness.is_alive());
        assert!(liveness.terminated.has_changed().is_ok());
    }

    #[test]
    fn handles_can_retire_the_actor() {
        let (_actor_side, liveness) = lifecycle("component");
        let other = liveness.clone();

        liveness.retire();

        assert!(!other.is_alive());
    }

    #[tokio::test]
    async fn dropping_the_lifecycle_terminates() {
        let (actor_side, liveness) = lifecycle("component");
        let waiter = tokio::spawn({
            let liveness = liveness.clone();
            async move { liveness.terminated().await }
        });

        drop(actor_side);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("terminated resolves")
            .unwrap();
        assert!(!liveness.is_alive());
    }
}
