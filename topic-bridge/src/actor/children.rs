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


use super::handle::Handle;
use ractor::{ActorCell, Message};
use tokio::task::JoinHandle;
use tracing::debug;

const COMPONENT: &str = "actor_children";

struct Child {
    id: ractor::ActorId,
    name: String,
    cell: ActorCell,
    task: Option<JoinHandle<()>>,
}

impl Child {
    fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    async fn shutdown(mut self) {
        self.cell.stop(None);
        if let Some(task) = self.task.take() {
            // A join error only means the actor task panicked or was aborted along
            // with the runtime; either way it is gone.
            let _ = task.await;
        }
    }
}

impl Drop for Child {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cell.stop(None);
        }
    }
}

/// Actors spawned by a manager. They are stopped and awaited when the manager stops
/// them, and stopped when the set is dropped.
#[derive(Default)]
pub(crate) struct Children {
    running: Vec<Child>,
}

impl Children {
    pub(crate) fn track<M: Message>(&mut self, child: &Handle<M>, task: JoinHandle<()>) {
        self.running.push(Child {
            id: child.id(),
            name: child.name().to_string(),
            cell: child.cell(),
            task: Some(task),
        });
    }

    /// Stops the child `id` and waits for it to terminate. Unknown ids are ignored.
    pub(crate) async fn stop(&mut self, id: ractor::ActorId) {
        if let Some(pos) = self.running.iter().position(|child| child.id == id) {
            let child = self.running.swap_remove(pos);
            debug!(
                component = COMPONENT,
                child = child.name.as_str(),
                "stopping child"
            );
            child.shutdown().await;
        }
    }

    pub(crate) async fn stop_all(&mut self) {
        let children = std::mem::take(&mut self.running);
        futures::future::join_all(children.into_iter().map(Child::shutdown)).await;
    }

    /// Forgets children that have already terminated.
    pub(crate) fn reap(&mut self) {
        self.running.retain(|child| !child.is_finished());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.running.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Children;
    use crate::actor::{spawn, Handle, Lifecycle};
    use ractor::{Actor, ActorProcessingErr, ActorRef};
    use std::time::Duration;

    struct LeafActorDef;

    impl Actor for LeafActorDef {
        type Msg = ();
        type State = Lifecycle;
        type Arguments = Lifecycle;

        async fn pre_start(
            &self,
            _myself: ActorRef<Self::Msg>,
            lifecycle: Lifecycle,
        ) -> Result<Self::State, ActorProcessingErr> {
            Ok(lifecycle)
        }
    }

    async fn leaf(children: &mut Children) -> Handle<()> {
        let (leaf, task) = spawn("leaf", LeafActorDef, |lifecycle| lifecycle)
            .await
            .unwrap();
        children.track(&leaf, task);
        leaf
    }

    #[tokio::test]
    async fn stop_terminates_only_that_child() {
        let mut children = Children::default();
        let first = leaf(&mut children).await;
        let second = leaf(&mut children).await;

        children.stop(first.id()).await;

        assert_eq!(children.len(), 1);
        assert!(!first.is_alive());
        assert!(second.is_alive());
    }

    #[tokio::test]
    async fn stop_all_waits_for_every_child() {
        let mut children = Children::default();
        let first = leaf(&mut children).await;
        let second = leaf(&mut children).await;

        children.stop_all().await;

        assert_eq!(children.len(), 0);
        assert!(!first.is_alive());
        assert!(!second.is_alive());
    }

    #[tokio::test]
    async fn dropped_set_stops_its_children() {
        let mut children = Children::default();
        let orphan = leaf(&mut children).await;

        drop(children);
        orphan.terminated().await;

        assert!(!orphan.is_alive());
    }

    #[tokio::test]
    async fn reap_forgets_terminated_children() {
        let mut children = Children::default();
        let gone = leaf(&mut children).await;
        leaf(&mut children).await;

        gone.stop();
        gone.terminated().await;
        // The state is released just before the actor task completes.
        let reaped = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                children.reap();
                if children.len() == 1 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;

        assert!(reaped.is_ok());
    }
}
