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


use ractor::{ActorRef, Message};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Token for a delayed message. Cancelling is idempotent and has no effect once the
/// message has been enqueued.
#[derive(Debug)]
pub struct Cancelable {
    handle: AbortHandle,
}

impl Cancelable {
    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Sends the message built by `make` to `actor` after `delay` unless the returned
/// token is cancelled first. An actor that terminated in the meantime never sees it.
pub(crate) fn send_after<M, F>(actor: &ActorRef<M>, delay: Duration, make: F) -> Cancelable
where
    M: Message,
    F: FnOnce() -> M + Send + 'static,
{
    let actor = actor.clone();
    run_after(delay, move || {
        let _ = actor.send_message(make());
    })
}

pub(crate) fn run_after<F>(delay: Duration, deliver: F) -> Cancelable
where
    F: FnOnce() + Send + 'static,
{
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        deliver();
    });

    Cancelable {
        handle: task.abort_handle(),
    }
}
