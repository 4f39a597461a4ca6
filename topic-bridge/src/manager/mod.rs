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

//! The manager tree: one top-level registry of servers, one server manager per
//! endpoint, one realm manager per realm of a running server.

mod realm;
mod server;
mod top_level;

pub use realm::{RealmCommand, RealmRef};
pub use server::ServerRef;
pub(crate) use top_level::{spawn_top_level, TopLevelCommand};
