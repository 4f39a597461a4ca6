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

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use topic_bridge::{ArgumentType, BridgeConfig};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: json5::Error,
    },
}

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    #[serde(default)]
    pub realms: Vec<RealmConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RealmConfig {
    pub name: String,
    #[serde(default)]
    pub topics: Vec<TopicConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    pub argument_types: Vec<ArgumentType>,
    #[serde(default)]
    pub error_notifications: bool,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::parse(&contents).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, json5::Error> {
        json5::from_str(contents)
    }
}
