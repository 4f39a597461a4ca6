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

mod config;
mod logger;

use crate::config::Config;
use crate::logger::EventLoggerDef;
use clap::Parser;
use loopback_host::LoopbackHostFactory;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use ractor::Actor;
use topic_bridge::{Owner, Recipient, TopicBridge};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const CONFIGURABLE_BRIDGE_TAG: &str = "ConfigurableBridge:";

#[derive(Debug, Parser)]
#[command(version, about = "Starts the servers of a json5 config and logs their topics")]
struct Cli {
    /// Path to the json5 configuration file
    #[arg(short, long, default_value = "configurable-bridge/config/bridge.json5")]
    config: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,topic_bridge=info,loopback_host=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::load(&cli.config)?;
    info!(
        "{} loaded {} server(s) from {}",
        CONFIGURABLE_BRIDGE_TAG,
        config.servers.len(),
        cli.config.display()
    );

    let bridge = TopicBridge::new(
        config.bridge.clone(),
        Arc::new(LoopbackHostFactory::new()),
    )
    .await?;
    let (logger, logger_task) = Actor::spawn(None, EventLoggerDef, ()).await?;
    let owner: Owner = Recipient::from_actor("event-logger", &logger);

    let mut subscriptions = Vec::new();
    for server_config in &config.servers {
        let server = bridge.create_server(&server_config.address).await?;
        bridge.start_server(&server).await?;

        for realm_config in &server_config.realms {
            let realm = bridge.get_realm(&server, &realm_config.name).await?;
            for topic in &realm_config.topics {
                let subscription = bridge
                    .subscribe(&realm, &topic.name, &owner, &topic.argument_types)
                    .await?;
                subscription.activate(&owner, topic.error_notifications)?;
                info!(
                    "{} subscribed to '{}' in realm '{}' of {}",
                    CONFIGURABLE_BRIDGE_TAG,
                    topic.name,
                    realm.name(),
                    server.address()
                );
                subscriptions.push(subscription);
            }
        }
    }

    info!("{} running, press Ctrl-C to stop", CONFIGURABLE_BRIDGE_TAG);
    tokio::signal::ctrl_c().await?;

    info!(
        "{} shutting down {} subscription(s)",
        CONFIGURABLE_BRIDGE_TAG,
        subscriptions.len()
    );
    bridge.shutdown().await;
    logger.stop(None);
    logger_task.await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{} {}", CONFIGURABLE_BRIDGE_TAG, err);
            eprintln!("configurable-bridge failed: {err}");
            ExitCode::FAILURE
        }
    }
}
