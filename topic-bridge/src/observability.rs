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

//! Stable event names and field formatters for `tracing` output.

pub mod events {
    pub const ACTOR_STARTED: &str = "actor_started";
    pub const ACTOR_STOPPED: &str = "actor_stopped";

    pub const COMPONENT_WAITING_FOR_ACTIVATION: &str = "component_waiting_for_activation";
    pub const COMPONENT_ACTIVATED: &str = "component_activated";
    pub const COMPONENT_ACTIVATION_REJECTED: &str = "component_activation_rejected";
    pub const COMPONENT_ACTIVATION_TIMEOUT: &str = "component_activation_timeout";
    pub const COMPONENT_STALE_TIMEOUT_IGNORED: &str = "component_stale_timeout_ignored";
    pub const COMPONENT_MESSAGE_IGNORED: &str = "component_message_ignored";
    pub const COMPONENT_ERROR: &str = "component_error";
    pub const COMPONENT_OWNER_UNREACHABLE: &str = "component_owner_unreachable";

    pub const SUBSCRIPTION_EVENT_FORWARDED: &str = "subscription_event_forwarded";
    pub const SUBSCRIPTION_STREAM_ENDED: &str = "subscription_stream_ended";
    pub const SUBSCRIPTION_TERMINATED: &str = "subscription_terminated";
    pub const SUBSCRIPTION_DISPOSED: &str = "subscription_disposed";

    pub const PUBLICATION_EVENT_SENT: &str = "publication_event_sent";

    pub const REALM_COMPONENT_CREATED: &str = "realm_component_created";
    pub const REALM_COMPONENT_REUSED: &str = "realm_component_reused";
    pub const REALM_TOPIC_RESOLVED: &str = "realm_topic_resolved";

    pub const SERVER_STARTED: &str = "server_started";
    pub const SERVER_START_FAILED: &str = "server_start_failed";
    pub const SERVER_STOPPED: &str = "server_stopped";
    pub const SERVER_STOP_FAILED: &str = "server_stop_failed";
    pub const SERVER_REQUEST_REJECTED: &str = "server_request_rejected";
    pub const SERVER_REALM_CREATED: &str = "server_realm_created";
    pub const SERVER_TRANSPORT_DISPOSED: &str = "server_transport_disposed";

    pub const MANAGER_SERVER_CREATED: &str = "manager_server_created";
    pub const MANAGER_SERVER_REUSED: &str = "manager_server_reused";

    pub const BRIDGE_CREATED: &str = "bridge_created";
    pub const BRIDGE_SHUTDOWN: &str = "bridge_shutdown";
}

pub mod fields {
    use serde_json::Value;

    /// Compact JSON rendering of positional event arguments.
    pub fn format_arguments(arguments: &[Value]) -> String {
        serde_json::to_string(arguments).unwrap_or_else(|_| "<unprintable>".to_string())
    }

    /// Rendering of the error-notification opt-in.
    pub fn format_opt_in(enabled: bool) -> &'static str {
        if enabled {
            "enabled"
        } else {
            "disabled"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fields;
    use serde_json::json;

    #[test]
    fn format_arguments_renders_compact_json() {
        let rendered = fields::format_arguments(&[json!(1.5), json!("tick")]);
        assert_eq!(rendered, r#"[1.5,"tick"]"#);
    }
}
