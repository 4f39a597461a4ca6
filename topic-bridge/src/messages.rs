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

//! Messages exchanged between components and their owners.

use crate::actor::{OwnerId, Recipient};
use crate::arguments::{Argument, DecodeError};
use crate::error::{BridgeError, EventBusError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Claims a component on behalf of the owner `by`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Activate {
    pub by: OwnerId,
    pub error_notifications: bool,
}

/// Request to publish one event. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishEvent {
    arguments: Vec<Value>,
}

impl PublishEvent {
    pub fn new(arguments: Vec<Value>) -> Result<Self, BridgeError> {
        if arguments.is_empty() {
            return Err(BridgeError::InvalidArgument {
                name: "arguments",
                reason: "an event needs at least one argument".to_string(),
            });
        }
        Ok(Self { arguments })
    }

    /// Builds positional arguments from a serializable value. Sequences (tuples,
    /// arrays, vectors) become one argument per element; anything else becomes a
    /// single argument.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, BridgeError> {
        let value = serde_json::to_value(value).map_err(|err| BridgeError::InvalidArgument {
            name: "arguments",
            reason: err.to_string(),
        })?;

        match value {
            Value::Array(arguments) => Self::new(arguments),
            single => Self::new(vec![single]),
        }
    }

    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    pub fn into_arguments(self) -> Vec<Value> {
        self.arguments
    }
}

/// An event delivered to the owner of a subscription, decoded against the
/// subscription's argument types.
#[derive(Clone, Debug, PartialEq)]
pub struct ReceivedEvent {
    pub topic: String,
    pub arguments: Vec<Argument>,
}

impl ReceivedEvent {
    /// Converts the decoded arguments into a caller-chosen shape, usually a tuple.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        let values = Value::Array(self.arguments.iter().map(Argument::to_value).collect());
        serde_json::from_value(values).map_err(|err| DecodeError::Shape(err.to_string()))
    }
}

/// The data-plane operation a component failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentOperation {
    SendEvent,
    ReceiveEvent,
}

impl Display for ComponentOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentOperation::SendEvent => f.write_str("send_event"),
            ComponentOperation::ReceiveEvent => f.write_str("receive_event"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentFailure {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Publish(#[from] EventBusError),
}

/// Error envelope sent to owners that opted into error notifications.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{operation} failed on topic '{topic}': {failure}")]
pub struct ComponentError {
    pub topic: String,
    pub operation: ComponentOperation,
    #[source]
    pub failure: ComponentFailure,
}

/// Everything a component may send to its owner.
#[derive(Clone, Debug, PartialEq)]
pub enum OwnerNotification {
    Received(ReceivedEvent),
    Error(ComponentError),
}

/// Address of a component's owner.
pub type Owner = Recipient<OwnerNotification>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::Argument;
    use serde_json::json;

    #[test]
    fn publish_event_rejects_empty_arguments() {
        let err = PublishEvent::new(vec![]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InvalidArgument {
                name: "arguments",
                ..
            }
        ));
        assert!(PublishEvent::from_serialize(&Vec::<f64>::new()).is_err());
    }

    #[test]
    fn publish_event_from_tuple_is_positional() {
        let event = PublishEvent::from_serialize(&(42.5, "EUR")).unwrap();
        assert_eq!(event.arguments(), &[json!(42.5), json!("EUR")]);

        let single = PublishEvent::from_serialize(&true).unwrap();
        assert_eq!(single.into_arguments(), vec![json!(true)]);
    }

    #[test]
    fn received_event_decodes_into_a_tuple() {
        let event = ReceivedEvent {
            topic: "prices".to_string(),
            arguments: vec![Argument::Float(1.25), Argument::String("EUR".to_string())],
        };

        let (price, currency): (f64, String) = event.decode().unwrap();
        assert_eq!(price, 1.25);
        assert_eq!(currency, "EUR");

        assert!(matches!(
            event.decode::<(bool,)>(),
            Err(DecodeError::Shape(_))
        ));
    }

    #[test]
    fn component_error_names_topic_and_operation() {
        let err = ComponentError {
            topic: "prices".to_string(),
            operation: ComponentOperation::SendEvent,
            failure: EventBusError::new("prices", "sink closed").into(),
        };

        assert_eq!(
            err.to_string(),
            "send_event failed on topic 'prices': topic 'prices' rejected event: sink closed"
        );
    }
}
