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

//! Positional event arguments and their per-position decoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Expected type of one positional event argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentType {
    Boolean,
    Integer,
    Unsigned,
    Float,
    String,
    /// Any JSON value, passed through untouched.
    Json,
}

impl Display for ArgumentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArgumentType::Boolean => "boolean",
            ArgumentType::Integer => "integer",
            ArgumentType::Unsigned => "unsigned",
            ArgumentType::Float => "float",
            ArgumentType::String => "string",
            ArgumentType::Json => "json",
        };
        f.write_str(name)
    }
}

/// A decoded positional argument.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Argument {
    Boolean(bool),
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    Json(Value),
}

impl Argument {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Argument::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Argument::Unsigned(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Argument::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Argument::Boolean(value) => Value::Bool(*value),
            Argument::Integer(value) => Value::from(*value),
            Argument::Unsigned(value) => Value::from(*value),
            Argument::Float(value) => Value::from(*value),
            Argument::String(value) => Value::String(value.clone()),
            Argument::Json(value) => value.clone(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} argument(s) but the event carried {actual}")]
    Arity { expected: usize, actual: usize },

    #[error("argument {position} is not a valid {expected} (found {found})")]
    Type {
        position: usize,
        expected: ArgumentType,
        found: &'static str,
    },

    #[error("arguments do not match the requested shape: {0}")]
    Shape(String),
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "float",
        Value::Number(number) if number.is_u64() => "unsigned",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_argument(
    position: usize,
    argument_type: ArgumentType,
    value: &Value,
) -> Result<Argument, DecodeError> {
    let decoded = match argument_type {
        ArgumentType::Boolean => value.as_bool().map(Argument::Boolean),
        ArgumentType::Integer => value.as_i64().map(Argument::Integer),
        ArgumentType::Unsigned => value.as_u64().map(Argument::Unsigned),
        ArgumentType::Float => value.as_f64().map(Argument::Float),
        ArgumentType::String => value.as_str().map(|s| Argument::String(s.to_string())),
        ArgumentType::Json => Some(Argument::Json(value.clone())),
    };

    decoded.ok_or(DecodeError::Type {
        position,
        expected: argument_type,
        found: value_kind(value),
    })
}

/// Decodes `values` position by position against `argument_types`.
///
/// The arity is fixed: an event with more or fewer arguments than there are types is
/// rejected as a whole.
pub fn decode_arguments(
    argument_types: &[ArgumentType],
    values: &[Value],
) -> Result<Vec<Argument>, DecodeError> {
    if argument_types.len() != values.len() {
        return Err(DecodeError::Arity {
            expected: argument_types.len(),
            actual: values.len(),
        });
    }

    argument_types
        .iter()
        .zip(values)
        .enumerate()
        .map(|(position, (argument_type, value))| decode_argument(position, *argument_type, value))
        .collect()
}
