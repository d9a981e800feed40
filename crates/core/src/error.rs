use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A single invalid configuration option, keyed by the option name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionError {
    pub key: String,
    pub message: String,
}

impl OptionError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

#[derive(Error, Debug)]
pub enum VoidcheckError {
    #[error("Invalid configuration: {}", join_errors(.0))]
    Validation(Vec<OptionError>),

    #[error("Unknown value '{value}' for {key}")]
    UnknownValue { key: String, value: String },
}

fn join_errors(errors: &[OptionError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
