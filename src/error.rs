use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::label::{Label, LabelSyntaxError};
use crate::location::Location;
use crate::schema::ConversionError;
use crate::spelling::suggestion_suffix;

/// Stable failure category reported alongside the message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The user's module file is invalid
    BadModule,
    /// Evaluation was cancelled by the driver
    Interrupted,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadModule => write!(f, "BAD_MODULE"),
            Self::Interrupted => write!(f, "INTERRUPTED"),
        }
    }
}

/// Failure to type-check a tag. Suspension is not an error and never shows
/// up here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("in '{tag_kind}' tag at {location}, unknown attribute {attribute} provided{}", suggestion_suffix(.suggestion))]
    UnknownAttribute {
        tag_kind: String,
        location: Location,
        attribute: String,
        suggestion: Option<String>,
    },

    #[error("in '{tag_kind}' tag at {location}, error converting value for attribute {attribute}: {source}")]
    TypeConversion {
        tag_kind: String,
        location: Location,
        attribute: String,
        #[source]
        source: ConversionError,
    },

    #[error("in '{tag_kind}' tag at {location}, the value for attribute {attribute} {reason}")]
    DisallowedValue {
        tag_kind: String,
        location: Location,
        attribute: String,
        reason: String,
    },

    #[error("in '{tag_kind}' tag at {location}, mandatory attribute {attribute} isn't being specified")]
    MissingMandatoryAttribute {
        tag_kind: String,
        location: Location,
        attribute: String,
    },

    #[error("in '{tag_kind}' tag at {location}, malformed label for attribute {attribute}: {source}")]
    MalformedReference {
        tag_kind: String,
        location: Location,
        attribute: String,
        #[source]
        source: LabelSyntaxError,
    },

    #[error("in '{tag_kind}' tag at {location}, failed to resolve {label} for attribute {attribute}: {message}")]
    ReferenceFailed {
        tag_kind: String,
        location: Location,
        attribute: String,
        label: Label,
        message: String,
    },

    #[error("tag type checking was interrupted")]
    Interrupted,
}

impl ResolutionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Interrupted => ErrorCode::Interrupted,
            _ => ErrorCode::BadModule,
        }
    }

    /// None of these clear up by retrying; "not ready yet" is reported as a
    /// suspended outcome instead.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// The attribute the failure is about, when there is one.
    pub fn attribute(&self) -> Option<&str> {
        match self {
            Self::UnknownAttribute { attribute, .. }
            | Self::TypeConversion { attribute, .. }
            | Self::DisallowedValue { attribute, .. }
            | Self::MissingMandatoryAttribute { attribute, .. }
            | Self::MalformedReference { attribute, .. }
            | Self::ReferenceFailed { attribute, .. } => Some(attribute),
            Self::Interrupted => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::UnknownAttribute { location, .. }
            | Self::TypeConversion { location, .. }
            | Self::DisallowedValue { location, .. }
            | Self::MissingMandatoryAttribute { location, .. }
            | Self::MalformedReference { location, .. }
            | Self::ReferenceFailed { location, .. } => Some(location),
            Self::Interrupted => None,
        }
    }
}
