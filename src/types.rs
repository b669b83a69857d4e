//! Core types shared by the transform engine and its callers.

use serde::{Deserialize, Serialize};

/// Escape a single JSON Pointer (RFC 6901) reference token.
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Direction of a transform.
///
/// Determines which side of each object field is read and which is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Wire format to internal representation (external names are read).
    Decode,
    /// Internal representation to wire format (internal names are read).
    Encode,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Decode => "decode",
            Direction::Encode => "encode",
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            Direction::Decode => Direction::Encode,
            Direction::Encode => Direction::Decode,
        }
    }
}

/// What to do with input keys a closed object does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    /// Fail with an `UnexpectedField` diagnostic.
    #[default]
    Reject,
    /// Leave the key out of the result.
    Drop,
    /// Copy the key and its value into the result without validation.
    Preserve,
}

impl UnknownFields {
    /// Parse a policy name.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reject" => Some(UnknownFields::Reject),
            "drop" => Some(UnknownFields::Drop),
            "preserve" => Some(UnknownFields::Preserve),
            _ => None,
        }
    }
}

/// Options for a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub direction: Direction,
    /// Policy for undeclared keys on closed objects. Open objects validate
    /// their extra keys against the declared descriptor instead.
    pub unknown_fields: UnknownFields,
}

impl TransformOptions {
    /// Options for the given direction, rejecting unknown fields.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            unknown_fields: UnknownFields::default(),
        }
    }

    pub fn decode() -> Self {
        Self::new(Direction::Decode)
    }

    pub fn encode() -> Self {
        Self::new(Direction::Encode)
    }

    /// Set the unknown-field policy for closed objects.
    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }
}
