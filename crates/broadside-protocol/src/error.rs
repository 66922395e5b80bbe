//! Error types for the protocol layer.
//!
//! Each crate in Broadside defines its own error enum. A `ProtocolError`
//! always means "this line or message could not be understood"; it never
//! means the connection is broken. Callers log it and keep reading.

/// Errors that can occur while decoding lines or interpreting messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// The line has no `:` separating the command from its data.
    #[error("missing ':' separator in line {0:?}")]
    MissingSeparator(String),

    /// The command part of the line is empty.
    #[error("empty command")]
    EmptyCommand,

    /// The command is not part of the vocabulary for this direction.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// A required key is absent.
    #[error("{command}: missing field {key:?}")]
    MissingField { command: String, key: String },

    /// A key is present but its value cannot be interpreted.
    #[error("{command}: invalid value {value:?} for field {key:?}")]
    InvalidField {
        command: String,
        key: String,
        value: String,
    },
}
