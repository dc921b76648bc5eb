//! Error types for the IQL query engine.

use std::fmt;

/// Errors produced by query parsing, source construction and evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlError {
    /// Malformed URI, CSV option, data-URI encoding or column reference
    ParseError { message: String },

    /// File, HTTP or stream read failures
    IoError { message: String },

    /// Unknown data format or unresolvable media type
    FormatError { message: String },

    /// Coercion failures and invalid operand types
    TypeError {
        expected: String,
        actual: String,
        value: Option<String>,
    },

    /// Wrong argument count for a built-in function
    ArityError {
        function: String,
        min_args: usize,
        max_args: usize,
        given: usize,
    },

    /// Undeclared variable, validator rejection or type mismatch on set
    ScopeError { name: String, message: String },

    /// Clean end of the input statement stream
    Eof,
}

impl fmt::Display for SqlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlError::ParseError { message } => {
                write!(f, "parse error: {}", message)
            }
            SqlError::IoError { message } => {
                write!(f, "I/O error: {}", message)
            }
            SqlError::FormatError { message } => {
                write!(f, "format error: {}", message)
            }
            SqlError::TypeError {
                expected,
                actual,
                value,
            } => {
                if let Some(val) = value {
                    write!(
                        f,
                        "type error: expected {}, got {} for value '{}'",
                        expected, actual, val
                    )
                } else {
                    write!(f, "type error: expected {}, got {}", expected, actual)
                }
            }
            SqlError::ArityError {
                function,
                min_args,
                max_args,
                given,
            } => {
                if min_args == max_args {
                    write!(
                        f,
                        "{} takes {} arguments, got {}",
                        function, min_args, given
                    )
                } else {
                    write!(
                        f,
                        "{} takes {}..{} arguments, got {}",
                        function, min_args, max_args, given
                    )
                }
            }
            SqlError::ScopeError { name, message } => {
                write!(f, "variable '{}': {}", name, message)
            }
            SqlError::Eof => write!(f, "end of input"),
        }
    }
}

impl std::error::Error for SqlError {}

impl SqlError {
    /// Create a parse error
    pub fn parse_error(message: impl Into<String>) -> Self {
        SqlError::ParseError {
            message: message.into(),
        }
    }

    /// Create an I/O error
    pub fn io_error(message: impl Into<String>) -> Self {
        SqlError::IoError {
            message: message.into(),
        }
    }

    /// Create a format error
    pub fn format_error(message: impl Into<String>) -> Self {
        SqlError::FormatError {
            message: message.into(),
        }
    }

    /// Create a type error
    pub fn type_error(
        expected: impl Into<String>,
        actual: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        SqlError::TypeError {
            expected: expected.into(),
            actual: actual.into(),
            value,
        }
    }

    /// Create a scope error
    pub fn scope_error(name: impl Into<String>, message: impl Into<String>) -> Self {
        SqlError::ScopeError {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for SqlError {
    fn from(err: std::io::Error) -> Self {
        SqlError::io_error(err.to_string())
    }
}

impl From<reqwest::Error> for SqlError {
    fn from(err: reqwest::Error) -> Self {
        SqlError::io_error(err.to_string())
    }
}

impl From<csv::Error> for SqlError {
    fn from(err: csv::Error) -> Self {
        SqlError::parse_error(err.to_string())
    }
}

impl From<base64::DecodeError> for SqlError {
    fn from(err: base64::DecodeError) -> Self {
        SqlError::parse_error(err.to_string())
    }
}

/// Result type for IQL operations
pub type SqlResult<T> = Result<T, SqlError>;
