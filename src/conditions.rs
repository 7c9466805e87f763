// Rylos Conditions - Dispatch Errors and Warnings
//
// Typed failures raised by generic-function registration and
// invocation, plus the advisory redefinition notice.

use std::fmt;

use thiserror::Error;

/// Errors raised by generic-function registration and invocation.
#[derive(Debug, Error)]
pub enum GenericError {
    /// The registration target is not callable.
    #[error("invalid implementation for generic {generic}: {found} is not callable")]
    InvalidImplementation { generic: String, found: String },

    /// An eql specializer was given a value that cannot serve as a key.
    #[error("value specializer for generic {generic} is not comparable: {value} ({reason})")]
    NotComparable {
        generic: String,
        value: String,
        reason: String,
    },

    /// Keyword arguments are not accepted in generic calls.
    #[error("keyword arguments not accepted in generic {generic}: {keywords}")]
    KeywordArguments { generic: String, keywords: String },

    /// No registered implementation matched the call.
    #[error("{}", no_applicable_message(.generic, .argument))]
    NoApplicableMethod {
        generic: String,
        /// The argument the walk failed on; None when every argument
        /// matched but the path holds no implementation.
        argument: Option<UndispatchedArgument>,
    },

    /// Failure signalled by a selected implementation.
    #[error("{message}")]
    Signal { message: String },
}

/// The argument a dispatch walk could not resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndispatchedArgument {
    pub position: usize,
    pub class: String,
    pub value: String,
}

fn no_applicable_message(generic: &str, argument: &Option<UndispatchedArgument>) -> String {
    match argument {
        Some(arg) => format!(
            "no applicable method in generic {}: cannot dispatch on argument {} of class {} at position {}",
            generic, arg.value, arg.class, arg.position
        ),
        None => format!("no method found in generic {}", generic),
    }
}

/// Raised when a class definition admits no consistent precedence list.
#[derive(Debug, Error)]
#[error("no consistent class precedence list for {class}: conflicting superclass order")]
pub struct LinearizationError {
    pub class: String,
}

/// Advisory notice that a registration displaced an existing
/// implementation. Never an error: the overwrite proceeds regardless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedefinitionWarning {
    pub generic: String,
    pub signature: String,
}

impl fmt::Display for RedefinitionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "redefinition of generic {} for signature {}",
            self.generic, self.signature
        )
    }
}
