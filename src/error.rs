//! Error taxonomy shared by the value tree, path engine and text codec.

/// Errors reported by value tree, path and codec operations.
///
/// `IncompleteValue` and `OtherChoice` are ordinary control flow for callers
/// (a field is absent, or a DATA-UNIT holds another alternative); the rest are
/// normally surfaced further up.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An intermediate Choice, optional field or array slot along the path is unset.
    #[error("incomplete value at '{0}'")]
    IncompleteValue(String),
    /// A path segment names no field or variant of the type it is applied to,
    /// or (strict lookup) a variant other than the active one.
    #[error("wrong label '{label}' for type {type_name}")]
    WrongLabel { label: String, type_name: String },
    /// A Choice holds another active variant than the one requested.
    #[error("other choice: '{requested}' requested, '{active}' is active")]
    OtherChoice { requested: String, active: String },
    /// Malformed path text, or a path with unbound parameters.
    #[error("bad path: {0}")]
    BadPath(String),
    /// The node (or the supplied value) has a different type or syntax than required.
    #[error("wrong type: {0}")]
    WrongType(String),
    /// A Choice already holds a different variant and re-selection was not requested.
    #[error("choice {type_name} already holds variant '{active}'")]
    DuplicateVariant { type_name: String, active: String },
    /// Malformed plain-syntax text; `consumed` is the number of symbols accepted
    /// before the failure.
    #[error("parse error after {consumed} symbols: {message}")]
    Parse { consumed: usize, message: String },
    /// Printed text or field data does not fit into the destination.
    #[error("overflow: {needed} symbols needed, {max} available")]
    Overflow { needed: usize, max: usize },
    #[error("out of memory")]
    OutOfMemory,
    /// The operation exists but is not supported for this value (e.g. matching a
    /// `script` DATA-UNIT).
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn wrong_label(label: impl Into<String>, type_name: &str) -> Self {
        Error::WrongLabel {
            label: label.into(),
            type_name: type_name.to_string(),
        }
    }

    pub(crate) fn parse(consumed: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            consumed,
            message: message.into(),
        }
    }

    /// True for the "field absent" family that callers treat as "use default".
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::IncompleteValue(_))
    }

    /// Symbols consumed before a parse failure, if this is a parse error.
    pub fn consumed(&self) -> Option<usize> {
        match self {
            Error::Parse { consumed, .. } => Some(*consumed),
            _ => None,
        }
    }
}
