//! Error types for the accessor layer.
//!
//! Read paths never surface errors: a broken read degrades to a
//! placeholder or a benign default so rendering cannot crash. Errors exist
//! only where the caller can act on them — mutation, pagination, and
//! query parsing. Load failures are recorded into `LoadState` rather than
//! returned, and a tripped recursion guard is not an error at all: it is
//! triggered by host-framework internals outside the caller's control, so
//! it silently degrades instead.

/// Errors on the actionable (write/query) paths of the accessor.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The loader callback rejected. Recorded in `LoadState` with a
    /// cooldown; surfaced only through state queries, never thrown at a
    /// reader.
    #[error("load of collection '{collection}' failed: {message}")]
    LoadFailure { collection: String, message: String },

    /// The requested operation has no registered handler. The method
    /// exists either way, so callers get this message instead of a
    /// missing-method crash.
    #[error("collection '{collection}' has no {capability} handler registered")]
    CapabilityUnavailable {
        collection: String,
        capability: &'static str,
    },

    /// The collection's classification does not allow this operation.
    #[error("collection '{collection}' does not support {operation}")]
    UnsupportedOperation {
        collection: String,
        operation: String,
    },

    /// A registered handler failed while performing an operation.
    #[error("{operation} on collection '{collection}' failed: {message}")]
    Handler {
        collection: String,
        operation: String,
        message: String,
    },

    /// A query operation list could not be parsed.
    #[error("invalid query operation: {message}")]
    InvalidQuery { message: String },
}

impl Error {
    /// Shorthand for a handler failure.
    pub fn handler(
        collection: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Handler {
            collection: collection.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Shorthand for an invalid query op.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Error::InvalidQuery {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_collection() {
        let e = Error::CapabilityUnavailable {
            collection: "users".to_string(),
            capability: "mutation",
        };
        let text = e.to_string();
        assert!(text.contains("users"));
        assert!(text.contains("mutation"));
    }

    #[test]
    fn unsupported_operation_display() {
        let e = Error::UnsupportedOperation {
            collection: "prefs".to_string(),
            operation: "paginate".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "collection 'prefs' does not support paginate"
        );
    }

    #[test]
    fn handler_shorthand() {
        let e = Error::handler("users", "create", "500 from backend");
        assert!(matches!(e, Error::Handler { .. }));
        assert!(e.to_string().contains("500 from backend"));
    }

    #[test]
    fn invalid_query_shorthand() {
        let e = Error::invalid_query("unknown op 'betwixt'");
        assert!(e.to_string().contains("betwixt"));
    }
}
