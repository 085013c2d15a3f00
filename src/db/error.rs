use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("connection failed: {0}")]
    Connection(#[from] tokio_postgres::Error),

    #[error("{context}: {source}")]
    Query {
        context: &'static str,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String, hint: Option<String> },

    #[error("{function} returned false for PID {pid}")]
    BackendActionRejected { function: &'static str, pid: i32 },
}

impl DbError {
    /// Wrap a statement error, lifting privilege failures into `PermissionDenied`.
    pub fn query(context: &'static str, source: tokio_postgres::Error) -> Self {
        if let Some(db) = source.as_db_error() {
            if *db.code() == tokio_postgres::error::SqlState::INSUFFICIENT_PRIVILEGE {
                return Self::PermissionDenied {
                    message: db.message().to_string(),
                    hint: db.hint().map(ToString::to_string),
                };
            }
        }
        Self::Query { context, source }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_display() {
        let err = DbError::PermissionDenied {
            message: "permission denied for table secrets".to_string(),
            hint: Some("GRANT SELECT ON secrets TO monitor".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "permission denied: permission denied for table secrets"
        );
    }

    #[test]
    fn rejected_terminate_display() {
        let err = DbError::BackendActionRejected {
            function: "pg_terminate_backend",
            pid: 4242,
        };
        assert_eq!(
            err.to_string(),
            "pg_terminate_backend returned false for PID 4242"
        );
    }

    #[test]
    fn rejected_cancel_display() {
        let err = DbError::BackendActionRejected {
            function: "pg_cancel_backend",
            pid: 7,
        };
        assert_eq!(err.to_string(), "pg_cancel_backend returned false for PID 7");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DbError>();
    }

    #[test]
    fn debug_format_includes_variant() {
        let err = DbError::PermissionDenied {
            message: "test".to_string(),
            hint: None,
        };
        let debug = format!("{err:?}");
        assert!(debug.contains("PermissionDenied"));
        assert!(debug.contains("test"));
    }
}
