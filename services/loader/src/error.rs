//! Load failures, split by what the operator has to do about them.

use std::path::PathBuf;

use thiserror::Error;

/// SQLSTATE raised when a row references a missing parent row.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug, Error)]
pub enum LoadError {
    /// Server unreachable, refused the login, or the database does not exist.
    #[error("cannot reach database: {0}")]
    Connectivity(#[source] sqlx::Error),

    #[error("{table}: referential integrity violation: {message}")]
    ReferentialIntegrity { table: &'static str, message: String },

    #[error("{table}: failed to read {}: {source}", .path.display())]
    Read {
        table: &'static str,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{table}: insert failed: {source}")]
    Insert {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("schema creation failed: {0}")]
    Schema(#[source] sqlx::Error),
}

impl LoadError {
    /// Classify a failure raised while writing `table`.
    pub fn from_insert(table: &'static str, err: sqlx::Error) -> Self {
        if is_connectivity(&err) {
            return Self::Connectivity(err);
        }

        let violation = match &err {
            sqlx::Error::Database(db)
                if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) =>
            {
                Some(db.message().to_string())
            }
            _ => None,
        };

        match violation {
            Some(message) => Self::ReferentialIntegrity { table, message },
            None => Self::Insert { table, source: err },
        }
    }

    pub fn from_schema(err: sqlx::Error) -> Self {
        if is_connectivity(&err) {
            Self::Connectivity(err)
        } else {
            Self::Schema(err)
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity(_))
    }
}

pub fn is_connectivity(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db) => db.code().as_deref().is_some_and(is_connectivity_code),
        _ => false,
    }
}

/// Class 08 (connection exception), failed authentication, unknown database.
pub fn is_connectivity_code(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "28000" | "28P01" | "3D000")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::io;

    use sqlx::error::{DatabaseError, ErrorKind};

    /// Server-side error carrying only a SQLSTATE and a message.
    #[derive(Debug, Error)]
    #[error("{message}")]
    struct ServerError {
        code: &'static str,
        message: &'static str,
    }

    impl DatabaseError for ServerError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            match self.code {
                FOREIGN_KEY_VIOLATION => ErrorKind::ForeignKeyViolation,
                "23505" => ErrorKind::UniqueViolation,
                _ => ErrorKind::Other,
            }
        }
    }

    fn server_error(code: &'static str, message: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(ServerError { code, message }))
    }

    #[test]
    fn test_io_errors_are_connectivity() {
        let refused = sqlx::Error::Io(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(is_connectivity(&refused));
        assert!(is_connectivity(&sqlx::Error::PoolTimedOut));
        assert!(is_connectivity(&sqlx::Error::PoolClosed));
    }

    #[test]
    fn test_other_errors_are_generic() {
        assert!(!is_connectivity(&sqlx::Error::RowNotFound));
        let err = LoadError::from_insert("players", sqlx::Error::RowNotFound);
        assert!(matches!(err, LoadError::Insert { table: "players", .. }));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_insert_timeout_classified_as_connectivity() {
        let err = LoadError::from_insert("damage_events", sqlx::Error::PoolTimedOut);
        assert!(err.is_connectivity());
        assert!(LoadError::from_schema(sqlx::Error::PoolTimedOut).is_connectivity());
    }

    #[test]
    fn test_connectivity_codes() {
        assert!(is_connectivity_code("08001"));
        assert!(is_connectivity_code("08006"));
        assert!(is_connectivity_code("28P01"));
        assert!(is_connectivity_code("3D000"));
        assert!(!is_connectivity_code(FOREIGN_KEY_VIOLATION));
        assert!(!is_connectivity_code("23505"));
    }

    #[test]
    fn test_messages_name_the_table() {
        let err = LoadError::ReferentialIntegrity {
            table: "rounds",
            message: "insert or update on table \"rounds\" violates foreign key constraint".to_string(),
        };
        assert!(err.to_string().starts_with("rounds: referential integrity violation"));
    }

    #[test]
    fn test_foreign_key_violation_is_referential_integrity() {
        let err = LoadError::from_insert(
            "rounds",
            server_error(
                FOREIGN_KEY_VIOLATION,
                "insert or update on table \"rounds\" violates foreign key constraint \"rounds_match_id_fkey\"",
            ),
        );

        match &err {
            LoadError::ReferentialIntegrity { table, message } => {
                assert_eq!(*table, "rounds");
                assert!(message.contains("rounds_match_id_fkey"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_unique_violation_is_generic_insert_error() {
        let err = LoadError::from_insert(
            "players",
            server_error("23505", "duplicate key value violates unique constraint \"players_steam_id_key\""),
        );
        assert!(matches!(err, LoadError::Insert { table: "players", .. }));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn test_server_connectivity_codes_classified() {
        for code in ["08006", "28P01", "3D000"] {
            let err = LoadError::from_insert("maps", server_error(code, "connection lost"));
            assert!(err.is_connectivity(), "{code}");
        }
        assert!(!is_connectivity(&server_error(FOREIGN_KEY_VIOLATION, "fk")));
    }
}
