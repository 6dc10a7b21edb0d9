use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = open_connection(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

pub fn open_connection(path: &Path) -> Result<Connection, InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(connection)
}

pub fn parse_timestamp(raw: &str, field_name: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| {
            InfraError::InvalidConfig(format!("invalid {field_name} '{raw}': {error}"))
        })
}

pub fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_twice_without_error() {
        let path = std::env::temp_dir().join(format!(
            "taskdeck-storage-test-{}.sqlite",
            std::process::id()
        ));
        initialize_database(&path).expect("first init");
        initialize_database(&path).expect("second init");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn timestamps_round_trip_through_rfc3339() {
        let parsed = parse_timestamp("2026-02-16T09:00:00+00:00", "created_at").expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2026-02-16T09:00:00+00:00");
        assert!(parse_timestamp("yesterday", "created_at").is_err());
    }
}
