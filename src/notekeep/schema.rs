//! Schema bootstrap applied at startup.

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{debug, info_span, Instrument};

pub const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

/// Apply every statement of the embedded schema. Statements use
/// `IF NOT EXISTS`, so running this against an initialised database is a no-op.
///
/// # Errors
/// Returns an error naming the first statement that fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    let statements = split_sql_statements(SCHEMA_SQL);

    for (index, statement) in statements.iter().enumerate() {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DDL",
            db.statement = statement.as_str()
        );
        sqlx::query(statement)
            .execute(pool)
            .instrument(span)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    debug!(statements = statements.len(), "schema is up to date");
    Ok(())
}

/// Split a script on lines ending with `;`. Comment-only chunks are dropped.
pub(crate) fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}
