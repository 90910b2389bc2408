use anyhow::Result;
use sqlx::SqlitePool;

/// Create the response log tables if missing.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS llm_responses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            query TEXT NOT NULL,
            response TEXT NOT NULL,
            approach TEXT,
            rating REAL,
            precision REAL,
            recall REAL,
            f1 REAL,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_llm_responses_timestamp ON llm_responses(timestamp DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
