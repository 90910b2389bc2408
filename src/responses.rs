//! Generated answer log.
//!
//! Every `dh ask` stores its question, answer, the approach that produced
//! the context, the approach's metrics when relevance judgments were given,
//! and an optional 1–5 rating. `dh responses` lists the most recent rows.

use anyhow::{bail, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate;

/// Ratings accepted by the log.
pub const RATING_RANGE: std::ops::RangeInclusive<f64> = 1.0..=5.0;

/// A response to be logged.
#[derive(Debug, Clone, Default)]
pub struct NewResponse {
    pub query: String,
    pub response: String,
    pub approach: Option<String>,
    pub rating: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

/// A logged response.
#[derive(Debug, Clone)]
pub struct ResponseRecord {
    pub id: i64,
    pub query: String,
    pub response: String,
    pub approach: Option<String>,
    pub rating: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
    pub timestamp: String,
}

/// Insert `entry` and return its row id.
pub async fn log_response(pool: &SqlitePool, entry: &NewResponse) -> Result<i64> {
    if let Some(rating) = entry.rating {
        if !RATING_RANGE.contains(&rating) {
            bail!("rating must be between 1 and 5, got {}", rating);
        }
    }

    let timestamp = Utc::now().to_rfc3339();
    let result = sqlx::query(
        r#"
        INSERT INTO llm_responses (query, response, approach, rating, precision, recall, f1, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&entry.query)
    .bind(&entry.response)
    .bind(&entry.approach)
    .bind(entry.rating)
    .bind(entry.precision)
    .bind(entry.recall)
    .bind(entry.f1)
    .bind(&timestamp)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Most recent responses first.
pub async fn recent_responses(pool: &SqlitePool, limit: i64) -> Result<Vec<ResponseRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, query, response, approach, rating, precision, recall, f1, timestamp
        FROM llm_responses
        ORDER BY id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| ResponseRecord {
            id: row.get("id"),
            query: row.get("query"),
            response: row.get("response"),
            approach: row.get("approach"),
            rating: row.get("rating"),
            precision: row.get("precision"),
            recall: row.get("recall"),
            f1: row.get("f1"),
            timestamp: row.get("timestamp"),
        })
        .collect())
}

/// `dh responses`: print the latest logged answers.
pub async fn run_responses(config: &Config, limit: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let records = recent_responses(&pool, limit).await?;
    pool.close().await;

    if records.is_empty() {
        println!("No responses logged.");
        return Ok(());
    }

    for r in &records {
        let rating = r
            .rating
            .map(|v| format!("{:.0}/5", v))
            .unwrap_or_else(|| "unrated".to_string());
        println!("#{}  {}  [{}]", r.id, r.timestamp, rating);
        println!("    query:    {}", r.query);
        if let Some(approach) = &r.approach {
            match r.f1 {
                Some(f1) => println!("    approach: {} (f1={:.2})", approach, f1),
                None => println!("    approach: {}", approach),
            }
        }
        println!("    response: {}", r.response.replace('\n', " "));
        println!();
    }

    Ok(())
}
