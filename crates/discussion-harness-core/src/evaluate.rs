//! Retrieval approach evaluation.
//!
//! An [`Approach`] is a named search configuration. The evaluator runs the
//! query once per approach, scores the retrieved ids against a set of
//! known-relevant ids, and picks the approach with the highest F1.
//!
//! # Selection
//!
//! - Strictly greater F1 wins; on ties the earlier approach is kept.
//! - Approaches whose search fails are logged and skipped.
//! - If no approach scores above zero the evaluation fails with
//!   [`Error::NoValidApproach`].

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::SearchHit;
use crate::search::Searcher;

/// A named search configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Approach {
    pub name: String,
    pub fields: Vec<String>,
    pub num_typos: u8,
    pub limit: usize,
}

impl Approach {
    /// One approach per typo setting, sharing fields and limit.
    pub fn typo_variants(fields: &[String], typo_candidates: &[u8], limit: usize) -> Vec<Approach> {
        typo_candidates
            .iter()
            .map(|&num_typos| Approach {
                name: format!("typos-{}", num_typos),
                fields: fields.to_vec(),
                num_typos,
                limit,
            })
            .collect()
    }

    pub async fn run(&self, searcher: &Searcher<'_>, query: &str) -> Result<Vec<SearchHit>> {
        searcher
            .search(query, &self.fields, self.num_typos, self.limit)
            .await
    }
}

/// Precision, recall, and F1 for one retrieved set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Metrics {
    /// Score `retrieved` against `relevant`. Duplicate ids count once.
    pub fn score<R, S>(retrieved: R, relevant: S) -> Self
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let retrieved: HashSet<String> = retrieved
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let relevant: HashSet<String> = relevant
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let true_positives = retrieved.intersection(&relevant).count() as f64;
        let precision = if retrieved.is_empty() {
            0.0
        } else {
            true_positives / retrieved.len() as f64
        };
        let recall = if relevant.is_empty() {
            0.0
        } else {
            true_positives / relevant.len() as f64
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            precision,
            recall,
            f1,
        }
    }
}

/// Outcome of one approach.
#[derive(Debug, Clone)]
pub struct ApproachResult {
    pub approach: Approach,
    pub metrics: Metrics,
    pub hits: Vec<SearchHit>,
}

/// All outcomes of an evaluation plus the winner.
///
/// Only [`evaluate`] builds one, so `best` always indexes a successful
/// result.
#[derive(Debug, Clone)]
pub struct Evaluation {
    results: Vec<Option<ApproachResult>>,
    best: usize,
}

impl Evaluation {
    /// One entry per approach, `None` where the search failed.
    pub fn results(&self) -> &[Option<ApproachResult>] {
        &self.results
    }

    /// Position of the selected approach in [`results`](Self::results).
    pub fn best_index(&self) -> usize {
        self.best
    }

    pub fn best(&self) -> &ApproachResult {
        self.results[self.best]
            .as_ref()
            .expect("best always indexes a successful result")
    }

    pub fn into_best(mut self) -> ApproachResult {
        self.results
            .swap_remove(self.best)
            .expect("best always indexes a successful result")
    }
}

/// Index of the first approach with the strictly greatest F1 above zero.
pub fn pick_best(f1_scores: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, f1) in f1_scores.iter().enumerate() {
        let Some(f1) = *f1 else { continue };
        let current = best.map(|(_, b)| b).unwrap_or(0.0);
        if f1 > current {
            best = Some((i, f1));
        }
    }
    best.map(|(i, _)| i)
}

/// Run every approach and select the best one by F1.
pub async fn evaluate<S: AsRef<str>>(
    searcher: &Searcher<'_>,
    query: &str,
    relevant_ids: &[S],
    approaches: &[Approach],
) -> Result<Evaluation> {
    let mut results = Vec::with_capacity(approaches.len());
    let mut failed = 0;

    for approach in approaches {
        match approach.run(searcher, query).await {
            Ok(hits) => {
                let metrics = Metrics::score(hits.iter().map(|h| h.id()), relevant_ids);
                info!(
                    approach = %approach.name,
                    precision = metrics.precision,
                    recall = metrics.recall,
                    f1 = metrics.f1,
                    "evaluated approach"
                );
                results.push(Some(ApproachResult {
                    approach: approach.clone(),
                    metrics,
                    hits,
                }));
            }
            Err(e) => {
                warn!(approach = %approach.name, "approach failed, skipping: {}", e);
                failed += 1;
                results.push(None);
            }
        }
    }

    let scores: Vec<Option<f64>> = results
        .iter()
        .map(|r| r.as_ref().map(|r| r.metrics.f1))
        .collect();

    match pick_best(&scores) {
        Some(best) => Ok(Evaluation { results, best }),
        None => Err(Error::NoValidApproach {
            attempted: approaches.len(),
            failed,
        }),
    }
}
