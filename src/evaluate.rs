//! `dh evaluate`: score each configured approach against relevance
//! judgments and report the winner.

use anyhow::Result;
use discussion_harness_core::evaluate::{evaluate, Evaluation};
use discussion_harness_core::search::Searcher;
use discussion_harness_core::Error;

use crate::config::Config;
use crate::generate::INSUFFICIENT_INFORMATION;
use crate::typesense::TypesenseStore;

pub async fn run_evaluate(config: &Config, query: &str, relevant: &[String]) -> Result<()> {
    let store = TypesenseStore::from_env(&config.index)?;
    let searcher = Searcher::new(&store, &config.index.collection);
    let approaches = config.retrieval.approaches();

    match evaluate(&searcher, query, relevant, &approaches).await {
        Ok(evaluation) => {
            print_evaluation(&evaluation);
            Ok(())
        }
        Err(Error::NoValidApproach { attempted, failed }) => {
            println!(
                "No approach retrieved a relevant document ({} attempted, {} failed).",
                attempted, failed
            );
            println!("{}", INSUFFICIENT_INFORMATION);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_evaluation(evaluation: &Evaluation) {
    println!(
        "  {:<12} {:>9} {:>7} {:>6} {:>5}",
        "APPROACH", "PRECISION", "RECALL", "F1", "HITS"
    );
    println!("  {}", "-".repeat(43));
    for (i, result) in evaluation.results().iter().enumerate() {
        match result {
            Some(r) => println!(
                "  {:<12} {:>9.3} {:>7.3} {:>6.3} {:>5}{}",
                r.approach.name,
                r.metrics.precision,
                r.metrics.recall,
                r.metrics.f1,
                r.hits.len(),
                if i == evaluation.best_index() { "  *" } else { "" }
            ),
            None => println!("  {:<12} {:>9}", format!("#{}", i + 1), "failed"),
        }
    }
    println!();
    println!("best: {}", evaluation.best().approach.name);
}
