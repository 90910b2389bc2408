//! Question answering: choose an approach, assemble context, generate.
//!
//! With relevance judgments every configured approach is evaluated and the
//! best by F1 supplies the hits. Without them the first configured approach
//! is used as-is. When no approach qualifies, or retrieval yields no context,
//! the answer is the fixed "not enough information" reply and the generator
//! is never called.

use anyhow::Result;
use discussion_harness_core::context::{assemble, AssembledContext, Tokenizer};
use discussion_harness_core::evaluate::{evaluate, Approach, Metrics};
use discussion_harness_core::search::Searcher;
use discussion_harness_core::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::generate::{Generator, OpenAIGenerator, INSUFFICIENT_INFORMATION};
use crate::responses::{log_response, NewResponse};
use crate::tokenizer::create_tokenizer;
use crate::typesense::TypesenseStore;
use crate::{db, migrate};

/// Result of answering one question.
#[derive(Debug, Clone)]
pub struct Answer {
    pub response: String,
    /// Name of the approach whose hits built the context.
    pub approach: Option<String>,
    /// Present only when relevance judgments were supplied.
    pub metrics: Option<Metrics>,
    pub context: AssembledContext,
}

impl Answer {
    fn insufficient(approach: Option<String>, metrics: Option<Metrics>) -> Self {
        Self {
            response: INSUFFICIENT_INFORMATION.to_string(),
            approach,
            metrics,
            context: AssembledContext::default(),
        }
    }
}

/// Everything [`answer`] needs besides the question.
pub struct AnswerPipeline<'a> {
    pub searcher: &'a Searcher<'a>,
    pub approaches: &'a [Approach],
    pub max_tokens: usize,
    pub tokenizer: &'a dyn Tokenizer,
    pub generator: &'a dyn Generator,
}

/// Answer `question`, scoring approaches against `relevant` when non-empty.
pub async fn answer(
    pipeline: &AnswerPipeline<'_>,
    question: &str,
    relevant: &[String],
) -> Result<Answer> {
    let Some(first) = pipeline.approaches.first() else {
        anyhow::bail!("No retrieval approaches configured");
    };

    let (approach, metrics, hits) = if relevant.is_empty() {
        let hits = first.run(pipeline.searcher, question).await?;
        (first.name.clone(), None, hits)
    } else {
        match evaluate(pipeline.searcher, question, relevant, pipeline.approaches).await {
            Ok(evaluation) => {
                let best = evaluation.into_best();
                (best.approach.name, Some(best.metrics), best.hits)
            }
            Err(Error::NoValidApproach { attempted, failed }) => {
                warn!(attempted, failed, "no approach qualified");
                return Ok(Answer::insufficient(None, None));
            }
            Err(e) => return Err(e.into()),
        }
    };

    let context = assemble(&hits, pipeline.max_tokens, pipeline.tokenizer);
    if context.hits_used == 0 {
        info!(approach = %approach, "no context assembled");
        return Ok(Answer::insufficient(Some(approach), metrics));
    }

    info!(
        approach = %approach,
        hits_used = context.hits_used,
        tokens = context.token_count,
        "generating answer"
    );
    let response = pipeline.generator.generate(question, &context.text).await?;

    Ok(Answer {
        response,
        approach: Some(approach),
        metrics,
        context,
    })
}

/// `dh ask`: answer, print, and log.
pub async fn run_ask(
    config: &Config,
    question: &str,
    relevant: &[String],
    rating: Option<f64>,
) -> Result<()> {
    let store = TypesenseStore::from_env(&config.index)?;
    let searcher = Searcher::new(&store, &config.index.collection);
    let approaches = config.retrieval.approaches();
    let tokenizer = create_tokenizer(config.context.encoding)?;
    let generator = OpenAIGenerator::new(&config.generation)?;

    let pipeline = AnswerPipeline {
        searcher: &searcher,
        approaches: &approaches,
        max_tokens: config.context.max_tokens,
        tokenizer: tokenizer.as_ref(),
        generator: &generator,
    };
    let answer = answer(&pipeline, question, relevant).await?;

    println!("{}", answer.response);
    println!();
    match (&answer.approach, &answer.metrics) {
        (Some(name), Some(m)) => println!(
            "approach: {} (precision={:.3} recall={:.3} f1={:.3})",
            name, m.precision, m.recall, m.f1
        ),
        (Some(name), None) => println!("approach: {}", name),
        (None, _) => println!("approach: none"),
    }
    if answer.context.hits_used > 0 {
        println!(
            "context: {} hits, {} tokens",
            answer.context.hits_used, answer.context.token_count
        );
    }

    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let id = log_response(
        &pool,
        &NewResponse {
            query: question.to_string(),
            response: answer.response.clone(),
            approach: answer.approach.clone(),
            rating,
            precision: answer.metrics.map(|m| m.precision),
            recall: answer.metrics.map(|m| m.recall),
            f1: answer.metrics.map(|m| m.f1),
        },
    )
    .await?;
    pool.close().await;
    println!("logged as #{}", id);

    Ok(())
}
