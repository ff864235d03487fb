//! A library for turning freshly published arXiv papers into structured recommendations.
//!
//! Candidate papers are fetched per category from the arXiv catalog, persisted as per-date JSON
//! files (and indexed in SQLite), and then analyzed one representative paper per category by a
//! remote language model. The model's loosely formatted answer is parsed into a
//! [`Recommendation`], and every run produces a [`RunReport`] with partial-failure accounting.
//!
//! # Example
//! ```rust,no_run
//! use scholar::{
//!   analysis::{AnalysisOrchestrator, AnalysisRequest},
//!   clients::OpenRouterClient,
//!   prompt::Audience,
//!   store::{JsonPaperStore, PaperStore},
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let store = JsonPaperStore::new("papers");
//!   let candidates = store.load_all("2024-11-05").await?;
//!
//!   let client = OpenRouterClient::new("sk-or-...")?;
//!   let orchestrator = AnalysisOrchestrator::new(client);
//!   let request = AnalysisRequest::new("2024-11-05", "reinforcement learning", Audience::General);
//!   let report = orchestrator.run(&request, &candidates, &CancellationToken::new()).await;
//!
//!   println!("success rate: {:.2}", report.metadata.success_rate);
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  collections::{BTreeMap, BTreeSet},
  path::{Path, PathBuf},
  str::FromStr,
};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod analysis;
pub mod clients;
pub mod config;
pub mod database;
pub mod errors;
pub mod format;
pub mod paper;
pub mod parser;
pub mod prompt;
pub mod report;
pub mod store;

pub use analysis::{AnalysisOrchestrator, AnalysisRequest};
pub use errors::{AnalysisError, ParseError, ScholarError};
pub use paper::{CandidatePaper, Recommendation};
pub use prompt::{Audience, PromptBuilder};
pub use report::{FailureRecord, FailureStage, RunReport};
