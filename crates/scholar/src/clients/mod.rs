//! Clients for the two remote systems the library talks to.
//!
//! - [`arxiv`] - Client for the arXiv.org catalog, listing a category's papers for a given day
//! - [`openrouter`] - Client for an OpenAI-compatible chat completion endpoint (OpenRouter by
//!   default) that turns an abstract into a [`Recommendation`]
//!
//! The analysis pipeline only depends on the [`ModelClient`] trait, so tests and alternative
//! providers can stand in for the HTTP client.
//!
//! # Examples
//!
//! ```no_run
//! use scholar::{
//!   clients::{ArxivClient, ModelClient, OpenRouterClient},
//!   prompt::Audience,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let date = chrono::NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
//! let papers = ArxivClient::new().fetch_category("cs.AI", date, 10).await?;
//!
//! let client = OpenRouterClient::new("sk-or-...")?;
//! let recommendation =
//!   client.analyze(&papers[0].abstract_text, "planning", Audience::General).await?;
//! println!("{}", recommendation.key_contributions);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

pub mod arxiv;
pub mod openrouter;

pub use arxiv::ArxivClient;
pub use openrouter::OpenRouterClient;

use super::*;
use crate::{errors::AnalysisError, prompt::Audience};

/// A remote model that analyzes one paper's content into one recommendation per call.
///
/// Implementations make at most one attempt per call. Timeouts and connection failures are
/// returned as [`AnalysisError::Transport`] rather than retried.
#[async_trait]
pub trait ModelClient: Send + Sync {
  /// Analyzes `content` for relevance to `field`, written for `audience`.
  async fn analyze(
    &self,
    content: &str,
    field: &str,
    audience: Audience,
  ) -> Result<Recommendation, AnalysisError>;
}

