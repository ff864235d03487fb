//! Drives one analysis run over a day's candidate papers.
//!
//! For every category the orchestrator selects a single representative paper, asks the
//! [`ModelClient`] for a [`Recommendation`], and records either the recommendation or a
//! [`FailureRecord`] tagged with the stage that failed. Categories are processed one at a time in
//! ascending name order, so at most one model call is in flight.
//!
//! A run is cancelled through a [`CancellationToken`]. The token is checked before each category;
//! a call already in flight is allowed to finish. Categories not reached are left out of the
//! report.

use tokio_util::sync::CancellationToken;

use super::*;
use crate::{
  clients::ModelClient,
  errors::AnalysisError,
  prompt::Audience,
  report::{FailureRecord, RunReport},
};

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
  /// Date of the analyzed papers, `YYYY-MM-DD`
  pub date:     String,
  /// Field the recommendations should be relevant to
  pub field:    String,
  /// Intended reader
  pub audience: Audience,
}

impl AnalysisRequest {
  /// Creates a request for `date`, biased towards `field` and written for `audience`.
  pub fn new(date: impl Into<String>, field: impl Into<String>, audience: Audience) -> Self {
    Self { date: date.into(), field: field.into(), audience }
  }
}

/// Runs the per-category pipeline against a [`ModelClient`].
pub struct AnalysisOrchestrator<C> {
  /// Model used for every category
  client: C,
}

impl<C: ModelClient> AnalysisOrchestrator<C> {
  /// Creates an orchestrator that analyzes papers with `client`.
  pub fn new(client: C) -> Self { Self { client } }

  /// The model client in use.
  pub fn client(&self) -> &C { &self.client }

  /// Analyzes one representative paper per category and reports the outcome.
  ///
  /// Failures never abort the run. Each one becomes a [`FailureRecord`] and processing moves on
  /// to the next category. A category without any candidates is recorded as an
  /// [`Unknown`](crate::report::FailureStage::Unknown) failure.
  pub async fn run(
    &self,
    request: &AnalysisRequest,
    candidates: &BTreeMap<String, Vec<CandidatePaper>>,
    cancel: &CancellationToken,
  ) -> RunReport {
    info!(
      "Analyzing {} categories for '{}' ({} audience)",
      candidates.len(),
      request.field,
      request.audience
    );

    let mut recommendations = Vec::new();
    let mut failures = Vec::new();
    let mut cancelled = false;

    for (category, papers) in candidates {
      if cancel.is_cancelled() {
        warn!("Run cancelled, skipping remaining categories from {category}");
        cancelled = true;
        break;
      }

      let Some(paper) = select_representative(papers) else {
        warn!("No candidates for {category}, skipping");
        failures.push(FailureRecord::no_candidates(category));
        continue;
      };

      match self.process_category(category, paper, request).await {
        Ok(recommendation) => {
          info!("{category}: recommended '{}'", recommendation.title);
          recommendations.push(recommendation);
        },
        Err(failure) => {
          warn!(
            "{category}: analysis of {} failed at {}: {}",
            failure.source_ref, failure.failure_stage, failure.error_details
          );
          failures.push(failure);
        },
      }
    }

    let report = RunReport::assemble(request, candidates, recommendations, failures, cancelled);
    info!(
      "Run finished: {} succeeded, {} failed",
      report.metadata.success_count, report.metadata.failure_count
    );
    report
  }

  /// Takes one selected paper through abstract extraction and model analysis.
  async fn process_category(
    &self,
    category: &str,
    paper: &CandidatePaper,
    request: &AnalysisRequest,
  ) -> Result<Recommendation, FailureRecord> {
    let fail = |error: AnalysisError| FailureRecord::from_error(paper, category, &error);

    let content = paper.content().ok_or_else(|| fail(AnalysisError::AbstractMissing))?;
    debug!("{category}: analyzing {} ({} chars)", paper.id, content.chars().count());

    let mut recommendation =
      self.client.analyze(content, &request.field, request.audience).await.map_err(fail)?;
    recommendation.category = category.to_string();
    Ok(recommendation)
  }
}

/// Picks the candidate with the most citations, preferring the earliest on ties.
///
/// Returns `None` only for an empty slice.
pub fn select_representative(papers: &[CandidatePaper]) -> Option<&CandidatePaper> {
  papers.iter().fold(None, |best: Option<&CandidatePaper>, paper| match best {
    Some(current) if current.citations() >= paper.citations() => Some(current),
    _ => Some(paper),
  })
}
