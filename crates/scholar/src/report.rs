//! The aggregate result of one analysis run and where it is written.
//!
//! A [`RunReport`] is assembled by the
//! [`AnalysisOrchestrator`](crate::analysis::AnalysisOrchestrator) once every category has been
//! processed (or the run was cancelled), and handed to a [`ReportSink`].
//!
//! # Examples
//!
//! ```no_run
//! use scholar::report::{JsonReportSink, ReportSink, RunReport};
//!
//! # async fn example(report: RunReport) -> Result<(), Box<dyn std::error::Error>> {
//! let sink = JsonReportSink::new("papers");
//! let path = sink.persist(&report).await?;
//! println!("Analysis saved to: {}", path.display());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use super::*;
use crate::{analysis::AnalysisRequest, errors::AnalysisError, format, prompt::Audience};

/// The pipeline stage at which a paper's analysis failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
  /// The selected paper had no abstract
  AbstractExtraction,
  /// The prompt could not be built
  PromptCreation,
  /// The request failed in transit or returned a non-success status
  ApiRequest,
  /// The response envelope or completion text could not be understood
  ApiResponseParsing,
  /// Any other failure during analysis
  Analysis,
  /// The failure could not be attributed to a stage
  Unknown,
  /// An operator aborted the paper's analysis while it was in flight
  ///
  /// The orchestrator itself lets in-flight calls finish and omits unprocessed categories, so it
  /// never records this stage; it exists for callers that abort a call outright.
  UserCancelled,
}

impl std::fmt::Display for FailureStage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      FailureStage::AbstractExtraction => "abstract_extraction",
      FailureStage::PromptCreation => "prompt_creation",
      FailureStage::ApiRequest => "api_request",
      FailureStage::ApiResponseParsing => "api_response_parsing",
      FailureStage::Analysis => "analysis",
      FailureStage::Unknown => "unknown",
      FailureStage::UserCancelled => "user_cancelled",
    };
    write!(f, "{name}")
  }
}

/// Why one category's selected paper produced no recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
  /// Identifier of the failed paper
  pub source_ref:      String,
  /// Category the paper was selected from
  pub category:        String,
  /// Stage at which the analysis stopped
  pub failure_stage:   FailureStage,
  /// Stable error name, e.g. `TransportError`
  pub error_type:      String,
  /// Human readable error description
  pub error_details:   String,
  /// When the failure was recorded
  pub timestamp:       DateTime<Utc>,
  /// Title of the failed paper, if known
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title:           Option<String>,
  /// The beginning of the abstract that was sent, if any
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_preview: Option<String>,
}

impl FailureRecord {
  /// Records `error` for `paper`.
  pub fn from_error(paper: &CandidatePaper, category: &str, error: &AnalysisError) -> Self {
    Self {
      source_ref:      paper.id.clone(),
      category:        category.to_string(),
      failure_stage:   error.stage(),
      error_type:      error.kind().to_string(),
      error_details:   error.to_string(),
      timestamp:       Utc::now(),
      title:           (!paper.title.is_empty()).then(|| paper.title.clone()),
      content_preview: paper.content_preview(),
    }
  }

  /// Records that `category` had no candidate to analyze.
  pub fn no_candidates(category: &str) -> Self {
    Self {
      source_ref:      category.to_string(),
      category:        category.to_string(),
      failure_stage:   FailureStage::Unknown,
      error_type:      "NoCandidatesError".to_string(),
      error_details:   format!("No candidate papers for {category}"),
      timestamp:       Utc::now(),
      title:           None,
      content_preview: None,
    }
  }
}

/// Run-level metadata of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
  /// The date whose papers were analyzed, `YYYY-MM-DD`
  pub date:                String,
  /// Field the recommendations were biased towards
  pub field:               String,
  /// Intended audience
  pub audience:            Audience,
  /// Number of categories in the run, including any omitted after cancellation
  pub total_categories:    usize,
  /// Category names in processing order
  pub categories:          Vec<String>,
  /// Number of candidates per category
  pub papers_per_category: BTreeMap<String, usize>,
  /// Number of recommendations produced
  pub success_count:       usize,
  /// Number of failure records
  pub failure_count:       usize,
  /// `success_count / total_categories`, or 0 for an empty run
  pub success_rate:        f64,
  /// Whether the run was cancelled before every category was processed
  pub cancelled:           bool,
  /// When the report was assembled
  pub timestamp:           DateTime<Utc>,
}

/// The aggregate output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
  /// Run parameters and counts
  pub metadata:        RunMetadata,
  /// Number of failures per stage; stages without failures are absent
  pub failure_summary: BTreeMap<FailureStage, usize>,
  /// Successful analyses, each tagged with its category
  pub recommendations: Vec<Recommendation>,
  /// Failed analyses
  pub failures:        Vec<FailureRecord>,
}

impl RunReport {
  /// Assembles the final report from the run's accumulated outcomes.
  pub fn assemble(
    request: &AnalysisRequest,
    candidates: &BTreeMap<String, Vec<CandidatePaper>>,
    recommendations: Vec<Recommendation>,
    failures: Vec<FailureRecord>,
    cancelled: bool,
  ) -> Self {
    let total_categories = candidates.len();
    let success_count = recommendations.len();
    let success_rate =
      if total_categories == 0 { 0.0 } else { success_count as f64 / total_categories as f64 };

    let mut failure_summary = BTreeMap::new();
    for failure in &failures {
      *failure_summary.entry(failure.failure_stage).or_insert(0) += 1;
    }

    Self {
      metadata: RunMetadata {
        date: request.date.clone(),
        field: request.field.clone(),
        audience: request.audience,
        total_categories,
        categories: candidates.keys().cloned().collect(),
        papers_per_category: candidates
          .iter()
          .map(|(category, papers)| (category.clone(), papers.len()))
          .collect(),
        success_count,
        failure_count: failures.len(),
        success_rate,
        cancelled,
        timestamp: Utc::now(),
      },
      failure_summary,
      recommendations,
      failures,
    }
  }

  /// File name encoding field, audience, timestamp and success rate, e.g.
  /// `analysis_reinforcement_learning_general_20241105_142501_sr75.json`.
  pub fn file_name(&self) -> String {
    let meta = &self.metadata;
    format!(
      "analysis_{}_{}_{}_sr{}.json",
      format::slug(&meta.field, None),
      meta.audience,
      meta.timestamp.format("%Y%m%d_%H%M%S"),
      (meta.success_rate * 100.0).floor() as u32,
    )
  }
}

/// Destination for finished reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
  /// Writes `report` and returns where it was written.
  async fn persist(&self, report: &RunReport) -> Result<PathBuf, ScholarError>;
}

/// Writes reports as pretty-printed JSON next to the papers they analyze, at
/// `<base_dir>/<date>/<RunReport::file_name>`.
///
/// A report whose date is not `YYYY-MM-DD` is refused with [`ScholarError::InvalidDate`].
#[derive(Debug, Clone)]
pub struct JsonReportSink {
  /// Root directory holding one sub-directory per date.
  base_dir: PathBuf,
}

impl JsonReportSink {
  /// Creates a sink rooted at `base_dir`.
  pub fn new(base_dir: impl Into<PathBuf>) -> Self { Self { base_dir: base_dir.into() } }
}

#[async_trait]
impl ReportSink for JsonReportSink {
  async fn persist(&self, report: &RunReport) -> Result<PathBuf, ScholarError> {
    let date = &report.metadata.date;
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
      return Err(ScholarError::InvalidDate(date.clone()));
    }
    let dir = self.base_dir.join(date);
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(report.file_name());
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(&path, json).await?;
    info!("Analysis saved to: {}", path.display());
    Ok(path)
  }
}
