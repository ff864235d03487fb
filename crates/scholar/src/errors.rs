//! Error types for the scholar library.
//!
//! Two families of errors live here:
//! - [`ScholarError`] covers infrastructure failures: network, XML/JSON/TOML decoding, the SQLite
//!   index, the filesystem and invalid user input such as malformed dates.
//! - [`AnalysisError`] (with its [`ParseError`] subtype) is the taxonomy of a single paper's trip
//!   through the analysis pipeline. These never abort a run; the orchestrator downgrades each one
//!   into a [`FailureRecord`](crate::report::FailureRecord) tagged with the
//!   [`FailureStage`](crate::report::FailureStage) reported by [`AnalysisError::stage`].
//!
//! # Examples
//!
//! ```
//! use scholar::{errors::AnalysisError, report::FailureStage};
//!
//! let err = AnalysisError::Transport { status: Some(429), details: "rate limited".into() };
//! assert_eq!(err.stage(), FailureStage::ApiRequest);
//! assert_eq!(err.kind(), "TransportError");
//! ```

use thiserror::Error;

use crate::{parser::Section, report::FailureStage};

/// Errors that can occur when fetching, storing or reporting on papers.
#[derive(Error, Debug)]
pub enum ScholarError {
  /// A network request failed.
  ///
  /// This covers unreachable hosts, TLS failures and timeouts from either the arXiv catalog or
  /// the model endpoint when used outside of the per-paper pipeline.
  #[error(transparent)]
  Network(#[from] reqwest::Error),

  /// An API returned an error response or a body we could not understand.
  #[error("API error: {0}")]
  ApiError(String),

  /// Failed to parse a URL.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// A date string was not in `YYYY-MM-DD` form.
  #[error("Invalid date `{0}`, expected YYYY-MM-DD")]
  InvalidDate(String),

  /// No papers are stored for the requested date.
  #[error("No papers found for date {0}")]
  NoPapers(String),

  /// The model credential was empty.
  #[error("Missing API key for the model endpoint")]
  MissingApiKey,

  /// A SQLite operation failed.
  #[error(transparent)]
  Sqlite(#[from] rusqlite::Error),

  /// An async SQLite operation failed.
  #[error(transparent)]
  AsyncSqlite(#[from] tokio_rusqlite::Error),

  /// A file system operation failed.
  #[error(transparent)]
  Path(#[from] std::io::Error),

  /// JSON encoding or decoding failed.
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The configuration file could not be decoded.
  #[error(transparent)]
  Config(#[from] toml::de::Error),

  /// A glob pattern built from a user supplied path was invalid.
  #[error(transparent)]
  Glob(#[from] glob::PatternError),
}

/// Why a placeholder echo or missing data stopped a model response from becoming a
/// [`Recommendation`](crate::paper::Recommendation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
  /// One or more of the required sections were absent or empty.
  ///
  /// The sections are listed in their canonical order.
  #[error("Missing required sections: {}", join_sections(.0))]
  MissingSections(Vec<Section>),

  /// A section held a template placeholder instead of real content, e.g. `Unknown Title`.
  ///
  /// This is the `SentinelValueError` subtype: the model echoed the template rather than
  /// extracting anything from the paper.
  #[error("{section} not properly extracted: found placeholder `{value}`")]
  SentinelValue {
    /// The section holding the placeholder
    section: Section,
    /// The placeholder text exactly as found
    value:   String,
  },
}

/// Joins section labels for error display.
fn join_sections(sections: &[Section]) -> String {
  sections.iter().map(Section::key).collect::<Vec<_>>().join(", ")
}

/// Failures of a single paper's analysis.
///
/// Every variant maps onto exactly one [`FailureStage`] through [`AnalysisError::stage`].
#[derive(Error, Debug)]
pub enum AnalysisError {
  /// The selected paper had no abstract text to analyze.
  #[error("No abstract content found in paper data")]
  AbstractMissing,

  /// The prompt could not be built.
  ///
  /// Prompt construction is total, so this is only produced by alternative
  /// [`ModelClient`](crate::clients::ModelClient) implementations.
  #[error("Failed to build prompt: {0}")]
  PromptBuild(String),

  /// The request never produced a successful HTTP exchange.
  ///
  /// `status` is `None` for connection failures and timeouts, and carries the HTTP status code
  /// for non-success responses, in which case `details` holds the (structured) error body.
  #[error("API request error: {}", transport_message(.status, .details))]
  Transport {
    /// HTTP status code if a response was received
    status:  Option<u16>,
    /// Error body or transport error description
    details: String,
  },

  /// The response envelope did not contain a completion where one was expected.
  #[error("Malformed API response: {0}")]
  MalformedResponse(String),

  /// The completion text could not be turned into a recommendation.
  #[error("API response parsing error: {0}")]
  Parse(#[from] ParseError),

  /// Anything that does not fit the categories above.
  #[error("Unexpected error during analysis: {0}")]
  Other(String),
}

/// Formats the transport error message with or without a status code.
fn transport_message(status: &Option<u16>, details: &str) -> String {
  match status {
    Some(code) => format!("{code} - {details}"),
    None => details.to_string(),
  }
}

impl AnalysisError {
  /// The pipeline stage this error is recorded under.
  pub fn stage(&self) -> FailureStage {
    match self {
      AnalysisError::AbstractMissing => FailureStage::AbstractExtraction,
      AnalysisError::PromptBuild(_) => FailureStage::PromptCreation,
      AnalysisError::Transport { .. } => FailureStage::ApiRequest,
      AnalysisError::MalformedResponse(_) | AnalysisError::Parse(_) =>
        FailureStage::ApiResponseParsing,
      AnalysisError::Other(_) => FailureStage::Analysis,
    }
  }

  /// A stable name for the error, written as `error_type` in failure records.
  pub fn kind(&self) -> &'static str {
    match self {
      AnalysisError::AbstractMissing => "AbstractMissingError",
      AnalysisError::PromptBuild(_) => "PromptBuildError",
      AnalysisError::Transport { .. } => "TransportError",
      AnalysisError::MalformedResponse(_) => "MalformedResponseError",
      AnalysisError::Parse(ParseError::SentinelValue { .. }) => "SentinelValueError",
      AnalysisError::Parse(ParseError::MissingSections(_)) => "ParseError",
      AnalysisError::Other(_) => "AnalysisError",
    }
  }
}

impl From<reqwest::Error> for AnalysisError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      return AnalysisError::MalformedResponse(err.to_string());
    }
    AnalysisError::Transport { status: err.status().map(|s| s.as_u16()), details: err.to_string() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stage_mapping() {
    assert_eq!(AnalysisError::AbstractMissing.stage(), FailureStage::AbstractExtraction);
    assert_eq!(AnalysisError::PromptBuild("x".into()).stage(), FailureStage::PromptCreation);
    assert_eq!(
      AnalysisError::Transport { status: None, details: "timed out".into() }.stage(),
      FailureStage::ApiRequest
    );
    assert_eq!(
      AnalysisError::MalformedResponse("no choices".into()).stage(),
      FailureStage::ApiResponseParsing
    );
    assert_eq!(
      AnalysisError::Parse(ParseError::MissingSections(vec![Section::Title])).stage(),
      FailureStage::ApiResponseParsing
    );
    assert_eq!(AnalysisError::Other("boom".into()).stage(), FailureStage::Analysis);
  }

  #[test]
  fn test_sentinel_is_distinguished_from_parse_errors() {
    let sentinel: AnalysisError =
      ParseError::SentinelValue { section: Section::Title, value: "Unknown Title".into() }.into();
    assert_eq!(sentinel.kind(), "SentinelValueError");

    let missing: AnalysisError =
      ParseError::MissingSections(vec![Section::Authors, Section::Citation]).into();
    assert_eq!(missing.kind(), "ParseError");
    assert_eq!(
      missing.to_string(),
      "API response parsing error: Missing required sections: authors, citation"
    );
  }

  #[test]
  fn test_transport_message() {
    let err =
      AnalysisError::Transport { status: Some(401), details: "{\"error\":\"nope\"}".into() };
    assert_eq!(err.to_string(), "API request error: 401 - {\"error\":\"nope\"}");
  }
}
