//! Paper records flowing into and out of the analysis pipeline.
//!
//! A [`CandidatePaper`] is read-only input: it is produced by the catalog client or loaded by a
//! [`PaperStore`](crate::store::PaperStore), and never mutated by the core. A
//! [`Recommendation`] is the structured result of analyzing one candidate.
//!
//! # Examples
//!
//! ```
//! use scholar::paper::CandidatePaper;
//!
//! let paper = CandidatePaper::new("2411.00001", "A Paper", "cs.AI")
//!   .with_abstract("We study things.")
//!   .with_citation_count(3);
//!
//! assert_eq!(paper.content(), Some("We study things."));
//! assert_eq!(paper.citations(), 3);
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use super::*;

/// Number of characters of the abstract kept in failure diagnostics.
const PREVIEW_CHARS: usize = 200;

/// A paper eligible for analysis within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePaper {
  /// Source identifier, e.g. the arXiv id `2411.00001`
  pub id:             String,
  /// The paper's title
  pub title:          String,
  /// Author names in publication order
  pub authors:        Vec<String>,
  /// The paper's abstract text, possibly empty
  #[serde(rename = "abstract")]
  pub abstract_text:  String,
  /// The category the paper was listed under, e.g. `cs.AI`
  pub category:       String,
  /// Number of known citations, if the source reports any
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub citation_count: Option<u64>,
  /// When the paper was published
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub published:      Option<DateTime<Utc>>,
  /// URL to the paper's PDF, if available
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub pdf_url:        Option<String>,
}

impl CandidatePaper {
  /// Creates a candidate with no authors, abstract or citation data.
  pub fn new(id: impl Into<String>, title: impl Into<String>, category: impl Into<String>) -> Self {
    Self {
      id:             id.into(),
      title:          title.into(),
      authors:        Vec::new(),
      abstract_text:  String::new(),
      category:       category.into(),
      citation_count: None,
      published:      None,
      pdf_url:        None,
    }
  }

  /// Sets the abstract text.
  pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
    self.abstract_text = abstract_text.into();
    self
  }

  /// Sets the author list.
  pub fn with_authors<S: Into<String>>(mut self, authors: impl IntoIterator<Item = S>) -> Self {
    self.authors = authors.into_iter().map(Into::into).collect();
    self
  }

  /// Sets the citation count.
  pub fn with_citation_count(mut self, count: u64) -> Self {
    self.citation_count = Some(count);
    self
  }

  /// The abstract to send to the model, or `None` if it is blank.
  pub fn content(&self) -> Option<&str> {
    let content = self.abstract_text.trim();
    (!content.is_empty()).then_some(content)
  }

  /// Citation count used for selection; absent data counts as zero.
  pub fn citations(&self) -> u64 { self.citation_count.unwrap_or(0) }

  /// The first 200 characters of the abstract, with `...` appended if anything was cut.
  pub fn content_preview(&self) -> Option<String> {
    let content = self.content()?;
    let mut preview: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
      preview.push_str("...");
    }
    Some(preview)
  }

  /// Extracts the arXiv identifier from an abstract page URL.
  ///
  /// Parses URLs like `http://arxiv.org/abs/2411.01234v1` to extract `2411.01234v1`. Returns
  /// `None` for anything that is not an arXiv abstract URL.
  pub fn arxiv_id_from_url(input: &str) -> Option<String> {
    lazy_static! {
      static ref ABS_PATH: Regex = Regex::new(r"^/abs/(.+)$").unwrap();
    }

    let url = Url::parse(input).ok()?;
    if !url.host_str().is_some_and(|host| host.ends_with("arxiv.org")) {
      return None;
    }
    ABS_PATH.captures(url.path()).and_then(|cap| cap.get(1)).map(|m| m.as_str().to_string())
  }
}

/// The structured output of successfully analyzing one paper.
///
/// `title`, `authors`, `key_contributions`, `importance` and `citation` are always non-empty
/// when produced by [`ResponseParser`](crate::parser::ResponseParser); `reason_chosen` and
/// `category` default to empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
  /// Paper title as extracted by the model
  pub title:             String,
  /// Author names as a single comma separated string
  pub authors:           String,
  /// The main innovations of the paper
  pub key_contributions: String,
  /// Why the paper matters
  pub importance:        String,
  /// A citation for the paper
  pub citation:          String,
  /// Why the paper is relevant to the requested field
  #[serde(default)]
  pub reason_chosen:     String,
  /// The category the paper was selected from
  #[serde(default)]
  pub category:          String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_blank_abstract_has_no_content() {
    let paper = CandidatePaper::new("1", "t", "cs.AI").with_abstract(" \n\t ");
    assert_eq!(paper.content(), None);
    assert_eq!(paper.content_preview(), None);
  }

  #[test]
  fn test_content_preview_truncates() {
    let paper = CandidatePaper::new("1", "t", "cs.AI").with_abstract("x".repeat(250));
    let preview = paper.content_preview().unwrap();
    assert_eq!(preview.len(), 203);
    assert!(preview.ends_with("..."));

    let short = CandidatePaper::new("2", "t", "cs.AI").with_abstract("short");
    assert_eq!(short.content_preview().as_deref(), Some("short"));
  }

  #[test]
  fn test_missing_citations_count_as_zero() {
    assert_eq!(CandidatePaper::new("1", "t", "cs.AI").citations(), 0);
  }

  #[test]
  fn test_arxiv_id_from_url() {
    assert_eq!(
      CandidatePaper::arxiv_id_from_url("http://arxiv.org/abs/2411.01234v1").as_deref(),
      Some("2411.01234v1")
    );
    assert_eq!(
      CandidatePaper::arxiv_id_from_url("https://arxiv.org/abs/math.AG/0601001").as_deref(),
      Some("math.AG/0601001")
    );
    assert_eq!(CandidatePaper::arxiv_id_from_url("https://example.com/abs/1"), None);
    assert_eq!(CandidatePaper::arxiv_id_from_url("2411.01234"), None);
  }

  #[test]
  fn test_serialized_shape() {
    let paper = CandidatePaper::new("1", "A Title", "cs.LG")
      .with_authors(["Ada Lovelace"])
      .with_abstract("Text");
    let json = serde_json::to_value(&paper).unwrap();
    assert_eq!(json["abstract"], "Text");
    assert_eq!(json["authors"][0], "Ada Lovelace");
    assert!(json.get("citation_count").is_none());
  }
}
