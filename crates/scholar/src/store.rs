//! Where candidate papers are kept between fetching and analysis.
//!
//! [`JsonPaperStore`] keeps one JSON array per date and category, at
//! `<base_dir>/<YYYY-MM-DD>/<category>_papers.json`. Reports written by
//! [`JsonReportSink`](crate::report::JsonReportSink) live in the same date directories as
//! `analysis_*.json` and are ignored when listing categories.
//!
//! Paper files may come from older tools with differently named fields, so loading goes through
//! [`normalize`], which maps every accepted shape onto a [`CandidatePaper`]. Nothing past this
//! module needs to guess field names.

use async_trait::async_trait;
use serde_json::Value;

use super::*;
use crate::prompt::fit_to_budget;

/// Suffix of per-category paper files.
const PAPERS_SUFFIX: &str = "_papers.json";

/// Prefix of report files written into date directories.
const REPORT_PREFIX: &str = "analysis_";

/// Source of candidate papers for a run.
#[async_trait]
pub trait PaperStore: Send + Sync {
  /// Categories with stored papers for `date`.
  async fn list_categories(&self, date: &str) -> Result<BTreeSet<String>, ScholarError>;

  /// Candidates stored for `date` and `category`, in stored order.
  async fn load_candidates(
    &self,
    date: &str,
    category: &str,
  ) -> Result<Vec<CandidatePaper>, ScholarError>;

  /// All candidates for `date`, grouped by category.
  async fn load_all(
    &self,
    date: &str,
  ) -> Result<BTreeMap<String, Vec<CandidatePaper>>, ScholarError> {
    let mut candidates = BTreeMap::new();
    for category in self.list_categories(date).await? {
      let papers = self.load_candidates(date, &category).await?;
      candidates.insert(category, papers);
    }
    Ok(candidates)
  }
}

/// Paper store backed by per-date, per-category JSON files.
#[derive(Debug, Clone)]
pub struct JsonPaperStore {
  /// Root directory holding one sub-directory per date.
  base_dir:        PathBuf,
  /// Abstracts longer than this many characters are fitted on load.
  max_input_chars: Option<usize>,
}

impl JsonPaperStore {
  /// Creates a store rooted at `base_dir` that loads abstracts unchanged.
  pub fn new(base_dir: impl Into<PathBuf>) -> Self {
    Self { base_dir: base_dir.into(), max_input_chars: None }
  }

  /// Fits loaded abstracts to `max_chars` characters with [`fit_to_budget`].
  pub fn with_input_budget(mut self, max_chars: usize) -> Self {
    self.max_input_chars = Some(max_chars);
    self
  }

  /// The store's root directory.
  pub fn base_dir(&self) -> &Path { &self.base_dir }

  /// Path of the paper file for `date` and `category`.
  pub fn papers_path(&self, date: &str, category: &str) -> PathBuf {
    self.base_dir.join(date).join(format!("{category}{PAPERS_SUFFIX}"))
  }

  /// Whether papers for `date` and `category` are already on disk.
  pub fn contains(&self, date: &str, category: &str) -> bool {
    self.papers_path(date, category).exists()
  }

  /// Writes `papers` as the stored candidates for `date` and `category`, returning the file path.
  pub async fn save_candidates(
    &self,
    date: &str,
    category: &str,
    papers: &[CandidatePaper],
  ) -> Result<PathBuf, ScholarError> {
    let path = self.papers_path(date, category);
    if let Some(parent) = path.parent() {
      tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, serde_json::to_string_pretty(papers)?).await?;
    debug!("Saved {} papers to {}", papers.len(), path.display());
    Ok(path)
  }

  /// Dates that have at least one paper file, newest first.
  pub fn available_dates(&self) -> Result<Vec<String>, ScholarError> {
    if !self.base_dir.exists() {
      return Ok(Vec::new());
    }

    let mut dates = Vec::new();
    for entry in std::fs::read_dir(&self.base_dir)? {
      let entry = entry?;
      let name = entry.file_name().to_string_lossy().into_owned();
      if !entry.file_type()?.is_dir() || NaiveDate::parse_from_str(&name, "%Y-%m-%d").is_err() {
        continue;
      }
      if !paper_files(&entry.path())?.is_empty() {
        dates.push(name);
      }
    }
    dates.sort_unstable_by(|a, b| b.cmp(a));
    Ok(dates)
  }
}

/// Category names of the paper files in `dir`, skipping report files.
fn paper_files(dir: &Path) -> Result<BTreeSet<String>, ScholarError> {
  let pattern = dir.join(format!("*{PAPERS_SUFFIX}"));
  let mut categories = BTreeSet::new();
  for path in glob::glob(&pattern.to_string_lossy())?.flatten() {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
      continue;
    };
    if name.starts_with(REPORT_PREFIX) {
      continue;
    }
    if let Some(category) = name.strip_suffix(PAPERS_SUFFIX).filter(|c| !c.is_empty()) {
      categories.insert(category.to_string());
    }
  }
  Ok(categories)
}

#[async_trait]
impl PaperStore for JsonPaperStore {
  async fn list_categories(&self, date: &str) -> Result<BTreeSet<String>, ScholarError> {
    let dir = self.base_dir.join(date);
    if !dir.is_dir() {
      return Err(ScholarError::NoPapers(date.to_string()));
    }
    paper_files(&dir)
  }

  async fn load_candidates(
    &self,
    date: &str,
    category: &str,
  ) -> Result<Vec<CandidatePaper>, ScholarError> {
    let path = self.papers_path(date, category);
    trace!("Loading candidates from {}", path.display());
    let text = tokio::fs::read_to_string(&path).await?;

    let entries = match serde_json::from_str::<Value>(&text) {
      Ok(Value::Array(entries)) => entries,
      Err(e) => {
        warn!("Skipping {}: not valid JSON ({e})", path.display());
        return Ok(Vec::new());
      },
      Ok(_) => {
        warn!("{} does not contain a list of papers", path.display());
        return Ok(Vec::new());
      },
    };

    let mut papers = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
      match normalize(entry, category) {
        Some(mut paper) => {
          if let Some(max_chars) = self.max_input_chars {
            let fitted = fit_to_budget(&paper.abstract_text, max_chars).into_owned();
            paper.abstract_text = fitted;
          }
          papers.push(paper);
        },
        None => warn!("Skipping entry {index} in {}: not a paper object", path.display()),
      }
    }
    Ok(papers)
  }
}

/// Maps one stored paper object onto a [`CandidatePaper`].
///
/// Accepted keys, first match wins:
/// - id: `id`, `entry_id`
/// - title: `title`, `Title`
/// - authors: `authors`, `Authors`, as an array of names, an array of `{"name": ...}` objects or
///   a comma separated string
/// - abstract: `abstract`, `Abstract`, `summary`, `Summary`
/// - citations: `citation_count` or `citations` as a count, or `citations` as an array of which
///   the length is used
///
/// Returns `None` if `entry` is not a JSON object.
pub fn normalize(entry: &Value, category: &str) -> Option<CandidatePaper> {
  let object = entry.as_object()?;
  let text = |keys: &[&str]| -> String {
    keys
      .iter()
      .find_map(|key| object.get(*key).and_then(Value::as_str))
      .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
      .unwrap_or_default()
  };

  let authors = ["authors", "Authors"]
    .iter()
    .find_map(|key| object.get(*key))
    .map(|value| match value {
      Value::Array(items) => items
        .iter()
        .filter_map(|item| match item {
          Value::String(name) => Some(name.trim().to_string()),
          Value::Object(author) => author.get("name").and_then(Value::as_str).map(str::to_string),
          _ => None,
        })
        .collect(),
      Value::String(names) =>
        names.split(',').map(str::trim).filter(|n| !n.is_empty()).map(str::to_string).collect(),
      _ => Vec::new(),
    })
    .unwrap_or_default();

  let citation_count = ["citation_count", "citations"].iter().find_map(|key| {
    match object.get(*key)? {
      Value::Number(n) => n.as_u64(),
      Value::Array(items) => Some(items.len() as u64),
      _ => None,
    }
  });

  let abstract_text = ["abstract", "Abstract", "summary", "Summary"]
    .iter()
    .find_map(|key| object.get(*key).and_then(Value::as_str))
    .map(|s| s.trim().to_string())
    .unwrap_or_default();

  Some(CandidatePaper {
    id: text(&["id", "entry_id"]),
    title: text(&["title", "Title"]),
    authors,
    abstract_text,
    category: category.to_string(),
    citation_count,
    published: object
      .get("published")
      .and_then(Value::as_str)
      .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
      .map(|d| d.with_timezone(&Utc)),
    pdf_url: object.get("pdf_url").and_then(Value::as_str).map(str::to_string),
  })
}
