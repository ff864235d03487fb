//! Client for listing a day's papers in an arXiv category.
//!
//! The client uses arXiv's Atom feed API (http://export.arxiv.org/api/query) with a search query
//! of the form `cat:cs.AI AND submittedDate:[202411050000 TO 202411060000]`, sorted by submission
//! date, and converts each feed entry into a [`CandidatePaper`].
//!
//! The catalog never reports citation counts, so fetched candidates carry none.
//!
//! # Examples
//!
//! ```no_run
//! use scholar::clients::ArxivClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let date = chrono::NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
//! let papers = ArxivClient::new().fetch_category("cs.AI", date, 50).await?;
//!
//! for paper in papers {
//!   println!("{}: {}", paper.id, paper.title);
//! }
//! # Ok(())
//! # }
//! ```

use quick_xml::de::from_str;

use super::*;

/// Default endpoint of the arXiv query API.
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Internal representation of the arXiv API's Atom feed response.
#[derive(Debug, Deserialize)]
struct Feed {
  /// A `Feed` from arXiv may contain any number of `Entry`s, including none
  #[serde(rename = "entry", default)]
  entries: Vec<Entry>,
}

/// Internal representation of a paper entry from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Entry {
  /// Paper title (may contain LaTeX markup and line breaks)
  title:     String,
  /// List of paper authors
  #[serde(rename = "author", default)]
  authors:   Vec<Author>,
  /// Paper abstract
  #[serde(default)]
  summary:   String,
  /// Publication date of the first version
  published: Option<DateTime<Utc>>,
  /// arXiv URL (e.g., "http://arxiv.org/abs/2411.01234v1")
  #[serde(rename = "id")]
  arxiv_url: String,
}

/// Internal representation of an author from arXiv's API response.
#[derive(Debug, Deserialize)]
struct Author {
  /// Author's full name
  name: String,
}

/// Collapses runs of whitespace, including line breaks, into single spaces.
fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Entry {
  /// Converts the entry into a candidate listed under `category`.
  fn into_candidate(self, category: &str) -> CandidatePaper {
    let id =
      CandidatePaper::arxiv_id_from_url(&self.arxiv_url).unwrap_or_else(|| self.arxiv_url.clone());
    let pdf_url = self.arxiv_url.replace("/abs/", "/pdf/");

    let mut paper = CandidatePaper::new(id, collapse_whitespace(&self.title), category)
      .with_authors(self.authors.into_iter().map(|author| author.name))
      .with_abstract(collapse_whitespace(&self.summary));
    paper.published = self.published;
    paper.pdf_url = Some(pdf_url);
    paper
  }
}

/// Client for the arXiv catalog.
#[derive(Debug, Clone)]
pub struct ArxivClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// Query endpoint.
  base_url: String,
}

impl ArxivClient {
  /// Creates a client for the public arXiv API.
  pub fn new() -> Self { Self::with_base_url(ARXIV_API_URL) }

  /// Creates a client that queries `base_url` instead of the public API.
  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(), base_url: base_url.into() }
  }

  /// Search query selecting `category` papers submitted on `date`.
  pub fn search_query(category: &str, date: NaiveDate) -> String {
    let next_day = date.succ_opt().unwrap_or(date);
    format!(
      "cat:{category} AND submittedDate:[{}0000 TO {}0000]",
      date.format("%Y%m%d"),
      next_day.format("%Y%m%d")
    )
  }

  /// Fetches up to `max_results` papers submitted to `category` on `date`.
  ///
  /// # Errors
  ///
  /// This function will return an error if:
  /// - The network request fails
  /// - The API answers with a non-success status
  /// - The response is not a valid Atom feed
  pub async fn fetch_category(
    &self,
    category: &str,
    date: NaiveDate,
    max_results: usize,
  ) -> Result<Vec<CandidatePaper>, ScholarError> {
    let query = Self::search_query(category, date);
    debug!("Fetching from arXiv via: {query}");

    let response = self
      .client
      .get(&self.base_url)
      .query(&[
        ("search_query", query.as_str()),
        ("start", "0"),
        ("max_results", &max_results.to_string()),
        ("sortBy", "submittedDate"),
        ("sortOrder", "descending"),
      ])
      .send()
      .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
      return Err(ScholarError::ApiError(format!("arXiv returned {status}: {body}")));
    }
    trace!("arXiv response: {body}");

    let feed: Feed =
      from_str(&body).map_err(|e| ScholarError::ApiError(format!("Failed to parse XML: {e}")))?;

    let papers: Vec<_> = feed
      .entries
      .into_iter()
      .take(max_results)
      .map(|entry| entry.into_candidate(category))
      .collect();
    info!("Found {} results for {category}", papers.len());
    Ok(papers)
  }
}

impl Default for ArxivClient {
  fn default() -> Self { Self::new() }
}
