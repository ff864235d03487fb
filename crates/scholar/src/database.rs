//! SQLite index of every paper the fetcher has seen, for searching across dates.
//!
//! Each paper is stored once per arXiv id. Saving a paper again replaces the earlier row, so
//! re-fetching a day is harmless. The full [`CandidatePaper`] is kept as JSON next to the columns
//! used for filtering.

use rusqlite::params;
use tokio_rusqlite::Connection;

use super::*;

/// Database handle for the paper index
pub struct Database {
  /// Connection to the SQLite file
  conn: Connection,
}

impl Database {
  /// Open or create a database at the specified path
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, ScholarError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
      std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path).await?;

    // Initialize schema
    conn
      .call(|conn| {
        conn.execute_batch(include_str!(concat!(
          env!("CARGO_MANIFEST_DIR"),
          "/migrations/init.sql"
        )))?;
        Ok(())
      })
      .await?;

    Ok(Self { conn })
  }

  /// Get default database path in user's data directory
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("scholar").join("papers.db")
  }

  /// Save a paper, replacing any earlier row with the same id
  pub async fn save_paper(&self, paper: &CandidatePaper) -> Result<(), ScholarError> {
    let data = serde_json::to_string(paper)?;
    let authors = serde_json::to_string(&paper.authors)?;
    let paper = paper.clone();

    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "INSERT OR REPLACE INTO papers (id, title, authors, abstract, category, published, data)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        stmt.execute(params![
          &paper.id,
          &paper.title,
          authors,
          &paper.abstract_text,
          &paper.category,
          paper.published.map(|published| published.date_naive()),
          data,
        ])?;
        Ok(())
      })
      .await
      .map_err(ScholarError::from)
  }

  /// Save several papers in one transaction
  pub async fn save_papers(&self, papers: &[CandidatePaper]) -> Result<usize, ScholarError> {
    let rows = papers
      .iter()
      .map(|paper| {
        Ok((
          paper.id.clone(),
          paper.title.clone(),
          serde_json::to_string(&paper.authors)?,
          paper.abstract_text.clone(),
          paper.category.clone(),
          paper.published.map(|published| published.date_naive()),
          serde_json::to_string(paper)?,
        ))
      })
      .collect::<Result<Vec<_>, serde_json::Error>>()?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT OR REPLACE INTO papers (id, title, authors, abstract, category, published, data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          )?;
          for (id, title, authors, abstract_text, category, published, data) in &rows {
            stmt.execute(params![id, title, authors, abstract_text, category, published, data])?;
          }
        }
        tx.commit()?;
        Ok(rows.len())
      })
      .await
      .map_err(ScholarError::from)
  }

  /// Papers whose title or abstract contains `query`, optionally limited to an inclusive range of
  /// publication dates, newest first
  pub async fn search(
    &self,
    query: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
  ) -> Result<Vec<CandidatePaper>, ScholarError> {
    let pattern = format!("%{query}%");

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT data FROM papers
           WHERE (title LIKE ?1 OR abstract LIKE ?1)
             AND (?2 IS NULL OR published >= ?2)
             AND (?3 IS NULL OR published <= ?3)
           ORDER BY published DESC, id",
        )?;

        let rows = stmt.query_map(params![pattern, start, end], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
      })
      .await?;

    debug!("Search for '{query}' matched {} papers", rows.len());
    rows.iter().map(|data| serde_json::from_str(data).map_err(ScholarError::from)).collect()
  }

  /// Number of stored papers
  pub async fn count(&self) -> Result<usize, ScholarError> {
    self
      .conn
      .call(|conn| {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count as usize)
      })
      .await
      .map_err(ScholarError::from)
  }
}
