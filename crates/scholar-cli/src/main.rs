use std::{future::Future, path::PathBuf, time::Duration};

use chrono::{Local, NaiveDate};
use clap::{builder::ArgAction, Parser, Subcommand};
use console::{style, Emoji};
use errors::ScholarCliError;
use scholar::{
  analysis::{AnalysisOrchestrator, AnalysisRequest},
  clients::{ArxivClient, OpenRouterClient},
  config::Config,
  database::Database,
  errors::ScholarError,
  prompt::Audience,
  report::{JsonReportSink, ReportSink},
  store::{JsonPaperStore, PaperStore},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use tracing_subscriber::EnvFilter;

pub mod errors;

static LOOKING_GLASS: Emoji<'_, '_> = Emoji("🔍 ", "");
static BOOKS: Emoji<'_, '_> = Emoji("📚 ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static PAPER: Emoji<'_, '_> = Emoji("📄 ", "");
static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

#[derive(Parser)]
#[command(author, version, about = "Fetch new arXiv papers and turn them into recommendations")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the configuration file
  #[arg(long, global = true, env = "SCHOLAR_CONFIG")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch a day's papers for the configured categories
  Fetch {
    /// Submission date (YYYY-MM-DD), today if omitted
    #[arg(long, short)]
    date:       Option<NaiveDate>,
    /// Category to fetch, repeatable; defaults to the configured categories
    #[arg(long = "category", short)]
    categories: Vec<String>,
    /// Fetch again even if papers for the date are already on disk
    #[arg(long)]
    force:      bool,
    /// Directory holding per-date paper files
    #[arg(long)]
    papers_dir: Option<PathBuf>,
    /// Path to the paper index database
    #[arg(long)]
    database:   Option<PathBuf>,
  },
  /// Analyze one representative paper per category
  Analyze {
    /// Date of the papers to analyze (YYYY-MM-DD); prompts if omitted
    date:       Option<NaiveDate>,
    /// Field the recommendations should be relevant to; prompts if omitted
    field:      Option<String>,
    /// Intended reader (general, researcher, student)
    #[arg(long, short, default_value = "general")]
    audience:   Audience,
    /// Directory holding per-date paper files
    #[arg(long)]
    papers_dir: Option<PathBuf>,
    /// OpenRouter API key
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    api_key:    Option<String>,
  },
  /// List dates that have fetched papers, newest first
  Dates {
    /// Directory holding per-date paper files
    #[arg(long)]
    papers_dir: Option<PathBuf>,
  },
  /// Search the paper index by title or abstract
  Search {
    /// Search query
    query:      String,
    /// Earliest publication date (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,
    /// Latest publication date (YYYY-MM-DD)
    #[arg(long)]
    end_date:   Option<NaiveDate>,
    /// Path to the paper index database
    #[arg(long)]
    database:   Option<PathBuf>,
  },
}

/// Setup logging with the specified verbosity level
fn setup_logging(verbosity: u8) {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_thread_ids(true)
    .with_target(true)
    .init();
}

/// Cancels the returned token on the first Ctrl-C and exits the process on the second.
fn cancel_on_ctrl_c() -> CancellationToken {
  let token = CancellationToken::new();
  let cancel = token.clone();
  tokio::spawn(async move {
    if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
      println!("\n{} Interrupted again, stopping now", style(WARNING).red());
      std::process::exit(130);
    }
  });
  token
}

/// Cancels `cancel` when `interrupt` first fires, then waits for it to fire again.
///
/// Returns `true` once a second interrupt arrives and `false` if listening fails.
async fn watch_interrupts<F, Fut>(mut interrupt: F, cancel: CancellationToken) -> bool
where
  F: FnMut() -> Fut,
  Fut: Future<Output = std::io::Result<()>>, {
  if interrupt().await.is_err() {
    return false;
  }
  println!(
    "\n{} Interrupted, finishing the current paper before stopping (Ctrl-C again to quit)",
    style(WARNING).yellow()
  );
  cancel.cancel();
  interrupt().await.is_ok()
}

#[tokio::main]
async fn main() -> Result<(), ScholarCliError> {
  let cli = Cli::parse();
  setup_logging(cli.verbose);

  let config_path = cli.config.unwrap_or_else(Config::default_path);
  trace!("Using configuration at: {}", config_path.display());
  let config = Config::load_or_default(&config_path)?;

  match cli.command {
    Commands::Fetch { date, categories, force, papers_dir, database } => {
      let date = date.unwrap_or_else(|| Local::now().date_naive());
      let date_str = date.format("%Y-%m-%d").to_string();
      let categories = if categories.is_empty() { config.categories.clone() } else { categories };
      let base_dir = papers_dir.unwrap_or_else(|| config.output.base_dir.clone());
      let store = JsonPaperStore::new(base_dir);
      let db = Database::open(database.unwrap_or_else(Database::default_path)).await?;
      let client = ArxivClient::new();

      println!(
        "{} Fetching papers for {} into {}",
        style(ROCKET).cyan(),
        style(&date_str).yellow(),
        style(store.base_dir().display()).yellow()
      );

      let mut total = 0;
      for (index, category) in categories.iter().enumerate() {
        if store.contains(&date_str, category) && !force {
          let papers = store.load_candidates(&date_str, category).await?;
          println!(
            "{} {}: {} papers already on disk",
            style(BOOKS).cyan(),
            style(category).cyan(),
            style(papers.len()).yellow()
          );
          total += papers.len();
          continue;
        }

        if index > 0 {
          tokio::time::sleep(Duration::from_millis(config.api.rate_limit_delay_ms)).await;
        }

        println!("{} Fetching {}", style(LOOKING_GLASS).cyan(), style(category).cyan());
        let papers = match client
          .fetch_category(category, date, config.api.max_papers_per_category)
          .await
        {
          Ok(papers) => papers,
          Err(e) => {
            warn!("Error fetching papers for {category}: {e}");
            println!("{} Could not fetch {}: {}", style(WARNING).yellow(), category, e);
            continue;
          },
        };

        if papers.is_empty() {
          println!("{} No papers found for {} on {}", style(WARNING).yellow(), category, date_str);
          continue;
        }

        let path = store.save_candidates(&date_str, category, &papers).await?;
        db.save_papers(&papers).await?;
        println!(
          "{} Saved {} papers to {}",
          style(SAVE).green(),
          style(papers.len()).yellow(),
          style(path.display()).yellow()
        );
        total += papers.len();
      }

      println!("\n{} {} papers available for {}", style(SUCCESS).green(), total, date_str);
      Ok(())
    },

    Commands::Analyze { date, field, audience, papers_dir, api_key } => {
      let api_key = api_key.ok_or(ScholarError::MissingApiKey)?;
      let client = OpenRouterClient::with_config(&api_key, &config.model)?;

      let base_dir = papers_dir.unwrap_or_else(|| config.output.base_dir.clone());
      let store = JsonPaperStore::new(&base_dir).with_input_budget(config.model.max_input_chars);

      let date_str = match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => {
          let dates = store.available_dates()?;
          if dates.is_empty() {
            return Err(ScholarError::NoPapers(base_dir.display().to_string()).into());
          }
          let selection = dialoguer::Select::new()
            .with_prompt("Which date should be analyzed?")
            .items(&dates)
            .default(0)
            .interact()?;
          dates[selection].clone()
        },
      };

      let field = match field {
        Some(field) => field,
        None => dialoguer::Input::<String>::new()
          .with_prompt("Field of interest")
          .default("machine learning".to_string())
          .interact_text()?,
      };

      let candidates = store.load_all(&date_str).await?;
      println!(
        "{} Analyzing {} categories from {} for {} ({} audience) with {}",
        style(ROCKET).cyan(),
        style(candidates.len()).yellow(),
        style(&date_str).yellow(),
        style(&field).cyan(),
        audience,
        style(client.model()).cyan()
      );

      let cancel = cancel_on_ctrl_c();
      let request = AnalysisRequest::new(date_str, field, audience);
      let orchestrator = AnalysisOrchestrator::new(client);
      let report = orchestrator.run(&request, &candidates, &cancel).await;
      debug!("Report metadata: {:?}", report.metadata);

      for recommendation in &report.recommendations {
        println!(
          "\n{} {} {}",
          style(PAPER).green(),
          style(&recommendation.category).cyan(),
          style(&recommendation.title).white().bold()
        );
        println!("   {} {}", style("Authors:").green(), recommendation.authors);
        println!("   {} {}", style("Key Contributions:").green(), recommendation.key_contributions);
        println!("   {} {}", style("Importance:").green(), recommendation.importance);
      }

      for failure in &report.failures {
        println!(
          "\n{} {} {} failed at {}: {}",
          style(WARNING).yellow(),
          style(&failure.category).cyan(),
          failure.source_ref,
          style(failure.failure_stage).red(),
          failure.error_details
        );
      }

      let path = JsonReportSink::new(&base_dir).persist(&report).await?;
      let meta = &report.metadata;
      println!(
        "\n{} {} succeeded, {} failed, success rate {:.0}%{}",
        style(SUCCESS).green(),
        style(meta.success_count).green(),
        style(meta.failure_count).red(),
        meta.success_rate * 100.0,
        if meta.cancelled { " (cancelled)" } else { "" }
      );
      println!("{} Report saved to {}", style(SAVE).green(), style(path.display()).yellow());
      Ok(())
    },

    Commands::Dates { papers_dir } => {
      let store = JsonPaperStore::new(papers_dir.unwrap_or(config.output.base_dir));
      let dates = store.available_dates()?;
      if dates.is_empty() {
        println!(
          "{} No fetched papers in {}",
          style(WARNING).yellow(),
          style(store.base_dir().display()).yellow()
        );
      } else {
        println!("{} Available dates:", style(BOOKS).cyan());
        for date in dates {
          println!("   {}", style(date).yellow());
        }
      }
      Ok(())
    },

    Commands::Search { query, start_date, end_date, database } => {
      let path = database.unwrap_or_else(Database::default_path);
      trace!("Using database at: {}", path.display());
      let db = Database::open(&path).await?;

      println!("{} Searching for: {}", style(LOOKING_GLASS).cyan(), style(&query).yellow());

      let papers = db.search(&query, start_date, end_date).await?;
      if papers.is_empty() {
        println!(
          "{} No papers found matching: {}",
          style(WARNING).yellow(),
          style(&query).yellow()
        );
        return Ok(());
      }

      println!("\n{} Found {} papers:", style(SUCCESS).green(), style(papers.len()).yellow());
      for (i, paper) in papers.iter().enumerate() {
        println!("\n{}. {}", style(i + 1).yellow(), style(&paper.title).white().bold());

        let author_display = if paper.authors.is_empty() {
          style("No authors listed").red().italic().to_string()
        } else {
          style(paper.authors.join(", ")).white().to_string()
        };
        println!("   {} {}", style("Authors:").green(), author_display);

        if let Some(published) = paper.published {
          println!("   {} {}", style("Published:").green(), published.format("%Y-%m-%d"));
        }
        println!("   {} {} {}", style("Source:").green(), style(&paper.category).cyan(), paper.id);
      }
      Ok(())
    },
  }
}

#[cfg(test)]
mod tests {
  use tokio::sync::mpsc;

  use super::*;

  /// An interrupt source fed by a channel; a closed channel reports a listener failure.
  fn channel_interrupts() -> (
    mpsc::UnboundedSender<()>,
    impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>,
  ) {
    let (tx, rx) = mpsc::unbounded_channel();
    let rx = std::sync::Arc::new(tokio::sync::Mutex::new(rx));
    let interrupt = move || {
      let rx = rx.clone();
      Box::pin(async move {
        rx.lock().await.recv().await.ok_or_else(|| std::io::Error::other("listener closed"))
      }) as std::pin::Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>
    };
    (tx, interrupt)
  }

  #[tokio::test]
  async fn test_second_interrupt_forces_exit() {
    let (tx, interrupt) = channel_interrupts();
    let token = CancellationToken::new();
    let watcher = tokio::spawn(watch_interrupts(interrupt, token.clone()));

    tx.send(()).unwrap();
    token.cancelled().await;
    tokio::task::yield_now().await;
    assert!(!watcher.is_finished());

    tx.send(()).unwrap();
    assert!(watcher.await.unwrap());
  }

  #[tokio::test]
  async fn test_failed_listener_neither_cancels_nor_exits() {
    let (tx, interrupt) = channel_interrupts();
    drop(tx);
    let token = CancellationToken::new();

    assert!(!watch_interrupts(interrupt, token.clone()).await);
    assert!(!token.is_cancelled());
  }
}
