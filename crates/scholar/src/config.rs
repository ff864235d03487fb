//! Configuration for fetching and analysis.
//!
//! Configuration lives in a TOML file, by default at `<config_dir>/scholar/config.toml`. Every
//! key is optional; missing keys take the defaults below.
//!
//! ```toml
//! categories = ["cs.AI", "cs.LG"]
//!
//! [api]
//! max_papers_per_category = 50
//! rate_limit_delay_ms = 3000
//!
//! [output]
//! base_dir = "/home/me/papers"
//!
//! [model]
//! base_url = "https://openrouter.ai/api/v1"
//! model = "deepseek/deepseek-chat"
//! temperature = 0.7
//! max_tokens = 4000
//! connect_timeout_secs = 10
//! read_timeout_secs = 30
//! max_input_chars = 32000
//! ```
//!
//! Credentials are deliberately not part of the configuration; the model client receives its key
//! from the caller.

use super::*;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// arXiv categories fetched when none are given explicitly
  pub categories: Vec<String>,
  /// Catalog API limits
  pub api:        ApiConfig,
  /// Where per-date paper files and reports are written
  pub output:     OutputConfig,
  /// Remote model settings
  pub model:      ModelConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      categories: ["cs.AI", "cs.LG", "cs.CL", "cs.CV"].map(String::from).to_vec(),
      api:        ApiConfig::default(),
      output:     OutputConfig::default(),
      model:      ModelConfig::default(),
    }
  }
}

/// Limits applied when talking to the arXiv catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Maximum number of papers fetched per category and day
  pub max_papers_per_category: usize,
  /// Pause between consecutive catalog requests, in milliseconds
  pub rate_limit_delay_ms:     u64,
}

impl Default for ApiConfig {
  fn default() -> Self { Self { max_papers_per_category: 50, rate_limit_delay_ms: 3000 } }
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
  /// Root directory holding one sub-directory per date
  pub base_dir: PathBuf,
}

impl Default for OutputConfig {
  fn default() -> Self {
    Self {
      base_dir: dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scholar")
        .join("papers"),
    }
  }
}

/// Settings for the remote analysis model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
  /// Base URL of an OpenAI-compatible API
  pub base_url:             String,
  /// Model identifier
  pub model:                String,
  /// Sampling temperature
  pub temperature:          f32,
  /// Maximum number of generated tokens
  pub max_tokens:           u32,
  /// Connect timeout in seconds
  pub connect_timeout_secs: u64,
  /// Read timeout in seconds
  pub read_timeout_secs:    u64,
  /// Input budget in characters; abstracts are fitted to it when loaded from disk
  pub max_input_chars:      usize,
}

impl Default for ModelConfig {
  fn default() -> Self {
    Self {
      base_url:             "https://openrouter.ai/api/v1".to_string(),
      model:                "deepseek/deepseek-chat".to_string(),
      temperature:          0.7,
      max_tokens:           4000,
      connect_timeout_secs: 10,
      read_timeout_secs:    30,
      // 8k input tokens at roughly four characters per token
      max_input_chars:      32_000,
    }
  }
}

impl Config {
  /// Get default configuration path in the user's config directory
  pub fn default_path() -> PathBuf {
    dirs::config_dir().unwrap_or_else(|| PathBuf::from(".")).join("scholar").join("config.toml")
  }

  /// Reads configuration from a TOML file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ScholarError> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
  }

  /// Reads configuration from `path`, or returns the defaults if the file does not exist.
  pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ScholarError> {
    let path = path.as_ref();
    if path.exists() {
      Self::load(path)
    } else {
      debug!("No configuration at {}, using defaults", path.display());
      Ok(Self::default())
    }
  }
}
