//! Error types for the scholar CLI application.
//!
//! Everything the CLI can fail with is wrapped into [`ScholarCliError`]. The variants are
//! transparent so that the underlying message is what the user sees.

use thiserror::Error;

/// Errors that can occur during CLI operations.
#[derive(Error, Debug)]
pub enum ScholarCliError {
  /// Errors from user interaction dialogs
  #[error(transparent)]
  Dialoguer(#[from] dialoguer::Error),

  /// Errors from the underlying scholar library
  #[error(transparent)]
  Scholar(#[from] scholar::errors::ScholarError),

  /// File system and IO operation errors
  #[error(transparent)]
  IO(#[from] std::io::Error),
}
