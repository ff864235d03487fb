//! Instruction text sent to the model.
//!
//! [`PromptBuilder::build`] is a total, pure function: it embeds the requested field and audience
//! into a fixed instruction block that asks for exactly six labeled sections (in the order of
//! [`Section::ALL`]), shows one worked example answer, and appends the paper content last and
//! verbatim.
//!
//! The builder never truncates. Callers supplying content are expected to size it for the model's
//! input budget beforehand, for instance with [`fit_to_budget`].

use std::borrow::Cow;

use super::*;
use crate::parser::Section;

/// Marker inserted where [`fit_to_budget`] removed text.
pub const TRUNCATION_MARKER: &str = "\n...[content truncated]...\n";

/// The intended reader of a recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
  /// Interested readers without a research background
  #[default]
  General,
  /// Working researchers in the field
  Researcher,
  /// Students learning the field
  Student,
}

impl Audience {
  /// Phrase used when addressing this audience in the prompt.
  pub fn describe(&self) -> &'static str {
    match self {
      Audience::General => "a general audience",
      Audience::Researcher => "researchers working in the field",
      Audience::Student => "students new to the field",
    }
  }
}

impl std::fmt::Display for Audience {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Audience::General => write!(f, "general"),
      Audience::Researcher => write!(f, "researcher"),
      Audience::Student => write!(f, "student"),
    }
  }
}

impl FromStr for Audience {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match &s.trim().to_lowercase() as &str {
      "general" => Ok(Audience::General),
      "researcher" => Ok(Audience::Researcher),
      "student" => Ok(Audience::Student),
      s => Err(format!("unknown audience `{s}`, expected one of: general, researcher, student")),
    }
  }
}

/// Builds the analysis prompt for one paper.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
  /// Builds the prompt asking the model to analyze `content` for `field` and `audience`.
  ///
  /// # Examples
  ///
  /// ```
  /// use scholar::prompt::{Audience, PromptBuilder};
  ///
  /// let prompt = PromptBuilder::build("We propose X.", "robotics", Audience::General);
  /// assert!(prompt.ends_with("We propose X."));
  /// assert!(prompt.contains("Reason Chosen: [Explain why this paper is significant in robotics]"));
  /// ```
  pub fn build(content: &str, field: &str, audience: Audience) -> String {
    let [title, authors, contributions, importance, citation, reason] =
      Section::ALL.map(|section| section.label());

    format!(
      "You are a research paper analyzer. Your task is to analyze the given paper abstract and \
       provide a structured response written for {audience_text}.

IMPORTANT: You must answer with EXACTLY these six section headers, in this order:

{title} [Extract the exact paper title]
{authors} [List all author names, separated by commas]
{contributions} [Describe 2-3 main innovations or contributions]
{importance} [Explain the potential impact and significance]
{citation} [Provide the paper citation]
{reason} [Explain why this paper is significant in {field}]

Example Response Format:
{title} Deep Learning for Computer Vision
{authors} John Smith, Jane Doe, Bob Johnson
{contributions} This paper introduces a novel neural architecture that reduces computational \
       complexity by 50% while maintaining accuracy. It also presents a new data augmentation \
       technique that improves model robustness.
{importance} The reduced computational requirements make deep learning more accessible for \
       resource-constrained devices. The improved robustness enables wider adoption in critical \
       applications.
{citation} Smith, J., Doe, J., Johnson, B. (2024). Deep Learning for Computer Vision. \
       arXiv:2401.12345
{reason} This work addresses key challenges in {field} by making deep learning more efficient \
       and reliable.

Rules:
1. Use EXACTLY the section headers shown above, each at the start of its own line
2. Extract the title and authors accurately from the paper content
3. Be specific and detailed in your analysis
4. Keep the sections in the order shown

Now analyze this paper:
{content}",
      audience_text = audience.describe(),
    )
  }
}

/// Shrinks `content` to at most `max_chars` characters of original text.
///
/// Oversized content keeps its first 67% and its last 33%, joined by [`TRUNCATION_MARKER`].
/// Content within budget is returned unchanged and unallocated.
///
/// # Examples
///
/// ```
/// use scholar::prompt::fit_to_budget;
///
/// assert_eq!(fit_to_budget("short", 100), "short");
///
/// let long = "a".repeat(100);
/// let fitted = fit_to_budget(&long, 10);
/// assert!(fitted.starts_with("aaaaaa\n...[content truncated]..."));
/// ```
pub fn fit_to_budget(content: &str, max_chars: usize) -> Cow<'_, str> {
  let total = content.chars().count();
  if total <= max_chars {
    return Cow::Borrowed(content);
  }

  let head = max_chars * 67 / 100;
  let tail = max_chars - head;
  debug!("Truncating content from {total} to {max_chars} characters");

  let mut fitted: String = content.chars().take(head).collect();
  fitted.push_str(TRUNCATION_MARKER);
  fitted.extend(content.chars().skip(total - tail));
  Cow::Owned(fitted)
}
