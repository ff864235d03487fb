//! Turning a model's free-text answer into a validated [`Recommendation`].
//!
//! The model is asked to answer with six labeled sections (see [`Section`]). In practice it puts
//! content on the label line or on the following lines, reorders sections and pads with blank
//! lines, so parsing is a single line scan with a "current section" cursor:
//!
//! - a line that starts (case-insensitively) with a section label opens that section, and the rest
//!   of the line becomes its first line of text;
//! - any other non-empty line is appended to the open section, or dropped if none is open yet;
//! - blank lines are skipped.
//!
//! The five required sections must be present and non-empty, and `title`, `authors` and
//! `key_contributions` must not be template placeholders such as `Unknown Title`.
//!
//! # Examples
//!
//! ```
//! use scholar::parser::ResponseParser;
//!
//! let text = "Title: Attention Is All You Need\n\
//!             Authors: Ashish Vaswani, Noam Shazeer\n\
//!             Key Contributions: The Transformer.\n\
//!             Importance: Replaced recurrence.\n\
//!             Citation: Vaswani et al. (2017)\n";
//!
//! let rec = ResponseParser::parse(text).unwrap();
//! assert_eq!(rec.title, "Attention Is All You Need");
//! assert_eq!(rec.reason_chosen, "");
//! ```

use std::collections::HashMap;

use super::*;

/// One of the labeled sections the model is asked to produce, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
  /// `Title:`
  Title,
  /// `Authors:`
  Authors,
  /// `Key Contributions:`
  KeyContributions,
  /// `Importance:`
  Importance,
  /// `Citation:`
  Citation,
  /// `Reason Chosen:`, the only optional section
  ReasonChosen,
}

impl Section {
  /// All sections in the order they are requested from the model.
  pub const ALL: [Section; 6] = [
    Section::Title,
    Section::Authors,
    Section::KeyContributions,
    Section::Importance,
    Section::Citation,
    Section::ReasonChosen,
  ];

  /// Sections that must be present and non-empty.
  pub const REQUIRED: [Section; 5] = [
    Section::Title,
    Section::Authors,
    Section::KeyContributions,
    Section::Importance,
    Section::Citation,
  ];

  /// The label that opens this section, including the trailing colon.
  pub fn label(&self) -> &'static str {
    match self {
      Section::Title => "Title:",
      Section::Authors => "Authors:",
      Section::KeyContributions => "Key Contributions:",
      Section::Importance => "Importance:",
      Section::Citation => "Citation:",
      Section::ReasonChosen => "Reason Chosen:",
    }
  }

  /// The snake_case field name of this section.
  pub fn key(&self) -> &'static str {
    match self {
      Section::Title => "title",
      Section::Authors => "authors",
      Section::KeyContributions => "key_contributions",
      Section::Importance => "importance",
      Section::Citation => "citation",
      Section::ReasonChosen => "reason_chosen",
    }
  }

  /// Placeholder values that mean the model echoed the template instead of extracting content.
  pub fn sentinels(&self) -> &'static [&'static str] {
    match self {
      Section::Title => &["Unknown Title", "[Paper title]", "[Extract the exact paper title]"],
      Section::Authors => &[
        "Unknown Authors",
        "[Author names]",
        "[List all author names, separated by commas]",
      ],
      Section::KeyContributions => &[
        "No contributions listed",
        "[2-3 sentences about what's new or innovative in this paper]",
        "[Describe 2-3 main innovations or contributions]",
      ],
      _ => &[],
    }
  }

  /// Returns the section opened by `line` together with the text following the label.
  fn open(line: &str) -> Option<(Section, &str)> {
    Section::ALL.into_iter().find_map(|section| {
      let label = section.label();
      // Labels are ASCII, so a byte-length prefix is always a char boundary when it matches.
      line
        .get(..label.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(label))
        .map(|_| (section, &line[label.len()..]))
    })
  }
}

impl std::fmt::Display for Section {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.label().trim_end_matches(':'))
  }
}

/// Parser for model completions.
///
/// Parsing is a pure function of the input text, so calling it twice on the same text yields
/// identical recommendations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
  /// Parses raw completion text into a [`Recommendation`].
  ///
  /// The returned recommendation has an empty `category`; the orchestrator tags it with the
  /// category the paper was selected from.
  ///
  /// # Errors
  ///
  /// - [`ParseError::MissingSections`] if any of the five required sections is absent or empty,
  ///   naming exactly the missing ones.
  /// - [`ParseError::SentinelValue`] if `title`, `authors` or `key_contributions` is exactly a
  ///   known placeholder.
  pub fn parse(raw_text: &str) -> Result<Recommendation, ParseError> {
    let sections = Self::scan(raw_text);
    trace!("Parsed sections: {sections:?}");

    let missing: Vec<Section> = Section::REQUIRED
      .into_iter()
      .filter(|section| sections.get(section).map_or(true, |text| text.is_empty()))
      .collect();
    if !missing.is_empty() {
      return Err(ParseError::MissingSections(missing));
    }

    for section in [Section::Title, Section::Authors, Section::KeyContributions] {
      let value = &sections[&section];
      if section.sentinels().iter().any(|sentinel| *sentinel == value.as_str()) {
        return Err(ParseError::SentinelValue { section, value: value.clone() });
      }
    }

    let take = |section: Section| sections.get(&section).cloned().unwrap_or_default();
    Ok(Recommendation {
      title:             take(Section::Title),
      authors:           take(Section::Authors),
      key_contributions: take(Section::KeyContributions),
      importance:        take(Section::Importance),
      citation:          take(Section::Citation),
      reason_chosen:     take(Section::ReasonChosen),
      category:          String::new(),
    })
  }

  /// Collects the trimmed text of each section in the order the model emitted its lines.
  ///
  /// A section that appears twice keeps its last occurrence.
  fn scan(raw_text: &str) -> HashMap<Section, String> {
    let mut sections = HashMap::new();
    let mut current: Option<(Section, Vec<&str>)> = None;

    for line in raw_text.lines().map(str::trim).filter(|line| !line.is_empty()) {
      match Section::open(line) {
        Some((section, rest)) => {
          if let Some((open, lines)) = current.take() {
            sections.insert(open, lines.join("\n").trim().to_string());
          }
          current = Some((section, vec![rest.trim()]));
        },
        None =>
          if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
          },
      }
    }

    if let Some((open, lines)) = current {
      sections.insert(open, lines.join("\n").trim().to_string());
    }
    sections
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const WELL_FORMED: &str = "Title: Deep Residual Learning\n\
                             Authors: Kaiming He, Xiangyu Zhang\n\
                             Key Contributions: Residual connections make very deep networks \
                             trainable.\n\
                             Importance: Enabled networks with hundreds of layers.\n\
                             Citation: He, K. et al. (2015). arXiv:1512.03385\n\
                             Reason Chosen: Foundational for computer vision.\n";

  #[test]
  fn test_parse_well_formed() {
    let rec = ResponseParser::parse(WELL_FORMED).unwrap();
    assert_eq!(rec.title, "Deep Residual Learning");
    assert_eq!(rec.authors, "Kaiming He, Xiangyu Zhang");
    assert_eq!(rec.key_contributions, "Residual connections make very deep networks trainable.");
    assert_eq!(rec.importance, "Enabled networks with hundreds of layers.");
    assert_eq!(rec.citation, "He, K. et al. (2015). arXiv:1512.03385");
    assert_eq!(rec.reason_chosen, "Foundational for computer vision.");
    assert_eq!(rec.category, "");
  }

  #[test]
  fn test_parse_is_idempotent() {
    assert_eq!(ResponseParser::parse(WELL_FORMED), ResponseParser::parse(WELL_FORMED));
  }

  #[test]
  fn test_labels_are_case_insensitive_and_order_independent() {
    let text = "CITATION: Doe (2024)\n\
                key contributions: A new method.\n\
                title: Out Of Order\n\
                IMPORTANCE: Big.\n\
                Authors: Jane Doe\n";
    let rec = ResponseParser::parse(text).unwrap();
    assert_eq!(rec.title, "Out Of Order");
    assert_eq!(rec.citation, "Doe (2024)");
    assert_eq!(rec.key_contributions, "A new method.");
  }

  #[test]
  fn test_multiline_sections_drop_blank_lines() {
    let text = "Here is my analysis:\n\
                Title:\n\
                A Paper On Lines\n\
                \n\
                Authors: A. Author\n\
                Key Contributions: First point.\n\
                \n\
                   Second point.\n\
                Third point.\n\
                Importance: Matters.\n\
                Citation: Author (2024)\n";
    let rec = ResponseParser::parse(text).unwrap();
    assert_eq!(rec.title, "A Paper On Lines");
    assert_eq!(rec.key_contributions, "First point.\nSecond point.\nThird point.");
  }

  #[test]
  fn test_missing_sections_are_named() {
    let text = "Title: Only A Title\nKey Contributions: Something.\nImportance:   \n";
    assert_eq!(
      ResponseParser::parse(text),
      Err(ParseError::MissingSections(vec![
        Section::Authors,
        Section::Importance,
        Section::Citation
      ]))
    );
  }

  #[test]
  fn test_empty_text_misses_everything() {
    assert_eq!(
      ResponseParser::parse("   \n\n"),
      Err(ParseError::MissingSections(Section::REQUIRED.to_vec()))
    );
  }

  #[test]
  fn test_reason_chosen_is_optional() {
    let text = WELL_FORMED.replace("Reason Chosen: Foundational for computer vision.\n", "");
    let rec = ResponseParser::parse(&text).unwrap();
    assert_eq!(rec.reason_chosen, "");
  }

  #[test]
  fn test_sentinel_title_rejected() {
    let text = WELL_FORMED.replace("Deep Residual Learning", "Unknown Title");
    assert_eq!(
      ResponseParser::parse(&text),
      Err(ParseError::SentinelValue { section: Section::Title, value: "Unknown Title".into() })
    );
  }

  #[test]
  fn test_sentinel_template_echo_rejected() {
    let text = WELL_FORMED.replace("Kaiming He, Xiangyu Zhang", "[Author names]");
    assert!(matches!(
      ResponseParser::parse(&text),
      Err(ParseError::SentinelValue { section: Section::Authors, .. })
    ));
  }

  #[test]
  fn test_sentinel_must_match_exactly() {
    let text = WELL_FORMED.replace("Deep Residual Learning", "Unknown Title Effects in Physics");
    let rec = ResponseParser::parse(&text).unwrap();
    assert_eq!(rec.title, "Unknown Title Effects in Physics");
  }

  #[test]
  fn test_display_of_section() {
    assert_eq!(Section::KeyContributions.to_string(), "Key Contributions");
    assert_eq!(Section::ReasonChosen.key(), "reason_chosen");
  }
}
