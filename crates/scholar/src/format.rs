//! Filename helpers for report and paper files.
//!
//! # Examples
//!
//! ```
//! use scholar::format;
//!
//! assert_eq!(format::slug("Reinforcement  Learning", None), "reinforcement_learning");
//! assert_eq!(format::slug("AI/ML: Safety?", None), "ai_ml_safety");
//! assert_eq!(format::slug("natural language processing", Some(16)), "natural_language");
//! ```

/// Default maximum slug length in bytes.
const DEFAULT_MAX_LENGTH: usize = 50;

/// Turns free text into a lowercase, underscore separated filename component.
///
/// Alphanumeric characters and `-` are kept. Any run of other characters becomes a single word
/// break. The result is cut at a word boundary so that it is at most `max_length` bytes
/// (default 50); a first word longer than that is cut itself. Text with no usable characters
/// yields `"all"`.
pub fn slug(text: &str, max_length: Option<usize>) -> String {
  let max_length = max_length.unwrap_or(DEFAULT_MAX_LENGTH);
  let lowered = text.to_lowercase();
  let words = lowered
    .split(|c: char| !(c.is_alphanumeric() || c == '-'))
    .filter(|word| !word.is_empty());

  let mut result = String::new();
  for word in words {
    let needed = if result.is_empty() { word.len() } else { word.len() + 1 };
    if result.len() + needed > max_length {
      if result.is_empty() {
        // A single oversized word is cut rather than dropped.
        result.extend(
          word
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_length)
            .map(|(_, c)| c),
        );
      }
      break;
    }
    if !result.is_empty() {
      result.push('_');
    }
    result.push_str(word);
  }

  if result.is_empty() {
    "all".to_string()
  } else {
    result
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_slug() {
    assert_eq!(slug("Hello World", None), "hello_world");
    assert_eq!(slug("No    Extra    Spaces", None), "no_extra_spaces");
    assert_eq!(slug("This Is A Very Long Title Indeed", Some(20)), "this_is_a_very_long");
    assert_eq!(slug("cs.AI", None), "cs_ai");
    assert_eq!(slug("../../etc/passwd", None), "etc_passwd");
    assert_eq!(slug("   ", None), "all");
    assert_eq!(slug("Ünïcödé text", None), "ünïcödé_text");
  }

  #[test]
  fn test_slug_cuts_oversized_first_word() {
    assert_eq!(slug("Pneumonoultramicroscopicsilicovolcanoconiosis", Some(10)), "pneumonoul");
    assert_eq!(slug(&"x".repeat(80), None), "x".repeat(50));
    assert_eq!(slug("ééé", Some(3)), "é");
  }
}
