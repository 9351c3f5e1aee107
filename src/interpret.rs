//! Response interpreter: turns the model's free-form reply into the mode's structured fields.
//!
//! Model output is untrusted text, so nothing here fails. A missing score or an
//! unusable card array simply leaves the field absent or empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain::{AnalysisData, Card, Mode};
use crate::error::UnknownCardPolicy;

static SCORE_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)score[：:\s]+([0-9]+)").expect("score pattern is valid")
});

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// How card arrays containing malformed elements are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CardPolicy {
  /// One bad element discards the whole array.
  #[default]
  Strict,
  /// Keep the well-formed elements, drop the rest.
  Partial,
}

impl std::str::FromStr for CardPolicy {
  type Err = UnknownCardPolicy;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "strict" => Ok(CardPolicy::Strict),
      "partial" => Ok(CardPolicy::Partial),
      _ => Err(UnknownCardPolicy(s.to_string())),
    }
  }
}

/// Outcome of looking for flashcards in a reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardExtraction {
  Extracted(Vec<Card>),
  Empty,
}

impl CardExtraction {
  pub fn into_cards(self) -> Vec<Card> {
    match self {
      CardExtraction::Extracted(cards) => cards,
      CardExtraction::Empty => Vec::new(),
    }
  }
}

/// Build the mode-specific payload from the raw reply.
pub fn interpret(raw: &str, mode: Mode, policy: CardPolicy) -> AnalysisData {
  match mode {
    Mode::Solve | Mode::Ocr => AnalysisData { content: raw.to_string(), score: None, cards: None },
    Mode::Grade => AnalysisData { content: raw.to_string(), score: extract_score(raw), cards: None },
    Mode::Anki => AnalysisData {
      content: String::new(),
      score: None,
      cards: Some(extract_cards(raw, policy).into_cards()),
    },
  }
}

/// First `score: NN` occurrence, accepted only within 0..=100.
pub fn extract_score(raw: &str) -> Option<u8> {
  let caps = SCORE_RE.captures(raw)?;
  let digits = caps.get(1)?.as_str();
  // Digit runs too long for u32 are out of range by definition.
  let value: u32 = digits.parse().ok()?;
  if value <= 100 { u8::try_from(value).ok() } else { None }
}

/// Locate, parse and validate a JSON array of `{front, back}` objects.
pub fn extract_cards(raw: &str, policy: CardPolicy) -> CardExtraction {
  let space = fenced_json(raw).unwrap_or(raw);

  let Some(array) = bracketed(space) else {
    return CardExtraction::Empty;
  };
  let Ok(Value::Array(items)) = serde_json::from_str::<Value>(array) else {
    return CardExtraction::Empty;
  };

  let cards: Vec<Card> = match policy {
    CardPolicy::Strict => {
      let parsed: Option<Vec<Card>> = items.iter().map(card_from_value).collect();
      match parsed {
        Some(cards) => cards,
        None => return CardExtraction::Empty,
      }
    }
    CardPolicy::Partial => items.iter().filter_map(card_from_value).collect(),
  };

  if cards.is_empty() { CardExtraction::Empty } else { CardExtraction::Extracted(cards) }
}

/// Text between the first ```json marker and the next closing fence.
fn fenced_json(raw: &str) -> Option<&str> {
  let start = raw.find(JSON_FENCE)? + JSON_FENCE.len();
  let len = raw[start..].find(FENCE)?;
  Some(raw[start..start + len].trim())
}

/// From the first `[` through the last `]`, inclusive.
fn bracketed(space: &str) -> Option<&str> {
  let start = space.find('[')?;
  let end = space.rfind(']')?;
  if end < start {
    return None;
  }
  Some(&space[start..=end])
}

fn card_from_value(v: &Value) -> Option<Card> {
  let front = v.get("front")?.as_str()?;
  let back = v.get("back")?.as_str()?;
  if front.is_empty() || back.is_empty() {
    return None;
  }
  Some(Card { front: front.to_string(), back: back.to_string() })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn card(front: &str, back: &str) -> Card {
    Card { front: front.into(), back: back.into() }
  }

  #[test]
  fn solve_and_ocr_pass_text_through() {
    for mode in [Mode::Solve, Mode::Ocr] {
      let data = interpret("x = 2\nscore: 50", mode, CardPolicy::Strict);
      assert_eq!(data.content, "x = 2\nscore: 50");
      assert_eq!(data.score, None);
      assert_eq!(data.cards, None);
    }
  }

  #[test]
  fn score_is_found_mid_text() {
    assert_eq!(extract_score("Nice work overall... score: 87 ... keep going"), Some(87));
  }

  #[test]
  fn score_accepts_full_width_colon_and_case() {
    assert_eq!(extract_score("Score：100"), Some(100));
    assert_eq!(extract_score("SCORE 42"), Some(42));
    assert_eq!(extract_score("score:\n  7"), Some(7));
  }

  #[test]
  fn score_out_of_range_is_absent() {
    assert_eq!(extract_score("score: 150"), None);
    assert_eq!(extract_score("score: 99999999999999999999"), None);
  }

  #[test]
  fn score_negative_or_non_numeric_is_absent() {
    assert_eq!(extract_score("score: -5"), None);
    assert_eq!(extract_score("score: abc"), None);
    assert_eq!(extract_score("no grade given"), None);
  }

  #[test]
  fn first_match_wins() {
    assert_eq!(extract_score("score: 40\nrevised score: 90"), Some(40));
    assert_eq!(extract_score("score: abc, final score: 75"), Some(75));
  }

  #[test]
  fn full_width_digits_are_not_part_of_the_number() {
    assert_eq!(extract_score("Score：８０ (score: 80)"), Some(80));
    assert_eq!(extract_score("score: 8７"), Some(8));
    assert_eq!(extract_score("score: ９５"), None);
  }

  #[test]
  fn grade_keeps_content_even_without_score() {
    let data = interpret("Looks fine.", Mode::Grade, CardPolicy::Strict);
    assert_eq!(data.content, "Looks fine.");
    assert_eq!(data.score, None);
  }

  #[test]
  fn fenced_cards_are_extracted() {
    let raw = "```json\n[{\"front\":\"Q1\",\"back\":\"A1\"}]\n```";
    assert_eq!(extract_cards(raw, CardPolicy::Strict), CardExtraction::Extracted(vec![card("Q1", "A1")]));
  }

  #[test]
  fn unfenced_array_in_prose_is_extracted() {
    let raw = "Here are your cards: [{\"front\":\"Q1\",\"back\":\"A1\"},{\"front\":\"Q2\",\"back\":\"A2\"}] Good luck!";
    assert_eq!(
      extract_cards(raw, CardPolicy::Strict).into_cards(),
      vec![card("Q1", "A1"), card("Q2", "A2")]
    );
  }

  #[test]
  fn one_bad_element_discards_batch_under_strict() {
    let raw = "[{\"front\":\"Q1\",\"back\":\"A1\"},{\"front\":\"Q2\"}]";
    assert_eq!(extract_cards(raw, CardPolicy::Strict), CardExtraction::Empty);
  }

  #[test]
  fn partial_policy_keeps_good_elements_in_order() {
    let raw = "[{\"front\":\"Q1\",\"back\":\"A1\"},{\"front\":\"Q2\"},{\"front\":\"Q3\",\"back\":\"A3\"},7]";
    assert_eq!(
      extract_cards(raw, CardPolicy::Partial).into_cards(),
      vec![card("Q1", "A1"), card("Q3", "A3")]
    );
  }

  #[test]
  fn non_string_and_empty_fields_are_malformed() {
    assert_eq!(extract_cards("[{\"front\":1,\"back\":\"A\"}]", CardPolicy::Strict), CardExtraction::Empty);
    assert_eq!(extract_cards("[{\"front\":\"\",\"back\":\"A\"}]", CardPolicy::Strict), CardExtraction::Empty);
  }

  #[test]
  fn extra_fields_are_ignored() {
    let raw = "[{\"front\":\"Q\",\"back\":\"A\",\"tags\":[\"bio\"]}]";
    assert_eq!(extract_cards(raw, CardPolicy::Strict).into_cards(), vec![card("Q", "A")]);
  }

  #[test]
  fn missing_array_or_bad_json_yields_empty() {
    assert_eq!(extract_cards("I could not read the image.", CardPolicy::Strict), CardExtraction::Empty);
    assert_eq!(extract_cards("[{\"front\": \"Q\", \"back\": }]", CardPolicy::Strict), CardExtraction::Empty);
    assert_eq!(extract_cards("] before [", CardPolicy::Strict), CardExtraction::Empty);
    assert_eq!(extract_cards("{\"front\":\"Q\",\"back\":\"A\"}", CardPolicy::Strict), CardExtraction::Empty);
  }

  #[test]
  fn unterminated_fence_falls_back_to_whole_text() {
    let raw = "```json\n[{\"front\":\"Q\",\"back\":\"A\"}]";
    assert_eq!(extract_cards(raw, CardPolicy::Strict).into_cards(), vec![card("Q", "A")]);
  }

  #[test]
  fn fence_content_takes_precedence_over_surrounding_brackets() {
    let raw = "[draft] ```json\n[{\"front\":\"Q\",\"back\":\"A\"}]\n``` [end]";
    assert_eq!(extract_cards(raw, CardPolicy::Strict).into_cards(), vec![card("Q", "A")]);
  }

  #[test]
  fn anki_forces_empty_content() {
    let data = interpret("```json\n[{\"front\":\"Q1\",\"back\":\"A1\"}]\n```", Mode::Anki, CardPolicy::Strict);
    assert_eq!(data.content, "");
    assert_eq!(data.cards, Some(vec![card("Q1", "A1")]));

    let miss = interpret("not json at all", Mode::Anki, CardPolicy::Strict);
    assert_eq!(miss.content, "");
    assert_eq!(miss.cards, Some(vec![]));
  }

  #[test]
  fn interpretation_is_repeatable() {
    let raw = "Feedback... score: 64\n[{\"front\":\"a\",\"back\":\"b\"}]";
    for mode in Mode::ALL {
      assert_eq!(interpret(raw, mode, CardPolicy::Strict), interpret(raw, mode, CardPolicy::Strict));
    }
  }

  #[test]
  fn policy_parses_from_config_strings() {
    assert_eq!("strict".parse::<CardPolicy>(), Ok(CardPolicy::Strict));
    assert_eq!(" Partial ".parse::<CardPolicy>(), Ok(CardPolicy::Partial));
    assert_eq!("lenient".parse::<CardPolicy>(), Err(UnknownCardPolicy("lenient".into())));
  }
}
