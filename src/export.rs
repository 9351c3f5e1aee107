//! Flashcard export as a two-column CSV that Anki's importer accepts.

use crate::domain::Card;

pub const CSV_FILENAME: &str = "anki_cards.csv";

/// One `"front","back"` row per card, quotes doubled, rows joined by `\n`.
pub fn cards_to_csv(cards: &[Card]) -> String {
  cards
    .iter()
    .map(|c| format!("{},{}", quote(&c.front), quote(&c.back)))
    .collect::<Vec<_>>()
    .join("\n")
}

fn quote(field: &str) -> String {
  format!("\"{}\"", field.replace('"', "\"\""))
}
