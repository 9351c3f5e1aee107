//! Prompt builder: one fixed instruction per mode, plus an optional context note.
//!
//! Defaults are built in; any field can be overridden from the TOML file named by
//! PROMPTS_CONFIG_PATH (see `config`).

use serde::Deserialize;

use crate::domain::Mode;
use crate::util::fill_template;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Prompts {
  pub solve: String,
  pub grade: String,
  pub ocr: String,
  pub anki: String,
  /// Appended when the caller supplies context. Must contain `{context}`.
  pub context_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      solve: "You are a patient tutor. The image shows a problem from a textbook, worksheet or exam.\n\
        Solve it and explain every step so a student can follow along.\n\
        - Restate what is being asked.\n\
        - Work through the solution step by step, using Markdown and LaTeX ($...$) for formulas.\n\
        - Finish with a line starting with **Answer:** that gives the final result."
        .into(),
      grade: "You are a strict but encouraging teacher grading a student's answer sheet shown in the image.\n\
        - Check each answer and mark it correct or incorrect with a short reason.\n\
        - Point out mistakes and explain how to fix them.\n\
        - Give overall feedback in two or three sentences.\n\
        - The LAST line of your reply MUST be exactly `score: NN`, where NN is an integer from 0 to 100."
        .into(),
      ocr: "Transcribe all text in the image exactly as written.\n\
        - Preserve line breaks, headings and list structure.\n\
        - Write formulas in LaTeX ($...$).\n\
        - Output ONLY the transcription, with no commentary."
        .into(),
      anki: "You turn study notes into spaced-repetition flashcards.\n\
        Read the image and create 5 to 15 cards covering its key facts and concepts.\n\
        Each card needs a concise question on the front and a short answer on the back.\n\
        Reply ONLY with a JSON array inside a ```json code block, in this shape:\n\
        ```json\n\
        [{\"front\": \"question\", \"back\": \"answer\"}]\n\
        ```"
        .into(),
      context_template: "\n\nAdditional context: {context}".into(),
    }
  }
}

impl Prompts {
  /// Fixed instruction for a mode.
  pub fn instruction(&self, mode: Mode) -> &str {
    match mode {
      Mode::Solve => &self.solve,
      Mode::Grade => &self.grade,
      Mode::Ocr => &self.ocr,
      Mode::Anki => &self.anki,
    }
  }

  /// Full instruction text sent to the model.
  pub fn build(&self, mode: Mode, context: Option<&str>) -> String {
    let mut prompt = self.instruction(mode).to_string();
    if let Some(ctx) = context.filter(|c| !c.is_empty()) {
      prompt.push_str(&fill_template(&self.context_template, &[("context", ctx)]));
    }
    prompt
  }
}
