//! Transport-agnostic outgoing messages.
//!
//! Handlers describe what to say as a list of [`Reply`] values; the Telegram
//! adapter renders them, turning each [`Button`] into an inline keyboard
//! button whose callback payload is the [`Action`]'s string form.

use fwed_core::action::Action;

/// How the transport should interpret `Reply::text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextFormat {
  #[default]
  Plain,
  MarkdownV2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
  pub label:  String,
  pub action: Action,
}

impl Button {
  pub fn new(label: impl Into<String>, action: Action) -> Self {
    Self { label: label.into(), action }
  }
}

/// Rows of buttons, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keyboard {
  pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
  pub fn new(rows: Vec<Vec<Button>>) -> Self { Self { rows } }

  /// One button per row.
  pub fn column(buttons: impl IntoIterator<Item = Button>) -> Self {
    Self { rows: buttons.into_iter().map(|b| vec![b]).collect() }
  }

  /// Append the "Return to Main Menu" row.
  pub fn with_main_menu(mut self) -> Self {
    self.rows.push(vec![main_menu_button()]);
    self
  }

  /// Every action on the keyboard, row by row.
  pub fn actions(&self) -> impl Iterator<Item = &Action> {
    self.rows.iter().flatten().map(|b| &b.action)
  }
}

pub fn main_menu_button() -> Button { Button::new("Return to Main Menu", Action::MainMenu) }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
  pub text:     String,
  pub format:   TextFormat,
  pub keyboard: Option<Keyboard>,
}

impl Reply {
  pub fn text(text: impl Into<String>) -> Self {
    Self { text: text.into(), format: TextFormat::Plain, keyboard: None }
  }

  pub fn markdown(text: impl Into<String>) -> Self {
    Self { format: TextFormat::MarkdownV2, ..Self::text(text) }
  }

  pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
    self.keyboard = Some(keyboard);
    self
  }

  pub fn with_main_menu(mut self) -> Self {
    self.keyboard = Some(self.keyboard.take().unwrap_or_default().with_main_menu());
    self
  }
}
