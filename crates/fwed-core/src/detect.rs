//! Lexical coin-address detection.
//!
//! Two independent scans run over the raw text: a *marked* pattern (a base58
//! token ending in the `pump` suffix) and a *plain* pattern (a bare base58
//! token). Nothing is validated against a chain; this is classification only.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Suffix that identifies a marked address.
pub const MARK_SUFFIX: &str = "pump";

pub const MIN_ADDRESS_LEN: usize = 32;
pub const MAX_ADDRESS_LEN: usize = 44;

// Base58 alphabet: no 0, O, I or l.
static MARKED: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\b[1-9A-HJ-NP-Za-km-z]{28,40}pump\b").expect("marked address pattern")
});

static PLAIN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"\b[1-9A-HJ-NP-Za-km-z]{32,44}\b").expect("plain address pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
  /// Matched the suffix-bearing pattern; takes precedence.
  Marked,
  Plain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedAddress {
  pub address: String,
  pub kind:    AddressKind,
}

fn in_length_bounds(s: &str) -> bool {
  (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&s.len())
}

/// Scan `text` and classify every address-like token.
///
/// Marked matches come first, in text order, followed by plain matches that
/// are not literally equal to a marked one.
pub fn detect(text: &str) -> Vec<DetectedAddress> {
  let marked: Vec<&str> = MARKED
    .find_iter(text)
    .map(|m| m.as_str())
    .filter(|s| in_length_bounds(s))
    .collect();

  let plain = PLAIN
    .find_iter(text)
    .map(|m| m.as_str())
    .filter(|s| in_length_bounds(s))
    .filter(|s| !marked.contains(s));

  marked
    .iter()
    .map(|s| DetectedAddress { address: (*s).to_owned(), kind: AddressKind::Marked })
    .chain(plain.map(|s| DetectedAddress { address: s.to_owned(), kind: AddressKind::Plain }))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const PLAIN_ADDR: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
  const MARKED_ADDR: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJopump";

  #[test]
  fn plain_address_in_sentence() {
    let text = format!("check out {PLAIN_ADDR} pump now");
    let found = detect(&text);
    assert_eq!(found, vec![DetectedAddress {
      address: PLAIN_ADDR.into(),
      kind:    AddressKind::Plain,
    }]);
  }

  #[test]
  fn detection_is_deterministic() {
    let text = format!("check out {PLAIN_ADDR} pump now");
    assert_eq!(detect(&text), detect(&text));
  }

  #[test]
  fn suffixed_address_is_marked_once() {
    let found = detect(&format!("new one: {MARKED_ADDR}"));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].address, MARKED_ADDR);
    assert_eq!(found[0].kind, AddressKind::Marked);
  }

  #[test]
  fn marked_and_plain_together() {
    let found = detect(&format!("{PLAIN_ADDR} and {MARKED_ADDR}"));
    let kinds: Vec<_> = found.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![AddressKind::Marked, AddressKind::Plain]);
    assert_eq!(found[1].address, PLAIN_ADDR);
  }

  #[test]
  fn length_boundaries() {
    let t31 = "5".repeat(31);
    let t44 = "5".repeat(44);
    let t45 = "5".repeat(45);
    assert!(detect(&t31).is_empty());
    assert_eq!(detect(&t44).len(), 1);
    assert!(detect(&t45).is_empty());
  }

  #[test]
  fn excluded_characters_break_tokens() {
    // `0`, `O`, `I` and `l` are not base58.
    let with_zero = format!("{}0{}", "5".repeat(20), "5".repeat(20));
    assert!(detect(&with_zero).is_empty());
  }

  #[test]
  fn ordinary_chat_text_finds_nothing() {
    assert!(detect("gm everyone, what are we buying today?").is_empty());
    assert!(detect("").is_empty());
  }
}
