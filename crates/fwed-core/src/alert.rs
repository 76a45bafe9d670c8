//! Alert formatting for relayed addresses, in Telegram MarkdownV2.

use crate::{
  detect::{AddressKind, DetectedAddress},
  model::UNNAMED_CONNECTION,
};

/// Referral link every detected address is wrapped in.
pub const DEFAULT_LINK_TEMPLATE: &str = "https://t.me/TradeonNovaBot?start=r-CE0V7EW-{address}";

/// Placeholder substituted in a link template.
pub const ADDRESS_PLACEHOLDER: &str = "{address}";

/// Characters that must be escaped in MarkdownV2 text.
const SPECIAL_CHARS: &[char] = &[
  '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escape free text for MarkdownV2.
pub fn escape_markdown_v2(text: &str) -> String {
  let mut out = String::with_capacity(text.len() * 2);
  for ch in text.chars() {
    if SPECIAL_CHARS.contains(&ch) {
      out.push('\\');
    }
    out.push(ch);
  }
  out
}

/// Inside the `(...)` part of a link only `)` and `\` are special.
fn escape_link_url(url: &str) -> String {
  let mut out = String::with_capacity(url.len());
  for ch in url.chars() {
    if ch == ')' || ch == '\\' {
      out.push('\\');
    }
    out.push(ch);
  }
  out
}

fn link(address: &str, template: &str) -> String {
  let url = template.replace(ADDRESS_PLACEHOLDER, address);
  format!("[{}]({})", escape_markdown_v2(address), escape_link_url(&url))
}

/// Build the outbound alert, or `None` when nothing was detected.
///
/// When any marked address is present only the marked ones are listed, under
/// the PumpFun header; otherwise the plain ones are listed under the generic
/// header. The connection title is appended as attribution.
pub fn format_alert(
  addresses: &[DetectedAddress],
  connection_title: Option<&str>,
  link_template: &str,
) -> Option<String> {
  let marked: Vec<&str> = addresses
    .iter()
    .filter(|a| a.kind == AddressKind::Marked)
    .map(|a| a.address.as_str())
    .collect();

  let (header, listed) = if !marked.is_empty() {
    ("📩 *New PumpFun Alpha Found\\!*", marked)
  } else {
    let plain: Vec<&str> = addresses
      .iter()
      .filter(|a| a.kind == AddressKind::Plain)
      .map(|a| a.address.as_str())
      .collect();
    ("📩 *New Alpha Found\\!*", plain)
  };

  if listed.is_empty() {
    return None;
  }

  let links: Vec<String> = listed.iter().map(|a| link(a, link_template)).collect();
  let title = escape_markdown_v2(connection_title.unwrap_or(UNNAMED_CONNECTION));

  Some(format!(
    "{header}\n\n🚀 Trade Now:\n\n{}\n\n🔗 *Source Connection Name*: {title}",
    links.join("\n")
  ))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn addr(address: &str, kind: AddressKind) -> DetectedAddress {
    DetectedAddress { address: address.into(), kind }
  }

  #[test]
  fn escapes_special_characters() {
    assert_eq!(escape_markdown_v2("a_b.c!"), "a\\_b\\.c\\!");
    assert_eq!(escape_markdown_v2("plain text"), "plain text");
  }

  #[test]
  fn nothing_detected_formats_nothing() {
    assert!(format_alert(&[], Some("x"), DEFAULT_LINK_TEMPLATE).is_none());
  }

  #[test]
  fn plain_addresses_use_generic_header() {
    let msg = format_alert(
      &[addr("AAAA", AddressKind::Plain), addr("BBBB", AddressKind::Plain)],
      Some("Alpha Room"),
      DEFAULT_LINK_TEMPLATE,
    )
    .unwrap();

    assert!(msg.starts_with("📩 *New Alpha Found\\!*"));
    assert!(msg.contains("[AAAA](https://t.me/TradeonNovaBot?start=r-CE0V7EW-AAAA)"));
    assert!(msg.contains("[BBBB](https://t.me/TradeonNovaBot?start=r-CE0V7EW-BBBB)"));
    assert!(msg.ends_with("*Source Connection Name*: Alpha Room"));
  }

  #[test]
  fn marked_addresses_take_the_headline_alone() {
    let msg = format_alert(
      &[addr("MMMMpump", AddressKind::Marked), addr("PPPP", AddressKind::Plain)],
      None,
      "https://example.test/{address}",
    )
    .unwrap();

    assert!(msg.starts_with("📩 *New PumpFun Alpha Found\\!*"));
    assert!(msg.contains("[MMMMpump](https://example.test/MMMMpump)"));
    assert!(!msg.contains("PPPP"));
    assert!(msg.ends_with("Unnamed Connection"));
  }

  #[test]
  fn title_is_escaped() {
    let msg =
      format_alert(&[addr("AAAA", AddressKind::Plain)], Some("sol_calls v2.0"), DEFAULT_LINK_TEMPLATE)
        .unwrap();
    assert!(msg.ends_with("sol\\_calls v2\\.0"));
  }
}
