//! Button actions carried as callback data on inline keyboards.
//!
//! The set is closed: every payload the bot emits parses back into a known
//! variant, and anything else becomes [`Action::Unrecognized`].

use std::fmt;

use crate::model::{ConnectionId, GroupId, TopicId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  AddConnection,
  ViewConnections,
  RemoveConnection,
  ToggleConnections,
  ToggleConnection(ConnectionId),
  ConfigSettings,
  SupportFwedbot,
  MainMenu,
  BackToMain,
  SourceGroup(GroupId),
  /// `None` is the "no specific topic" choice.
  SourceTopic(Option<TopicId>),
  TargetGroup(GroupId),
  TargetTopic(Option<TopicId>),
  Unrecognized(String),
}

impl Action {
  pub fn parse(data: &str) -> Action {
    let data = data.trim();
    match data {
      "add_connection" => return Action::AddConnection,
      "view_connections" => return Action::ViewConnections,
      "remove_connection" => return Action::RemoveConnection,
      "toggle_connections" => return Action::ToggleConnections,
      "config_settings" => return Action::ConfigSettings,
      "support_fwedbot" => return Action::SupportFwedbot,
      "main_menu" => return Action::MainMenu,
      "back_to_main" => return Action::BackToMain,
      "source_topic_none" => return Action::SourceTopic(None),
      "target_topic_none" => return Action::TargetTopic(None),
      _ => {}
    }

    let parsed = if let Some(id) = data.strip_prefix("toggle_connection_") {
      id.parse().ok().map(Action::ToggleConnection)
    } else if let Some(id) = data.strip_prefix("source_group_") {
      id.parse().ok().map(Action::SourceGroup)
    } else if let Some(id) = data.strip_prefix("source_topic_") {
      id.parse().ok().map(|id| Action::SourceTopic(Some(id)))
    } else if let Some(id) = data.strip_prefix("target_group_") {
      id.parse().ok().map(Action::TargetGroup)
    } else if let Some(id) = data.strip_prefix("target_topic_") {
      id.parse().ok().map(|id| Action::TargetTopic(Some(id)))
    } else {
      None
    };

    parsed.unwrap_or_else(|| Action::Unrecognized(data.to_owned()))
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Action::AddConnection => f.write_str("add_connection"),
      Action::ViewConnections => f.write_str("view_connections"),
      Action::RemoveConnection => f.write_str("remove_connection"),
      Action::ToggleConnections => f.write_str("toggle_connections"),
      Action::ToggleConnection(id) => write!(f, "toggle_connection_{id}"),
      Action::ConfigSettings => f.write_str("config_settings"),
      Action::SupportFwedbot => f.write_str("support_fwedbot"),
      Action::MainMenu => f.write_str("main_menu"),
      Action::BackToMain => f.write_str("back_to_main"),
      Action::SourceGroup(id) => write!(f, "source_group_{id}"),
      Action::SourceTopic(Some(id)) => write!(f, "source_topic_{id}"),
      Action::SourceTopic(None) => f.write_str("source_topic_none"),
      Action::TargetGroup(id) => write!(f, "target_group_{id}"),
      Action::TargetTopic(Some(id)) => write!(f, "target_topic_{id}"),
      Action::TargetTopic(None) => f.write_str("target_topic_none"),
      Action::Unrecognized(raw) => f.write_str(raw),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn menu_actions() {
    assert_eq!(Action::parse("add_connection"), Action::AddConnection);
    assert_eq!(Action::parse("back_to_main"), Action::BackToMain);
    assert_eq!(Action::parse("support_fwedbot"), Action::SupportFwedbot);
  }

  #[test]
  fn negative_group_ids_parse() {
    assert_eq!(
      Action::parse("source_group_-1001234567890"),
      Action::SourceGroup(-1001234567890)
    );
    assert_eq!(Action::parse("target_group_-42"), Action::TargetGroup(-42));
  }

  #[test]
  fn topic_none_and_some() {
    assert_eq!(Action::parse("source_topic_none"), Action::SourceTopic(None));
    assert_eq!(Action::parse("source_topic_7"), Action::SourceTopic(Some(7)));
    assert_eq!(Action::parse("target_topic_none"), Action::TargetTopic(None));
    assert_eq!(Action::parse("target_topic_12"), Action::TargetTopic(Some(12)));
  }

  #[test]
  fn malformed_ids_are_unrecognized() {
    assert_eq!(
      Action::parse("source_group_abc"),
      Action::Unrecognized("source_group_abc".into())
    );
    assert_eq!(
      Action::parse("view_logs"),
      Action::Unrecognized("view_logs".into())
    );
  }

  #[test]
  fn display_is_the_callback_payload() {
    let actions = [
      Action::ToggleConnection(3),
      Action::SourceGroup(-100),
      Action::SourceTopic(None),
      Action::TargetTopic(Some(9)),
      Action::MainMenu,
    ];
    for action in actions {
      assert_eq!(Action::parse(&action.to_string()), action);
    }
  }
}
