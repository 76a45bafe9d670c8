//! Persisted records: user wizard state, registered groups and topics, and
//! connections.
//!
//! Identifiers are the chat platform's own integers; only connections carry a
//! surrogate key assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

pub type UserId = i64;
pub type ChatId = i64;
pub type GroupId = i64;
pub type TopicId = i32;
pub type ConnectionId = i64;

/// Fallback attribution for a connection without a title.
pub const UNNAMED_CONNECTION: &str = "Unnamed Connection";

// ─── User state ──────────────────────────────────────────────────────────────

/// Per-user wizard progress. Exactly one row per user; never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserState {
  pub user_id:             UserId,
  /// The private chat the user last interacted from.
  pub chat_id:             ChatId,
  pub current_step:        Stage,
  /// The connection being built by the wizard, if any.
  pub draft_connection_id: Option<ConnectionId>,
  pub updated_at:          DateTime<Utc>,
}

// ─── Groups & topics ─────────────────────────────────────────────────────────

/// A group chat registered to exactly one owning user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
  pub group_id:      GroupId,
  pub user_id:       UserId,
  pub group_name:    String,
  pub is_active:     bool,
  pub registered_at: DateTime<Utc>,
}

/// A forum topic inside a registered group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
  pub group_id:   GroupId,
  pub topic_id:   TopicId,
  pub topic_name: String,
}

impl Topic {
  /// Name given to a topic at registration, before the owner renames it.
  pub fn placeholder_name(topic_id: TopicId) -> String {
    format!("Unnamed Topic {topic_id}")
  }
}

/// Outcome of renaming a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRename {
  /// Number of rows renamed; zero when no owned topic matched.
  Renamed(usize),
  /// Another topic in the same group already has the name.
  NameTaken,
}

// ─── Connections ─────────────────────────────────────────────────────────────

/// A directed route from a source (group, optional topic) to a target
/// (group, optional topic).
///
/// Rows are created as soon as a title is known and filled in stage by stage;
/// a row with some routing fields still `None` is a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  pub connection_id:   ConnectionId,
  pub user_id:         UserId,
  pub title:           Option<String>,
  pub source_group_id: Option<GroupId>,
  /// `None` matches every message of the source group.
  pub source_topic_id: Option<TopicId>,
  pub target_group_id: Option<GroupId>,
  /// `None` posts into the target group's general stream.
  pub target_topic_id: Option<TopicId>,
  pub is_active:       bool,
  pub created_at:      DateTime<Utc>,
}

impl Connection {
  /// Whether the router may pick this connection.
  pub fn is_routable(&self) -> bool {
    self.is_active && self.source_group_id.is_some() && self.target_group_id.is_some()
  }

  pub fn display_title(&self) -> &str {
    self.title.as_deref().unwrap_or(UNNAMED_CONNECTION)
  }
}

/// One routing column of a connection, set by a single wizard stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteField {
  SourceGroup(GroupId),
  SourceTopic(Option<TopicId>),
  TargetGroup(GroupId),
  TargetTopic(Option<TopicId>),
}
