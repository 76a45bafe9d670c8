//! Encoding and decoding helpers between domain types and the plain column
//! representations stored in SQLite.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that they sort lexically; stages are stored by their snake_case names.
//! Booleans use SQLite's integer affinity.

use chrono::{DateTime, SecondsFormat, Utc};
use fwed_core::{
  model::{Connection, Group, RouteField, Topic, UserState},
  stage::Stage,
};

use crate::{Error, Result};

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── RouteField
// ───────────────────────────────────────────────────────────────

/// The column a [`RouteField`] writes, and the value written.
pub fn encode_route_field(field: RouteField) -> (&'static str, Option<i64>) {
  match field {
    RouteField::SourceGroup(id) => ("source_group_id", Some(id)),
    RouteField::SourceTopic(id) => ("source_topic_id", id.map(i64::from)),
    RouteField::TargetGroup(id) => ("target_group_id", Some(id)),
    RouteField::TargetTopic(id) => ("target_topic_id", id.map(i64::from)),
  }
}

// ─── Raw row types
// ────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, chat_id, current_step, draft_connection_id, updated_at";

pub struct RawUserState {
  pub user_id:             i64,
  pub chat_id:             i64,
  pub current_step:        String,
  pub draft_connection_id: Option<i64>,
  pub updated_at:          String,
}

impl RawUserState {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:             row.get(0)?,
      chat_id:             row.get(1)?,
      current_step:        row.get(2)?,
      draft_connection_id: row.get(3)?,
      updated_at:          row.get(4)?,
    })
  }

  pub fn into_user_state(self) -> Result<UserState> {
    Ok(UserState {
      user_id:             self.user_id,
      chat_id:             self.chat_id,
      current_step:        Stage::parse(&self.current_step)?,
      draft_connection_id: self.draft_connection_id,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

pub const GROUP_COLUMNS: &str = "group_id, user_id, group_name, is_active, registered_at";

pub struct RawGroup {
  pub group_id:      i64,
  pub user_id:       i64,
  pub group_name:    String,
  pub is_active:     bool,
  pub registered_at: String,
}

impl RawGroup {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      group_id:      row.get(0)?,
      user_id:       row.get(1)?,
      group_name:    row.get(2)?,
      is_active:     row.get(3)?,
      registered_at: row.get(4)?,
    })
  }

  pub fn into_group(self) -> Result<Group> {
    Ok(Group {
      group_id:      self.group_id,
      user_id:       self.user_id,
      group_name:    self.group_name,
      is_active:     self.is_active,
      registered_at: decode_dt(&self.registered_at)?,
    })
  }
}

pub fn topic_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Topic> {
  Ok(Topic {
    group_id:   row.get(0)?,
    topic_id:   row.get(1)?,
    topic_name: row.get(2)?,
  })
}

pub const CONNECTION_COLUMNS: &str = "connection_id, user_id, connection_title,
  source_group_id, source_topic_id, target_group_id, target_topic_id,
  is_active, created_at";

pub struct RawConnection {
  pub connection_id:   i64,
  pub user_id:         i64,
  pub title:           Option<String>,
  pub source_group_id: Option<i64>,
  pub source_topic_id: Option<i32>,
  pub target_group_id: Option<i64>,
  pub target_topic_id: Option<i32>,
  pub is_active:       bool,
  pub created_at:      String,
}

impl RawConnection {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      connection_id:   row.get(0)?,
      user_id:         row.get(1)?,
      title:           row.get(2)?,
      source_group_id: row.get(3)?,
      source_topic_id: row.get(4)?,
      target_group_id: row.get(5)?,
      target_topic_id: row.get(6)?,
      is_active:       row.get(7)?,
      created_at:      row.get(8)?,
    })
  }

  pub fn into_connection(self) -> Result<Connection> {
    Ok(Connection {
      connection_id:   self.connection_id,
      user_id:         self.user_id,
      title:           self.title,
      source_group_id: self.source_group_id,
      source_topic_id: self.source_topic_id,
      target_group_id: self.target_group_id,
      target_topic_id: self.target_topic_id,
      is_active:       self.is_active,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
