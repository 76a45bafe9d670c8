//! [`SqliteStore`], the SQLite implementation of [`RelayStore`].

use std::path::Path;

use chrono::Utc;
use fwed_core::{
  model::{
    ChatId, Connection, ConnectionId, Group, GroupId, RouteField, Topic, TopicId, TopicRename,
    UserId, UserState,
  },
  stage::Stage,
  store::RelayStore,
};
use rusqlite::{ErrorCode, OptionalExtension as _};
use tracing::debug;

use crate::{
  Error, Result,
  encode::{
    CONNECTION_COLUMNS, GROUP_COLUMNS, RawConnection, RawGroup, RawUserState, USER_COLUMNS,
    decode_dt, encode_dt, encode_route_field, topic_from_row,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A relay store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch at most one connection matching `sql` (a full SELECT).
  async fn query_connection(
    &self,
    sql: String,
    params: Vec<Option<i64>>,
  ) -> Result<Option<Connection>> {
    let raw: Option<RawConnection> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), RawConnection::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConnection::into_connection).transpose()
  }
}

// ─── RelayStore impl ─────────────────────────────────────────────────────────

impl RelayStore for SqliteStore {
  type Error = Error;

  // ── User state ────────────────────────────────────────────────────────────

  async fn get_user(&self, user_id: UserId) -> Result<Option<UserState>> {
    let raw: Option<RawUserState> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM user_states WHERE user_id = ?1"),
              rusqlite::params![user_id],
              RawUserState::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUserState::into_user_state).transpose()
  }

  async fn reset_user(&self, user_id: UserId, chat_id: ChatId, stage: Stage) -> Result<UserState> {
    let at_str = encode_dt(Utc::now());
    let state = UserState {
      user_id,
      chat_id,
      current_step: stage,
      draft_connection_id: None,
      updated_at: decode_dt(&at_str)?,
    };

    let stage_str = stage.as_str().to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_states (user_id, chat_id, current_step, draft_connection_id, updated_at)
           VALUES (?1, ?2, ?3, NULL, ?4)
           ON CONFLICT(user_id) DO UPDATE SET
             chat_id             = excluded.chat_id,
             current_step        = excluded.current_step,
             draft_connection_id = NULL,
             updated_at          = excluded.updated_at",
          rusqlite::params![user_id, chat_id, stage_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(user_id, stage = %stage, "user stage reset");
    Ok(state)
  }

  async fn advance_stage(&self, user_id: UserId, expected: Stage, next: Stage) -> Result<bool> {
    let expected_str = expected.as_str().to_owned();
    let next_str     = next.as_str().to_owned();
    let at_str       = encode_dt(Utc::now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE user_states SET current_step = ?3, updated_at = ?4
           WHERE user_id = ?1 AND current_step = ?2",
          rusqlite::params![user_id, expected_str, next_str, at_str],
        )?)
      })
      .await?;

    debug!(user_id, %expected, %next, changed, "compare-and-set stage");
    Ok(changed == 1)
  }

  async fn set_draft(&self, user_id: UserId, connection_id: Option<ConnectionId>) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE user_states SET draft_connection_id = ?2 WHERE user_id = ?1",
          rusqlite::params![user_id, connection_id],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  // ── Groups ────────────────────────────────────────────────────────────────

  async fn upsert_group(
    &self,
    user_id: UserId,
    group_id: GroupId,
    group_name: String,
  ) -> Result<Group> {
    let at_str = encode_dt(Utc::now());

    let raw: RawGroup = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_groups (group_id, user_id, group_name, is_active, registered_at)
           VALUES (?1, ?2, ?3, 1, ?4)
           ON CONFLICT(group_id) DO UPDATE SET
             group_name = excluded.group_name,
             is_active  = 1
           WHERE user_groups.user_id = excluded.user_id",
          rusqlite::params![group_id, user_id, group_name, at_str],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {GROUP_COLUMNS} FROM user_groups WHERE group_id = ?1"),
          rusqlite::params![group_id],
          RawGroup::from_row,
        )?)
      })
      .await?;

    raw.into_group()
  }

  async fn get_group(&self, group_id: GroupId) -> Result<Option<Group>> {
    let raw: Option<RawGroup> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {GROUP_COLUMNS} FROM user_groups WHERE group_id = ?1"),
              rusqlite::params![group_id],
              RawGroup::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawGroup::into_group).transpose()
  }

  async fn list_groups(&self, user_id: UserId) -> Result<Vec<Group>> {
    let raws: Vec<RawGroup> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {GROUP_COLUMNS} FROM user_groups
           WHERE user_id = ?1 AND is_active = 1
           ORDER BY registered_at, group_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], RawGroup::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGroup::into_group).collect()
  }

  // ── Topics ────────────────────────────────────────────────────────────────

  async fn add_topic(&self, group_id: GroupId, topic_id: TopicId) -> Result<bool> {
    let name = Topic::placeholder_name(topic_id);

    let inserted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO group_topics (group_id, topic_id, topic_name)
           VALUES (?1, ?2, ?3)
           ON CONFLICT DO NOTHING",
          rusqlite::params![group_id, topic_id, name],
        )?)
      })
      .await?;

    Ok(inserted == 1)
  }

  async fn list_topics(&self, group_id: GroupId) -> Result<Vec<Topic>> {
    let topics = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT group_id, topic_id, topic_name FROM group_topics
           WHERE group_id = ?1
           ORDER BY topic_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![group_id], topic_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(topics)
  }

  async fn rename_topic(
    &self,
    user_id: UserId,
    group_id: Option<GroupId>,
    topic_id: TopicId,
    topic_name: String,
  ) -> Result<TopicRename> {
    let renamed = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "UPDATE group_topics SET topic_name = ?1
           WHERE topic_id = ?2
             AND (?3 IS NULL OR group_id = ?3)
             AND group_id IN (SELECT group_id FROM user_groups WHERE user_id = ?4)",
          rusqlite::params![topic_name, topic_id, group_id, user_id],
        );
        match result {
          Ok(n) => Ok(TopicRename::Renamed(n)),
          Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Ok(TopicRename::NameTaken)
          }
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    debug!(user_id, topic_id, ?renamed, "topic rename");
    Ok(renamed)
  }

  // ── Connections ───────────────────────────────────────────────────────────

  async fn create_draft(&self, user_id: UserId, title: String) -> Result<Connection> {
    let at_str     = encode_dt(Utc::now());
    let created_at = decode_dt(&at_str)?;
    let title_col  = title.clone();

    let connection_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO user_connections (user_id, connection_title, is_active, created_at)
           VALUES (?1, ?2, 1, ?3)",
          rusqlite::params![user_id, title_col, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    debug!(user_id, connection_id, "draft connection inserted");

    Ok(Connection {
      connection_id,
      user_id,
      title: Some(title),
      source_group_id: None,
      source_topic_id: None,
      target_group_id: None,
      target_topic_id: None,
      is_active: true,
      created_at,
    })
  }

  async fn get_connection(&self, connection_id: ConnectionId) -> Result<Option<Connection>> {
    self
      .query_connection(
        format!("SELECT {CONNECTION_COLUMNS} FROM user_connections WHERE connection_id = ?1"),
        vec![Some(connection_id)],
      )
      .await
  }

  async fn set_route_field(&self, connection_id: ConnectionId, field: RouteField) -> Result<bool> {
    let (column, value) = encode_route_field(field);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("UPDATE user_connections SET {column} = ?2 WHERE connection_id = ?1"),
          rusqlite::params![connection_id, value],
        )?)
      })
      .await?;

    debug!(connection_id, column, ?value, "route field updated");
    Ok(changed == 1)
  }

  async fn list_connections(&self, user_id: UserId) -> Result<Vec<Connection>> {
    let raws: Vec<RawConnection> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONNECTION_COLUMNS} FROM user_connections
           WHERE user_id = ?1
           ORDER BY connection_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], RawConnection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawConnection::into_connection).collect()
  }

  async fn delete_connection(&self, user_id: UserId, connection_id: ConnectionId) -> Result<usize> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM user_connections WHERE connection_id = ?1 AND user_id = ?2",
          rusqlite::params![connection_id, user_id],
        )?)
      })
      .await?;

    debug!(user_id, connection_id, deleted, "connection delete");
    Ok(deleted)
  }

  async fn set_connection_active(
    &self,
    user_id: UserId,
    connection_id: ConnectionId,
    active: bool,
  ) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE user_connections SET is_active = ?3
           WHERE connection_id = ?1 AND user_id = ?2",
          rusqlite::params![connection_id, user_id, active],
        )?)
      })
      .await?;
    Ok(changed == 1)
  }

  // ── Routing ───────────────────────────────────────────────────────────────

  async fn find_route(
    &self,
    source_group_id: GroupId,
    source_topic_id: Option<TopicId>,
  ) -> Result<Option<Connection>> {
    // `source_topic_id IS NULL` sorts false (0) first, so exact topics win.
    self
      .query_connection(
        format!(
          "SELECT {CONNECTION_COLUMNS} FROM user_connections
           WHERE is_active = 1
             AND target_group_id IS NOT NULL
             AND source_group_id = ?1
             AND (source_topic_id = ?2 OR source_topic_id IS NULL)
           ORDER BY source_topic_id IS NULL, connection_id
           LIMIT 1"
        ),
        vec![Some(source_group_id), source_topic_id.map(i64::from)],
      )
      .await
  }

  async fn find_source_conflict(
    &self,
    source_group_id: GroupId,
    source_topic_id: Option<TopicId>,
    exclude: ConnectionId,
  ) -> Result<Option<Connection>> {
    self
      .query_connection(
        format!(
          "SELECT {CONNECTION_COLUMNS} FROM user_connections
           WHERE is_active = 1
             AND target_group_id IS NOT NULL
             AND source_group_id = ?1
             AND source_topic_id IS ?2
             AND connection_id != ?3
           ORDER BY connection_id
           LIMIT 1"
        ),
        vec![Some(source_group_id), source_topic_id.map(i64::from), Some(exclude)],
      )
      .await
  }
}
