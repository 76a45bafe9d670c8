//! The `RelayStore` trait.
//!
//! Implemented by storage backends (e.g. `fwed-store-sqlite`). The bot depends
//! on this abstraction, not on any concrete backend.
//!
//! Every method is a self-contained statement against the store. "Not found"
//! and "no effect" are reported through `Option`, `bool` or row counts; `Err`
//! is reserved for I/O and constraint failures.

use std::future::Future;

use crate::{
  model::{
    ChatId, Connection, ConnectionId, Group, GroupId, RouteField, Topic, TopicId, TopicRename,
    UserId, UserState,
  },
  stage::Stage,
};

/// Abstraction over a fwedbot store backend.
///
/// All methods return `Send` futures so the trait can be used from the
/// multi-threaded teloxide dispatcher.
pub trait RelayStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── User state ────────────────────────────────────────────────────────

  /// Retrieve a user's wizard state. Returns `None` for unknown users.
  fn get_user(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Option<UserState>, Self::Error>> + Send + '_;

  /// Create the user row or overwrite its stage unconditionally, clearing any
  /// draft reference.
  fn reset_user(
    &self,
    user_id: UserId,
    chat_id: ChatId,
    stage: Stage,
  ) -> impl Future<Output = Result<UserState, Self::Error>> + Send + '_;

  /// Compare-and-swap the stage: succeeds only when the persisted stage equals
  /// `expected`. Returns whether the row was updated.
  fn advance_stage(
    &self,
    user_id: UserId,
    expected: Stage,
    next: Stage,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Point the user's draft reference at `connection_id` (or clear it).
  fn set_draft(
    &self,
    user_id: UserId,
    connection_id: Option<ConnectionId>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Groups ────────────────────────────────────────────────────────────

  /// Register a group to `user_id`, or refresh its name and reactivate it when
  /// the same user registers it again. A group owned by someone else is left
  /// untouched. Returns the stored row either way.
  fn upsert_group(
    &self,
    user_id: UserId,
    group_id: GroupId,
    group_name: String,
  ) -> impl Future<Output = Result<Group, Self::Error>> + Send + '_;

  fn get_group(
    &self,
    group_id: GroupId,
  ) -> impl Future<Output = Result<Option<Group>, Self::Error>> + Send + '_;

  /// Active groups owned by `user_id`, in registration order.
  fn list_groups(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<Group>, Self::Error>> + Send + '_;

  // ── Topics ────────────────────────────────────────────────────────────

  /// Register a topic under its placeholder name. Returns `false` if the
  /// topic was already registered.
  fn add_topic(
    &self,
    group_id: GroupId,
    topic_id: TopicId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn list_topics(
    &self,
    group_id: GroupId,
  ) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;

  /// Rename topic `topic_id` in the groups owned by `user_id`, restricted to
  /// `group_id` when given. Topic names are unique within a group.
  fn rename_topic(
    &self,
    user_id: UserId,
    group_id: Option<GroupId>,
    topic_id: TopicId,
    topic_name: String,
  ) -> impl Future<Output = Result<TopicRename, Self::Error>> + Send + '_;

  // ── Connections ───────────────────────────────────────────────────────

  /// Insert a draft connection holding only its owner and title.
  fn create_draft(
    &self,
    user_id: UserId,
    title: String,
  ) -> impl Future<Output = Result<Connection, Self::Error>> + Send + '_;

  fn get_connection(
    &self,
    connection_id: ConnectionId,
  ) -> impl Future<Output = Result<Option<Connection>, Self::Error>> + Send + '_;

  /// Set one routing column. Returns `false` if the connection is gone.
  fn set_route_field(
    &self,
    connection_id: ConnectionId,
    field: RouteField,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All connections owned by `user_id`, oldest first.
  fn list_connections(
    &self,
    user_id: UserId,
  ) -> impl Future<Output = Result<Vec<Connection>, Self::Error>> + Send + '_;

  /// Delete one of `user_id`'s connections. Returns rows affected.
  fn delete_connection(
    &self,
    user_id: UserId,
    connection_id: ConnectionId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Set `is_active` on one of `user_id`'s connections. Returns `false` if no
  /// such connection exists.
  fn set_connection_active(
    &self,
    user_id: UserId,
    connection_id: ConnectionId,
    active: bool,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Routing ───────────────────────────────────────────────────────────

  /// The routable connection for a message from `(group, topic)`.
  ///
  /// A connection bound to the exact topic wins over a topic-agnostic one;
  /// among equals the oldest connection wins.
  fn find_route(
    &self,
    source_group_id: GroupId,
    source_topic_id: Option<TopicId>,
  ) -> impl Future<Output = Result<Option<Connection>, Self::Error>> + Send + '_;

  /// A routable connection, other than `exclude`, whose source is exactly
  /// `(group, topic)`, where a `None` topic only equals `None`.
  fn find_source_conflict(
    &self,
    source_group_id: GroupId,
    source_topic_id: Option<TopicId>,
    exclude: ConnectionId,
  ) -> impl Future<Output = Result<Option<Connection>, Self::Error>> + Send + '_;
}
