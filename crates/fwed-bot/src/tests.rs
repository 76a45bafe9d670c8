//! Shared fixtures and end-to-end wizard tests against an in-memory store.

use std::sync::Arc;

use fwed_core::{
  action::Action,
  alert::DEFAULT_LINK_TEMPLATE,
  model::{
    ChatId, Connection, ConnectionId, Group, GroupId, RouteField, Topic, TopicId, TopicRename,
    UserId, UserState,
  },
  stage::Stage,
  store::RelayStore,
};
use fwed_store_sqlite::SqliteStore;

use crate::{
  AppState, BotConfig, Sender,
  handlers::{
    NO_GROUPS,
    commands::{self, ChatScope, Origin},
    connection::{self, EMPTY_TITLE, INVALID_GROUP, INVALID_TOPIC, NO_DRAFT, SAME_AS_SOURCE},
    menu::handle_action,
    private_text, relay,
  },
  reply::Reply,
  steps::{self, WRONG_STAGE},
};

pub(crate) const ME: UserId = 1001;
pub(crate) const OTHER: UserId = 2002;
pub(crate) const GROUP_A: GroupId = -100_111;
pub(crate) const GROUP_B: GroupId = -100_222;
const OTHER_GROUP: GroupId = -100_333;

const ADDRESS: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJopump";

pub(crate) async fn app() -> AppState<SqliteStore> {
  AppState {
    store:  Arc::new(SqliteStore::open_in_memory().await.unwrap()),
    config: Arc::new(BotConfig {
      bot_token:     "123:test".into(),
      store_path:    ":memory:".into(),
      link_template: DEFAULT_LINK_TEMPLATE.into(),
    }),
  }
}

pub(crate) fn sender(user_id: UserId) -> Sender { Sender { user_id, chat_id: user_id } }

/// `ME` owns Alpha (topic 5) and Beta (topic 9); `OTHER` owns a third group.
async fn seeded() -> AppState<SqliteStore> {
  let state = app().await;
  state.store.upsert_group(ME, GROUP_A, "Alpha".into()).await.unwrap();
  state.store.upsert_group(ME, GROUP_B, "Beta".into()).await.unwrap();
  state.store.upsert_group(OTHER, OTHER_GROUP, "Theirs".into()).await.unwrap();
  state.store.add_topic(GROUP_A, 5).await.unwrap();
  state.store.add_topic(GROUP_B, 9).await.unwrap();
  state
}

async fn press(state: &AppState<SqliteStore>, action: Action) -> Vec<Reply> {
  handle_action(state, sender(ME), action).await.unwrap()
}

async fn stage(state: &AppState<SqliteStore>) -> Option<Stage> {
  steps::current(&*state.store, ME).await.unwrap()
}

/// Run the wizard up to the source-group choice.
async fn named(state: &AppState<SqliteStore>, title: &str) {
  press(state, Action::AddConnection).await;
  private_text(state, sender(ME), title).await.unwrap();
  assert_eq!(stage(state).await, Some(Stage::SelectingSourceGroup));
}

fn keyboard_actions(reply: &Reply) -> Vec<Action> {
  reply
    .keyboard
    .as_ref()
    .map(|k| k.actions().cloned().collect())
    .unwrap_or_default()
}

#[tokio::test]
async fn wizard_builds_one_complete_connection() {
  let state = seeded().await;

  press(&state, Action::AddConnection).await;
  assert_eq!(stage(&state).await, Some(Stage::AddingConnection));

  let replies = private_text(&state, sender(ME), "  alpha feed  ").await.unwrap();
  assert!(replies[0].text.contains("'alpha feed' has been named successfully"));
  assert_eq!(
    keyboard_actions(replies.last().unwrap()),
    vec![Action::SourceGroup(GROUP_A), Action::SourceGroup(GROUP_B)]
  );

  let replies = press(&state, Action::SourceGroup(GROUP_A)).await;
  assert_eq!(
    keyboard_actions(replies.last().unwrap()),
    vec![Action::SourceTopic(Some(5)), Action::SourceTopic(None)]
  );

  press(&state, Action::SourceTopic(Some(5))).await;
  press(&state, Action::TargetGroup(GROUP_B)).await;
  let replies = press(&state, Action::TargetTopic(None)).await;
  assert!(replies.last().unwrap().text.starts_with("🎉 Connection Configuration Complete!"));
  assert_eq!(keyboard_actions(replies.last().unwrap()), vec![Action::MainMenu]);

  assert_eq!(stage(&state).await, Some(Stage::Start));
  let user = state.store.get_user(ME).await.unwrap().unwrap();
  assert_eq!(user.draft_connection_id, None);

  let connections = state.store.list_connections(ME).await.unwrap();
  assert_eq!(connections.len(), 1);
  let c = &connections[0];
  assert_eq!(c.title.as_deref(), Some("alpha feed"));
  assert_eq!(c.source_group_id, Some(GROUP_A));
  assert_eq!(c.source_topic_id, Some(5));
  assert_eq!(c.target_group_id, Some(GROUP_B));
  assert_eq!(c.target_topic_id, None);
  assert!(c.is_routable());

  let relay = relay::scan(&state, GROUP_A, Some(5), ADDRESS).await.unwrap().unwrap();
  assert_eq!(relay.target_group_id, GROUP_B);
  assert_eq!(relay.target_topic_id, None);
}

#[tokio::test]
async fn out_of_order_steps_change_nothing() {
  let state = seeded().await;
  state.store.reset_user(ME, ME, Stage::Start).await.unwrap();

  for action in [
    Action::SourceGroup(GROUP_A),
    Action::SourceTopic(None),
    Action::TargetGroup(GROUP_B),
    Action::TargetTopic(None),
  ] {
    let replies = press(&state, action).await;
    assert_eq!(replies[0].text, WRONG_STAGE);
    assert_eq!(stage(&state).await, Some(Stage::Start));
  }

  let replies = private_text(&state, sender(ME), "stray text").await.unwrap();
  assert!(replies.is_empty());
  assert!(state.store.list_connections(ME).await.unwrap().is_empty());
}

#[tokio::test]
async fn skipping_ahead_is_rejected() {
  let state = seeded().await;
  named(&state, "feed").await;

  let replies = press(&state, Action::TargetGroup(GROUP_B)).await;
  assert_eq!(replies[0].text, WRONG_STAGE);
  let c = &state.store.list_connections(ME).await.unwrap()[0];
  assert_eq!(c.target_group_id, None);
  assert_eq!(stage(&state).await, Some(Stage::SelectingSourceGroup));
}

#[tokio::test]
async fn foreign_group_selection_is_rejected() {
  let state = seeded().await;
  named(&state, "feed").await;

  let replies = press(&state, Action::SourceGroup(OTHER_GROUP)).await;
  assert_eq!(replies[0].text, INVALID_GROUP);
  assert_eq!(stage(&state).await, Some(Stage::SelectingSourceGroup));
  let c = &state.store.list_connections(ME).await.unwrap()[0];
  assert_eq!(c.source_group_id, None);
}

#[tokio::test]
async fn topic_from_another_group_is_rejected() {
  let state = seeded().await;
  named(&state, "feed").await;
  press(&state, Action::SourceGroup(GROUP_A)).await;

  let replies = press(&state, Action::SourceTopic(Some(9))).await;
  assert_eq!(replies[0].text, INVALID_TOPIC);
  assert_eq!(stage(&state).await, Some(Stage::SelectingSourceTopic));
}

#[tokio::test]
async fn no_specific_topic_stores_null_and_routes_every_topic() {
  let state = seeded().await;
  named(&state, "catch all").await;
  press(&state, Action::SourceGroup(GROUP_A)).await;
  let replies = press(&state, Action::SourceTopic(None)).await;
  assert_eq!(replies[0].text, "✅ No source topic has been selected.");
  press(&state, Action::TargetGroup(GROUP_B)).await;
  press(&state, Action::TargetTopic(Some(9))).await;

  let c = &state.store.list_connections(ME).await.unwrap()[0];
  assert_eq!(c.source_topic_id, None);
  assert_eq!(c.target_topic_id, Some(9));

  for topic in [None, Some(5), Some(77)] {
    let relay = relay::scan(&state, GROUP_A, topic, ADDRESS).await.unwrap();
    assert_eq!(relay.map(|r| r.target_topic_id), Some(Some(9)));
  }
}

#[tokio::test]
async fn blank_title_creates_nothing() {
  let state = seeded().await;
  press(&state, Action::AddConnection).await;

  let replies = private_text(&state, sender(ME), "   ").await.unwrap();
  assert_eq!(replies[0].text, EMPTY_TITLE);
  assert_eq!(stage(&state).await, Some(Stage::AddingConnection));
  assert!(state.store.list_connections(ME).await.unwrap().is_empty());
}

#[tokio::test]
async fn configure_waits_for_a_registered_group() {
  let state = app().await;
  press(&state, Action::AddConnection).await;

  let replies = private_text(&state, sender(ME), "feed").await.unwrap();
  assert_eq!(replies.last().unwrap().text, NO_GROUPS);
  assert_eq!(stage(&state).await, Some(Stage::AwaitingConfiguration));

  state.store.upsert_group(ME, GROUP_A, "Alpha".into()).await.unwrap();
  let replies = private_text(&state, sender(ME), "ready").await.unwrap();
  assert_eq!(keyboard_actions(&replies[0]), vec![Action::SourceGroup(GROUP_A)]);
  assert_eq!(stage(&state).await, Some(Stage::SelectingSourceGroup));
  assert_eq!(state.store.list_connections(ME).await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleted_draft_sends_user_back_to_menu() {
  let state = seeded().await;
  named(&state, "feed").await;
  let c = &state.store.list_connections(ME).await.unwrap()[0];
  state.store.delete_connection(ME, c.connection_id).await.unwrap();

  let replies = press(&state, Action::SourceGroup(GROUP_A)).await;
  assert_eq!(replies[0].text, NO_DRAFT);
  assert_eq!(keyboard_actions(&replies[0]), vec![Action::MainMenu]);
}

#[tokio::test]
async fn target_equal_to_source_is_rejected() {
  let state = seeded().await;
  named(&state, "loop").await;
  press(&state, Action::SourceGroup(GROUP_A)).await;
  press(&state, Action::SourceTopic(Some(5))).await;
  press(&state, Action::TargetGroup(GROUP_A)).await;

  let replies = press(&state, Action::TargetTopic(Some(5))).await;
  assert_eq!(replies[0].text, SAME_AS_SOURCE);
  assert_eq!(stage(&state).await, Some(Stage::SelectingTargetTopic));
}

#[tokio::test]
async fn source_already_relayed_is_refused() {
  let state = seeded().await;
  let existing = state.store.create_draft(ME, "first".into()).await.unwrap();
  for field in [
    RouteField::SourceGroup(GROUP_A),
    RouteField::SourceTopic(Some(5)),
    RouteField::TargetGroup(GROUP_B),
  ] {
    state
      .store
      .set_route_field(existing.connection_id, field)
      .await
      .unwrap();
  }

  named(&state, "second").await;
  press(&state, Action::SourceGroup(GROUP_A)).await;
  let replies = press(&state, Action::SourceTopic(Some(5))).await;
  assert!(replies[0].text.contains("already relays from this source"));
  assert_eq!(stage(&state).await, Some(Stage::SelectingSourceTopic));

  press(&state, Action::SourceTopic(None)).await;
  assert_eq!(stage(&state).await, Some(Stage::SelectingTargetGroup));
}

#[tokio::test]
async fn restarting_discards_the_unfinished_draft() {
  let state = seeded().await;
  named(&state, "first try").await;
  press(&state, Action::AddConnection).await;
  private_text(&state, sender(ME), "second try").await.unwrap();

  let titles: Vec<_> = state
    .store
    .list_connections(ME)
    .await
    .unwrap()
    .into_iter()
    .filter_map(|c| c.title)
    .collect();
  assert_eq!(titles, vec!["second try".to_string()]);
}

#[tokio::test]
async fn start_command_discards_the_unfinished_draft() {
  let state = seeded().await;
  named(&state, "half done").await;

  let origin = Origin {
    user_id:  ME,
    chat_id:  ME,
    scope:    ChatScope::Private,
    title:    None,
    topic_id: None,
  };
  commands::start(&state, origin).await.unwrap();

  assert_eq!(stage(&state).await, Some(Stage::Start));
  assert!(state.store.list_connections(ME).await.unwrap().is_empty());
}

#[tokio::test]
async fn main_menu_button_discards_the_unfinished_draft() {
  let state = seeded().await;
  named(&state, "half done").await;
  press(&state, Action::SourceGroup(GROUP_A)).await;

  press(&state, Action::MainMenu).await;

  assert_eq!(stage(&state).await, Some(Stage::Start));
  let user = state.store.get_user(ME).await.unwrap().unwrap();
  assert_eq!(user.draft_connection_id, None);
  assert!(state.store.list_connections(ME).await.unwrap().is_empty());
}

#[tokio::test]
async fn main_menu_button_keeps_finished_connections() {
  let state = seeded().await;
  named(&state, "done").await;
  press(&state, Action::SourceGroup(GROUP_A)).await;
  press(&state, Action::SourceTopic(None)).await;
  press(&state, Action::TargetGroup(GROUP_B)).await;
  press(&state, Action::TargetTopic(None)).await;

  press(&state, Action::MainMenu).await;

  assert_eq!(state.store.list_connections(ME).await.unwrap().len(), 1);
}

/// A store where a concurrent interaction always completes the stage swap
/// first, so every `advance_stage` call loses.
struct RivalStore(SqliteStore);

impl RelayStore for RivalStore {
  type Error = fwed_store_sqlite::Error;

  async fn get_user(&self, user_id: UserId) -> fwed_store_sqlite::Result<Option<UserState>> {
    self.0.get_user(user_id).await
  }

  async fn reset_user(
    &self,
    user_id: UserId,
    chat_id: ChatId,
    stage: Stage,
  ) -> fwed_store_sqlite::Result<UserState> {
    self.0.reset_user(user_id, chat_id, stage).await
  }

  async fn advance_stage(
    &self,
    user_id: UserId,
    expected: Stage,
    next: Stage,
  ) -> fwed_store_sqlite::Result<bool> {
    self.0.advance_stage(user_id, expected, next).await?;
    self.0.advance_stage(user_id, expected, next).await
  }

  async fn set_draft(
    &self,
    user_id: UserId,
    connection_id: Option<ConnectionId>,
  ) -> fwed_store_sqlite::Result<bool> {
    self.0.set_draft(user_id, connection_id).await
  }

  async fn upsert_group(
    &self,
    user_id: UserId,
    group_id: GroupId,
    group_name: String,
  ) -> fwed_store_sqlite::Result<Group> {
    self.0.upsert_group(user_id, group_id, group_name).await
  }

  async fn get_group(&self, group_id: GroupId) -> fwed_store_sqlite::Result<Option<Group>> {
    self.0.get_group(group_id).await
  }

  async fn list_groups(&self, user_id: UserId) -> fwed_store_sqlite::Result<Vec<Group>> {
    self.0.list_groups(user_id).await
  }

  async fn add_topic(
    &self,
    group_id: GroupId,
    topic_id: TopicId,
  ) -> fwed_store_sqlite::Result<bool> {
    self.0.add_topic(group_id, topic_id).await
  }

  async fn list_topics(&self, group_id: GroupId) -> fwed_store_sqlite::Result<Vec<Topic>> {
    self.0.list_topics(group_id).await
  }

  async fn rename_topic(
    &self,
    user_id: UserId,
    group_id: Option<GroupId>,
    topic_id: TopicId,
    topic_name: String,
  ) -> fwed_store_sqlite::Result<TopicRename> {
    self.0.rename_topic(user_id, group_id, topic_id, topic_name).await
  }

  async fn create_draft(
    &self,
    user_id: UserId,
    title: String,
  ) -> fwed_store_sqlite::Result<Connection> {
    self.0.create_draft(user_id, title).await
  }

  async fn get_connection(
    &self,
    connection_id: ConnectionId,
  ) -> fwed_store_sqlite::Result<Option<Connection>> {
    self.0.get_connection(connection_id).await
  }

  async fn set_route_field(
    &self,
    connection_id: ConnectionId,
    field: RouteField,
  ) -> fwed_store_sqlite::Result<bool> {
    self.0.set_route_field(connection_id, field).await
  }

  async fn list_connections(&self, user_id: UserId) -> fwed_store_sqlite::Result<Vec<Connection>> {
    self.0.list_connections(user_id).await
  }

  async fn delete_connection(
    &self,
    user_id: UserId,
    connection_id: ConnectionId,
  ) -> fwed_store_sqlite::Result<usize> {
    self.0.delete_connection(user_id, connection_id).await
  }

  async fn set_connection_active(
    &self,
    user_id: UserId,
    connection_id: ConnectionId,
    active: bool,
  ) -> fwed_store_sqlite::Result<bool> {
    self.0.set_connection_active(user_id, connection_id, active).await
  }

  async fn find_route(
    &self,
    source_group_id: GroupId,
    source_topic_id: Option<TopicId>,
  ) -> fwed_store_sqlite::Result<Option<Connection>> {
    self.0.find_route(source_group_id, source_topic_id).await
  }

  async fn find_source_conflict(
    &self,
    source_group_id: GroupId,
    source_topic_id: Option<TopicId>,
    exclude: ConnectionId,
  ) -> fwed_store_sqlite::Result<Option<Connection>> {
    self.0.find_source_conflict(source_group_id, source_topic_id, exclude).await
  }
}

#[tokio::test]
async fn losing_the_name_race_deletes_the_new_draft() {
  let base = app().await;
  let state = AppState {
    store:  Arc::new(RivalStore(SqliteStore::open_in_memory().await.unwrap())),
    config: base.config,
  };
  steps::restart(&*state.store, sender(ME)).await.unwrap();

  let replies = connection::name(&state, sender(ME), "racing").await.unwrap();

  assert!(replies.is_empty());
  assert!(state.store.list_connections(ME).await.unwrap().is_empty());
  let user = state.store.get_user(ME).await.unwrap().unwrap();
  assert_eq!(user.draft_connection_id, None);
  assert_eq!(user.current_step, Stage::AwaitingConfiguration);
}

#[test]
fn config_requires_token_and_placeholder() {
  let base = BotConfig {
    bot_token:     "123:abc".into(),
    store_path:    "fwedbot.db".into(),
    link_template: DEFAULT_LINK_TEMPLATE.into(),
  };
  assert!(base.validate().is_ok());
  assert!(BotConfig { bot_token: "  ".into(), ..base.clone() }.validate().is_err());
  assert!(
    BotConfig { link_template: "https://example.org".into(), ..base }
      .validate()
      .is_err()
  );
}
