//! The connection builder: a six-step wizard that fills one connection row.
//!
//! `begin` → `name` → `configure` → source group → source topic → target
//! group → target topic. Each step is gated on the stage the previous one
//! left behind; a step invoked out of order changes nothing.

use fwed_core::{
  action::Action,
  model::{Connection, GroupId, RouteField, TopicId, UserId},
  stage::Stage,
  store::RelayStore,
};
use tracing::{debug, info, warn};

use super::{NO_GROUPS, draft_of, group_keyboard, topic_keyboard};
use crate::{
  AppState, Sender,
  error::{Error, Result},
  reply::{Keyboard, Reply, main_menu_button},
  steps::{self, Advance, PROGRESS_FAILED, WRONG_STAGE},
};

pub const INVALID_GROUP: &str = "❌ Selected group is invalid. Please try again.";
pub const INVALID_TOPIC: &str = "❌ Selected topic is invalid. Please try again.";
pub const EMPTY_TITLE: &str = "❌ No Input Detected. Please add a title for your new connection.";
pub const NO_DRAFT: &str =
  "❌ The connection you were configuring no longer exists. Please start again from the main menu.";
pub const SAME_AS_SOURCE: &str =
  "❌ The target cannot be the same as the source. Please select another topic.";

fn wrong_stage() -> Vec<Reply> { vec![Reply::text(WRONG_STAGE)] }

fn no_draft() -> Vec<Reply> { vec![Reply::text(NO_DRAFT).with_main_menu()] }

fn no_groups() -> Vec<Reply> { vec![Reply::text(NO_GROUPS)] }

// ─── begin ────────────────────────────────────────────────────────────────────

/// Start (or restart) the wizard from any stage.
///
/// An unfinished draft left by an earlier run is discarded.
pub async fn begin<S: RelayStore>(state: &AppState<S>, sender: Sender) -> Result<Vec<Reply>> {
  discard_abandoned(state, sender.user_id).await?;

  if !steps::restart(&*state.store, sender).await? {
    return Ok(vec![Reply::text(PROGRESS_FAILED)]);
  }

  info!(user_id = sender.user_id, "connection wizard started");
  Ok(vec![Reply::text(
    "📝 You’ve started creating a new connection. Let’s start by naming this connection.",
  )])
}

// ─── name ─────────────────────────────────────────────────────────────────────

/// Create the draft row from the user's title, then continue to
/// [`configure`].
pub async fn name<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  text: &str,
) -> Result<Vec<Reply>> {
  let user_id = sender.user_id;
  if !steps::check(&*state.store, user_id, Stage::AddingConnection).await? {
    return Ok(Vec::new());
  }

  let title = text.trim();
  if title.is_empty() {
    return Ok(vec![Reply::text(EMPTY_TITLE)]);
  }

  let draft = state
    .store
    .create_draft(user_id, title.to_string())
    .await
    .map_err(Error::store)?;

  let outcome = steps::advance(
    &*state.store,
    user_id,
    Stage::AddingConnection,
    Stage::AwaitingConfiguration,
  )
  .await?;

  if outcome != Advance::Advanced {
    // Another interaction moved the user on; this draft has no owner step.
    state
      .store
      .delete_connection(user_id, draft.connection_id)
      .await
      .map_err(Error::store)?;
    return Ok(match outcome {
      Advance::Lost => Vec::new(),
      _ => vec![Reply::text(PROGRESS_FAILED)],
    });
  }

  state
    .store
    .set_draft(user_id, Some(draft.connection_id))
    .await
    .map_err(Error::store)?;

  info!(user_id, connection_id = draft.connection_id, "connection named");

  let mut replies = vec![Reply::text(format!(
    "✅ Connection '{title}' has been named successfully! Your connection ID is {}.",
    draft.connection_id
  ))];
  replies.extend(configure(state, sender).await?);
  Ok(replies)
}

// ─── configure ────────────────────────────────────────────────────────────────

/// Offer the user's groups as source candidates.
pub async fn configure<S: RelayStore>(state: &AppState<S>, sender: Sender) -> Result<Vec<Reply>> {
  let user_id = sender.user_id;
  if !steps::check(&*state.store, user_id, Stage::AwaitingConfiguration).await? {
    return Ok(wrong_stage());
  }

  let groups = state.store.list_groups(user_id).await.map_err(Error::store)?;
  if groups.is_empty() {
    return Ok(no_groups());
  }

  let outcome = steps::advance(
    &*state.store,
    user_id,
    Stage::AwaitingConfiguration,
    Stage::SelectingSourceGroup,
  )
  .await?;
  if let Some(replies) = outcome.failure_replies() {
    return Ok(replies);
  }

  Ok(vec![
    Reply::text("Please select the source group for your connection:")
      .with_keyboard(group_keyboard(&groups, Action::SourceGroup)),
  ])
}

// ─── source group ─────────────────────────────────────────────────────────────

pub async fn pick_source_group<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  group_id: GroupId,
) -> Result<Vec<Reply>> {
  let user_id = sender.user_id;
  if !steps::check(&*state.store, user_id, Stage::SelectingSourceGroup).await? {
    return Ok(wrong_stage());
  }
  let Some(draft) = draft_of(state, user_id).await? else {
    return Ok(no_draft());
  };

  let groups = state.store.list_groups(user_id).await.map_err(Error::store)?;
  if groups.is_empty() {
    return Ok(no_groups());
  }
  let Some(group) = groups.iter().find(|g| g.group_id == group_id) else {
    warn!(user_id, group_id, "source group not owned by user");
    return Ok(vec![Reply::text(INVALID_GROUP)]);
  };

  if !set_field(state, &draft, RouteField::SourceGroup(group_id)).await? {
    return Ok(no_draft());
  }
  let outcome = steps::advance(
    &*state.store,
    user_id,
    Stage::SelectingSourceGroup,
    Stage::SelectingSourceTopic,
  )
  .await?;
  if let Some(replies) = outcome.failure_replies() {
    return Ok(replies);
  }

  let topics = state.store.list_topics(group_id).await.map_err(Error::store)?;
  let mut replies = vec![Reply::text(format!(
    "✅ Group '{}' has been selected as the source group.",
    group.group_name
  ))];
  if topics.is_empty() {
    replies.push(Reply::text(
      "⚠️ No topics configured for this group. You can proceed by selecting 'No specific topic'.",
    ));
  }
  replies.push(
    Reply::text("Please select the source topic for your connection:")
      .with_keyboard(topic_keyboard(&topics, Action::SourceTopic)),
  );
  Ok(replies)
}

// ─── source topic ─────────────────────────────────────────────────────────────

pub async fn pick_source_topic<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  topic_id: Option<TopicId>,
) -> Result<Vec<Reply>> {
  let user_id = sender.user_id;
  if !steps::check(&*state.store, user_id, Stage::SelectingSourceTopic).await? {
    return Ok(wrong_stage());
  }
  let Some(draft) = draft_of(state, user_id).await? else {
    return Ok(no_draft());
  };
  let Some(source_group_id) = draft.source_group_id else {
    return Ok(no_draft());
  };

  if !topic_belongs(state, source_group_id, topic_id).await? {
    warn!(user_id, source_group_id, ?topic_id, "source topic not in group");
    return Ok(vec![Reply::text(INVALID_TOPIC)]);
  }

  if let Some(existing) = state
    .store
    .find_source_conflict(source_group_id, topic_id, draft.connection_id)
    .await
    .map_err(Error::store)?
  {
    debug!(
      user_id,
      source_group_id,
      existing = existing.connection_id,
      "source already relayed"
    );
    return Ok(vec![Reply::text(format!(
      "⚠️ Connection '{}' (ID {}) already relays from this source. Please select another topic.",
      existing.display_title(),
      existing.connection_id
    ))]);
  }

  let groups = state.store.list_groups(user_id).await.map_err(Error::store)?;
  if groups.is_empty() {
    return Ok(no_groups());
  }

  if !set_field(state, &draft, RouteField::SourceTopic(topic_id)).await? {
    return Ok(no_draft());
  }
  let outcome = steps::advance(
    &*state.store,
    user_id,
    Stage::SelectingSourceTopic,
    Stage::SelectingTargetGroup,
  )
  .await?;
  if let Some(replies) = outcome.failure_replies() {
    return Ok(replies);
  }

  let confirmation = match topic_id {
    Some(_) => "✅ Source topic has been successfully selected.",
    None => "✅ No source topic has been selected.",
  };
  Ok(vec![
    Reply::text(confirmation),
    Reply::text("Please select the target group for your connection:")
      .with_keyboard(group_keyboard(&groups, Action::TargetGroup)),
  ])
}

// ─── target group ─────────────────────────────────────────────────────────────

pub async fn pick_target_group<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  group_id: GroupId,
) -> Result<Vec<Reply>> {
  let user_id = sender.user_id;
  if !steps::check(&*state.store, user_id, Stage::SelectingTargetGroup).await? {
    return Ok(wrong_stage());
  }
  let Some(draft) = draft_of(state, user_id).await? else {
    return Ok(no_draft());
  };

  let groups = state.store.list_groups(user_id).await.map_err(Error::store)?;
  if groups.is_empty() {
    return Ok(no_groups());
  }
  let Some(group) = groups.iter().find(|g| g.group_id == group_id) else {
    warn!(user_id, group_id, "target group not owned by user");
    return Ok(vec![Reply::text(INVALID_GROUP)]);
  };

  if !set_field(state, &draft, RouteField::TargetGroup(group_id)).await? {
    return Ok(no_draft());
  }
  let outcome = steps::advance(
    &*state.store,
    user_id,
    Stage::SelectingTargetGroup,
    Stage::SelectingTargetTopic,
  )
  .await?;
  if let Some(replies) = outcome.failure_replies() {
    return Ok(replies);
  }

  let topics = state.store.list_topics(group_id).await.map_err(Error::store)?;
  Ok(vec![
    Reply::text(format!(
      "✅ Group '{}' has been selected as the target group.",
      group.group_name
    )),
    Reply::text("Please select the target topic for your connection:")
      .with_keyboard(topic_keyboard(&topics, Action::TargetTopic)),
  ])
}

// ─── target topic ─────────────────────────────────────────────────────────────

pub async fn pick_target_topic<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  topic_id: Option<TopicId>,
) -> Result<Vec<Reply>> {
  let user_id = sender.user_id;
  if !steps::check(&*state.store, user_id, Stage::SelectingTargetTopic).await? {
    return Ok(wrong_stage());
  }
  let Some(draft) = draft_of(state, user_id).await? else {
    return Ok(no_draft());
  };
  let Some(target_group_id) = draft.target_group_id else {
    return Ok(no_draft());
  };

  if !topic_belongs(state, target_group_id, topic_id).await? {
    warn!(user_id, target_group_id, ?topic_id, "target topic not in group");
    return Ok(vec![Reply::text(INVALID_TOPIC)]);
  }
  if draft.source_group_id == Some(target_group_id) && draft.source_topic_id == topic_id {
    return Ok(vec![Reply::text(SAME_AS_SOURCE)]);
  }

  if !set_field(state, &draft, RouteField::TargetTopic(topic_id)).await? {
    return Ok(no_draft());
  }
  let outcome = steps::advance(
    &*state.store,
    user_id,
    Stage::SelectingTargetTopic,
    Stage::Start,
  )
  .await?;
  if let Some(replies) = outcome.failure_replies() {
    return Ok(replies);
  }
  state
    .store
    .set_draft(user_id, None)
    .await
    .map_err(Error::store)?;

  info!(
    user_id,
    connection_id = draft.connection_id,
    source_group_id = ?draft.source_group_id,
    source_topic_id = ?draft.source_topic_id,
    target_group_id,
    target_topic_id = ?topic_id,
    "connection configured"
  );

  let confirmation = match topic_id {
    Some(_) => "✅ Target topic successfully selected.",
    None => "✅ No target topic has been selected.",
  };
  Ok(vec![
    Reply::text(confirmation),
    Reply::text(
      "🎉 Connection Configuration Complete! You can now create another connection or return \
       to the main menu.",
    )
    .with_keyboard(Keyboard::new(vec![vec![main_menu_button()]])),
  ])
}

// ─── helpers ──────────────────────────────────────────────────────────────────

/// Delete the user's in-progress draft if it never became routable.
pub(crate) async fn discard_abandoned<S: RelayStore>(
  state: &AppState<S>,
  user_id: UserId,
) -> Result<()> {
  if let Some(abandoned) = draft_of(state, user_id).await?
    && !abandoned.is_routable()
  {
    state
      .store
      .delete_connection(user_id, abandoned.connection_id)
      .await
      .map_err(Error::store)?;
    debug!(user_id, connection_id = abandoned.connection_id, "abandoned draft discarded");
  }
  Ok(())
}

async fn set_field<S: RelayStore>(
  state: &AppState<S>,
  draft: &Connection,
  field: RouteField,
) -> Result<bool> {
  state
    .store
    .set_route_field(draft.connection_id, field)
    .await
    .map_err(Error::store)
}

/// `None` ("no specific topic") belongs to every group.
async fn topic_belongs<S: RelayStore>(
  state: &AppState<S>,
  group_id: GroupId,
  topic_id: Option<TopicId>,
) -> Result<bool> {
  let Some(topic_id) = topic_id else {
    return Ok(true);
  };
  let topics = state.store.list_topics(group_id).await.map_err(Error::store)?;
  Ok(topics.iter().any(|t| t.topic_id == topic_id))
}
