//! Interaction handlers.
//!
//! Each handler returns the replies to send back to the user. An `Err` means
//! a storage failure; the adapter logs it and sends [`GENERIC_FAILURE`].

pub mod commands;
pub mod connection;
pub mod menu;
pub mod relay;

use fwed_core::{
  action::Action,
  model::{Connection, Group, GroupId, Topic, TopicId, UserId},
  stage::Stage,
  store::RelayStore,
};
use tracing::debug;

use crate::{
  AppState, Sender,
  error::{Error, Result},
  reply::{Button, Keyboard, Reply},
  steps,
};

pub const GENERIC_FAILURE: &str = "❌ An error occurred. Please try again later.";
pub const NO_GROUPS: &str = "⚠️ You have not added any groups to the bot yet. Please add fwedbot \
                             to the groups you want to configure.";
pub const NO_SPECIFIC_TOPIC: &str = "No specific topic";

/// Route free text from a private chat to the wizard step waiting for it.
///
/// Text arriving in any other stage is ignored without a reply.
pub async fn private_text<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  text: &str,
) -> Result<Vec<Reply>> {
  match steps::current(&*state.store, sender.user_id).await? {
    Some(Stage::AddingConnection) => connection::name(state, sender, text).await,
    Some(Stage::AwaitingConfiguration) => connection::configure(state, sender).await,
    stage => {
      debug!(user_id = sender.user_id, ?stage, "private text outside a text stage");
      Ok(Vec::new())
    }
  }
}

// ─── Shared lookups ───────────────────────────────────────────────────────────

/// The connection the user's wizard is building, if it still exists.
pub(crate) async fn draft_of<S: RelayStore>(
  state: &AppState<S>,
  user_id: UserId,
) -> Result<Option<Connection>> {
  let user = state.store.get_user(user_id).await.map_err(Error::store)?;
  let Some(draft_id) = user.and_then(|u| u.draft_connection_id) else {
    return Ok(None);
  };
  let draft = state
    .store
    .get_connection(draft_id)
    .await
    .map_err(Error::store)?;
  Ok(draft.filter(|c| c.user_id == user_id))
}

// ─── Keyboards ────────────────────────────────────────────────────────────────

pub(crate) fn group_keyboard(groups: &[Group], pick: fn(GroupId) -> Action) -> Keyboard {
  Keyboard::column(
    groups
      .iter()
      .map(|g| Button::new(g.group_name.clone(), pick(g.group_id))),
  )
}

/// Topics of a group plus the trailing "No specific topic" choice.
pub(crate) fn topic_keyboard(topics: &[Topic], pick: fn(Option<TopicId>) -> Action) -> Keyboard {
  Keyboard::column(
    topics
      .iter()
      .map(|t| Button::new(t.topic_name.clone(), pick(Some(t.topic_id))))
      .chain(std::iter::once(Button::new(NO_SPECIFIC_TOPIC, pick(None)))),
  )
}
