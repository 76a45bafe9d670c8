//! Slash-command handlers: `/start`, `/init_group`, `/init_topic`,
//! `/set_topic_name`, `/help` and `/remove_connection`.

use fwed_core::{
  model::{ChatId, ConnectionId, TopicId, TopicRename, UserId},
  store::RelayStore,
};
use tracing::{info, warn};

use super::{connection, menu};
use crate::{
  AppState, Sender,
  error::{Error, Result},
  reply::Reply,
  steps,
};

pub const TOPIC_ONLY: &str = "❌ This command is only functional within a topic-enabled group.";
pub const TOPIC_ID_NOT_NUMERIC: &str = "❌ The topic ID must be a numeric value.";
pub const SET_TOPIC_NAME_USAGE: &str =
  "❌ Invalid command format. Please use:\n/set_topic_name <topic_id> <Topic Name>";
pub const REMOVE_CONNECTION_USAGE: &str = "Usage: /remove_connection <connection_id>";
pub const GROUP_OWNED_ELSEWHERE: &str = "⚠️ This group is already linked to another account.";

pub const HELP: &str = "Here are some commands you can use:\n\
  Use /start to Start the bot\n\
  Use /init_group in a group to Initialise it for your account\n\
  Use /init_topic in a topic-enabled group to Initialise it for your account\n\
  Use /set_topic_name <topic_id> <Topic Name> to name a registered topic\n\
  Use /remove_connection <connection_id> to delete one of your connections\n\
  If you need more help setting up, please contact support";

/// The kind of chat a command arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatScope {
  Private,
  /// A group or supergroup.
  Group,
  Channel,
}

/// Where a command came from.
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
  pub user_id:  UserId,
  pub chat_id:  ChatId,
  pub scope:    ChatScope,
  pub title:    Option<&'a str>,
  /// The forum topic the command was sent in.
  pub topic_id: Option<TopicId>,
}

impl Origin<'_> {
  pub fn sender(&self) -> Sender { Sender { user_id: self.user_id, chat_id: self.chat_id } }
}

// ─── /start ───────────────────────────────────────────────────────────────────

/// Reset the wizard and show the main menu. In a group the menu is not
/// shown; the user is pointed at the private chat instead.
pub async fn start<S: RelayStore>(state: &AppState<S>, origin: Origin<'_>) -> Result<Vec<Reply>> {
  if origin.scope != ChatScope::Private {
    return Ok(vec![Reply::text(
      "👋 Message me privately to manage your connections. Use /init_group here to link this \
       group to your account.",
    )]);
  }
  connection::discard_abandoned(state, origin.user_id).await?;
  steps::reset(&*state.store, origin.sender()).await?;
  Ok(vec![menu::main_menu()])
}

// ─── /init_group ──────────────────────────────────────────────────────────────

pub async fn init_group<S: RelayStore>(
  state: &AppState<S>,
  origin: Origin<'_>,
) -> Result<Vec<Reply>> {
  if origin.scope != ChatScope::Group {
    return Ok(vec![Reply::text(
      "Hi! Use /init_group in a group to initialize it for your account.",
    )]);
  }

  let title = origin.title.unwrap_or("Unnamed Group");
  let group = state
    .store
    .upsert_group(origin.user_id, origin.chat_id, title.to_string())
    .await
    .map_err(Error::store)?;

  if group.user_id != origin.user_id {
    warn!(
      user_id = origin.user_id,
      group_id = group.group_id,
      owner = group.user_id,
      "group registration refused"
    );
    return Ok(vec![Reply::text(GROUP_OWNED_ELSEWHERE)]);
  }

  info!(user_id = origin.user_id, group_id = group.group_id, "group registered");
  Ok(vec![Reply::text(format!(
    "👋 Thanks for adding me to '{}'!\nThis group (and its topics, if any) is now linked to your \
     account.",
    group.group_name
  ))])
}

// ─── /init_topic ──────────────────────────────────────────────────────────────

pub async fn init_topic<S: RelayStore>(
  state: &AppState<S>,
  origin: Origin<'_>,
) -> Result<Vec<Reply>> {
  let (ChatScope::Group, Some(topic_id)) = (origin.scope, origin.topic_id) else {
    return Ok(vec![Reply::text(TOPIC_ONLY)]);
  };

  let group = state
    .store
    .get_group(origin.chat_id)
    .await
    .map_err(Error::store)?;
  match group {
    None => {
      return Ok(vec![Reply::text(
        "⚠️ This group is not registered yet. Please run /init_group first.",
      )]);
    }
    Some(g) if g.user_id != origin.user_id => {
      return Ok(vec![Reply::text(GROUP_OWNED_ELSEWHERE)]);
    }
    Some(_) => {}
  }

  let added = state
    .store
    .add_topic(origin.chat_id, topic_id)
    .await
    .map_err(Error::store)?;
  if !added {
    return Ok(vec![Reply::text(format!(
      "ℹ️ Topic (ID: {topic_id}) is already registered."
    ))]);
  }

  info!(user_id = origin.user_id, group_id = origin.chat_id, topic_id, "topic registered");
  Ok(vec![Reply::text(format!(
    "✅ Topic (ID: {topic_id}) has been added to the group tracking list.\n\nPlease set a name \
     for this topic by replying with:\n/set_topic_name {topic_id} <Topic Name>"
  ))])
}

// ─── /set_topic_name ──────────────────────────────────────────────────────────

pub async fn set_topic_name<S: RelayStore>(
  state: &AppState<S>,
  origin: Origin<'_>,
  args: &str,
) -> Result<Vec<Reply>> {
  let mut words = args.split_whitespace();
  let (Some(raw_id), Some(_)) = (words.next(), words.clone().next()) else {
    return Ok(vec![Reply::text(SET_TOPIC_NAME_USAGE)]);
  };
  let Ok(topic_id) = raw_id.parse::<TopicId>() else {
    return Ok(vec![Reply::text(TOPIC_ID_NOT_NUMERIC)]);
  };
  let topic_name = words.collect::<Vec<_>>().join(" ");

  let scope = (origin.scope == ChatScope::Group).then_some(origin.chat_id);
  let outcome = state
    .store
    .rename_topic(origin.user_id, scope, topic_id, topic_name.clone())
    .await
    .map_err(Error::store)?;

  Ok(vec![Reply::text(match outcome {
    TopicRename::Renamed(0) => format!("❌ No topic with ID {topic_id} was found in your groups."),
    TopicRename::Renamed(_) => {
      info!(user_id = origin.user_id, topic_id, "topic renamed");
      format!("✅ Topic ID {topic_id} has been renamed to '{topic_name}'.")
    }
    TopicRename::NameTaken => {
      format!("❌ A topic named '{topic_name}' already exists in this group.")
    }
  })])
}

// ─── /help ────────────────────────────────────────────────────────────────────

pub fn help() -> Vec<Reply> { vec![Reply::text(HELP)] }

// ─── /remove_connection ───────────────────────────────────────────────────────

pub async fn remove_connection<S: RelayStore>(
  state: &AppState<S>,
  origin: Origin<'_>,
  args: &str,
) -> Result<Vec<Reply>> {
  let Some(raw_id) = args.split_whitespace().next() else {
    return Ok(vec![Reply::text(REMOVE_CONNECTION_USAGE)]);
  };
  let Ok(connection_id) = raw_id.parse::<ConnectionId>() else {
    return Ok(vec![Reply::text(
      "Invalid connection_id. Please provide an integer value.",
    )]);
  };

  let deleted = state
    .store
    .delete_connection(origin.user_id, connection_id)
    .await
    .map_err(Error::store)?;

  if deleted == 0 {
    return Ok(vec![Reply::text(format!(
      "No connection found with connection_id {connection_id}."
    ))]);
  }
  info!(user_id = origin.user_id, connection_id, "connection removed");
  Ok(vec![Reply::text(format!(
    "Successfully deleted connection with connection_id {connection_id}."
  ))])
}
