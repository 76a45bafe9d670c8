//! Group-text scanning: detect addresses, find the route, format the alert.

use fwed_core::{
  alert::format_alert,
  detect::detect,
  model::{ConnectionId, GroupId, TopicId},
  store::RelayStore,
};
use tracing::{debug, info};

use crate::{
  AppState,
  error::{Error, Result},
};

/// An alert ready to be posted to a connection's target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
  pub connection_id:   ConnectionId,
  pub target_group_id: GroupId,
  pub target_topic_id: Option<TopicId>,
  /// MarkdownV2 body.
  pub text:            String,
}

/// Scan a group message. `None` when there is nothing to send.
pub async fn scan<S: RelayStore>(
  state: &AppState<S>,
  source_group_id: GroupId,
  source_topic_id: Option<TopicId>,
  text: &str,
) -> Result<Option<Relay>> {
  let addresses = detect(text);
  if addresses.is_empty() {
    return Ok(None);
  }

  let route = state
    .store
    .find_route(source_group_id, source_topic_id)
    .await
    .map_err(Error::store)?;
  let Some(connection) = route else {
    debug!(
      source_group_id,
      ?source_topic_id,
      count = addresses.len(),
      "addresses found but no configured destination"
    );
    return Ok(None);
  };
  let Some(target_group_id) = connection.target_group_id else {
    return Ok(None);
  };

  let Some(text) = format_alert(
    &addresses,
    connection.title.as_deref(),
    &state.config.link_template,
  ) else {
    return Ok(None);
  };

  info!(
    connection_id = connection.connection_id,
    source_group_id,
    target_group_id,
    count = addresses.len(),
    "relaying addresses"
  );
  Ok(Some(Relay {
    connection_id: connection.connection_id,
    target_group_id,
    target_topic_id: connection.target_topic_id,
    text,
  }))
}
