//! The main menu and its button actions.

use std::collections::HashMap;

use fwed_core::{
  action::Action,
  model::{Connection, ConnectionId, GroupId, TopicId},
  store::RelayStore,
};
use tracing::{info, warn};

use super::connection;
use crate::{
  AppState, Sender,
  error::{Error, Result},
  reply::{Button, Keyboard, Reply},
  steps,
};

pub const FOOTER: &str = "\n\n\n🤖 Powered by fwedbot | Support the Team | Trade on Trojan, Nova, \
                          or MevX\n\
                          Trojan Bot | (https://t.me/solana_trojanbot?start=r-kxngkxnquest)\n\
                          Nova Bot | (https://t.me/TradeonNovaBot?start=r-CE0V7EW)\n\
                          MevX Bot | (https://t.me/Mevx?start=kxngkxnquest)";

pub const WELCOME: &str = "👋 Welcome to fwedbot!\n\n\
                           This bot tracks the activity of coin address' sent in Alpha Chats, and \
                           reflects them in to your desired group.\n\n\
                           🚀 Use the buttons below to get started!";

pub const UNRECOGNIZED: &str =
  "❌ Unrecognized action.\nPlease use the buttons to navigate or return to the main menu.";

const SUPPORT: &str = "Thanks for supporting Fwedbot! 💖\n\n\
  If you would like to support the team, and the project, you can do so by using our trading \
  referral links for the top bots on Solana. You can also:\n\n\
  - Check out some of @TheKxngAE 's posts on twitter.\n\n\
  - Share Fwedbot with friends 🌐\n\n\
  - Suggest features or report bugs 🐞\n\n\
  - Use our referral codes 💹\n\n\
  Explore:\n\
  Trade on Nova Bot | https://t.me/TradeonNovaBot?start=r-CE0V7EW\n\
  Trade on Trojan Bot | https://t.me/solana_trojanbot?start=r-kxngkxnquest\n\
  Trade on MevX Bot | https://t.me/Mevx?start=kxngkxnquest\n\n\
  🚀 Join our group: https://t.me/thekxngsquarters";

/// Welcome text, footer and the six menu buttons.
pub fn main_menu() -> Reply {
  Reply::text(format!("{WELCOME}{FOOTER}"))
    .with_keyboard(Keyboard::new(vec![
      vec![
        Button::new("➕ Add Connection", Action::AddConnection),
        Button::new("❌ Remove Connection", Action::RemoveConnection),
      ],
      vec![
        Button::new("👀 View Connections", Action::ViewConnections),
        Button::new("🔄 Toggle Connections", Action::ToggleConnections),
      ],
      vec![
        Button::new("⚙️ Config Settings", Action::ConfigSettings),
        Button::new("💖 Support Fwedbot", Action::SupportFwedbot),
      ],
    ]))
}

/// Dispatch a button press.
pub async fn handle_action<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  action: Action,
) -> Result<Vec<Reply>> {
  match action {
    Action::AddConnection => connection::begin(state, sender).await,
    Action::ViewConnections => view_connections(state, sender).await,
    Action::RemoveConnection => remove_connection(state, sender).await,
    Action::ToggleConnections => toggle_connections(state, sender).await,
    Action::ToggleConnection(id) => toggle_connection(state, sender, id).await,
    Action::ConfigSettings => Ok(vec![
      Reply::text("🛠 Currently, editing settings is under development.\nStay tuned for updates!")
        .with_main_menu(),
    ]),
    Action::SupportFwedbot => Ok(vec![Reply::text(SUPPORT).with_main_menu()]),
    Action::MainMenu | Action::BackToMain => {
      connection::discard_abandoned(state, sender.user_id).await?;
      steps::reset(&*state.store, sender).await?;
      Ok(vec![main_menu()])
    }
    Action::SourceGroup(id) => connection::pick_source_group(state, sender, id).await,
    Action::SourceTopic(id) => connection::pick_source_topic(state, sender, id).await,
    Action::TargetGroup(id) => connection::pick_target_group(state, sender, id).await,
    Action::TargetTopic(id) => connection::pick_target_topic(state, sender, id).await,
    Action::Unrecognized(raw) => {
      warn!(user_id = sender.user_id, data = %raw, "unrecognized action");
      Ok(vec![Reply::text(UNRECOGNIZED).with_main_menu()])
    }
  }
}

// ─── Connection listings ──────────────────────────────────────────────────────

async fn view_connections<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
) -> Result<Vec<Reply>> {
  let connections = list(state, sender).await?;
  if connections.is_empty() {
    return Ok(vec![no_connections()]);
  }

  let names = group_names(state, sender).await?;
  let lines: Vec<_> = connections.iter().map(|c| describe(c, &names)).collect();
  Ok(vec![
    Reply::text(format!("👀 Your connections:\n\n{}", lines.join("\n\n"))).with_main_menu(),
  ])
}

async fn remove_connection<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
) -> Result<Vec<Reply>> {
  let connections = list(state, sender).await?;
  if connections.is_empty() {
    return Ok(vec![no_connections()]);
  }

  let lines: Vec<_> = connections
    .iter()
    .map(|c| format!("#{} {}", c.connection_id, c.display_title()))
    .collect();
  Ok(vec![
    Reply::text(format!(
      "❌ To remove a connection, send:\n/remove_connection <connection_id>\n\n{}",
      lines.join("\n")
    ))
    .with_main_menu(),
  ])
}

async fn toggle_connections<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
) -> Result<Vec<Reply>> {
  let connections = list(state, sender).await?;
  if connections.is_empty() {
    return Ok(vec![no_connections()]);
  }
  Ok(vec![
    Reply::text("📡 Tap a connection to pause or resume it:")
      .with_keyboard(toggle_keyboard(&connections))
      .with_main_menu(),
  ])
}

/// Flip `is_active` on one of the sender's connections.
async fn toggle_connection<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
  connection_id: ConnectionId,
) -> Result<Vec<Reply>> {
  let connection = state
    .store
    .get_connection(connection_id)
    .await
    .map_err(Error::store)?
    .filter(|c| c.user_id == sender.user_id);
  let Some(connection) = connection else {
    return Ok(vec![Reply::text("❌ Connection not found.").with_main_menu()]);
  };

  let activate = !connection.is_active;
  if activate && let Some(source_group_id) = connection.source_group_id {
    let conflict = state
      .store
      .find_source_conflict(source_group_id, connection.source_topic_id, connection_id)
      .await
      .map_err(Error::store)?;
    if let Some(other) = conflict {
      return Ok(vec![
        Reply::text(format!(
          "⚠️ Cannot resume '{}': connection '{}' (ID {}) already relays from the same source.",
          connection.display_title(),
          other.display_title(),
          other.connection_id
        ))
        .with_main_menu(),
      ]);
    }
  }

  state
    .store
    .set_connection_active(sender.user_id, connection_id, activate)
    .await
    .map_err(Error::store)?;
  info!(user_id = sender.user_id, connection_id, active = activate, "connection toggled");

  let connections = list(state, sender).await?;
  let verb = if activate { "resumed" } else { "paused" };
  Ok(vec![
    Reply::text(format!("🔄 Connection '{}' is now {verb}.", connection.display_title()))
      .with_keyboard(toggle_keyboard(&connections))
      .with_main_menu(),
  ])
}

// ─── helpers ──────────────────────────────────────────────────────────────────

async fn list<S: RelayStore>(state: &AppState<S>, sender: Sender) -> Result<Vec<Connection>> {
  state
    .store
    .list_connections(sender.user_id)
    .await
    .map_err(Error::store)
}

async fn group_names<S: RelayStore>(
  state: &AppState<S>,
  sender: Sender,
) -> Result<HashMap<GroupId, String>> {
  let groups = state
    .store
    .list_groups(sender.user_id)
    .await
    .map_err(Error::store)?;
  Ok(groups.into_iter().map(|g| (g.group_id, g.group_name)).collect())
}

fn no_connections() -> Reply {
  Reply::text("📭 You have no connections yet. Use ➕ Add Connection to create one.")
    .with_main_menu()
}

fn toggle_keyboard(connections: &[Connection]) -> Keyboard {
  Keyboard::column(connections.iter().map(|c| {
    let mark = if c.is_active { "🟢" } else { "⏸" };
    Button::new(
      format!("{mark} #{} {}", c.connection_id, c.display_title()),
      Action::ToggleConnection(c.connection_id),
    )
  }))
}

/// One listing entry: id, title, route and state.
fn describe(c: &Connection, names: &HashMap<GroupId, String>) -> String {
  let status = if !c.is_routable() && c.is_active {
    "📝 incomplete"
  } else if c.is_active {
    "🟢 active"
  } else {
    "⏸ paused"
  };
  format!(
    "#{} {} ({status})\n{} → {}",
    c.connection_id,
    c.display_title(),
    endpoint(c.source_group_id, c.source_topic_id, "any topic", names),
    endpoint(c.target_group_id, c.target_topic_id, "general", names),
  )
}

fn endpoint(
  group_id: Option<GroupId>,
  topic_id: Option<TopicId>,
  no_topic: &str,
  names: &HashMap<GroupId, String>,
) -> String {
  let Some(group_id) = group_id else {
    return "not set".to_string();
  };
  let group = names
    .get(&group_id)
    .cloned()
    .unwrap_or_else(|| group_id.to_string());
  match topic_id {
    Some(t) => format!("{group} / topic {t}"),
    None => format!("{group} / {no_topic}"),
  }
}

#[cfg(test)]
mod tests {
  use fwed_core::{model::RouteField, store::RelayStore as _};

  use super::*;
  use crate::tests::{GROUP_A, GROUP_B, ME, OTHER, app, sender};

  #[test]
  fn main_menu_carries_footer_and_six_buttons() {
    let menu = main_menu();
    assert!(menu.text.starts_with(WELCOME));
    assert!(menu.text.ends_with(FOOTER));
    assert_eq!(menu.keyboard.unwrap().actions().count(), 6);
  }

  #[tokio::test]
  async fn unrecognized_action_offers_main_menu() {
    let state = app().await;
    let replies = handle_action(&state, sender(ME), Action::parse("bogus_thing"))
      .await
      .unwrap();
    assert_eq!(replies[0].text, UNRECOGNIZED);
    assert_eq!(
      replies[0].keyboard.as_ref().unwrap().actions().last(),
      Some(&Action::MainMenu)
    );
  }

  #[tokio::test]
  async fn view_lists_routes_with_group_names() {
    let state = app().await;
    state.store.upsert_group(ME, GROUP_A, "Alpha".into()).await.unwrap();
    state.store.upsert_group(ME, GROUP_B, "Beta".into()).await.unwrap();
    let c = state.store.create_draft(ME, "feed".into()).await.unwrap();
    for field in [
      RouteField::SourceGroup(GROUP_A),
      RouteField::SourceTopic(Some(5)),
      RouteField::TargetGroup(GROUP_B),
    ] {
      state.store.set_route_field(c.connection_id, field).await.unwrap();
    }

    let replies = handle_action(&state, sender(ME), Action::ViewConnections)
      .await
      .unwrap();
    let text = &replies[0].text;
    assert!(text.contains(&format!("#{} feed (🟢 active)", c.connection_id)));
    assert!(text.contains("Alpha / topic 5 → Beta / general"));

    let replies = handle_action(&state, sender(OTHER), Action::ViewConnections)
      .await
      .unwrap();
    assert!(replies[0].text.contains("no connections yet"));
  }

  #[tokio::test]
  async fn toggle_pauses_and_resumes_own_connection() {
    let state = app().await;
    let c = state.store.create_draft(ME, "feed".into()).await.unwrap();
    let id = c.connection_id;

    let replies = handle_action(&state, sender(OTHER), Action::ToggleConnection(id))
      .await
      .unwrap();
    assert!(replies[0].text.contains("not found"));
    assert!(state.store.get_connection(id).await.unwrap().unwrap().is_active);

    let replies = handle_action(&state, sender(ME), Action::ToggleConnection(id))
      .await
      .unwrap();
    assert!(replies[0].text.ends_with("is now paused."));
    assert!(!state.store.get_connection(id).await.unwrap().unwrap().is_active);

    handle_action(&state, sender(ME), Action::ToggleConnection(id))
      .await
      .unwrap();
    assert!(state.store.get_connection(id).await.unwrap().unwrap().is_active);
  }

  #[tokio::test]
  async fn resuming_into_an_owned_source_is_refused() {
    let state = app().await;
    let mut ids = Vec::new();
    for title in ["first", "second"] {
      let c = state.store.create_draft(ME, title.into()).await.unwrap();
      state
        .store
        .set_route_field(c.connection_id, RouteField::SourceGroup(GROUP_A))
        .await
        .unwrap();
      state
        .store
        .set_route_field(c.connection_id, RouteField::TargetGroup(GROUP_B))
        .await
        .unwrap();
      ids.push(c.connection_id);
    }
    state.store.set_connection_active(ME, ids[1], false).await.unwrap();

    let replies = handle_action(&state, sender(ME), Action::ToggleConnection(ids[1]))
      .await
      .unwrap();
    assert!(replies[0].text.starts_with("⚠️ Cannot resume 'second'"));
    assert!(!state.store.get_connection(ids[1]).await.unwrap().unwrap().is_active);
  }

  #[tokio::test]
  async fn main_menu_button_resets_the_wizard() {
    let state = app().await;
    steps::restart(&*state.store, sender(ME)).await.unwrap();
    handle_action(&state, sender(ME), Action::MainMenu).await.unwrap();
    assert_eq!(
      steps::current(&*state.store, ME).await.unwrap(),
      Some(fwed_core::stage::Stage::Start)
    );
  }
}
