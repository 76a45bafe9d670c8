//! Telegram transport: a teloxide long-polling `Dispatcher` wired to the
//! handlers.
//!
//! Commands, text messages and callback queries each get their own branch.
//! Handler errors never escape an endpoint: they are logged and the user gets
//! the generic failure reply. Relays are posted from a detached task so a
//! slow target chat never holds up the source chat's queue.

use fwed_core::{
  action::Action,
  model::{GroupId, TopicId},
  store::RelayStore,
};
use teloxide::{
  RequestError,
  dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler},
  prelude::*,
  types::{Chat, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode, ThreadId},
  utils::command::BotCommands,
};
use tracing::{debug, error, info, warn};

use crate::{
  AppState, Sender,
  error::Error,
  handlers::{
    self, GENERIC_FAILURE,
    commands::{self, ChatScope, Origin},
    menu,
    relay::{self, Relay},
  },
  reply::{Keyboard, Reply, TextFormat},
};

// ─── Commands ─────────────────────────────────────────────────────────────────

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "These commands are supported:")]
pub enum Command {
  #[command(description = "open the main menu.")]
  Start,
  #[command(description = "link this group to your account.")]
  InitGroup,
  #[command(description = "register the current forum topic.")]
  InitTopic,
  #[command(description = "name a registered topic: <topic_id> <name>.")]
  SetTopicName(String),
  #[command(description = "show usage.")]
  Help,
  #[command(description = "delete one of your connections: <connection_id>.")]
  RemoveConnection(String),
}

// ─── Dispatcher ───────────────────────────────────────────────────────────────

/// Poll for updates until Ctrl-C.
pub async fn run<S>(state: AppState<S>)
where
  S: RelayStore + Clone + 'static,
{
  let bot = Bot::new(state.config.bot_token.clone());

  if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
    warn!(error = %e, "failed to register bot commands");
  }

  info!("fwedbot polling for updates");
  Dispatcher::builder(bot, schema::<S>())
    .dependencies(dptree::deps![state])
    .default_handler(|_| async {})
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

/// The update routing tree.
pub fn schema<S>() -> UpdateHandler<RequestError>
where
  S: RelayStore + Clone + 'static,
{
  let commands = Update::filter_message()
    .filter_command::<Command>()
    .endpoint(on_command::<S>);
  let messages = Update::filter_message().endpoint(on_message::<S>);
  let callbacks = Update::filter_callback_query().endpoint(on_callback::<S>);

  dptree::entry()
    .branch(commands)
    .branch(messages)
    .branch(callbacks)
}

// ─── Endpoints ────────────────────────────────────────────────────────────────

async fn on_command<S>(
  bot: Bot,
  state: AppState<S>,
  msg: Message,
  cmd: Command,
) -> ResponseResult<()>
where
  S: RelayStore + Clone + 'static,
{
  let Some(user) = msg.from.as_ref() else {
    return Ok(());
  };
  let origin = Origin {
    user_id:  user.id.0 as i64,
    chat_id:  msg.chat.id.0,
    scope:    chat_scope(&msg.chat),
    title:    msg.chat.title(),
    topic_id: topic_of(&msg),
  };
  info!(user_id = origin.user_id, chat_id = origin.chat_id, command = ?cmd, "command received");

  let result = match cmd {
    Command::Start => commands::start(&state, origin).await,
    Command::InitGroup => commands::init_group(&state, origin).await,
    Command::InitTopic => commands::init_topic(&state, origin).await,
    Command::SetTopicName(args) => commands::set_topic_name(&state, origin, &args).await,
    Command::Help => Ok(commands::help()),
    Command::RemoveConnection(args) => commands::remove_connection(&state, origin, &args).await,
  };

  let thread = origin.topic_id.map(thread_id);
  deliver(&bot, msg.chat.id, thread, result).await;
  Ok(())
}

/// What a plain (non-command) text message is for.
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound<'a> {
  /// Group text: scanned for addresses, whatever the sender's wizard stage.
  Scan { group_id: GroupId, topic_id: Option<TopicId>, text: &'a str },
  /// Private text: input to the sender's current wizard step.
  Wizard { sender: Sender, text: &'a str },
  Ignore,
}

pub fn classify(msg: &Message) -> Inbound<'_> {
  let Some(text) = msg.text() else {
    return Inbound::Ignore;
  };

  match chat_scope(&msg.chat) {
    ChatScope::Group => Inbound::Scan { group_id: msg.chat.id.0, topic_id: topic_of(msg), text },
    // Unknown commands are not wizard input.
    ChatScope::Private if text.starts_with('/') => Inbound::Ignore,
    ChatScope::Private => match msg.from.as_ref() {
      Some(user) => Inbound::Wizard {
        sender: Sender { user_id: user.id.0 as i64, chat_id: msg.chat.id.0 },
        text,
      },
      None => Inbound::Ignore,
    },
    ChatScope::Channel => Inbound::Ignore,
  }
}

async fn on_message<S>(bot: Bot, state: AppState<S>, msg: Message) -> ResponseResult<()>
where
  S: RelayStore + Clone + 'static,
{
  match classify(&msg) {
    Inbound::Scan { group_id, topic_id, text } => {
      relay_message(&bot, &state, group_id, topic_id, text).await;
    }
    Inbound::Wizard { sender, text } => {
      let result = handlers::private_text(&state, sender, text).await;
      deliver(&bot, msg.chat.id, None, result).await;
    }
    Inbound::Ignore => {}
  }
  Ok(())
}

async fn on_callback<S>(bot: Bot, state: AppState<S>, q: CallbackQuery) -> ResponseResult<()>
where
  S: RelayStore + Clone + 'static,
{
  if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
    warn!(error = %e, "failed to answer callback query");
  }
  let Some(data) = q.data.as_deref() else {
    return Ok(());
  };

  let user_id = q.from.id.0 as i64;
  let chat_id = q
    .message
    .as_ref()
    .map(|m| m.chat().id)
    .unwrap_or(ChatId(user_id));
  let action = Action::parse(data);
  debug!(user_id, action = %action, "button pressed");

  let sender = Sender { user_id, chat_id: chat_id.0 };
  let result = menu::handle_action(&state, sender, action).await;
  deliver(&bot, chat_id, None, result).await;
  Ok(())
}

// ─── Relay ────────────────────────────────────────────────────────────────────

async fn relay_message<S>(
  bot: &Bot,
  state: &AppState<S>,
  group_id: GroupId,
  topic_id: Option<TopicId>,
  text: &str,
) where
  S: RelayStore + Clone + 'static,
{
  match relay::scan(state, group_id, topic_id, text).await {
    Ok(Some(relay)) => {
      tokio::spawn(post_relay(bot.clone(), relay));
    }
    Ok(None) => {}
    Err(e) => error!(group_id, error = %e, "relay lookup failed"),
  }
}

async fn post_relay(bot: Bot, relay: Relay) {
  let target = ChatId(relay.target_group_id);
  let thread = relay.target_topic_id.map(thread_id);
  match send_reply(&bot, target, thread, Reply::markdown(relay.text)).await {
    Ok(_) => debug!(connection_id = relay.connection_id, "relay delivered"),
    Err(e) => error!(
      connection_id = relay.connection_id,
      target_group_id = relay.target_group_id,
      target_topic_id = ?relay.target_topic_id,
      error = %e,
      "relay delivery failed"
    ),
  }
}

// ─── Rendering ────────────────────────────────────────────────────────────────

/// Send a handler's replies, or the generic failure notice if it failed.
async fn deliver(
  bot: &Bot,
  chat_id: ChatId,
  thread: Option<ThreadId>,
  result: Result<Vec<Reply>, Error>,
) {
  let replies = match result {
    Ok(replies) => replies,
    Err(e) => {
      error!(chat_id = chat_id.0, error = %e, "handler failed");
      vec![Reply::text(GENERIC_FAILURE)]
    }
  };

  for reply in replies {
    if let Err(e) = send_reply(bot, chat_id, thread, reply).await {
      error!(chat_id = chat_id.0, error = %e, "failed to send reply");
    }
  }
}

async fn send_reply(
  bot: &Bot,
  chat_id: ChatId,
  thread: Option<ThreadId>,
  reply: Reply,
) -> ResponseResult<Message> {
  let mut request = bot.send_message(chat_id, reply.text);
  if let Some(thread) = thread {
    request = request.message_thread_id(thread);
  }
  if reply.format == TextFormat::MarkdownV2 {
    request = request.parse_mode(ParseMode::MarkdownV2);
  }
  if let Some(keyboard) = &reply.keyboard {
    request = request.reply_markup(render_keyboard(keyboard));
  }
  request.await
}

pub fn render_keyboard(keyboard: &Keyboard) -> InlineKeyboardMarkup {
  InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
    row
      .iter()
      .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.action.to_string()))
      .collect::<Vec<_>>()
  }))
}

// ─── Message inspection ───────────────────────────────────────────────────────

pub fn chat_scope(chat: &Chat) -> ChatScope {
  if chat.is_private() {
    ChatScope::Private
  } else if chat.is_group() || chat.is_supergroup() {
    ChatScope::Group
  } else {
    ChatScope::Channel
  }
}

/// The forum topic a message was posted in. Reply threads in groups without
/// topics carry a thread id too; those are not topics.
pub fn topic_of(msg: &Message) -> Option<TopicId> {
  if !msg.is_topic_message {
    return None;
  }
  msg.thread_id.map(|ThreadId(MessageId(id))| id)
}

fn thread_id(topic_id: TopicId) -> ThreadId { ThreadId(MessageId(topic_id)) }
