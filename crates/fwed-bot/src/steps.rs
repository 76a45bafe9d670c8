//! The step gate: reads and compare-and-swap writes of a user's wizard stage.
//!
//! Every wizard handler calls [`check`] before touching anything and
//! [`advance`] once its side effect is persisted. Of two interactions racing
//! on the same stage exactly one sees [`Advance::Advanced`].

use fwed_core::{model::UserId, stage::Stage, store::RelayStore};
use tracing::{debug, warn};

use crate::{
  Sender,
  error::{Error, Result},
  reply::Reply,
};

pub const WRONG_STAGE: &str =
  "❌ Unexpected input. It seems you're not in the correct stage. Restarting the workflow.";
pub const PROGRESS_FAILED: &str = "⚠️ Failed to update your progress. Please try again.";

/// Outcome of a stage transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
  Advanced,
  /// The stored stage was no longer the expected one.
  Lost,
  /// The write matched but the re-read shows another stage.
  Unverified,
}

impl Advance {
  /// What to tell the user when the transition did not happen.
  pub fn failure_replies(self) -> Option<Vec<Reply>> {
    match self {
      Advance::Advanced => None,
      Advance::Lost => Some(vec![Reply::text(WRONG_STAGE)]),
      Advance::Unverified => Some(vec![Reply::text(PROGRESS_FAILED)]),
    }
  }
}

/// The persisted stage, or `None` for a user who never interacted.
pub async fn current<S: RelayStore>(store: &S, user_id: UserId) -> Result<Option<Stage>> {
  let state = store.get_user(user_id).await.map_err(Error::store)?;
  Ok(state.map(|s| s.current_step))
}

/// Whether the user is at `expected`. Unknown users match nothing.
pub async fn check<S: RelayStore>(store: &S, user_id: UserId, expected: Stage) -> Result<bool> {
  let actual = current(store, user_id).await?;
  let matches = actual == Some(expected);
  if !matches {
    debug!(user_id, %expected, actual = ?actual, "stage mismatch");
  }
  Ok(matches)
}

/// Move the user from `expected` to `next`, then read the row back.
pub async fn advance<S: RelayStore>(
  store: &S,
  user_id: UserId,
  expected: Stage,
  next: Stage,
) -> Result<Advance> {
  let swapped = store
    .advance_stage(user_id, expected, next)
    .await
    .map_err(Error::store)?;
  if !swapped {
    debug!(user_id, %expected, %next, "stage transition lost");
    return Ok(Advance::Lost);
  }

  let actual = current(store, user_id).await?;
  if actual != Some(next) {
    warn!(user_id, %next, actual = ?actual, "stage transition not visible on re-read");
    return Ok(Advance::Unverified);
  }
  Ok(Advance::Advanced)
}

/// Force the user into `adding_connection`, dropping any draft reference.
/// Returns whether the re-read confirms the write.
pub async fn restart<S: RelayStore>(store: &S, sender: Sender) -> Result<bool> {
  store
    .reset_user(sender.user_id, sender.chat_id, Stage::AddingConnection)
    .await
    .map_err(Error::store)?;
  let actual = current(store, sender.user_id).await?;
  Ok(actual == Some(Stage::AddingConnection))
}

/// Force the user back to `start`, dropping any draft reference.
pub async fn reset<S: RelayStore>(store: &S, sender: Sender) -> Result<()> {
  store
    .reset_user(sender.user_id, sender.chat_id, Stage::Start)
    .await
    .map_err(Error::store)?;
  Ok(())
}
