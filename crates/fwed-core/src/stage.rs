//! The wizard stage enumeration.
//!
//! The happy path is linear: `start → adding_connection →
//! awaiting_configuration → selecting_source_group → selecting_source_topic →
//! selecting_target_group → selecting_target_topic → start`.

use std::str::FromStr as _;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{Error, Result};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  /// Idle; the main menu is the only thing the user can act on.
  #[default]
  Start,
  AddingConnection,
  AwaitingConfiguration,
  SelectingSourceGroup,
  SelectingSourceTopic,
  SelectingTargetGroup,
  SelectingTargetTopic,
}

impl Stage {
  /// The stage a successful handler for `self` moves the user to.
  pub fn successor(self) -> Stage {
    match self {
      Stage::Start => Stage::AddingConnection,
      Stage::AddingConnection => Stage::AwaitingConfiguration,
      Stage::AwaitingConfiguration => Stage::SelectingSourceGroup,
      Stage::SelectingSourceGroup => Stage::SelectingSourceTopic,
      Stage::SelectingSourceTopic => Stage::SelectingTargetGroup,
      Stage::SelectingTargetGroup => Stage::SelectingTargetTopic,
      Stage::SelectingTargetTopic => Stage::Start,
    }
  }

  /// Stages in which private-chat text is consumed as wizard input.
  pub fn accepts_text(self) -> bool {
    matches!(self, Stage::AddingConnection | Stage::AwaitingConfiguration)
  }

  pub fn as_str(&self) -> &str { self.as_ref() }

  /// Parse the stored column value.
  pub fn parse(s: &str) -> Result<Stage> {
    Stage::from_str(s).map_err(|_| Error::UnknownStage(s.to_owned()))
  }
}
