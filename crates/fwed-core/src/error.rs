//! Error types for `fwed-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown stage: {0:?}")]
  UnknownStage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
