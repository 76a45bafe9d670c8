//! Error type shared by the handlers and the Telegram adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
  #[error("telegram error: {0}")]
  Transport(#[from] teloxide::RequestError),
  #[error("configuration error: {0}")]
  Config(String),
}

impl Error {
  /// Box a backend error; used as `.map_err(Error::store)`.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
