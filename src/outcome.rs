//! Four-state result used between layers.
//!
//! `Warning` and `Debug` are not failures: a warning reports something the caller may
//! want to surface (nothing was deleted, another task is already generating
//! placeholders), a debug outcome reports a harmless no-op such as a directory that
//! already exists. Only `Failure` carries an error.

use crate::error::StickerError;

#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    Warning(String),
    Debug(String),
    Failure(StickerError),
}

/// Discriminant of an [`Outcome`], handy for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Warning,
    Debug,
    Failure,
}

impl<T> Outcome<T> {
    pub fn warning(message: impl Into<String>) -> Self {
        let message = message.into();
        log::warn!("{}", message);
        Outcome::Warning(message)
    }

    pub fn debug(message: impl Into<String>) -> Self {
        let message = message.into();
        log::debug!("{}", message);
        Outcome::Debug(message)
    }

    pub fn failure(error: impl Into<StickerError>) -> Self {
        let error = error.into();
        log::error!("{}", error);
        Outcome::Failure(error)
    }

    pub fn from_result<E: Into<StickerError>>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Outcome::Success(data),
            Err(e) => Outcome::failure(e),
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Outcome::Success(_) => OutcomeStatus::Success,
            Outcome::Warning(_) => OutcomeStatus::Warning,
            Outcome::Debug(_) => OutcomeStatus::Debug,
            Outcome::Failure(_) => OutcomeStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Outcome::Warning(_))
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, Outcome::Debug(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Outcome::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Outcome::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Warning(msg) | Outcome::Debug(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StickerError> {
        match self {
            Outcome::Failure(e) => Some(e),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self.split() {
            Ok(data) => Outcome::Success(f(data)),
            Err(other) => other,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self.split() {
            Ok(data) => f(data),
            Err(other) => other,
        }
    }

    /// Separates the success value from the other three states, re-typing those so
    /// they can be returned unchanged.
    pub fn split<U>(self) -> Result<T, Outcome<U>> {
        match self {
            Outcome::Success(data) => Ok(data),
            Outcome::Warning(msg) => Err(Outcome::Warning(msg)),
            Outcome::Debug(msg) => Err(Outcome::Debug(msg)),
            Outcome::Failure(e) => Err(Outcome::Failure(e)),
        }
    }

    /// Converts to a `Result`, treating warning and debug as errors carrying their message.
    pub fn into_result(self) -> Result<T, Outcome<T>> {
        match self {
            Outcome::Success(data) => Ok(data),
            other => Err(other),
        }
    }
}

impl<T> From<StickerError> for Outcome<T> {
    fn from(e: StickerError) -> Self {
        Outcome::failure(e)
    }
}

/// Unwraps a `Success` or returns the outcome from the enclosing function.
macro_rules! tri {
    ($outcome:expr) => {
        match $outcome.split() {
            Ok(data) => data,
            Err(other) => return other,
        }
    };
}

pub(crate) use tri;
