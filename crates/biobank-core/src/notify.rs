//! Notification and confirmation seam.
//!
//! A front end supplies a [`Notifier`]; the core only asks it to show a
//! message or to confirm an action. User cancellation is a normal
//! [`Outcome::Cancelled`] value, never an error.

use std::future::Future;

use crate::error::Result;

/// Shown when an update lost an optimistic-concurrency race.
pub const VERSION_CONFLICT_MESSAGE: &str =
    "The record was modified by another user. Reload it and try again.";

/// Result of an interaction the user may dismiss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Confirmed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn confirmed(self) -> Option<T> {
        match self {
            Self::Confirmed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Confirmed(value) => Outcome::Confirmed(f(value)),
            Self::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Presentation services provided by the front end.
pub trait Notifier {
    fn success(&self, message: &str);

    fn error(&self, message: &str);

    /// Asks a yes/no question.
    fn confirm(&self, title: &str, message: &str) -> impl Future<Output = Outcome<()>>;
}

/// Asks for confirmation, then runs `action`.
///
/// Cancelling skips the action. A failed action is reported through the
/// notifier and then returned unchanged.
pub async fn confirm_then<N, F, Fut, T>(
    notifier: &N,
    title: &str,
    message: &str,
    success_message: &str,
    action: F,
) -> Result<Outcome<T>>
where
    N: Notifier,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if notifier.confirm(title, message).await.is_cancelled() {
        tracing::debug!(title, "action cancelled by user");
        return Ok(Outcome::Cancelled);
    }

    match action().await {
        Ok(value) => {
            notifier.success(success_message);
            Ok(Outcome::Confirmed(value))
        }
        Err(e) => {
            if e.is_version_conflict() {
                notifier.error(VERSION_CONFLICT_MESSAGE);
            } else {
                notifier.error(&e.to_string());
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainError, Error, RestError, VERSION_CONFLICT_PATTERN};
    use std::sync::Mutex;

    struct ScriptedNotifier {
        answer: Outcome<()>,
        messages: Mutex<Vec<String>>,
    }

    impl ScriptedNotifier {
        fn new(answer: Outcome<()>) -> Self {
            Self {
                answer,
                messages: Mutex::new(Vec::new()),
            }
        }

        fn messages(&self) -> Vec<String> {
            self.messages.lock().unwrap().clone()
        }
    }

    impl Notifier for ScriptedNotifier {
        fn success(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("success: {message}"));
        }

        fn error(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("error: {message}"));
        }

        async fn confirm(&self, _title: &str, _message: &str) -> Outcome<()> {
            self.answer
        }
    }

    #[tokio::test]
    async fn cancelled_skips_action() {
        let notifier = ScriptedNotifier::new(Outcome::Cancelled);
        let mut called = false;

        let outcome = confirm_then(&notifier, "Remove", "Sure?", "Removed", || {
            called = true;
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert!(outcome.is_cancelled());
        assert!(!called);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn confirmed_runs_action_and_reports_success() {
        let notifier = ScriptedNotifier::new(Outcome::Confirmed(()));

        let outcome = confirm_then(&notifier, "Lock", "Sure?", "User locked", || async {
            Ok(7)
        })
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Confirmed(7));
        assert_eq!(notifier.messages(), ["success: User locked"]);
    }

    #[tokio::test]
    async fn version_conflict_reported_with_reload_hint() {
        let notifier = ScriptedNotifier::new(Outcome::Confirmed(()));

        let err = confirm_then(&notifier, "Lock", "Sure?", "User locked", || async {
            Err::<(), _>(Error::from(RestError::Server {
                status: 400,
                message: VERSION_CONFLICT_PATTERN.into(),
            }))
        })
        .await
        .unwrap_err();

        assert!(err.is_version_conflict());
        assert_eq!(
            notifier.messages(),
            [format!("error: {VERSION_CONFLICT_MESSAGE}")]
        );
    }

    #[tokio::test]
    async fn other_errors_propagate_unchanged() {
        let notifier = ScriptedNotifier::new(Outcome::Confirmed(()));

        let err = confirm_then(&notifier, "Lock", "Sure?", "done", || async {
            Err::<(), _>(Error::from(DomainError::InvalidState("nope".into())))
        })
        .await
        .unwrap_err();

        assert_eq!(err, Error::Domain(DomainError::InvalidState("nope".into())));
        assert_eq!(notifier.messages(), ["error: nope"]);
    }

    #[test]
    fn outcome_helpers() {
        assert_eq!(Outcome::Confirmed(2).map(|n| n * 2), Outcome::Confirmed(4));
        assert_eq!(Outcome::<i32>::Cancelled.confirmed(), None);
    }
}
