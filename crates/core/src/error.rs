use thiserror::Error;

/// Returned when a learner tries to open a lesson that is still locked.
///
/// The message is meant to be shown as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("complete the {remaining} remaining lesson(s) before opening this one")]
pub struct NavigationBlocked {
    pub remaining: usize,
}
