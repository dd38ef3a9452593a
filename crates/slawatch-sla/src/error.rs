use slawatch_common::types::SlaStatus;

/// State-machine precondition violations.
///
/// Raised when a transition is requested from a state that does not allow
/// it (resume without a pause, pausing a breached SLA, and so on). The
/// caller decides whether to surface it (API paths map it to HTTP 409) or
/// to skip the record (scanner paths).
///
/// # Examples
///
/// ```rust
/// use slawatch_common::types::SlaStatus;
/// use slawatch_sla::error::TransitionError;
///
/// let err = TransitionError::InvalidSlaTransition {
///     sla_id: "sla-7".to_string(),
///     from: SlaStatus::Met,
///     action: "pause",
/// };
/// assert!(err.to_string().contains("pause"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// The SLA is in a state that does not permit the requested action.
    #[error("Sla: cannot {action} sla {sla_id} in state '{from}'")]
    InvalidSlaTransition {
        sla_id: String,
        from: SlaStatus,
        action: &'static str,
    },
}

/// Convenience `Result` alias for state-machine transitions.
pub type Result<T> = std::result::Result<T, TransitionError>;
