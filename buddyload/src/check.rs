use crate::transaction::TRANSACTION_HOOK;

/// Record the outcome of a named check and hand the outcome back.
///
/// Checks never abort an iteration; a failing check only shows up in the run statistics.
///
/// # Example
/// ```ignore
/// let status = chat().await;
/// check("chat status 2xx", matches!(status, Ok(s) if s.is_success()));
/// ```
pub fn check(name: &'static str, passed: bool) -> bool {
    if TRANSACTION_HOOK
        .try_with(|hook| hook.record_check(name, passed))
        .is_err()
    {
        tracing::warn!("No hook available for check {name}.");
    }
    passed
}
