//! Bounded retry for operations whose failures may be transient.

/// Why a retried operation ultimately failed.
#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error.
    Exhausted(E),
    /// An attempt failed with an error the predicate refused to retry.
    Fatal(E),
}

/// Run `op` up to `attempts` times, retrying only failures for which
/// `is_retryable` returns true. The first success wins; a non-retryable
/// failure propagates immediately as [`RetryError::Fatal`]; running out
/// of attempts yields [`RetryError::Exhausted`] with the last error.
///
/// `op` is re-invoked from scratch on every attempt, so it must itself
/// refresh whatever state the previous attempt went stale on.
pub fn retry_on<T, E, F, P>(attempts: usize, is_retryable: P, mut op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Result<T, E>,
    P: Fn(&E) -> bool,
{
    debug_assert!(attempts > 0);
    let mut last_err = None;
    for _ in 0..attempts {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => last_err = Some(err),
            Err(err) => return Err(RetryError::Fatal(err)),
        }
    }
    // attempts > 0, so last_err is set when we get here
    match last_err {
        Some(err) => Err(RetryError::Exhausted(err)),
        None => unreachable!("retry_on called with zero attempts"),
    }
}
