//! Failure-escalation policy for resolution failures.

use cadence_core::Error;

/// Consecutive resolution failures a room tolerates before stopping.
pub const MAX_FAILURES: u32 = 3;

/// What the driver does with a failed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Loop back into resolving; the next queue item is attempted.
    Retry,
    /// Clear the queue and disconnect.
    Stop,
    /// Clear the queue and disconnect, with the distinct service-block
    /// reason. Independent of the failure counter.
    FatalBlock,
}

/// Decide the verdict for a failed resolution.
///
/// `failure_count` has already been incremented by the caller.
pub fn assess(error: &Error, failure_count: u32) -> Verdict {
    if error.is_service_block() {
        return Verdict::FatalBlock;
    }
    if failure_count >= MAX_FAILURES {
        return Verdict::Stop;
    }
    Verdict::Retry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_below_cap() {
        let err = Error::Extraction("boom".into());
        assert_eq!(assess(&err, 1), Verdict::Retry);
        assert_eq!(assess(&err, 2), Verdict::Retry);
    }

    #[test]
    fn test_stop_at_cap() {
        let err = Error::NoPlayableAudio("abc".into());
        assert_eq!(assess(&err, 3), Verdict::Stop);
        assert_eq!(assess(&err, 7), Verdict::Stop);
    }

    #[test]
    fn test_service_block_ignores_counter() {
        let err = Error::ServiceBlock("sign in to confirm".into());
        assert_eq!(assess(&err, 1), Verdict::FatalBlock);
        assert_eq!(assess(&err, 3), Verdict::FatalBlock);
    }
}
