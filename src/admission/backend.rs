//! Admission backend trait for abstracting the controller from its host.

use super::clock::Clock;
use super::controller::{AdmissionController, Decision, Stats};

/// The narrow interface a host service uses to consult an admission engine.
///
/// Implementations must be callable concurrently and must not block on I/O.
pub trait AdmissionBackend: Send + Sync {
    /// Count a request for `key` and return the verdict.
    fn check(&self, key: &str) -> Decision;

    /// Report the number of active keys.
    fn stats(&self) -> Stats;

    /// Forget a single key.
    fn reset_key(&self, key: &str);

    /// Forget every key.
    fn reset_all(&self);
}

impl<C: Clock> AdmissionBackend for AdmissionController<C> {
    fn check(&self, key: &str) -> Decision {
        AdmissionController::check(self, key)
    }

    fn stats(&self) -> Stats {
        AdmissionController::stats(self)
    }

    fn reset_key(&self, key: &str) {
        AdmissionController::reset_key(self, key)
    }

    fn reset_all(&self) {
        AdmissionController::reset_all(self)
    }
}
