//! PPT Invariant System: setup-path invariant enforcement with contract tracking.
//!
//! Only the setup path (initialize, resize, kernel build, release) asserts
//! invariants. The dispatch path must stay lock-free and never calls in here.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

// Invariant ids for contract tracking.
pub const CAPACITY_PROVISIONED: u32 = 1;
pub const REGIME_MATCHES_BUDGET: u32 = 2;
pub const CLAMP_REPORTED: u32 = 3;
pub const BUFFERS_RELEASED: u32 = 4;
pub const RESIZE_EXACT: u32 = 5;
pub const KERNEL_READY: u32 = 6;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

#[cfg(feature = "ppt")]
/// Assert an invariant: logs it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = if let Some(ctx) = context {
            format!("Invariant {} failed: {} (context: {})", id, message, ctx)
        } else {
            format!("Invariant {} failed: {}", id, message)
        };
        log::error!("{}", full_message);
        panic!("{}", full_message);
    }
    // A poisoned log only loses bookkeeping, never the check itself.
    if let Ok(mut log) = INVARIANT_LOG.lock() {
        log.insert(id);
    }
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub(crate) fn assert_invariant(_id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        panic!("Invariant failed: {}", message);
    }
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let missing: Vec<u32> = {
        let log = INVARIANT_LOG.lock().unwrap_or_else(|p| p.into_inner());
        required_invariants
            .iter()
            .copied()
            .filter(|inv| !log.contains(inv))
            .collect()
    };
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    INVARIANT_LOG
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .clear();
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}
