//! One-shot activation gate.

use std::sync::atomic::{AtomicU8, Ordering};

const UNINITIALIZED: u8 = 0;
const ACTIVE: u8 = 1;

/// Atomic `Uninitialized -> Active` switch.
///
/// [`open`](Self::open) returns `true` for exactly one caller, no matter how
/// many threads race on it. No lock is held afterwards.
#[derive(Debug)]
pub struct ActivationGate {
    state: AtomicU8,
}

impl ActivationGate {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNINITIALIZED),
        }
    }

    /// Transition to active. Returns `true` only for the call that flipped it.
    pub fn open(&self) -> bool {
        self.state
            .compare_exchange(UNINITIALIZED, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == ACTIVE
    }
}

impl Default for ActivationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_opens_once() {
        let gate = ActivationGate::new();
        assert!(!gate.is_active());
        assert!(gate.open());
        assert!(gate.is_active());
        assert!(!gate.open());
        assert!(!gate.open());
    }

    #[test]
    fn test_concurrent_open_has_single_winner() {
        let gate = Arc::new(ActivationGate::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if gate.open() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
