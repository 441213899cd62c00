//! Host-owned switch that allows or suppresses connection attempts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// While closed, no connection attempt is started.  An established
/// connection is left alone.  Clones share the same flag.
#[derive(Debug, Clone)]
pub struct ConnectGate(Arc<AtomicBool>);

impl ConnectGate {
    pub fn new(open: bool) -> Self {
        Self(Arc::new(AtomicBool::new(open)))
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn set_open(&self, open: bool) {
        self.0.store(open, Ordering::Release);
    }
}

impl Default for ConnectGate {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_open_and_clones_share_state() {
        let gate = ConnectGate::default();
        let host = gate.clone();
        assert!(gate.is_open());
        host.set_open(false);
        assert!(!gate.is_open());
    }
}
