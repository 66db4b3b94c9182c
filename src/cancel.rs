use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::GeneAbacusError;

/// Shared cancellation context (spec §5): the first task to fail sends its
/// error on a capacity-1 channel (non-blocking, so a second failure never
/// blocks) and flips an `AtomicBool` that every other task checks at its
/// next suspension point.
#[derive(Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    err_tx: Sender<GeneAbacusError>,
    err_rx: Receiver<GeneAbacusError>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (err_tx, err_rx) = bounded(1);
        CancelToken { flag: Arc::new(AtomicBool::new(false)), err_tx, err_rx }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Reports a failure. Only the first call's error is retained;
    /// subsequent calls are silently discarded, matching spec §7's
    /// "first error is surfaced; subsequent ones are discarded".
    pub fn fail(&self, err: GeneAbacusError) {
        self.flag.store(true, Ordering::Release);
        let _ = self.err_tx.try_send(err);
    }

    /// Takes the first reported error, if any.
    pub fn take_error(&self) -> Option<GeneAbacusError> {
        self.err_rx.try_recv().ok()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
