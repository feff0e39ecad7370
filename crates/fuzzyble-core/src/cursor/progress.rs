//! Progress reporting and cancellation for population runs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

/// Receives the completed fraction (0.0-1.0) after every population batch.
///
/// Values delivered within one run are non-decreasing and the last one is
/// exactly `1.0` when the run completes.
///
/// Runs while the population holds the column's write lock. Status reads on
/// the cursor are safe from inside an observer; queries or transitions on the
/// same column would wait on that lock forever.
pub trait ProgressObserver {
    fn on_progress(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> ProgressObserver for F {
    fn on_progress(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _fraction: f64) {}
}

/// Forwards progress to a channel, e.g. towards a UI thread.
///
/// A disconnected receiver is ignored; population carries on.
#[derive(Debug, Clone)]
pub struct ChannelProgress(pub Sender<f64>);

impl ProgressObserver for ChannelProgress {
    fn on_progress(&mut self, fraction: f64) {
        let _ = self.0.send(fraction);
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag. Population checks it before every batch,
/// queries between lookup stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::mpsc;

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |p: f64| seen.push(p);
            observer.on_progress(0.5);
            observer.on_progress(1.0);
        }
        assert_eq!(seen, vec![0.5, 1.0]);
    }

    #[test]
    fn test_channel_observer_survives_dropped_receiver() {
        let (tx, rx) = mpsc::channel();
        let mut observer = ChannelProgress(tx);
        observer.on_progress(0.25);
        assert_eq!(rx.recv().unwrap(), 0.25);

        drop(rx);
        observer.on_progress(1.0);
    }

    #[test]
    fn test_cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!handle.is_cancelled());
        token.cancel();
        assert!(handle.is_cancelled());
    }
}
