//! Cooperative scheduling primitives
//!
//! The host drives everything from display-frame callbacks. A `FrameScheduler`
//! marks the per-frame loop as running and hands out a `CancelToken` the host
//! checks before every reschedule. A `PeriodicTask` fires at a coarser period
//! measured against the same host clock.

use std::cell::Cell;
use std::rc::Rc;

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }

    /// Still allowed to run
    pub fn is_live(&self) -> bool {
        !self.is_cancelled()
    }
}

/// The per-frame loop handle
#[derive(Debug, Default)]
pub struct FrameScheduler {
    token: Option<CancelToken>,
    ticks: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the loop, cancelling any previous run. The returned token is
    /// what queued host callbacks check before doing work.
    pub fn start(&mut self) -> CancelToken {
        self.cancel();
        let token = CancelToken::new();
        self.token = Some(token.clone());
        token
    }

    pub fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().is_some_and(CancelToken::is_live)
    }

    /// Token of the current run, if any
    pub fn token(&self) -> Option<CancelToken> {
        self.token.clone()
    }

    /// Count a tick; returns false when the loop is not running
    pub fn begin_tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.ticks += 1;
        true
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// A cancellable task that comes due every `period_ms`
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    period_ms: f64,
    started_at: Option<f64>,
    next_due: Option<f64>,
    fired: u32,
}

impl PeriodicTask {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms: period_ms.max(1.0),
            started_at: None,
            next_due: None,
            fired: 0,
        }
    }

    /// Start counting from `now_ms`; restarting resets the clock
    pub fn start(&mut self, now_ms: f64) {
        self.started_at = Some(now_ms);
        self.next_due = Some(now_ms + self.period_ms);
        self.fired = 0;
    }

    pub fn cancel(&mut self) {
        self.started_at = None;
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Time since `start`, zero when not running
    pub fn elapsed(&self, now_ms: f64) -> f64 {
        self.started_at.map(|s| (now_ms - s).max(0.0)).unwrap_or(0.0)
    }

    pub fn fired(&self) -> u32 {
        self.fired
    }

    /// Fires at most once per call, even if several periods have passed
    pub fn poll(&mut self, now_ms: f64) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now_ms < due {
            return false;
        }
        // skip missed periods instead of bursting
        let behind = ((now_ms - due) / self.period_ms).floor() + 1.0;
        self.next_due = Some(due + behind * self.period_ms);
        self.fired += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let queued = token.clone();
        assert!(queued.is_live());
        token.cancel();
        assert!(queued.is_cancelled());
    }

    #[test]
    fn test_restart_cancels_previous_run() {
        let mut frames = FrameScheduler::new();
        let first = frames.start();
        let second = frames.start();
        assert!(first.is_cancelled());
        assert!(second.is_live());
        assert!(frames.is_running());
        frames.cancel();
        assert!(second.is_cancelled());
        assert!(!frames.begin_tick());
    }

    #[test]
    fn test_periodic_task_fires_on_period() {
        let mut task = PeriodicTask::new(150.0);
        assert!(!task.poll(1000.0));
        task.start(0.0);
        assert!(!task.poll(100.0));
        assert!(task.poll(150.0));
        assert!(!task.poll(200.0));
        assert!(task.poll(310.0));
        assert_eq!(task.fired(), 2);
    }

    #[test]
    fn test_periodic_task_does_not_burst_after_stall() {
        let mut task = PeriodicTask::new(100.0);
        task.start(0.0);
        assert!(task.poll(1050.0));
        assert!(!task.poll(1060.0));
        assert!(task.poll(1100.0));
    }

    #[test]
    fn test_cancelled_task_never_fires() {
        let mut task = PeriodicTask::new(100.0);
        task.start(0.0);
        task.cancel();
        assert!(!task.poll(500.0));
        assert_eq!(task.elapsed(500.0), 0.0);
    }
}
