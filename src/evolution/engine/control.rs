//! Shared run-state handle used to pause a running algorithm from another
//! thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::schema::RunState;

struct ControlInner {
    state: Mutex<RunState>,
    changed: Condvar,
    pause_requested: AtomicBool,
}

/// Cloneable handle to an algorithm's run state.
///
/// Pause requests are honoured at generation boundaries only.
#[derive(Clone)]
pub struct RunControl {
    inner: Arc<ControlInner>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self {
            inner: Arc::new(ControlInner {
                state: Mutex::new(RunState::Uninitialized),
                changed: Condvar::new(),
                pause_requested: AtomicBool::new(false),
            }),
        }
    }
}

impl RunControl {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run_state(&self) -> RunState {
        *self.lock()
    }

    /// Ask the loop to pause after the current generation. Returns false
    /// (and does nothing) unless the algorithm is running.
    pub fn request_pause(&self) -> bool {
        let state = self.lock();
        if *state != RunState::Running {
            return false;
        }
        self.inner.pause_requested.store(true, Ordering::Release);
        true
    }

    /// Request a pause and block until the loop has left `Running`.
    /// Returns the state the loop settled in (`Paused` or `Stopped`).
    pub fn request_pause_and_wait(&self) -> RunState {
        let state = self.lock();
        if *state != RunState::Running {
            return *state;
        }
        self.inner.pause_requested.store(true, Ordering::Release);
        let state = self
            .inner
            .changed
            .wait_while(state, |s| *s == RunState::Running)
            .unwrap_or_else(PoisonError::into_inner);
        *state
    }

    pub(crate) fn set_state(&self, new_state: RunState) {
        let mut state = self.lock();
        *state = new_state;
        self.inner.changed.notify_all();
    }

    /// Consume a pending pause request.
    pub(crate) fn take_pause_request(&self) -> bool {
        self.inner.pause_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn clear_pause_request(&self) {
        self.inner.pause_requested.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for RunControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunControl")
            .field("state", &self.run_state())
            .field(
                "pause_requested",
                &self.inner.pause_requested.load(Ordering::Acquire),
            )
            .finish()
    }
}
