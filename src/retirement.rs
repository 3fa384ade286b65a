use crate::registry::Registry;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

struct SignalState {
    needs_retirement: bool,
    stop: bool,
}

/// Wakes the retirement worker. Deliberately a separate lock from the
/// registry's `RwLock` — the worker's sleep/wake protocol has nothing to do
/// with the data the registry guards, mirroring the source's split between
/// `producers_mutex_` and `gcCv_`/`needGC`.
pub struct RetirementSignal {
    state: Mutex<SignalState>,
    cv: Condvar,
}

impl RetirementSignal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SignalState {
                needs_retirement: false,
                stop: false,
            }),
            cv: Condvar::new(),
        }
    }

    /// Requests a retirement sweep as soon as the worker wakes.
    pub fn notify(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.needs_retirement = true;
        self.cv.notify_one();
    }

    /// Signals the worker to terminate after any pending sweep.
    pub fn request_stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.stop = true;
        self.cv.notify_one();
    }

    /// Blocks until either a sweep is requested or a stop is requested.
    /// Returns `false` when the worker should exit.
    fn wait_for_work(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if state.stop {
                return false;
            }
            if state.needs_retirement {
                state.needs_retirement = false;
                return true;
            }
            state = self.cv.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }
}

impl Default for RetirementSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns the background thread that reaps slots left behind by exited
/// producers. The returned handle is joined by `Queue`'s `Drop` impl.
pub fn spawn<T>(registry: Arc<Registry<T>>, signal: Arc<RetirementSignal>) -> JoinHandle<()>
where
    T: Send + 'static,
{
    std::thread::Builder::new()
        .name("dispatch-queue-retirement".into())
        .spawn(move || {
            while signal.wait_for_work() {
                let reaped = registry.retire_inactive_empty();
                if reaped > 0 {
                    log::trace!("retirement sweep reaped {reaped} slot(s)");
                }
            }
            log::trace!("retirement worker stopping");
        })
        .expect("failed to spawn retirement worker thread")
}
