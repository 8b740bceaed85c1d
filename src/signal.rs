use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use parking_lot::{Condvar, Mutex};

use crate::error::AppError;

/// Stop flag shared between the signal handler and a polling loop.
///
/// The handler only raises the flag; hardware cleanup stays on the loop's
/// own control path. `wait` doubles as the inter-poll sleep and returns
/// early once the flag is raised.
#[derive(Default)]
pub struct StopSignal {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl StopSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Raises the flag on SIGINT and SIGTERM.
    pub fn install(self: &Arc<Self>) -> Result<(), AppError> {
        let signal = Arc::clone(self);
        ctrlc::set_handler(move || {
            info!("stop requested");
            signal.stop();
        })
        .map_err(|e| AppError::Config(format!("install signal handler: {e}")))
    }

    pub fn stop(&self) {
        *self.stopped.lock() = true;
        self.cond.notify_all();
    }

    pub fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleeps for `timeout` or until stopped. Returns whether stop was requested.
    pub fn wait(&self, timeout: Duration) -> bool {
        // a deadline past what `Instant` can represent means no deadline
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = self.stopped.lock();
        while !*stopped {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut stopped, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut stopped),
            }
        }
        *stopped
    }
}
