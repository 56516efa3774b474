//! Reconciles the matrix's actual state to the orchestrator's desired
//! `(power, output)` pair in the background, independent of how fast
//! button presses arrive. The orchestrator calls `set_power`/`set_output`
//! on every transition; this task owns the only `MatrixDriver` and
//! retries until it converges.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, Notify};

use crate::config::Config;
use crate::error::MvResult;
use crate::jtech::Power;
use crate::matrix::driver::MatrixDriver;
use crate::output::JtechOutput;

const SYNC_WATCHDOG: Duration = Duration::from_secs(10);
// The device sometimes reports a just-applied state incorrectly if read
// back immediately; give it a moment before trusting a read-back.
const READBACK_SETTLE: Duration = Duration::from_secs(1);
const READBACK_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, PartialEq)]
struct Desired {
    power: Option<Power>,
    output: Option<JtechOutput>,
}

pub struct MatrixManager {
    desired: watch::Sender<Desired>,
    converged: Mutex<Option<Desired>>,
    synced: Notify,
    send_enabled: AtomicBool,
}

impl MatrixManager {
    pub fn new() -> Self {
        let (desired, _rx) = watch::channel(Desired::default());
        Self {
            desired,
            converged: Mutex::new(None),
            synced: Notify::new(),
            send_enabled: AtomicBool::new(true),
        }
    }

    /// Replace the desired matrix power. Cheap and non-blocking; the
    /// background task picks it up on its own schedule. While the device
    /// is (or is becoming) off, output convergence is skipped entirely —
    /// the screen is only ever applied once power is confirmed on.
    pub fn set_power(&self, power: Power) {
        let mut target = self.desired.borrow().clone();
        target.power = Some(power);
        let _ = self.desired.send(target);
    }

    /// Replace the desired screen. Has no effect on the device until
    /// `desired_power` is (or becomes) `On`.
    pub fn set_output(&self, output: JtechOutput) {
        let mut target = self.desired.borrow().clone();
        target.output = Some(output);
        let _ = self.desired.send(target);
    }

    /// Disable real device I/O and just mirror whatever is desired
    /// straight into `converged`. Used by tests that exercise the
    /// orchestrator without a real matrix on the other end.
    pub fn set_send_enabled(&self, enabled: bool) {
        self.send_enabled.store(enabled, Ordering::Relaxed);
    }

    /// The matrix power last confirmed by a successful sync, if any.
    pub async fn current_power(&self) -> Option<Power> {
        self.converged.lock().await.as_ref().and_then(|d| d.power)
    }

    /// The screen last confirmed by a successful sync, if any.
    pub async fn current_output(&self) -> Option<JtechOutput> {
        self.converged.lock().await.as_ref().and_then(|d| d.output.clone())
    }

    /// Wait until the matrix has converged to whatever is currently
    /// desired. If nothing has ever been desired, returns immediately.
    pub async fn wait_synced(&self) {
        loop {
            let target = self.desired.borrow().clone();
            if self.converged.lock().await.as_ref() == Some(&target) {
                return;
            }
            self.synced.notified().await;
        }
    }

    /// Run the reconciliation loop forever. Intended to be spawned once
    /// as a background task; `self` is shared with the orchestrator via
    /// `Arc`.
    pub async fn run(self: Arc<Self>, config: Config) -> ! {
        let mut driver = MatrixDriver::new(config.matrix_host.clone(), config.matrix_port);
        let mut rx = self.desired.subscribe();
        loop {
            let target = rx.borrow_and_update().clone();
            if target.power.is_none() && target.output.is_none() {
                let _ = rx.changed().await;
                continue;
            }

            if !self.send_enabled.load(Ordering::Relaxed) {
                *self.converged.lock().await = Some(target);
                self.synced.notify_waiters();
                if !rx.has_changed().unwrap_or(false) {
                    let _ = rx.changed().await;
                }
                continue;
            }

            let abort_rx = rx.clone();
            let should_abort = move || abort_rx.has_changed().unwrap_or(false);
            let outcome =
                tokio::time::timeout(SYNC_WATCHDOG, sync_once(&mut driver, &target, should_abort)).await;

            match outcome {
                Ok(Ok(true)) => {
                    *self.converged.lock().await = Some(target);
                    self.synced.notify_waiters();
                }
                Ok(Ok(false)) => {
                    log::debug!("matrix sync superseded before completing");
                }
                Ok(Err(e)) => {
                    log::warn!("matrix sync failed: {e}");
                    driver.reset();
                }
                Err(_) => {
                    log::warn!("matrix sync watchdog tripped after {SYNC_WATCHDOG:?}");
                    driver.reset();
                }
            }

            if !rx.has_changed().unwrap_or(false) {
                let _ = rx.changed().await;
            }
        }
    }
}

impl Default for MatrixManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Set device power first; if it's going (or staying) off, the screen is
/// left untouched and convergence is trivially done. Otherwise apply the
/// screen, wait briefly for the device to settle, then read it back and
/// confirm it actually matches before declaring victory.
async fn sync_once<F: Fn() -> bool>(
    driver: &mut MatrixDriver,
    target: &Desired,
    should_abort: F,
) -> MvResult<bool> {
    if let Some(power) = target.power {
        driver.set_power(power).await?;
        if power == Power::Off {
            return Ok(true);
        }
    }
    let Some(output) = &target.output else {
        return Ok(true);
    };
    if !driver.set_screen(output, &should_abort).await? {
        return Ok(false);
    }
    if wait_settle(&should_abort).await {
        return Ok(false);
    }
    let Some(actual) = driver.read_screen(&should_abort).await? else {
        return Ok(false);
    };
    if &actual != output {
        log::debug!("matrix read-back mismatch: wanted {output}, device reports {actual}");
    }
    Ok(&actual == output)
}

/// Sleep out `READBACK_SETTLE`, polling `should_abort` so a superseding
/// desired state can cut the wait short. Returns whether it was aborted.
async fn wait_settle<F: Fn() -> bool>(should_abort: &F) -> bool {
    let mut waited = Duration::ZERO;
    while waited < READBACK_SETTLE {
        if should_abort() {
            return true;
        }
        tokio::time::sleep(READBACK_POLL).await;
        waited += READBACK_POLL;
    }
    should_abort()
}
