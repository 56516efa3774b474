//! Per-TV volume memory and mute, converged to the IR blaster one pulse
//! at a time in the background — the same reconcile-to-desired-state
//! shape the matrix manager uses, but for a device with no feedback at
//! all. "Volume" here is just a believed delta: how many IR pulses this
//! daemon has sent since the delta was last reset to zero for that TV.
//! Switching the selected TV restores whatever delta was last remembered
//! for it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::config::Config;
use crate::error::MvResult;
use crate::ir_transport;
use crate::tv::Tv;

struct VolumeState {
    current_mute: bool,
    desired_mute: bool,
    current_delta: i32,
    desired_delta: i32,
    delta_by_tv: HashMap<Tv, i32>,
}

impl VolumeState {
    fn reset(&mut self) {
        self.current_mute = false;
        self.desired_mute = false;
        self.current_delta = 0;
        self.desired_delta = 0;
        for v in self.delta_by_tv.values_mut() {
            *v = 0;
        }
    }

    /// A pure fixed-point check: mute is settled, and either muted (volume
    /// doesn't matter while muted) or the delta is settled too.
    fn is_synced(&self) -> bool {
        self.current_mute == self.desired_mute
            && (self.current_mute || self.current_delta == self.desired_delta)
    }
}

enum VolumeAction {
    Mute,
    VolumeUp,
    VolumeDown,
}

/// One reconciliation step towards `desired_*`, or `None` if already
/// converged (the worker then waits to be woken).
fn next_step(state: &mut VolumeState) -> Option<VolumeAction> {
    if state.current_mute != state.desired_mute {
        state.current_mute = state.desired_mute;
        return Some(VolumeAction::Mute);
    }
    if state.current_mute {
        return None;
    }
    let diff = state.desired_delta - state.current_delta;
    match diff.cmp(&0) {
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => {
            state.current_delta += 1;
            Some(VolumeAction::VolumeUp)
        }
        std::cmp::Ordering::Less => {
            state.current_delta -= 1;
            Some(VolumeAction::VolumeDown)
        }
    }
}

async fn apply(config: &Config, action: VolumeAction) -> MvResult<()> {
    match action {
        VolumeAction::Mute => ir_transport::mute(config).await,
        VolumeAction::VolumeUp => ir_transport::volume_up(config).await,
        VolumeAction::VolumeDown => ir_transport::volume_down(config).await,
    }
}

pub struct VolumeWorker {
    state: Arc<Mutex<VolumeState>>,
    wake: Notify,
    synced: Notify,
    send_enabled: AtomicBool,
}

impl VolumeWorker {
    pub fn spawn(config: Config) -> Arc<Self> {
        let state = Arc::new(Mutex::new(VolumeState {
            current_mute: false,
            desired_mute: false,
            current_delta: 0,
            desired_delta: 0,
            delta_by_tv: Tv::ALL.into_iter().map(|tv| (tv, 0)).collect(),
        }));
        let worker = Arc::new(Self {
            state,
            wake: Notify::new(),
            synced: Notify::new(),
            send_enabled: AtomicBool::new(true),
        });

        let background = Arc::clone(&worker);
        tokio::spawn(async move {
            loop {
                let step = {
                    let mut state = background.state.lock().await;
                    next_step(&mut state)
                };
                match step {
                    None => {
                        background.synced.notify_waiters();
                        background.wake.notified().await;
                    }
                    Some(action) => {
                        if background.send_enabled.load(Ordering::Relaxed) {
                            if let Err(e) = apply(&config, action).await {
                                log::warn!("volume command failed: {e}");
                            }
                        }
                    }
                }
            }
        });

        worker
    }

    /// Disable real IR sends; the background loop still mirrors
    /// `current_*` to `desired_*` in memory, just without ever calling
    /// out to the IR bridge. Used by tests that exercise the orchestrator
    /// offline.
    pub fn set_send_enabled(&self, enabled: bool) {
        self.send_enabled.store(enabled, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Pure observer: has the background loop reached `desired_*` yet?
    pub async fn is_synced(&self) -> bool {
        self.state.lock().await.is_synced()
    }

    /// Wait until `is_synced()` would return true.
    pub async fn synced(&self) {
        loop {
            if self.is_synced().await {
                return;
            }
            self.synced.notified().await;
        }
    }

    /// Nudge the remembered delta for `tv` and make it the one currently
    /// being converged to (pressing volume always targets the selected TV
    /// and implicitly unmutes, matching how the TVs themselves behave).
    pub async fn adjust(&self, tv: Tv, by: i32) {
        let mut state = self.state.lock().await;
        state.desired_mute = false;
        let delta = state.delta_by_tv.entry(tv).or_insert(0);
        *delta += by;
        state.desired_delta = *delta;
        self.wake.notify_one();
    }

    /// The selected TV changed; converge to whatever volume was last
    /// remembered for it.
    pub async fn select_tv(&self, tv: Tv) {
        let mut state = self.state.lock().await;
        let remembered = *state.delta_by_tv.get(&tv).unwrap_or(&0);
        if remembered != state.desired_delta {
            state.desired_delta = remembered;
            self.wake.notify_one();
        }
    }

    pub async fn toggle_mute(&self) {
        let mut state = self.state.lock().await;
        state.desired_mute = !state.desired_mute;
        self.wake.notify_one();
    }

    /// Full power-cycle style reset: every TV's remembered delta and the
    /// live mute/delta both go back to zero.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.reset();
        self.wake.notify_one();
    }

    /// Matrix power just came on; same as a full reset.
    pub async fn power_on(&self) {
        self.reset().await;
    }

    /// A TV just became active from cold; its volume session starts over.
    pub async fn power_on_reset(&self, tv: Tv) {
        let mut state = self.state.lock().await;
        state.delta_by_tv.insert(tv, 0);
        if state.desired_delta != 0 {
            state.reset();
            self.wake.notify_one();
        }
    }

    pub async fn is_muted(&self) -> bool {
        self.state.lock().await.current_mute
    }

    /// Short textual form for status output, e.g. `V+3`, `V-1`, `M`.
    pub async fn describe(&self) -> String {
        let state = self.state.lock().await;
        if state.current_mute {
            "M".to_string()
        } else if state.current_delta >= 0 {
            format!("V+{}", state.current_delta)
        } else {
            format!("V{}", state.current_delta)
        }
    }
}
