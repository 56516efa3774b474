//! Ties the FSM, the matrix reconciler, the STB queues, and the volume
//! worker into one entry point: `do_command`. Every command is fully
//! serialized through one `MvScreen` lock, so there is exactly one
//! writer of persisted state and the matrix never sees two desired
//! screens racing each other.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::MvResult;
use crate::jtech::{Power, Window};
use crate::matrix::manager::MatrixManager;
use crate::mv_screen::{Button, MvScreen};
use crate::output::JtechOutput;
use crate::stb::client::{StbAction, StbClient};
use crate::stb::queue::StbQueue;
use crate::tv::Tv;
use crate::volume::VolumeWorker;

#[derive(Debug, Clone, Copy)]
pub enum Command {
    Button(Button),
    VolumeUp,
    VolumeDown,
    ToggleMute,
    Reset,
    Power,
    PowerOn,
}

/// Everything persisted to `state.json`: `MvScreen` plus the matrix power
/// state, which lives outside the FSM proper since it gates whether the
/// FSM's commands have any effect at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MvState {
    #[serde(default)]
    power: Power,
    screen: MvScreen,
}

pub struct Multiviewer {
    state: Mutex<MvState>,
    matrix: Arc<MatrixManager>,
    stb_queues: HashMap<Tv, StbQueue>,
    volume: Arc<VolumeWorker>,
}

impl Multiviewer {
    pub fn new(config: &Config, matrix: Arc<MatrixManager>) -> Self {
        let state = Self::load_state();
        let mut stb_queues = HashMap::new();
        for (i, tv) in Tv::ALL.into_iter().enumerate() {
            let client = StbClient::new(config.stb_hosts[i].clone(), config.stb_port);
            stb_queues.insert(tv, StbQueue::spawn(client));
        }
        let volume = VolumeWorker::spawn(config.clone());

        Self {
            state: Mutex::new(state),
            matrix,
            stb_queues,
            volume,
        }
    }

    fn load_state() -> MvState {
        let Some(path) = Config::state_path() else {
            return MvState { power: Power::On, screen: MvScreen::new() };
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<MvState>(&content) {
                Ok(mut state) => {
                    if state.screen.validate().is_err() {
                        log::warn!("persisted state at {} failed validation, resetting", path.display());
                        state.screen.reset();
                    }
                    state
                }
                Err(e) => {
                    log::warn!("invalid persisted state at {}: {e}, using defaults", path.display());
                    MvState { power: Power::On, screen: MvScreen::new() }
                }
            },
            Err(_) => MvState { power: Power::On, screen: MvScreen::new() },
        }
    }

    async fn persist(&self, state: &MvState) {
        let Some(path) = Config::state_path() else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        match serde_json::to_string_pretty(state) {
            Ok(json) => {
                if let Err(e) = tokio::fs::write(&path, json).await {
                    log::warn!("cannot persist state to {}: {e}", path.display());
                }
            }
            Err(e) => log::warn!("cannot serialize state: {e}"),
        }
    }

    /// Apply one command, push the resulting power/screen to the matrix
    /// reconciler, and persist. Returns `Some(tv_code)` only for a
    /// double-tapped remote-mode toggle.
    ///
    /// If the matrix is off, every command except `Power`/`PowerOn` is a
    /// no-op (the current power/screen are still re-pushed to the
    /// reconcilers, harmlessly, since nothing actually changed).
    pub async fn do_command(&self, command: Command) -> MvResult<Option<u8>> {
        let mut state = self.state.lock().await;
        let gated = state.power == Power::Off && !matches!(command, Command::Power | Command::PowerOn);

        let before_num = state.screen.num_active_windows;
        let before_window_tv = state.screen.window_tv.clone();
        let before_tv = state.screen.selected_tv();

        let tv_code = if gated {
            None
        } else {
            match command {
                Command::Button(button) => {
                    let tv_code = state.screen.pressed(button);
                    self.dispatch_stb_side_effects(button, before_num, &before_window_tv, &state.screen)
                        .await;
                    tv_code
                }
                Command::VolumeUp => {
                    self.volume.adjust(state.screen.selected_tv(), 1).await;
                    None
                }
                Command::VolumeDown => {
                    self.volume.adjust(state.screen.selected_tv(), -1).await;
                    None
                }
                Command::ToggleMute => {
                    self.volume.toggle_mute().await;
                    None
                }
                Command::Reset => {
                    state.screen.reset();
                    self.volume.reset().await;
                    None
                }
                Command::Power => {
                    match state.power {
                        Power::Off => self.power_on(&mut state).await,
                        Power::On => state.power = Power::Off,
                    }
                    None
                }
                Command::PowerOn => {
                    if state.power == Power::Off {
                        self.power_on(&mut state).await;
                    }
                    None
                }
            }
        };

        state.screen.validate()?;
        let after_tv = state.screen.selected_tv();
        if after_tv != before_tv {
            self.volume.select_tv(after_tv).await;
        }
        self.matrix.set_power(state.power);
        self.matrix.set_output(state.screen.render());
        self.persist(&state).await;
        Ok(tv_code)
    }

    /// Power transitioning off to on: the matrix itself resyncs on its
    /// own (the manager drives the `Initialization Finished!` wait), but
    /// the remote and volume state it's not aware of need their own reset.
    async fn power_on(&self, state: &mut MvState) {
        state.power = Power::On;
        state.screen.power_on();
        self.volume.power_on().await;
    }

    /// A TV that just left or joined the active set gets woken or parked;
    /// everything else (navigation, submode, PIP) only ever changes which
    /// HDMI input the matrix shows and needs no STB action.
    async fn dispatch_stb_side_effects(
        &self,
        button: Button,
        before_num: u8,
        before_window_tv: &HashMap<Window, Tv>,
        after: &MvScreen,
    ) {
        match button {
            Button::ActivateTv if after.num_active_windows > before_num => {
                if let Some(w) = Window::of_int(after.num_active_windows) {
                    let tv = after.window_tv[&w];
                    if let Some(queue) = self.stb_queues.get(&tv) {
                        queue.enqueue(StbAction::PowerOn);
                    }
                    self.volume.power_on_reset(tv).await;
                }
            }
            Button::DeactivateTvFirst | Button::DeactivateTvLast
                if after.num_active_windows < before_num =>
            {
                let before_active: HashSet<Tv> = Window::ALL[..before_num as usize]
                    .iter()
                    .map(|w| before_window_tv[w])
                    .collect();
                let after_active: HashSet<Tv> =
                    after.active_windows().iter().map(|w| after.window_tv[w]).collect();
                if let Some(&tv) = before_active.difference(&after_active).next() {
                    if let Some(queue) = self.stb_queues.get(&tv) {
                        queue.enqueue(StbAction::PowerOff);
                    }
                }
            }
            _ => {}
        }
    }

    pub async fn current_output(&self) -> JtechOutput {
        self.state.lock().await.screen.render()
    }

    /// Push the loaded/current power and screen to the matrix reconciler
    /// without going through a button press — used once at startup so
    /// the hardware converges to whatever was persisted.
    pub async fn sync_matrix_to_current_state(&self) {
        let state = self.state.lock().await;
        self.matrix.set_power(state.power);
        self.matrix.set_output(state.screen.render());
    }

    pub async fn is_muted(&self) -> bool {
        self.volume.is_muted().await
    }

    pub async fn volume_description(&self) -> String {
        self.volume.describe().await
    }

    /// One-line status: matrix output plus volume, for the `Info` command.
    pub async fn info(&self) -> String {
        let output = self.current_output().await;
        let volume = self.volume_description().await;
        format!("{output} {volume}")
    }

    /// Persist one last time on the way out.
    pub async fn shutdown(&self) {
        let state = self.state.lock().await;
        self.persist(&state).await;
    }

    /// Suppress real matrix/IR-bridge I/O and mirror desired state
    /// straight into "converged", for tests that drive the orchestrator
    /// without live devices on the other end.
    pub fn set_send_enabled(&self, enabled: bool) {
        self.matrix.set_send_enabled(enabled);
        self.volume.set_send_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;

    // `Config::state_path` resolves off `$HOME`; serialize these tests and
    // redirect it to a throwaway directory so none of them touch a real
    // developer config.
    static HOME_GUARD: StdMutex<()> = StdMutex::new(());

    async fn test_multiviewer() -> (tempfile::TempDir, Arc<Multiviewer>) {
        let dir = tempfile::tempdir().expect("tempdir");
        std::env::set_var("HOME", dir.path());
        let config = Config::default();

        let matrix = Arc::new(MatrixManager::new());
        matrix.set_send_enabled(false);
        tokio::spawn(Arc::clone(&matrix).run(config.clone()));

        let mv = Arc::new(Multiviewer::new(&config, matrix));
        mv.set_send_enabled(false);
        (dir, mv)
    }

    #[tokio::test]
    async fn power_cycle_preserves_state_and_gates_other_commands() {
        let _guard = HOME_GUARD.lock().unwrap();
        let (_dir, mv) = test_multiviewer().await;

        mv.do_command(Command::Reset).await.unwrap();
        mv.do_command(Command::Button(Button::ArrowE)).await.unwrap();
        mv.do_command(Command::Power).await.unwrap();
        // Gated while off: dropped with no effect on the screen.
        mv.do_command(Command::Button(Button::ArrowS)).await.unwrap();
        mv.do_command(Command::Power).await.unwrap();
        mv.do_command(Command::Button(Button::ArrowS)).await.unwrap();

        assert_eq!(
            mv.current_output().await.one_line_description(),
            "QUAD(2) A4 [H1]A [H2]A [H3]A [H4]G"
        );
    }

    #[tokio::test]
    async fn volume_remembers_delta_per_tv() {
        let _guard = HOME_GUARD.lock().unwrap();
        let (_dir, mv) = test_multiviewer().await;

        mv.do_command(Command::Reset).await.unwrap();
        mv.do_command(Command::VolumeUp).await.unwrap();
        mv.do_command(Command::Button(Button::ArrowN)).await.unwrap();
        mv.volume.synced().await;
        assert_eq!(mv.volume_description().await, "V+0");

        mv.do_command(Command::Button(Button::ArrowW)).await.unwrap();
        mv.volume.synced().await;
        assert_eq!(mv.volume_description().await, "V+1");
    }
}
