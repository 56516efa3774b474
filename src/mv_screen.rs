//! The remote-control finite state machine.
//!
//! `MvScreen` is pure and synchronous: every button press is one call to
//! `pressed()`, every invariant is checked by `validate()`, and the whole
//! reachable state space is small enough to enumerate exhaustively (see
//! `fsm_explore`). Real device I/O lives entirely outside this module —
//! the orchestrator renders `MvScreen` into a `JtechOutput` and hands that
//! to the matrix manager.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

use crate::clock::{Clock, SystemClock, DOUBLE_TAP_WINDOW};
use crate::error::{MvError, MvResult};
use crate::jtech::{Color, Hdmi, Mode, PipLocation, Submode, Window};
use crate::output::{JtechOutput, Layout, WindowContents};
use crate::tv::Tv;

impl Default for Window {
    fn default() -> Self {
        Window::W1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutMode {
    Multiview,
    Fullscreen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FullscreenMode {
    Full,
    Pip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteMode {
    AppleTv,
    Multiviewer,
}

impl RemoteMode {
    pub fn flip(self) -> RemoteMode {
        match self {
            RemoteMode::AppleTv => RemoteMode::Multiviewer,
            RemoteMode::Multiviewer => RemoteMode::AppleTv,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrow {
    N,
    E,
    W,
    S,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Button {
    Remote,
    Select,
    Back,
    PlayPause,
    ActivateTv,
    DeactivateTvFirst,
    DeactivateTvLast,
    ToggleSubmode,
    ArrowN,
    ArrowE,
    ArrowW,
    ArrowS,
}

impl Button {
    pub const ALL: [Button; 12] = [
        Button::Remote,
        Button::Select,
        Button::Back,
        Button::PlayPause,
        Button::ActivateTv,
        Button::DeactivateTvFirst,
        Button::DeactivateTvLast,
        Button::ToggleSubmode,
        Button::ArrowN,
        Button::ArrowE,
        Button::ArrowW,
        Button::ArrowS,
    ];

    pub fn to_int(self) -> u8 {
        Self::ALL.iter().position(|b| *b == self).unwrap() as u8
    }

    pub fn of_int(n: u8) -> Option<Button> {
        Self::ALL.get(n as usize).copied()
    }

    fn for_arrow(arrow: Arrow) -> Button {
        match arrow {
            Arrow::N => Button::ArrowN,
            Arrow::E => Button::ArrowE,
            Arrow::W => Button::ArrowW,
            Arrow::S => Button::ArrowS,
        }
    }
}

fn tv_to_hdmi(tv: Tv) -> Hdmi {
    match tv {
        Tv::Tv1 => Hdmi::H1,
        Tv::Tv2 => Hdmi::H2,
        Tv::Tv3 => Hdmi::H3,
        Tv::Tv4 => Hdmi::H4,
    }
}

fn default_clock() -> Box<dyn Clock> {
    Box::new(SystemClock)
}

#[derive(Serialize, Deserialize)]
pub struct MvScreen {
    pub window_tv: HashMap<Window, Tv>,
    pub layout_mode: LayoutMode,
    pub num_active_windows: u8,
    pub multiview_submode: Submode,
    pub fullscreen_mode: FullscreenMode,
    pub full_window: Window,
    pub pip_window: Window,
    pub pip_location_by_tv: HashMap<Tv, PipLocation>,
    pub selected_window: Window,
    pub selected_window_has_distinct_border: bool,
    pub remote_mode: RemoteMode,

    // Ephemeral: used only to detect double-taps, never persisted.
    #[serde(skip)]
    pub last_button: Option<Button>,
    #[serde(skip)]
    last_button_at: Option<Instant>,
    #[serde(skip)]
    pub last_selected_window: Window,
    #[serde(skip, default = "default_clock")]
    clock: Box<dyn Clock>,
}

impl MvScreen {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        let window_tv = HashMap::from([
            (Window::W1, Tv::Tv1),
            (Window::W2, Tv::Tv2),
            (Window::W3, Tv::Tv3),
            (Window::W4, Tv::Tv4),
        ]);
        let pip_location_by_tv = Tv::ALL.into_iter().map(|tv| (tv, PipLocation::Ne)).collect();
        Self {
            window_tv,
            layout_mode: LayoutMode::Multiview,
            num_active_windows: 4,
            multiview_submode: Submode::W1Prominent,
            fullscreen_mode: FullscreenMode::Full,
            full_window: Window::W1,
            pip_window: Window::W2,
            pip_location_by_tv,
            selected_window: Window::W1,
            selected_window_has_distinct_border: true,
            remote_mode: RemoteMode::Multiviewer,
            last_button: None,
            last_button_at: None,
            last_selected_window: Window::W1,
            clock,
        }
    }

    /// Reset to the power-on default, preserving the injected clock.
    pub fn reset(&mut self) {
        let clock = std::mem::replace(&mut self.clock, Box::new(SystemClock));
        *self = MvScreen::with_clock(clock);
    }

    /// Entering ON from OFF: force the remote back to multiviewer mode
    /// with a distinct selection border, leaving layout and window_tv
    /// exactly as they were before power was lost.
    pub fn power_on(&mut self) {
        self.remote_mode = RemoteMode::Multiviewer;
        self.selected_window_has_distinct_border = true;
    }

    /// Arrange for the next `pressed(button)` to be treated as a double
    /// tap, bypassing the clock. Used by the BFS explorer, which has no
    /// way to wait out a real interval between two presses of the same
    /// button.
    pub fn force_pending_double_tap(&mut self, button: Button) {
        self.last_button = Some(button);
        self.last_button_at = Some(self.clock.now());
    }

    // ---- helpers -------------------------------------------------------

    pub fn active_windows(&self) -> Vec<Window> {
        Window::ALL[..self.num_active_windows as usize].to_vec()
    }

    pub fn next_active_window(&self, w: Window) -> Window {
        Window::of_int(w.to_int() % self.num_active_windows + 1).unwrap()
    }

    pub fn prev_active_window(&self, w: Window) -> Window {
        let n = self.num_active_windows;
        Window::of_int((w.to_int() + n - 2) % n + 1).unwrap()
    }

    fn window_is_prominent(&self, w: Window) -> bool {
        w == Window::W1
            && (self.layout_mode == LayoutMode::Fullscreen
                || self.multiview_submode == Submode::W1Prominent)
    }

    fn swap_window_tvs(&mut self, a: Window, b: Window) {
        let tv_a = self.window_tv[&a];
        let tv_b = self.window_tv[&b];
        self.window_tv.insert(a, tv_b);
        self.window_tv.insert(b, tv_a);
    }

    pub fn pip_location(&self) -> PipLocation {
        self.pip_location_by_tv[&self.window_tv[&self.full_window]]
    }

    pub fn selected_tv(&self) -> Tv {
        self.window_tv[&self.selected_window]
    }

    fn window_input(&self, w: Window) -> Hdmi {
        tv_to_hdmi(self.window_tv[&w])
    }

    fn pip_is_top(&self) -> bool {
        matches!(self.pip_location(), PipLocation::Nw | PipLocation::Ne)
    }

    fn arrow_points_from_full_to_pip(&self, arrow: Arrow) -> bool {
        match arrow {
            Arrow::N => self.pip_is_top(),
            Arrow::S => !self.pip_is_top(),
            _ => false,
        }
    }

    fn arrow_points_from_pip_to_full(&self, arrow: Arrow) -> bool {
        match arrow {
            Arrow::N => !self.pip_is_top(),
            Arrow::S => self.pip_is_top(),
            _ => false,
        }
    }

    fn from_pip_arrow_points_to(&self, arrow: Arrow) -> Option<PipLocation> {
        use PipLocation::*;
        match (self.pip_location(), arrow) {
            (Nw, Arrow::E) => Some(Ne),
            (Nw, Arrow::S) => Some(Sw),
            (Ne, Arrow::W) => Some(Nw),
            (Ne, Arrow::S) => Some(Se),
            (Sw, Arrow::E) => Some(Se),
            (Sw, Arrow::N) => Some(Nw),
            (Se, Arrow::W) => Some(Sw),
            (Se, Arrow::N) => Some(Ne),
            _ => None,
        }
    }

    /// Static arrow routing table for multiview layouts, keyed on the
    /// active window count, submode, and currently selected window.
    pub fn arrow_points_to(&self, arrow: Arrow) -> Option<Window> {
        use Window::*;
        match self.num_active_windows {
            2 => match (self.selected_window, arrow) {
                (W1, Arrow::E) => Some(W2),
                (W2, Arrow::W) => Some(W1),
                _ => None,
            },
            3 => match (self.selected_window, arrow) {
                (W1, Arrow::N) => Some(W2),
                (W1, Arrow::S) => Some(W3),
                (W2, Arrow::W) => Some(W1),
                (W2, Arrow::S) => Some(W3),
                (W3, Arrow::N) => Some(W2),
                (W3, Arrow::W) => Some(W1),
                _ => None,
            },
            4 => match self.multiview_submode {
                Submode::WindowsSame => match (self.selected_window, arrow) {
                    (W1, Arrow::E) => Some(W2),
                    (W1, Arrow::W) => Some(W4),
                    (W1, Arrow::S) => Some(W3),
                    (W2, Arrow::E) => Some(W3),
                    (W2, Arrow::W) => Some(W1),
                    (W2, Arrow::S) => Some(W4),
                    (W3, Arrow::N) => Some(W1),
                    (W3, Arrow::E) => Some(W4),
                    (W3, Arrow::W) => Some(W2),
                    (W4, Arrow::N) => Some(W2),
                    (W4, Arrow::E) => Some(W1),
                    (W4, Arrow::W) => Some(W3),
                    _ => None,
                },
                Submode::W1Prominent => match (self.selected_window, arrow) {
                    (W1, Arrow::N) => Some(W2),
                    (W1, Arrow::E) => Some(W3),
                    (W1, Arrow::S) => Some(W4),
                    (W2, Arrow::W) => Some(W1),
                    (W2, Arrow::S) => Some(W3),
                    (W3, Arrow::N) => Some(W2),
                    (W3, Arrow::W) => Some(W1),
                    (W3, Arrow::S) => Some(W4),
                    (W4, Arrow::N) => Some(W3),
                    (W4, Arrow::W) => Some(W1),
                    _ => None,
                },
            },
            _ => None,
        }
    }

    fn rotate_pip_window(&mut self, direction: Arrow) {
        let mut w = self.pip_window;
        loop {
            w = match direction {
                Arrow::E => self.next_active_window(w),
                Arrow::W => self.prev_active_window(w),
                _ => w,
            };
            if w != self.full_window {
                break;
            }
        }
        self.pip_window = w;
    }

    // ---- transitions -----------------------------------------------------

    fn pressed_arrow_in_multiview(&mut self, arrow: Arrow, double_tap: bool) {
        self.selected_window_has_distinct_border = true;
        if double_tap {
            let a = self.last_selected_window;
            let b = self.selected_window;
            self.swap_window_tvs(a, b);
            self.selected_window = if self.window_is_prominent(a) { a } else { b };
            self.last_button = None;
        } else if let Some(points_to) = self.arrow_points_to(arrow) {
            self.last_button = Some(Button::for_arrow(arrow));
            self.last_selected_window = self.selected_window;
            self.selected_window = points_to;
        }
    }

    fn pressed_arrow_in_full(&mut self, arrow: Arrow) {
        match arrow {
            Arrow::N | Arrow::S => {}
            Arrow::E => {
                let next = self.next_active_window(self.selected_window);
                self.selected_window = next;
                self.full_window = next;
            }
            Arrow::W => {
                let prev = self.prev_active_window(self.selected_window);
                self.selected_window = prev;
                self.full_window = prev;
            }
        }
    }

    fn pressed_arrow_in_pip(&mut self, arrow: Arrow, double_tap: bool) {
        let snapshot = self.selected_window;
        if double_tap {
            self.selected_window = self.last_selected_window;
            match arrow {
                Arrow::E => self.rotate_pip_window(Arrow::W),
                Arrow::W => self.rotate_pip_window(Arrow::E),
                _ => {}
            }
            if let Some(new_loc) = self.from_pip_arrow_points_to(arrow) {
                let tv = self.window_tv[&self.full_window];
                self.pip_location_by_tv.insert(tv, new_loc);
            }
            self.last_button = None;
        } else {
            match arrow {
                Arrow::E | Arrow::W => {
                    let was_selected_pip = self.selected_window == self.pip_window;
                    self.rotate_pip_window(arrow);
                    if was_selected_pip {
                        self.selected_window = self.pip_window;
                    }
                }
                Arrow::N | Arrow::S => {
                    if self.selected_window == self.pip_window
                        && self.arrow_points_from_pip_to_full(arrow)
                    {
                        self.selected_window = self.full_window;
                    } else if self.selected_window == self.full_window
                        && self.arrow_points_from_full_to_pip(arrow)
                    {
                        self.selected_window = self.pip_window;
                    }
                }
            }
            self.last_button = Some(Button::for_arrow(arrow));
            self.last_selected_window = snapshot;
        }
    }

    fn pressed_arrow(&mut self, arrow: Arrow, double_tap: bool) {
        match (self.layout_mode, self.fullscreen_mode) {
            (LayoutMode::Multiview, _) => self.pressed_arrow_in_multiview(arrow, double_tap),
            (LayoutMode::Fullscreen, FullscreenMode::Full) => self.pressed_arrow_in_full(arrow),
            (LayoutMode::Fullscreen, FullscreenMode::Pip) => {
                self.pressed_arrow_in_pip(arrow, double_tap)
            }
        }
    }

    pub fn activate_tv(&mut self) {
        if self.num_active_windows < 4 {
            self.num_active_windows += 1;
        }
    }

    /// Shift the currently selected TV out of the active range. `place_first`
    /// chooses whether it becomes the *first* inactive TV (so `activate_tv`
    /// brings it right back) or the *last* (so it's reactivated last).
    fn deactivate_tv(&mut self, place_first_in_inactive: bool) {
        if self.num_active_windows == 1 {
            return;
        }
        let deactivated = self.selected_window;
        let target = if place_first_in_inactive {
            Window::of_int(self.num_active_windows).unwrap()
        } else {
            Window::W4
        };
        let mut w = deactivated;
        while w != target {
            let next = Window::of_int(w.to_int() % 4 + 1).unwrap();
            self.swap_window_tvs(w, next);
            w = next;
        }

        self.num_active_windows -= 1;
        if self.selected_window.to_int() > self.num_active_windows {
            self.selected_window = Window::of_int(self.num_active_windows).unwrap();
        }
        self.selected_window_has_distinct_border = true;

        if self.layout_mode == LayoutMode::Fullscreen {
            match self.fullscreen_mode {
                FullscreenMode::Full => {
                    self.full_window = self.selected_window;
                }
                FullscreenMode::Pip => {
                    if deactivated == self.full_window {
                        self.full_window = self.pip_window;
                        self.pip_window = self.next_active_window(self.full_window);
                        self.selected_window = self.full_window;
                    } else {
                        self.pip_window = self.next_active_window(self.full_window);
                        self.selected_window = self.pip_window;
                    }
                }
            }
        }

        if self.num_active_windows == 1 {
            self.layout_mode = LayoutMode::Fullscreen;
            self.fullscreen_mode = FullscreenMode::Full;
            self.full_window = Window::W1;
            self.selected_window = Window::W1;
        }
    }

    pub fn toggle_submode(&mut self) {
        match self.layout_mode {
            LayoutMode::Multiview => {
                self.multiview_submode = self.multiview_submode.flip();
                if self.multiview_submode == Submode::W1Prominent
                    && self.selected_window != Window::W1
                {
                    let sel = self.selected_window;
                    self.swap_window_tvs(sel, Window::W1);
                    self.selected_window = Window::W1;
                }
            }
            LayoutMode::Fullscreen => {
                if self.num_active_windows >= 2 {
                    match self.fullscreen_mode {
                        FullscreenMode::Full => {
                            self.fullscreen_mode = FullscreenMode::Pip;
                            self.pip_window = self.next_active_window(self.full_window);
                            self.selected_window = self.full_window;
                        }
                        FullscreenMode::Pip => {
                            self.fullscreen_mode = FullscreenMode::Full;
                            self.selected_window = self.full_window;
                        }
                    }
                }
            }
        }
    }

    pub fn pressed_back(&mut self) {
        if self.layout_mode == LayoutMode::Fullscreen && self.num_active_windows == 1 {
            self.activate_tv();
        }
        if self.layout_mode == LayoutMode::Fullscreen {
            self.layout_mode = LayoutMode::Multiview;
            self.multiview_submode = Submode::W1Prominent;
            if self.selected_window != Window::W1 {
                let sel = self.selected_window;
                self.swap_window_tvs(sel, Window::W1);
                self.selected_window = Window::W1;
            }
            self.selected_window_has_distinct_border = true;
        }
    }

    pub fn pressed_play_pause(&mut self) {
        self.selected_window_has_distinct_border = !self.selected_window_has_distinct_border;
    }

    pub fn pressed_select(&mut self) {
        match self.layout_mode {
            LayoutMode::Multiview => {
                self.full_window = self.selected_window;
                self.pip_window = self.next_active_window(self.full_window);
                self.layout_mode = LayoutMode::Fullscreen;
                self.fullscreen_mode = FullscreenMode::Full;
                self.selected_window = self.full_window;
            }
            LayoutMode::Fullscreen => {
                if self.fullscreen_mode == FullscreenMode::Pip {
                    std::mem::swap(&mut self.full_window, &mut self.pip_window);
                    self.selected_window = self.full_window;
                }
            }
        }
    }

    /// Returns the selected TV's integer code on a double tap (the caller
    /// surfaces this so the UI can launch a per-TV remote app); `None`
    /// otherwise.
    fn pressed_remote(&mut self, double_tap: bool) -> Option<u8> {
        self.remote_mode = self.remote_mode.flip();
        if double_tap {
            self.remote_mode = self.remote_mode.flip();
            self.last_button = None;
            Some(self.selected_tv().to_int())
        } else {
            self.last_button = Some(Button::Remote);
            None
        }
    }

    /// Apply one button press. Returns `Some(tv_code)` only for a
    /// double-tapped `Remote`; every other button returns `None`.
    pub fn pressed(&mut self, button: Button) -> Option<u8> {
        let now = self.clock.now();
        let double_tap = self.last_button == Some(button)
            && self
                .last_button_at
                .map(|t| now.duration_since(t) <= DOUBLE_TAP_WINDOW)
                .unwrap_or(false);

        let result = match button {
            Button::Remote => self.pressed_remote(double_tap),
            Button::Select => {
                self.last_button = None;
                self.pressed_select();
                None
            }
            Button::Back => {
                self.last_button = None;
                self.pressed_back();
                None
            }
            Button::PlayPause => {
                self.last_button = None;
                self.pressed_play_pause();
                None
            }
            Button::ActivateTv => {
                self.last_button = None;
                self.activate_tv();
                None
            }
            Button::DeactivateTvFirst => {
                self.last_button = None;
                self.deactivate_tv(true);
                None
            }
            Button::DeactivateTvLast => {
                self.last_button = None;
                self.deactivate_tv(false);
                None
            }
            Button::ToggleSubmode => {
                self.last_button = None;
                self.toggle_submode();
                None
            }
            Button::ArrowN => {
                self.pressed_arrow(Arrow::N, double_tap);
                None
            }
            Button::ArrowE => {
                self.pressed_arrow(Arrow::E, double_tap);
                None
            }
            Button::ArrowW => {
                self.pressed_arrow(Arrow::W, double_tap);
                None
            }
            Button::ArrowS => {
                self.pressed_arrow(Arrow::S, double_tap);
                None
            }
        };
        self.last_button_at = Some(now);
        result
    }

    pub fn validate(&self) -> MvResult<()> {
        let mut tvs: Vec<Tv> = self.window_tv.values().copied().collect();
        tvs.sort_by_key(|t| t.to_int());
        if tvs != Tv::ALL.to_vec() {
            return Err(MvError::Invariant(
                "window_tv is not a permutation of all TVs".into(),
            ));
        }
        if !(1..=4).contains(&self.num_active_windows) {
            return Err(MvError::Invariant(format!(
                "num_active_windows out of range: {}",
                self.num_active_windows
            )));
        }
        if self.num_active_windows == 1
            && (self.layout_mode != LayoutMode::Fullscreen
                || self.fullscreen_mode != FullscreenMode::Full)
        {
            return Err(MvError::Invariant(
                "a single active window must be FULLSCREEN/FULL".into(),
            ));
        }
        if self.layout_mode == LayoutMode::Multiview && self.num_active_windows < 2 {
            return Err(MvError::Invariant(
                "MULTIVIEW requires at least 2 active windows".into(),
            ));
        }
        let active = self.active_windows();
        if !active.contains(&self.selected_window) {
            return Err(MvError::Invariant("selected_window is not active".into()));
        }
        if self.layout_mode == LayoutMode::Fullscreen {
            if !active.contains(&self.full_window) {
                return Err(MvError::Invariant("full_window is not active".into()));
            }
            if self.fullscreen_mode == FullscreenMode::Pip
                && (!active.contains(&self.pip_window) || self.pip_window == self.full_window)
            {
                return Err(MvError::Invariant("pip_window is invalid".into()));
            }
        }
        Ok(())
    }

    pub fn render(&self) -> JtechOutput {
        let border_for = |mode: Mode, layout_window: Window, mv_window: Window| -> Option<Color> {
            if !mode.window_has_border(layout_window) {
                None
            } else if mv_window == self.selected_window {
                match self.remote_mode {
                    RemoteMode::AppleTv => Some(Color::Red),
                    RemoteMode::Multiviewer => {
                        if self.selected_window_has_distinct_border {
                            Some(Color::Green)
                        } else {
                            Some(Color::Gray)
                        }
                    }
                }
            } else {
                Some(Color::Gray)
            }
        };
        let window = |mode: Mode, layout_window: Window, mv_window: Window| -> WindowContents {
            WindowContents::new(
                self.window_input(mv_window),
                border_for(mode, layout_window, mv_window),
            )
        };

        let layout = match self.layout_mode {
            LayoutMode::Fullscreen => match self.fullscreen_mode {
                FullscreenMode::Full => Layout::Full {
                    w1: window(Mode::Full, Window::W1, self.full_window),
                },
                FullscreenMode::Pip => Layout::Pip {
                    pip_location: self.pip_location(),
                    w1: window(Mode::Pip, Window::W1, self.full_window),
                    w2: window(Mode::Pip, Window::W2, self.pip_window),
                },
            },
            LayoutMode::Multiview => {
                let mode = match self.num_active_windows {
                    2 => Mode::Pbp,
                    3 => Mode::Triple,
                    4 => Mode::Quad,
                    n => unreachable!("invalid num_active_windows={n}"),
                };
                let submode = self.multiview_submode;
                match mode {
                    Mode::Pbp => Layout::Pbp {
                        submode,
                        w1: window(mode, Window::W1, Window::W1),
                        w2: window(mode, Window::W2, Window::W2),
                    },
                    Mode::Triple => Layout::Triple {
                        submode,
                        w1: window(mode, Window::W1, Window::W1),
                        w2: window(mode, Window::W2, Window::W2),
                        w3: window(mode, Window::W3, Window::W3),
                    },
                    _ => Layout::Quad {
                        submode,
                        w1: window(mode, Window::W1, Window::W1),
                        w2: window(mode, Window::W2, Window::W2),
                        w3: window(mode, Window::W3, Window::W3),
                        w4: window(mode, Window::W4, Window::W4),
                    },
                }
            }
        };
        JtechOutput {
            layout,
            audio_from: self.window_input(self.selected_window),
        }
    }

    // ---- packed representation for BFS enumeration -----------------------

    /// Pack the control-relevant fields into <=19 bits. `window_tv` and
    /// `pip_location_by_tv` are excluded: enumeration explores the pure
    /// control FSM, not the TV-to-window assignment.
    pub fn pack(&self) -> u32 {
        let mut bits: u32 = 0;
        bits |= (self.num_active_windows as u32 - 1) & 0b11;
        bits |= ((self.layout_mode == LayoutMode::Fullscreen) as u32) << 2;
        bits |= ((self.multiview_submode == Submode::W1Prominent) as u32) << 3;
        bits |= ((self.fullscreen_mode == FullscreenMode::Pip) as u32) << 4;
        bits |= ((self.full_window.to_int() as u32 - 1) & 0b11) << 5;
        bits |= ((self.pip_window.to_int() as u32 - 1) & 0b11) << 7;
        bits |= ((self.selected_window.to_int() as u32 - 1) & 0b11) << 9;
        bits |= (self.selected_window_has_distinct_border as u32) << 11;
        bits |= ((self.remote_mode == RemoteMode::AppleTv) as u32) << 12;
        let last_button_code = self.last_button.map(|b| b.to_int() as u32 + 1).unwrap_or(0);
        bits |= (last_button_code & 0b1111) << 13;
        bits |= ((self.last_selected_window.to_int() as u32 - 1) & 0b11) << 17;
        bits
    }

    pub fn from_packed(bits: u32) -> MvScreen {
        let mut m = MvScreen::new();
        m.num_active_windows = ((bits & 0b11) + 1) as u8;
        m.layout_mode = if (bits >> 2) & 1 == 1 {
            LayoutMode::Fullscreen
        } else {
            LayoutMode::Multiview
        };
        m.multiview_submode = if (bits >> 3) & 1 == 1 {
            Submode::W1Prominent
        } else {
            Submode::WindowsSame
        };
        m.fullscreen_mode = if (bits >> 4) & 1 == 1 {
            FullscreenMode::Pip
        } else {
            FullscreenMode::Full
        };
        m.full_window = Window::of_int((((bits >> 5) & 0b11) + 1) as u8).unwrap();
        m.pip_window = Window::of_int((((bits >> 7) & 0b11) + 1) as u8).unwrap();
        m.selected_window = Window::of_int((((bits >> 9) & 0b11) + 1) as u8).unwrap();
        m.selected_window_has_distinct_border = (bits >> 11) & 1 == 1;
        m.remote_mode = if (bits >> 12) & 1 == 1 {
            RemoteMode::AppleTv
        } else {
            RemoteMode::Multiviewer
        };
        let lb = (bits >> 13) & 0b1111;
        m.last_button = if lb == 0 {
            None
        } else {
            Button::of_int((lb - 1) as u8)
        };
        m.last_selected_window = Window::of_int((((bits >> 17) & 0b11) + 1) as u8).unwrap();
        m
    }
}

impl Default for MvScreen {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tv_do(screen: &mut MvScreen, buttons: &[Button]) {
        for &b in buttons {
            screen.pressed(b);
            screen.validate().expect("invariant violated");
        }
    }

    /// `Double X`: two presses of the same button with nothing advancing
    /// the clock between them, so the second lands inside the window.
    fn double_tap(screen: &mut MvScreen, button: Button) -> Option<u8> {
        screen.pressed(button);
        screen.pressed(button)
    }

    #[test]
    fn reset_is_quad_w1_prominent() {
        let screen = MvScreen::new();
        assert_eq!(
            screen.render().one_line_description(),
            "QUAD(2) A1 [H1]G [H2]A [H3]A [H4]A"
        );
    }

    #[test]
    fn select_then_back_round_trips_to_quad() {
        let mut screen = MvScreen::new();
        tv_do(&mut screen, &[Button::Select]);
        assert_eq!(screen.render().one_line_description(), "FULL A1 H1");
        tv_do(&mut screen, &[Button::Back]);
        assert_eq!(
            screen.render().one_line_description(),
            "QUAD(2) A1 [H1]G [H2]A [H3]A [H4]A"
        );
    }

    #[test]
    fn play_pause_toggles_border_only() {
        let mut screen = MvScreen::new();
        tv_do(&mut screen, &[Button::PlayPause]);
        assert_eq!(
            screen.render().one_line_description(),
            "QUAD(2) A1 [H1]A [H2]A [H3]A [H4]A"
        );
    }

    #[test]
    fn pip_navigation_and_back() {
        let mut screen = MvScreen::new();
        tv_do(&mut screen, &[Button::Select, Button::ToggleSubmode]);
        assert_eq!(screen.render().one_line_description(), "PIP(NE) A1 H1 [H2]A");
        tv_do(&mut screen, &[Button::ArrowN]);
        assert_eq!(screen.render().one_line_description(), "PIP(NE) A2 H1 [H2]G");
        tv_do(&mut screen, &[Button::Back]);
        assert_eq!(
            screen.render().one_line_description(),
            "QUAD(2) A2 [H2]G [H1]A [H3]A [H4]A"
        );
    }

    #[test]
    fn remote_single_tap_returns_none_double_tap_returns_tv() {
        let mut screen = MvScreen::new();
        assert_eq!(screen.pressed(Button::Remote), None);
        assert_eq!(screen.remote_mode, RemoteMode::AppleTv);
    }

    #[test]
    fn remote_double_tap_returns_selected_tv_code() {
        let mut screen = MvScreen::new();
        assert_eq!(double_tap(&mut screen, Button::Remote), Some(1));
        tv_do(&mut screen, &[Button::ArrowE]);
        assert_eq!(double_tap(&mut screen, Button::Remote), Some(3));
        assert_eq!(screen.pressed(Button::Remote), None);
    }

    #[test]
    fn pip_corner_via_double_tap() {
        let mut screen = MvScreen::new();
        tv_do(&mut screen, &[Button::Select, Button::ToggleSubmode]);
        double_tap(&mut screen, Button::ArrowW);
        screen.validate().expect("invariant violated");
        assert_eq!(screen.render().one_line_description(), "PIP(NW) A1 H1 [H2]A");
        tv_do(&mut screen, &[Button::Select]);
        assert_eq!(screen.render().one_line_description(), "PIP(NE) A2 H2 [H1]A");
    }

    #[test]
    fn pack_unpack_round_trips_control_fields() {
        let mut screen = MvScreen::new();
        tv_do(&mut screen, &[Button::Select, Button::ToggleSubmode]);
        let bits = screen.pack();
        assert!(bits < (1 << 19));
        let hydrated = MvScreen::from_packed(bits);
        assert_eq!(hydrated.pack(), bits);
    }

    #[test]
    fn deactivate_tv_forces_fullscreen_when_last_one_remains() {
        let mut screen = MvScreen::new();
        tv_do(
            &mut screen,
            &[
                Button::DeactivateTvFirst,
                Button::DeactivateTvFirst,
                Button::DeactivateTvFirst,
            ],
        );
        assert_eq!(screen.num_active_windows, 1);
        assert_eq!(screen.layout_mode, LayoutMode::Fullscreen);
        assert_eq!(screen.fullscreen_mode, FullscreenMode::Full);
    }
}
