//! Closed-set enums and wire-protocol tables for the matrix device.
//!
//! Each enum carries an explicit `to_int`/`of_int` codec instead of relying
//! on enum-subclassing tricks — the codec is the Rust translation of the
//! original's `attach_int()` helper.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Power {
    Off,
    On,
}

impl Power {
    pub fn to_int(self) -> u8 {
        match self {
            Power::Off => 0,
            Power::On => 1,
        }
    }

    pub fn of_int(n: u8) -> Option<Power> {
        match n {
            0 => Some(Power::Off),
            1 => Some(Power::On),
            _ => None,
        }
    }
}

impl Default for Power {
    fn default() -> Self {
        Power::On
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mute {
    Unmuted,
    Muted,
}

impl Mute {
    pub fn to_int(self) -> u8 {
        match self {
            Mute::Unmuted => 0,
            Mute::Muted => 1,
        }
    }

    pub fn of_int(n: u8) -> Option<Mute> {
        match n {
            0 => Some(Mute::Unmuted),
            1 => Some(Mute::Muted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hdmi {
    H1,
    H2,
    H3,
    H4,
}

impl Hdmi {
    pub const ALL: [Hdmi; 4] = [Hdmi::H1, Hdmi::H2, Hdmi::H3, Hdmi::H4];

    pub fn to_int(self) -> u8 {
        match self {
            Hdmi::H1 => 1,
            Hdmi::H2 => 2,
            Hdmi::H3 => 3,
            Hdmi::H4 => 4,
        }
    }

    pub fn of_int(n: u8) -> Option<Hdmi> {
        match n {
            1 => Some(Hdmi::H1),
            2 => Some(Hdmi::H2),
            3 => Some(Hdmi::H3),
            4 => Some(Hdmi::H4),
            _ => None,
        }
    }
}

impl std::fmt::Display for Hdmi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "H{}", self.to_int())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    W1,
    W2,
    W3,
    W4,
}

impl Window {
    pub const ALL: [Window; 4] = [Window::W1, Window::W2, Window::W3, Window::W4];

    pub fn to_int(self) -> u8 {
        match self {
            Window::W1 => 1,
            Window::W2 => 2,
            Window::W3 => 3,
            Window::W4 => 4,
        }
    }

    pub fn of_int(n: u8) -> Option<Window> {
        match n {
            1 => Some(Window::W1),
            2 => Some(Window::W2),
            3 => Some(Window::W3),
            4 => Some(Window::W4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Submode {
    WindowsSame,
    W1Prominent,
}

impl Submode {
    pub fn flip(self) -> Submode {
        match self {
            Submode::WindowsSame => Submode::W1Prominent,
            Submode::W1Prominent => Submode::WindowsSame,
        }
    }

    pub fn to_int(self) -> u8 {
        match self {
            Submode::WindowsSame => 1,
            Submode::W1Prominent => 2,
        }
    }

    pub fn of_int(n: u8) -> Option<Submode> {
        match n {
            1 => Some(Submode::WindowsSame),
            2 => Some(Submode::W1Prominent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipLocation {
    Nw,
    Ne,
    Sw,
    Se,
}

impl PipLocation {
    /// Top-left corner of the 19x19 PIP box for this location on the
    /// matrix's 100x100 positioning grid.
    pub fn hstart_vstart(self) -> (u8, u8) {
        match self {
            PipLocation::Nw => (3, 3),
            PipLocation::Ne => (80, 3),
            PipLocation::Sw => (3, 80),
            PipLocation::Se => (80, 80),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Black,
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
    Cyan,
    White,
    Gray,
}

impl Color {
    pub fn to_int(self) -> u8 {
        match self {
            Color::Black => 1,
            Color::Red => 2,
            Color::Green => 3,
            Color::Blue => 4,
            Color::Yellow => 5,
            Color::Magenta => 6,
            Color::Cyan => 7,
            Color::White => 8,
            Color::Gray => 9,
        }
    }

    pub fn of_int(n: u8) -> Option<Color> {
        match n {
            1 => Some(Color::Black),
            2 => Some(Color::Red),
            3 => Some(Color::Green),
            4 => Some(Color::Blue),
            5 => Some(Color::Yellow),
            6 => Some(Color::Magenta),
            7 => Some(Color::Cyan),
            8 => Some(Color::White),
            9 => Some(Color::Gray),
            _ => None,
        }
    }

    /// Name as the device prints it, e.g. `window 1 border color:GREEN`.
    pub fn wire_name(self) -> &'static str {
        match self {
            Color::Black => "BLACK",
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Blue => "BLUE",
            Color::Yellow => "YELLOW",
            Color::Magenta => "MAGENTA",
            Color::Cyan => "CYAN",
            Color::White => "WHITE",
            Color::Gray => "GRAY",
        }
    }

    pub fn of_wire_name(s: &str) -> Option<Color> {
        match s.to_ascii_uppercase().as_str() {
            "BLACK" => Some(Color::Black),
            "RED" => Some(Color::Red),
            "GREEN" => Some(Color::Green),
            "BLUE" => Some(Color::Blue),
            "YELLOW" => Some(Color::Yellow),
            "MAGENTA" => Some(Color::Magenta),
            "CYAN" => Some(Color::Cyan),
            "WHITE" => Some(Color::White),
            "GRAY" => Some(Color::Gray),
            _ => None,
        }
    }

    /// One-letter abbreviation used in the canonical one-line rendering.
    pub fn letter(self) -> char {
        match self {
            Color::Black => 'K',
            Color::Red => 'R',
            Color::Green => 'G',
            Color::Blue => 'B',
            Color::Yellow => 'Y',
            Color::Magenta => 'M',
            Color::Cyan => 'C',
            Color::White => 'W',
            Color::Gray => 'A',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Full,
    Pip,
    Pbp,
    Triple,
    Quad,
}

impl Mode {
    pub fn to_int(self) -> u8 {
        match self {
            Mode::Full => 1,
            Mode::Pip => 2,
            Mode::Pbp => 3,
            Mode::Triple => 4,
            Mode::Quad => 5,
        }
    }

    pub fn of_int(n: u8) -> Option<Mode> {
        match n {
            1 => Some(Mode::Full),
            2 => Some(Mode::Pip),
            3 => Some(Mode::Pbp),
            4 => Some(Mode::Triple),
            5 => Some(Mode::Quad),
            _ => None,
        }
    }

    pub fn has_submode(self) -> bool {
        matches!(self, Mode::Pbp | Mode::Triple | Mode::Quad)
    }

    pub fn num_windows(self) -> u8 {
        match self {
            Mode::Full => 1,
            Mode::Pip => 2,
            Mode::Pbp => 2,
            Mode::Triple => 3,
            Mode::Quad => 4,
        }
    }

    pub fn windows(self) -> Vec<Window> {
        Window::ALL[..self.num_windows() as usize].to_vec()
    }

    /// The wire command word for setting/reading this mode's submode,
    /// e.g. `s PBP mode 1!`. `None` for modes without a submode.
    pub fn name_for_submode_command(self) -> Option<&'static str> {
        match self {
            Mode::Pbp => Some("PBP"),
            Mode::Triple => Some("triple"),
            Mode::Quad => Some("quad"),
            _ => None,
        }
    }

    pub fn window_has_border(self, w: Window) -> bool {
        match self {
            Mode::Full => false,
            Mode::Pip => w == Window::W2,
            Mode::Pbp | Mode::Triple | Mode::Quad => true,
        }
    }

    /// The `r multiview!` / `s multiview <n>!` response text.
    pub fn multiview_name(self) -> &'static str {
        match self {
            Mode::Full => "single screen",
            Mode::Pip => "PIP",
            Mode::Pbp => "PBP",
            Mode::Triple => "triple screen",
            Mode::Quad => "quad screen",
        }
    }

    pub fn of_multiview_name(s: &str) -> Option<Mode> {
        match s {
            "single screen" => Some(Mode::Full),
            "PIP" => Some(Mode::Pip),
            "PBP" => Some(Mode::Pbp),
            "triple screen" => Some(Mode::Triple),
            "quad screen" => Some(Mode::Quad),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_int_round_trips() {
        for m in [Mode::Full, Mode::Pip, Mode::Pbp, Mode::Triple, Mode::Quad] {
            assert_eq!(Mode::of_int(m.to_int()), Some(m));
            assert_eq!(Mode::of_multiview_name(m.multiview_name()), Some(m));
        }
    }

    #[test]
    fn pip_only_w2_has_border() {
        assert!(!Mode::Pip.window_has_border(Window::W1));
        assert!(Mode::Pip.window_has_border(Window::W2));
    }

    #[test]
    fn color_wire_name_round_trips() {
        for c in [
            Color::Black,
            Color::Red,
            Color::Green,
            Color::Blue,
            Color::Yellow,
            Color::Magenta,
            Color::Cyan,
            Color::White,
            Color::Gray,
        ] {
            assert_eq!(Color::of_wire_name(c.wire_name()), Some(c));
        }
    }
}
