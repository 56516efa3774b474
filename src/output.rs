//! A single immutable frame of the matrix: which layout it's in, what each
//! window shows, and where the audio comes from.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::jtech::{Color, Hdmi, Mode, PipLocation, Submode, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowContents {
    pub hdmi: Hdmi,
    pub border: Option<Color>,
}

impl WindowContents {
    pub fn new(hdmi: Hdmi, border: Option<Color>) -> Self {
        Self { hdmi, border }
    }
}

impl fmt::Display for WindowContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.border {
            Some(c) => write!(f, "[{}]{}", self.hdmi, c.letter()),
            None => write!(f, "{}", self.hdmi),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    Full {
        w1: WindowContents,
    },
    Pip {
        pip_location: PipLocation,
        w1: WindowContents,
        w2: WindowContents,
    },
    Pbp {
        submode: Submode,
        w1: WindowContents,
        w2: WindowContents,
    },
    Triple {
        submode: Submode,
        w1: WindowContents,
        w2: WindowContents,
        w3: WindowContents,
    },
    Quad {
        submode: Submode,
        w1: WindowContents,
        w2: WindowContents,
        w3: WindowContents,
        w4: WindowContents,
    },
}

impl Layout {
    pub fn mode(&self) -> Mode {
        match self {
            Layout::Full { .. } => Mode::Full,
            Layout::Pip { .. } => Mode::Pip,
            Layout::Pbp { .. } => Mode::Pbp,
            Layout::Triple { .. } => Mode::Triple,
            Layout::Quad { .. } => Mode::Quad,
        }
    }

    pub fn submode(&self) -> Option<Submode> {
        match self {
            Layout::Pbp { submode, .. }
            | Layout::Triple { submode, .. }
            | Layout::Quad { submode, .. } => Some(*submode),
            Layout::Full { .. } | Layout::Pip { .. } => None,
        }
    }

    pub fn pip_location(&self) -> Option<PipLocation> {
        match self {
            Layout::Pip { pip_location, .. } => Some(*pip_location),
            _ => None,
        }
    }

    pub fn windows(&self) -> Vec<(Window, WindowContents)> {
        match *self {
            Layout::Full { w1 } => vec![(Window::W1, w1)],
            Layout::Pip { w1, w2, .. } => vec![(Window::W1, w1), (Window::W2, w2)],
            Layout::Pbp { w1, w2, .. } => vec![(Window::W1, w1), (Window::W2, w2)],
            Layout::Triple { w1, w2, w3, .. } => {
                vec![(Window::W1, w1), (Window::W2, w2), (Window::W3, w3)]
            }
            Layout::Quad {
                w1, w2, w3, w4, ..
            } => vec![
                (Window::W1, w1),
                (Window::W2, w2),
                (Window::W3, w3),
                (Window::W4, w4),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JtechOutput {
    pub layout: Layout,
    pub audio_from: Hdmi,
}

impl JtechOutput {
    /// Canonical one-line form used in logs and tests, e.g.
    /// `QUAD(2) A1 [H1]G [H2]A [H3]A [H4]A`.
    pub fn one_line_description(&self) -> String {
        let mode_name = match self.layout.mode() {
            Mode::Full => "FULL",
            Mode::Pip => "PIP",
            Mode::Pbp => "PBP",
            Mode::Triple => "TRIPLE",
            Mode::Quad => "QUAD",
        };
        let paren = if let Some(loc) = self.layout.pip_location() {
            let name = match loc {
                PipLocation::Nw => "NW",
                PipLocation::Ne => "NE",
                PipLocation::Sw => "SW",
                PipLocation::Se => "SE",
            };
            format!("({name})")
        } else if let Some(sub) = self.layout.submode() {
            format!("({})", sub.to_int())
        } else {
            String::new()
        };
        let windows: Vec<String> = self
            .layout
            .windows()
            .into_iter()
            .map(|(_, c)| c.to_string())
            .collect();
        format!(
            "{mode_name}{paren} A{} {}",
            self.audio_from.to_int(),
            windows.join(" ")
        )
    }
}

impl fmt::Display for JtechOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.one_line_description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_one_line_description() {
        let out = JtechOutput {
            layout: Layout::Quad {
                submode: Submode::W1Prominent,
                w1: WindowContents::new(Hdmi::H1, Some(Color::Green)),
                w2: WindowContents::new(Hdmi::H2, Some(Color::Gray)),
                w3: WindowContents::new(Hdmi::H3, Some(Color::Gray)),
                w4: WindowContents::new(Hdmi::H4, Some(Color::Gray)),
            },
            audio_from: Hdmi::H1,
        };
        assert_eq!(
            out.one_line_description(),
            "QUAD(2) A1 [H1]G [H2]A [H3]A [H4]A"
        );
    }

    #[test]
    fn pip_one_line_description() {
        let out = JtechOutput {
            layout: Layout::Pip {
                pip_location: PipLocation::Ne,
                w1: WindowContents::new(Hdmi::H1, None),
                w2: WindowContents::new(Hdmi::H2, Some(Color::Gray)),
            },
            audio_from: Hdmi::H1,
        };
        assert_eq!(out.one_line_description(), "PIP(NE) A1 H1 [H2]A");
    }
}
