//! Typed command/response driver for the matrix.
//!
//! All commands are request/response with an exact-string-match contract;
//! any unexpected response is a `MvError::Protocol` and is fatal to the
//! current sync cycle (the matrix manager resets and starts over). Device
//! belief is cached **per mode** — `Jtech.mode_screens` in the original
//! keeps window-input/submode state independently for each `Mode`, so a
//! window's remembered HDMI input in PBP is not assumed to equal its input
//! in QUAD. This has not been re-verified against real hardware; if the
//! device turns out to alias window-input state across modes, `Belief`
//! is the place to change.

use std::collections::HashMap;

use crate::error::{MvError, MvResult};
use crate::jtech::{Color, Hdmi, Mode, PipLocation, Submode, Window};
use crate::matrix::line_client::LineClient;
use crate::output::{JtechOutput, Layout, WindowContents};

#[derive(Debug, Default)]
struct ModeScreen {
    submode: Option<Submode>,
    window_input: HashMap<Window, Option<Hdmi>>,
    window_border: HashMap<Window, Option<bool>>,
    window_border_color: HashMap<Window, Option<Color>>,
}

#[derive(Debug, Default)]
struct Belief {
    power: Option<crate::jtech::Power>,
    mode: Option<Mode>,
    mode_screens: HashMap<Mode, ModeScreen>,
    pip_location: Option<PipLocation>,
    audio_from: Option<Hdmi>,
    audio_mute: Option<crate::jtech::Mute>,
}

pub struct MatrixDriver {
    host: String,
    port: u16,
    client: Option<LineClient>,
    belief: Belief,
}

impl MatrixDriver {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client: None,
            belief: Belief::default(),
        }
    }

    /// Drop the connection and forget all belief. The manager calls this
    /// after any protocol-level failure.
    pub fn reset(&mut self) {
        self.client = None;
        self.belief = Belief::default();
    }

    async fn ensure_connected(&mut self) -> MvResult<()> {
        if self.client.is_some() {
            return Ok(());
        }
        let client = LineClient::connect(&self.host, self.port).await?;
        self.client = Some(client);
        self.resync().await
    }

    /// `get_connection`'s sync step: drain whatever the device is saying
    /// until it reports a clean power state.
    async fn resync(&mut self) -> MvResult<()> {
        loop {
            let resp = self.send("r power!").await?;
            match resp.as_str() {
                "power on" => {
                    self.belief.power = Some(crate::jtech::Power::On);
                    return Ok(());
                }
                "power off" => {
                    self.belief.power = Some(crate::jtech::Power::Off);
                    return Ok(());
                }
                _ => continue,
            }
        }
    }

    async fn send(&mut self, cmd: &str) -> MvResult<String> {
        let client = self
            .client
            .as_mut()
            .ok_or_else(|| MvError::Protocol("not connected".into()))?;
        client
            .send_command(cmd)
            .await?
            .ok_or_else(|| MvError::Timeout(format!("no response to `{cmd}`")))
    }

    pub async fn read_power(&mut self) -> MvResult<crate::jtech::Power> {
        self.ensure_connected().await?;
        let resp = self.send("r power!").await?;
        let power = match resp.as_str() {
            "power on" => crate::jtech::Power::On,
            "power off" => crate::jtech::Power::Off,
            other => return Err(MvError::Protocol(format!("unexpected power reply: {other}"))),
        };
        self.belief.power = Some(power);
        Ok(power)
    }

    pub async fn set_power(&mut self, power: crate::jtech::Power) -> MvResult<()> {
        self.ensure_connected().await?;
        self.belief.power = None;
        if self.read_power().await? == power {
            return Ok(());
        }
        self.send(&format!("power {}!", power.to_int())).await?;
        if power == crate::jtech::Power::On {
            self.client
                .as_mut()
                .ok_or_else(|| MvError::Protocol("not connected".into()))?
                .read_until_line("Initialization Finished!")
                .await?;
            self.resync().await?;
        }
        let actual = self.read_power().await?;
        if actual != power {
            return Err(MvError::Protocol("power did not take effect".into()));
        }
        Ok(())
    }

    pub async fn read_mode(&mut self) -> MvResult<Mode> {
        self.ensure_connected().await?;
        let resp = self.send("r multiview!").await?;
        let mode = Mode::of_multiview_name(&resp)
            .ok_or_else(|| MvError::Protocol(format!("unknown multiview mode: {resp}")))?;
        self.belief.mode = Some(mode);
        Ok(mode)
    }

    pub async fn set_mode(&mut self, mode: Mode) -> MvResult<()> {
        self.ensure_connected().await?;
        self.belief.mode = None;
        let resp = self.send(&format!("s multiview {}!", mode.to_int())).await?;
        if resp != mode.multiview_name() {
            return Err(MvError::Protocol(format!("mode set echoed: {resp}")));
        }
        self.belief.mode = Some(mode);
        Ok(())
    }

    pub async fn read_submode(&mut self, mode: Mode) -> MvResult<Option<Submode>> {
        let Some(name) = mode.name_for_submode_command() else {
            return Ok(None);
        };
        self.ensure_connected().await?;
        let resp = self.send(&format!("r {name} mode!")).await?;
        let submode = parse_submode(&resp)?;
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .submode = Some(submode);
        Ok(Some(submode))
    }

    pub async fn set_submode(&mut self, mode: Mode, submode: Submode) -> MvResult<()> {
        let Some(name) = mode.name_for_submode_command() else {
            return Ok(());
        };
        self.ensure_connected().await?;
        self.belief.mode_screens.entry(mode).or_default().submode = None;
        let expect = format!("{name} mode {}", submode.to_int());
        let resp = self
            .send(&format!("s {name} mode {}!", submode.to_int()))
            .await?;
        if resp != expect {
            return Err(MvError::Protocol(format!("submode set echoed: {resp}")));
        }
        self.belief.mode_screens.entry(mode).or_default().submode = Some(submode);
        Ok(())
    }

    pub async fn read_window_input(&mut self, mode: Mode, w: Window) -> MvResult<Hdmi> {
        self.ensure_connected().await?;
        let resp = self.send(&format!("r window {} in!", w.to_int())).await?;
        let hdmi = parse_window_input(&resp, w)?;
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_input
            .insert(w, Some(hdmi));
        Ok(hdmi)
    }

    pub async fn set_window_input(&mut self, mode: Mode, w: Window, hdmi: Hdmi) -> MvResult<()> {
        self.ensure_connected().await?;
        let current = self
            .belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_input
            .get(&w)
            .copied()
            .flatten();
        let changing = current != Some(hdmi);
        let holds_audio = mode != Mode::Full && self.belief.audio_from == current;
        if changing && holds_audio {
            self.mute(true).await?;
        }
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_input
            .insert(w, None);
        let expect = format!("window {} select HDMI {}", w.to_int(), hdmi.to_int());
        let resp = self
            .send(&format!("s window {} in {}!", w.to_int(), hdmi.to_int()))
            .await?;
        if resp != expect {
            return Err(MvError::Protocol(format!("window input set echoed: {resp}")));
        }
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_input
            .insert(w, Some(hdmi));
        Ok(())
    }

    pub async fn read_border(&mut self, mode: Mode, w: Window) -> MvResult<bool> {
        self.ensure_connected().await?;
        let resp = self.send(&format!("r window {} border!", w.to_int())).await?;
        let on = match resp.as_str() {
            s if s == format!("window {} border on", w.to_int()) => true,
            s if s == format!("window {} border off", w.to_int()) => false,
            other => return Err(MvError::Protocol(format!("unexpected border reply: {other}"))),
        };
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_border
            .insert(w, Some(on));
        Ok(on)
    }

    pub async fn set_border(&mut self, mode: Mode, w: Window, on: bool) -> MvResult<()> {
        self.ensure_connected().await?;
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_border
            .insert(w, None);
        let expect = format!("window {} border {}", w.to_int(), if on { "on" } else { "off" });
        let resp = self
            .send(&format!("s window {} border {}!", w.to_int(), on as u8))
            .await?;
        if resp != expect {
            return Err(MvError::Protocol(format!("border set echoed: {resp}")));
        }
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_border
            .insert(w, Some(on));
        Ok(())
    }

    pub async fn read_border_color(&mut self, mode: Mode, w: Window) -> MvResult<Color> {
        self.ensure_connected().await?;
        let resp = self
            .send(&format!("r window {} border color!", w.to_int()))
            .await?;
        let name = resp
            .strip_prefix(&format!("window {} border color:", w.to_int()))
            .ok_or_else(|| MvError::Protocol(format!("unexpected border color reply: {resp}")))?;
        let color = Color::of_wire_name(name)
            .ok_or_else(|| MvError::Protocol(format!("unknown color: {name}")))?;
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_border_color
            .insert(w, Some(color));
        Ok(color)
    }

    pub async fn set_border_color(&mut self, mode: Mode, w: Window, color: Color) -> MvResult<()> {
        self.ensure_connected().await?;
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_border_color
            .insert(w, None);
        let expect = format!("window {} border color:{}", w.to_int(), color.wire_name());
        let resp = self
            .send(&format!("s window {} border color {}!", w.to_int(), color.to_int()))
            .await?;
        if resp != expect {
            return Err(MvError::Protocol(format!("border color set echoed: {resp}")));
        }
        self.belief
            .mode_screens
            .entry(mode)
            .or_default()
            .window_border_color
            .insert(w, Some(color));
        Ok(())
    }

    pub async fn read_audio_from(&mut self) -> MvResult<Hdmi> {
        self.ensure_connected().await?;
        let resp = self.send("r output audio!").await?;
        let hdmi = parse_hdmi_anywhere(&resp)
            .ok_or_else(|| MvError::Protocol(format!("unexpected audio-from reply: {resp}")))?;
        self.belief.audio_from = Some(hdmi);
        Ok(hdmi)
    }

    pub async fn set_audio_from(&mut self, hdmi: Hdmi) -> MvResult<()> {
        self.ensure_connected().await?;
        self.belief.audio_from = None;
        let expect = format!("output audio: HDMI {} input audio", hdmi.to_int());
        let resp = self.send(&format!("s output audio {}!", hdmi.to_int())).await?;
        if resp != expect {
            return Err(MvError::Protocol(format!("audio-from set echoed: {resp}")));
        }
        self.belief.audio_from = Some(hdmi);
        Ok(())
    }

    pub async fn read_audio_mute(&mut self) -> MvResult<crate::jtech::Mute> {
        self.ensure_connected().await?;
        let resp = self.send("r output audio mute!").await?;
        let mute = match resp.as_str() {
            "output audio mute: on" => crate::jtech::Mute::Muted,
            "output audio mute: off" => crate::jtech::Mute::Unmuted,
            other => return Err(MvError::Protocol(format!("unexpected mute reply: {other}"))),
        };
        self.belief.audio_mute = Some(mute);
        Ok(mute)
    }

    pub async fn set_audio_mute(&mut self, mute: crate::jtech::Mute) -> MvResult<()> {
        self.ensure_connected().await?;
        self.belief.audio_mute = None;
        let expect = format!(
            "output audio mute: {}",
            if mute == crate::jtech::Mute::Muted {
                "on"
            } else {
                "off"
            }
        );
        let resp = self
            .send(&format!("s output audio mute {}!", mute.to_int()))
            .await?;
        if resp != expect {
            return Err(MvError::Protocol(format!("mute set echoed: {resp}")));
        }
        self.belief.audio_mute = Some(mute);
        Ok(())
    }

    pub async fn mute(&mut self, force: bool) -> MvResult<()> {
        if force || self.belief.audio_mute != Some(crate::jtech::Mute::Muted) {
            self.set_audio_mute(crate::jtech::Mute::Muted).await?;
        }
        Ok(())
    }

    pub async fn unmute(&mut self, force: bool) -> MvResult<()> {
        if force || self.belief.audio_mute != Some(crate::jtech::Mute::Unmuted) {
            self.set_audio_mute(crate::jtech::Mute::Unmuted).await?;
        }
        Ok(())
    }

    pub async fn set_pip_location(&mut self, loc: PipLocation) -> MvResult<()> {
        self.ensure_connected().await?;
        let (hstart, vstart) = loc.hstart_vstart();
        let cmd = format!("s PIP {hstart} {vstart} 19 19!");
        let expect = cmd.trim_end_matches('!');
        let resp = self.send(&cmd).await?;
        if resp != expect {
            return Err(MvError::Protocol(format!("PIP location set echoed: {resp}")));
        }
        self.belief.pip_location = Some(loc);
        Ok(())
    }

    /// Read the whole screen back from the device, returning `None` if
    /// `should_abort` trips at any boundary between device calls.
    pub async fn read_screen<F: Fn() -> bool>(
        &mut self,
        should_abort: F,
    ) -> MvResult<Option<JtechOutput>> {
        let mode = self.read_mode().await?;
        if should_abort() {
            return Ok(None);
        }
        let submode = self.read_submode(mode).await?;
        if should_abort() {
            return Ok(None);
        }
        let audio_from = self.read_audio_from().await?;
        if should_abort() {
            return Ok(None);
        }

        let mut contents: HashMap<Window, WindowContents> = HashMap::new();
        for w in mode.windows() {
            let hdmi = self.read_window_input(mode, w).await?;
            if should_abort() {
                return Ok(None);
            }
            let border = if mode.window_has_border(w) {
                let on = self.read_border(mode, w).await?;
                if should_abort() {
                    return Ok(None);
                }
                if on {
                    let color = self.read_border_color(mode, w).await?;
                    if should_abort() {
                        return Ok(None);
                    }
                    Some(color)
                } else {
                    None
                }
            } else {
                None
            };
            contents.insert(w, WindowContents::new(hdmi, border));
        }

        let pip_location = self.belief.pip_location.unwrap_or(PipLocation::Ne);
        let layout = build_layout(mode, submode, pip_location, &contents)?;
        Ok(Some(JtechOutput { layout, audio_from }))
    }

    /// Converge the device to `desired`, in the canonical order: mode,
    /// PIP location, submode, per-window input, borders on, borders off,
    /// finally audio source + unmute.
    pub async fn set_screen<F: Fn() -> bool>(
        &mut self,
        desired: &JtechOutput,
        should_abort: F,
    ) -> MvResult<bool> {
        let mode = desired.layout.mode();
        if self.belief.mode != Some(mode) {
            self.set_mode(mode).await?;
        }
        if should_abort() {
            return Ok(false);
        }
        if let Some(loc) = desired.layout.pip_location() {
            self.set_pip_location(loc).await?;
        }
        if should_abort() {
            return Ok(false);
        }
        if let Some(submode) = desired.layout.submode() {
            self.set_submode(mode, submode).await?;
        }
        if should_abort() {
            return Ok(false);
        }

        let windows = desired.layout.windows();
        for (w, contents) in &windows {
            self.set_window_input(mode, *w, contents.hdmi).await?;
            if should_abort() {
                return Ok(false);
            }
        }
        for (w, contents) in &windows {
            if let Some(color) = contents.border {
                self.mute(false).await?;
                self.set_border(mode, *w, true).await?;
                self.set_border_color(mode, *w, color).await?;
                if should_abort() {
                    return Ok(false);
                }
            }
        }
        for (w, contents) in &windows {
            if contents.border.is_none() && mode.window_has_border(*w) {
                self.set_border(mode, *w, false).await?;
                if should_abort() {
                    return Ok(false);
                }
            }
        }

        self.set_audio_from(desired.audio_from).await?;
        self.unmute(true).await?;
        Ok(true)
    }
}

fn build_layout(
    mode: Mode,
    submode: Option<Submode>,
    pip_location: PipLocation,
    contents: &HashMap<Window, WindowContents>,
) -> MvResult<Layout> {
    let get = |w: Window| {
        contents
            .get(&w)
            .copied()
            .ok_or_else(|| MvError::Protocol(format!("missing window {w:?} contents")))
    };
    Ok(match mode {
        Mode::Full => Layout::Full { w1: get(Window::W1)? },
        Mode::Pip => Layout::Pip {
            pip_location,
            w1: get(Window::W1)?,
            w2: get(Window::W2)?,
        },
        Mode::Pbp => Layout::Pbp {
            submode: submode.unwrap_or(Submode::WindowsSame),
            w1: get(Window::W1)?,
            w2: get(Window::W2)?,
        },
        Mode::Triple => Layout::Triple {
            submode: submode.unwrap_or(Submode::WindowsSame),
            w1: get(Window::W1)?,
            w2: get(Window::W2)?,
            w3: get(Window::W3)?,
        },
        Mode::Quad => Layout::Quad {
            submode: submode.unwrap_or(Submode::WindowsSame),
            w1: get(Window::W1)?,
            w2: get(Window::W2)?,
            w3: get(Window::W3)?,
            w4: get(Window::W4)?,
        },
    })
}

fn parse_submode(resp: &str) -> MvResult<Submode> {
    let n = resp
        .rsplit(' ')
        .next()
        .and_then(|s| s.parse::<u8>().ok())
        .ok_or_else(|| MvError::Protocol(format!("unexpected submode reply: {resp}")))?;
    Submode::of_int(n).ok_or_else(|| MvError::Protocol(format!("unknown submode code: {n}")))
}

fn parse_window_input(resp: &str, w: Window) -> MvResult<Hdmi> {
    let prefix = format!("window {} select HDMI ", w.to_int());
    let rest = resp
        .strip_prefix(&prefix)
        .ok_or_else(|| MvError::Protocol(format!("unexpected window-input reply: {resp}")))?;
    let n: u8 = rest
        .parse()
        .map_err(|_| MvError::Protocol(format!("bad HDMI index in: {resp}")))?;
    Hdmi::of_int(n).ok_or_else(|| MvError::Protocol(format!("bad HDMI index: {n}")))
}

fn parse_hdmi_anywhere(resp: &str) -> Option<Hdmi> {
    let upper = resp.to_ascii_uppercase();
    let idx = upper.find("HDMI")?;
    let rest = upper[idx + 4..].trim_start();
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    Hdmi::of_int(digits.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_window_input_reply() {
        assert_eq!(parse_window_input("window 2 select HDMI 3", Window::W2).unwrap(), Hdmi::H3);
    }

    #[test]
    fn parses_hdmi_case_insensitively() {
        assert_eq!(parse_hdmi_anywhere("output audio: hdmi 4 input audio"), Some(Hdmi::H4));
    }

    #[test]
    fn parses_submode_reply() {
        assert_eq!(parse_submode("quad mode 2").unwrap(), Submode::W1Prominent);
    }
}
