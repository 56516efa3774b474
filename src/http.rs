//! HTTP ingress: a single `POST /` accepting `{"command":"<words>"}`, and a
//! bare `GET /` liveness check. `tiny_http`'s server loop is blocking, so it
//! runs on its own thread and forwards each request across a channel into
//! the async runtime that owns the orchestrator.

use std::io::Read as _;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tiny_http::{Method, Response, Server};
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::error::{MvError, MvResult};
use crate::mv_screen::Button;
use crate::orchestrator::{Command, Multiviewer};

#[derive(Deserialize)]
struct CommandBody {
    command: String,
}

enum Job {
    Run(Vec<String>),
    Info,
}

struct Inbound {
    job: Job,
    reply: oneshot::Sender<Value>,
}

pub fn spawn(config: &Config, mv: Arc<Multiviewer>) -> MvResult<()> {
    let addr = format!("{}:{}", config.http_host, config.http_port);
    let server =
        Server::http(&addr).map_err(|e| MvError::Config(format!("cannot bind http on {addr}: {e}")))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<Inbound>();

    std::thread::spawn(move || {
        for mut request in server.incoming_requests() {
            if request.method() == &Method::Get {
                let _ = request.respond(json_response(200, json!({})));
                continue;
            }

            let mut raw = String::new();
            if request.as_reader().read_to_string(&mut raw).is_err() {
                let _ = request.respond(bad_request());
                continue;
            }
            let words = match parse_words(&raw) {
                Some(words) => words,
                None => {
                    let _ = request.respond(bad_request());
                    continue;
                }
            };

            let job = if words.first().map(String::as_str) == Some("Info") {
                Job::Info
            } else {
                Job::Run(words)
            };

            let (reply_tx, reply_rx) = oneshot::channel();
            if tx.send(Inbound { job, reply: reply_tx }).is_err() {
                let _ = request.respond(json_response(503, json!({})));
                continue;
            }
            let body = reply_rx.blocking_recv().unwrap_or_else(|_| json!({}));
            let _ = request.respond(json_response(200, body));
        }
    });

    tokio::spawn(async move {
        while let Some(inbound) = rx.recv().await {
            let body = match inbound.job {
                Job::Info => json!(mv.info().await),
                Job::Run(words) => run_words(&mv, &words).await,
            };
            let _ = inbound.reply.send(body);
        }
    });

    log::info!("http ingress listening on {addr}");
    Ok(())
}

fn parse_words(raw: &str) -> Option<Vec<String>> {
    let body: CommandBody = serde_json::from_str(raw).ok()?;
    let words: Vec<String> = body.command.split_whitespace().map(str::to_string).collect();
    if words.is_empty() {
        return None;
    }
    Some(words)
}

const ATV_ONLY_NOOP_VERBS: [&str; 5] = ["Launch", "Screensaver", "Sleep", "Test", "Wake"];

async fn run_words(mv: &Multiviewer, words: &[String]) -> Value {
    if words.first().map(String::as_str).is_some_and(|v| ATV_ONLY_NOOP_VERBS.contains(&v)) {
        return json!({});
    }
    let Some(command) = parse_command(words) else {
        log::warn!("invalid command: {}", words.join(" "));
        return json!({});
    };
    match mv.do_command(command).await {
        Ok(Some(tv_code)) => json!(tv_code),
        Ok(None) => json!({}),
        Err(e) => {
            log::warn!("command {} failed: {e}", words.join(" "));
            json!({})
        }
    }
}

/// Maps a verb (plus any trailing words) onto an orchestrator command.
/// Verbs belonging to the abstract STB/ATV remote surface that this
/// implementation does not drive directly (`Launch`, `Screensaver`,
/// `Sleep`, `Wake`, `Test`) are accepted but are no-ops, matching how the
/// multiview FSM ignores them outside of `AppleTv` mode. `Power`/
/// `Power_on` do drive real state: they toggle/restore the matrix's own
/// power, gating every other command while it's off.
fn parse_command(words: &[String]) -> Option<Command> {
    let verb = words.first()?.as_str();
    Some(match verb {
        "Activate_tv" => Command::Button(Button::ActivateTv),
        "Back" => Command::Button(Button::Back),
        // The original's default (outside a screensaver) is FIRST; the
        // screensaver-aware LAST path isn't reachable from this verb.
        "Deactivate_tv" => Command::Button(Button::DeactivateTvFirst),
        "Down" | "S" => Command::Button(Button::ArrowS),
        "Home" => Command::Button(Button::ToggleSubmode),
        "Left" | "W" => Command::Button(Button::ArrowW),
        "Mute" => Command::ToggleMute,
        "Play_pause" => Command::Button(Button::PlayPause),
        "Power" => Command::Power,
        "Power_on" => Command::PowerOn,
        "Remote" => Command::Button(Button::Remote),
        "Reset" => Command::Reset,
        "Right" | "E" => Command::Button(Button::ArrowE),
        "Select" => Command::Button(Button::Select),
        "Up" | "N" => Command::Button(Button::ArrowN),
        "Volume_down" => Command::VolumeDown,
        "Volume_up" => Command::VolumeUp,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivate_tv_defaults_to_first() {
        let words = vec!["Deactivate_tv".to_string()];
        assert!(matches!(
            parse_command(&words),
            Some(Command::Button(Button::DeactivateTvFirst))
        ));
    }

    #[test]
    fn power_verbs_are_no_longer_atv_only_noops() {
        assert!(!ATV_ONLY_NOOP_VERBS.contains(&"Power"));
        assert!(!ATV_ONLY_NOOP_VERBS.contains(&"Power_on"));
        let power = vec!["Power".to_string()];
        let power_on = vec!["Power_on".to_string()];
        assert!(matches!(parse_command(&power), Some(Command::Power)));
        assert!(matches!(parse_command(&power_on), Some(Command::PowerOn)));
    }
}

fn bad_request() -> Response<std::io::Cursor<Vec<u8>>> {
    json_response(400, json!("bad request"))
}

fn json_response(status: u16, body: Value) -> Response<std::io::Cursor<Vec<u8>>> {
    let bytes = serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec());
    Response::from_data(bytes)
        .with_status_code(status)
        .with_header(
            tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("static header is valid"),
        )
}
