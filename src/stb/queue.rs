//! Per-STB action queue. The FSM layer enqueues fire-and-forget; a
//! background worker executes in order, retries once on failure, and
//! drops the action (with a log line) rather than block the queue on a
//! wedged box.

use tokio::sync::mpsc;

use crate::stb::client::{StbAction, StbClient};

const MAX_ATTEMPTS: u32 = 2;

pub struct StbQueue {
    tx: mpsc::UnboundedSender<StbAction>,
}

impl StbQueue {
    pub fn spawn(client: StbClient) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<StbAction>();
        tokio::spawn(async move {
            while let Some(action) = rx.recv().await {
                let mut attempt = 0;
                loop {
                    attempt += 1;
                    match client.send(action).await {
                        Ok(()) => break,
                        Err(e) if attempt < MAX_ATTEMPTS => {
                            log::warn!(
                                "stb action {action:?} failed (attempt {attempt}/{MAX_ATTEMPTS}): {e}, retrying"
                            );
                        }
                        Err(e) => {
                            log::warn!(
                                "stb action {action:?} dropped after {attempt} attempts: {e}"
                            );
                            break;
                        }
                    }
                }
            }
        });
        Self { tx }
    }

    pub fn enqueue(&self, action: StbAction) {
        let _ = self.tx.send(action);
    }
}
