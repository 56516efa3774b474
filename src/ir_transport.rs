//! IR-over-IP volume bridge (a second, physically distinct iTach unit from
//! the matrix). Fires fixed IR pulses and waits for an acknowledgement
//! line; each send is followed by a short settle delay since back-to-back
//! IR pulses are unreliable on real hardware.

use tokio::time::{sleep, Duration};

use crate::config::Config;
use crate::error::MvResult;
use crate::matrix::line_client::LineClient;

// Opaque GlobalCache iTach `sendir` payloads for this installation's IR
// codes. The exact byte contents are device-specific; only their shape
// (a `sendir,<module>:<connector>,<id>,<freq>,<repeat>,<offset>,<pattern>`
// line) is part of the contract.
const IR_VOLUME_UP: &str =
    "sendir,1:1,1,38000,1,1,347,172,22,22,22,22,22,65,22,22,22,22,22,22,22,22,22,22,22,22,22,65,22,65,22,65,22,65,22,65,22,65,22,65,22,1517";
const IR_VOLUME_DOWN: &str =
    "sendir,1:1,1,38000,1,1,347,172,22,22,22,22,22,65,22,22,22,22,22,22,22,22,22,22,22,65,22,22,22,65,22,65,22,65,22,65,22,65,22,65,22,1517";
const IR_MUTE: &str =
    "sendir,1:1,1,38000,1,1,347,172,22,22,22,22,22,65,22,22,22,22,22,22,22,22,22,65,22,22,22,65,22,65,22,65,22,65,22,65,22,65,22,1517";

const SETTLE_DELAY: Duration = Duration::from_millis(250);

async fn send(config: &Config, payload: &str) -> MvResult<()> {
    let mut client = LineClient::connect(&config.ir_bridge_host, config.ir_bridge_port).await?;
    client.write_line(payload).await?;
    let _ = client.read_line().await;
    client.close().await;
    sleep(SETTLE_DELAY).await;
    Ok(())
}

pub async fn volume_up(config: &Config) -> MvResult<()> {
    send(config, IR_VOLUME_UP).await
}

pub async fn volume_down(config: &Config) -> MvResult<()> {
    send(config, IR_VOLUME_DOWN).await
}

pub async fn mute(config: &Config) -> MvResult<()> {
    send(config, IR_MUTE).await
}
