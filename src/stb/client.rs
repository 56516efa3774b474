//! Line-protocol client for a single set-top box. Separate TCP connection
//! per command — STB actions are infrequent enough that holding a
//! persistent connection isn't worth the reconnect-on-drop complexity the
//! matrix driver needs.

use crate::error::MvResult;
use crate::matrix::line_client::LineClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StbAction {
    PowerOn,
    PowerOff,
}

impl StbAction {
    fn wire_command(self) -> &'static str {
        match self {
            StbAction::PowerOn => "power on",
            StbAction::PowerOff => "power off",
        }
    }
}

pub struct StbClient {
    host: String,
    port: u16,
}

impl StbClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub async fn send(&self, action: StbAction) -> MvResult<()> {
        let mut client = LineClient::connect(&self.host, self.port).await?;
        client.send_command(action.wire_command()).await?;
        client.close().await;
        Ok(())
    }
}
