//! Full-duplex, line-oriented TCP client used for both the matrix's
//! control connection and (via `ir_transport`) the IR bridge.
//!
//! Writes are CR-terminated; reads are newline-delimited and ASCII-strict.
//! Every read is timeout-guarded so a caller can make forward progress
//! while the remote end stays silent (the matrix goes quiet for seconds
//! during its own boot sequence).

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Duration;

use crate::error::{MvError, MvResult};

const TERM: &[u8] = b"\r";
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

pub struct LineClient {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
    read_timeout: Duration,
}

impl LineClient {
    pub async fn connect(host: &str, port: u16) -> MvResult<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    pub fn set_read_timeout(&mut self, d: Duration) {
        self.read_timeout = d;
    }

    pub async fn write_line(&mut self, s: &str) -> MvResult<()> {
        if !s.is_ascii() {
            return Err(MvError::Protocol(format!("non-ascii line: {s:?}")));
        }
        self.writer.write_all(s.as_bytes()).await?;
        self.writer.write_all(TERM).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read the next line, stripping the terminator. Returns `None` on
    /// timeout rather than erroring — the caller decides whether silence
    /// is expected.
    pub async fn read_line(&mut self) -> MvResult<Option<String>> {
        let mut buf = String::new();
        match tokio::time::timeout(self.read_timeout, self.reader.read_line(&mut buf)).await {
            Ok(Ok(0)) => Err(MvError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            ))),
            Ok(Ok(_)) => {
                let line = buf.trim_end_matches(['\r', '\n']);
                if !line.is_ascii() {
                    return Err(MvError::Protocol(format!("non-ascii line: {line:?}")));
                }
                Ok(Some(line.to_string()))
            }
            Ok(Err(e)) => Err(MvError::Io(e)),
            Err(_) => Ok(None),
        }
    }

    /// Discard lines until one exactly matches `target`, tolerating any
    /// number of intermediate read timeouts. Only a hard I/O error aborts.
    pub async fn read_until_line(&mut self, target: &str) -> MvResult<()> {
        loop {
            if let Some(line) = self.read_line().await? {
                if line == target {
                    return Ok(());
                }
            }
        }
    }

    pub async fn send_command(&mut self, line: &str) -> MvResult<Option<String>> {
        self.write_line(line).await?;
        self.read_line().await
    }

    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }
}
