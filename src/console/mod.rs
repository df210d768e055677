//! Operator console I/O
//!
//! This module handles:
//! - Opening the console on stdin/stdout or a serial device
//! - Reading lines on a dedicated task so the control loop can wait on them
//! - Writing command replies, CSV lines and debug blocks

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Where the operator console lives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConsoleSource {
    /// Process stdin/stdout
    #[default]
    Stdio,
    /// Serial device (e.g., "/dev/ttyUSB0")
    Serial { path: String, baud: u32 },
}

/// Default baud rate for a serial console
pub const DEFAULT_BAUD: u32 = 115_200;

const LINE_BUFFER: usize = 16;

/// Line-oriented operator console
pub struct OperatorConsole {
    lines: mpsc::Receiver<String>,
    output: Box<dyn AsyncWrite + Send + Unpin>,
}

impl OperatorConsole {
    /// Open the configured console
    pub fn open(source: &ConsoleSource) -> Result<Self> {
        match source {
            ConsoleSource::Stdio => {
                info!("[CONSOLE] Using stdin/stdout");
                Ok(Self::from_parts(tokio::io::stdin(), tokio::io::stdout()))
            }
            ConsoleSource::Serial { path, baud } => {
                let stream = tokio_serial::new(path, *baud)
                    .open_native_async()
                    .with_context(|| format!("Failed to open serial console {}", path))?;
                info!("[CONSOLE] Using serial {} @ {} baud", path, baud);
                let (reader, writer) = tokio::io::split(stream);
                Ok(Self::from_parts(reader, writer))
            }
        }
    }

    /// Console over arbitrary byte streams
    ///
    /// Lines are read on a spawned task and forwarded through a channel.
    pub fn from_parts<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (tx, rx) = mpsc::channel(LINE_BUFFER);

        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("[CONSOLE] Input closed");
                        break;
                    }
                    Err(e) => {
                        debug!("[CONSOLE] Read error: {}", e);
                        break;
                    }
                }
            }
        });

        Self {
            lines: rx,
            output: Box::new(writer),
        }
    }

    /// Next input line; `None` once input is closed
    ///
    /// Cancel-safe, so it can race a timer in `select!`.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Write lines to the console output
    pub async fn emit(&mut self, lines: &[String]) -> std::io::Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        for line in lines {
            self.output.write_all(line.as_bytes()).await?;
            self.output.write_all(b"\r\n").await?;
        }
        self.output.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_lines_round_trip() {
        let (mut operator, node_side) = tokio::io::duplex(256);
        let (reader, writer) = tokio::io::split(node_side);
        let mut console = OperatorConsole::from_parts(reader, writer);

        operator.write_all(b"list\r\n  scan \n").await.unwrap();
        assert_eq!(console.next_line().await.as_deref(), Some("list"));
        assert_eq!(console.next_line().await.as_deref(), Some("  scan "));

        console
            .emit(&["ok".to_string(), "done".to_string()])
            .await
            .unwrap();
        let mut buf = [0u8; 10];
        operator.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ok\r\ndone\r\n");
    }

    #[tokio::test]
    async fn test_closed_input() {
        let (operator, node_side) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(node_side);
        let mut console = OperatorConsole::from_parts(reader, writer);

        drop(operator);
        assert_eq!(console.next_line().await, None);
    }
}
