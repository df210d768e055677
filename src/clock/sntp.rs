//! Minimal SNTP client (RFC 4330)
//!
//! One 48-byte client request per query; only the transmit timestamp of the
//! reply is used. Round-trip delay is ignored, which is fine for
//! second-resolution sample timestamps.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Standard NTP port
pub const NTP_PORT: u16 = 123;

/// Size of an NTP packet without extensions
pub const NTP_PACKET_LEN: usize = 48;

/// Seconds between the NTP era start (1900) and the Unix epoch
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Errors that can occur while synchronising time
#[derive(Error, Debug)]
pub enum TimeSyncError {
    #[error("NTP request to {0} timed out")]
    Timeout(String),

    #[error("NTP I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed NTP response ({0} bytes)")]
    Malformed(usize),

    #[error("NTP server reports itself unsynchronised")]
    Unsynchronised,

    #[error("No NTP server answered after {0} attempts")]
    Exhausted(u32),

    #[error("Resolved time {0} is before the sanity threshold")]
    BeforeThreshold(u64),
}

/// Source of network time, one request per call
#[async_trait]
pub trait NtpQuery: Send + Sync {
    /// Ask `server` for the current Unix time in seconds
    async fn query(&self, server: &str) -> Result<u64, TimeSyncError>;
}

/// SNTP over UDP
pub struct SntpClient {
    timeout: Duration,
}

impl SntpClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SntpClient {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

/// Build a client request: LI=0, VN=3, Mode=3
pub fn request_packet() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = 0x1B;
    packet
}

/// Extract Unix seconds from a server reply
pub fn parse_response(buf: &[u8]) -> Result<u64, TimeSyncError> {
    if buf.len() < NTP_PACKET_LEN {
        return Err(TimeSyncError::Malformed(buf.len()));
    }

    // Mode 4 = server reply
    if buf[0] & 0x07 != 4 {
        return Err(TimeSyncError::Malformed(buf.len()));
    }

    // Stratum 0 is a kiss-of-death / unsynchronised server
    if buf[1] == 0 {
        return Err(TimeSyncError::Unsynchronised);
    }

    let ntp_secs = u32::from_be_bytes([buf[40], buf[41], buf[42], buf[43]]) as u64;
    ntp_secs
        .checked_sub(NTP_UNIX_OFFSET)
        .ok_or(TimeSyncError::Malformed(buf.len()))
}

fn with_default_port(server: &str) -> String {
    if server.contains(':') {
        server.to_string()
    } else {
        format!("{}:{}", server, NTP_PORT)
    }
}

#[async_trait]
impl NtpQuery for SntpClient {
    async fn query(&self, server: &str) -> Result<u64, TimeSyncError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(with_default_port(server)).await?;
        socket.send(&request_packet()).await?;

        let mut buf = [0u8; 128];
        let n = timeout(self.timeout, socket.recv(&mut buf))
            .await
            .map_err(|_| TimeSyncError::Timeout(server.to_string()))??;

        parse_response(&buf[..n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(unix_secs: u64, stratum: u8) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0u8; NTP_PACKET_LEN];
        packet[0] = 0x1C; // VN=3, Mode=4
        packet[1] = stratum;
        let ntp_secs = (unix_secs + NTP_UNIX_OFFSET) as u32;
        packet[40..44].copy_from_slice(&ntp_secs.to_be_bytes());
        packet
    }

    #[test]
    fn test_request_packet() {
        let packet = request_packet();
        assert_eq!(packet.len(), 48);
        assert_eq!(packet[0] & 0x07, 3);
        assert_eq!((packet[0] >> 3) & 0x07, 3);
    }

    #[test]
    fn test_parse_reply() {
        assert_eq!(parse_response(&reply(1_718_000_000, 2)).unwrap(), 1_718_000_000);
    }

    #[test]
    fn test_parse_rejects_bad_replies() {
        assert!(matches!(
            parse_response(&[0u8; 12]),
            Err(TimeSyncError::Malformed(12))
        ));
        assert!(matches!(
            parse_response(&reply(1_718_000_000, 0)),
            Err(TimeSyncError::Unsynchronised)
        ));

        let mut client_mode = reply(1_718_000_000, 2);
        client_mode[0] = 0x1B;
        assert!(matches!(
            parse_response(&client_mode),
            Err(TimeSyncError::Malformed(_))
        ));
    }

    #[test]
    fn test_default_port() {
        assert_eq!(with_default_port("pool.ntp.org"), "pool.ntp.org:123");
        assert_eq!(with_default_port("127.0.0.1:1123"), "127.0.0.1:1123");
    }

    #[tokio::test]
    async fn test_query_local_server() {
        let server = UdpSocket::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = server.local_addr().expect("no addr");

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            if let Ok((_, peer)) = server.recv_from(&mut buf).await {
                let _ = server.send_to(&reply(1_750_000_000, 1), peer).await;
            }
        });

        let client = SntpClient::new(Duration::from_secs(2));
        let secs = client.query(&addr.to_string()).await.expect("query failed");
        assert_eq!(secs, 1_750_000_000);
    }

    #[tokio::test]
    async fn test_query_timeout() {
        // Bound but silent peer
        let silent = UdpSocket::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = silent.local_addr().expect("no addr");

        let client = SntpClient::new(Duration::from_millis(50));
        let result = client.query(&addr.to_string()).await;
        assert!(matches!(result, Err(TimeSyncError::Timeout(_))));
    }
}
