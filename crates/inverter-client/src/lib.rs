use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use command_codec::{CodecError, ModbusCommand, Request};
use telemetry_parser::{decode_device_info, decode_runtime_data, resolve_timezone, ParserError};
use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use types::{DeviceInfo, InverterEndpoint, RuntimeData};

/// First register of the ET device-info block.
pub const DEVICE_INFO_OFFSET: u16 = 0x88b8;
pub const DEVICE_INFO_REGISTERS: u16 = 0x0021;
/// First register of the ET runtime-data block.
pub const RUNTIME_DATA_OFFSET: u16 = 0x891c;
pub const RUNTIME_DATA_REGISTERS: u16 = 0x007d;

/// Configuration options for talking to one inverter over UDP.
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for one write+read exchange, in milliseconds.
    pub timeout_ms: u64,
    /// Total attempts per request, including the first.
    pub max_attempts: usize,
    /// Size of the buffer handed to a single datagram read.
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8899,
            timeout_ms: 3_000,
            max_attempts: 3,
            read_buffer_size: 4_096,
        }
    }
}

impl ClientConfig {
    pub fn endpoint(&self) -> InverterEndpoint {
        InverterEndpoint {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid socket address {0}:{1}")]
    InvalidAddress(String, u16),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("short write: sent {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("invalid response: {0}")]
    Codec(#[from] CodecError),
    #[error("decode failed: {0}")]
    Parse(#[from] ParserError),
    #[error("request failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: usize,
        #[source]
        source: Box<ClientError>,
    },
}

/// A connected datagram link: one `send` puts one request on the wire and
/// one `recv` returns one complete reply frame.
pub trait Connection {
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

impl Connection for UdpSocket {
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<usize>> + Send {
        UdpSocket::send(self, buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send {
        UdpSocket::recv(self, buf)
    }
}

#[derive(Debug)]
pub struct InverterClient<C = UdpSocket> {
    config: ClientConfig,
    conn: C,
}

impl InverterClient<UdpSocket> {
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let addr = resolve(&config.host, config.port).await?;
        let local = if addr.is_ipv4() {
            SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0)
        } else {
            SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0)
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(addr).await?;
        info!(%addr, "connected to inverter");
        Ok(Self::with_connection(config, socket))
    }
}

impl<C: Connection> InverterClient<C> {
    pub fn with_connection(config: ClientConfig, conn: C) -> Self {
        Self { config, conn }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `request` and returns the validated reply payload.
    ///
    /// Transport and protocol failures both count as a failed attempt and
    /// are retried immediately until `max_attempts` is reached. Codec errors
    /// that cannot succeed on retry are returned at once.
    pub async fn send<R>(&mut self, request: &R) -> Result<Vec<u8>, ClientError>
    where
        R: Request + ?Sized,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut buf = vec![0u8; self.config.read_buffer_size];
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            match self.exchange(request, &mut buf).await {
                Ok(payload) => {
                    debug!(attempt, len = payload.len(), "inverter request ok");
                    return Ok(payload);
                }
                Err(ClientError::Codec(err)) if !err.is_retryable() => {
                    warn!(attempt, error = %err, "inverter request rejected");
                    return Err(ClientError::Codec(err));
                }
                Err(err) => {
                    warn!(attempt, max_attempts, error = %err, "inverter request failed");
                    if attempt >= max_attempts {
                        return Err(ClientError::Exhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                }
            }
        }
    }

    pub async fn device_info(&mut self) -> Result<DeviceInfo, ClientError> {
        let payload = self
            .send(&ModbusCommand::read(DEVICE_INFO_OFFSET, DEVICE_INFO_REGISTERS))
            .await?;
        Ok(decode_device_info(&payload)?)
    }

    /// Reads device info first to learn whether phases 2/3 are wired.
    pub async fn runtime_data(&mut self, timezone: &str) -> Result<RuntimeData, ClientError> {
        resolve_timezone(timezone)?;
        let info = self.device_info().await?;
        self.runtime_data_for(&info, timezone).await
    }

    pub async fn runtime_data_for(
        &mut self,
        info: &DeviceInfo,
        timezone: &str,
    ) -> Result<RuntimeData, ClientError> {
        resolve_timezone(timezone)?;
        let payload = self
            .send(&ModbusCommand::read(RUNTIME_DATA_OFFSET, RUNTIME_DATA_REGISTERS))
            .await?;
        Ok(decode_runtime_data(&payload, info.single_phase, timezone)?)
    }

    async fn exchange<R>(&mut self, request: &R, buf: &mut [u8]) -> Result<Vec<u8>, ClientError>
    where
        R: Request + ?Sized,
    {
        let timeout_ms = self.config.timeout_ms;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let frame = request.encode();

        let written = timeout_at(deadline, self.conn.send(frame))
            .await
            .map_err(|_| ClientError::Timeout { timeout_ms })??;
        if written != frame.len() {
            return Err(ClientError::ShortWrite {
                written,
                expected: frame.len(),
            });
        }

        let read = timeout_at(deadline, self.conn.recv(buf))
            .await
            .map_err(|_| ClientError::Timeout { timeout_ms })??;
        let payload = request.validate(&buf[..read])?;
        Ok(payload.to_vec())
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, ClientError> {
    let mut addrs = lookup_host((host, port)).await?;
    addrs
        .next()
        .ok_or_else(|| ClientError::InvalidAddress(host.to_string(), port))
}
