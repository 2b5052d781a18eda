//! # Serial Communication Module
//!
//! Handles the MAVLink telemetry link to the autopilot.
//!
//! This module handles:
//! - Opening the autopilot serial port (8N1, no flow control)
//! - Buffered frame reads that survive a timed-out receive
//! - Classifying frames into heartbeats, samples and pass-through traffic

pub mod source;

use async_trait::async_trait;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::mavlink::decoder::{decode_message, next_frame};
use crate::mavlink::protocol::MavFrame;
use crate::telemetry::types::{Frame, TelemetryMessage};

pub use source::TelemetrySource;

/// Read buffer growth step
const READ_CHUNK_SIZE: usize = 1024;

/// MAVLink telemetry link over any byte stream
pub struct MavlinkSerial<R> {
    reader: R,
    buffer: BytesMut,
    recv_timeout: Duration,
    /// Device path (e.g., /dev/ttyAMA0)
    device_path: String,
}

impl<R> std::fmt::Debug for MavlinkSerial<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MavlinkSerial")
            .field("device_path", &self.device_path)
            .field("buffered", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

impl MavlinkSerial<tokio_serial::SerialStream> {
    /// Open the autopilot serial port
    ///
    /// # Errors
    ///
    /// Returns `ArmSentryError::Link` if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use arm_sentry::config::LinkConfig;
    /// use arm_sentry::serial::MavlinkSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let link = MavlinkSerial::open(&LinkConfig::default())?;
    ///     println!("Connected to: {}", link.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &LinkConfig) -> Result<Self> {
        debug!("Opening serial port {} at {} baud", config.port, config.baud_rate);

        let port = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| LinkError::Serial(format!("Failed to open {}: {}", config.port, e)))?;

        info!("Opened telemetry link at {} ({} baud)", config.port, config.baud_rate);
        Ok(Self::new(port, config.recv_timeout(), &config.port))
    }
}

impl<R: AsyncRead + Unpin + Send> MavlinkSerial<R> {
    /// Wrap an already-open byte stream
    pub fn new(reader: R, recv_timeout: Duration, device_path: &str) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            recv_timeout,
            device_path: device_path.to_string(),
        }
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Read until one checksummed frame is available
    ///
    /// Cancel-safe: bytes already read stay in the buffer.
    async fn read_frame(&mut self) -> std::result::Result<MavFrame, LinkError> {
        loop {
            match next_frame(&mut self.buffer) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(e) => {
                    debug!("Skipping malformed frame: {}", e);
                    continue;
                }
            }

            self.buffer.reserve(READ_CHUNK_SIZE);
            let n = self
                .reader
                .read_buf(&mut self.buffer)
                .await
                .map_err(|e| LinkError::Serial(format!("Failed to read {}: {}", self.device_path, e)))?;

            if n == 0 {
                return Err(LinkError::Closed);
            }
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> TelemetrySource for MavlinkSerial<R> {
    async fn recv(&mut self) -> std::result::Result<Option<Frame>, LinkError> {
        match tokio::time::timeout(self.recv_timeout, self.read_frame()).await {
            Ok(result) => Ok(Some(classify(result?))),
            Err(_) => Ok(None),
        }
    }
}

/// Type a checksummed frame; undecodable bodies pass through untyped
fn classify(frame: MavFrame) -> Frame {
    match decode_message(&frame) {
        Ok(message) => Frame::from_mavlink(frame, &message),
        Err(e) => {
            warn!("Undecodable message {}: {}", frame.message_id, e);
            let message_id = frame.message_id;
            Frame::new(frame.raw, TelemetryMessage::Other { message_id })
        }
    }
}
