//! Trait abstraction for the telemetry link to enable testing

use async_trait::async_trait;

use crate::error::LinkError;
use crate::telemetry::types::Frame;

/// A typed telemetry message stream with a bounded receive
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetrySource: Send {
    /// Receive the next message
    ///
    /// # Returns
    ///
    /// * `Ok(Some(frame))` - A message arrived
    /// * `Ok(None)` - The receive timeout elapsed with no message
    ///
    /// # Errors
    ///
    /// Returns `LinkError`; see [`LinkError::is_fatal`]
    async fn recv(&mut self) -> Result<Option<Frame>, LinkError>;
}
