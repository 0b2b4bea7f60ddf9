#![warn(missing_docs)]

//! Client side of the Logic socket service.
//!
//! [`LogicSession`] is the capability surface the logger drives, [`SocketClient`] implements it
//! over TCP. Configuration that needs more than a single value, like the per channel trigger
//! array, is assembled with the helpers in [`builder`].

use std::path::Path;

pub use saleae_socket_common::*;

pub mod builder;
mod requests;
mod socket;

pub use requests::Request;
pub use socket::SocketClient;

/// Default address of the socket service.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port of the socket service.
pub const DEFAULT_PORT: u16 = 10429;

/// Error definitions for the session calls.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The service could not be reached.
    #[error("Unable to connect to {address}: {source}")]
    Connect {
        #[allow(missing_docs)]
        address: String,
        #[allow(missing_docs)]
        source: std::io::Error,
    },
    /// Reading or writing the socket failed.
    #[error("Socket I/O failed")]
    Io(#[from] std::io::Error),
    /// The service rejected a command.
    #[error("Command '{command}' was rejected (NAK){}", nak_detail(.detail))]
    Nak {
        #[allow(missing_docs)]
        command: String,
        #[allow(missing_docs)]
        detail: String,
    },
    /// The service closed the connection before acknowledging a command.
    #[error("Connection closed while waiting for the reply to '{command}'")]
    Disconnected {
        #[allow(missing_docs)]
        command: String,
    },
    /// The reply to a command could not be understood.
    #[error("Malformed reply to '{command}': {detail}")]
    Protocol {
        #[allow(missing_docs)]
        command: String,
        #[allow(missing_docs)]
        detail: String,
    },
    /// Generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn nak_detail(detail: &str) -> String {
    if detail.is_empty() {
        String::new()
    } else {
        format!(": {}", detail)
    }
}

/// Result of a session call.
pub type Result<T> = core::result::Result<T, ClientError>;

/// Everything the logger needs from a connected Logic session.
///
/// Every call is a single request/reply exchange, none of them time out. [`LogicSession::capture`]
/// only returns once the device has recorded for the configured capture duration.
#[allow(async_fn_in_trait)]
pub trait LogicSession {
    /// All connected devices, simulated ones included.
    async fn connected_devices(&mut self) -> Result<Vec<Device>>;

    /// Analyzers added to the current session.
    async fn analyzers(&mut self) -> Result<Vec<Analyzer>>;

    /// Replace the set of recorded channels.
    async fn set_active_channels(&mut self, channels: &ActiveChannels) -> Result<()>;

    /// Channels that are currently recorded.
    async fn active_channels(&mut self) -> Result<ActiveChannels>;

    /// Sample rate in use.
    async fn sample_rate(&mut self) -> Result<SampleRate>;

    /// Select one of the pairs returned by [`LogicSession::available_sample_rates`].
    async fn set_sample_rate(&mut self, rate: SampleRate) -> Result<()>;

    /// Sample rates valid for the current channel selection.
    async fn available_sample_rates(&mut self) -> Result<Vec<SampleRate>>;

    /// Performance option, only valid while digital and analog channels are mixed.
    async fn performance_option(&mut self) -> Result<PerformanceOption>;

    /// Set the trigger, one entry per active digital channel.
    async fn set_trigger(&mut self, triggers: &[Trigger]) -> Result<()>;

    /// Duration of a single capture.
    async fn set_capture_seconds(&mut self, seconds: f64) -> Result<()>;

    /// Start a capture and wait for it to complete.
    async fn capture(&mut self) -> Result<()>;

    /// Digital input thresholds of the active device.
    async fn digital_voltage_options(&mut self) -> Result<Vec<VoltageOption>>;

    /// Export the results of analyzer `index` to `path`.
    ///
    /// With `stream_back` the service also transmits the exported file over the socket.
    async fn export_analyzer(&mut self, index: u32, path: &Path, stream_back: bool)
        -> Result<()>;
}
