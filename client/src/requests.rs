use saleae_socket_common::{ActiveChannels, SampleRate, Trigger};
use std::path::Path;

/// A command understood by the socket service.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum Request<'a> {
    GetConnectedDevices,
    GetAnalyzers,
    SetActiveChannels(&'a ActiveChannels),
    GetActiveChannels,
    GetSampleRate,
    SetSampleRate(SampleRate),
    GetAllSampleRates,
    GetPerformance,
    SetTrigger(&'a [Trigger]),
    SetCaptureSeconds(f64),
    Capture,
    GetDigitalVoltageOptions,
    ExportAnalyzer {
        index: u32,
        path: &'a Path,
        stream_back: bool,
    },
}

impl Request<'_> {
    /// The command text, without the terminating NUL.
    pub fn encode(&self) -> String {
        match self {
            Request::GetConnectedDevices => "GET_CONNECTED_DEVICES".to_string(),
            Request::GetAnalyzers => "GET_ANALYZERS".to_string(),
            Request::SetActiveChannels(channels) => {
                format!("SET_ACTIVE_CHANNELS{}", channels.to_arguments())
            }
            Request::GetActiveChannels => "GET_ACTIVE_CHANNELS".to_string(),
            Request::GetSampleRate => "GET_SAMPLE_RATE".to_string(),
            Request::SetSampleRate(rate) => {
                format!("SET_SAMPLE_RATE, {}, {}", rate.digital, rate.analog)
            }
            Request::GetAllSampleRates => "GET_ALL_SAMPLE_RATES".to_string(),
            Request::GetPerformance => "GET_PERFORMANCE".to_string(),
            Request::SetTrigger(triggers) => {
                let mut command = "SET_TRIGGER".to_string();
                for trigger in triggers.iter() {
                    command.push_str(", ");
                    command.push_str(trigger.as_token());
                }
                command
            }
            Request::SetCaptureSeconds(seconds) => format!("SET_CAPTURE_SECONDS, {}", seconds),
            Request::Capture => "CAPTURE".to_string(),
            Request::GetDigitalVoltageOptions => "GET_DIGITAL_VOLTAGE_OPTIONS".to_string(),
            Request::ExportAnalyzer {
                index,
                path,
                stream_back,
            } => {
                let mut command = format!("EXPORT_ANALYZER, {}, {}", index, path.display());
                if *stream_back {
                    command.push_str(", mXmitFile");
                }
                command
            }
        }
    }
}

/// Outcome of a complete reply.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Reply {
    Ack(String),
    Nak(String),
}

impl Reply {
    /// Returns `None` until the final line of `response` is `ACK` or `NAK`.
    ///
    /// The payload is everything before that line, trimmed. Only the final line is inspected
    /// until the reply is complete, so this can be called after every received chunk.
    pub(crate) fn complete(response: &[u8]) -> Option<Reply> {
        let is_padding = |b: &u8| *b == 0 || b.is_ascii_whitespace();

        let end = response.iter().rposition(|b| !is_padding(b))? + 1;
        let start = response[..end]
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |newline| newline + 1);
        let last = &response[start..end];
        let last = &last[last.iter().position(|b| !is_padding(b)).unwrap_or(0)..];

        let payload = || {
            String::from_utf8_lossy(&response[..start])
                .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string()
        };

        match last {
            b"ACK" => Some(Reply::Ack(payload())),
            b"NAK" => Some(Reply::Nak(payload())),
            _ => None,
        }
    }
}
