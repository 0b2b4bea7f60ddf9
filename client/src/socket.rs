use crate::requests::{Reply, Request};
use crate::{ClientError, LogicSession, Result};
use log::*;
use saleae_socket_common::{
    ActiveChannels, Analyzer, Device, PerformanceOption, SampleRate, Trigger, VoltageOption,
};
use std::path::Path;
use std::str::FromStr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A [`LogicSession`] talking to the socket service over TCP.
///
/// Commands are sent one at a time, each terminated by a NUL byte, and the reply is read until
/// its last line is `ACK` or `NAK`.
#[derive(Debug)]
pub struct SocketClient {
    stream: TcpStream,
    address: String,
}

impl SocketClient {
    /// Connect to the service at `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let address = format!("{}:{}", host, port);
        debug!("Connecting to {}", address);

        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| ClientError::Connect {
                address: address.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        info!("Connected to {}", address);
        Ok(SocketClient { stream, address })
    }

    /// Address this client is connected to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send a raw request and return the acknowledged payload.
    pub async fn request(&mut self, request: Request<'_>) -> Result<String> {
        let command = request.encode();
        debug!("{}: Sending '{}'", self.address, command);

        self.stream.write_all(command.as_bytes()).await?;
        self.stream.write_all(&[0]).await?;
        self.stream.flush().await?;

        let mut response = Vec::new();
        let mut read_buf = [0u8; 4 * 1024];

        loop {
            let count = self.stream.read(&mut read_buf[..]).await?;
            if count == 0 {
                warn!("{}: Connection closed during '{}'", self.address, command);
                return Err(ClientError::Disconnected { command });
            }
            response.extend_from_slice(&read_buf[..count]);

            match Reply::complete(&response) {
                Some(Reply::Ack(payload)) => {
                    trace!("{}: ACK '{}': {:?}", self.address, command, payload);
                    return Ok(payload);
                }
                Some(Reply::Nak(detail)) => {
                    debug!("{}: NAK '{}': {:?}", self.address, command, detail);
                    return Err(ClientError::Nak { command, detail });
                }
                None => continue,
            }
        }
    }

    async fn request_lines<T>(&mut self, request: Request<'_>) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: Into<anyhow::Error>,
    {
        let command = request.encode();
        let payload = self.request(request).await?;
        payload
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.parse::<T>()
                    .map_err(|e| protocol_error(&command, e.into()))
            })
            .collect()
    }

    async fn request_one<T>(&mut self, request: Request<'_>) -> Result<T>
    where
        T: FromStr,
        T::Err: Into<anyhow::Error>,
    {
        let command = request.encode();
        let payload = self.request(request).await?;
        payload
            .trim()
            .parse::<T>()
            .map_err(|e| protocol_error(&command, e.into()))
    }
}

fn protocol_error(command: &str, error: anyhow::Error) -> ClientError {
    ClientError::Protocol {
        command: command.to_string(),
        detail: format!("{:#}", error),
    }
}

impl LogicSession for SocketClient {
    async fn connected_devices(&mut self) -> Result<Vec<Device>> {
        self.request_lines(Request::GetConnectedDevices).await
    }

    async fn analyzers(&mut self) -> Result<Vec<Analyzer>> {
        self.request_lines(Request::GetAnalyzers).await
    }

    async fn set_active_channels(&mut self, channels: &ActiveChannels) -> Result<()> {
        self.request(Request::SetActiveChannels(channels)).await?;
        Ok(())
    }

    async fn active_channels(&mut self) -> Result<ActiveChannels> {
        self.request_one(Request::GetActiveChannels).await
    }

    async fn sample_rate(&mut self) -> Result<SampleRate> {
        // Digital and analog rates come on separate lines here, unlike GET_ALL_SAMPLE_RATES.
        let rates = self.request_lines::<u32>(Request::GetSampleRate).await?;

        match rates.as_slice() {
            [digital, analog] => Ok(SampleRate {
                digital: *digital,
                analog: *analog,
            }),
            _ => Err(protocol_error(
                &Request::GetSampleRate.encode(),
                anyhow::anyhow!("expected 2 rates, got {}", rates.len()),
            )),
        }
    }

    async fn set_sample_rate(&mut self, rate: SampleRate) -> Result<()> {
        self.request(Request::SetSampleRate(rate)).await?;
        Ok(())
    }

    async fn available_sample_rates(&mut self) -> Result<Vec<SampleRate>> {
        self.request_lines(Request::GetAllSampleRates).await
    }

    async fn performance_option(&mut self) -> Result<PerformanceOption> {
        self.request_one(Request::GetPerformance).await
    }

    async fn set_trigger(&mut self, triggers: &[Trigger]) -> Result<()> {
        self.request(Request::SetTrigger(triggers)).await?;
        Ok(())
    }

    async fn set_capture_seconds(&mut self, seconds: f64) -> Result<()> {
        self.request(Request::SetCaptureSeconds(seconds)).await?;
        Ok(())
    }

    async fn capture(&mut self) -> Result<()> {
        self.request(Request::Capture).await?;
        Ok(())
    }

    async fn digital_voltage_options(&mut self) -> Result<Vec<VoltageOption>> {
        self.request_lines(Request::GetDigitalVoltageOptions).await
    }

    async fn export_analyzer(
        &mut self,
        index: u32,
        path: &Path,
        stream_back: bool,
    ) -> Result<()> {
        self.request(Request::ExportAnalyzer {
            index,
            path,
            stream_back,
        })
        .await?;
        Ok(())
    }
}
