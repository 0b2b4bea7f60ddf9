//! The logging session, from device discovery to the capture/export loop.

use crate::operator::Operator;
use crate::output::OutputTarget;
use chrono::{Local, NaiveDateTime};
use console::Key;
use log::*;
use saleae_socket_client::builder::TriggerBuilder;
use saleae_socket_client::{
    ActiveChannels, Analyzer, Device, LogicSession, SampleRate, Trigger,
};
use std::path::PathBuf;
use std::time::Duration;

/// Digital sample rate selected unless configured otherwise.
pub const DEFAULT_SAMPLE_RATE: u32 = 10_000_000;

/// Capture duration used when the entered one is not a number.
pub const DEFAULT_CAPTURE_SECONDS: f64 = 3.0;

/// Upper bound for the number of channels to log.
pub const MAX_CHANNELS: u32 = 8;

/// Knobs of a logging session which are not asked interactively.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Digital sample rate to select on supported devices.
    pub sample_rate: u32,
    /// Base directory of the per identifier output directories.
    pub output_dir: PathBuf,
    /// Pause after every capture.
    pub settle: Duration,
    /// Source of the date and timestamps in output paths.
    pub clock: fn() -> NaiveDateTime,
}

impl Settings {
    /// Defaults, writing below `output_dir`.
    pub fn new(output_dir: PathBuf) -> Self {
        Settings {
            sample_rate: DEFAULT_SAMPLE_RATE,
            output_dir,
            settle: Duration::ZERO,
            clock: local_now,
        }
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Preconditions on the service state that end a session.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WorkflowError {
    /// None of the connected devices is marked active.
    #[error("No device is marked active")]
    NoActiveDevice,
    /// More than one connected device is marked active.
    #[error("{0} devices are marked active, expected exactly one")]
    MultipleActiveDevices(usize),
}

/// How a session ended without an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operator stopped the capture loop.
    Completed {
        /// Number of captures made.
        captures: u32,
    },
    /// The device does not offer the configured digital sample rate.
    SampleRateUnavailable {
        /// The configured rate.
        requested: u32,
    },
}

/// The single device marked active.
pub fn single_active(devices: &[Device]) -> Result<&Device, WorkflowError> {
    let mut active = devices.iter().filter(|device| device.is_active);
    match (active.next(), active.count()) {
        (None, _) => Err(WorkflowError::NoActiveDevice),
        (Some(device), 0) => Ok(device),
        (Some(_), others) => Err(WorkflowError::MultipleActiveDevices(others + 1)),
    }
}

/// Number of channels to log, `None` unless the input is a number in `1..=MAX_CHANNELS`.
pub fn parse_channel_count(input: &str) -> Option<u32> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|count| (1..=MAX_CHANNELS).contains(count))
}

/// Capture duration in seconds, `None` unless the input is a finite, positive number.
pub fn parse_capture_seconds(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
}

/// Run a complete logging session on a connected `session`.
///
/// Fails on any error reported by the session and on the violated preconditions in
/// [`WorkflowError`]. Returns once the operator pressed Escape in the capture loop and
/// acknowledged the end, or early if the sample rate cannot be selected.
pub async fn run<S, O>(
    session: &mut S,
    operator: &mut O,
    settings: &Settings,
) -> anyhow::Result<Outcome>
where
    S: LogicSession,
    O: Operator,
{
    Workflow {
        session,
        operator,
        settings,
    }
    .run()
    .await
}

struct Workflow<'a, S, O> {
    session: &'a mut S,
    operator: &'a mut O,
    settings: &'a Settings,
}

impl<S, O> Workflow<'_, S, O>
where
    S: LogicSession,
    O: Operator,
{
    async fn run(&mut self) -> anyhow::Result<Outcome> {
        let device = self.active_device().await?;
        let analyzers = self.analyzers().await?;
        let configurable = device.device_type.accepts_channel_config();

        if configurable {
            self.activate_channels().await?;
        } else {
            info!(
                "{} does not accept channel configuration",
                device.device_type
            );
            self.say(&format!(
                "{} does not support channel configuration, keeping its channel, sample rate and trigger settings",
                device.name
            ))?;
            self.say("")?;
        }

        let channels = self.show_active_channels().await?;
        self.show_sample_rate().await?;
        let catalog = self.session.available_sample_rates().await?;
        debug!("{} sample rates available", catalog.len());

        if configurable {
            if !self.select_sample_rate(&catalog).await? {
                return Ok(Outcome::SampleRateUnavailable {
                    requested: self.settings.sample_rate,
                });
            }
            self.set_trigger(&channels).await?;
        }

        if device.device_type.has_voltage_options() {
            self.show_voltage_option().await?;
        }

        self.set_capture_duration().await?;
        let targets = self.output_targets(&channels, &analyzers)?;

        self.operator.ask("Press Enter to Begin Capture")?;
        let captures = self.capture_loop(&analyzers, &targets).await?;

        self.say("")?;
        self.say("Recording complete, press any key to exit")?;
        self.operator.wait_key()?;

        Ok(Outcome::Completed { captures })
    }

    fn say(&mut self, text: &str) -> anyhow::Result<()> {
        self.operator.say(text)
    }

    async fn active_device(&mut self) -> anyhow::Result<Device> {
        let devices = self.session.connected_devices().await?;
        debug!("Connected devices: {:?}", devices);
        let active = single_active(&devices)?.clone();

        self.say("currently available devices:")?;
        for device in &devices {
            self.say(&device.name)?;
        }
        self.say(&format!("currently active device: {}", active.name))?;
        self.say("")?;

        Ok(active)
    }

    async fn analyzers(&mut self) -> anyhow::Result<Vec<Analyzer>> {
        let analyzers = self.session.analyzers().await?;
        if !analyzers.is_empty() {
            self.say("Current analyzers:")?;
            for analyzer in &analyzers {
                self.say(&analyzer.analyzer_type)?;
            }
            self.say("")?;
        }
        Ok(analyzers)
    }

    async fn activate_channels(&mut self) -> anyhow::Result<()> {
        let answer = self.operator.ask("Enter number of channels to log: ")?;

        let digital: Vec<u32> = match parse_channel_count(&answer) {
            Some(count) => {
                let digital: Vec<u32> = (0..count).collect();
                self.say(&format!("Activating channels {}", join(&digital, " ")))?;
                digital
            }
            None => {
                warn!("Invalid channel count {:?}", answer.trim());
                self.say("Invalid entry, only using channel 0")?;
                vec![0]
            }
        };

        self.session
            .set_active_channels(&ActiveChannels {
                digital,
                analog: Vec::new(),
            })
            .await?;
        self.say("")
    }

    /// The service may adjust the requested channels, so the result is read back.
    async fn show_active_channels(&mut self) -> anyhow::Result<ActiveChannels> {
        let channels = self.session.active_channels().await?;
        self.say(&format!(
            "Active Digital Channels: {}",
            join(&channels.digital, ", ")
        ))?;
        self.say(&format!(
            "Active Analog Channels: {}",
            join(&channels.analog, ", ")
        ))?;
        Ok(channels)
    }

    async fn show_sample_rate(&mut self) -> anyhow::Result<()> {
        let current = self.session.sample_rate().await?;
        self.say(&format!(
            "The previously selected sample rate was: {}",
            current
        ))?;
        if current.is_mixed() {
            let option = self.session.performance_option().await?;
            self.say(&format!("Currently selected performance option: {}", option))?;
        }
        Ok(())
    }

    /// Returns `false` if the configured rate is not in `catalog`.
    async fn select_sample_rate(&mut self, catalog: &[SampleRate]) -> anyhow::Result<bool> {
        let wanted = self.settings.sample_rate;
        match catalog.iter().find(|rate| rate.digital == wanted) {
            Some(rate) => {
                self.say(&format!("Changing digital sample rate to {}", wanted))?;
                self.session.set_sample_rate(*rate).await?;
                self.say("")?;
                Ok(true)
            }
            None => {
                error!("{} SPS is not in {:?}", wanted, catalog);
                self.say("Selected sample rate not available, exiting")?;
                Ok(false)
            }
        }
    }

    async fn set_trigger(&mut self, channels: &ActiveChannels) -> anyhow::Result<()> {
        self.say("Setting trigger to CH0 falling edge")?;
        let triggers = TriggerBuilder::new(channels.digital.len())
            .channel(0, Trigger::FallingEdge)
            .build()?;
        self.session.set_trigger(&triggers).await?;
        self.say("")
    }

    async fn show_voltage_option(&mut self) -> anyhow::Result<()> {
        let options = self.session.digital_voltage_options().await?;
        if let Some(option) = options.iter().find(|option| option.is_selected) {
            self.say(&format!(
                "Currently selected voltage option: {}",
                option.description
            ))?;
        }
        Ok(())
    }

    async fn set_capture_duration(&mut self) -> anyhow::Result<()> {
        self.say("")?;
        let answer = self
            .operator
            .ask("Enter the capture time in seconds. Equal to the power cycle time: ")?;

        let seconds = match parse_capture_seconds(&answer) {
            Some(seconds) => seconds,
            None => {
                warn!(
                    "Invalid capture time {:?}, using {}",
                    answer.trim(),
                    DEFAULT_CAPTURE_SECONDS
                );
                self.say("Invalid entry")?;
                DEFAULT_CAPTURE_SECONDS
            }
        };

        self.say(&format!("Setting capture time to {}", seconds))?;
        self.session.set_capture_seconds(seconds).await?;
        self.say("")
    }

    /// One target per active digital channel, named by the operator.
    ///
    /// Analyzer `i` is exported to target `i`. Analyzers without a channel of their own get a
    /// default identifier derived from their index.
    fn output_targets(
        &mut self,
        channels: &ActiveChannels,
        analyzers: &[Analyzer],
    ) -> anyhow::Result<Vec<OutputTarget>> {
        let today = (self.settings.clock)().date();
        let mut targets = Vec::new();

        for channel in &channels.digital {
            let default = format!("CH{}_output", channel);
            let answer = self.operator.ask(&format!(
                "Enter file name identifier for channel {} or Enter for default [{}]: ",
                channel, default
            ))?;
            let identifier = match answer.trim() {
                "" => default,
                identifier => identifier.to_string(),
            };
            targets.push(OutputTarget::create(
                &self.settings.output_dir,
                &identifier,
                today,
            )?);
        }

        for analyzer in analyzers.iter().skip(targets.len()) {
            let identifier = format!("A{}_output", analyzer.index);
            debug!(
                "No channel left for analyzer #{}, exporting as {}",
                analyzer.index, identifier
            );
            targets.push(OutputTarget::create(
                &self.settings.output_dir,
                &identifier,
                today,
            )?);
        }

        Ok(targets)
    }

    /// Capture and export back to back until Escape is pressed.
    ///
    /// Keys are only looked at between captures; a capture in flight always completes.
    async fn capture_loop(
        &mut self,
        analyzers: &[Analyzer],
        targets: &[OutputTarget],
    ) -> anyhow::Result<u32> {
        self.say("Press ESC to stop")?;
        self.operator.begin_key_watch()?;

        let mut capture_counter: u32 = 1;

        loop {
            if let Some(key) = self.operator.poll_key() {
                if key == Key::Escape {
                    break;
                }
                trace!("Ignoring {:?}", key);
                continue;
            }

            self.say(&format!("Starting capture #{}", capture_counter))?;
            self.session.capture().await?;

            let now = (self.settings.clock)();
            for (analyzer, target) in analyzers.iter().zip(targets) {
                let path = target.capture_path(now);
                self.session
                    .export_analyzer(analyzer.index, &path, false)
                    .await?;
                self.say(&format!(
                    "Exported {} analyzer #{} data capture #{} to {}",
                    analyzer.analyzer_type,
                    analyzer.index,
                    capture_counter,
                    path.display()
                ))?;
            }

            capture_counter += 1;

            if !self.settings.settle.is_zero() {
                tokio::time::sleep(self.settings.settle).await;
            }
        }

        Ok(capture_counter - 1)
    }
}

fn join(channels: &[u32], separator: &str) -> String {
    channels
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use saleae_socket_client::DeviceType;

    fn device(name: &str, is_active: bool) -> Device {
        Device {
            index: 1,
            name: name.to_string(),
            device_type: DeviceType::Logic8,
            id: "0x1".to_string(),
            is_active,
        }
    }

    #[test]
    fn exactly_one_active_device() {
        let devices = vec![device("a", false), device("b", true), device("c", false)];
        assert_eq!(single_active(&devices).unwrap().name, "b");

        let devices = vec![device("a", false)];
        assert_eq!(
            single_active(&devices).unwrap_err(),
            WorkflowError::NoActiveDevice
        );
        assert_eq!(single_active(&[]).unwrap_err(), WorkflowError::NoActiveDevice);

        let devices = vec![device("a", true), device("b", true), device("c", true)];
        assert_eq!(
            single_active(&devices).unwrap_err(),
            WorkflowError::MultipleActiveDevices(3)
        );
    }

    #[test]
    fn channel_count_bounds() {
        assert_eq!(parse_channel_count("1"), Some(1));
        assert_eq!(parse_channel_count(" 8\n"), Some(8));
        for input in ["0", "9", "-1", "", "abc", "2.5"] {
            assert_eq!(parse_channel_count(input), None, "input {:?}", input);
        }
    }

    #[test]
    fn capture_seconds() {
        assert_eq!(parse_capture_seconds("2.5"), Some(2.5));
        assert_eq!(parse_capture_seconds("10"), Some(10.0));
        for input in ["abc", "", "0", "-1", "inf", "NaN"] {
            assert_eq!(parse_capture_seconds(input), None, "input {:?}", input);
        }
    }

    #[test]
    fn joins_channel_lists() {
        assert_eq!(join(&[0, 1, 2], " "), "0 1 2");
        assert_eq!(join(&[], ", "), "");
    }
}
