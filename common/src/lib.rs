#![warn(missing_docs)]

//! Entities exchanged with the Logic socket service, shared by the client library and the logger.
//! Everything here is a transient view of the service's state, parsed from or encoded into the
//! line-oriented text protocol.

use anyhow::anyhow;
use num_enum::TryFromPrimitive;
use std::fmt;
use std::str::FromStr;

/// Hardware family of a connected (or simulated) device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Original 8 channel Logic.
    Logic,
    /// Logic 4.
    Logic4,
    /// Logic 8.
    Logic8,
    /// Original Logic16.
    Logic16,
    /// Logic Pro 8.
    LogicPro8,
    /// Logic Pro 16.
    LogicPro16,
    /// A tag this crate does not know about, kept verbatim.
    Other(String),
}

impl DeviceType {
    /// Devices which accept channel, sample rate and trigger reconfiguration from the logger.
    pub fn accepts_channel_config(&self) -> bool {
        matches!(
            self,
            DeviceType::Logic8 | DeviceType::LogicPro8 | DeviceType::LogicPro16
        )
    }

    /// Devices with selectable digital input thresholds.
    pub fn has_voltage_options(&self) -> bool {
        matches!(
            self,
            DeviceType::LogicPro8 | DeviceType::LogicPro16 | DeviceType::Logic16
        )
    }

    /// Tag used on the wire.
    pub fn as_tag(&self) -> &str {
        match self {
            DeviceType::Logic => "LOGIC_DEVICE",
            DeviceType::Logic4 => "LOGIC_4_DEVICE",
            DeviceType::Logic8 => "LOGIC_8_DEVICE",
            DeviceType::Logic16 => "LOGIC_16_DEVICE",
            DeviceType::LogicPro8 => "LOGIC_PRO_8_DEVICE",
            DeviceType::LogicPro16 => "LOGIC_PRO_16_DEVICE",
            DeviceType::Other(tag) => tag,
        }
    }
}

impl FromStr for DeviceType {
    type Err = anyhow::Error;

    fn from_str(param: &str) -> Result<Self, Self::Err> {
        let v: &str = &param.trim().to_ascii_uppercase();
        if v.is_empty() {
            return Err(anyhow!("Empty device type tag"));
        }
        Ok(match v {
            "LOGIC_DEVICE" => DeviceType::Logic,
            "LOGIC_4_DEVICE" => DeviceType::Logic4,
            "LOGIC_8_DEVICE" => DeviceType::Logic8,
            "LOGIC_16_DEVICE" => DeviceType::Logic16,
            "LOGIC_PRO_8_DEVICE" => DeviceType::LogicPro8,
            "LOGIC_PRO_16_DEVICE" => DeviceType::LogicPro16,
            other => DeviceType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A device as reported by `GET_CONNECTED_DEVICES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// One based position in the device list.
    pub index: u32,
    /// Human readable name.
    pub name: String,
    /// Hardware family.
    pub device_type: DeviceType,
    /// Device id, usually a hex string.
    pub id: String,
    /// Whether this is the device the service currently operates on.
    pub is_active: bool,
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(line);
        if fields.len() < 4 {
            return Err(anyhow!("Unable to parse '{}' to Device", line));
        }

        Ok(Device {
            index: parse_number(fields[0], line)?,
            name: fields[1].to_string(),
            device_type: fields[2].parse()?,
            id: fields[3].to_string(),
            is_active: fields[4..]
                .iter()
                .any(|field| field.eq_ignore_ascii_case("ACTIVE")),
        })
    }
}

/// An analyzer attached to the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analyzer {
    /// Analyzer name, e.g. `Async Serial`.
    pub analyzer_type: String,
    /// Index used to address exports.
    pub index: u32,
}

impl FromStr for Analyzer {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        // The name may itself contain commas, the index never does.
        let (analyzer_type, index) = line
            .rsplit_once(',')
            .ok_or_else(|| anyhow!("Unable to parse '{}' to Analyzer", line))?;
        let analyzer_type = analyzer_type.trim();
        if analyzer_type.is_empty() {
            return Err(anyhow!("Unable to parse '{}' to Analyzer", line));
        }

        Ok(Analyzer {
            analyzer_type: analyzer_type.to_string(),
            index: parse_number(index, line)?,
        })
    }
}

/// A digital/analog sample rate pair in samples per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleRate {
    /// Digital samples per second, 0 when no digital channel is active.
    pub digital: u32,
    /// Analog samples per second, 0 when no analog channel is active.
    pub analog: u32,
}

impl SampleRate {
    /// Both digital and analog channels are sampling.
    pub fn is_mixed(&self) -> bool {
        self.digital > 0 && self.analog > 0
    }
}

impl FromStr for SampleRate {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match split_fields(line).as_slice() {
            [digital, analog] => Ok(SampleRate {
                digital: parse_number(digital, line)?,
                analog: parse_number(analog, line)?,
            }),
            _ => Err(anyhow!("Unable to parse '{}' to SampleRate", line)),
        }
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} SPS (digital), {} SPS (analog)",
            self.digital, self.analog
        )
    }
}

/// Performance option, only meaningful while digital and analog channels are mixed.
#[derive(Debug, Clone, Copy, TryFromPrimitive, Hash, PartialEq, Eq)]
#[allow(missing_docs)]
#[repr(u8)]
pub enum PerformanceOption {
    OneHundredPercent = 100,
    EightyPercent = 80,
    SixtyPercent = 60,
    FiftyPercent = 50,
    TwentyPercent = 20,
}

impl FromStr for PerformanceOption {
    type Err = anyhow::Error;

    fn from_str(param: &str) -> Result<Self, Self::Err> {
        let percent: u8 = param
            .trim()
            .parse()
            .map_err(|_| anyhow!("Unable to parse '{}' to PerformanceOption", param))?;
        PerformanceOption::try_from_primitive(percent)
            .map_err(|_| anyhow!("Unknown performance option '{}'", percent))
    }
}

impl fmt::Display for PerformanceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", *self as u8)
    }
}

/// Trigger condition of a single digital channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Trigger {
    /// Channel does not participate in the trigger.
    #[default]
    None,
    /// Level high.
    High,
    /// Level low.
    Low,
    /// High to low transition.
    FallingEdge,
    /// Low to high transition.
    RisingEdge,
}

impl Trigger {
    /// Token used in `SET_TRIGGER`. A channel without trigger is sent as an empty field.
    pub fn as_token(&self) -> &'static str {
        match self {
            Trigger::None => "",
            Trigger::High => "high",
            Trigger::Low => "low",
            Trigger::FallingEdge => "negedge",
            Trigger::RisingEdge => "posedge",
        }
    }
}

impl FromStr for Trigger {
    type Err = anyhow::Error;

    fn from_str(param: &str) -> Result<Self, Self::Err> {
        let v: &str = &param.trim().to_ascii_lowercase();
        Ok(match v {
            "" | "none" => Trigger::None,
            "high" => Trigger::High,
            "low" => Trigger::Low,
            "negedge" => Trigger::FallingEdge,
            "posedge" => Trigger::RisingEdge,
            _ => return Err(anyhow!("Unable to parse '{}' to Trigger", v)),
        })
    }
}

/// Selectable digital input threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoltageOption {
    /// Index used to select the option.
    pub index: u32,
    /// Description, e.g. `3.3+ Volts`.
    pub description: String,
    /// Whether the option is currently in use.
    pub is_selected: bool,
}

impl FromStr for VoltageOption {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields = split_fields(line);
        if fields.len() < 2 {
            return Err(anyhow!("Unable to parse '{}' to VoltageOption", line));
        }

        Ok(VoltageOption {
            index: parse_number(fields[0], line)?,
            description: fields[1].to_string(),
            is_selected: fields[2..]
                .iter()
                .any(|field| field.eq_ignore_ascii_case("SELECTED")),
        })
    }
}

/// Channels that are currently recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveChannels {
    /// Active digital channel numbers.
    pub digital: Vec<u32>,
    /// Active analog channel numbers.
    pub analog: Vec<u32>,
}

impl ActiveChannels {
    /// Encode as the argument list of `SET_ACTIVE_CHANNELS`.
    pub fn to_arguments(&self) -> String {
        let mut args = String::new();
        if !self.digital.is_empty() {
            args.push_str(", digital_channels");
            for channel in &self.digital {
                args.push_str(&format!(", {}", channel));
            }
        }
        if !self.analog.is_empty() {
            args.push_str(", analog_channels");
            for channel in &self.analog {
                args.push_str(&format!(", {}", channel));
            }
        }
        args
    }
}

impl FromStr for ActiveChannels {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        enum Section {
            Start,
            Digital,
            Analog,
        }

        let mut channels = ActiveChannels::default();
        let mut section = Section::Start;

        for field in split_fields(line) {
            match field {
                "" => continue,
                "digital_channels" => section = Section::Digital,
                "analog_channels" => section = Section::Analog,
                number => {
                    let number = parse_number(number, line)?;
                    match section {
                        Section::Digital => channels.digital.push(number),
                        Section::Analog => channels.analog.push(number),
                        Section::Start => {
                            return Err(anyhow!(
                                "Channel number before a channel group in '{}'",
                                line
                            ))
                        }
                    }
                }
            }
        }

        Ok(channels)
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn parse_number(field: &str, line: &str) -> anyhow::Result<u32> {
    field
        .trim()
        .parse()
        .map_err(|e| anyhow!("Invalid number '{}' in '{}': {}", field.trim(), line, e))
}
