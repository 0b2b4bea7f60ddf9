//! Module containing the trigger array builder

use saleae_socket_common::Trigger;

/// Possible errors produced by the [`TriggerBuilder`]
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// No digital channel is active, so there is nothing to trigger on
    #[error("No active digital channels to build a trigger for")]
    NoChannels,
    /// A trigger was set on a channel position that does not exist
    #[error("Trigger channel {channel} is out of range for {channels} active digital channels")]
    ChannelOutOfRange {
        #[allow(missing_docs)]
        channel: usize,
        #[allow(missing_docs)]
        channels: usize,
    },
}

type Result<T> = core::result::Result<T, Error>;

/// Builder for the trigger array sent with `SET_TRIGGER`.
///
/// The service expects exactly one entry per active digital channel, in the order the channels
/// are reported. Channels that are not set explicitly are [`Trigger::None`].
pub struct TriggerBuilder {
    channels: usize,
    triggers: Vec<(usize, Trigger)>,
}

impl TriggerBuilder {
    /// Constructor, `channels` is the number of active digital channels
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            triggers: Vec::new(),
        }
    }

    /// Set the trigger of the `channel`-th active channel, later calls for the same one win
    pub fn channel(mut self, channel: usize, trigger: Trigger) -> Self {
        self.triggers.push((channel, trigger));
        self
    }

    /// Finish the trigger array
    pub fn build(self) -> Result<Vec<Trigger>> {
        if self.channels == 0 {
            return Err(Error::NoChannels);
        }

        let mut result = vec![Trigger::None; self.channels];
        for (channel, trigger) in self.triggers {
            let entry = result.get_mut(channel).ok_or(Error::ChannelOutOfRange {
                channel,
                channels: self.channels,
            })?;
            *entry = trigger;
        }
        Ok(result)
    }
}
