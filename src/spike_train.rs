//! Multi-channel spike inputs presented to a tempotron.
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::TempotronError;
use crate::utils::TimeInterval;

/// An input spike, i.e., a spike received along one of the input channels.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct InputSpike {
    /// The channel (synapse) along which the spike is received.
    pub channel: usize,
    /// The time at which the spike is received.
    pub time: f64,
}

impl InputSpike {
    pub fn new(channel: usize, time: f64) -> Self {
        InputSpike { channel, time }
    }
}

impl PartialOrd for InputSpike {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.time.partial_cmp(&other.time)
    }
}

/// A multi-channel spike input: one sorted sequence of spike times per channel, all within the input duration.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct SpikesInput {
    spike_trains: Vec<Vec<f64>>,
    duration: TimeInterval,
}

impl<'de> Deserialize<'de> for SpikesInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct SpikesInputData {
            spike_trains: Vec<Vec<f64>>,
            duration: TimeInterval,
        }

        let data = SpikesInputData::deserialize(deserializer)?;
        SpikesInput::build(data.spike_trains, data.duration).map_err(serde::de::Error::custom)
    }
}

impl SpikesInput {
    /// Create a spike input from one spike train per channel.
    /// If necessary, the spike times of every channel are sorted.
    /// The function returns an error if there is no channel, or if any spike time is not finite or lies outside of the duration.
    pub fn build(
        mut spike_trains: Vec<Vec<f64>>,
        duration: TimeInterval,
    ) -> Result<Self, TempotronError> {
        if spike_trains.is_empty() {
            return Err(TempotronError::InvalidSpikesInput(
                "At least one input channel is required".to_string(),
            ));
        }

        for (channel, times) in spike_trains.iter().enumerate() {
            if let Some(time) = times.iter().find(|time| !duration.contains(**time)) {
                return Err(TempotronError::InvalidSpikesInput(format!(
                    "Spike at {} on channel {} is outside of [{}, {}]",
                    time,
                    channel,
                    duration.start(),
                    duration.end()
                )));
            }
        }

        // NaN values were rejected above, since they are never contained in the duration
        spike_trains.iter_mut().for_each(|times| {
            times.sort_by(|t1, t2| t1.partial_cmp(t2).unwrap());
        });

        Ok(SpikesInput {
            spike_trains,
            duration,
        })
    }

    /// Returns the time interval over which the input is presented.
    pub fn duration(&self) -> &TimeInterval {
        &self.duration
    }

    pub fn num_channels(&self) -> usize {
        self.spike_trains.len()
    }

    /// Returns the total number of spikes over all channels.
    pub fn num_spikes(&self) -> usize {
        self.spike_trains.iter().map(|times| times.len()).sum()
    }

    /// Returns the sorted spike times of a channel, if it exists.
    pub fn channel(&self, channel: usize) -> Option<&[f64]> {
        self.spike_trains.get(channel).map(|times| times.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec<f64>> {
        self.spike_trains.iter()
    }

    /// Returns all input spikes merged across channels and sorted by time of arrival.
    pub fn events(&self) -> Vec<InputSpike> {
        self.spike_trains
            .iter()
            .enumerate()
            .map(|(channel, times)| times.iter().map(move |&time| InputSpike::new(channel, time)))
            .kmerge_by(|spike_1, spike_2| spike_1.time < spike_2.time)
            .collect()
    }
}
