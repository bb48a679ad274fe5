//! Random spike inputs, to feed tempotrons with synthetic patterns.
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

use crate::error::TempotronError;
use crate::spike_train::SpikesInput;
use crate::utils::TimeInterval;

/// Sampler of homogeneous Poisson spike inputs, independently on every channel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PoissonSampler {
    rate: f64,
    duration: TimeInterval,
}

impl PoissonSampler {
    /// Create a sampler with the specified firing rate (per channel and unit of time) over the duration.
    /// The function returns an error if the rate is not positive and finite.
    pub fn build(rate: f64, duration: TimeInterval) -> Result<Self, TempotronError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(TempotronError::ConfigurationError(format!(
                "The firing rate must be positive, got {}",
                rate
            )));
        }
        Ok(PoissonSampler { rate, duration })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn duration(&self) -> &TimeInterval {
        &self.duration
    }

    // Sample the spike times of a single channel from exponential inter-spike intervals.
    fn sample_channel<R: Rng + ?Sized>(&self, exp: &Exp<f64>, rng: &mut R) -> Vec<f64> {
        let mut times = vec![];
        let mut time = self.duration.start() + exp.sample(rng);
        while time <= self.duration.end() {
            times.push(time);
            time += exp.sample(rng);
        }
        times
    }

    fn exp(&self) -> Result<Exp<f64>, TempotronError> {
        Exp::new(self.rate).map_err(|e| TempotronError::ConfigurationError(e.to_string()))
    }

    /// Sample a spike input with the specified number of channels; some channels may be silent.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        num_channels: usize,
        rng: &mut R,
    ) -> Result<SpikesInput, TempotronError> {
        let exp = self.exp()?;
        let spike_trains = (0..num_channels)
            .map(|_| self.sample_channel(&exp, rng))
            .collect();
        SpikesInput::build(spike_trains, self.duration)
    }

    /// Sample a spike input with at least one spike per channel.
    /// Silent channels are re-drawn, at most `max_attempts` times each; the function returns an error when a channel stays silent.
    pub fn sample_non_empty<R: Rng + ?Sized>(
        &self,
        num_channels: usize,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<SpikesInput, TempotronError> {
        let exp = self.exp()?;
        let mut spike_trains = Vec::with_capacity(num_channels);

        for channel in 0..num_channels {
            let times = (0..max_attempts)
                .map(|_| self.sample_channel(&exp, rng))
                .find(|times| !times.is_empty())
                .ok_or(TempotronError::RetryExhausted {
                    attempts: max_attempts,
                })?;
            debug!("Channel {}: {} spikes", channel, times.len());
            spike_trains.push(times);
        }

        SpikesInput::build(spike_trains, self.duration)
    }
}

impl SpikesInput {
    /// Returns a copy of the input where every spike is shifted by an independent Gaussian jitter with the specified standard deviation.
    /// Jittered spikes falling outside of the duration are re-drawn, at most `max_attempts` times each.
    pub fn jitter<R: Rng + ?Sized>(
        &self,
        std: f64,
        max_attempts: usize,
        rng: &mut R,
    ) -> Result<SpikesInput, TempotronError> {
        if !(std.is_finite() && std >= 0.0) {
            return Err(TempotronError::ConfigurationError(format!(
                "The jitter standard deviation must be non-negative and finite, got {}",
                std
            )));
        }
        let normal = Normal::new(0.0, std)
            .map_err(|e| TempotronError::ConfigurationError(e.to_string()))?;

        let duration = *self.duration();
        let mut spike_trains = Vec::with_capacity(self.num_channels());
        for times in self.iter() {
            let mut jittered = Vec::with_capacity(times.len());
            for &time in times.iter() {
                let new_time = (0..max_attempts)
                    .map(|_| time + normal.sample(rng))
                    .find(|&new_time| duration.contains(new_time))
                    .ok_or(TempotronError::RetryExhausted {
                        attempts: max_attempts,
                    })?;
                jittered.push(new_time);
            }
            spike_trains.push(jittered);
        }

        SpikesInput::build(spike_trains, duration)
    }
}
