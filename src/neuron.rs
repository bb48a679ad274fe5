//! This module provides the `Tempotron`, a single leaky integrate-and-fire neuron reading out multi-channel spike inputs.
use log::{debug, warn};
use nalgebra::DVector;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TempotronError;
use crate::kernel::Kernel;
use crate::learning::{multi_spike_gradient, CriticalState, TrainingMethod};
use crate::optimizer::Optimizer;
use crate::signal::{OutputMode, Trace};
use crate::spike_train::SpikesInput;
use crate::utils::TimeValuePair;
use crate::FIRING_THRESHOLD;

/// The response of a tempotron to a spike input.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// The (sorted) output spike times.
    pub spikes: Vec<f64>,
    /// The membrane potential at the requested sample times.
    pub samples: Vec<TimeValuePair<f64>>,
    /// The global maximum of the membrane potential over the input duration.
    pub max_potential: TimeValuePair<f64>,
}

/// A tempotron with one weighted synapse per input channel.
#[derive(Debug, PartialEq, Clone)]
pub struct Tempotron {
    // The synaptic weights.
    weights: DVector<f64>,
    // The synaptic kernel.
    kernel: Kernel,
    // The firing threshold.
    threshold: f64,
}

impl Serialize for Tempotron {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        #[derive(Serialize)]
        struct TempotronData<'a> {
            weights: &'a [f64],
            kernel: &'a Kernel,
            threshold: f64,
        }

        TempotronData {
            weights: self.weights.as_slice(),
            kernel: &self.kernel,
            threshold: self.threshold,
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tempotron {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct TempotronData {
            weights: Vec<f64>,
            kernel: Kernel,
            threshold: f64,
        }

        let data = TempotronData::deserialize(deserializer)?;
        Tempotron::build_from_weights(
            data.weights,
            data.kernel.tau_m(),
            data.kernel.tau_s(),
            data.threshold,
        )
        .map_err(serde::de::Error::custom)
    }
}

impl Tempotron {
    /// Create a tempotron with the specified number of synapses, all with zero weight.
    /// The function returns an error if there is no synapse or if the time constants are invalid (see [`Kernel::build`]).
    pub fn build(
        num_synapses: usize,
        tau_m: f64,
        tau_s: f64,
        threshold: f64,
    ) -> Result<Self, TempotronError> {
        Self::build_from_weights(vec![0.0; num_synapses], tau_m, tau_s, threshold)
    }

    /// Create a tempotron with the specified synaptic weights.
    pub fn build_from_weights(
        weights: Vec<f64>,
        tau_m: f64,
        tau_s: f64,
        threshold: f64,
    ) -> Result<Self, TempotronError> {
        if weights.is_empty() {
            return Err(TempotronError::ConfigurationError(
                "A tempotron needs at least one synapse".to_string(),
            ));
        }
        if weights.iter().any(|weight| !weight.is_finite()) {
            return Err(TempotronError::ConfigurationError(
                "Synaptic weights must be finite".to_string(),
            ));
        }
        if !threshold.is_finite() {
            return Err(TempotronError::ConfigurationError(
                "The firing threshold must be finite".to_string(),
            ));
        }
        if threshold <= 0.0 {
            warn!(
                "Non-positive firing threshold {}: every input fires the neuron immediately",
                threshold
            );
        }

        Ok(Tempotron {
            weights: DVector::from_vec(weights),
            kernel: Kernel::build(tau_m, tau_s)?,
            threshold,
        })
    }

    /// Create a tempotron whose weights are drawn uniformly at random in `[lim_weights.0, lim_weights.1)`.
    pub fn rand<R: Rng + ?Sized>(
        num_synapses: usize,
        tau_m: f64,
        tau_s: f64,
        threshold: f64,
        lim_weights: (f64, f64),
        rng: &mut R,
    ) -> Result<Self, TempotronError> {
        if !(lim_weights.0 < lim_weights.1 && lim_weights.0.is_finite() && lim_weights.1.is_finite())
        {
            return Err(TempotronError::ConfigurationError(format!(
                "Invalid weight range [{}, {})",
                lim_weights.0, lim_weights.1
            )));
        }
        let uniform = Uniform::new(lim_weights.0, lim_weights.1);
        let weights = (0..num_synapses).map(|_| uniform.sample(rng)).collect();
        Self::build_from_weights(weights, tau_m, tau_s, threshold)
    }

    pub fn num_synapses(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Replace the synaptic weights.
    /// The function returns an error if the number of weights does not match the number of synapses.
    pub fn set_weights(&mut self, weights: DVector<f64>) -> Result<(), TempotronError> {
        if weights.len() != self.num_synapses() {
            return Err(TempotronError::DimensionError {
                expected: self.num_synapses(),
                found: weights.len(),
            });
        }
        self.weights = weights;
        Ok(())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    fn check_input(&self, input: &SpikesInput) -> Result<(), TempotronError> {
        if input.num_channels() != self.num_synapses() {
            return Err(TempotronError::DimensionError {
                expected: self.num_synapses(),
                found: input.num_channels(),
            });
        }
        Ok(())
    }

    /// Compute the potential trace and the output spikes in response to the input.
    pub fn trace(&self, input: &SpikesInput, mode: OutputMode) -> Result<Trace, TempotronError> {
        self.check_input(input)?;
        Ok(Trace::new(
            &self.kernel,
            self.weights.as_slice(),
            input,
            self.threshold,
            mode,
        ))
    }

    /// Returns the membrane potential at the given time, ignoring any reset.
    pub fn potential(&self, input: &SpikesInput, time: f64) -> Result<f64, TempotronError> {
        Ok(self.trace(input, OutputMode::Binary)?.potential(&self.kernel, time))
    }

    /// Simulate the tempotron on the input, optionally sampling the membrane potential at the given times.
    pub fn simulate(
        &self,
        input: &SpikesInput,
        mode: OutputMode,
        sample_times: Option<&[f64]>,
    ) -> Result<Simulation, TempotronError> {
        let trace = self.trace(input, mode)?;
        let samples = sample_times
            .unwrap_or_default()
            .iter()
            .map(|&time| TimeValuePair {
                time,
                value: trace.potential(&self.kernel, time),
            })
            .collect();

        Ok(Simulation {
            spikes: trace.firing_times().to_vec(),
            samples,
            max_potential: trace.max_potential(&self.kernel),
        })
    }

    /// Returns whether the tempotron fires in response to the input.
    pub fn classify(&self, input: &SpikesInput) -> Result<bool, TempotronError> {
        Ok(!self.trace(input, OutputMode::Binary)?.firing_times().is_empty())
    }

    /// Returns the number of output spikes in response to the input, with reset after every spike.
    pub fn count_spikes(&self, input: &SpikesInput) -> Result<usize, TempotronError> {
        Ok(self.trace(input, OutputMode::MultiSpike)?.firing_times().len())
    }

    // Add the optimizer step for the gradient to the weights.
    fn apply_gradient<O: Optimizer + ?Sized>(
        &mut self,
        gradient: &DVector<f64>,
        optimizer: &mut O,
    ) -> Result<(), TempotronError> {
        let step = optimizer.step(gradient)?;
        if step.len() != self.num_synapses() {
            return Err(TempotronError::DimensionError {
                expected: self.num_synapses(),
                found: step.len(),
            });
        }
        self.weights += step;
        Ok(())
    }

    /// Present the input with the target decision (fire or stay silent) and update the weights in place.
    /// Returns whether the tempotron misclassified the input, i.e., whether the weights were updated.
    pub fn train<O: Optimizer + ?Sized>(
        &mut self,
        input: &SpikesInput,
        target: bool,
        method: TrainingMethod,
        optimizer: &mut O,
    ) -> Result<bool, TempotronError> {
        match method.gradient(self, input, target)? {
            Some(gradient) => {
                debug!(
                    "Misclassified input (target {}), {} update with gradient norm {}",
                    target,
                    method,
                    gradient.norm()
                );
                self.apply_gradient(&gradient, optimizer)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Present the input with a target number of output spikes and update the weights in place.
    /// Returns whether the number of output spikes differed from the target, i.e., whether the weights were updated.
    pub fn train_count<O: Optimizer + ?Sized>(
        &mut self,
        input: &SpikesInput,
        target: usize,
        critical: CriticalState,
        optimizer: &mut O,
    ) -> Result<bool, TempotronError> {
        match multi_spike_gradient(self, input, target, critical)? {
            Some(gradient) => {
                debug!(
                    "Wrong spike count (target {}), update with gradient norm {}",
                    target,
                    gradient.norm()
                );
                self.apply_gradient(&gradient, optimizer)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Present every labelled input once, in order.
    /// Returns the number of misclassified presentations.
    pub fn train_epoch<O: Optimizer + ?Sized>(
        &mut self,
        samples: &[(SpikesInput, bool)],
        method: TrainingMethod,
        optimizer: &mut O,
    ) -> Result<usize, TempotronError> {
        let mut num_errors = 0;
        for (input, target) in samples.iter() {
            if self.train(input, *target, method, optimizer)? {
                num_errors += 1;
            }
        }
        Ok(num_errors)
    }
}

/// Tempotron parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TempotronConfig {
    pub num_synapses: usize,
    pub tau_m: f64,
    pub tau_s: f64,
    pub threshold: f64,
}

impl Default for TempotronConfig {
    fn default() -> Self {
        TempotronConfig {
            num_synapses: 10,
            tau_m: 15.0,
            tau_s: 3.75,
            threshold: FIRING_THRESHOLD,
        }
    }
}

impl TempotronConfig {
    /// Parse a configuration from a JSON string; missing fields are not allowed.
    pub fn from_json(json: &str) -> Result<Self, TempotronError> {
        serde_json::from_str(json).map_err(|e| TempotronError::ConfigurationError(e.to_string()))
    }

    /// Build a tempotron with zero weights.
    pub fn build(&self) -> Result<Tempotron, TempotronError> {
        Tempotron::build(self.num_synapses, self.tau_m, self.tau_s, self.threshold)
    }
}
