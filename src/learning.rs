//! Learning rules computing a raw weight gradient from a single presentation.
//!
//! Every rule returns `None` when the output already satisfies the target, in which case the weights must stay untouched.
//! Otherwise, the returned gradient points towards the correction; optimizers only scale and smooth it.
use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TempotronError;
use crate::kernel::Kernel;
use crate::neuron::Tempotron;
use crate::signal::{contributions, OutputMode, Trace};
use crate::spike_train::SpikesInput;

/// The rule to train a tempotron on binary decisions.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TrainingMethod {
    /// Credit assignment at the critical time, i.e., the time of maximum potential or of the first output spike.
    Gradient,
    /// Credit assignment proportional to the number of input spikes.
    Correlation,
}

impl FromStr for TrainingMethod {
    type Err = TempotronError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "gradient" | "∇" => Ok(TrainingMethod::Gradient),
            "correlation" | "corr" => Ok(TrainingMethod::Correlation),
            _ => Err(TempotronError::ConfigurationError(format!(
                "Unknown training method {}",
                tag
            ))),
        }
    }
}

impl fmt::Display for TrainingMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrainingMethod::Gradient => write!(f, "gradient"),
            TrainingMethod::Correlation => write!(f, "correlation"),
        }
    }
}

impl TrainingMethod {
    /// Returns the gradient for the input and the target decision, or `None` if the decision is already correct.
    pub fn gradient(
        &self,
        tempotron: &Tempotron,
        input: &SpikesInput,
        target: bool,
    ) -> Result<Option<DVector<f64>>, TempotronError> {
        match self {
            TrainingMethod::Gradient => binary_gradient(tempotron, input, target),
            TrainingMethod::Correlation => correlation_gradient(tempotron, input, target),
        }
    }
}

/// The state of the synapses at the critical time of an excess (or missing) output spike in multi-spike training.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum CriticalState {
    /// Only the input spikes received since the last output spike contribute.
    #[default]
    PostReset,
    /// All input spikes received so far contribute, as if the neuron never reset.
    PreReset,
}

impl CriticalState {
    fn since(&self, reset: f64) -> f64 {
        match self {
            CriticalState::PostReset => reset,
            CriticalState::PreReset => f64::NEG_INFINITY,
        }
    }
}

// Returns true if the potential never rises above zero, e.g., if all weights vanish or are inhibitory.
// Its maximum then lies before any input spike, where no synapse contributes.
fn is_silent(trace: &Trace, kernel: &Kernel) -> bool {
    trace.max_potential(kernel).value <= 0.0
}

// Returns the potential trace obtained with unit weights and no output spike.
fn unweighted_trace(tempotron: &Tempotron, input: &SpikesInput) -> Trace {
    Trace::new(
        tempotron.kernel(),
        &vec![1.0; tempotron.num_synapses()],
        input,
        f64::INFINITY,
        OutputMode::Binary,
    )
}

/// Gradient rule on binary decisions.
/// A silent neuron which should fire gets its weights increased by the synaptic contributions at the time of maximum potential;
/// a firing neuron which should stay silent gets its weights decreased by the synaptic contributions at its first output spike.
pub fn binary_gradient(
    tempotron: &Tempotron,
    input: &SpikesInput,
    target: bool,
) -> Result<Option<DVector<f64>>, TempotronError> {
    let trace = tempotron.trace(input, OutputMode::Binary)?;
    let kernel = tempotron.kernel();

    match (target, trace.firing_times().first()) {
        (true, None) => {
            let max = if is_silent(&trace, kernel) {
                unweighted_trace(tempotron, input).max_potential(kernel)
            } else {
                trace.max_potential(kernel)
            };
            debug!(
                "False negative: maximum potential {} at t={}",
                max.value, max.time
            );
            Ok(Some(contributions(
                kernel,
                input,
                max.time,
                f64::NEG_INFINITY,
            )))
        }
        (false, Some(&time)) => {
            debug!("False positive: first output spike at t={}", time);
            Ok(Some(-contributions(kernel, input, time, f64::NEG_INFINITY)))
        }
        _ => Ok(None),
    }
}

/// Correlation rule on binary decisions.
/// A silent neuron which should fire gets its weights increased by the number of input spikes per channel;
/// a firing neuron which should stay silent gets its weights decreased by the number of input spikes per channel before its first output spike.
pub fn correlation_gradient(
    tempotron: &Tempotron,
    input: &SpikesInput,
    target: bool,
) -> Result<Option<DVector<f64>>, TempotronError> {
    let trace = tempotron.trace(input, OutputMode::Binary)?;

    match (target, trace.firing_times().first()) {
        (true, None) => {
            debug!("False negative: correlation update over {} input spikes", input.num_spikes());
            Ok(Some(DVector::from_iterator(
                input.num_channels(),
                input.iter().map(|times| times.len() as f64),
            )))
        }
        (false, Some(&time)) => {
            debug!("False positive: correlation update before t={}", time);
            Ok(Some(DVector::from_iterator(
                input.num_channels(),
                input
                    .iter()
                    .map(|times| -(times.iter().filter(|&&t| t < time).count() as f64)),
            )))
        }
        _ => Ok(None),
    }
}

/// Gradient rule on the number of output spikes, with reset after every output spike.
/// Every excess output spike, i.e., the last ones beyond the target count, contributes a negative correction at its time;
/// every missing output spike contributes a positive correction at one of the highest subthreshold peaks of the potential.
/// All corrections are summed into a single gradient.
pub fn multi_spike_gradient(
    tempotron: &Tempotron,
    input: &SpikesInput,
    target: usize,
    critical: CriticalState,
) -> Result<Option<DVector<f64>>, TempotronError> {
    let trace = tempotron.trace(input, OutputMode::MultiSpike)?;
    let kernel = tempotron.kernel();
    let firing_times = trace.firing_times();
    let mut gradient = DVector::zeros(tempotron.num_synapses());

    if firing_times.len() == target {
        return Ok(None);
    }

    if firing_times.len() > target {
        debug!(
            "{} excess output spikes (target {})",
            firing_times.len() - target,
            target
        );
        for (j, &time) in firing_times.iter().enumerate().skip(target) {
            let reset = match j {
                0 => f64::NEG_INFINITY,
                _ => firing_times[j - 1],
            };
            gradient -= contributions(kernel, input, time, critical.since(reset));
        }
        return Ok(Some(gradient));
    }

    let num_missing = target - firing_times.len();
    let peaks = if is_silent(&trace, kernel) {
        unweighted_trace(tempotron, input).subthreshold_peaks(kernel, f64::INFINITY)
    } else {
        trace.subthreshold_peaks(kernel, tempotron.threshold())
    };
    debug!(
        "{} missing output spikes (target {}), {} subthreshold peaks",
        num_missing,
        target,
        peaks.len()
    );

    if let Some(highest) = peaks.first() {
        for pos in 0..num_missing {
            let peak = peaks.get(pos).unwrap_or(highest);
            gradient += contributions(
                kernel,
                input,
                peak.time,
                critical.since(trace.since(peak.time)),
            );
        }
    }

    Ok(Some(gradient))
}
