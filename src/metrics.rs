//! Read-only evaluation of a tempotron over labelled datasets.
use rayon::prelude::*;

use crate::error::TempotronError;
use crate::neuron::Tempotron;
use crate::spike_train::SpikesInput;

/// The minimum number of samples to evaluate a dataset in parallel.
pub const MIN_PARALLEL_SAMPLES: usize = 64;

// Apply the function to every sample, in parallel for large datasets.
fn eval_samples<T, U, F>(samples: &[T], f: F) -> Result<Vec<U>, TempotronError>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U, TempotronError> + Sync + Send,
{
    if samples.is_empty() {
        return Err(TempotronError::ConfigurationError(
            "Cannot evaluate an empty dataset".to_string(),
        ));
    }

    if samples.len() >= MIN_PARALLEL_SAMPLES {
        samples.par_iter().map(f).collect()
    } else {
        samples.iter().map(f).collect()
    }
}

/// Returns the fraction of inputs on which the tempotron decision matches the label.
pub fn accuracy(
    tempotron: &Tempotron,
    samples: &[(SpikesInput, bool)],
) -> Result<f64, TempotronError> {
    let hits = eval_samples(samples, |(input, target)| {
        Ok(tempotron.classify(input)? == *target)
    })?;
    Ok(hits.iter().filter(|&&hit| hit).count() as f64 / samples.len() as f64)
}

/// Returns the mean absolute difference between the number of output spikes and the target count.
pub fn mean_count_error(
    tempotron: &Tempotron,
    samples: &[(SpikesInput, usize)],
) -> Result<f64, TempotronError> {
    let errors = eval_samples(samples, |(input, target)| {
        Ok(tempotron.count_spikes(input)?.abs_diff(*target))
    })?;
    Ok(errors.iter().sum::<usize>() as f64 / samples.len() as f64)
}
