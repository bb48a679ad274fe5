//! Error module for the Tempotron library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq, Clone)]
pub enum TempotronError {
    /// Error for invalid model or optimizer parameters, e.g., time constants in the wrong order or a non-positive learning rate.
    ConfigurationError(String),
    /// Error for a mismatch between the number of input channels (or gradient entries) and the number of synapses.
    DimensionError { expected: usize, found: usize },
    /// Error for a configuration under which the synaptic kernel cannot be normalized, e.g., equal time constants.
    NumericalDegeneracy(String),
    /// Error for inconsistent spike inputs, e.g., spikes outside of the input duration.
    InvalidSpikesInput(String),
    /// Error for a bounded resampling loop which never produced a valid draw.
    RetryExhausted { attempts: usize },
}

impl fmt::Display for TempotronError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TempotronError::ConfigurationError(e) => write!(f, "Invalid configuration: {}", e),
            TempotronError::DimensionError { expected, found } => write!(
                f,
                "Dimension mismatch: expected {} synapses but found {}",
                expected, found
            ),
            TempotronError::NumericalDegeneracy(e) => write!(f, "Numerical degeneracy: {}", e),
            TempotronError::InvalidSpikesInput(e) => write!(f, "Invalid spikes input: {}", e),
            TempotronError::RetryExhausted { attempts } => {
                write!(f, "No valid sample drawn after {} attempts", attempts)
            }
        }
    }
}

impl Error for TempotronError {}
