//! Synaptic kernel, i.e., the post-synaptic potential produced by a single input spike.
//!
//! The kernel is defined as `V0 * (exp(-t / tau_m) - exp(-t / tau_s))` for `t > 0` and zero otherwise,
//! where the normalization factor `V0` scales its peak to one.
use serde::{Deserialize, Serialize};

use crate::error::TempotronError;

/// A normalized difference-of-exponentials kernel.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Kernel {
    /// The membrane time constant.
    tau_m: f64,
    /// The synaptic time constant (smaller than the membrane time constant).
    tau_s: f64,
    /// The normalization factor.
    v0: f64,
    /// The time (after the input spike) at which the kernel peaks.
    peak_time: f64,
}

impl<'de> Deserialize<'de> for Kernel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct KernelData {
            tau_m: f64,
            tau_s: f64,
        }

        let data = KernelData::deserialize(deserializer)?;
        Kernel::build(data.tau_m, data.tau_s).map_err(serde::de::Error::custom)
    }
}

impl Kernel {
    /// Create a kernel with the specified time constants.
    /// The function returns an error if the time constants are not positive and finite, if tau_s > tau_m, or if they are equal.
    pub fn build(tau_m: f64, tau_s: f64) -> Result<Self, TempotronError> {
        if !(tau_m.is_finite() && tau_s.is_finite()) || tau_m <= 0.0 || tau_s <= 0.0 {
            return Err(TempotronError::ConfigurationError(
                "Time constants must be positive and finite".to_string(),
            ));
        }

        if tau_m == tau_s {
            return Err(TempotronError::NumericalDegeneracy(
                "The kernel peak is undefined for equal time constants".to_string(),
            ));
        }

        if tau_s > tau_m {
            return Err(TempotronError::ConfigurationError(format!(
                "The synaptic time constant {} must be smaller than the membrane time constant {}",
                tau_s, tau_m
            )));
        }

        let peak_time = tau_m * tau_s / (tau_m - tau_s) * (tau_m / tau_s).ln();
        let raw_peak = (-peak_time / tau_m).exp() - (-peak_time / tau_s).exp();
        if !(raw_peak > 0.0 && peak_time.is_finite()) {
            return Err(TempotronError::NumericalDegeneracy(format!(
                "The kernel cannot be normalized for tau_m={} and tau_s={}",
                tau_m, tau_s
            )));
        }

        Ok(Kernel {
            tau_m,
            tau_s,
            v0: 1.0 / raw_peak,
            peak_time,
        })
    }

    pub fn tau_m(&self) -> f64 {
        self.tau_m
    }

    pub fn tau_s(&self) -> f64 {
        self.tau_s
    }

    /// Returns the normalization factor.
    pub fn v0(&self) -> f64 {
        self.v0
    }

    /// Returns the time elapsed since the input spike when the kernel reaches its maximum.
    pub fn peak_time(&self) -> f64 {
        self.peak_time
    }

    /// Evaluate the kernel `dt` after the input spike.
    pub fn eval(&self, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        self.v0 * ((-dt / self.tau_m).exp() - (-dt / self.tau_s).exp())
    }

    /// Evaluate the kernel derivative `dt` after the input spike.
    pub fn eval_deriv(&self, dt: f64) -> f64 {
        if dt <= 0.0 {
            return 0.0;
        }
        self.v0 * ((-dt / self.tau_s).exp() / self.tau_s - (-dt / self.tau_m).exp() / self.tau_m)
    }
}
