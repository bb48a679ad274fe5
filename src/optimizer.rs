//! First-order update rules turning a raw weight gradient into a weight step.
//!
//! The training rules always provide the direction to move towards; optimizers never flip signs.
//! Optimizer state belongs to a single training run: build a fresh optimizer (or [`Optimizer::reset`] it)
//! before training an unrelated model.
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::TempotronError;

/// A stateful first-order update rule.
pub trait Optimizer {
    /// Returns the step to add to the weights for the provided raw gradient.
    fn step(&mut self, gradient: &DVector<f64>) -> Result<DVector<f64>, TempotronError>;

    /// Clear any internal state.
    fn reset(&mut self);
}

fn check_learning_rate(learning_rate: f64) -> Result<(), TempotronError> {
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(TempotronError::ConfigurationError(format!(
            "The learning rate must be positive, got {}",
            learning_rate
        )));
    }
    Ok(())
}

/// Plain gradient descent: `step = learning_rate * gradient`.
#[derive(Debug, PartialEq, Clone)]
pub struct GradientDescent {
    learning_rate: f64,
}

impl GradientDescent {
    pub fn build(learning_rate: f64) -> Result<Self, TempotronError> {
        check_learning_rate(learning_rate)?;
        Ok(GradientDescent { learning_rate })
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl Optimizer for GradientDescent {
    fn step(&mut self, gradient: &DVector<f64>) -> Result<DVector<f64>, TempotronError> {
        Ok(gradient * self.learning_rate)
    }

    fn reset(&mut self) {}
}

/// Gradient descent with momentum: `velocity = momentum * velocity + learning_rate * gradient` and `step = velocity`.
#[derive(Debug, PartialEq, Clone)]
pub struct Momentum {
    learning_rate: f64,
    momentum: f64,
    velocity: DVector<f64>,
}

impl Momentum {
    /// Create a momentum optimizer for the specified number of synapses, with zero initial velocity.
    /// The function returns an error if the learning rate is not positive or the momentum is not in [0, 1).
    pub fn build(
        learning_rate: f64,
        momentum: f64,
        num_synapses: usize,
    ) -> Result<Self, TempotronError> {
        check_learning_rate(learning_rate)?;
        if !(0.0..1.0).contains(&momentum) {
            return Err(TempotronError::ConfigurationError(format!(
                "The momentum must be in [0, 1), got {}",
                momentum
            )));
        }

        Ok(Momentum {
            learning_rate,
            momentum,
            velocity: DVector::zeros(num_synapses),
        })
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn velocity(&self) -> &DVector<f64> {
        &self.velocity
    }
}

impl Optimizer for Momentum {
    fn step(&mut self, gradient: &DVector<f64>) -> Result<DVector<f64>, TempotronError> {
        if gradient.len() != self.velocity.len() {
            return Err(TempotronError::DimensionError {
                expected: self.velocity.len(),
                found: gradient.len(),
            });
        }

        self.velocity
            .axpy(self.learning_rate, gradient, self.momentum);
        Ok(self.velocity.clone())
    }

    fn reset(&mut self) {
        self.velocity.fill(0.0);
    }
}

/// Optimizer parameters, as provided by the caller of a training run.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub learning_rate: f64,
    pub momentum: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            learning_rate: 0.01,
            momentum: 0.0,
        }
    }
}

impl OptimizerConfig {
    /// Check the learning rate and the momentum without building an optimizer.
    pub fn validate(&self) -> Result<(), TempotronError> {
        Momentum::build(self.learning_rate, self.momentum, 0).map(|_| ())
    }

    /// Build a fresh optimizer for a model with the specified number of synapses.
    /// Without momentum, the optimizer behaves as plain gradient descent.
    pub fn build(&self, num_synapses: usize) -> Result<Momentum, TempotronError> {
        Momentum::build(self.learning_rate, self.momentum, num_synapses)
    }
}
