//! This crate provides tools for simulating and training tempotrons in Rust.
//!
//! A tempotron is a leaky integrate-and-fire neuron reading out a multi-channel spike input.
//! Each input spike on channel `i` adds a weighted copy of the synaptic kernel to the membrane potential,
//! and the neuron fires whenever the potential reaches the firing threshold.
//!
//! # Simulating a Tempotron
//!
//! ```rust
//! use tempotron::neuron::Tempotron;
//! use tempotron::signal::OutputMode;
//! use tempotron::spike_train::SpikesInput;
//! use tempotron::utils::TimeInterval;
//!
//! let tempotron = Tempotron::build_from_weights(vec![1.5, -0.5], 15.0, 3.75, 1.0).unwrap();
//! let input = SpikesInput::build(
//!     vec![vec![10.0, 60.0], vec![20.0]],
//!     TimeInterval::build(0.0, 100.0).unwrap(),
//! )
//! .unwrap();
//!
//! let simulation = tempotron.simulate(&input, OutputMode::MultiSpike, Some(&[5.0, 15.0])).unwrap();
//! assert_eq!(simulation.spikes.len(), 2);
//! assert_eq!(simulation.samples[0].value, 0.0);
//! assert!(tempotron.classify(&input).unwrap());
//! ```
//!
//! # Training a Tempotron
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use tempotron::learning::TrainingMethod;
//! use tempotron::neuron::TempotronConfig;
//! use tempotron::optimizer::OptimizerConfig;
//! use tempotron::sampler::PoissonSampler;
//! use tempotron::utils::TimeInterval;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let sampler = PoissonSampler::build(0.05, TimeInterval::build(0.0, 100.0).unwrap()).unwrap();
//! let input = sampler.sample_non_empty(10, 100, &mut rng).unwrap();
//!
//! let mut tempotron = TempotronConfig::default().build().unwrap();
//! let mut optimizer = OptimizerConfig { learning_rate: 0.1, momentum: 0.0 }
//!     .build(tempotron.num_synapses())
//!     .unwrap();
//! let method: TrainingMethod = "∇".parse().unwrap();
//!
//! for _ in 0..1000 {
//!     if !tempotron.train(&input, true, method, &mut optimizer).unwrap() {
//!         break;
//!     }
//! }
//! assert!(tempotron.classify(&input).unwrap());
//! ```
pub mod error;
pub mod kernel;
pub mod learning;
pub mod metrics;
pub mod neuron;
pub mod optimizer;
pub mod sampler;
pub mod signal;
pub mod spike_train;
pub mod utils;

/// The default firing threshold.
pub const FIRING_THRESHOLD: f64 = 1.0;
