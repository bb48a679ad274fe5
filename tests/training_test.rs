use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use tempotron::learning::{CriticalState, TrainingMethod};
use tempotron::metrics::accuracy;
use tempotron::neuron::Tempotron;
use tempotron::optimizer::{GradientDescent, Momentum, Optimizer};
use tempotron::sampler::PoissonSampler;
use tempotron::signal::OutputMode;
use tempotron::spike_train::SpikesInput;
use tempotron::utils::TimeInterval;

const NUM_SYNAPSES: usize = 10;
const MAX_ITER: usize = 1000;

fn duration() -> TimeInterval {
    TimeInterval::build(0.0, 100.0).unwrap()
}

/// Two spikes per channel, one early and one late.
fn two_spikes_input() -> SpikesInput {
    SpikesInput::build(
        (0..NUM_SYNAPSES)
            .map(|i| vec![2.0 + 9.5 * i as f64, 60.0 + 3.0 * i as f64])
            .collect(),
        duration(),
    )
    .unwrap()
}

fn tempotron(weight: f64) -> Tempotron {
    Tempotron::build_from_weights(vec![weight; NUM_SYNAPSES], 15.0, 5.0, 1.0).unwrap()
}

// Returns the number of presentations until the tempotron makes the right decision.
fn train_until_correct<O: Optimizer>(
    tempotron: &mut Tempotron,
    input: &SpikesInput,
    target: bool,
    method: TrainingMethod,
    optimizer: &mut O,
) -> Option<usize> {
    (0..MAX_ITER).find(|_| !tempotron.train(input, target, method, optimizer).unwrap())
}

#[test]
fn test_silent_to_firing() {
    let input = two_spikes_input();
    let mut tempotron = tempotron(0.0);
    assert_eq!(tempotron.classify(&input), Ok(false));

    let mut optimizer = GradientDescent::build(0.1).unwrap();
    let num_iter =
        train_until_correct(&mut tempotron, &input, true, TrainingMethod::Gradient, &mut optimizer);
    assert!(num_iter.is_some());
    assert_eq!(tempotron.classify(&input), Ok(true));
}

#[test]
fn test_firing_to_silent() {
    let input = two_spikes_input();
    let mut tempotron = tempotron(1.0);
    assert_eq!(tempotron.classify(&input), Ok(true));

    let mut optimizer = GradientDescent::build(0.1).unwrap();
    let num_iter = train_until_correct(
        &mut tempotron,
        &input,
        false,
        TrainingMethod::Gradient,
        &mut optimizer,
    );
    assert!(num_iter.is_some());
    assert_eq!(tempotron.classify(&input), Ok(false));
    let simulation = tempotron.simulate(&input, OutputMode::Binary, None).unwrap();
    assert!(simulation.max_potential.value < 1.0);
}

#[test]
fn test_inhibitory_to_firing() {
    let input = two_spikes_input();

    let mut tempotron_1 = tempotron(-0.5);
    let mut optimizer = GradientDescent::build(0.1).unwrap();
    let num_iter = train_until_correct(
        &mut tempotron_1,
        &input,
        true,
        TrainingMethod::Gradient,
        &mut optimizer,
    );
    assert!(num_iter.is_some());
    assert_eq!(tempotron_1.classify(&input), Ok(true));

    let mut tempotron_2 = tempotron(-0.5);
    let num_iter = (0..MAX_ITER).find(|_| {
        !tempotron_2
            .train_count(&input, 1, CriticalState::PostReset, &mut optimizer)
            .unwrap()
    });
    assert!(num_iter.is_some());
    assert_eq!(tempotron_2.count_spikes(&input), Ok(1));
}

#[test]
fn test_momentum_training() {
    let input = two_spikes_input();

    let mut tempotron_1 = tempotron(0.0);
    let mut optimizer = Momentum::build(0.02, 0.9, NUM_SYNAPSES).unwrap();
    assert!(train_until_correct(
        &mut tempotron_1,
        &input,
        true,
        TrainingMethod::Gradient,
        &mut optimizer
    )
    .is_some());

    // a fresh optimizer for an unrelated model
    let mut tempotron_2 = tempotron(1.0);
    let mut optimizer = Momentum::build(0.02, 0.9, NUM_SYNAPSES).unwrap();
    assert!(train_until_correct(
        &mut tempotron_2,
        &input,
        false,
        TrainingMethod::Gradient,
        &mut optimizer
    )
    .is_some());
}

#[test]
fn test_correlation_training() {
    let input = two_spikes_input();
    let method: TrainingMethod = "corr".parse().unwrap();

    let mut tempotron_1 = tempotron(0.0);
    let mut optimizer = GradientDescent::build(0.01).unwrap();
    assert!(train_until_correct(&mut tempotron_1, &input, true, method, &mut optimizer).is_some());
    assert_eq!(tempotron_1.classify(&input), Ok(true));

    let mut tempotron_2 = tempotron(1.0);
    assert!(train_until_correct(&mut tempotron_2, &input, false, method, &mut optimizer).is_some());
    assert_eq!(tempotron_2.classify(&input), Ok(false));
}

#[test]
fn test_binary_separability() {
    // one spike per channel, early and forward in A, late and backward in B
    let input_a = SpikesInput::build(
        (0..NUM_SYNAPSES).map(|i| vec![5.0 + 4.0 * i as f64]).collect(),
        duration(),
    )
    .unwrap();
    let input_b = SpikesInput::build(
        (0..NUM_SYNAPSES).map(|i| vec![90.0 - 8.0 * i as f64]).collect(),
        duration(),
    )
    .unwrap();

    let cases = [
        (TrainingMethod::Gradient, 0.1, true),
        (TrainingMethod::Gradient, 0.1, false),
        (TrainingMethod::Correlation, 0.01, true),
    ];
    for (method, learning_rate, target_a) in cases {
        let samples = vec![(input_a.clone(), target_a), (input_b.clone(), !target_a)];
        let mut tempotron = tempotron(0.0);
        let mut optimizer = GradientDescent::build(learning_rate).unwrap();

        let num_epochs = (0..MAX_ITER).find(|_| {
            tempotron
                .train_epoch(&samples, method, &mut optimizer)
                .unwrap()
                == 0
        });
        assert!(num_epochs.is_some());
        assert_eq!(tempotron.classify(&input_a), Ok(target_a));
        assert_eq!(tempotron.classify(&input_b), Ok(!target_a));
        assert_eq!(accuracy(&tempotron, &samples), Ok(1.0));
    }
}

#[test]
fn test_multi_spike_count_training() {
    let input = two_spikes_input();

    for critical in [CriticalState::PostReset, CriticalState::PreReset] {
        for (weight, targets) in [(0.0, vec![1, 2, 3, 5, 8]), (1.0, vec![0, 1, 2, 4])] {
            for target in targets {
                let mut tempotron = tempotron(weight);
                let mut optimizer = GradientDescent::build(0.05).unwrap();
                let num_iter = (0..MAX_ITER).find(|_| {
                    !tempotron
                        .train_count(&input, target, critical, &mut optimizer)
                        .unwrap()
                });
                assert!(
                    num_iter.is_some(),
                    "no convergence to {} spikes with {:?}",
                    target,
                    critical
                );
                assert_eq!(tempotron.count_spikes(&input), Ok(target));
            }
        }
    }
}

#[test]
fn test_count_monotone_in_excitatory_weights() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..100 {
        let spike_trains: Vec<Vec<f64>> = (0..8)
            .map(|_| {
                (0..rng.gen_range(0..6))
                    .map(|_| rng.gen_range(0.0..100.0))
                    .collect()
            })
            .collect();
        let input = SpikesInput::build(spike_trains, duration()).unwrap();

        let weights: Vec<f64> = (0..8).map(|_| rng.gen_range(0.0..0.6)).collect();
        let more_weights: Vec<f64> = weights
            .iter()
            .map(|w| w + rng.gen_range(0.0..0.3))
            .collect();

        let count = Tempotron::build_from_weights(weights, 15.0, 5.0, 1.0)
            .unwrap()
            .count_spikes(&input)
            .unwrap();
        let more_count = Tempotron::build_from_weights(more_weights, 15.0, 5.0, 1.0)
            .unwrap()
            .count_spikes(&input)
            .unwrap();
        assert!(more_count >= count);
    }
}

#[test]
fn test_poisson_driven_training() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let sampler = PoissonSampler::build(0.05, duration()).unwrap();
    let input = sampler.sample_non_empty(NUM_SYNAPSES, 100, &mut rng).unwrap();

    let mut tempotron = Tempotron::rand(NUM_SYNAPSES, 15.0, 3.75, 1.0, (0.0, 0.05), &mut rng).unwrap();
    let mut optimizer = Momentum::build(0.05, 0.5, NUM_SYNAPSES).unwrap();
    assert!(train_until_correct(
        &mut tempotron,
        &input,
        true,
        TrainingMethod::Gradient,
        &mut optimizer
    )
    .is_some());

    // then ask for one more output spike
    let target = tempotron.count_spikes(&input).unwrap() + 1;
    let mut optimizer = GradientDescent::build(0.05).unwrap();
    assert!((0..MAX_ITER)
        .find(|_| !tempotron
            .train_count(&input, target, CriticalState::default(), &mut optimizer)
            .unwrap())
        .is_some());
    assert_eq!(tempotron.count_spikes(&input), Ok(target));
}
