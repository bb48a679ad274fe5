use std::error::Error;

use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tempotron::learning::{CriticalState, TrainingMethod};
use tempotron::metrics::{accuracy, mean_count_error};
use tempotron::neuron::TempotronConfig;
use tempotron::optimizer::OptimizerConfig;
use tempotron::sampler::PoissonSampler;
use tempotron::spike_train::SpikesInput;
use tempotron::utils::TimeInterval;

#[derive(Parser, Debug)]
struct Args {
    /// The seed used for pattern sampling and jitter
    #[arg(long, default_value = "42")]
    seed: u64,
    /// The number of synapses
    #[arg(short = 'N', long, default_value = "500")]
    num_synapses: usize,
    /// The number of patterns, half of them labelled to fire
    #[arg(short = 'P', long, default_value = "100")]
    num_patterns: usize,
    /// The pattern duration
    #[arg(short = 'T', long, default_value = "500.0")]
    duration: f64,
    /// The firing rate per channel
    #[arg(long, default_value = "0.005")]
    firing_rate: f64,
    /// The membrane time constant
    #[arg(long, default_value = "15.0")]
    tau_m: f64,
    /// The synaptic time constant
    #[arg(long, default_value = "3.75")]
    tau_s: f64,
    /// The training method, must be one of: gradient (or ∇), correlation (or corr)
    #[arg(long, default_value = "gradient")]
    method: String,
    /// Train on spike counts instead of binary decisions, with patterns labelled 0 or this count
    #[arg(long)]
    target_count: Option<usize>,
    /// The learning rate
    #[arg(long, default_value = "0.001")]
    learning_rate: f64,
    /// The momentum
    #[arg(long, default_value = "0.9")]
    momentum: f64,
    /// The number of training epochs
    #[arg(long, default_value = "100")]
    num_epochs: usize,
    /// The standard deviation of the spike jitter applied at every presentation
    #[arg(long, default_value = "0.0")]
    std_jitter: f64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} - {m}\n")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
    log4rs::init_config(config)?;

    log::info!("{:?}", args);

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let duration = TimeInterval::build(0.0, args.duration)?;
    let sampler = PoissonSampler::build(args.firing_rate, duration)?;
    let patterns = (0..args.num_patterns)
        .map(|_| sampler.sample(args.num_synapses, &mut rng))
        .collect::<Result<Vec<SpikesInput>, _>>()?;
    log::info!("Pattern sampling: done!");

    let mut tempotron = TempotronConfig {
        num_synapses: args.num_synapses,
        tau_m: args.tau_m,
        tau_s: args.tau_s,
        ..TempotronConfig::default()
    }
    .build()?;
    let mut optimizer = OptimizerConfig {
        learning_rate: args.learning_rate,
        momentum: args.momentum,
    }
    .build(args.num_synapses)?;

    match args.target_count {
        None => {
            let method: TrainingMethod = args.method.parse()?;
            let samples: Vec<(SpikesInput, bool)> = patterns
                .into_iter()
                .enumerate()
                .map(|(i, input)| (input, i % 2 == 0))
                .collect();

            for epoch in 0..args.num_epochs {
                let mut num_errors = 0;
                for (input, target) in samples.iter() {
                    let input = input.jitter(args.std_jitter, 100, &mut rng)?;
                    if tempotron.train(&input, *target, method, &mut optimizer)? {
                        num_errors += 1;
                    }
                }
                log::info!(
                    "Epoch {}: {} errors, accuracy is {:.3}",
                    epoch,
                    num_errors,
                    accuracy(&tempotron, &samples)?
                );
                if num_errors == 0 && args.std_jitter == 0.0 {
                    break;
                }
            }
        }
        Some(count) => {
            let samples: Vec<(SpikesInput, usize)> = patterns
                .into_iter()
                .enumerate()
                .map(|(i, input)| (input, if i % 2 == 0 { count } else { 0 }))
                .collect();

            for epoch in 0..args.num_epochs {
                let mut num_errors = 0;
                for (input, target) in samples.iter() {
                    let input = input.jitter(args.std_jitter, 100, &mut rng)?;
                    if tempotron.train_count(
                        &input,
                        *target,
                        CriticalState::default(),
                        &mut optimizer,
                    )? {
                        num_errors += 1;
                    }
                }
                log::info!(
                    "Epoch {}: {} errors, mean count error is {:.3}",
                    epoch,
                    num_errors,
                    mean_count_error(&tempotron, &samples)?
                );
                if num_errors == 0 && args.std_jitter == 0.0 {
                    break;
                }
            }
        }
    }

    log::info!("Training: done!");
    Ok(())
}
