//! Event-driven evaluation of the membrane potential.
//!
//! Between two consecutive input spikes, the potential reads
//! `V(t) = a * exp(-(t - t0) / tau_m) - b * exp(-(t - t0) / tau_s)`
//! for some coefficients `a` and `b` accumulated over the past input spikes.
//! A trace is a sequence of such segments covering the input duration.
//! On each segment, the potential has at most one stationary point, which is available in closed form;
//! threshold crossings are then located by bisection on an interval where the potential is increasing.
use log::trace;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::kernel::Kernel;
use crate::spike_train::SpikesInput;
use crate::utils::TimeValuePair;

/// The resolution at which threshold crossings are located.
pub const TIME_TOLERANCE: f64 = 1e-12;
/// The maximum number of bisection steps to locate a threshold crossing.
pub const MAX_BISECTION_ITER: usize = 128;

/// The rule to produce output spikes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum OutputMode {
    /// The neuron fires at most once, at the first threshold crossing; the potential is never reset.
    Binary,
    /// The neuron fires at every threshold crossing; after each output spike, the contribution of all past input spikes is shunted.
    MultiSpike,
}

/// A piece of the membrane potential between two consecutive events.
#[derive(Debug, PartialEq, Clone)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    /// Coefficient of the membrane exponential at the segment start.
    pub a: f64,
    /// Coefficient of the synaptic exponential at the segment start.
    pub b: f64,
    /// The time of the last reset; input spikes received up to then no longer contribute.
    pub since: f64,
}

impl Segment {
    pub fn potential(&self, kernel: &Kernel, time: f64) -> f64 {
        let dt = time - self.start;
        self.a * (-dt / kernel.tau_m()).exp() - self.b * (-dt / kernel.tau_s()).exp()
    }

    pub fn potential_deriv(&self, kernel: &Kernel, time: f64) -> f64 {
        let dt = time - self.start;
        self.b * (-dt / kernel.tau_s()).exp() / kernel.tau_s()
            - self.a * (-dt / kernel.tau_m()).exp() / kernel.tau_m()
    }

    /// Returns the stationary point of the potential strictly inside the segment, if any.
    fn stationary_time(&self, kernel: &Kernel) -> Option<f64> {
        let ratio = (self.b * kernel.tau_m()) / (self.a * kernel.tau_s());
        if !(ratio.is_finite() && ratio > 0.0) {
            return None;
        }
        let time = self.start
            + ratio.ln() * kernel.tau_m() * kernel.tau_s() / (kernel.tau_m() - kernel.tau_s());
        if time > self.start && time < self.end {
            Some(time)
        } else {
            None
        }
    }

    /// Returns the interior local maximum of the potential, if any.
    fn local_max(&self, kernel: &Kernel) -> Option<TimeValuePair<f64>> {
        self.stationary_time(kernel)
            .filter(|&time| {
                let dt = time - self.start;
                // the second derivative is negative at a maximum
                self.a * (-dt / kernel.tau_m()).exp() / kernel.tau_m().powi(2)
                    < self.b * (-dt / kernel.tau_s()).exp() / kernel.tau_s().powi(2)
            })
            .map(|time| TimeValuePair {
                time,
                value: self.potential(kernel, time),
            })
    }

    /// Returns the maximum potential on the segment, the earliest one in case of ties.
    pub fn max_potential(&self, kernel: &Kernel) -> TimeValuePair<f64> {
        let mut max = TimeValuePair {
            time: self.start,
            value: self.potential(kernel, self.start),
        };
        for time in self.stationary_time(kernel).into_iter().chain([self.end]) {
            let value = self.potential(kernel, time);
            if value > max.value {
                max = TimeValuePair { time, value };
            }
        }
        max
    }

    /// Returns the first time at which the potential reaches the threshold on the segment, if any.
    /// The returned time always satisfies the threshold, up to the time resolution.
    pub fn threshold_crossing(&self, kernel: &Kernel, threshold: f64) -> Option<f64> {
        if self.potential(kernel, self.start) >= threshold {
            return Some(self.start);
        }

        // The potential is below threshold at the segment start and has at most one stationary point.
        // If the threshold is reached, it is reached on [start, hi] where the potential is first below and then above.
        let mut hi = match self.stationary_time(kernel) {
            Some(time) if self.potential(kernel, time) >= threshold => time,
            _ if self.potential(kernel, self.end) >= threshold => self.end,
            _ => return None,
        };
        let mut lo = self.start;

        for _ in 0..MAX_BISECTION_ITER {
            if hi - lo <= TIME_TOLERANCE {
                break;
            }
            let mid = 0.5 * (lo + hi);
            if self.potential(kernel, mid) >= threshold {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        Some(hi)
    }
}

/// The membrane potential and the output spikes of a neuron in response to an input.
#[derive(Debug, PartialEq, Clone)]
pub struct Trace {
    segments: Vec<Segment>,
    firing_times: Vec<f64>,
}

impl Trace {
    /// Compute the trace produced by the input through synapses with the given weights.
    /// The number of weights must match the number of input channels.
    pub fn new(
        kernel: &Kernel,
        weights: &[f64],
        input: &SpikesInput,
        threshold: f64,
        mode: OutputMode,
    ) -> Self {
        let events = input.events();
        let end = input.duration().end();

        let mut segments: Vec<Segment> = Vec::with_capacity(events.len() + 1);
        let mut firing_times: Vec<f64> = vec![];

        let mut start = input.duration().start();
        let (mut a, mut b) = (0.0, 0.0);
        let mut since = f64::NEG_INFINITY;
        let mut pos = 0;

        while pos < events.len() && events[pos].time <= start {
            a += kernel.v0() * weights[events[pos].channel];
            b += kernel.v0() * weights[events[pos].channel];
            pos += 1;
        }

        loop {
            let next = events.get(pos).map_or(end, |spike| spike.time.min(end));
            let mut segment = Segment {
                start,
                end: next,
                a,
                b,
                since,
            };

            if mode == OutputMode::MultiSpike || firing_times.is_empty() {
                // a crossing right at a reset would not be driven by new input spikes
                if let Some(time) = segment
                    .threshold_crossing(kernel, threshold)
                    .filter(|&time| time > since)
                {
                    trace!("Threshold crossing at t={}", time);
                    firing_times.push(time);

                    if mode == OutputMode::MultiSpike {
                        segment.end = time;
                        segments.push(segment);

                        start = time;
                        (a, b) = (0.0, 0.0);
                        since = time;
                        while pos < events.len() && events[pos].time <= time {
                            pos += 1;
                        }
                        continue;
                    }
                }
            }

            segments.push(segment);
            if next >= end {
                break;
            }

            a *= (-(next - start) / kernel.tau_m()).exp();
            b *= (-(next - start) / kernel.tau_s()).exp();
            start = next;
            while pos < events.len() && events[pos].time <= start {
                a += kernel.v0() * weights[events[pos].channel];
                b += kernel.v0() * weights[events[pos].channel];
                pos += 1;
            }
        }

        Trace {
            segments,
            firing_times,
        }
    }

    /// Returns the (sorted) output spike times.
    pub fn firing_times(&self) -> &[f64] {
        &self.firing_times
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    // Returns the position of the segment governing the given time, if any.
    fn find_segment(&self, time: f64) -> Option<usize> {
        match self
            .segments
            .partition_point(|segment| segment.start <= time)
        {
            0 => None,
            pos => Some(pos - 1),
        }
    }

    /// Returns the membrane potential at the given time.
    /// The potential vanishes before the input starts and keeps decaying after it ends.
    pub fn potential(&self, kernel: &Kernel, time: f64) -> f64 {
        match self.find_segment(time) {
            Some(pos) => self.segments[pos].potential(kernel, time),
            None => 0.0,
        }
    }

    /// Returns the time of the last reset before the given time, or minus infinity if there is none.
    pub fn since(&self, time: f64) -> f64 {
        match self.find_segment(time) {
            Some(pos) => self.segments[pos].since,
            None => f64::NEG_INFINITY,
        }
    }

    /// Returns the global maximum of the potential over the input duration, the earliest one in case of ties.
    pub fn max_potential(&self, kernel: &Kernel) -> TimeValuePair<f64> {
        self.segments
            .iter()
            .map(|segment| segment.max_potential(kernel))
            .fold(None, |acc: Option<TimeValuePair<f64>>, max| match acc {
                Some(acc) if acc.value >= max.value => Some(acc),
                _ => Some(max),
            })
            .unwrap_or(TimeValuePair {
                time: f64::NAN,
                value: 0.0,
            })
    }

    /// Returns the local maxima of the potential which stay below the threshold, sorted by decreasing potential.
    /// Besides interior maxima, a segment end is a local maximum if the potential increases up to it and decreases right after,
    /// e.g., on the arrival of an inhibitory input spike, or at the end of the input.
    pub fn subthreshold_peaks(&self, kernel: &Kernel, threshold: f64) -> Vec<TimeValuePair<f64>> {
        let mut peaks: Vec<TimeValuePair<f64>> = vec![];

        for (pos, segment) in self.segments.iter().enumerate() {
            if let Some(peak) = segment.local_max(kernel) {
                peaks.push(peak);
            }

            if segment.end > segment.start && segment.potential_deriv(kernel, segment.end) > 0.0 {
                let is_peak = match self.segments.get(pos + 1) {
                    Some(next) => {
                        next.since == segment.since && next.potential_deriv(kernel, next.start) <= 0.0
                    }
                    None => true,
                };
                if is_peak {
                    peaks.push(TimeValuePair {
                        time: segment.end,
                        value: segment.potential(kernel, segment.end),
                    });
                }
            }
        }

        peaks.retain(|peak| peak.value < threshold);
        peaks.sort_by(|peak_1, peak_2| {
            peak_2
                .value
                .partial_cmp(&peak_1.value)
                .unwrap_or(Ordering::Equal)
                .then(peak_1.time.partial_cmp(&peak_2.time).unwrap_or(Ordering::Equal))
        });
        peaks
    }
}

/// Returns the contribution of every channel to the (unweighted) potential at the given time, i.e., `K_i(t)`.
/// Input spikes received at or before `since` are ignored.
pub fn contributions(kernel: &Kernel, input: &SpikesInput, time: f64, since: f64) -> DVector<f64> {
    DVector::from_iterator(
        input.num_channels(),
        input.iter().map(|times| {
            times
                .iter()
                .filter(|&&spike_time| spike_time > since && spike_time < time)
                .map(|&spike_time| kernel.eval(time - spike_time))
                .sum::<f64>()
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::TimeInterval;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn input(spike_trains: Vec<Vec<f64>>, end: f64) -> SpikesInput {
        SpikesInput::build(spike_trains, TimeInterval::build(0.0, end).unwrap()).unwrap()
    }

    fn direct_potential(kernel: &Kernel, weights: &[f64], input: &SpikesInput, time: f64) -> f64 {
        contributions(kernel, input, time, f64::NEG_INFINITY)
            .iter()
            .zip(weights.iter())
            .map(|(k, w)| k * w)
            .sum()
    }

    #[test]
    fn test_trace_empty_input() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![], vec![]], 50.0);
        let trace = Trace::new(&kernel, &[1.0, 1.0], &input, 1.0, OutputMode::MultiSpike);
        assert!(trace.firing_times().is_empty());
        assert_eq!(trace.potential(&kernel, 25.0), 0.0);
        assert_eq!(trace.max_potential(&kernel).value, 0.0);
        assert_eq!(trace.max_potential(&kernel).time, 0.0);
        assert!(trace.subthreshold_peaks(&kernel, 1.0).is_empty());
    }

    #[test]
    fn test_trace_potential_matches_direct_sum() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let weights = [0.5, -0.25, 0.75];
        let input = input(vec![vec![1.0, 12.0], vec![4.0, 4.0], vec![20.0, 22.5, 40.0]], 60.0);
        let trace = Trace::new(&kernel, &weights, &input, f64::INFINITY, OutputMode::Binary);

        for time in [0.0, 0.5, 1.0, 3.0, 4.0, 7.5, 12.0, 21.0, 33.3, 40.0, 59.9, 60.0] {
            assert_relative_eq!(
                trace.potential(&kernel, time),
                direct_potential(&kernel, &weights, &input, time),
                epsilon = 1e-12,
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn test_trace_single_spike_max_potential() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![10.0]], 100.0);
        let trace = Trace::new(&kernel, &[1.0], &input, f64::INFINITY, OutputMode::Binary);
        let max = trace.max_potential(&kernel);
        assert_relative_eq!(max.time, 10.0 + kernel.peak_time(), max_relative = 1e-9);
        assert_relative_eq!(max.value, 1.0, max_relative = 1e-9);
    }

    #[test]
    fn test_trace_binary_crossing() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![0.0]], 100.0);
        let trace = Trace::new(&kernel, &[2.0], &input, 1.0, OutputMode::Binary);

        assert_eq!(trace.firing_times().len(), 1);
        let time = trace.firing_times()[0];
        assert!(time > 0.0 && time < kernel.peak_time());
        assert!(trace.potential(&kernel, time) >= 1.0);
        assert_relative_eq!(2.0 * kernel.eval(time), 1.0, max_relative = 1e-9);
        // no reset in binary mode
        assert_relative_eq!(trace.max_potential(&kernel).value, 2.0, max_relative = 1e-9);
    }

    #[test]
    fn test_trace_binary_fires_once() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![0.0, 50.0]], 100.0);
        let trace = Trace::new(&kernel, &[3.0], &input, 1.0, OutputMode::Binary);
        assert_eq!(trace.firing_times().len(), 1);
        assert!(trace.firing_times()[0] < 50.0);
    }

    #[test]
    fn test_trace_multi_spike_reset() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![0.0, 30.0]], 100.0);
        let trace = Trace::new(&kernel, &[3.0], &input, 1.0, OutputMode::MultiSpike);

        let firing_times = trace.firing_times();
        assert_eq!(firing_times.len(), 2);
        assert!(firing_times[0] > 0.0 && firing_times[0] < kernel.peak_time());
        assert!(firing_times[1] > 30.0 && firing_times[1] < 30.0 + kernel.peak_time());
        // the second input spike is alone to drive the potential after the reset
        assert_relative_eq!(
            firing_times[1] - 30.0,
            firing_times[0],
            max_relative = 1e-9
        );
        assert_eq!(trace.potential(&kernel, 20.0), 0.0);
        assert_eq!(trace.since(20.0), firing_times[0]);
        assert_eq!(trace.since(firing_times[1] + 1.0), firing_times[1]);
        assert_eq!(trace.since(1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_trace_multi_spike_needs_new_evidence() {
        // a non-positive threshold makes every input spike fire the neuron, but only once
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![10.0, 20.0], vec![20.0]], 50.0);
        let trace = Trace::new(&kernel, &[1.0, 1.0], &input, 0.0, OutputMode::MultiSpike);
        assert_eq!(trace.firing_times(), &[0.0, 10.0, 20.0]);
    }

    #[test]
    fn test_trace_subthreshold_peaks() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![0.0], vec![50.0]], 100.0);
        let trace = Trace::new(&kernel, &[0.5, 0.8], &input, 1.0, OutputMode::MultiSpike);
        assert!(trace.firing_times().is_empty());

        let peaks = trace.subthreshold_peaks(&kernel, 1.0);
        assert_eq!(peaks.len(), 2);
        // the tail of the first input spike slightly raises and advances the second peak
        assert!(peaks[0].time > 50.0 && peaks[0].time < 50.0 + kernel.peak_time());
        assert!(peaks[0].value > 0.8 && peaks[0].value < 0.85);
        assert_relative_eq!(peaks[1].time, kernel.peak_time(), max_relative = 1e-9);
        assert_relative_eq!(peaks[1].value, 0.5, max_relative = 1e-9);

        // peaks above threshold are discarded
        assert_eq!(trace.subthreshold_peaks(&kernel, 0.6).len(), 1);
    }

    #[test]
    fn test_trace_inhibition_peak() {
        // an inhibitory spike arriving while the potential rises creates a corner peak
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![0.0], vec![4.0]], 100.0);
        let trace = Trace::new(&kernel, &[0.5, -2.0], &input, 1.0, OutputMode::Binary);
        let peaks = trace.subthreshold_peaks(&kernel, 1.0);
        assert_eq!(peaks[0].time, 4.0);
        assert_relative_eq!(peaks[0].value, 0.5 * kernel.eval(4.0), max_relative = 1e-9);
    }

    #[test]
    fn test_max_potential_monotone_in_weight() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let kernel = Kernel::build(15.0, 5.0).unwrap();

        for _ in 0..20 {
            let spike_trains: Vec<Vec<f64>> = (0..5)
                .map(|_| (0..rng.gen_range(0..4)).map(|_| rng.gen_range(0.0..100.0)).collect())
                .collect();
            let input = input(spike_trains, 100.0);
            let mut weights: Vec<f64> = (0..5).map(|_| rng.gen_range(-1.0..1.0)).collect();

            let mut prev_max = f64::NEG_INFINITY;
            for step in 0..10 {
                weights[0] = -1.0 + 0.25 * step as f64;
                let trace = Trace::new(&kernel, &weights, &input, f64::INFINITY, OutputMode::Binary);
                let max = trace.max_potential(&kernel).value;
                assert!(max >= prev_max - 1e-12);
                prev_max = max;
            }
        }
    }

    #[test]
    fn test_contributions_after_reset() {
        let kernel = Kernel::build(15.0, 5.0).unwrap();
        let input = input(vec![vec![0.0, 10.0], vec![5.0]], 100.0);

        let all = contributions(&kernel, &input, 12.0, f64::NEG_INFINITY);
        assert_relative_eq!(all[0], kernel.eval(12.0) + kernel.eval(2.0));
        assert_relative_eq!(all[1], kernel.eval(7.0));

        let shunted = contributions(&kernel, &input, 12.0, 5.0);
        assert_relative_eq!(shunted[0], kernel.eval(2.0));
        assert_eq!(shunted[1], 0.0);
    }
}
