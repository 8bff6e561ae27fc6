//! # Flanger Engine
//!
//! Ties the delay line and the LFO together into the effect:
//!
//! ```text
//! Input ──┬───────────────────────────────────── × (1 - mix) ──┐
//!         │                                                    │
//!         └──►(+)──► [Delay Line] ──┬── delayed ──── × mix ───(+)──► Output
//!              ▲          ▲         │
//!              │      LFO sweeps    │
//!              │      2..10 ms      │
//!              └──── × feedback ◄───┘
//! ```
//!
//! Per frame, the engine advances the LFO, converts its value into a delay
//! time, then for each channel reads the delayed sample, writes the
//! feedback sum back into the line and mixes dry with wet. The shared
//! write cursor moves once all channels are done.

use std::num::NonZeroUsize;

use nih_plug::nih_warn;

use super::delay_line::DelayLine;
use super::lfo::ModulationOscillator;

/// Shortest delay the sweep reaches, in seconds.
pub const MIN_DELAY_SECONDS: f64 = 0.002;

/// Longest delay the sweep reaches, in seconds. Also sizes the delay line.
pub const MAX_DELAY_SECONDS: f64 = 0.010;

/// The control values the engine needs for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameControls {
    /// LFO rate in Hz.
    pub rate: f32,
    /// 0..=1, how far the LFO moves the delay from its midpoint.
    pub depth: f32,
    /// 0..1, gain of the delayed signal fed back into the line.
    pub feedback: f32,
    /// 0..=1, dry/wet crossfade.
    pub mix: f32,
}

/// Something the engine can pull a fresh set of controls from every frame.
///
/// The plugin's parameters implement this by stepping their smoothers, so
/// automation is followed sample by sample.
pub trait ControlSource {
    fn next_frame(&self) -> FrameControls;
}

impl ControlSource for FrameControls {
    fn next_frame(&self) -> FrameControls {
        *self
    }
}

/// The flanger's audio-thread state.
///
/// Starts unprepared, where [`process_block()`](Self::process_block) leaves
/// audio untouched. [`prepare()`](Self::prepare) allocates the delay line
/// for a sample rate; [`release_resources()`](Self::release_resources)
/// frees it again.
#[derive(Debug, Default)]
pub struct FlangerEngine {
    delay_line: DelayLine,
    lfo: ModulationOscillator,

    sample_rate: f64,

    /// Sweep bounds in samples, recomputed whenever the sample rate changes.
    min_delay_samples: f32,
    max_delay_samples: f32,

    /// Largest block the host promised to send. Anything longer passes
    /// through untouched.
    max_block_size: usize,

    prepared: bool,
}

impl FlangerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and zero the delay line for `sample_rate` and reset the LFO.
    ///
    /// Safe to call repeatedly. Every call discards the previous history,
    /// so two consecutive calls leave the engine in the same state.
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, num_channels: usize) {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            nih_warn!("Refusing to prepare the flanger at {} Hz", sample_rate);
            self.release_resources();
            return;
        }

        // One guard sample so the oldest frame can still be interpolated.
        let window = (sample_rate * MAX_DELAY_SECONDS).ceil() as usize;
        let len = NonZeroUsize::MIN.saturating_add(window);
        self.delay_line.configure(len, num_channels);
        self.lfo.reset();

        self.sample_rate = sample_rate;
        self.min_delay_samples = (sample_rate * MIN_DELAY_SECONDS) as f32;
        self.max_delay_samples = ((sample_rate * MAX_DELAY_SECONDS) as f32).min(window as f32);
        self.max_block_size = max_block_size;
        self.prepared = true;
    }

    /// Silence the delay line and restart the LFO without reallocating.
    pub fn reset(&mut self) {
        self.delay_line.clear();
        self.lfo.reset();
    }

    /// Free the delay line. The engine passes audio through until the next
    /// [`prepare()`](Self::prepare).
    pub fn release_resources(&mut self) {
        self.delay_line.release();
        self.lfo.reset();
        self.max_block_size = 0;
        self.prepared = false;
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// `(min, max)` of the sweep in samples at the current sample rate.
    pub fn delay_bounds(&self) -> (f32, f32) {
        (self.min_delay_samples, self.max_delay_samples)
    }

    /// Length of each channel's history, guard sample included.
    pub fn delay_len(&self) -> usize {
        self.delay_line.len()
    }

    /// Run the flanger in place over a channel-major block.
    ///
    /// `controls` is polled once per frame. The block is left as it is when
    /// the engine is unprepared or the block does not fit what `prepare`
    /// was told (too many channels, ragged channels, more frames than
    /// `max_block_size`).
    pub fn process_block<C>(&mut self, channels: &mut [&mut [f32]], controls: &C)
    where
        C: ControlSource + ?Sized,
    {
        if !self.accepts(channels) {
            return;
        }
        let num_frames = channels.first().map_or(0, |channel| channel.len());

        for frame in 0..num_frames {
            let FrameControls {
                rate,
                depth,
                feedback,
                mix,
            } = controls.next_frame();

            self.lfo.advance(rate, self.sample_rate);
            let delay = self.modulated_delay(depth);

            for (channel_idx, channel) in channels.iter_mut().enumerate() {
                let input = channel[frame];

                // Read before write: the oldest slot sits under the cursor.
                let delayed = self.delay_line.read_interpolated(channel_idx, delay);
                self.delay_line.write(channel_idx, input + delayed * feedback);

                channel[frame] = input * (1.0 - mix) + delayed * mix;
            }

            self.delay_line.advance_cursor();
        }
    }

    /// How long the feedback loop takes to fall to -60 dB, in samples.
    ///
    /// Each trip around the loop is scaled by `feedback`, so after `N`
    /// trips the level is `feedback^N`. Solving for 0.001 gives
    /// `N = -3 / log10(feedback)`, each trip at most one longest delay.
    pub fn tail_samples(&self, feedback: f32) -> u32 {
        if !self.prepared {
            return 0;
        }

        if feedback > 0.001 {
            let repeats = -3.0 / feedback.log10();
            (repeats * self.max_delay_samples) as u32
        } else {
            self.max_delay_samples as u32
        }
    }

    fn accepts(&self, channels: &[&mut [f32]]) -> bool {
        let Some(first) = channels.first() else {
            return false;
        };

        self.prepared
            && channels.len() <= self.delay_line.num_channels()
            && first.len() <= self.max_block_size
            && channels.iter().all(|channel| channel.len() == first.len())
    }

    /// Delay in samples for the current LFO position.
    ///
    /// The bipolar LFO is scaled by `depth` around the middle of the sweep,
    /// so depth 0 pins the delay at the midpoint and depth 1 covers the
    /// full window. Only called while prepared, so the window is non-empty.
    fn modulated_delay(&self, depth: f32) -> f32 {
        let sweep = 0.5 + 0.5 * self.lfo.value() * depth;
        let delay =
            self.min_delay_samples + (self.max_delay_samples - self.min_delay_samples) * sweep;

        let readable = self.delay_line.len().saturating_sub(1) as f32;
        delay.clamp(0.0, readable)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    const SAMPLE_RATE: f64 = 44100.0;
    const BLOCK_SIZE: usize = 256;

    fn controls(rate: f32, depth: f32, feedback: f32, mix: f32) -> FrameControls {
        FrameControls {
            rate,
            depth,
            feedback,
            mix,
        }
    }

    fn prepared(num_channels: usize) -> FlangerEngine {
        let mut engine = FlangerEngine::new();
        engine.prepare(SAMPLE_RATE, BLOCK_SIZE, num_channels);
        engine
    }

    /// Push a mono signal through the engine in host-sized blocks.
    fn run_mono(
        engine: &mut FlangerEngine,
        input: &[f32],
        source: &impl ControlSource,
    ) -> Vec<f32> {
        let mut output = input.to_vec();
        for block in output.chunks_mut(BLOCK_SIZE) {
            engine.process_block(&mut [block], source);
        }
        output
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut signal = vec![0.0; len];
        signal[0] = 1.0;
        signal
    }

    #[test]
    fn test_unprepared_passes_through() {
        let mut engine = FlangerEngine::new();
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut block = input.clone();

        engine.process_block(&mut [block.as_mut_slice()], &controls(1.0, 1.0, 0.5, 1.0));

        assert!(!engine.is_prepared());
        assert_eq!(block, input);
    }

    #[test]
    fn test_prepare_sizes_delay_line() {
        let mut engine = prepared(2);
        assert!(engine.is_prepared());
        assert_eq!(engine.delay_len(), 442);
        assert_eq!(engine.sample_rate(), SAMPLE_RATE);

        let (min, max) = engine.delay_bounds();
        assert!((min - 88.2).abs() < 1e-4, "min delay {min}");
        assert!((max - 441.0).abs() < 1e-4, "max delay {max}");

        engine.prepare(48000.0, BLOCK_SIZE, 2);
        assert_eq!(engine.delay_len(), 481);
        assert_eq!(engine.delay_bounds(), (96.0, 480.0));
    }

    /// Moving to a new sample rate starts from silence, even with a loop
    /// full of feedback at the old rate.
    #[test]
    fn test_rate_change_discards_history() {
        let source = controls(0.5, 1.0, 0.8, 1.0);
        let mut engine = prepared(1);
        run_mono(&mut engine, &[1.0; BLOCK_SIZE], &source);

        engine.prepare(48000.0, BLOCK_SIZE, 1);
        assert_eq!(engine.delay_len(), 481);
        assert_eq!(engine.delay_line.write_pos(), 0);
        assert_eq!(engine.lfo.phase(), 0.0);

        let output = run_mono(&mut engine, &[0.0; 8 * BLOCK_SIZE], &source);
        assert!(output.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_invalid_sample_rate_stays_unprepared() {
        let mut engine = prepared(1);
        engine.prepare(0.0, BLOCK_SIZE, 1);
        assert!(!engine.is_prepared());
        assert_eq!(engine.delay_len(), 0);
    }

    /// Silence can never produce output, whatever the settings.
    #[test]
    fn test_silence_in_silence_out() {
        for source in [
            controls(0.1, 0.0, 0.0, 0.0),
            controls(0.5, 0.5, 0.3, 0.5),
            controls(10.0, 1.0, 0.89, 1.0),
        ] {
            let mut engine = prepared(1);
            let output = run_mono(&mut engine, &vec![0.0; 10_000], &source);
            assert!(
                output.iter().all(|s| *s == 0.0),
                "non-silent output for {source:?}"
            );
        }
    }

    /// With no feedback the output only depends on the input inside the
    /// delay window, and matches a direct interpolation of the input.
    #[test]
    fn test_feedback_zero_matches_reference() {
        let source = controls(5.0, 1.0, 0.0, 0.5);
        let input: Vec<f32> = (0..4410).map(|i| 0.5 * (i as f32 * 0.05).sin()).collect();

        let mut engine = prepared(1);
        let (min, max) = engine.delay_bounds();
        let output = run_mono(&mut engine, &input, &source);

        let mut lfo = ModulationOscillator::new();
        let at = |i: isize| if i < 0 { 0.0 } else { input[i as usize] };
        for (n, out) in output.iter().enumerate() {
            lfo.advance(source.rate, SAMPLE_RATE);
            let delay = min + (max - min) * (0.5 + 0.5 * lfo.value() * source.depth);

            let read_pos = n as f32 - delay;
            let i0 = read_pos.floor();
            let frac = read_pos - i0;
            let delayed = at(i0 as isize) * (1.0 - frac) + at(i0 as isize + 1) * frac;
            let expected = input[n] * (1.0 - source.mix) + delayed * source.mix;

            assert!(
                (out - expected).abs() < 1e-4,
                "sample {n}: expected {expected}, got {out}"
            );
        }
    }

    /// Depth 0 pins the delay at the sweep midpoint: 6 ms, or 264.6
    /// samples at 44.1 kHz. A unit impulse comes back split across
    /// samples 264 and 265.
    #[test]
    fn test_zero_depth_is_fixed_delay() {
        let mut engine = prepared(1);
        let output = run_mono(&mut engine, &impulse(1024), &controls(0.5, 0.0, 0.0, 1.0));

        assert!((output[264] - 0.4).abs() < 1e-3, "got {}", output[264]);
        assert!((output[265] - 0.6).abs() < 1e-3, "got {}", output[265]);
        for (n, sample) in output.iter().enumerate() {
            if n != 264 && n != 265 {
                assert!(sample.abs() < 1e-6, "sample {n} should be silent, got {sample}");
            }
        }

        let energy: f32 = output.iter().sum();
        assert!((energy - 1.0).abs() < 1e-4, "energy {energy}");
    }

    /// With feedback, the impulse keeps coming back at the same spacing,
    /// each time scaled by the feedback gain.
    #[test]
    fn test_feedback_repeats_decay() {
        let mut engine = prepared(1);
        let output = run_mono(&mut engine, &impulse(1024), &controls(0.5, 0.0, 0.5, 1.0));

        let first: f32 = output[260..270].iter().sum();
        let second: f32 = output[525..535].iter().sum();
        assert!((first - 1.0).abs() < 1e-4, "first repeat {first}");
        assert!((second - 0.5).abs() < 1e-4, "second repeat {second}");
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let source = controls(2.0, 0.7, 0.5, 0.5);
        let mut engine = prepared(1);

        engine.prepare(SAMPLE_RATE, BLOCK_SIZE, 1);
        let first = run_mono(&mut engine, &impulse(2048), &source);

        engine.prepare(SAMPLE_RATE, BLOCK_SIZE, 1);
        assert_eq!(engine.lfo.phase(), 0.0);
        assert_eq!(engine.delay_line.write_pos(), 0);
        let second = run_mono(&mut engine, &impulse(2048), &source);

        assert_eq!(first, second);
    }

    #[test]
    fn test_reset_matches_fresh_prepare() {
        let source = controls(1.0, 1.0, 0.6, 0.5);
        let noise: Vec<f32> = (0..3000).map(|i| ((i * 7919) % 13) as f32 / 13.0 - 0.5).collect();

        let mut fresh = prepared(1);
        let expected = run_mono(&mut fresh, &impulse(1024), &source);

        let mut used = prepared(1);
        run_mono(&mut used, &noise, &source);
        used.reset();
        let output = run_mono(&mut used, &impulse(1024), &source);

        assert_eq!(output, expected);
    }

    /// Loop gain below one keeps a sustained input bounded by the
    /// geometric series `1 / (1 - feedback)`.
    #[test]
    fn test_high_feedback_stays_bounded() {
        let feedback = 0.89;
        let bound = 1.0 / (1.0 - feedback) + 1e-3;
        let source = controls(0.3, 1.0, feedback, 0.5);
        let mut engine = prepared(1);

        let mut peak = 0.0_f32;
        for _ in 0..(10 * SAMPLE_RATE as usize / BLOCK_SIZE) {
            let mut block = [1.0_f32; BLOCK_SIZE];
            engine.process_block(&mut [&mut block[..]], &source);
            for sample in block {
                assert!(sample.is_finite());
                peak = peak.max(sample.abs());
            }
        }

        assert!(peak <= bound, "peak {peak} exceeds {bound}");
    }

    #[test]
    fn test_stereo_channels_are_independent() {
        let mut engine = prepared(2);
        let mut left = impulse(BLOCK_SIZE);
        let mut right = vec![0.0; BLOCK_SIZE];
        let source = controls(0.5, 0.0, 0.5, 1.0);

        engine.process_block(&mut [&mut left[..], &mut right[..]], &source);

        assert!(right.iter().all(|s| *s == 0.0));
        // One frame processed per sample, not per channel.
        assert_eq!(engine.delay_line.write_pos(), BLOCK_SIZE);
    }

    #[test]
    fn test_mismatched_blocks_pass_through() {
        let source = controls(1.0, 1.0, 0.5, 1.0);
        let input: Vec<f32> = (0..BLOCK_SIZE).map(|i| i as f32 / BLOCK_SIZE as f32).collect();

        // More channels than prepared.
        let mut engine = prepared(1);
        let (mut left, mut right) = (input.clone(), input.clone());
        engine.process_block(&mut [&mut left[..], &mut right[..]], &source);
        assert_eq!(left, input);
        assert_eq!(right, input);

        // Ragged channels.
        let mut engine = prepared(2);
        let mut short = input[..10].to_vec();
        let mut long = input.clone();
        engine.process_block(&mut [&mut short[..], &mut long[..]], &source);
        assert_eq!(long, input);

        // Longer than the promised block size.
        let mut engine = prepared(1);
        let mut oversized = vec![0.25; BLOCK_SIZE + 1];
        engine.process_block(&mut [&mut oversized[..]], &source);
        assert!(oversized.iter().all(|s| *s == 0.25));
        assert_eq!(engine.delay_line.write_pos(), 0);
    }

    #[test]
    fn test_release_returns_to_pass_through() {
        let mut engine = prepared(1);
        engine.release_resources();
        assert!(!engine.is_prepared());
        assert_eq!(engine.delay_len(), 0);

        let mut block = vec![0.5; 32];
        engine.process_block(&mut [&mut block[..]], &controls(1.0, 1.0, 0.5, 1.0));
        assert!(block.iter().all(|s| *s == 0.5));
        assert_eq!(engine.tail_samples(0.5), 0);
    }

    /// Controls are polled every frame, so automation lands mid-block.
    #[test]
    fn test_controls_polled_per_frame() {
        struct Counting(Cell<usize>);

        impl ControlSource for Counting {
            fn next_frame(&self) -> FrameControls {
                let n = self.0.get();
                self.0.set(n + 1);
                // Fully wet for the first half of the block, dry afterwards.
                let mix = if n < BLOCK_SIZE / 2 { 1.0 } else { 0.0 };
                controls(0.5, 0.5, 0.0, mix)
            }
        }

        let mut engine = prepared(1);
        let source = Counting(Cell::new(0));
        let mut block = vec![0.75; BLOCK_SIZE];
        engine.process_block(&mut [&mut block[..]], &source);

        assert_eq!(source.0.get(), BLOCK_SIZE);
        // Wet half only sees the still-empty delay line.
        assert!(block[..BLOCK_SIZE / 2].iter().all(|s| *s == 0.0));
        assert!(block[BLOCK_SIZE / 2..].iter().all(|s| *s == 0.75));
    }

    #[test]
    fn test_tail_length() {
        let engine = prepared(2);
        assert_eq!(engine.tail_samples(0.0), 441);

        // 0.1^3 = 0.001, so three trips of the longest delay.
        let tail = engine.tail_samples(0.1);
        assert!((1322..=1323).contains(&tail), "tail {tail}");
    }
}
