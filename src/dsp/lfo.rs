//! # Modulation Oscillator (LFO)
//!
//! The sweep of a flanger comes from a low-frequency oscillator pushing the
//! delay time back and forth. The oscillator is a phase accumulator that
//! counts cycles in `[0, 1)`:
//!
//! ```text
//! phase += rate_hz / sample_rate
//! if phase >= 1.0 { phase -= 1.0 }
//! value  = sin(2π · phase)           // bipolar, -1.0 ..= 1.0
//! ```
//!
//! The rate comes from the parameter and is re-read every sample, so the
//! phase advance is independent of where we are in the block. Phase is
//! kept as `f64`: at 0.1 Hz and 192 kHz the increment is ~5e-7, small
//! enough that an `f32` accumulator would drift audibly over a long sweep.

use std::f64::consts::TAU;

/// Sine LFO producing a bipolar control signal.
#[derive(Debug, Default, Clone)]
pub struct ModulationOscillator {
    /// Position within the current cycle, always in `[0, 1)`.
    phase: f64,
}

impl ModulationOscillator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step the phase forward by one sample at `rate_hz`.
    ///
    /// A single wrap is enough: supported rates are at most 10 Hz, so the
    /// per-sample increment is far below one cycle.
    pub fn advance(&mut self, rate_hz: f32, sample_rate: f64) {
        self.phase += f64::from(rate_hz) / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
    }

    /// Current output, `sin(2π · phase)` in `[-1, 1]`.
    pub fn value(&self) -> f32 {
        (TAU * self.phase).sin() as f32
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Back to the start of the cycle.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
