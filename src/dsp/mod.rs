//! # DSP Building Blocks
//!
//! - **`delay_line`**: multi-channel ring buffer with a shared write cursor
//!   and fractional (linearly interpolated) reads.
//! - **`lfo`**: the sine oscillator that sweeps the delay time.
//! - **`flanger`**: the engine that runs both per frame and applies the
//!   feedback and dry/wet mix.

pub mod delay_line;
pub mod flanger;
pub mod lfo;
