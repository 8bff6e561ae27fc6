//! # Parameter Blob
//!
//! A flat export of every parameter: seven little-endian `f32` in
//! declaration order, 28 bytes, nothing else.
//!
//! ```text
//! offset  0   4   8   12  16  20  24
//!         rate dep fb mix cut res fmix
//! ```
//!
//! There is no length prefix, magic number or version tag, so a blob from a
//! different layout can't be recognised as such. Decoding refuses anything
//! that isn't exactly 28 bytes instead of reading past the end.
//!
//! The host's own preset/session state is handled by nih-plug; this format
//! is for moving settings around outside the host.

use thiserror::Error;

use crate::dsp::flanger::{ControlSource, FrameControls};
use crate::params::FlangerParams;

/// Number of values in a blob.
pub const PARAMETER_COUNT: usize = 7;

/// Size of an encoded blob in bytes.
pub const BLOB_LEN: usize = PARAMETER_COUNT * 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("parameter blob must be {expected} bytes, got {got}")]
    Length { expected: usize, got: usize },
}

/// Plain copy of every parameter value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterValues {
    pub rate: f32,
    pub depth: f32,
    pub feedback: f32,
    pub mix: f32,
    pub filter_cutoff: f32,
    pub filter_resonance: f32,
    pub filter_mix: f32,
}

impl ParameterValues {
    /// Snapshot the current (unsmoothed) values.
    pub fn capture(params: &FlangerParams) -> Self {
        Self {
            rate: params.flanger_rate.value(),
            depth: params.flanger_depth.value(),
            feedback: params.flanger_feedback.value(),
            mix: params.flanger_mix.value(),
            filter_cutoff: params.filter_cutoff.value(),
            filter_resonance: params.filter_resonance.value(),
            filter_mix: params.filter_mix.value(),
        }
    }

    fn to_array(self) -> [f32; PARAMETER_COUNT] {
        [
            self.rate,
            self.depth,
            self.feedback,
            self.mix,
            self.filter_cutoff,
            self.filter_resonance,
            self.filter_mix,
        ]
    }

    pub fn to_bytes(&self) -> [u8; BLOB_LEN] {
        let mut bytes = [0u8; BLOB_LEN];
        for (chunk, value) in bytes.chunks_exact_mut(4).zip(self.to_array()) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StateError> {
        if bytes.len() != BLOB_LEN {
            return Err(StateError::Length {
                expected: BLOB_LEN,
                got: bytes.len(),
            });
        }

        let mut values = [0.0_f32; PARAMETER_COUNT];
        for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        let [rate, depth, feedback, mix, filter_cutoff, filter_resonance, filter_mix] = values;
        Ok(Self {
            rate,
            depth,
            feedback,
            mix,
            filter_cutoff,
            filter_resonance,
            filter_mix,
        })
    }
}

impl Default for ParameterValues {
    fn default() -> Self {
        Self::capture(&FlangerParams::default())
    }
}

/// Lets a decoded blob drive the engine directly, without a host.
impl ControlSource for ParameterValues {
    fn next_frame(&self) -> FrameControls {
        FrameControls {
            rate: self.rate,
            depth: self.depth,
            feedback: self.feedback,
            mix: self.mix,
        }
    }
}
