//! Channel layout negotiation.
//!
//! The flanger is a pure insert effect: whatever comes in goes out on the
//! same number of channels. Mono and stereo are supported.

use std::num::NonZeroU32;

const MAX_CHANNELS: u32 = 2;

/// Whether a main input/output channel pair can be processed.
///
/// Both sides must be present, equal, and mono or stereo. Rejection is a
/// plain `false`; the host simply offers another layout.
pub fn is_layout_supported(inputs: Option<NonZeroU32>, outputs: Option<NonZeroU32>) -> bool {
    match (inputs, outputs) {
        (Some(inputs), Some(outputs)) => inputs == outputs && inputs.get() <= MAX_CHANNELS,
        _ => false,
    }
}
