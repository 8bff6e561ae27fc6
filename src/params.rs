//! # Plugin Parameters
//!
//! The knobs the host exposes. IDs (`#[id = "..."]`) are what presets and
//! automation lanes are keyed on, so they never change once published.
//!
//! Four parameters drive the flanger. Three more (`filter*`) are declared
//! for a filter stage that does not exist yet; they are saved and
//! automatable like the rest but nothing reads them during processing.
//!
//! Every value lives in an atomic inside nih-plug's `FloatParam`, written
//! by the host or UI thread. The audio thread only ever reads them.

use nih_plug::prelude::*;

use crate::dsp::flanger::{ControlSource, FrameControls};

#[derive(Params)]
pub struct FlangerParams {
    /// **Rate** — LFO speed in Hz. Slow rates give the classic jet sweep,
    /// fast ones turn into a warble.
    #[id = "flangerRate"]
    pub flanger_rate: FloatParam,

    /// **Depth** — how far the LFO pulls the delay away from the middle of
    /// the 2-10 ms window. At 0 the delay is fixed at 6 ms.
    #[id = "flangerDepth"]
    pub flanger_depth: FloatParam,

    /// **Feedback** — how much of the delayed signal goes back into the
    /// delay line. Stronger feedback sharpens the comb-filter peaks.
    ///
    /// Capped at 90% so the loop gain stays below 1 and the output is
    /// always bounded. There is no runtime clamp on top of this range.
    #[id = "flangerFeedback"]
    pub flanger_feedback: FloatParam,

    /// **Mix** — dry/wet balance. 50% gives the deepest notches.
    #[id = "flangerMix"]
    pub flanger_mix: FloatParam,

    /// **Filter Cutoff** — placeholder for the future filter stage, no effect.
    #[id = "filterCutoff"]
    pub filter_cutoff: FloatParam,

    /// **Filter Resonance** — placeholder, no effect.
    #[id = "filterResonance"]
    pub filter_resonance: FloatParam,

    /// **Filter Mix** — placeholder, no effect.
    #[id = "filterMix"]
    pub filter_mix: FloatParam,
}

impl Default for FlangerParams {
    fn default() -> Self {
        Self {
            flanger_rate: FloatParam::new(
                "Rate",
                0.5,
                FloatRange::Skewed {
                    min: 0.1,
                    max: 10.0,
                    // More knob travel for the slow sweeps.
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" Hz")
            .with_smoother(SmoothingStyle::Linear(20.0))
            .with_value_to_string(formatters::v2s_f32_rounded(2)),

            flanger_depth: percentage("Depth", 0.5, 1.0),

            flanger_feedback: percentage("Feedback", 0.3, 0.9),

            flanger_mix: percentage("Mix", 0.5, 1.0),

            filter_cutoff: FloatParam::new(
                "Filter Cutoff",
                20000.0,
                FloatRange::Skewed {
                    min: 20.0,
                    max: 20000.0,
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_unit(" Hz")
            .with_step_size(1.0),

            filter_resonance: FloatParam::new(
                "Filter Resonance",
                0.0,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),

            filter_mix: FloatParam::new(
                "Filter Mix",
                0.0,
                FloatRange::Linear { min: 0.0, max: 1.0 },
            )
            .with_unit("%")
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage()),
        }
    }
}

/// A smoothed 0..`max` parameter displayed as a percentage.
fn percentage(name: &str, default: f32, max: f32) -> FloatParam {
    FloatParam::new(name, default, FloatRange::Linear { min: 0.0, max })
        .with_unit("%")
        .with_smoother(SmoothingStyle::Linear(20.0))
        .with_value_to_string(formatters::v2s_f32_percentage(1))
        .with_string_to_value(formatters::s2v_f32_percentage())
}

impl ControlSource for FlangerParams {
    /// Pulls the next smoothed value of each flanger control. Called once
    /// per frame, so every smoother advances in step with the audio.
    fn next_frame(&self) -> FrameControls {
        FrameControls {
            rate: self.flanger_rate.smoothed.next(),
            depth: self.flanger_depth.smoothed.next(),
            feedback: self.flanger_feedback.smoothed.next(),
            mix: self.flanger_mix.smoothed.next(),
        }
    }
}
