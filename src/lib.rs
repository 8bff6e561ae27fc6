//! # Flangerift — An AU/VST3/CLAP Flanger Plugin
//!
//! A flanger built with [nih-plug](https://github.com/robbert-vdh/nih-plug):
//! the input is mixed with a copy of itself delayed by 2-10 ms, with the
//! delay swept by a sine LFO and part of the delayed signal fed back into
//! the delay line. The moving comb-filter notches give the jet-plane sweep.
//!
//! ## Layout
//!
//! - [`dsp`]: delay line, LFO and the flanger engine. No host types.
//! - [`params`]: the parameters the host sees.
//! - [`state`]: flat 28-byte export of the parameter values.
//! - [`layout`]: which channel configurations are accepted.
//!
//! The plugin struct below only translates host callbacks into engine
//! calls: `initialize` → `prepare`, `reset` → `reset`, `deactivate` →
//! `release_resources`, `process` → `process_block`.

pub mod dsp;
pub mod layout;
pub mod params;
pub mod state;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::flanger::FlangerEngine;
use nih_plug::prelude::*;
use params::FlangerParams;
use state::{ParameterValues, StateError, BLOB_LEN};

/// The plugin: shared parameters plus the audio-thread engine.
///
/// `params` is shared with the host through an `Arc` and may be written from
/// any thread. `engine` is only touched from the host's lifecycle and audio
/// callbacks, which the host never runs concurrently.
pub struct Flangerift {
    params: Arc<FlangerParams>,
    engine: FlangerEngine,
}

impl Default for Flangerift {
    fn default() -> Self {
        Self {
            params: Arc::new(FlangerParams::default()),
            // Unprepared until initialize() knows the sample rate.
            engine: FlangerEngine::new(),
        }
    }
}

impl Flangerift {
    /// Export the current parameter values as a 28-byte blob.
    pub fn serialize_parameters(&self) -> [u8; BLOB_LEN] {
        ParameterValues::capture(&self.params).to_bytes()
    }

    /// Decode a blob produced by
    /// [`serialize_parameters()`](Self::serialize_parameters).
    ///
    /// Only decodes. The plugin's live parameters are left alone, since
    /// nih-plug lets only the host or GUI set them; the returned values can
    /// drive a [`FlangerEngine`] directly as a `ControlSource`.
    pub fn deserialize_parameters(bytes: &[u8]) -> Result<ParameterValues, StateError> {
        ParameterValues::from_bytes(bytes)
    }
}

impl Plugin for Flangerift {
    const NAME: &'static str = "Flangerift";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Stereo first since most tracks are stereo. Inputs and outputs always
    // match: the flanger never changes the channel count.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Allocates the delay line for the host's sample rate. Returns `false`
    /// for channel layouts the flanger can't process.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let inputs = audio_io_layout.main_input_channels;
        let outputs = audio_io_layout.main_output_channels;
        if !layout::is_layout_supported(inputs, outputs) {
            nih_warn!("Unsupported channel layout: {:?} in, {:?} out", inputs, outputs);
            return false;
        }

        let num_channels = inputs.map_or(0, |c| c.get() as usize);
        let max_block_size = buffer_config.max_buffer_size as usize;
        self.engine.prepare(
            f64::from(buffer_config.sample_rate),
            max_block_size,
            num_channels,
        );

        nih_log!(
            "Flangerift prepared: {} Hz, {} channel(s), blocks up to {} samples",
            buffer_config.sample_rate,
            num_channels,
            max_block_size
        );

        self.engine.is_prepared()
    }

    /// Transport stop or bypass. Clears the sweep and the delay history so
    /// old audio doesn't leak into the next playback.
    fn reset(&mut self) {
        self.engine.reset();
    }

    fn deactivate(&mut self) {
        self.engine.release_resources();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        self.engine.process_block(buffer.as_slice(), self.params.as_ref());

        // Keep the host calling us while the feedback loop rings out.
        let feedback = self.params.flanger_feedback.value();
        ProcessStatus::Tail(self.engine.tail_samples(feedback))
    }
}

impl ClapPlugin for Flangerift {
    const CLAP_ID: &'static str = "com.loveless-audio.flangerift";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A flanger with LFO-swept delay and feedback");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Flanger,
    ];
}

impl Vst3Plugin for Flangerift {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssFlangerift1";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Modulation];
}

nih_export_clap!(Flangerift);
nih_export_vst3!(Flangerift);

// AUv2 entry point for Logic Pro, generated from the CLAP export.
clap_wrapper::export_auv2!();
