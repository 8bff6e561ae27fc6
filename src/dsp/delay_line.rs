//! # Multi-Channel Delay Line
//!
//! A flanger mixes the input with a copy of itself delayed by a few
//! milliseconds. The delayed copy comes from a ring buffer: every frame the
//! newest sample is written at the write cursor, and the read head sits a
//! (fractional) number of samples behind it.
//!
//! Unlike a plain echo, every channel here shares one write cursor. The
//! engine writes all channels for a frame and then calls
//! [`advance_cursor()`](DelayLine::advance_cursor) exactly once, so left and
//! right always stay sample-aligned.
//!
//! ## Reading Between Samples
//!
//! The LFO moves the delay continuously, so the read position is almost
//! never a whole number:
//!
//! ```text
//! read_pos = write_pos - delay      (wrapped into [0, len))
//! i0       = floor(read_pos)
//! frac     = read_pos - i0
//! result   = buf[i0] * (1 - frac) + buf[i0 + 1] * frac
//! ```
//!
//! `buf[i0 + 1]` is one sample newer than `buf[i0]`, so a larger `frac`
//! means a slightly shorter delay.

use std::num::NonZeroUsize;

/// Ring buffers for every channel plus the cursor they share.
///
/// Storage is only (re)allocated in [`configure()`](Self::configure), which
/// the engine calls from `prepare`. Nothing on the audio thread allocates.
#[derive(Debug, Default)]
pub struct DelayLine {
    /// One history per channel, each exactly `buffer_len` samples long.
    buffers: Vec<Vec<f32>>,

    /// Where the next frame will be written.
    write_pos: usize,

    /// Length of every channel's history. Zero while unconfigured.
    buffer_len: usize,
}

impl DelayLine {
    /// An empty, unconfigured delay line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate `channel_count` zeroed histories of `sample_count` samples
    /// and move the cursor back to the start.
    ///
    /// Replaces any previous storage. Must not be called while a block is
    /// being processed.
    pub fn configure(&mut self, sample_count: NonZeroUsize, channel_count: usize) {
        let len = sample_count.get();
        self.buffers = (0..channel_count).map(|_| vec![0.0; len]).collect();
        self.buffer_len = len;
        self.write_pos = 0;
    }

    /// Drop all storage, returning to the unconfigured state.
    pub fn release(&mut self) {
        self.buffers = Vec::new();
        self.buffer_len = 0;
        self.write_pos = 0;
    }

    /// Store `value` at the cursor for `channel`. Does not advance.
    pub fn write(&mut self, channel: usize, value: f32) {
        if let Some(buffer) = self.buffers.get_mut(channel) {
            buffer[self.write_pos] = value;
        }
    }

    /// Read `channel` at `delay_in_samples` behind the cursor with linear
    /// interpolation.
    ///
    /// The delay is not range checked. Values outside `[0, len - 1]` wrap
    /// around the ring and read unrelated history; keeping the delay in
    /// range is the caller's job. Unknown channels read silence.
    pub fn read_interpolated(&self, channel: usize, delay_in_samples: f32) -> f32 {
        let Some(buffer) = self.buffers.get(channel) else {
            return 0.0;
        };

        let len = self.buffer_len as f32;
        let mut read_pos = (self.write_pos as f32 - delay_in_samples) % len;
        if read_pos < 0.0 {
            read_pos += len;
        }

        let i0_float = read_pos.floor();
        let frac = read_pos - i0_float;

        // `read_pos` can round up to exactly `len` after the wrap above.
        let i0 = i0_float as usize % self.buffer_len;
        let i1 = (i0 + 1) % self.buffer_len;

        buffer[i0] * (1.0 - frac) + buffer[i1] * frac
    }

    /// Move the shared cursor forward by one frame.
    pub fn advance_cursor(&mut self) {
        if self.buffer_len > 0 {
            self.write_pos = (self.write_pos + 1) % self.buffer_len;
        }
    }

    /// Zero every channel and rewind the cursor without reallocating.
    pub fn clear(&mut self) {
        for buffer in &mut self.buffers {
            buffer.fill(0.0);
        }
        self.write_pos = 0;
    }

    pub fn len(&self) -> usize {
        self.buffer_len
    }

    pub fn is_empty(&self) -> bool {
        self.buffer_len == 0
    }

    pub fn num_channels(&self) -> usize {
        self.buffers.len()
    }

    pub fn write_pos(&self) -> usize {
        self.write_pos
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
