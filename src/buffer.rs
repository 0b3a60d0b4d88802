//! Channel-major flat sample storage.
//!
//! The engine consumes and produces one contiguous region per direction: all
//! frames of channel 0, then all frames of channel 1, and so on. Both buffers
//! are allocated once at session start and reused for every block.

/// Contiguous `channels × frames` f32 storage, channel-major.
#[derive(Debug, Clone)]
pub struct FlatBuffer {
    channels: usize,
    frames: usize,
    samples: Vec<f32>,
}

impl FlatBuffer {
    pub fn new(channels: usize, frames: usize) -> Self {
        Self {
            channels,
            frames,
            samples: vec![0.0; channels * frames],
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    #[inline]
    fn index(&self, channel: usize, frame: usize) -> usize {
        debug_assert!(channel < self.channels && frame < self.frames);
        channel * self.frames + frame
    }

    #[inline]
    pub fn get(&self, channel: usize, frame: usize) -> f32 {
        self.samples[self.index(channel, frame)]
    }

    #[inline]
    pub fn set(&mut self, channel: usize, frame: usize, value: f32) {
        let i = self.index(channel, frame);
        self.samples[i] = value;
    }

    /// All frames of one channel.
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * self.frames;
        &self.samples[start..start + self.frames]
    }

    pub fn channel_mut(&mut self, channel: usize) -> &mut [f32] {
        let start = channel * self.frames;
        &mut self.samples[start..start + self.frames]
    }

    /// The whole region, as handed to the engine.
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn zero(&mut self) {
        self.samples.fill(0.0);
    }
}
