//! The codec bridge: one decoder and one encoder wrapped as a pair.
//!
//! A bridge recodes a single direction - AMBE in / IMBE out for the DMR
//! path, IMBE in / AMBE out for the P25 path. PCM out of the decoder is
//! clamped to ±32760 before narrowing, and the encoder side carries a dB
//! gain knob applied ahead of analysis: vocoder round-trips drift in
//! loudness and this is the one compensation point.

use crate::vocoder::{Decoder, Encoder, NullVocoder, PCM_SAMPLES_PER_FRAME, PcmFrame};

/// PCM clamp bound between synthesis and analysis.
const PCM_CLAMP: i16 = 32760;

/// A one-directional codec pair.
pub struct VoiceBridge {
    decoder: Box<dyn Decoder>,
    encoder: Box<dyn Encoder>,
    /// Linear gain applied before analysis
    gain: f32,
}

impl std::fmt::Debug for VoiceBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceBridge").field("gain", &self.gain).finish_non_exhaustive()
    }
}

impl VoiceBridge {
    /// Wrap a decoder/encoder pair with an analysis gain in dB.
    pub fn new(decoder: Box<dyn Decoder>, encoder: Box<dyn Encoder>, gain_db: f32) -> Self {
        Self { decoder, encoder, gain: 10f32.powf(gain_db / 20.0) }
    }

    /// A bridge around the stand-in codec.
    pub fn null(gain_db: f32) -> Self {
        Self::new(Box::new(NullVocoder), Box::new(NullVocoder), gain_db)
    }

    /// Recode one codeword through PCM. Writes the output codeword and
    /// returns the decoder's EDAC error count; never fails.
    pub fn transcode(&mut self, input: &[u8], output: &mut [u8]) -> u32 {
        let mut samples: PcmFrame = [0; PCM_SAMPLES_PER_FRAME];
        let errs = self.decoder.decode(input, &mut samples);
        for sample in &mut samples {
            let scaled = f32::from((*sample).clamp(-PCM_CLAMP, PCM_CLAMP)) * self.gain;
            *sample = scaled.clamp(f32::from(-PCM_CLAMP), f32::from(PCM_CLAMP)) as i16;
        }
        self.encoder.encode(&samples, output);
        errs
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Encoder that records the PCM it is handed.
    struct CapturingEncoder {
        captured: Arc<Mutex<Vec<PcmFrame>>>,
    }

    impl Encoder for CapturingEncoder {
        fn encode(&mut self, samples: &PcmFrame, codeword: &mut [u8]) {
            if let Ok(mut captured) = self.captured.lock() {
                captured.push(*samples);
            }
            codeword.fill(0x55);
        }
    }

    /// Decoder that synthesizes a constant level.
    struct LevelDecoder(i16);

    impl Decoder for LevelDecoder {
        fn decode(&mut self, _codeword: &[u8], samples: &mut PcmFrame) -> u32 {
            samples.fill(self.0);
            0
        }
    }

    #[test]
    fn gain_scales_pcm_between_codecs() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = VoiceBridge::new(
            Box::new(LevelDecoder(1000)),
            Box::new(CapturingEncoder { captured: Arc::clone(&captured) }),
            6.0,
        );

        let mut out = [0u8; 11];
        let errs = bridge.transcode(&[0u8; 9], &mut out);
        assert_eq!(errs, 0);
        assert_eq!(out, [0x55; 11]);

        let frames = captured.lock().unwrap();
        let level = frames[0][0];
        // +6 dB is a factor of ~1.995
        assert!((1990..=2000).contains(&level), "got {level}");
    }

    #[test]
    fn hot_pcm_is_clamped() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = VoiceBridge::new(
            Box::new(LevelDecoder(i16::MAX)),
            Box::new(CapturingEncoder { captured: Arc::clone(&captured) }),
            20.0,
        );

        let mut out = [0u8; 9];
        bridge.transcode(&[0u8; 11], &mut out);
        let frames = captured.lock().unwrap();
        assert_eq!(frames[0][0], 32760);
    }
}
