//! The vocoder seam.
//!
//! MBE analysis and synthesis (AMBE+2 half-rate for DMR, 88-bit IMBE for
//! P25) live behind these traits; the actual codec is an external library
//! linked by the application. Each machine owns its codec pair - nothing is
//! shared, so nothing needs locking.
//!
//! [`NullVocoder`] is the built-in stand-in: silence out of synthesis, zero
//! codewords out of analysis. It keeps the whole pipeline runnable (and
//! testable) without a licensed codec.

/// PCM samples per 20 ms voice frame at 8 kHz.
pub const PCM_SAMPLES_PER_FRAME: usize = 160;

/// One frame of signed 16-bit PCM.
pub type PcmFrame = [i16; PCM_SAMPLES_PER_FRAME];

/// MBE synthesis: codeword in, PCM out.
///
/// Never fails: an unrecoverable codeword yields silence-equivalent PCM and
/// a nonzero error count.
pub trait Decoder: Send {
    /// Synthesize one frame. Returns the codec's EDAC error count.
    fn decode(&mut self, codeword: &[u8], samples: &mut PcmFrame) -> u32;
}

/// MBE analysis: PCM in, codeword out.
pub trait Encoder: Send {
    /// Analyze one frame into `codeword` (9 bytes AMBE or 11 bytes IMBE).
    fn encode(&mut self, samples: &PcmFrame, codeword: &mut [u8]);
}

/// Stand-in codec: synthesizes silence, analyzes to zero codewords.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullVocoder;

impl Decoder for NullVocoder {
    fn decode(&mut self, _codeword: &[u8], samples: &mut PcmFrame) -> u32 {
        samples.fill(0);
        0
    }
}

impl Encoder for NullVocoder {
    fn encode(&mut self, _samples: &PcmFrame, codeword: &mut [u8]) {
        codeword.fill(0);
    }
}
