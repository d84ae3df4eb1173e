//! The DMR slot machine: one TDMA slot's voice stream recoded into P25 LDUs.
//!
//! A voice-sync burst opens the call; every burst then contributes three
//! AMBE codewords which are FEC-regenerated, bridged to IMBE and slotted
//! into the LDU pair by the running position `p25_n` (0..=17). The ninth
//! codeword flushes LDU1, the eighteenth flushes LDU2. A terminator or the
//! 1500 ms network watchdog ends the call with a P25 TDU.
//!
//! # State machine
//!
//! ```text
//! ┌──────┐ VoiceSync  ┌───────┐ TerminatorWithLc / watchdog ┌──────┐
//! │ Idle │───────────>│ Audio │────────────────────────────>│ Idle │
//! └──────┘            └───────┘   (emit TDU, reset)         └──────┘
//! ```

use crossmode_proto::dmr::{DataType, DmrData, extract_ambe};
use crossmode_proto::edac::AmbeFec;
use crossmode_proto::p25::LduBuffer;
use crossmode_proto::{AMBE_FRAME_LENGTH_BYTES, AMBE_PER_BURST, IMBE_FRAME_LENGTH_BYTES};

use crate::action::TranscodeAction;
use crate::bridge::VoiceBridge;
use crate::context::{CallContext, NetState};
use crate::timer::Timer;

/// Per-call network liveness watchdog.
const WATCHDOG_MS: u32 = 1500;

/// Inter-packet gap detector.
const PACKET_TIMER_MS: u32 = 50;

/// Payload bits checked by the AMBE FEC per burst, for BER accounting.
const BITS_PER_BURST: u32 = 141;

/// DMR voice bursts per second (one per 60 ms).
const BURSTS_PER_SEC: f32 = 16.667;

/// Slot machine configuration.
#[derive(Debug, Clone, Copy)]
pub struct SlotConfig {
    /// Transmit timeout in seconds (expiry warns and mutes rather than
    /// ending the call)
    pub timeout_secs: u32,
    /// Inter-packet gap treated as lost audio, in milliseconds
    pub jitter_ms: u32,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self { timeout_secs: 180, jitter_ms: 360 }
    }
}

/// One TDMA slot's transcoding machine.
pub struct DmrSlot {
    slot_no: u8,
    state: NetState,

    watchdog: Timer,
    timeout: Timer,
    packet_timer: Timer,
    /// Milliseconds since the last accepted voice burst
    since_last_frame_ms: u32,

    context: Option<CallContext>,
    /// Position of the next IMBE codeword within the LDU pair (0..=17)
    p25_n: u8,
    ldu1: LduBuffer,
    ldu2: LduBuffer,
    bridge: VoiceBridge,

    net_frames: u32,
    net_lost: u32,
    net_bits: u32,
    net_errs: u32,
    net_timeout: bool,

    jitter_ms: u32,
    jitter_slots: u32,
}

impl DmrSlot {
    /// Create an idle slot machine around an AMBE-to-IMBE bridge.
    pub fn new(slot_no: u8, config: SlotConfig, bridge: VoiceBridge) -> Self {
        let jitter_slots = (config.jitter_ms as f32 / 360.0).ceil() as u32 * 6;
        Self {
            slot_no,
            state: NetState::Idle,
            watchdog: Timer::new(WATCHDOG_MS),
            timeout: Timer::new(config.timeout_secs.saturating_mul(1000)),
            packet_timer: Timer::new(PACKET_TIMER_MS),
            since_last_frame_ms: 0,
            context: None,
            p25_n: 0,
            ldu1: LduBuffer::new(),
            ldu2: LduBuffer::new(),
            bridge,
            net_frames: 0,
            net_lost: 0,
            net_bits: 1,
            net_errs: 0,
            net_timeout: false,
            jitter_ms: config.jitter_ms,
            jitter_slots,
        }
    }

    /// Current machine state.
    pub fn state(&self) -> NetState {
        self.state
    }

    /// The active call, if any.
    pub fn context(&self) -> Option<&CallContext> {
        self.context.as_ref()
    }

    /// Position of the next IMBE codeword within the LDU pair.
    pub fn p25_n(&self) -> u8 {
        self.p25_n
    }

    /// Accepted voice bursts this call.
    pub fn net_frames(&self) -> u32 {
        self.net_frames
    }

    /// FEC-corrected bits this call.
    pub fn net_errs(&self) -> u32 {
        self.net_errs
    }

    /// Process one DMR frame from the source network.
    pub fn process(&mut self, frame: &DmrData) -> Vec<TranscodeAction> {
        match frame.data_type {
            DataType::Voice | DataType::VoiceSync => self.process_voice(frame),
            DataType::TerminatorWithLc => self.process_terminator(),
            _ => Vec::new(),
        }
    }

    /// Advance the machine's timers by `ms` milliseconds.
    pub fn tick(&mut self, ms: u32) -> Vec<TranscodeAction> {
        let mut actions = Vec::new();

        self.timeout.clock(ms);
        if self.timeout.is_running() && self.timeout.has_expired() && !self.net_timeout {
            tracing::warn!("DMR slot {} user has timed out", self.slot_no);
            self.net_timeout = true;
        }

        if self.state == NetState::Audio {
            self.watchdog.clock(ms);
            if self.watchdog.has_expired() {
                self.net_frames += 1;
                tracing::info!(
                    "DMR slot {} network watchdog has expired, {:.1} seconds, {}% packet loss, BER: {:.1}%",
                    self.slot_no,
                    self.net_frames as f32 / BURSTS_PER_SEC,
                    self.net_lost * 100 / self.net_frames.max(1),
                    self.net_errs as f32 * 100.0 / self.net_bits as f32,
                );
                if let Some(context) = &self.context {
                    actions.push(TranscodeAction::SendP25Tdu { context: context.clone() });
                }
                self.reset();
                return actions;
            }
        }

        if self.state == NetState::Audio {
            self.since_last_frame_ms = self.since_last_frame_ms.saturating_add(ms);
            self.packet_timer.clock(ms);
            if self.packet_timer.is_running() && self.packet_timer.has_expired() {
                if self.since_last_frame_ms >= self.jitter_ms {
                    tracing::warn!(
                        "DMR slot {} lost audio for {}ms ({} slots)",
                        self.slot_no,
                        self.since_last_frame_ms,
                        self.jitter_slots,
                    );
                    self.since_last_frame_ms = 0;
                }
                self.packet_timer.start();
            }
        }

        actions
    }

    fn process_voice(&mut self, frame: &DmrData) -> Vec<TranscodeAction> {
        if frame.data_type == DataType::VoiceSync {
            if self.state == NetState::Idle {
                let context = CallContext::from_dmr(frame.flco, frame.src_id, frame.dst_id);
                tracing::info!(
                    "DMR slot {} network voice call, srcId = {}, dstId = {}, group = {}",
                    self.slot_no,
                    context.src_id,
                    context.dst_id,
                    context.group,
                );
                self.context = Some(context);
                self.state = NetState::Audio;
                self.timeout.start();
                self.net_timeout = false;
                self.net_frames = 0;
                self.net_lost = 0;
                self.net_bits = 1;
                self.net_errs = 0;
                self.p25_n = 0;
                self.ldu1.clear();
                self.ldu2.clear();
            }
        } else if self.state != NetState::Audio {
            return Vec::new();
        }

        self.watchdog.start();

        let mut ambe = extract_ambe(&frame.payload);
        let errs = AmbeFec::regenerate(&mut ambe);
        self.net_errs += errs;
        self.net_bits += BITS_PER_BURST;
        tracing::debug!(
            "DMR slot {} voice, seqNo = {}, n = {}, errs = {}/141 ({:.1}%)",
            self.slot_no,
            frame.seq_no,
            frame.n,
            errs,
            errs as f32 / 1.41,
        );

        let mut actions = Vec::new();
        if !self.net_timeout {
            self.process_ambe(&ambe, &mut actions);
        }

        self.packet_timer.start();
        self.since_last_frame_ms = 0;
        self.net_frames += 1;

        actions
    }

    fn process_ambe(
        &mut self,
        ambe: &[u8; AMBE_FRAME_LENGTH_BYTES * AMBE_PER_BURST],
        actions: &mut Vec<TranscodeAction>,
    ) {
        let Some(context) = self.context.clone() else {
            return;
        };

        for n in 0..AMBE_PER_BURST {
            if self.p25_n == 0 {
                self.ldu1.clear();
            }
            if self.p25_n == 9 {
                self.ldu2.clear();
            }

            let codeword = &ambe[n * AMBE_FRAME_LENGTH_BYTES..(n + 1) * AMBE_FRAME_LENGTH_BYTES];
            let mut imbe = [0u8; IMBE_FRAME_LENGTH_BYTES];
            self.bridge.transcode(codeword, &mut imbe);

            if self.p25_n < 9 {
                self.ldu1.inject_imbe(usize::from(self.p25_n), &imbe);
            } else {
                self.ldu2.inject_imbe(usize::from(self.p25_n) - 9, &imbe);
            }

            if self.p25_n == 8 {
                tracing::info!(
                    "P25 LDU1 audio, srcId = {}, dstId = {}, group = {}, emerg = {}, encrypt = {}, prio = {}",
                    context.src_id,
                    context.dst_id,
                    context.group,
                    context.emergency,
                    context.encrypted,
                    context.priority,
                );
                actions.push(TranscodeAction::SendP25Ldu1 {
                    context: context.clone(),
                    ldu: Box::new(self.ldu1.clone()),
                });
            }
            if self.p25_n == 17 {
                tracing::info!("P25 LDU2 audio");
                actions.push(TranscodeAction::SendP25Ldu2 {
                    context: context.clone(),
                    ldu: Box::new(self.ldu2.clone()),
                });
            }

            self.p25_n = (self.p25_n + 1) % 18;
        }
    }

    fn process_terminator(&mut self) -> Vec<TranscodeAction> {
        if self.state != NetState::Audio {
            return Vec::new();
        }

        tracing::info!(
            "DMR slot {} network end of voice transmission, {:.1} seconds, {}% packet loss, BER: {:.1}%",
            self.slot_no,
            self.net_frames as f32 / BURSTS_PER_SEC,
            self.net_lost * 100 / self.net_frames.max(1),
            self.net_errs as f32 * 100.0 / self.net_bits as f32,
        );

        let mut actions = Vec::new();
        if let Some(context) = &self.context {
            actions.push(TranscodeAction::SendP25Tdu { context: context.clone() });
        }
        self.reset();
        actions
    }

    fn reset(&mut self) {
        self.state = NetState::Idle;
        self.watchdog.stop();
        self.timeout.stop();
        self.packet_timer.stop();
        self.since_last_frame_ms = 0;
        self.net_timeout = false;
        self.net_frames = 0;
        self.net_lost = 0;
        self.net_errs = 0;
        self.net_bits = 1;
        self.context = None;
        self.p25_n = 0;
        self.ldu1.clear();
        self.ldu2.clear();
    }
}
