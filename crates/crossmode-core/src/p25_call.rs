//! The P25 call machine: LDU voice recoded into DMR bursts.
//!
//! Nine IMBE codewords arrive per LDU; each is bridged to AMBE and packed
//! three-to-a-burst, so every LDU yields exactly three DMR voice frames. The
//! first burst of a call is preceded by a `VoiceLcHeader` carrying the full
//! LC; burst A of each superframe (`n == 0`) carries the audio sync, bursts
//! B-F carry EMB plus the embedded-LC fragment. A terminator or watchdog
//! expiry pads the superframe out to its 6-burst boundary with silence and
//! closes with `TerminatorWithLc`.
//!
//! Lost voice slots (zero prefix byte) are patched with the last good IMBE
//! codeword, starting from the null (silence) codeword, so the DMR side
//! always receives a full cadence.

use crossmode_proto::dmr::{
    DataType, DmrData, Emb, EmbeddedData, FullLc, Lc, SlotType, add_audio_sync, add_data_sync,
    insert_ambe, silence_payload,
};
use crossmode_proto::p25::{Duid, LduBuffer, LduKind, P25Record};
use crossmode_proto::{
    AMBE_FRAME_LENGTH_BYTES, AMBE_PER_BURST, DMR_AMBE_LENGTH_BYTES, DMR_FRAME_LENGTH_BYTES,
    IMBE_FRAME_LENGTH_BYTES, NULL_IMBE,
};

use crate::action::TranscodeAction;
use crate::bridge::VoiceBridge;
use crate::context::{CallContext, NetState};
use crate::timer::Timer;

/// Per-call network liveness watchdog.
const WATCHDOG_MS: u32 = 1500;

/// P25 voice frames per second (nine per 180 ms LDU).
const FRAMES_PER_SEC: f32 = 50.0;

/// Call machine configuration.
#[derive(Debug, Clone, Copy)]
pub struct CallConfig {
    /// Transmit timeout in seconds (expiry warns and mutes rather than
    /// ending the call)
    pub timeout_secs: u32,
    /// TDMA slot stamped on outbound DMR frames
    pub dmr_slot_no: u8,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self { timeout_secs: 180, dmr_slot_no: 1 }
    }
}

/// One direction's P25-to-DMR transcoding machine.
pub struct P25Call {
    state: NetState,

    timeout: Timer,
    watchdog: Timer,

    context: Option<CallContext>,
    ldu1: LduBuffer,
    ldu2: LduBuffer,
    /// Most recent good IMBE codeword, substituted into lost slots
    last_imbe: [u8; IMBE_FRAME_LENGTH_BYTES],

    /// Outbound burst accumulator: three AMBE codewords per DMR frame
    ambe_buffer: [u8; DMR_AMBE_LENGTH_BYTES],
    ambe_count: u8,
    /// Outbound DMR sequence number; `n = seq_no % 6`
    seq_no: u8,
    embedded: EmbeddedData,

    bridge: VoiceBridge,
    dmr_slot_no: u8,

    net_frames: u32,
    net_lost: u32,
    net_errs: u32,
    net_timeout: bool,
}

impl P25Call {
    /// Create an idle call machine around an IMBE-to-AMBE bridge.
    pub fn new(config: CallConfig, bridge: VoiceBridge) -> Self {
        Self {
            state: NetState::Idle,
            timeout: Timer::new(config.timeout_secs.saturating_mul(1000)),
            watchdog: Timer::new(WATCHDOG_MS),
            context: None,
            ldu1: LduBuffer::new(),
            ldu2: LduBuffer::new(),
            last_imbe: NULL_IMBE,
            ambe_buffer: [0; DMR_AMBE_LENGTH_BYTES],
            ambe_count: 0,
            seq_no: 0,
            embedded: EmbeddedData::new(),
            bridge,
            dmr_slot_no: config.dmr_slot_no,
            net_frames: 0,
            net_lost: 0,
            net_errs: 0,
            net_timeout: false,
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

    /// Voice slots substituted for loss this call.
    pub fn net_lost(&self) -> u32 {
        self.net_lost
    }

    /// Records rejected for framing errors.
    pub fn net_errs(&self) -> u32 {
        self.net_errs
    }

    /// Outbound DMR sequence number.
    pub fn seq_no(&self) -> u8 {
        self.seq_no
    }

    /// Process one P25 record from the source network.
    pub fn process(&mut self, record: &P25Record) -> Vec<TranscodeAction> {
        self.watchdog.start();

        let mut actions = Vec::new();
        match record.duid {
            Duid::Ldu1 => match LduBuffer::parse_record(LduKind::Ldu1, &record.data) {
                Ok(buffer) => {
                    self.ldu1 = buffer;
                    self.check_ldu2(&mut actions);
                    self.write_ldu1(record, &mut actions);
                },
                Err(e) => {
                    self.net_errs += 1;
                    tracing::warn!("P25 LDU1 rejected: {e}");
                },
            },
            Duid::Ldu2 => match LduBuffer::parse_record(LduKind::Ldu2, &record.data) {
                Ok(buffer) => {
                    self.ldu2 = buffer;
                    if self.state == NetState::Idle {
                        // Call opened by an LDU2: take the addressing from
                        // the record header with default service options
                        self.context = Some(CallContext::from_p25(record, 0x00));
                        self.timeout.start();
                    } else {
                        self.check_ldu1(record, &mut actions);
                    }
                    self.write_ldu2(&mut actions);
                },
                Err(e) => {
                    self.net_errs += 1;
                    tracing::warn!("P25 LDU2 rejected: {e}");
                },
            },
            Duid::Tdu | Duid::Tdulc => {
                if self.state != NetState::Idle {
                    tracing::info!(
                        "P25 network end of voice transmission, {:.1} seconds, {}% packet loss",
                        self.net_frames as f32 / FRAMES_PER_SEC,
                        self.net_lost * 100 / self.net_frames.max(1),
                    );
                    self.write_terminator(&mut actions);
                    self.reset();
                }
            },
            Duid::Hdu | Duid::Tsdu | Duid::Pdu => {},
        }
        actions
    }

    /// Advance the machine's timers by `ms` milliseconds.
    pub fn tick(&mut self, ms: u32) -> Vec<TranscodeAction> {
        let mut actions = Vec::new();

        self.timeout.clock(ms);
        if self.timeout.is_running() && self.timeout.has_expired() && !self.net_timeout {
            tracing::warn!("P25 user has timed out");
            self.net_timeout = true;
        }

        if self.state == NetState::Audio {
            self.watchdog.clock(ms);
            if self.watchdog.has_expired() {
                tracing::info!(
                    "P25 network watchdog has expired, {:.1} seconds, {}% packet loss",
                    self.net_frames as f32 / FRAMES_PER_SEC,
                    self.net_lost * 100 / self.net_frames.max(1),
                );
                self.write_terminator(&mut actions);
                self.reset();
            }
        }

        actions
    }

    /// Flush an unprocessed LDU2 left from a previous superframe.
    fn check_ldu2(&mut self, actions: &mut Vec<TranscodeAction>) {
        if self.state == NetState::Audio && (0..9).any(|i| self.ldu2.slot_present(i)) {
            self.write_ldu2(actions);
        }
    }

    /// Flush an unprocessed LDU1 left from a previous superframe.
    fn check_ldu1(&mut self, record: &P25Record, actions: &mut Vec<TranscodeAction>) {
        if self.state == NetState::Audio && (0..9).any(|i| self.ldu1.slot_present(i)) {
            self.write_ldu1(record, actions);
        }
    }

    fn write_ldu1(&mut self, record: &P25Record, actions: &mut Vec<TranscodeAction>) {
        let service_options = self.ldu1.service_options();
        let mut context = CallContext::from_p25(record, service_options);
        if let Some(existing) = &self.context {
            // Encryption sync arrives only in LDU2; carry it across
            context.apply_encryption_sync(existing.alg_id, existing.key_id, existing.mi);
        }

        self.timeout.start();
        self.insert_missing_audio(LduKind::Ldu1);

        tracing::info!(
            "P25 LDU1 audio, srcId = {}, dstId = {}, group = {}, emerg = {}, encrypt = {}, prio = {}, {}% packet loss",
            context.src_id,
            context.dst_id,
            context.group,
            context.emergency,
            context.encrypted,
            context.priority,
            self.net_lost * 100 / self.net_frames.max(1),
        );

        self.context = Some(context);
        let ldu = std::mem::take(&mut self.ldu1);
        self.process_imbe(&ldu, actions);
        self.net_frames += 9;
    }

    fn write_ldu2(&mut self, actions: &mut Vec<TranscodeAction>) {
        let alg_id = self.ldu2.alg_id();
        let key_id = self.ldu2.key_id();
        let mi = self.ldu2.message_indicator();
        if let Some(context) = &mut self.context {
            context.apply_encryption_sync(alg_id, key_id, mi);
        }

        self.insert_missing_audio(LduKind::Ldu2);

        tracing::info!(
            "P25 LDU2 audio, algo = {alg_id:#04x}, kid = {key_id:#06x}, {}% packet loss",
            self.net_lost * 100 / self.net_frames.max(1),
        );

        let ldu = std::mem::take(&mut self.ldu2);
        self.process_imbe(&ldu, actions);
        self.net_frames += 9;
    }

    /// Substitute the previous good IMBE codeword into lost voice slots.
    fn insert_missing_audio(&mut self, kind: LduKind) {
        let buffer = match kind {
            LduKind::Ldu1 => &mut self.ldu1,
            LduKind::Ldu2 => &mut self.ldu2,
        };
        for i in 0..9 {
            if buffer.slot_present(i) {
                self.last_imbe = buffer.extract_imbe(i);
            } else {
                buffer.inject_imbe(i, &self.last_imbe);
                self.net_lost += 1;
            }
        }
    }

    fn process_imbe(&mut self, ldu: &LduBuffer, actions: &mut Vec<TranscodeAction>) {
        if self.state == NetState::Idle {
            self.state = NetState::Audio;
            self.ambe_buffer = [0; DMR_AMBE_LENGTH_BYTES];
            self.ambe_count = 0;
            self.seq_no = 0;
        }
        if self.net_timeout {
            return;
        }

        for n in 0..9 {
            let imbe = ldu.extract_imbe(n);
            let mut ambe = [0u8; AMBE_FRAME_LENGTH_BYTES];
            self.bridge.transcode(&imbe, &mut ambe);

            let offset = usize::from(self.ambe_count) * AMBE_FRAME_LENGTH_BYTES;
            self.ambe_buffer[offset..offset + AMBE_FRAME_LENGTH_BYTES].copy_from_slice(&ambe);
            self.ambe_count += 1;

            if usize::from(self.ambe_count) == AMBE_PER_BURST {
                self.emit_voice_burst(actions);
            }
        }
    }

    /// Emit one DMR voice burst from the full accumulator (and the call's
    /// LC header ahead of the very first burst).
    fn emit_voice_burst(&mut self, actions: &mut Vec<TranscodeAction>) {
        let Some(context) = self.context.clone() else {
            return;
        };

        if self.seq_no == 0 {
            actions.push(TranscodeAction::SendDmr(self.build_header(&context)));
        }

        let dmr_n = self.seq_no % 6;
        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        insert_ambe(&self.ambe_buffer, &mut payload);

        let data_type = if dmr_n == 0 {
            add_audio_sync(&mut payload);
            tracing::debug!("DMR voice sync audio, sequence no = {}", self.seq_no);
            DataType::VoiceSync
        } else {
            let lcss = self.embedded.get_data(&mut payload, dmr_n);
            Emb { color_code: 0, pi: false, lcss }.encode(&mut payload);
            tracing::debug!("DMR voice audio, sequence no = {}", self.seq_no);
            DataType::Voice
        };

        actions.push(TranscodeAction::SendDmr(DmrData {
            slot_no: self.dmr_slot_no,
            data_type,
            flco: context.flco(),
            src_id: context.src_id,
            dst_id: context.dst_id,
            seq_no: self.seq_no,
            n: dmr_n,
            payload,
            ..DmrData::default()
        }));

        self.seq_no = self.seq_no.wrapping_add(1);
        self.ambe_buffer = [0; DMR_AMBE_LENGTH_BYTES];
        self.ambe_count = 0;
    }

    fn build_header(&mut self, context: &CallContext) -> DmrData {
        let lc = Lc::new(context.flco(), context.src_id, context.dst_id);
        self.embedded.set_lc(lc);

        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        SlotType::new(DataType::VoiceLcHeader).encode(&mut payload);
        FullLc::encode(lc, &mut payload, DataType::VoiceLcHeader);
        add_data_sync(&mut payload);

        tracing::info!(
            "DMR voice header, srcId = {}, dstId = {}, group = {}",
            context.src_id,
            context.dst_id,
            context.group,
        );

        DmrData {
            slot_no: self.dmr_slot_no,
            data_type: DataType::VoiceLcHeader,
            flco: context.flco(),
            src_id: context.src_id,
            dst_id: context.dst_id,
            seq_no: 0,
            n: 0,
            payload,
            ..DmrData::default()
        }
    }

    /// Pad the superframe out to its 6-burst boundary with silence, then
    /// close with a terminator burst.
    fn write_terminator(&mut self, actions: &mut Vec<TranscodeAction>) {
        let Some(context) = self.context.clone() else {
            return;
        };

        // A partial accumulator cannot occur on LDU boundaries, but a future
        // caller might terminate mid-buffer: flush it padded with silence
        if self.ambe_count > 0 {
            while usize::from(self.ambe_count) < AMBE_PER_BURST {
                let offset = usize::from(self.ambe_count) * AMBE_FRAME_LENGTH_BYTES;
                self.ambe_buffer[offset..offset + AMBE_FRAME_LENGTH_BYTES]
                    .copy_from_slice(&crossmode_proto::AMBE_SILENCE);
                self.ambe_count += 1;
            }
            self.emit_voice_burst(actions);
        }

        let n = self.seq_no % 6;
        if n > 0 {
            for _ in 0..(6 - n) {
                let dmr_n = self.seq_no % 6;
                let mut payload = silence_payload();
                let lcss = self.embedded.get_data(&mut payload, dmr_n);
                Emb { color_code: 0, pi: false, lcss }.encode(&mut payload);
                tracing::debug!("DMR voice audio (fill), sequence no = {}", self.seq_no);

                actions.push(TranscodeAction::SendDmr(DmrData {
                    slot_no: self.dmr_slot_no,
                    data_type: DataType::Voice,
                    flco: context.flco(),
                    src_id: context.src_id,
                    dst_id: context.dst_id,
                    seq_no: self.seq_no,
                    n: dmr_n,
                    payload,
                    ..DmrData::default()
                }));
                self.seq_no = self.seq_no.wrapping_add(1);
            }
        }

        let lc = Lc::new(context.flco(), context.src_id, context.dst_id);
        let mut payload = [0u8; DMR_FRAME_LENGTH_BYTES];
        SlotType::new(DataType::TerminatorWithLc).encode(&mut payload);
        FullLc::encode(lc, &mut payload, DataType::TerminatorWithLc);
        add_data_sync(&mut payload);

        tracing::info!("DMR end of voice transmission");

        actions.push(TranscodeAction::SendDmr(DmrData {
            slot_no: self.dmr_slot_no,
            data_type: DataType::TerminatorWithLc,
            flco: context.flco(),
            src_id: context.src_id,
            dst_id: context.dst_id,
            seq_no: self.seq_no,
            n: 0,
            payload,
            ..DmrData::default()
        }));
    }

    fn reset(&mut self) {
        self.state = NetState::Idle;
        self.timeout.stop();
        self.watchdog.stop();
        self.net_timeout = false;
        self.context = None;
        self.ldu1.clear();
        self.ldu2.clear();
        self.last_imbe = NULL_IMBE;
        self.ambe_buffer = [0; DMR_AMBE_LENGTH_BYTES];
        self.ambe_count = 0;
        self.seq_no = 0;
        self.embedded = EmbeddedData::new();
        self.net_frames = 0;
        self.net_lost = 0;
        self.net_errs = 0;
    }
}
