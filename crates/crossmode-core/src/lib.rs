//! Sans-IO transcoding engine bridging DMR and P25 Phase 1 voice.
//!
//! The two state machines - [`DmrSlot`] for the DMR-to-P25 path and
//! [`P25Call`] for the reverse - are pure: they take network frames and
//! elapsed milliseconds in and return [`TranscodeAction`]s for the driver to
//! execute. No sockets, no clock, no shared state. This keeps every call
//! scenario (packet loss, watchdog expiry, mid-LDU terminators) directly
//! testable without I/O.
//!
//! # Cadence
//!
//! DMR carries 3 AMBE codewords per 60 ms burst; P25 carries 9 IMBE
//! codewords per 180 ms LDU. Each direction recodes frame by frame through a
//! 160-sample PCM intermediate ([`VoiceBridge`]) and realigns the cadence:
//! six DMR bursts fill one LDU1 + LDU2 pair, and each LDU yields exactly
//! three DMR bursts.

pub mod action;
pub mod bridge;
pub mod context;
pub mod dmr_slot;
pub mod p25_call;
pub mod timer;
pub mod vocoder;

pub use action::TranscodeAction;
pub use bridge::VoiceBridge;
pub use context::{CallContext, NetState};
pub use dmr_slot::{DmrSlot, SlotConfig};
pub use p25_call::{CallConfig, P25Call};
pub use timer::Timer;
pub use vocoder::{Decoder, Encoder, NullVocoder, PCM_SAMPLES_PER_FRAME, PcmFrame};
