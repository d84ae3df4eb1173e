//! Call-lifecycle scenarios for the P25-to-DMR path.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use crossmode_core::{
    CallConfig, Decoder, NetState, NullVocoder, P25Call, PcmFrame, TranscodeAction, VoiceBridge,
};
use crossmode_proto::dmr::{DataType, DmrData};
use crossmode_proto::p25::{Duid, LduBuffer, LduKind, P25Record};
use crossmode_proto::NULL_IMBE;

/// Decoder that records every codeword it is asked to synthesize.
struct RecordingDecoder {
    seen: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Decoder for RecordingDecoder {
    fn decode(&mut self, codeword: &[u8], samples: &mut PcmFrame) -> u32 {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(codeword.to_vec());
        }
        samples.fill(0);
        0
    }
}

fn filled_ldu() -> LduBuffer {
    let mut buffer = LduBuffer::new();
    for i in 0..9 {
        buffer.inject_imbe(i, &[(i as u8 + 1) * 0x10; 11]);
    }
    buffer
}

fn ldu1_record(src_id: u32, dst_id: u32) -> P25Record {
    P25Record {
        duid: Duid::Ldu1,
        lco: 0x00,
        mfid: 0,
        alg_id: 0x80,
        key_id: 0,
        src_id,
        dst_id,
        lsd: [0; 2],
        data: filled_ldu().build_record(LduKind::Ldu1).to_vec(),
    }
}

fn ldu2_record(alg_id: u8, key_id: u16) -> P25Record {
    let mut data = filled_ldu().build_record(LduKind::Ldu2).to_vec();
    // alg/kid live in record 5 (wire offset 87, buffer slot 125): rel 1..4
    data[87 + 1] = alg_id;
    data[87 + 2] = (key_id >> 8) as u8;
    data[87 + 3] = (key_id & 0xFF) as u8;
    P25Record {
        duid: Duid::Ldu2,
        lco: 0x00,
        mfid: 0,
        alg_id,
        key_id,
        src_id: 200,
        dst_id: 5000,
        lsd: [0; 2],
        data,
    }
}

fn tdu_record() -> P25Record {
    P25Record::control(Duid::Tdu, 0x00, 200, 5000)
}

fn new_call() -> P25Call {
    P25Call::new(CallConfig::default(), VoiceBridge::null(0.0))
}

fn dmr_frames(actions: &[TranscodeAction]) -> Vec<&DmrData> {
    actions
        .iter()
        .map(|action| match action {
            TranscodeAction::SendDmr(frame) => frame,
            other => panic!("unexpected action {other:?}"),
        })
        .collect()
}

#[test]
fn minimal_call_produces_header_six_voice_and_terminator() {
    let mut call = new_call();

    let mut all = Vec::new();
    all.extend(call.process(&ldu1_record(200, 5000)));
    all.extend(call.process(&ldu2_record(0x80, 0x1234)));
    all.extend(call.process(&tdu_record()));

    let frames = dmr_frames(&all);
    assert_eq!(frames.len(), 8, "header + 6 voice + terminator");

    assert_eq!(frames[0].data_type, DataType::VoiceLcHeader);
    assert_eq!(frames[0].src_id, 200);
    assert_eq!(frames[0].dst_id, 5000);

    for (i, frame) in frames[1..7].iter().enumerate() {
        let seq = i as u8;
        assert_eq!(frame.seq_no, seq, "sequence numbers are strictly monotone");
        assert_eq!(frame.n, seq % 6);
        if frame.n == 0 {
            assert_eq!(frame.data_type, DataType::VoiceSync);
        } else {
            assert_eq!(frame.data_type, DataType::Voice);
        }
    }

    assert_eq!(frames[7].data_type, DataType::TerminatorWithLc);
    assert_eq!(frames[7].seq_no, 6, "terminator follows the sixth voice frame");
    assert_eq!(call.state(), NetState::Idle);
}

#[test]
fn ldu2_updates_the_encryption_sync() {
    let mut call = new_call();
    call.process(&ldu1_record(200, 5000));
    call.process(&ldu2_record(0xAA, 0x1234));

    let context = call.context().unwrap();
    assert_eq!(context.alg_id, 0xAA);
    assert_eq!(context.key_id, 0x1234);
}

#[test]
fn lost_voice_slot_is_substituted_with_the_previous_imbe() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let bridge = VoiceBridge::new(
        Box::new(RecordingDecoder { seen: Arc::clone(&seen) }),
        Box::new(NullVocoder),
        0.0,
    );
    let mut call = P25Call::new(CallConfig::default(), bridge);

    let mut record = ldu1_record(200, 5000);
    // Zero record 2's whole window (wire offsets 36..53): the IMBE that
    // would land at buffer offset 55 is lost
    record.data[36..53].fill(0);

    let actions = call.process(&record);
    assert_eq!(call.net_lost(), 1, "one substitution counted");
    assert_eq!(dmr_frames(&actions).len(), 4, "header + 3 bursts, count unaffected");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 9);
    // Slot 2 was patched with slot 1's codeword
    assert_eq!(seen[2], seen[1]);
    assert_ne!(seen[2], vec![0u8; 11]);
}

#[test]
fn fully_lost_leading_slot_starts_from_the_null_imbe() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let bridge = VoiceBridge::new(
        Box::new(RecordingDecoder { seen: Arc::clone(&seen) }),
        Box::new(NullVocoder),
        0.0,
    );
    let mut call = P25Call::new(CallConfig::default(), bridge);

    let mut record = ldu1_record(200, 5000);
    record.data[0..22].fill(0);
    call.process(&record);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0], NULL_IMBE.to_vec());
}

#[test]
fn call_entered_by_ldu2_uses_the_record_addressing() {
    let mut call = new_call();
    let actions = call.process(&ldu2_record(0x80, 0));

    assert_eq!(call.state(), NetState::Audio);
    let frames = dmr_frames(&actions);
    assert_eq!(frames.len(), 4, "header + 3 bursts");
    assert_eq!(frames[0].data_type, DataType::VoiceLcHeader);
    assert_eq!(frames[0].src_id, 200);
    assert_eq!(frames[0].dst_id, 5000);

    let context = call.context().unwrap();
    assert!(context.group);
    assert!(!context.emergency);
}

#[test]
fn terminator_after_one_ldu_pads_to_the_superframe_boundary() {
    let mut call = new_call();
    let mut all = Vec::new();
    all.extend(call.process(&ldu1_record(200, 5000)));
    all.extend(call.process(&tdu_record()));

    let frames = dmr_frames(&all);
    // header, 3 voice, 3 silence fill, terminator
    assert_eq!(frames.len(), 8);
    for (i, frame) in frames[1..7].iter().enumerate() {
        assert_eq!(frame.seq_no, i as u8);
        assert_eq!(frame.n, i as u8 % 6);
    }
    assert!(frames[4..7].iter().all(|f| f.data_type == DataType::Voice));
    assert_eq!(frames[7].data_type, DataType::TerminatorWithLc);
    assert_eq!(frames[7].seq_no, 6);
}

#[test]
fn watchdog_expiry_pads_and_terminates() {
    let mut call = new_call();
    call.process(&ldu1_record(200, 5000));
    assert_eq!(call.state(), NetState::Audio);

    let actions = call.tick(1600);
    let frames = dmr_frames(&actions);
    assert_eq!(frames.len(), 4, "3 silence fill + terminator");
    assert_eq!(frames[3].data_type, DataType::TerminatorWithLc);
    assert_eq!(call.state(), NetState::Idle);
    assert_eq!(call.seq_no(), 0);
}

#[test]
fn bad_record_prefix_is_counted_and_dropped() {
    let mut call = new_call();
    let mut record = ldu1_record(200, 5000);
    record.data[22] = 0x7F;

    let actions = call.process(&record);
    assert!(actions.is_empty());
    assert_eq!(call.net_errs(), 1);
    assert_eq!(call.state(), NetState::Idle, "a bad record is just a lost packet");
}

#[test]
fn terminator_in_idle_is_ignored() {
    let mut call = new_call();
    assert!(call.process(&tdu_record()).is_empty());
    assert_eq!(call.state(), NetState::Idle);
}

proptest! {
    /// Voice frames carry strictly monotone sequence numbers with
    /// `n = seq_no % 6`, whatever the LDU count.
    #[test]
    fn voice_sequence_is_strictly_monotone(ldus in 1usize..12) {
        let mut call = new_call();
        let mut voice_seq = 0u8;
        for i in 0..ldus {
            let actions = if i % 2 == 0 {
                call.process(&ldu1_record(200, 5000))
            } else {
                call.process(&ldu2_record(0x80, 0))
            };
            for action in &actions {
                let TranscodeAction::SendDmr(frame) = action else {
                    prop_assert!(false, "unexpected action {:?}", action);
                    continue;
                };
                if frame.data_type == DataType::VoiceLcHeader {
                    continue;
                }
                prop_assert_eq!(frame.seq_no, voice_seq);
                prop_assert_eq!(frame.n, voice_seq % 6);
                prop_assert_eq!(
                    frame.data_type,
                    if frame.n == 0 { DataType::VoiceSync } else { DataType::Voice },
                );
                voice_seq = voice_seq.wrapping_add(1);
            }
        }
        prop_assert_eq!(usize::from(voice_seq), ldus * 3);
    }
}

#[test]
fn private_call_addressing_is_preserved() {
    let mut call = new_call();
    let mut record = ldu1_record(42, 77);
    record.lco = 0x03;
    let actions = call.process(&record);

    let frames = dmr_frames(&actions);
    assert_eq!(frames[0].flco, crossmode_proto::dmr::Flco::Private);
    assert!(!call.context().unwrap().group);
}
