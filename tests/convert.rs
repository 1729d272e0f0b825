//! End-to-end conversion tests: BGM bytes in, standard MIDI file out.

use bb_master::{Controller, ConvertError, ConvertOptions, DecodeOptions, FormatError, Warning};
use midly::num::u15;
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

/// Header plus one segment with a single row. Each fragment is
/// (channel, flags, opcode bytes).
fn one_row_song(fragments: &[(usize, u16, Vec<u8>)]) -> Vec<u8> {
    let mut data = vec![0u8; 0x40];
    data[0..4].copy_from_slice(b"BGM ");
    data[8..12].copy_from_slice(b"E2E\0");
    // segment 0 at 0x40, one row then the terminator
    data[0x14..0x16].copy_from_slice(&0x0010u16.to_be_bytes());
    data.extend_from_slice(&[0x30, 0x00, 0x00, 0x02, 0, 0, 0, 0]);
    // sub-segment at 0x48
    let sub = data.len();
    data.resize(sub + 64, 0);
    for (channel, flags, bytes) in fragments {
        let (channel, flags) = (*channel, *flags);
        let at = data.len();
        data[sub + channel * 4..sub + channel * 4 + 2].copy_from_slice(&((at - sub) as u16).to_be_bytes());
        data[sub + channel * 4 + 2..sub + channel * 4 + 4].copy_from_slice(&flags.to_be_bytes());
        data.extend_from_slice(bytes);
    }
    data
}

fn midi_messages<'a>(events: &'a [TrackEvent<'a>]) -> Vec<(u32, MidiMessage)> {
    events
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi { message, .. } => Some((e.delta.as_int(), message)),
            _ => None,
        })
        .collect()
}

#[test]
fn converts_melody_and_drums() {
    let melody: &[u8] = &[
        0xE0, 0x00, 0x78, // tempo 120
        0xE8, 0x00, 0x30, // bank 0 program 48
        0xBC, 100, 0x30, // note 60 for 48 ticks
        0x30, 0xBE, 80, 0x18, // after 48 ticks, note 62 for 24 ticks
        0x00,
    ];
    let drums: &[u8] = &[0x80, 110, 0x0C, 0x00];
    let data = one_row_song(&[(0, 0, melody.to_vec()), (9, 0x0080, drums.to_vec())]);

    let mut ctrl = Controller::default();
    ctrl.load_bgm(&data).unwrap();
    assert!(ctrl.warnings().is_empty());

    let summary = ctrl.summary().unwrap();
    assert_eq!(summary.name, "E2E");
    assert_eq!(summary.length, 72);
    assert_eq!(summary.tracks.len(), 2);
    assert!(summary.tracks[1].drum_mode);

    let bytes = ctrl.render_smf().unwrap();
    let smf = Smf::parse(&bytes).unwrap();
    assert_eq!(smf.header.format, Format::Parallel);
    assert_eq!(smf.header.timing, Timing::Metrical(u15::from(48)));
    assert_eq!(smf.tracks.len(), 2);

    let melody_track = &smf.tracks[0];
    assert_eq!(melody_track[3].kind, TrackEventKind::Meta(MetaMessage::Tempo(500_000.into())));
    assert_eq!(
        melody_track.last().unwrap().kind,
        TrackEventKind::Meta(MetaMessage::EndOfTrack)
    );

    let messages = midi_messages(melody_track);
    assert_eq!(
        messages,
        vec![
            (0, MidiMessage::Controller { controller: 101.into(), value: 0.into() }),
            (0, MidiMessage::Controller { controller: 100.into(), value: 0.into() }),
            (0, MidiMessage::Controller { controller: 6.into(), value: 24.into() }),
            (0, MidiMessage::Controller { controller: 0.into(), value: 0.into() }),
            (0, MidiMessage::ProgramChange { program: 0x30.into() }),
            (0, MidiMessage::NoteOn { key: 60.into(), vel: 100.into() }),
            (48, MidiMessage::NoteOff { key: 60.into(), vel: 100.into() }),
            (0, MidiMessage::NoteOn { key: 62.into(), vel: 80.into() }),
            (24, MidiMessage::NoteOff { key: 62.into(), vel: 80.into() }),
        ]
    );

    let drum_track = &smf.tracks[1];
    assert_eq!(
        drum_track[3].kind,
        TrackEventKind::SysEx(&[0x41, 0x10, 0x42, 0x12, 0x40, 0x1A, 0x15, 0x01, 0x10, 0xF7])
    );
    let drum_notes: Vec<u8> = drum_track
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, .. },
            } => {
                assert_eq!(channel.as_int(), 9);
                Some(key.as_int())
            }
            _ => None,
        })
        .collect();
    assert_eq!(drum_notes, vec![36]);
}

#[test]
fn out_of_range_tuning_is_clamped_and_reported() {
    // coarse tune +127 semitones
    let data = one_row_song(&[(3, 0, vec![0xED, 0x7F, 0x00])]);
    let mut ctrl = Controller::default();
    ctrl.load_bgm(&data).unwrap();

    let bytes = ctrl.render_smf().unwrap();
    assert!(matches!(
        ctrl.warnings(),
        [Warning::PitchOutOfRange { value: 43349, .. }]
    ));

    let smf = Smf::parse(&bytes).unwrap();
    let bends: Vec<u16> = smf.tracks[0]
        .iter()
        .filter_map(|e| match e.kind {
            TrackEventKind::Midi {
                message: MidiMessage::PitchBend { bend },
                ..
            } => Some(bend.0.as_int()),
            _ => None,
        })
        .collect();
    assert_eq!(bends, vec![0x3FFF]);
}

#[test]
fn encoding_twice_reports_warnings_once() {
    let data = one_row_song(&[(3, 0, vec![0xED, 0x7F, 0x00])]);
    let mut ctrl = Controller::default();
    ctrl.load_bgm(&data).unwrap();

    ctrl.render_smf().unwrap();
    let mut written = Vec::new();
    ctrl.write_smf(&mut written).unwrap();
    assert_eq!(ctrl.warnings().len(), 1);
}

#[test]
fn writer_and_renderer_agree() {
    let data = one_row_song(&[(0, 0, vec![0xBC, 100, 0x10, 0x00])]);
    let mut ctrl = Controller::default();
    ctrl.load_bgm(&data).unwrap();

    let rendered = ctrl.render_smf().unwrap();
    let mut written = Vec::new();
    ctrl.write_smf(&mut written).unwrap();
    assert_eq!(rendered, written);
}

#[test]
fn decode_errors_produce_no_output() {
    let data = one_row_song(&[(0, 0, vec![0xBC, 100])]);
    let mut ctrl = Controller::default();
    assert!(matches!(
        ctrl.load_bgm(&data),
        Err(FormatError::TruncatedStream { .. })
    ));
    assert!(matches!(ctrl.render_smf(), Err(ConvertError::NothingLoaded)));
}

#[test]
fn missing_segment_is_reported() {
    let data = one_row_song(&[(0, 0, vec![0x00])]);
    let options = ConvertOptions {
        decode: DecodeOptions {
            segment: 1,
            ..DecodeOptions::default()
        },
        ..ConvertOptions::default()
    };
    let mut ctrl = Controller::new(options);
    let err = ctrl.load_bgm(&data).unwrap_err();
    assert_eq!(err, FormatError::SegmentNotFound { id: 1 });
    assert_eq!(err.to_string(), "segment 1 is not present in this file");
}
