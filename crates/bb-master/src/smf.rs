//! Standard MIDI file writer for encoded tracks.

use bb_formats::{EncodedTrack, OutputMessage};
use midly::num::{u14, u15, u24, u4};
use midly::{Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, TrackEvent, TrackEventKind};
use std::io::Write;

/// Pitch-bend center in the unsigned 14-bit wire encoding.
const BEND_CENTER: i32 = 0x2000;

/// Build a format 1 file with one track per encoded channel.
pub fn tracks_to_smf(tracks: &[EncodedTrack], ticks_per_beat: u16) -> Smf<'_> {
    let header = Header::new(Format::Parallel, Timing::Metrical(u15::from(ticks_per_beat)));
    let mut smf = Smf::new(header);
    for track in tracks {
        let mut events: Vec<TrackEvent<'_>> = track
            .messages
            .iter()
            .map(|m| TrackEvent {
                delta: m.delta.into(),
                kind: event_kind(&m.message),
            })
            .collect();
        events.push(TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(events);
    }
    smf
}

fn event_kind(message: &OutputMessage) -> TrackEventKind<'_> {
    let midi = |channel: u8, message| TrackEventKind::Midi {
        channel: u4::from(channel),
        message,
    };
    match message {
        OutputMessage::NoteOn { channel, key, velocity } => midi(
            *channel,
            MidiMessage::NoteOn {
                key: (*key).into(),
                vel: (*velocity).into(),
            },
        ),
        OutputMessage::NoteOff { channel, key, velocity } => midi(
            *channel,
            MidiMessage::NoteOff {
                key: (*key).into(),
                vel: (*velocity).into(),
            },
        ),
        OutputMessage::Controller { channel, controller, value } => midi(
            *channel,
            MidiMessage::Controller {
                controller: (*controller).into(),
                value: (*value).into(),
            },
        ),
        OutputMessage::ProgramChange { channel, program } => midi(
            *channel,
            MidiMessage::ProgramChange {
                program: (*program).into(),
            },
        ),
        OutputMessage::PitchBend { channel, value } => {
            let raw = (*value as i32 + BEND_CENTER) as u16;
            midi(
                *channel,
                MidiMessage::PitchBend {
                    bend: PitchBend(u14::from(raw)),
                },
            )
        }
        OutputMessage::Tempo(micros) => TrackEventKind::Meta(MetaMessage::Tempo(u24::from(*micros))),
        // midly stores the body after the leading F0, terminator included
        OutputMessage::SysEx(bytes) => TrackEventKind::SysEx(bytes.get(1..).unwrap_or_default()),
    }
}

pub fn write_smf(
    w: &mut impl Write,
    tracks: &[EncodedTrack],
    ticks_per_beat: u16,
) -> std::io::Result<()> {
    tracks_to_smf(tracks, ticks_per_beat).write_std(w)
}

pub fn tracks_to_bytes(tracks: &[EncodedTrack], ticks_per_beat: u16) -> Vec<u8> {
    let mut buf = Vec::new();
    write_smf(&mut buf, tracks, ticks_per_beat).expect("Vec<u8> write cannot fail");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use bb_formats::TimedMessage;

    fn track(channel: u8, messages: Vec<(u32, OutputMessage)>) -> EncodedTrack {
        EncodedTrack {
            channel,
            messages: messages
                .into_iter()
                .map(|(delta, message)| TimedMessage { delta, message })
                .collect(),
        }
    }

    #[test]
    fn header_is_parallel_at_requested_resolution() {
        let tracks = vec![track(0, vec![(0, OutputMessage::Tempo(500_000))])];
        let bytes = tracks_to_bytes(&tracks, 48);
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::from(48)));
        assert_eq!(smf.tracks.len(), 1);
    }

    #[test]
    fn every_track_ends_with_end_of_track() {
        let tracks = vec![
            track(0, vec![(0, OutputMessage::ProgramChange { channel: 0, program: 3 })]),
            track(5, vec![(12, OutputMessage::NoteOn { channel: 5, key: 60, velocity: 90 })]),
        ];
        let bytes = tracks_to_bytes(&tracks, 48);
        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 2);
        for events in &smf.tracks {
            let last = events.last().unwrap();
            assert_eq!(last.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack));
        }
        assert_eq!(smf.tracks[1][0].delta.as_int(), 12);
    }

    #[test]
    fn pitch_bend_is_centered() {
        let tracks = vec![track(
            1,
            vec![
                (0, OutputMessage::PitchBend { channel: 1, value: 0 }),
                (0, OutputMessage::PitchBend { channel: 1, value: -8192 }),
                (0, OutputMessage::PitchBend { channel: 1, value: 8191 }),
            ],
        )];
        let bytes = tracks_to_bytes(&tracks, 48);
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
        assert_eq!(bends, vec![0x2000, 0, 0x3FFF]);
    }

    #[test]
    fn sysex_round_trips() {
        let bytes = vec![0xF0, 0x41, 0x10, 0x42, 0x12, 0x40, 0x11, 0x15, 0x01, 25, 0xF7];
        let tracks = vec![track(0, vec![(0, OutputMessage::SysEx(bytes))])];
        let out = tracks_to_bytes(&tracks, 48);
        let smf = Smf::parse(&out).unwrap();
        assert_eq!(
            smf.tracks[0][0].kind,
            TrackEventKind::SysEx(&[0x41, 0x10, 0x42, 0x12, 0x40, 0x11, 0x15, 0x01, 25, 0xF7])
        );
    }
}
