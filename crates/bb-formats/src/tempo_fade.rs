//! Tempo-fade expansion.
//!
//! Replaces each `TempoFade` marker with one `TempoSet` per tick. The two
//! expansion branches deliberately differ in sign and length; see the
//! tests for the exact shapes.

use bb_ir::{Event, EventPayload, Ticks, Track};
use tracing::debug;

use crate::FormatError;

/// Expand every tempo fade on `track` and re-sort its events.
///
/// `default_tempo` is the running tempo before the first explicit change.
/// The track must already be time-sorted.
pub fn expand_tempo_fades(track: &mut Track, default_tempo: i32) -> Result<(), FormatError> {
    if !track.events.iter().any(Event::is_tempo_fade) {
        return Ok(());
    }

    // explicit tempo changes, before any synthesis
    let explicit: Vec<Ticks> = track
        .events
        .iter()
        .filter(|e| e.tempo().is_some())
        .map(|e| e.time)
        .collect();

    let mut current = default_tempo;
    let mut occurrence = 0usize;
    let mut synthesized = Vec::new();

    for event in &track.events {
        match event.payload {
            EventPayload::TempoSet { bpm } => {
                occurrence += 1;
                current = bpm;
            }
            EventPayload::TempoFade {
                target_bpm,
                fade_ticks,
            } => {
                if fade_ticks == 0 {
                    return Err(FormatError::FadeTimeZero {
                        offset: event.source_offset,
                    });
                }
                let step = (target_bpm as i64 - current as i64).div_euclid(fade_ticks as i64);
                let tempo_at = |i: Ticks, sign: i64| -> i32 {
                    (current as i64 + sign * step * i as i64).clamp(i32::MIN as i64, i32::MAX as i64)
                        as i32
                };

                match explicit.get(occurrence) {
                    None => {
                        debug!(
                            "fade {} -> {} over {} ticks at {}",
                            current, target_bpm, fade_ticks, event.time
                        );
                        for i in 0..fade_ticks {
                            synthesized.push(tempo(event, i, tempo_at(i, 1)));
                            occurrence += 1;
                        }
                        synthesized.push(tempo(event, fade_ticks, target_bpm));
                        current = target_bpm;
                    }
                    Some(&next_time) => {
                        let gap = next_time.checked_sub(event.time).unwrap_or(0);
                        debug!(
                            "fade from {} at {} runs {} ticks up to the next tempo",
                            current, event.time, gap
                        );
                        for i in 0..gap {
                            synthesized.push(tempo(event, i, tempo_at(i, -1)));
                            occurrence += 1;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    track.events.retain(|e| !e.is_tempo_fade());
    track.events.extend(synthesized);
    track.sort_events();
    Ok(())
}

fn tempo(fade: &Event, offset: Ticks, bpm: i32) -> Event {
    Event::new(
        fade.time.saturating_add(offset),
        fade.source_offset,
        EventPayload::TempoSet { bpm },
    )
}
