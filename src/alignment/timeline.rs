use crate::types::{SequenceItem, SpeechSegment, TimelineItem};

/// Coarse ayah timeline over detected speech.
///
/// Total speech time is split evenly across the ayahs and handed out in order
/// while walking a cursor through the speech segments. Output is monotonic and
/// clamped to `[0, audio_duration_s]`; this is a proportional estimate, not a
/// forced alignment.
pub fn build_ayah_timeline(
    segments: &[SpeechSegment],
    sequence: &[SequenceItem],
    audio_duration_s: f64,
    margin_s: f64,
) -> Vec<TimelineItem> {
    if sequence.is_empty() || !(audio_duration_s > 0.0) {
        return Vec::new();
    }
    let margin_s = if margin_s.is_finite() { margin_s.max(0.0) } else { 0.0 };

    let mut segments: Vec<SpeechSegment> = segments
        .iter()
        .copied()
        .filter(|s| s.start.is_finite() && s.end.is_finite() && s.end > s.start)
        .collect();
    let mut total_speech: f64 = segments.iter().map(SpeechSegment::duration).sum();
    if segments.is_empty() || total_speech <= 0.0 {
        tracing::debug!(
            audio_duration_s,
            "timeline: no speech segments, using the whole recording"
        );
        segments = vec![SpeechSegment::new(0.0, audio_duration_s)];
        total_speech = audio_duration_s;
    }

    let per_ayah = total_speech / sequence.len() as f64;
    let mut timeline = Vec::with_capacity(sequence.len());
    let mut seg_idx = 0usize;
    let mut cursor = segments[0].start;

    for item in sequence {
        // Skip segments that end before the window starts.
        while seg_idx < segments.len() && cursor >= segments[seg_idx].end {
            seg_idx += 1;
            if let Some(next) = segments.get(seg_idx) {
                cursor = cursor.max(next.start);
            }
        }
        let Some(segment) = segments.get(seg_idx) else {
            tracing::debug!(
                assigned = timeline.len(),
                ayahs = sequence.len(),
                "timeline: speech exhausted before every ayah was placed"
            );
            break;
        };

        let mut start = cursor.max(segment.start);
        let mut end = (cursor + per_ayah).min(segment.end);
        if end <= start {
            start = cursor.clamp(segment.start, segment.end);
            end = segment.end;
        }

        let start = (start - margin_s).clamp(0.0, audio_duration_s);
        let end = (end + margin_s).clamp(0.0, audio_duration_s);
        timeline.push(TimelineItem {
            surah: item.surah,
            ayah: item.ayah,
            start,
            end,
        });
        cursor = end;
    }
    timeline
}
