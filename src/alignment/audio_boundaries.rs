//! Energy-based speech segmentation.
//!
//! Frames whose RMS level is within `top_db` of the loudest frame count as
//! speech; consecutive speech frames form one segment.

use crate::types::SpeechSegment;

pub const DEFAULT_FRAME_MS: f64 = 20.0;
/// Frames this much quieter than the loudest one count as silence.
pub const DEFAULT_TOP_DB: f32 = 30.0;

pub fn detect_speech_segments(
    samples: &[f32],
    sample_rate_hz: u32,
    frame_ms: f64,
    top_db: f32,
) -> Vec<SpeechSegment> {
    let Some((frame_len, frame_rms)) = compute_frame_rms(samples, sample_rate_hz, frame_ms) else {
        return Vec::new();
    };
    let peak = frame_rms.iter().copied().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let threshold = peak * 10f32.powf(-top_db / 20.0);

    let sample_rate = sample_rate_hz as f64;
    let to_sec = |frame_idx: usize| ((frame_idx * frame_len).min(samples.len())) as f64 / sample_rate;

    let mut segments = Vec::new();
    let mut run_start: Option<usize> = None;
    for (frame_idx, rms) in frame_rms.iter().copied().enumerate() {
        match (rms >= threshold, run_start) {
            (true, None) => run_start = Some(frame_idx),
            (false, Some(start)) => {
                segments.push(SpeechSegment::new(to_sec(start), to_sec(frame_idx)));
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        segments.push(SpeechSegment::new(to_sec(start), to_sec(frame_rms.len())));
    }
    segments.retain(|s| s.end > s.start);
    segments
}

fn compute_frame_rms(
    samples: &[f32],
    sample_rate_hz: u32,
    frame_ms: f64,
) -> Option<(usize, Vec<f32>)> {
    if samples.is_empty() || sample_rate_hz == 0 || !(frame_ms > 0.0) {
        return None;
    }
    let frame_len = ((sample_rate_hz as f64 * frame_ms) / 1000.0).round() as usize;
    let frame_len = frame_len.max(1);

    let frame_rms = samples
        .chunks(frame_len)
        .map(|chunk| {
            let mean_sq =
                chunk.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>() / chunk.len() as f64;
            mean_sq.sqrt() as f32
        })
        .collect::<Vec<_>>();
    Some((frame_len, frame_rms))
}
