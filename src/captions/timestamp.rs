use crate::errors::CaptionError;

const CENTI_EPSILON: f64 = 1e-6;

/// Format seconds as an ASS timestamp (`H:MM:SS.CC`)
///
/// Every unit is truncated, never rounded, so `1.999` becomes `0:00:01.99`.
/// Hours are not padded and have no upper bound.
pub fn format_ass_timestamp(seconds: f64) -> Result<String, CaptionError> {
    if !seconds.is_finite() {
        return Err(CaptionError::NonFiniteTime(seconds));
    }
    if seconds < 0.0 {
        return Err(CaptionError::NegativeTime(seconds));
    }

    // Whisper times like 2.30 sit a hair below the exact hundredth in binary
    let total_centis = (seconds * 100.0 + CENTI_EPSILON).floor() as u64;
    let hours = total_centis / 360_000;
    let minutes = (total_centis % 360_000) / 6_000;
    let secs = (total_centis % 6_000) / 100;
    let centis = total_centis % 100;

    Ok(format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis))
}
