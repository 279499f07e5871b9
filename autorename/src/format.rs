//! Human-readable sizes and durations for captions and progress text.

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Render a byte count with a binary unit, e.g. `1.5 KB`. Zero renders empty.
pub fn human_bytes(size: u64) -> String {
    if size == 0 {
        return String::new();
    }
    human_bytes_f64(size as f64)
}

/// Like [`human_bytes`] for fractional values such as transfer speeds.
pub fn human_bytes_f64(size: f64) -> String {
    let mut value = size;
    let mut unit = 0;
    while value > 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{} {}", trim_decimals(value), SIZE_UNITS[unit])
}

fn trim_decimals(value: f64) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// `H:MM:SS`, wrapping at one day.
pub fn format_duration(seconds: u64) -> String {
    let seconds = seconds % (24 * 3600);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours}:{minutes:02}:{secs:02}")
}

/// `1d, 2h, 3m, 4s, 5ms` with zero components omitted. Zero renders empty.
pub fn format_elapsed(milliseconds: u64) -> String {
    let (seconds, ms) = (milliseconds / 1000, milliseconds % 1000);
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    let (days, hours) = (hours / 24, hours % 24);

    [(days, "d"), (hours, "h"), (minutes, "m"), (seconds, "s"), (ms, "ms")]
        .iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(0), "");
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(1024), "1024 B");
        assert_eq!(human_bytes(1536), "1.5 KB");
        assert_eq!(human_bytes(2 * 1024 * 1024), "2 MB");
        assert_eq!(human_bytes(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00:00");
        assert_eq!(format_duration(61), "0:01:01");
        assert_eq!(format_duration(3 * 3600 + 25 * 60 + 7), "3:25:07");
        assert_eq!(format_duration(24 * 3600 + 5), "0:00:05");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "");
        assert_eq!(format_elapsed(1500), "1s, 500ms");
        assert_eq!(format_elapsed(3_600_000 + 2_000), "1h, 2s");
        assert_eq!(
            format_elapsed(86_400_000 + 7_200_000 + 180_000 + 4_000 + 5),
            "1d, 2h, 3m, 4s, 5ms"
        );
    }
}
