//! Human-readable sizes, rates and durations.

/// qBittorrent's sentinel for "no estimate".
pub const ETA_INFINITY: i64 = 8_640_000;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

pub fn format_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{:.1} {}", size, unit);
        }
        size /= 1024.0;
    }
    format!("{:.1} PB", size)
}

pub fn format_speed(bytes_per_sec: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec))
}

pub fn format_eta(seconds: i64) -> String {
    if seconds < 0 || seconds == ETA_INFINITY {
        return "∞".to_string();
    }
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    if seconds < 3600 {
        return format!("{}m {}s", seconds / 60, seconds % 60);
    }
    format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
}

/// `h:mm:ss` above an hour, `m:ss` below. Negative input renders as `0:00`.
pub fn format_timestamp(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return "0:00".to_string();
    }
    let s = secs as u64;
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let s = s % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_step_through_units() {
        assert_eq!(format_bytes(0), "0.0 B");
        assert_eq!(format_bytes(1023), "1023.0 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.0 GB");
        assert_eq!(format_bytes(u64::MAX), "16384.0 PB");
    }

    #[test]
    fn speed_appends_per_second() {
        assert_eq!(format_speed(2048), "2.0 KB/s");
    }

    #[test]
    fn eta_buckets() {
        assert_eq!(format_eta(-1), "∞");
        assert_eq!(format_eta(ETA_INFINITY), "∞");
        assert_eq!(format_eta(42), "42s");
        assert_eq!(format_eta(125), "2m 5s");
        assert_eq!(format_eta(3 * 3600 + 7 * 60 + 9), "3h 7m");
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(-4.0), "0:00");
        assert_eq!(format_timestamp(120.9), "2:00");
        assert_eq!(format_timestamp(3725.0), "1:02:05");
    }
}
