//! Human-readable durations for reports.

/// Format a segment travel time given in seconds: `"2m 5s"`, or `"45s"` under a minute.
pub fn format_travel_time(seconds: u32) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Format a route travel time given in minutes: `"1h 25m"` from an hour up, else `"15 min"`.
pub fn format_route_time(minutes: f64) -> String {
    if minutes >= 60.0 {
        let hours = (minutes / 60.0).floor();
        let mins = (minutes % 60.0).round();
        format!("{}h {}m", hours as u64, mins as u64)
    } else {
        format!("{} min", minutes.round() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_time() {
        assert_eq!(format_travel_time(0), "0s");
        assert_eq!(format_travel_time(45), "45s");
        assert_eq!(format_travel_time(125), "2m 5s");
    }

    #[test]
    fn test_route_time() {
        assert_eq!(format_route_time(14.796), "15 min");
        assert_eq!(format_route_time(0.0), "0 min");
        assert_eq!(format_route_time(85.0), "1h 25m");
    }
}
