/// Render a duration as `H:MM:SS`, or `M:SS` under an hour. Sub-second
/// precision is dropped.
pub fn format_duration(ms: u64) -> String {
    let seconds = ms / 1_000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes % 60, seconds % 60)
    } else {
        format!("{}:{:02}", minutes, seconds % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(format_duration(3_661_000), "1:01:01");
        assert_eq!(format_duration(36_000_000), "10:00:00");
    }

    #[test]
    fn formats_minutes_and_seconds_under_an_hour() {
        assert_eq!(format_duration(59_000), "0:59");
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(605_000), "10:05");
        assert_eq!(format_duration(3_599_999), "59:59");
    }

    #[test]
    fn floors_sub_second_precision() {
        assert_eq!(format_duration(999), "0:00");
        assert_eq!(format_duration(61_999), "1:01");
    }
}
