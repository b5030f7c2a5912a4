//! Time formatting helpers.

use shiptrack_types::Timestamp;

/// Format a duration in seconds to a human-readable string.
pub fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

/// Seconds between pickup and delivery, or `None` while undelivered.
pub fn transit_secs(pickup: Timestamp, delivery: Timestamp) -> Option<u64> {
    if delivery.is_unset() {
        None
    } else {
        Some(pickup.elapsed_since(delivery))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_each_magnitude() {
        assert_eq!(format_duration(42), "42s");
        assert_eq!(format_duration(125), "2m 5s");
        assert_eq!(format_duration(7_500), "2h 5m");
        assert_eq!(format_duration(90_000), "1d 1h");
    }

    #[test]
    fn transit_is_unknown_until_delivered() {
        assert_eq!(transit_secs(Timestamp::new(100), Timestamp::EPOCH), None);
        assert_eq!(transit_secs(Timestamp::new(100), Timestamp::new(160)), Some(60));
        // Delivery recorded before the declared pickup time.
        assert_eq!(transit_secs(Timestamp::new(100), Timestamp::new(40)), Some(0));
    }
}
