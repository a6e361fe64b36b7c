use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Wall-clock seconds since the Unix epoch
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_monotonic_enough() {
        let first = unix_timestamp();
        let second = unix_timestamp();
        assert!(first > 1_600_000_000);
        assert!(second >= first);
    }
}
