use std::thread;
use std::time::Duration;

use chrono::{Local, Utc};

/// Milliseconds since the unix epoch
pub fn time_in_milliseconds() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

/// Local wall clock time as `HH:MM:SS.mmm`
pub fn time_string() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleeping_advances_time() {
        let before = time_in_milliseconds();
        sleep_ms(20);
        let after = time_in_milliseconds();
        assert!(after >= before + 20);
    }

    #[test]
    fn time_string_format() {
        let time = time_string();
        assert_eq!(time.len(), 12);

        let bytes = time.as_bytes();
        assert_eq!(bytes[2], b':');
        assert_eq!(bytes[5], b':');
        assert_eq!(bytes[8], b'.');
        assert!(time
            .chars()
            .enumerate()
            .filter(|(i, _)| ![2, 5, 8].contains(i))
            .all(|(_, c)| c.is_ascii_digit()));
    }
}
