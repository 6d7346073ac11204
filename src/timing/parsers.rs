//! Text to number conversions for timing export fields.
//!
//! None of these functions fail: text that does not match the expected grammar
//! yields `None`, which callers treat as "not usable for aggregation".

/// Clock-style duration `M:SS.fff` or `H:MM:SS.fff`. Minutes take 1-2 digits
/// on their own and exactly 2 after hours, seconds exactly 2 integer digits
/// and at least one fractional digit.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ClockTime {
    hours: u32,
    minutes: u32,
    seconds: f64,
}

impl ClockTime {
    fn parse(text: &str) -> Option<Self> {
        let parts: Vec<&str> = text.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [minutes, seconds] => (0, digits(minutes, 1, 2)?, *seconds),
            [hours, minutes, seconds] => (digits(hours, 1, 9)?, digits(minutes, 2, 2)?, *seconds),
            _ => return None,
        };

        let (whole, fraction) = seconds.split_once('.')?;
        digits(whole, 2, 2)?;
        digits(fraction, 1, usize::MAX)?;

        Some(Self {
            hours,
            minutes,
            seconds: seconds.parse().ok()?,
        })
    }

    fn total_seconds(&self) -> f64 {
        self.hours as f64 * 3600.0 + self.minutes as f64 * 60.0 + self.seconds
    }
}

/// Parses a run of ASCII digits whose length is within `min..=max`.
fn digits(text: &str, min: usize, max: usize) -> Option<u32> {
    let valid = (min..=max).contains(&text.len()) && text.bytes().all(|b| b.is_ascii_digit());
    if !valid {
        return None;
    }
    // fractional runs can be longer than a u32 holds, only their shape matters there
    text.get(..9).unwrap_or(text).parse().ok()
}

/// `98`, `98.5`: an unsigned decimal number without exponent or sign.
fn is_plain_decimal(text: &str) -> bool {
    match text.split_once('.') {
        Some((whole, fraction)) => digits(whole, 1, usize::MAX).is_some()
            && digits(fraction, 1, usize::MAX).is_some(),
        None => digits(text, 1, usize::MAX).is_some(),
    }
}

/// Lap time text to seconds. Accepts `M:SS.fff` and `H:MM:SS.fff`, falling
/// back to a bare decimal number of seconds.
pub fn parse_lap_time(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Some(clock) = ClockTime::parse(text) {
        return Some(clock.total_seconds());
    }
    if is_plain_decimal(text) {
        return text.parse().ok();
    }
    None
}

/// Elapsed session time text (`[H:]MM:SS.fff`) to fractional hours.
pub fn parse_elapsed(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    ClockTime::parse(text).map(|clock| clock.total_seconds() / 3600.0)
}

/// Top speed text to a number. Non numeric, empty or non finite values are missing.
pub fn parse_speed(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|speed| speed.is_finite())
}

/// Lap counter text to an integer. Accepts `12` and spreadsheet style `12.0`.
pub fn parse_lap_number(text: &str) -> Option<u32> {
    let text = text.trim();
    let whole = match text.split_once('.') {
        Some((whole, fraction)) if !fraction.is_empty() && fraction.bytes().all(|b| b == b'0') => {
            whole
        }
        Some(_) => return None,
        None => text,
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    whole.parse().ok()
}

/// Formats seconds as `M:SS.mmm` with unpadded minutes, e.g. `1:38.452`.
pub fn format_lap_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let remainder = total_ms % 60_000;
    format!("{}:{:02}.{:03}", minutes, remainder / 1000, remainder % 1000)
}

/// Formats a speed with one decimal.
pub fn format_speed(speed: f64) -> String {
    format!("{:.1}", speed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a parsed value");
        assert!(
            (actual - expected).abs() < 1e-9,
            "{} is not {}",
            actual,
            expected
        );
    }

    #[test]
    fn test_parse_lap_time_minutes() {
        assert_close(parse_lap_time("2:08.976"), 128.976);
        assert_close(parse_lap_time("0:59.1"), 59.1);
        assert_close(parse_lap_time(" 12:00.000 "), 720.0);
    }

    #[test]
    fn test_parse_lap_time_hours() {
        assert_close(parse_lap_time("1:02:03.500"), 3723.5);
        assert_eq!(parse_lap_time("1:2:03.500"), None);
        assert_eq!(parse_elapsed("5:7:03.500"), None);
    }

    #[test]
    fn test_parse_lap_time_decimal_fallback() {
        assert_close(parse_lap_time("98.5"), 98.5);
        assert_close(parse_lap_time("101"), 101.0);
    }

    #[test]
    fn test_parse_lap_time_rejects_garbage() {
        assert_eq!(parse_lap_time(""), None);
        assert_eq!(parse_lap_time("   "), None);
        assert_eq!(parse_lap_time("garbage"), None);
        assert_eq!(parse_lap_time("1:8.976"), None);
        assert_eq!(parse_lap_time("1:08"), None);
        assert_eq!(parse_lap_time("123:08.976"), None);
        assert_eq!(parse_lap_time("1:08.976x"), None);
        assert_eq!(parse_lap_time("-5"), None);
        assert_eq!(parse_lap_time("1e2"), None);
        assert_eq!(parse_lap_time("inf"), None);
    }

    #[test]
    fn test_parse_elapsed() {
        assert_close(parse_elapsed("0:45:12.000"), 45.0 / 60.0 + 12.0 / 3600.0);
        assert_close(parse_elapsed("45:12.000"), 45.0 / 60.0 + 12.0 / 3600.0);
        assert_close(parse_elapsed("23:59:59.999"), 23.0 + 59.0 / 60.0 + 59.999 / 3600.0);
        assert_eq!(parse_elapsed(""), None);
        assert_eq!(parse_elapsed("12.5"), None);
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("312.4"), Some(312.4));
        assert_eq!(parse_speed(" 298 "), Some(298.0));
        assert_eq!(parse_speed(""), None);
        assert_eq!(parse_speed("abc"), None);
        assert_eq!(parse_speed("NaN"), None);
    }

    #[test]
    fn test_parse_lap_number() {
        assert_eq!(parse_lap_number("12"), Some(12));
        assert_eq!(parse_lap_number("12.0"), Some(12));
        assert_eq!(parse_lap_number("12.5"), None);
        assert_eq!(parse_lap_number("-1"), None);
        assert_eq!(parse_lap_number(""), None);
        assert_eq!(parse_lap_number("lap"), None);
    }

    #[test]
    fn test_format_lap_time() {
        assert_eq!(format_lap_time(98.452), "1:38.452");
        assert_eq!(format_lap_time(100.0), "1:40.000");
        assert_eq!(format_lap_time(5.25), "0:05.250");
        // rounding carries into the minute instead of printing 60 seconds
        assert_eq!(format_lap_time(119.9996), "2:00.000");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(312.46), "312.5");
        assert_eq!(format_speed(300.0), "300.0");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_minute_lap_times_round_trip(
            minutes in 0u32..100,
            seconds in 0u32..60,
            millis in 0u32..1000,
        ) {
            let text = format!("{}:{:02}.{:03}", minutes, seconds, millis);
            let parsed = parse_lap_time(&text).unwrap();
            let reparsed = parse_lap_time(&format_lap_time(parsed)).unwrap();
            prop_assert!((parsed - reparsed).abs() < 1e-6);
        }

        #[test]
        fn prop_hour_lap_times_round_trip(
            minutes in 0u32..40,
            seconds in 0u32..60,
            millis in 0u32..1000,
        ) {
            let text = format!("1:{:02}:{:02}.{:03}", minutes, seconds, millis);
            let parsed = parse_lap_time(&text).unwrap();
            let reparsed = parse_lap_time(&format_lap_time(parsed)).unwrap();
            prop_assert!((parsed - reparsed).abs() < 1e-6);
        }

        #[test]
        fn prop_parsers_never_panic(text in "\\PC*") {
            let _ = parse_lap_time(&text);
            let _ = parse_elapsed(&text);
            let _ = parse_speed(&text);
            let _ = parse_lap_number(&text);
        }
    }
}
