//! Parsing of duration and count arguments

use std::time::Duration;

use reprise_core::units::{micros, MICROS_PER_MILLISECOND, MICROS_PER_SECOND};

/// Time limit given on the command line; `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimit(pub Option<Duration>);

/// Attempt limit given on the command line; `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptLimit(pub Option<u32>);

/// Parse a duration such as `250ms`, `2s`, `1m` or `1500` (microseconds)
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (digits, unit) = input.split_at(split);

    if digits.is_empty() {
        return Err(format!("invalid duration '{}'", input));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("duration out of range: '{}'", input))?;

    let factor = match unit.trim() {
        "" | "us" => 1,
        "ms" => MICROS_PER_MILLISECOND,
        "s" => MICROS_PER_SECOND,
        "m" => 60 * MICROS_PER_SECOND,
        other => {
            return Err(format!(
                "unknown duration unit '{}' (expected us, ms, s or m)",
                other
            ))
        }
    };

    value
        .checked_mul(factor)
        .map(micros)
        .ok_or_else(|| format!("duration out of range: '{}'", input))
}

/// Parse a time limit; `-1` means unbounded
pub fn parse_time_limit(input: &str) -> Result<TimeLimit, String> {
    if input.trim() == "-1" {
        return Ok(TimeLimit(None));
    }
    parse_duration(input).map(|d| TimeLimit(Some(d)))
}

/// Parse an attempt limit; `-1` means unbounded, zero is rejected
pub fn parse_attempt_limit(input: &str) -> Result<AttemptLimit, String> {
    match input.trim() {
        "-1" => Ok(AttemptLimit(None)),
        value => match value.parse::<u32>() {
            Ok(0) => Err("max attempts must be at least 1".to_string()),
            Ok(n) => Ok(AttemptLimit(Some(n))),
            Err(_) => Err(format!("invalid attempt count '{}'", value)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("1500").unwrap(), Duration::from_micros(1500));
        assert_eq!(parse_duration("15us").unwrap(), Duration::from_micros(15));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("-5ms").is_err());
        assert!(parse_duration("1.5s").is_err());
    }

    #[test]
    fn test_parse_time_limit() {
        assert_eq!(parse_time_limit("-1").unwrap(), TimeLimit(None));
        assert_eq!(
            parse_time_limit("5s").unwrap(),
            TimeLimit(Some(Duration::from_secs(5)))
        );
    }

    #[test]
    fn test_parse_attempt_limit() {
        assert_eq!(parse_attempt_limit("-1").unwrap(), AttemptLimit(None));
        assert_eq!(parse_attempt_limit("3").unwrap(), AttemptLimit(Some(3)));
        assert!(parse_attempt_limit("0").is_err());
        assert!(parse_attempt_limit("-2").is_err());
        assert!(parse_attempt_limit("many").is_err());
    }
}
