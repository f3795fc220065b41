use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TIME_PART: Regex = Regex::new(r"(?i)(\d+)\s*([a-zµμ]+)").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
}

impl TimeUnit {
    /// Looks a unit up by any of its names, ignoring case.
    pub fn from_name(name: &str) -> Option<TimeUnit> {
        let unit = match name.to_lowercase().as_str() {
            "ns" | "nanosecond" | "nanoseconds" => TimeUnit::Nanoseconds,
            "us" | "µs" | "μs" | "microsecond" | "microseconds" => TimeUnit::Microseconds,
            "ms" | "millisecond" | "milliseconds" => TimeUnit::Milliseconds,
            "s" | "second" | "seconds" => TimeUnit::Seconds,
            "m" | "minute" | "minutes" => TimeUnit::Minutes,
            "h" | "hour" | "hours" => TimeUnit::Hours,
            "d" | "day" | "days" => TimeUnit::Days,
            "w" | "week" | "weeks" => TimeUnit::Weeks,
            _ => return None,
        };
        Some(unit)
    }

    pub fn millis(self) -> f64 {
        match self {
            TimeUnit::Nanoseconds  => 1e-6,
            TimeUnit::Microseconds => 1e-3,
            TimeUnit::Milliseconds => 1.0,
            TimeUnit::Seconds      => 1_000.0,
            TimeUnit::Minutes      => 60_000.0,
            TimeUnit::Hours        => 3_600_000.0,
            TimeUnit::Days         => 86_400_000.0,
            TimeUnit::Weeks        => 604_800_000.0,
        }
    }
}

/// Evaluates a duration such as `"1h 30m"` and expresses it in `unit`.
pub fn timespan(expression: &str, unit: TimeUnit) -> Result<f64, String> {
    let mut millis = 0.0;
    for part in TIME_PART.captures_iter(expression) {
        let amount: f64 = part[1]
            .parse()
            .map_err(|_| format!("Invalid amount {} in expression {}", &part[1], expression))?;
        let part_unit = TimeUnit::from_name(&part[2])
            .ok_or_else(|| format!("Unknown unit: {} in expression {}", &part[2], expression))?;
        millis += amount * part_unit.millis();
    }
    Ok(millis / unit.millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timespan() {
        assert_eq!(timespan("1h 30m", TimeUnit::Milliseconds), Ok(5_400_000.0));
        assert_eq!(timespan("1m30s", TimeUnit::Seconds), Ok(90.0));
        assert_eq!(timespan("2 WEEKS", TimeUnit::Days), Ok(14.0));
        assert_eq!(timespan("500ms", TimeUnit::Microseconds), Ok(500_000.0));
        assert_eq!(timespan("", TimeUnit::Seconds), Ok(0.0));
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(
            timespan("3 fortnights", TimeUnit::Milliseconds),
            Err("Unknown unit: fortnights in expression 3 fortnights".to_owned())
        );
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(TimeUnit::from_name("SECONDS"), Some(TimeUnit::Seconds));
        assert_eq!(TimeUnit::from_name("µs"), Some(TimeUnit::Microseconds));
        assert_eq!(TimeUnit::from_name("M"), Some(TimeUnit::Minutes));
        assert_eq!(TimeUnit::from_name("fortnight"), None);
    }
}
