//! Declarative per-station field transforms.
//!
//! Stations whose exports need field fix-ups carry an ordered list of
//! [`Transform`]s in their configuration. The extractor applies them after
//! splitting a line into fields and before the router formats the output.
//!
//! A transform that refers to a field index the line does not have is a
//! no-op, so short or malformed lines pass through untouched.

use serde::Deserialize;

/// Seconds in one day.
const SECONDS_PER_DAY: i64 = 86_400;

/// Default overflow threshold: durations at or above this many minutes are
/// assumed to have had a day added when the track spanned midnight.
pub const DEFAULT_OVERFLOW_THRESHOLD_MINUTES: i64 = 1400;

fn default_threshold() -> i64 {
    DEFAULT_OVERFLOW_THRESHOLD_MINUTES
}

/// A single named field transformation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transform {
    /// Normalise a date field to `DD-MM-YYYY`.
    FormatDate { field: usize },
    /// Rewrite a six digit `HHMMSS` field as `HH:MM:SS`.
    FormatTime { field: usize },
    /// Undo the midnight overflow some stations add to `MM:SS` durations.
    FixDurationOverflow {
        field: usize,
        #[serde(default = "default_threshold")]
        threshold_minutes: i64,
    },
    /// Split a combined `date time` field into two adjacent fields.
    SplitDateTime { field: usize },
    /// Replace a field with `HH:MM:SS` built from six digits at `offset`.
    ClockFromDigits { field: usize, offset: usize },
}

impl Transform {
    /// Name shown in station listings.
    pub fn name(&self) -> &'static str {
        match self {
            Transform::FormatDate { .. } => "format_date",
            Transform::FormatTime { .. } => "format_time",
            Transform::FixDurationOverflow { .. } => "fix_duration_overflow",
            Transform::SplitDateTime { .. } => "split_date_time",
            Transform::ClockFromDigits { .. } => "clock_from_digits",
        }
    }

    /// Apply this transform to `fields` in place.
    pub fn apply(&self, fields: &mut Vec<String>) {
        match self {
            Transform::FormatDate { field } => {
                if let Some(value) = fields.get_mut(*field) {
                    *value = format_date(value);
                }
            }
            Transform::FormatTime { field } => {
                if let Some(value) = fields.get_mut(*field) {
                    *value = format_time(value);
                }
            }
            Transform::FixDurationOverflow {
                field,
                threshold_minutes,
            } => {
                if let Some(value) = fields.get_mut(*field) {
                    *value = fix_duration_overflow(value, *threshold_minutes);
                }
            }
            Transform::SplitDateTime { field } => {
                if *field < fields.len() {
                    let (date, time) = split_date_time(&fields[*field]);
                    fields[*field] = date;
                    fields.insert(*field + 1, time);
                }
            }
            Transform::ClockFromDigits { field, offset } => {
                if let Some(value) = fields.get_mut(*field)
                    && let Some(clock) = clock_from_digits(value, *offset)
                {
                    *value = clock;
                }
            }
        }
    }
}

/// Apply every transform in order.
pub fn apply_all(transforms: &[Transform], fields: &mut Vec<String>) {
    for transform in transforms {
        transform.apply(fields);
    }
}

fn all_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// Normalise a date to `DD-MM-YYYY`.
///
/// Accepts `YYMMDD`, `DDMMYYYY`, `YYYY-MM-DD` and `DD.MM.YYYY`. Anything
/// else is returned trimmed but otherwise unchanged.
pub fn format_date(date: &str) -> String {
    let date = date.trim();
    let bytes = date.as_bytes();

    if date.len() == 6 && all_digits(date) {
        let (yy, mm, dd) = (&date[0..2], &date[2..4], &date[4..6]);
        let century = if yy < "50" { "20" } else { "19" };
        return format!("{dd}-{mm}-{century}{yy}");
    }

    if date.len() == 8 && all_digits(date) {
        return format!("{}-{}-{}", &date[0..2], &date[2..4], &date[4..8]);
    }

    if date.len() == 10 && bytes[4] == b'-' && bytes[7] == b'-' {
        let parts: Vec<&str> = date.split('-').collect();
        if parts.len() == 3 && parts[0].len() == 4 {
            return format!("{}-{}-{}", parts[2], parts[1], parts[0]);
        }
    }

    if date.len() == 10 && bytes[2] == b'.' && bytes[5] == b'.' {
        return date.replace('.', "-");
    }

    date.to_string()
}

/// Rewrite six ASCII digits `HHMMSS` as `HH:MM:SS`.
pub fn format_time(time: &str) -> String {
    if time.len() == 6 && all_digits(time) {
        format!("{}:{}:{}", &time[0..2], &time[2..4], &time[4..6])
    } else {
        time.to_string()
    }
}

/// Correct an `MM:SS` duration that overflowed past midnight.
///
/// Durations with at least `threshold_minutes` minutes are replaced by
/// `one day - duration`. Unparsable values, values too large to compute
/// with and corrections that would go negative are returned unchanged.
pub fn fix_duration_overflow(duration: &str, threshold_minutes: i64) -> String {
    let mut parts = duration.split(':');
    let (Some(minutes), Some(seconds)) = (parts.next(), parts.next()) else {
        return duration.to_string();
    };
    let (Ok(minutes), Ok(seconds)) = (
        minutes.trim().parse::<i64>(),
        seconds.trim().parse::<i64>(),
    ) else {
        return duration.to_string();
    };

    if minutes < threshold_minutes {
        return duration.to_string();
    }

    let Some(corrected) = minutes
        .checked_mul(60)
        .and_then(|total| total.checked_add(seconds))
        .and_then(|total| SECONDS_PER_DAY.checked_sub(total))
        .filter(|corrected| *corrected >= 0)
    else {
        return duration.to_string();
    };

    tracing::debug!(
        "duration overflow fixed: {duration} -> {:02}:{:02}",
        corrected / 60,
        corrected % 60
    );
    format!("{:02}:{:02}", corrected / 60, corrected % 60)
}

/// Split `date time` on the first whitespace run.
///
/// A value without whitespace yields an empty time so the field count
/// stays the same for every line.
pub fn split_date_time(value: &str) -> (String, String) {
    let value = value.trim();
    match value.split_once(char::is_whitespace) {
        Some((date, time)) => (date.to_string(), time.trim().to_string()),
        None => (value.to_string(), String::new()),
    }
}

/// Build `HH:MM:SS` from the six codepoints at `offset`, if all are digits.
pub fn clock_from_digits(value: &str, offset: usize) -> Option<String> {
    let digits: String = value.chars().skip(offset).take(6).collect();
    if digits.chars().count() == 6 && all_digits(&digits) {
        Some(format_time(&digits))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_format_date_variants() {
        assert_eq!(format_date("251001"), "01-10-2025");
        assert_eq!(format_date("991231"), "31-12-1999");
        assert_eq!(format_date("01102025"), "01-10-2025");
        assert_eq!(format_date("2025-10-01"), "01-10-2025");
        assert_eq!(format_date("01.10.2025"), "01-10-2025");
        assert_eq!(format_date("01-10-2025"), "01-10-2025");
        assert_eq!(format_date("  251001 "), "01-10-2025");
    }

    #[test]
    fn test_format_date_leaves_unknown_alone() {
        assert_eq!(format_date("yesterday"), "yesterday");
        assert_eq!(format_date("æøå-12-345"), "æøå-12-345");
        assert_eq!(format_date(""), "");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time("103000"), "10:30:00");
        assert_eq!(format_time("10:30:00"), "10:30:00");
        assert_eq!(format_time("10300"), "10300");
        assert_eq!(format_time("1030ab"), "1030ab");
    }

    #[test]
    fn test_fix_duration_overflow() {
        // 1437:30 is 2 minutes 30 seconds short of a full day
        assert_eq!(fix_duration_overflow("1437:30", 1400), "02:30");
        assert_eq!(fix_duration_overflow("03:45", 1400), "03:45");
        assert_eq!(fix_duration_overflow("abc", 1400), "abc");
        assert_eq!(fix_duration_overflow("xx:10", 1400), "xx:10");
        // Would go negative
        assert_eq!(fix_duration_overflow("1500:00", 1400), "1500:00");
    }

    #[test]
    fn test_fix_duration_overflow_huge_values_unchanged() {
        assert_eq!(
            fix_duration_overflow("999999999999999999:00", 1400),
            "999999999999999999:00"
        );
        assert_eq!(
            fix_duration_overflow("1440:9223372036854775807", 1400),
            "1440:9223372036854775807"
        );
        assert_eq!(
            fix_duration_overflow("-9223372036854775808:00", i64::MIN),
            "-9223372036854775808:00"
        );
    }

    #[test]
    fn test_split_date_time() {
        assert_eq!(
            split_date_time("01-10-2025 10:00:00"),
            ("01-10-2025".to_string(), "10:00:00".to_string())
        );
        assert_eq!(
            split_date_time("01-10-2025"),
            ("01-10-2025".to_string(), String::new())
        );
    }

    #[test]
    fn test_clock_from_digits() {
        assert_eq!(
            clock_from_digits("ID20251001103000", 10),
            Some("10:30:00".to_string())
        );
        assert_eq!(clock_from_digits("short", 2), None);
        assert_eq!(clock_from_digits("ab12x456", 2), None);
    }

    #[test]
    fn test_split_date_time_keeps_order() {
        let mut row = fields(&["01-10-2025 10:00:00", "Title", "Artist"]);
        Transform::SplitDateTime { field: 0 }.apply(&mut row);
        assert_eq!(row, fields(&["01-10-2025", "10:00:00", "Title", "Artist"]));
    }

    #[test]
    fn test_out_of_range_field_is_noop() {
        let mut row = fields(&["only"]);
        let before = row.clone();
        apply_all(
            &[
                Transform::FormatDate { field: 3 },
                Transform::SplitDateTime { field: 5 },
                Transform::ClockFromDigits {
                    field: 2,
                    offset: 0,
                },
            ],
            &mut row,
        );
        assert_eq!(row, before);
    }

    #[test]
    fn test_apply_all_in_order() {
        let mut row = fields(&["251001", "103000", "1437:30"]);
        apply_all(
            &[
                Transform::FormatDate { field: 0 },
                Transform::FormatTime { field: 1 },
                Transform::FixDurationOverflow {
                    field: 2,
                    threshold_minutes: DEFAULT_OVERFLOW_THRESHOLD_MINUTES,
                },
            ],
            &mut row,
        );
        assert_eq!(row, fields(&["01-10-2025", "10:30:00", "02:30"]));
    }

    #[test]
    fn test_deserialize_transforms() {
        let yaml = r#"
- kind: format_date
  field: 0
- kind: fix_duration_overflow
  field: 2
- kind: clock_from_digits
  field: 4
  offset: 8
"#;
        let transforms: Vec<Transform> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(transforms.len(), 3);
        assert_eq!(
            transforms[1],
            Transform::FixDurationOverflow {
                field: 2,
                threshold_minutes: 1400
            }
        );
        assert_eq!(transforms[2].name(), "clock_from_digits");
    }
}
