//! Attendance scheduling rules.
//!
//! Pure functions deciding when a grade's session opens and when an open session
//! is due for archiving. They take the current instant as an argument so the
//! database passes in `core::attendance` and the tests share the same rules.
//! All times are UTC and compared on the same calendar day, without wrapping
//! around midnight.

use crate::{
    entities::grade,
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc, Weekday};
use serde::Serialize;

/// Half-width of the window around a class or reset time, in seconds.
pub const GENERATION_WINDOW_SECS: i64 = 300;

/// Weekday tags as stored in `grades.weekdays`, Monday first.
pub const WEEKDAY_TAGS: [&str; 7] = [
    "MONDAY",
    "TUESDAY",
    "WEDNESDAY",
    "THURSDAY",
    "FRIDAY",
    "SATURDAY",
    "SUNDAY",
];

/// Why a grade's session was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationTrigger {
    /// Today is a class day and the class time is within the window
    ClassTime {
        /// Current weekday
        weekday: Weekday,
        /// The grade's class time
        class_time: NaiveTime,
    },
    /// The reset time is within the window
    ResetTime {
        /// The grade's reset time
        reset_time: NaiveTime,
    },
    /// Neither rule matched but the caller forced generation
    Forced,
}

/// Returns the tag for a weekday, e.g. `"MONDAY"`.
#[must_use]
pub fn weekday_tag(day: Weekday) -> &'static str {
    WEEKDAY_TAGS[day.num_days_from_monday() as usize]
}

/// Parses one weekday tag, ignoring case and surrounding whitespace.
#[must_use]
pub fn parse_weekday_tag(tag: &str) -> Option<Weekday> {
    let tag = tag.trim().to_ascii_uppercase();
    WEEKDAY_TAGS
        .iter()
        .position(|t| *t == tag)
        .and_then(|i| u8::try_from(i).ok())
        .and_then(|i| Weekday::try_from(i).ok())
}

/// Parses a comma-separated weekday list. Blank input yields an empty list and
/// duplicates are dropped.
///
/// # Errors
/// Returns a validation error naming the first unknown tag.
pub fn parse_weekdays(raw: &str) -> Result<Vec<Weekday>> {
    let mut days = Vec::new();
    for tag in raw.split(',').filter(|t| !t.trim().is_empty()) {
        let day = parse_weekday_tag(tag)
            .ok_or_else(|| Error::validation(format!("Unknown weekday: {}", tag.trim())))?;
        if !days.contains(&day) {
            days.push(day);
        }
    }
    Ok(days)
}

/// Formats weekdays in storage form, Monday first, e.g. `"MONDAY,FRIDAY"`.
#[must_use]
pub fn format_weekdays(days: &[Weekday]) -> String {
    let mut sorted = days.to_vec();
    sorted.sort_by_key(Weekday::num_days_from_monday);
    sorted.dedup();
    sorted
        .into_iter()
        .map(weekday_tag)
        .collect::<Vec<_>>()
        .join(",")
}

/// The grade's class days. Unknown tags are skipped; they are rejected when a
/// grade is created, so this only matters for hand-edited rows.
#[must_use]
pub fn scheduled_weekdays(grade: &grade::Model) -> Vec<Weekday> {
    grade
        .weekdays
        .split(',')
        .filter_map(parse_weekday_tag)
        .collect()
}

/// Whether `now` is within [`GENERATION_WINDOW_SECS`] of `target` on the same day.
#[must_use]
pub fn within_window(now: NaiveTime, target: NaiveTime) -> bool {
    (now - target).num_milliseconds().abs() <= GENERATION_WINDOW_SECS * 1000
}

/// Decides whether a session should open for `grade` at `now`.
///
/// The weekly schedule (weekdays plus class time) is checked first; the daily
/// reset time is the fallback. `force` opens a session regardless.
#[must_use]
pub fn generation_trigger(
    grade: &grade::Model,
    now: DateTime<Utc>,
    force: bool,
) -> Option<GenerationTrigger> {
    let time = now.time();
    let weekday = now.weekday();

    if let Some(class_time) = grade.class_time {
        let days = scheduled_weekdays(grade);
        if days.contains(&weekday) && within_window(time, class_time) {
            return Some(GenerationTrigger::ClassTime {
                weekday,
                class_time,
            });
        }
    }

    if within_window(time, grade.reset_time) {
        return Some(GenerationTrigger::ResetTime {
            reset_time: grade.reset_time,
        });
    }

    force.then_some(GenerationTrigger::Forced)
}

/// Whether a session whose oldest record was created at `opened_at` has run
/// for at least `lesson_duration_hours`.
#[must_use]
pub fn autosave_due(opened_at: DateTime<Utc>, now: DateTime<Utc>, lesson_duration_hours: i32) -> bool {
    now - opened_at >= TimeDelta::hours(i64::from(lesson_duration_hours))
}

/// Hours elapsed since `opened_at`, for logs and reports.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn elapsed_hours(opened_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - opened_at).num_seconds() as f64 / 3600.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::TimeZone;

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    // 2024-03-04 is a Monday
    fn monday_at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, h, m, s).unwrap()
    }

    fn tuesday_at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, h, m, s).unwrap()
    }

    fn grade(reset: NaiveTime, class_time: Option<NaiveTime>, weekdays: &str) -> grade::Model {
        grade::Model {
            id: 1,
            name: "Robotics".to_string(),
            reset_time: reset,
            class_time,
            lesson_duration: 2,
            weekdays: weekdays.to_string(),
        }
    }

    #[test]
    fn test_weekday_tags_round_trip_every_day() {
        for tag in WEEKDAY_TAGS {
            let day = parse_weekday_tag(tag).unwrap();
            assert_eq!(weekday_tag(day), tag);
        }
        assert_eq!(parse_weekday_tag(" monday "), Some(Weekday::Mon));
        assert_eq!(parse_weekday_tag("Funday"), None);
    }

    #[test]
    fn test_parse_weekdays() {
        assert_eq!(parse_weekdays("").unwrap(), Vec::<Weekday>::new());
        assert_eq!(
            parse_weekdays("MONDAY, wednesday,FRIDAY,MONDAY").unwrap(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
        assert!(matches!(
            parse_weekdays("MONDAY,NOPEDAY"),
            Err(Error::Validation { .. })
        ));
    }

    #[test]
    fn test_format_weekdays_orders_from_monday() {
        assert_eq!(
            format_weekdays(&[Weekday::Fri, Weekday::Mon, Weekday::Fri]),
            "MONDAY,FRIDAY"
        );
        assert_eq!(format_weekdays(&[]), "");
    }

    #[test]
    fn test_window_boundaries() {
        let target = time(10, 0, 0);
        assert!(within_window(time(10, 0, 0), target));
        assert!(within_window(time(10, 5, 0), target));
        assert!(within_window(time(9, 55, 0), target));
        assert!(!within_window(time(10, 5, 1), target));
        assert!(!within_window(time(9, 54, 59), target));
        let just_over = NaiveTime::from_hms_milli_opt(10, 5, 0, 500).unwrap();
        assert!(!within_window(just_over, target));
    }

    #[test]
    fn test_window_does_not_wrap_midnight() {
        assert!(!within_window(time(0, 1, 0), time(23, 59, 0)));
    }

    #[test]
    fn test_reset_time_only_grade() {
        let g = grade(time(10, 0, 0), None, "");

        // Sweep the whole day in one-minute steps: triggers exactly within 10:00 ± 5 min
        for minute in 0..(24 * 60) {
            let now = monday_at(minute / 60, minute % 60, 0);
            let expected = (i64::from(minute) - 600).abs() <= 5;
            assert_eq!(
                generation_trigger(&g, now, false).is_some(),
                expected,
                "minute {minute}"
            );
        }

        assert_eq!(
            generation_trigger(&g, monday_at(10, 3, 0), false),
            Some(GenerationTrigger::ResetTime {
                reset_time: time(10, 0, 0)
            })
        );
    }

    #[test]
    fn test_class_time_on_scheduled_day() {
        let g = grade(time(6, 0, 0), Some(time(14, 0, 0)), "MONDAY,WEDNESDAY");

        assert_eq!(
            generation_trigger(&g, monday_at(14, 4, 0), false),
            Some(GenerationTrigger::ClassTime {
                weekday: Weekday::Mon,
                class_time: time(14, 0, 0)
            })
        );
        assert!(generation_trigger(&g, monday_at(14, 6, 0), false).is_none());
    }

    #[test]
    fn test_class_time_sweep_over_a_week() {
        let g = grade(time(6, 0, 0), Some(time(14, 0, 0)), "MONDAY,WEDNESDAY");

        // 2024-03-04 through 2024-03-10 covers Monday to Sunday
        for day in 4..=10 {
            for minute in 0..(24 * 60) {
                let now = Utc
                    .with_ymd_and_hms(2024, 3, day, minute / 60, minute % 60, 0)
                    .unwrap();
                let class_day = matches!(now.weekday(), Weekday::Mon | Weekday::Wed);
                let expected = class_day && (i64::from(minute) - 14 * 60).abs() <= 5;
                let by_class_time = matches!(
                    generation_trigger(&g, now, false),
                    Some(GenerationTrigger::ClassTime { .. })
                );
                assert_eq!(by_class_time, expected, "day {day} minute {minute}");
            }
        }
    }

    #[test]
    fn test_class_time_ignored_on_other_days() {
        let g = grade(time(6, 0, 0), Some(time(14, 0, 0)), "MONDAY,WEDNESDAY");
        assert!(generation_trigger(&g, tuesday_at(14, 0, 0), false).is_none());
        // The reset time still applies on non-class days
        assert_eq!(
            generation_trigger(&g, tuesday_at(6, 2, 0), false),
            Some(GenerationTrigger::ResetTime {
                reset_time: time(6, 0, 0)
            })
        );
    }

    #[test]
    fn test_class_time_without_weekdays_falls_back_to_reset() {
        let g = grade(time(10, 0, 0), Some(time(14, 0, 0)), "");
        assert!(generation_trigger(&g, monday_at(14, 0, 0), false).is_none());
        assert!(generation_trigger(&g, monday_at(10, 0, 0), false).is_some());
    }

    #[test]
    fn test_force_bypasses_schedule() {
        let g = grade(time(10, 0, 0), None, "");
        assert_eq!(
            generation_trigger(&g, monday_at(18, 0, 0), true),
            Some(GenerationTrigger::Forced)
        );
        // A matching rule is still reported as the reason
        assert_eq!(
            generation_trigger(&g, monday_at(10, 0, 0), true),
            Some(GenerationTrigger::ResetTime {
                reset_time: time(10, 0, 0)
            })
        );
    }

    #[test]
    fn test_autosave_due() {
        let opened = monday_at(14, 0, 0);
        assert!(!autosave_due(opened, monday_at(15, 59, 59), 2));
        assert!(autosave_due(opened, monday_at(16, 0, 0), 2));
        assert!(autosave_due(opened, tuesday_at(9, 0, 0), 2));
    }

    #[test]
    fn test_elapsed_hours() {
        let opened = monday_at(14, 0, 0);
        let elapsed = elapsed_hours(opened, monday_at(15, 30, 0));
        assert!((elapsed - 1.5).abs() < f64::EPSILON);
    }
}
