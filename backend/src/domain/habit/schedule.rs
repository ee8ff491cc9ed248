//! Habit recurrence schedules.
//!
//! A schedule is stored as the text the user supplied and parsed into a
//! [`Cadence`]: the calendar period streaks are measured in and, optionally,
//! how many completions that period demands. Accepted forms:
//!
//! - `daily`, `every day`, `weekly`, `every week`, `monthly`, `every month`
//! - `N times per week`, `N times a day`, `Nx weekly`, `N/week`
//! - five-field cron: `m h * * *` (daily), `m h * * 1,3,5` (weekly, one
//!   completion per listed day), `m h D * *` (monthly)

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Schedule applied when a habit is created without one.
pub const DEFAULT_SCHEDULE: &str = "0 9 * * *";

/// Calendar window a streak is counted in. All windows are evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Day,
    /// ISO week starting on Monday.
    Week,
    Month,
}

impl Period {
    /// Monotonic index of the period containing `at`; consecutive periods
    /// differ by exactly one.
    pub fn index(self, at: DateTime<Utc>) -> i64 {
        let date = at.date_naive();
        match self {
            Self::Day => i64::from(date.num_days_from_ce()),
            Self::Week => {
                let monday = i64::from(date.num_days_from_ce())
                    - i64::from(date.weekday().num_days_from_monday());
                monday.div_euclid(7)
            }
            Self::Month => i64::from(date.year()) * 12 + i64::from(date.month0()),
        }
    }
}

/// Parsed meaning of a schedule expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub period: Period,
    /// Completions demanded per period when the expression names a count.
    pub required: Option<u32>,
}

impl Cadence {
    /// Completions needed per period, preferring the schedule's own count.
    pub fn required_per_period(&self, target_count: u32) -> u32 {
        self.required.unwrap_or(target_count).max(1)
    }
}

/// Errors raised while parsing a schedule expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleParseError {
    #[error("unrecognised schedule expression: {expression}")]
    Unrecognised { expression: String },
    #[error("schedule count must be at least 1: {expression}")]
    ZeroCount { expression: String },
}

/// A habit's recurrence expression and its parsed cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Schedule {
    expression: String,
    cadence: Cadence,
}

impl Schedule {
    /// Parse a schedule expression.
    ///
    /// # Examples
    /// ```
    /// use mandalart::domain::{Period, Schedule};
    ///
    /// let schedule = Schedule::parse("3 times per week").expect("valid schedule");
    /// assert_eq!(schedule.cadence().period, Period::Week);
    /// assert_eq!(schedule.cadence().required, Some(3));
    /// ```
    pub fn parse(expression: &str) -> Result<Self, ScheduleParseError> {
        let trimmed = expression.trim();
        let cadence = if trimmed.is_empty() {
            Cadence {
                period: Period::Day,
                required: None,
            }
        } else {
            parse_cadence(trimmed)?
        };
        Ok(Self {
            expression: trimmed.to_owned(),
            cadence,
        })
    }

    pub fn expression(&self) -> &str {
        self.expression.as_str()
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            expression: DEFAULT_SCHEDULE.to_owned(),
            cadence: Cadence {
                period: Period::Day,
                required: None,
            },
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

impl TryFrom<String> for Schedule {
    type Error = ScheduleParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Schedule> for String {
    fn from(value: Schedule) -> Self {
        value.expression
    }
}

fn unrecognised(expression: &str) -> ScheduleParseError {
    ScheduleParseError::Unrecognised {
        expression: expression.to_owned(),
    }
}

fn parse_cadence(expression: &str) -> Result<Cadence, ScheduleParseError> {
    let lowered = expression.to_ascii_lowercase();
    let fields: Vec<&str> = lowered.split_whitespace().collect();

    if let [period] = fields.as_slice() {
        if let Some(period) = period_word(period) {
            return Ok(Cadence {
                period,
                required: None,
            });
        }
        if let Some((count, period)) = period.split_once('/') {
            return counted(expression, count, &[period]);
        }
    }
    if let ["every", period] = fields.as_slice() {
        return period_word(period)
            .map(|period| Cadence {
                period,
                required: None,
            })
            .ok_or_else(|| unrecognised(expression));
    }
    if let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() {
        if is_cron_time(minute) && is_cron_time(hour) {
            return parse_cron(expression, day_of_month, month, day_of_week);
        }
    }
    if let [count, rest @ ..] = fields.as_slice() {
        return counted(expression, count, rest);
    }
    Err(unrecognised(expression))
}

fn period_word(word: &str) -> Option<Period> {
    match word {
        "day" | "daily" | "everyday" => Some(Period::Day),
        "week" | "weekly" | "wk" => Some(Period::Week),
        "month" | "monthly" => Some(Period::Month),
        _ => None,
    }
}

/// Parse `N [times|x] [per|a|every] <period>` style expressions.
fn counted(expression: &str, count: &str, rest: &[&str]) -> Result<Cadence, ScheduleParseError> {
    let digits = count.strip_suffix('x').unwrap_or(count);
    let required: u32 = digits.parse().map_err(|_| unrecognised(expression))?;
    if required == 0 {
        return Err(ScheduleParseError::ZeroCount {
            expression: expression.to_owned(),
        });
    }
    let Some((last, connectors)) = rest.split_last() else {
        return Err(unrecognised(expression));
    };
    let connectors_ok = connectors
        .iter()
        .all(|word| matches!(*word, "times" | "time" | "x" | "per" | "a" | "every" | "each"));
    match period_word(last) {
        Some(period) if connectors_ok => Ok(Cadence {
            period,
            required: Some(required),
        }),
        _ => Err(unrecognised(expression)),
    }
}

fn is_cron_time(field: &str) -> bool {
    let allowed = |b: u8| b.is_ascii_digit() || matches!(b, b'/' | b'-' | b'*');
    field == "*"
        || field
            .split(',')
            .all(|part| !part.is_empty() && part.bytes().all(allowed))
}

fn is_day_of_month_list(field: &str) -> bool {
    field
        .split(',')
        .all(|day| day.parse::<u8>().is_ok_and(|day| (1..=31).contains(&day)))
}

fn parse_cron(
    expression: &str,
    day_of_month: &str,
    month: &str,
    day_of_week: &str,
) -> Result<Cadence, ScheduleParseError> {
    match (day_of_month, month, day_of_week) {
        ("*", "*", "*") => Ok(Cadence {
            period: Period::Day,
            required: None,
        }),
        ("*", "*", days) => {
            let listed = cron_weekdays(expression, days)?;
            let required = u32::try_from(listed.len()).map_err(|_| unrecognised(expression))?;
            Ok(Cadence {
                period: Period::Week,
                required: Some(required),
            })
        }
        (dom, "*", "*") if is_day_of_month_list(dom) => Ok(Cadence {
            period: Period::Month,
            required: None,
        }),
        _ => Err(unrecognised(expression)),
    }
}

/// Distinct weekdays named by a cron day-of-week field, Sunday as 0.
fn cron_weekdays(expression: &str, field: &str) -> Result<BTreeSet<u8>, ScheduleParseError> {
    let mut days = BTreeSet::new();
    for part in field.split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                let start = weekday_number(start).ok_or_else(|| unrecognised(expression))?;
                let end = weekday_number(end).ok_or_else(|| unrecognised(expression))?;
                if start > end {
                    return Err(unrecognised(expression));
                }
                days.extend((start..=end).map(|day| day % 7));
            }
            None => {
                let day = weekday_number(part).ok_or_else(|| unrecognised(expression))?;
                days.insert(day % 7);
            }
        }
    }
    Ok(days)
}

fn weekday_number(token: &str) -> Option<u8> {
    match token {
        "sun" => Some(0),
        "mon" => Some(1),
        "tue" => Some(2),
        "wed" => Some(3),
        "thu" => Some(4),
        "fri" => Some(5),
        "sat" => Some(6),
        digits => digits.parse::<u8>().ok().filter(|day| *day <= 7),
    }
}
