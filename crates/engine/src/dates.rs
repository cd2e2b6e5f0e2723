//! Date-range resolution.
//!
//! Dates are stored and compared as [`NaiveDate`] and rendered in the
//! canonical `YYYY-MM-DD` form; `DD/MM/YYYY` is only produced for filter
//! summaries shown to the user.

use core::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{DateRangeError, EngineError, ResultEngine};

const CANONICAL: &str = "%Y-%m-%d";
const DISPLAY: &str = "%d/%m/%Y";

/// Symbolic period of a range report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatePreset {
    Today,
    ThisMonth,
    LastMonth,
    ThisQuarter,
    LastQuarter,
    ThisYear,
    LastYear,
}

/// Symbolic "as of" date of an aged report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AsOfPreset {
    Today,
    LastMonthEnd,
    LastQuarterEnd,
    LastYearEnd,
}

/// Inclusive calendar range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Raw boundaries as typed by the user, in canonical or display form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// What the date filter currently holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DateSelection {
    #[default]
    Unbounded,
    Preset(DatePreset),
    AsOf(AsOfPreset),
    Explicit(RawRange),
}

/// Resolved boundaries sent to the report service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolvedDates {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DatePreset {
    pub const ALL: [DatePreset; 7] = [
        Self::Today,
        Self::ThisMonth,
        Self::LastMonth,
        Self::ThisQuarter,
        Self::LastQuarter,
        Self::ThisYear,
        Self::LastYear,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::ThisMonth => "thisMonth",
            Self::LastMonth => "lastMonth",
            Self::ThisQuarter => "thisQuarter",
            Self::LastQuarter => "lastQuarter",
            Self::ThisYear => "thisYear",
            Self::LastYear => "lastYear",
        }
    }
}

impl fmt::Display for DatePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercases and drops `-`/`_` so `last-month`, `last_month` and
/// `lastMonth` compare equal.
fn squash(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for DatePreset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match squash(s).as_str() {
            "today" => Ok(Self::Today),
            "month" | "thismonth" => Ok(Self::ThisMonth),
            "lastmonth" => Ok(Self::LastMonth),
            "quarter" | "thisquarter" => Ok(Self::ThisQuarter),
            "lastquarter" => Ok(Self::LastQuarter),
            "year" | "thisyear" => Ok(Self::ThisYear),
            "lastyear" => Ok(Self::LastYear),
            _ => Err(EngineError::UnknownPreset(s.to_string())),
        }
    }
}

impl FromStr for AsOfPreset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match squash(s).as_str() {
            "today" => Ok(Self::Today),
            "lastmonthend" | "lastmonth" => Ok(Self::LastMonthEnd),
            "lastquarterend" | "lastquarter" => Ok(Self::LastQuarterEnd),
            "lastyearend" | "lastyear" => Ok(Self::LastYearEnd),
            _ => Err(EngineError::UnknownPreset(s.to_string())),
        }
    }
}

/// First day of zero-based month `month0` of `year`.
///
/// `month0` may go negative or past 11; the year wraps.
fn month_start(year: i32, month0: i32) -> ResultEngine<NaiveDate> {
    let y = year + month0.div_euclid(12);
    let m = month0.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(y, m, 1)
        .ok_or_else(|| EngineError::DateOutOfRange(format!("{y}-{m:02}")))
}

/// Inclusive range covering `months` months starting at `(year, month0)`.
fn span(year: i32, month0: i32, months: i32) -> ResultEngine<DateRange> {
    let start = month_start(year, month0)?;
    let end = month_start(year, month0 + months)? - Duration::days(1);
    Ok(DateRange { start, end })
}

/// Resolve a preset against `reference`.
pub fn resolve_preset(preset: DatePreset, reference: NaiveDate) -> ResultEngine<DateRange> {
    let year = reference.year();
    let month0 = reference.month0() as i32;
    let quarter = month0.div_euclid(3);
    match preset {
        DatePreset::Today => Ok(DateRange {
            start: reference,
            end: reference,
        }),
        DatePreset::ThisMonth => span(year, month0, 1),
        DatePreset::LastMonth => span(year, month0 - 1, 1),
        DatePreset::ThisQuarter => span(year, quarter * 3, 3),
        DatePreset::LastQuarter => span(year, (month0 - 3).div_euclid(3) * 3, 3),
        DatePreset::ThisYear => span(year, 0, 12),
        DatePreset::LastYear => span(year - 1, 0, 12),
    }
}

/// Resolve an "as of" preset: the day before the current period starts.
pub fn resolve_as_of(preset: AsOfPreset, reference: NaiveDate) -> ResultEngine<NaiveDate> {
    let year = reference.year();
    let month0 = reference.month0() as i32;
    let period_start = match preset {
        AsOfPreset::Today => return Ok(reference),
        AsOfPreset::LastMonthEnd => month_start(year, month0)?,
        AsOfPreset::LastQuarterEnd => month_start(year, month0.div_euclid(3) * 3)?,
        AsOfPreset::LastYearEnd => month_start(year, 0)?,
    };
    Ok(period_start - Duration::days(1))
}

/// Parse canonical (`-`) or display (`/`) text. Never panics.
pub fn normalize_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.contains('-') {
        NaiveDate::parse_from_str(text, CANONICAL).ok()
    } else if text.contains('/') {
        NaiveDate::parse_from_str(text, DISPLAY).ok()
    } else {
        None
    }
}

pub fn to_canonical(date: NaiveDate) -> String {
    date.format(CANONICAL).to_string()
}

pub fn to_display(date: NaiveDate) -> String {
    date.format(DISPLAY).to_string()
}

/// Check a user-entered range.
///
/// Missing endpoints are unbounded, not errors.
pub fn validate_range(range: &RawRange) -> Result<(), DateRangeError> {
    let parse = |value: &Option<String>| -> Result<Option<NaiveDate>, DateRangeError> {
        match value.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => normalize_date(text)
                .map(Some)
                .ok_or(DateRangeError::InvalidFormat),
        }
    };
    let start = parse(&range.start)?;
    let end = parse(&range.end)?;
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        return Err(DateRangeError::EndBeforeStart);
    }
    Ok(())
}

impl DateSelection {
    /// Concrete boundaries for the RPC. Invalid explicit text resolves to
    /// `None`; callers gate on [`validate_range`] first.
    pub fn resolve(&self, reference: NaiveDate) -> ResultEngine<ResolvedDates> {
        Ok(match self {
            Self::Unbounded => ResolvedDates::default(),
            Self::Preset(preset) => {
                let range = resolve_preset(*preset, reference)?;
                ResolvedDates {
                    start: Some(range.start),
                    end: Some(range.end),
                }
            }
            Self::AsOf(preset) => ResolvedDates {
                start: None,
                end: Some(resolve_as_of(*preset, reference)?),
            },
            Self::Explicit(raw) => ResolvedDates {
                start: raw.start.as_deref().and_then(normalize_date),
                end: raw.end.as_deref().and_then(normalize_date),
            },
        })
    }

    pub fn raw(&self) -> Option<&RawRange> {
        match self {
            Self::Explicit(raw) => Some(raw),
            _ => None,
        }
    }
}
