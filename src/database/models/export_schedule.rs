use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::report::ReportFormat;

/// Delivery cadence of a scheduled export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ExportFrequency {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// Scheduled user export, persisted configuration only
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExportSchedule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    #[sqlx(rename = "frequency")]
    #[serde(rename = "frequency")]
    pub frequency_str: String,
    #[sqlx(rename = "format")]
    #[serde(rename = "format")]
    pub format_str: String,
    pub recipients: Vec<String>,
    pub day_of_week: Option<i16>,
    pub day_of_month: Option<i16>,
    pub time: String,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub filter_preset_id: Option<Uuid>,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExportSchedule {
    pub fn frequency(&self) -> Option<ExportFrequency> {
        ExportFrequency::from_str(&self.frequency_str)
    }

    pub fn format(&self) -> Option<ReportFormat> {
        ReportFormat::from_str(&self.format_str)
    }
}

/// Validated input for a new schedule
#[derive(Debug, Clone)]
pub struct CreateExportSchedule {
    pub name: String,
    pub frequency: ExportFrequency,
    pub format: ReportFormat,
    pub recipients: Vec<String>,
    pub day_of_week: Option<i16>,
    pub day_of_month: Option<i16>,
    pub time: NaiveTime,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub filter_preset_id: Option<Uuid>,
    pub is_active: bool,
}

impl CreateExportSchedule {
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        next_run_after(now, self.frequency, self.time, self.day_of_week, self.day_of_month)
    }
}

/// Fully resolved schedule fields written by a single-row PATCH
#[derive(Debug, Clone)]
pub struct UpdateExportSchedule {
    pub name: String,
    pub frequency: ExportFrequency,
    pub format: ReportFormat,
    pub recipients: Vec<String>,
    pub day_of_week: Option<i16>,
    pub day_of_month: Option<i16>,
    pub time: NaiveTime,
    pub email_subject: Option<String>,
    pub email_body: Option<String>,
    pub filter_preset_id: Option<Uuid>,
    pub is_active: bool,
    pub next_run_at: DateTime<Utc>,
}

/// Bulk operations accepted by PATCH with an `ids` list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BulkScheduleAction {
    Activate,
    Deactivate,
    /// Flips each row's own `is_active`
    ToggleActive,
}

pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").ok()
}

/// First delivery instant strictly after `now` (UTC). Weekdays count from
/// Sunday = 0; a day of month past the end of a short month falls on its
/// last day.
pub fn next_run_after(
    now: DateTime<Utc>,
    frequency: ExportFrequency,
    time: NaiveTime,
    day_of_week: Option<i16>,
    day_of_month: Option<i16>,
) -> DateTime<Utc> {
    let today = now.date_naive();
    let at = |date: NaiveDate| Utc.from_utc_datetime(&date.and_time(time));

    match frequency {
        ExportFrequency::Daily => {
            let candidate = at(today);
            if candidate > now { candidate } else { at(today + Duration::days(1)) }
        }
        ExportFrequency::Weekly => {
            let target = i64::from(day_of_week.unwrap_or(1).clamp(0, 6));
            let current = i64::from(today.weekday().num_days_from_sunday());
            let mut ahead = (target - current).rem_euclid(7);
            if ahead == 0 && at(today) <= now {
                ahead = 7;
            }
            at(today + Duration::days(ahead))
        }
        ExportFrequency::Monthly => {
            let dom = u32::try_from(day_of_month.unwrap_or(1).clamp(1, 31)).unwrap_or(1);
            let this_month = at(day_in_month(today.year(), today.month(), dom));
            if this_month > now {
                this_month
            } else {
                let (year, month) = if today.month() == 12 {
                    (today.year() + 1, 1)
                } else {
                    (today.year(), today.month() + 1)
                };
                at(day_in_month(year, month, dom))
            }
        }
    }
}

fn day_in_month(year: i32, month: u32, day: u32) -> NaiveDate {
    let mut d = day;
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, d) {
            return date;
        }
        d -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn nine() -> NaiveTime {
        parse_time_of_day("09:00").unwrap()
    }

    #[test]
    fn parses_time_of_day() {
        assert!(parse_time_of_day("23:59").is_some());
        assert!(parse_time_of_day("24:00").is_none());
        assert!(parse_time_of_day("9am").is_none());
    }

    #[test]
    fn daily_runs_today_when_time_is_ahead() {
        let next = next_run_after(utc(2026, 3, 10, 8, 0), ExportFrequency::Daily, nine(), None, None);
        assert_eq!(next, utc(2026, 3, 10, 9, 0));
    }

    #[test]
    fn daily_rolls_to_tomorrow() {
        let next = next_run_after(utc(2026, 3, 10, 9, 0), ExportFrequency::Daily, nine(), None, None);
        assert_eq!(next, utc(2026, 3, 11, 9, 0));
    }

    #[test]
    fn weekly_targets_requested_weekday() {
        // 2026-03-10 is a Tuesday; Friday = 5
        let next = next_run_after(utc(2026, 3, 10, 12, 0), ExportFrequency::Weekly, nine(), Some(5), None);
        assert_eq!(next, utc(2026, 3, 13, 9, 0));
    }

    #[test]
    fn weekly_same_day_after_time_waits_a_week() {
        let next = next_run_after(utc(2026, 3, 10, 12, 0), ExportFrequency::Weekly, nine(), Some(2), None);
        assert_eq!(next, utc(2026, 3, 17, 9, 0));
    }

    #[test]
    fn monthly_clamps_to_short_month() {
        let next = next_run_after(utc(2026, 1, 31, 10, 0), ExportFrequency::Monthly, nine(), None, Some(31));
        assert_eq!(next, utc(2026, 2, 28, 9, 0));
    }

    #[test]
    fn monthly_wraps_year() {
        let next = next_run_after(utc(2026, 12, 20, 10, 0), ExportFrequency::Monthly, nine(), None, Some(5));
        assert_eq!(next, utc(2027, 1, 5, 9, 0));
    }

    #[test]
    fn bulk_action_wire_names() {
        let action: BulkScheduleAction = serde_json::from_str("\"toggleActive\"").unwrap();
        assert_eq!(action, BulkScheduleAction::ToggleActive);
    }
}
