use std::str::FromStr;

use chrono::NaiveDateTime;
use kkvat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::flags::deserialize_lenient_bool;
use crate::report::deserialize_timestamp;

/// Recurrence of a report schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleFrequency {
    /// Every day.
    #[default]
    Daily,
    /// Once a week on `dayOfWeek`.
    Weekly,
    /// Once a month on `dayOfMonth`.
    Monthly,
    /// Once a quarter on `dayOfMonth`.
    Quarterly,
    /// Once a year on `dayOfMonth`.
    Annually,
}

impl ScheduleFrequency {
    /// Returns the wire value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Quarterly => "QUARTERLY",
            Self::Annually => "ANNUALLY",
        }
    }

    /// Returns whether the frequency is anchored to a weekday.
    #[must_use]
    pub fn needs_day_of_week(self) -> bool {
        self == Self::Weekly
    }

    /// Returns whether the frequency is anchored to a day of the month.
    #[must_use]
    pub fn needs_day_of_month(self) -> bool {
        matches!(self, Self::Monthly | Self::Quarterly | Self::Annually)
    }
}

impl FromStr for ScheduleFrequency {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            "QUARTERLY" => Ok(Self::Quarterly),
            "ANNUALLY" => Ok(Self::Annually),
            _ => Err(AppError::Validation(format!(
                "unknown schedule frequency '{value}'"
            ))),
        }
    }
}

/// Stored schedule as returned by `/api/report-schedules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSchedule {
    /// Backend identifier.
    pub id: i64,
    /// Scheduled report.
    pub report_id: i64,
    /// Scheduled report name.
    #[serde(default)]
    pub report_name: Option<String>,
    /// Schedule name.
    pub schedule_name: String,
    /// Recurrence.
    pub frequency: ScheduleFrequency,
    /// Weekday, 0 = Sunday.
    #[serde(default)]
    pub day_of_week: Option<u8>,
    /// Day of month.
    #[serde(default)]
    pub day_of_month: Option<u8>,
    /// Local run time, `HH:MM:SS`.
    #[serde(default)]
    pub time_of_day: Option<String>,
    /// Comma-separated recipients.
    #[serde(default)]
    pub email_recipients: Option<String>,
    /// Whether the schedule fires.
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub is_active: bool,
    /// Last run.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub last_executed: Option<NaiveDateTime>,
    /// Next planned run.
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub next_execution: Option<NaiveDateTime>,
}

/// Create/update body for a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    /// Scheduled report.
    pub report_id: i64,
    /// Schedule name.
    pub schedule_name: String,
    /// Recurrence.
    pub frequency: ScheduleFrequency,
    /// Weekday, only for weekly schedules.
    pub day_of_week: Option<u8>,
    /// Day of month, only for monthly and longer schedules.
    pub day_of_month: Option<u8>,
    /// `HH:MM:SS`.
    pub time_of_day: String,
    /// Comma-separated recipients.
    pub email_recipients: String,
    /// Whether the schedule fires.
    pub is_active: bool,
}

/// Schedule form state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleDraft {
    /// Scheduled report.
    pub report_id: Option<i64>,
    /// Schedule name, at least three characters.
    pub schedule_name: String,
    frequency: ScheduleFrequency,
    /// Weekday, 0 = Sunday.
    pub day_of_week: Option<u8>,
    /// Day of month.
    pub day_of_month: Option<u8>,
    /// `HH:MM`.
    pub time_of_day: String,
    /// Comma-separated recipients.
    pub email_recipients: String,
    /// Whether the schedule fires.
    pub is_active: bool,
}

impl Default for ScheduleDraft {
    fn default() -> Self {
        Self {
            report_id: None,
            schedule_name: String::new(),
            frequency: ScheduleFrequency::Daily,
            day_of_week: None,
            day_of_month: None,
            time_of_day: "09:00".to_owned(),
            email_recipients: String::new(),
            is_active: true,
        }
    }
}

impl ScheduleDraft {
    /// Creates a daily draft for `report_id` at `time_of_day` (`HH:MM`).
    #[must_use]
    pub fn new(
        report_id: i64,
        schedule_name: impl Into<String>,
        time_of_day: impl Into<String>,
    ) -> Self {
        Self {
            report_id: Some(report_id),
            schedule_name: schedule_name.into(),
            time_of_day: time_of_day.into(),
            ..Self::default()
        }
    }

    /// Returns the selected recurrence.
    #[must_use]
    pub fn frequency(&self) -> ScheduleFrequency {
        self.frequency
    }

    /// Changes the recurrence and clears the day that no longer applies.
    pub fn set_frequency(&mut self, frequency: ScheduleFrequency) {
        self.frequency = frequency;
        if !frequency.needs_day_of_week() {
            self.day_of_week = None;
        }
        if !frequency.needs_day_of_month() {
            self.day_of_month = None;
        }
    }

    /// Checks required fields and the day constraint of the recurrence.
    pub fn validate(&self) -> AppResult<()> {
        if self.report_id.is_none() {
            return Err(AppError::Validation("a report must be selected".to_owned()));
        }

        if self.schedule_name.trim().chars().count() < 3 {
            return Err(AppError::Validation(
                "schedule name must be at least 3 characters".to_owned(),
            ));
        }

        if !is_hour_minute(&self.time_of_day) {
            return Err(AppError::Validation(format!(
                "time of day '{}' must be HH:MM",
                self.time_of_day
            )));
        }

        if self.frequency.needs_day_of_week() && !self.day_of_week.is_some_and(|day| day <= 6) {
            return Err(AppError::Validation(
                "weekly schedules need a day of week between 0 and 6".to_owned(),
            ));
        }

        if self.frequency.needs_day_of_month()
            && !self.day_of_month.is_some_and(|day| (1..=31).contains(&day))
        {
            return Err(AppError::Validation(format!(
                "{} schedules need a day of month between 1 and 31",
                self.frequency.as_str().to_ascii_lowercase()
            )));
        }

        Ok(())
    }

    /// Validates and builds the request body, appending seconds to the time.
    pub fn to_request(&self) -> AppResult<ScheduleRequest> {
        self.validate()?;
        let report_id = self
            .report_id
            .ok_or_else(|| AppError::Validation("a report must be selected".to_owned()))?;

        Ok(ScheduleRequest {
            report_id,
            schedule_name: self.schedule_name.trim().to_owned(),
            frequency: self.frequency,
            day_of_week: self.day_of_week.filter(|_| self.frequency.needs_day_of_week()),
            day_of_month: self
                .day_of_month
                .filter(|_| self.frequency.needs_day_of_month()),
            time_of_day: format!("{}:00", self.time_of_day.trim()),
            email_recipients: self.email_recipients.trim().to_owned(),
            is_active: self.is_active,
        })
    }
}

impl From<&ReportSchedule> for ScheduleDraft {
    fn from(schedule: &ReportSchedule) -> Self {
        let time_of_day = schedule
            .time_of_day
            .as_deref()
            .map(|time| time.chars().take(5).collect())
            .unwrap_or_else(|| "09:00".to_owned());

        Self {
            report_id: Some(schedule.report_id),
            schedule_name: schedule.schedule_name.clone(),
            frequency: schedule.frequency,
            day_of_week: schedule.day_of_week,
            day_of_month: schedule.day_of_month,
            time_of_day,
            email_recipients: schedule.email_recipients.clone().unwrap_or_default(),
            is_active: schedule.is_active,
        }
    }
}

fn is_hour_minute(value: &str) -> bool {
    let Some((hours, minutes)) = value.trim().split_once(':') else {
        return false;
    };

    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|byte| byte.is_ascii_digit());
    two_digits(hours)
        && two_digits(minutes)
        && hours.parse::<u8>().is_ok_and(|hours| hours < 24)
        && minutes.parse::<u8>().is_ok_and(|minutes| minutes < 60)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ReportSchedule, ScheduleDraft, ScheduleFrequency};

    fn valid_draft() -> ScheduleDraft {
        ScheduleDraft::new(4, "Nightly", "21:30")
    }

    #[test]
    fn new_draft_is_daily_and_active() {
        let mut draft = ScheduleDraft::new(9, "Quarter close", "06:15");
        assert_eq!(draft.report_id, Some(9));
        assert_eq!(draft.frequency(), ScheduleFrequency::Daily);
        assert!(draft.is_active);

        draft.day_of_month = Some(12);
        draft.set_frequency(ScheduleFrequency::Quarterly);
        assert_eq!(draft.day_of_month, Some(12));
        draft.set_frequency(ScheduleFrequency::Weekly);
        assert_eq!(draft.day_of_month, None);
    }

    #[test]
    fn daily_schedule_submits_time_with_seconds() {
        let request = valid_draft().to_request();

        let Ok(request) = request else {
            panic!("daily draft should be valid");
        };
        assert_eq!(request.time_of_day, "21:30:00");
        assert_eq!(request.day_of_week, None);
        assert_eq!(request.frequency, ScheduleFrequency::Daily);
    }

    #[test]
    fn required_fields_are_checked() {
        let mut draft = valid_draft();
        draft.report_id = None;
        assert!(draft.validate().is_err());

        let mut draft = valid_draft();
        draft.schedule_name = " ab ".to_owned();
        assert!(draft.validate().is_err());

        let mut draft = valid_draft();
        draft.time_of_day = "9:30".to_owned();
        assert!(draft.validate().is_err());

        let mut draft = valid_draft();
        draft.time_of_day = "24:00".to_owned();
        assert!(draft.validate().is_err());
    }

    #[test]
    fn weekly_requires_day_of_week_in_range() {
        let mut draft = valid_draft();
        draft.set_frequency(ScheduleFrequency::Weekly);
        assert!(draft.validate().is_err());

        draft.day_of_week = Some(7);
        assert!(draft.validate().is_err());

        draft.day_of_week = Some(0);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn monthly_family_requires_day_of_month_in_range() {
        for frequency in [
            ScheduleFrequency::Monthly,
            ScheduleFrequency::Quarterly,
            ScheduleFrequency::Annually,
        ] {
            let mut draft = valid_draft();
            draft.set_frequency(frequency);
            draft.day_of_month = Some(0);
            assert!(draft.validate().is_err());
            draft.day_of_month = Some(31);
            assert!(draft.validate().is_ok());
        }
    }

    #[test]
    fn switching_frequency_clears_stale_day() {
        let mut draft = valid_draft();
        draft.set_frequency(ScheduleFrequency::Weekly);
        draft.day_of_week = Some(3);
        draft.set_frequency(ScheduleFrequency::Monthly);

        assert_eq!(draft.day_of_week, None);
        draft.day_of_month = Some(15);
        draft.set_frequency(ScheduleFrequency::Daily);
        assert_eq!(draft.day_of_month, None);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn editing_existing_schedule_strips_seconds() {
        let stored = serde_json::from_value::<ReportSchedule>(json!({
            "id": 1,
            "reportId": 4,
            "reportName": "Runs",
            "scheduleName": "Weekly digest",
            "frequency": "WEEKLY",
            "dayOfWeek": 1,
            "timeOfDay": "08:15:00",
            "isActive": true,
            "lastExecuted": null,
        }));
        let Ok(stored) = stored else {
            panic!("schedule should decode");
        };

        let draft = ScheduleDraft::from(&stored);
        assert_eq!(draft.time_of_day, "08:15");
        assert_eq!(draft.frequency(), ScheduleFrequency::Weekly);
        assert!(draft.validate().is_ok());
    }
}
