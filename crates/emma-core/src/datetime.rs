use std::sync::OnceLock;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Days,
  Duration,
  Local,
  NaiveDate,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

use crate::config::Config;
use crate::task::{
  DATE_ID_FORMAT,
  DateId
};

const TIMEZONE_ENV_VAR: &str =
  "EMMA_TIMEZONE";

pub const WEEK_LENGTH: usize = 7;

/// Sunday-first, indexed by
/// `Weekday::num_days_from_sunday`.
pub const WEEKDAY_NAMES: [&str;
  WEEK_LENGTH] = [
  "Sunday",
  "Monday",
  "Tuesday",
  "Wednesday",
  "Thursday",
  "Friday",
  "Saturday"
];

#[must_use]
pub fn weekday_name(
  date: NaiveDate
) -> &'static str {
  WEEKDAY_NAMES[date
    .weekday()
    .num_days_from_sunday()
    as usize]
}

/// One day slot of the rolling week.
#[derive(
  Debug, Clone, PartialEq, Eq,
)]
pub struct DayBucket {
  pub date_id:      DateId,
  pub weekday_name: &'static str,
  pub is_today:     bool,
  pub date:         NaiveDate
}

impl DayBucket {
  #[must_use]
  pub fn new(
    date: NaiveDate,
    is_today: bool
  ) -> Self {
    Self {
      date_id: DateId::from(date),
      weekday_name: weekday_name(date),
      is_today,
      date
    }
  }

  /// Short month and two-digit day,
  /// e.g. `Jan 05`.
  #[must_use]
  pub fn short_label(&self) -> String {
    self.date.format("%b %d").to_string()
  }
}

/// The seven days starting at
/// `reference`, which is flagged as
/// today. A reference in the last six
/// days of the calendar is pulled back
/// so the week still fits.
#[must_use]
pub fn current_week(
  reference: NaiveDate
) -> Vec<DayBucket> {
  let start = NaiveDate::MAX
    .checked_sub_days(Days::new(
      WEEK_LENGTH as u64 - 1
    ))
    .map_or(reference, |last_start| {
      reference.min(last_start)
    });

  (0..WEEK_LENGTH as u64)
    .filter_map(|offset| {
      start
        .checked_add_days(Days::new(
          offset
        ))
        .map(|date| {
          DayBucket::new(date, offset == 0)
        })
    })
    .collect()
}

/// The single definition of a
/// calendar day: either a configured
/// IANA zone or the system zone.
#[derive(Debug, Clone, Copy)]
pub struct LocalCalendar {
  zone: Option<Tz>
}

impl LocalCalendar {
  #[must_use]
  pub fn system() -> Self {
    Self { zone: None }
  }

  #[must_use]
  pub fn with_zone(zone: Tz) -> Self {
    Self { zone: Some(zone) }
  }

  /// `EMMA_TIMEZONE` wins over the
  /// `timezone` setting; an unusable
  /// variable is ignored.
  #[tracing::instrument(skip(cfg))]
  pub fn from_config(
    cfg: &Config
  ) -> Self {
    if let Ok(raw) =
      std::env::var(TIMEZONE_ENV_VAR)
      && let Some(tz) =
        parse_env_timezone(&raw)
    {
      return Self::with_zone(tz);
    }

    match cfg.timezone {
      | Some(tz) => {
        tracing::debug!(timezone = %tz, "using configured timezone");
        Self::with_zone(tz)
      }
      | None => {
        tracing::debug!(
          "using system timezone"
        );
        Self::system()
      }
    }
  }

  #[must_use]
  pub fn date_of(
    &self,
    instant: DateTime<Utc>
  ) -> NaiveDate {
    match self.zone {
      | Some(tz) => {
        instant
          .with_timezone(&tz)
          .date_naive()
      }
      | None => {
        instant
          .with_timezone(&Local)
          .date_naive()
      }
    }
  }

  #[must_use]
  pub fn today(&self) -> NaiveDate {
    self.date_of(Utc::now())
  }
}

fn parse_env_timezone(
  raw: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        timezone = %trimmed,
        "using {}",
        TIMEZONE_ENV_VAR
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::warn!(
        timezone = %trimmed,
        error = %err,
        "invalid {}; ignoring",
        TIMEZONE_ENV_VAR
      );
      None
    }
  }
}

fn day_offset_regex() -> &'static Regex
{
  static OFFSET_RE: OnceLock<Regex> =
    OnceLock::new();
  OFFSET_RE.get_or_init(|| {
    Regex::new(
      r"^(?P<sign>[+-])(?P<days>\d{1,4})d?$"
    )
    .unwrap_or_else(|_| {
      unreachable!(
        "day offset pattern is valid"
      )
    })
  })
}

/// Resolve a user-typed day
/// (`today`, `tomorrow`, `fri`,
/// `+3d`, `2024-01-10`, ...) relative
/// to `today`.
pub fn parse_day_expr(
  raw: &str,
  today: NaiveDate
) -> anyhow::Result<NaiveDate> {
  let token =
    raw.trim().to_ascii_lowercase();

  let parsed = match token.as_str() {
    | "today" | "tod" => Some(today),
    | "tomorrow" | "tom" => {
      today.succ_opt()
    }
    | "yesterday" => today.pred_opt(),
    | other => {
      if let Some(weekday) =
        parse_weekday_name(other)
      {
        Some(upcoming_weekday_date(
          today, weekday
        ))
      } else if let Some(caps) =
        day_offset_regex()
          .captures(other)
      {
        let days: i64 = caps["days"]
          .parse()
          .map_err(|err| {
            anyhow!(
              "invalid day offset \
               {raw}: {err}"
            )
          })?;
        let delta = if &caps["sign"]
          == "-"
        {
          -days
        } else {
          days
        };
        today.checked_add_signed(
          Duration::days(delta)
        )
      } else {
        NaiveDate::parse_from_str(
          other,
          DATE_ID_FORMAT
        )
        .ok()
      }
    }
  };

  parsed.ok_or_else(|| {
    anyhow!(
      "unrecognized day: {raw}. \
       Supported: today, tomorrow, \
       yesterday, weekday names \
       (e.g. monday), +Nd/-Nd, \
       YYYY-MM-DD"
    )
  })
}

fn parse_weekday_name(
  token: &str
) -> Option<Weekday> {
  match token.trim() {
    | "monday" | "mon" => {
      Some(Weekday::Mon)
    }
    | "tuesday" | "tue" | "tues" => {
      Some(Weekday::Tue)
    }
    | "wednesday" | "wed" => {
      Some(Weekday::Wed)
    }
    | "thursday" | "thu" | "thur"
    | "thurs" => Some(Weekday::Thu),
    | "friday" | "fri" => {
      Some(Weekday::Fri)
    }
    | "saturday" | "sat" => {
      Some(Weekday::Sat)
    }
    | "sunday" | "sun" => {
      Some(Weekday::Sun)
    }
    | _ => None
  }
}

/// Next date falling on `target`
/// inside the rolling week, so today
/// itself counts.
fn upcoming_weekday_date(
  from: NaiveDate,
  target: Weekday
) -> NaiveDate {
  let from_idx = from
    .weekday()
    .num_days_from_sunday()
    as i64;
  let target_idx = target
    .num_days_from_sunday()
    as i64;
  let delta =
    (7 + target_idx - from_idx) % 7;
  from
    .checked_add_signed(Duration::days(
      delta
    ))
    .unwrap_or(from)
}
