//! The interval clock: quantises a timestamp into a fixed-width window.
//!
//! Windows are aligned to the top of the hour in the caller's timezone. The
//! boundaries must be reproducible exactly, because the ledger deduplicates
//! sightings by comparing them.

use chrono::{DateTime, TimeDelta, TimeZone, Timelike, Utc};

use crate::{Error, Result, ledger::Session};

/// Validate a refresh interval given in seconds and convert it to a
/// [`TimeDelta`]. The interval must be a positive whole number of minutes.
pub fn interval_from_secs(seconds: i64) -> Result<TimeDelta> {
  if seconds <= 0 || seconds % 60 != 0 {
    return Err(Error::InvalidInterval { seconds });
  }
  TimeDelta::try_seconds(seconds).ok_or(Error::InvalidInterval { seconds })
}

/// Compute the window containing `now` for buckets of width `interval`.
///
/// `start` is `now` minus `now.minute() % interval_minutes` minutes, with the
/// seconds and sub-second fields zeroed; `end` is `start + interval`. The
/// minute is read in `now`'s own timezone, so callers thread the configured
/// timezone in through the type of `now`.
pub fn compute_window<Tz: TimeZone>(
  now: &DateTime<Tz>,
  interval: TimeDelta,
) -> Result<Session> {
  let seconds = interval.num_seconds();
  if interval.subsec_nanos() != 0 {
    return Err(Error::InvalidInterval { seconds });
  }
  interval_from_secs(seconds)?;

  let minutes = seconds / 60;
  let into_window = TimeDelta::minutes(i64::from(now.minute()) % minutes)
    + TimeDelta::seconds(i64::from(now.second()))
    // Leap seconds report nanosecond() >= 1e9.
    + TimeDelta::nanoseconds(i64::from(now.nanosecond() % 1_000_000_000));

  let start = now.with_timezone(&Utc) - into_window;
  Ok(Session { start, end: start + interval })
}

#[cfg(test)]
mod tests {
  use chrono::{FixedOffset, NaiveDate};

  use super::*;

  fn at(offset: &FixedOffset, h: u32, m: u32, s: u32, nanos: u32) -> DateTime<FixedOffset> {
    let naive = NaiveDate::from_ymd_opt(2024, 3, 11)
      .unwrap()
      .and_hms_nano_opt(h, m, s, nanos)
      .unwrap();
    offset.from_local_datetime(&naive).unwrap()
  }

  fn utc() -> FixedOffset { FixedOffset::east_opt(0).unwrap() }

  #[test]
  fn fifteen_minute_window_at_ten_past_seven() {
    let tz = utc();
    let window =
      compute_window(&at(&tz, 10, 7, 42, 123_456_000), TimeDelta::minutes(15))
        .unwrap();
    assert_eq!(window.start, at(&tz, 10, 0, 0, 0));
    assert_eq!(window.end, at(&tz, 10, 15, 0, 0));
  }

  #[test]
  fn window_boundary_starts_a_new_window() {
    let tz = utc();
    let window =
      compute_window(&at(&tz, 10, 15, 0, 0), TimeDelta::minutes(15)).unwrap();
    assert_eq!(window.start, at(&tz, 10, 15, 0, 0));
    assert_eq!(window.end, at(&tz, 10, 30, 0, 0));
  }

  #[test]
  fn windows_cover_every_minute_for_divisors_of_sixty() {
    let tz = utc();
    for len in [1, 2, 3, 4, 5, 6, 10, 12, 15, 20, 30, 60] {
      let interval = TimeDelta::minutes(len);
      for minute in 0..60 {
        let t = at(&tz, 13, minute, 59, 999_999_999);
        let window = compute_window(&t, interval).unwrap();
        assert_eq!(window.end - window.start, interval, "len={len} minute={minute}");
        assert!(window.start <= t, "len={len} minute={minute}");
        assert!(t < window.end, "len={len} minute={minute}");
      }
    }
  }

  #[test]
  fn same_window_for_all_instants_inside_it() {
    let tz = utc();
    let interval = TimeDelta::minutes(15);
    let a = compute_window(&at(&tz, 10, 7, 0, 0), interval).unwrap();
    let b = compute_window(&at(&tz, 10, 12, 30, 5), interval).unwrap();
    let c = compute_window(&at(&tz, 10, 16, 0, 0), interval).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn minute_is_read_in_the_local_timezone() {
    // +05:45 shifts the minute-of-hour relative to UTC.
    let nepal = FixedOffset::east_opt(5 * 3600 + 45 * 60).unwrap();
    let window =
      compute_window(&at(&nepal, 10, 7, 0, 0), TimeDelta::minutes(15))
        .unwrap();
    assert_eq!(window.start, at(&nepal, 10, 0, 0, 0));
    assert_eq!(window.end, at(&nepal, 10, 15, 0, 0));
  }

  #[test]
  fn interval_not_dividing_the_hour_still_contains_now() {
    let tz = utc();
    let t = at(&tz, 9, 50, 0, 0);
    let window = compute_window(&t, TimeDelta::minutes(45)).unwrap();
    assert_eq!(window.start, at(&tz, 9, 45, 0, 0));
    assert_eq!(window.end, at(&tz, 10, 30, 0, 0));
  }

  #[test]
  fn rejects_non_positive_and_sub_minute_intervals() {
    let t = at(&utc(), 10, 7, 0, 0);
    for bad in [
      TimeDelta::zero(),
      TimeDelta::minutes(-15),
      TimeDelta::seconds(90),
      TimeDelta::milliseconds(60_500),
    ] {
      assert!(
        matches!(compute_window(&t, bad), Err(Error::InvalidInterval { .. })),
        "accepted {bad:?}"
      );
    }
  }

  #[test]
  fn interval_from_secs_validates() {
    assert_eq!(interval_from_secs(900).unwrap(), TimeDelta::minutes(15));
    assert!(interval_from_secs(0).is_err());
    assert!(interval_from_secs(-60).is_err());
    assert!(interval_from_secs(61).is_err());
  }
}
