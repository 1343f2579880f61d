//! Beacon matching: which enrolled modules does a report prove presence for?

use std::collections::HashSet;

use serde::Serialize;

use crate::{
  Error, Result,
  directory::{AttendanceModule, GroupMembership},
};

/// A membership paired with the module it credits attendance to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrollment {
  pub membership: GroupMembership,
  pub module:     AttendanceModule,
}

/// Return every attendance-enabled enrollment whose module identifier appears
/// in `observed`.
///
/// Fails with [`Error::NotEnrolled`] when no enrollment has attendance
/// enabled, and with [`Error::NoMatchingBeacon`] when some do but none of
/// their identifiers were observed. Identifiers compare exactly.
pub fn match_beacons<'a>(
  observed: &HashSet<String>,
  enrollments: &'a [Enrollment],
) -> Result<Vec<&'a Enrollment>> {
  let mut enabled = enrollments
    .iter()
    .filter(|e| e.membership.attendance_enabled)
    .peekable();

  if enabled.peek().is_none() {
    return Err(Error::NotEnrolled);
  }

  let matched: Vec<_> = enabled
    .filter(|e| observed.contains(&e.module.identifier))
    .collect();

  if matched.is_empty() {
    return Err(Error::NoMatchingBeacon);
  }
  Ok(matched)
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;

  fn enrollment(name: &str, identifier: &str, enabled: bool, module_id: i64) -> Enrollment {
    Enrollment {
      membership: GroupMembership {
        group_id:           Uuid::new_v4(),
        group_name:         name.into(),
        attendance_enabled: enabled,
        module_id:          Some(module_id),
      },
      module:     AttendanceModule {
        module_id,
        identifier: identifier.into(),
        refresh_interval_secs: 900,
        last_refresh: Utc::now(),
      },
    }
  }

  fn seen(ids: &[&str]) -> HashSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn matches_present_identifier() {
    let enrollments = vec![enrollment("lab", "LAB-AP", true, 1)];
    let matched = match_beacons(&seen(&["cafe", "LAB-AP"]), &enrollments).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].module.module_id, 1);
  }

  #[test]
  fn returns_every_concurrent_match() {
    let enrollments = vec![
      enrollment("lab", "LAB-AP", true, 1),
      enrollment("club", "CLUB-AP", true, 2),
      enrollment("library", "LIB-AP", true, 3),
    ];
    let matched =
      match_beacons(&seen(&["LAB-AP", "LIB-AP"]), &enrollments).unwrap();
    let ids: Vec<_> = matched.iter().map(|e| e.module.module_id).collect();
    assert_eq!(ids, vec![1, 3]);
  }

  #[test]
  fn no_enabled_membership_is_not_enrolled() {
    let enrollments = vec![enrollment("lab", "LAB-AP", false, 1)];
    assert!(matches!(
      match_beacons(&seen(&["LAB-AP"]), &enrollments),
      Err(Error::NotEnrolled)
    ));
    assert!(matches!(
      match_beacons(&seen(&["LAB-AP"]), &[]),
      Err(Error::NotEnrolled)
    ));
  }

  #[test]
  fn enabled_but_unseen_is_no_matching_beacon() {
    let enrollments = vec![enrollment("lab", "LAB-AP", true, 1)];
    assert!(matches!(
      match_beacons(&seen(&["lab-ap", "GUEST"]), &enrollments),
      Err(Error::NoMatchingBeacon)
    ));
  }

  #[test]
  fn disabled_membership_never_matches() {
    let enrollments = vec![
      enrollment("old", "LAB-AP", false, 1),
      enrollment("club", "CLUB-AP", true, 2),
    ];
    assert!(matches!(
      match_beacons(&seen(&["LAB-AP"]), &enrollments),
      Err(Error::NoMatchingBeacon)
    ));
  }
}
