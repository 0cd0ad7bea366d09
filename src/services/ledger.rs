//! Capacity ledger
//!
//! Pure decision logic shared by every store. A store locks the event, reads its
//! [`Capacity`], asks this module what to do, and persists the result within the
//! same transaction.

use crate::models::EnrollmentStatus;
use crate::utils::errors::{Result, SportsHubError};
use crate::utils::logging::{log_ledger_adjustment, log_ledger_drift};

/// Slot counters of one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub max: i32,
    pub available: i32,
}

impl Capacity {
    pub fn new(max: i32) -> Self {
        Self { max, available: max }
    }

    pub fn is_consistent(&self) -> bool {
        0 <= self.available && self.available <= self.max
    }
}

/// What a status change means for the event's open slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEffect {
    None,
    Reserve,
    Release,
}

impl LedgerEffect {
    /// `None` on either side means the enrollment does not exist (creation or deletion)
    pub fn plan(from: Option<EnrollmentStatus>, to: Option<EnrollmentStatus>) -> Self {
        let was_confirmed = from.map_or(false, |s| s.is_confirmed());
        let is_confirmed = to.map_or(false, |s| s.is_confirmed());

        match (was_confirmed, is_confirmed) {
            (false, true) => LedgerEffect::Reserve,
            (true, false) => LedgerEffect::Release,
            _ => LedgerEffect::None,
        }
    }
}

/// Result of applying an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Unchanged,
    Reserved,
    Released,
    /// Release requested while every slot was already open
    ReleaseSkipped,
}

impl LedgerOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, LedgerOutcome::Reserved | LedgerOutcome::Released)
    }
}

/// Apply `effect` to `capacity`. On error `capacity` is left untouched.
pub fn apply(event_id: i64, capacity: &mut Capacity, effect: LedgerEffect) -> Result<LedgerOutcome> {
    match effect {
        LedgerEffect::None => Ok(LedgerOutcome::Unchanged),
        LedgerEffect::Reserve => {
            if capacity.available <= 0 {
                return Err(SportsHubError::CapacityExceeded { event_id });
            }
            capacity.available -= 1;
            log_ledger_adjustment(event_id, -1, capacity.available, capacity.max);
            Ok(LedgerOutcome::Reserved)
        }
        LedgerEffect::Release => {
            if capacity.available >= capacity.max {
                log_ledger_drift(event_id, capacity.available, capacity.max);
                return Ok(LedgerOutcome::ReleaseSkipped);
            }
            capacity.available += 1;
            log_ledger_adjustment(event_id, 1, capacity.available, capacity.max);
            Ok(LedgerOutcome::Released)
        }
    }
}

/// Change the maximum, shifting open slots by the same delta
pub fn resize(event_id: i64, capacity: &mut Capacity, new_max: i32) -> Result<()> {
    if new_max < 0 {
        return Err(SportsHubError::InvalidInput("capacity must not be negative".to_string()));
    }

    let delta = new_max - capacity.max;
    let available = capacity.available + delta;
    if available < 0 {
        return Err(SportsHubError::InvalidInput(format!(
            "event {} has {} confirmed enrollments, more than the requested capacity {}",
            event_id,
            capacity.max - capacity.available,
            new_max
        )));
    }

    capacity.max = new_max;
    capacity.available = available;
    if delta != 0 {
        log_ledger_adjustment(event_id, delta, capacity.available, capacity.max);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use crate::models::EnrollmentStatus::{Cancelled, Confirmed, Pending};

    #[test]
    fn test_plan_crossing_confirmed_boundary() {
        assert_eq!(LedgerEffect::plan(Some(Pending), Some(Confirmed)), LedgerEffect::Reserve);
        assert_eq!(LedgerEffect::plan(Some(Cancelled), Some(Confirmed)), LedgerEffect::Reserve);
        assert_eq!(LedgerEffect::plan(None, Some(Confirmed)), LedgerEffect::Reserve);
        assert_eq!(LedgerEffect::plan(Some(Confirmed), Some(Cancelled)), LedgerEffect::Release);
        assert_eq!(LedgerEffect::plan(Some(Confirmed), None), LedgerEffect::Release);
    }

    #[test]
    fn test_plan_without_crossing() {
        assert_eq!(LedgerEffect::plan(Some(Pending), Some(Cancelled)), LedgerEffect::None);
        assert_eq!(LedgerEffect::plan(Some(Confirmed), Some(Confirmed)), LedgerEffect::None);
        assert_eq!(LedgerEffect::plan(None, Some(Pending)), LedgerEffect::None);
        assert_eq!(LedgerEffect::plan(Some(Cancelled), None), LedgerEffect::None);
    }

    #[test]
    fn test_reserve_at_zero_fails_without_change() {
        let mut capacity = Capacity { max: 2, available: 0 };
        let result = apply(9, &mut capacity, LedgerEffect::Reserve);
        assert_matches!(result, Err(SportsHubError::CapacityExceeded { event_id: 9 }));
        assert_eq!(capacity, Capacity { max: 2, available: 0 });
    }

    #[test]
    fn test_release_at_max_is_skipped() {
        let mut capacity = Capacity::new(3);
        assert_eq!(apply(1, &mut capacity, LedgerEffect::Release).unwrap(), LedgerOutcome::ReleaseSkipped);
        assert_eq!(capacity.available, 3);
    }

    #[test]
    fn test_resize() {
        let mut capacity = Capacity { max: 10, available: 4 };
        resize(1, &mut capacity, 15).unwrap();
        assert_eq!(capacity, Capacity { max: 15, available: 9 });

        resize(1, &mut capacity, 6).unwrap();
        assert_eq!(capacity, Capacity { max: 6, available: 0 });

        assert_matches!(resize(1, &mut capacity, 5), Err(SportsHubError::InvalidInput(_)));
        assert_eq!(capacity, Capacity { max: 6, available: 0 });
    }

    fn status_strategy() -> impl Strategy<Value = Option<EnrollmentStatus>> {
        prop_oneof![
            Just(None),
            Just(Some(Pending)),
            Just(Some(Confirmed)),
            Just(Some(Cancelled)),
        ]
    }

    proptest! {
        #[test]
        fn prop_ledger_stays_within_bounds(
            max in 0i32..8,
            steps in proptest::collection::vec((0usize..6, status_strategy()), 0..60),
        ) {
            let mut capacity = Capacity::new(max);
            let mut enrollments: Vec<Option<EnrollmentStatus>> = vec![None; 6];

            for (slot, target) in steps {
                let current = enrollments[slot];
                let effect = LedgerEffect::plan(current, target);
                if apply(1, &mut capacity, effect).is_ok() {
                    enrollments[slot] = target;
                }

                let confirmed = enrollments.iter().filter(|s| **s == Some(Confirmed)).count() as i32;
                prop_assert!(capacity.is_consistent());
                prop_assert_eq!(capacity.available, max - confirmed);
            }
        }
    }
}
