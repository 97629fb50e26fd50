//! Where "now" comes from.
//!
//! Every construction path asks [`now`] for the current instant. It returns the
//! process-wide frozen instant when a test has called [`freeze`], and otherwise
//! defers to the [`TimeProvider`] carried by the configuration.

use std::cell::Cell;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::moment::Moment;

static FROZEN_AT: RwLock<Option<DateTime<Utc>>> = RwLock::new(None);

// Held for the whole of a frozen window so two freezers never interleave
static FREEZE_LOCK: Mutex<()> = Mutex::new(());

pub trait TimeProvider {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the real wall clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always answers with the same instant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedTimeProvider {
    instant: DateTime<Utc>,
}

impl FixedTimeProvider {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeProviderEnum {
    #[default]
    System,
    Fixed(FixedTimeProvider),
}

impl TimeProvider for TimeProviderEnum {
    fn now(&self) -> DateTime<Utc> {
        match self {
            TimeProviderEnum::System => SystemTimeProvider.now(),
            TimeProviderEnum::Fixed(provider) => provider.now(),
        }
    }
}

/// The current instant: the frozen one if a freeze is active, else the provider's
pub fn now(provider: &impl TimeProvider) -> DateTime<Utc> {
    frozen_at().unwrap_or_else(|| provider.now())
}

pub fn frozen_at() -> Option<DateTime<Utc>> {
    *FROZEN_AT.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn is_frozen() -> bool {
    frozen_at().is_some()
}

fn set(instant: Option<DateTime<Utc>>) {
    *FROZEN_AT.write().unwrap_or_else(PoisonError::into_inner) = instant;
}

pub(crate) fn exclusive() -> MutexGuard<'static, ()> {
    FREEZE_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

thread_local! {
    // Whether this thread owns the frozen window
    static HOLDS_WINDOW: Cell<bool> = const { Cell::new(false) };
}

/// A frozen window. The clock thaws when this is unfrozen or dropped.
///
/// Freezing again from the thread that already owns the window nests inside it:
/// the inner guard moves the frozen instant and puts the previous one back when
/// it is released.
#[must_use = "the clock unfreezes as soon as the guard is dropped"]
#[derive(Debug)]
pub struct Frozen {
    lock: Option<MutexGuard<'static, ()>>,
    previous: Option<DateTime<Utc>>,
}

impl Frozen {
    /// Move the frozen instant without closing the window
    pub fn refreeze(&self, moment: Option<&Moment>) {
        set(Some(instant_of(moment)));
    }

    pub fn unfreeze(self) {}
}

impl Drop for Frozen {
    fn drop(&mut self) {
        if self.lock.is_some() {
            set(None);
            HOLDS_WINDOW.with(|holds| holds.set(false));
        } else if HOLDS_WINDOW.with(Cell::get) {
            set(self.previous);
        }
    }
}

/// Freeze "now" at the given moment, or at the real current instant when none is given.
///
/// Blocks while another thread holds a frozen window.
pub fn freeze(moment: Option<&Moment>) -> Frozen {
    let instant = instant_of(moment);

    if HOLDS_WINDOW.with(Cell::get) {
        let previous = frozen_at();
        set(Some(instant));
        return Frozen {
            lock: None,
            previous,
        };
    }

    let lock = exclusive();
    HOLDS_WINDOW.with(|holds| holds.set(true));
    set(Some(instant));
    Frozen {
        lock: Some(lock),
        previous: None,
    }
}

fn instant_of(moment: Option<&Moment>) -> DateTime<Utc> {
    match moment {
        Some(moment) => moment.instant(),
        None => SystemTimeProvider.now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn fixed_time_provider_returns_fixed_utc_time() {
        let instant = Utc.with_ymd_and_hms(2025, 5, 10, 10, 0, 0).unwrap();
        let provider = TimeProviderEnum::Fixed(FixedTimeProvider::new(instant));

        assert_eq!(provider.now(), instant);
        assert_eq!(provider.now(), provider.now());
    }

    #[test]
    fn frozen_instant_wins_over_provider_until_unfrozen() {
        let config = test::fixtures::config();
        let moment = Moment::parse(&config, "2009-09-09 09:09:09.123456").unwrap();
        let provider = TimeProviderEnum::Fixed(FixedTimeProvider::new(
            Utc.with_ymd_and_hms(2025, 5, 10, 10, 0, 0).unwrap(),
        ));

        let frozen = freeze(Some(&moment));
        assert!(is_frozen());
        assert_eq!(now(&provider), moment.instant());
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(now(&SystemTimeProvider), moment.instant());
        frozen.unfreeze();

        let _lock = exclusive();
        assert!(!is_frozen());
        assert_eq!(now(&provider), provider.now());
    }

    #[test]
    fn freeze_without_moment_snapshots_real_now() {
        let before = Utc::now();
        let frozen = freeze(None);
        let after = Utc::now();

        let frozen_instant = frozen_at().unwrap();
        assert!(before <= frozen_instant && frozen_instant <= after);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(now(&SystemTimeProvider), frozen_instant);
        drop(frozen);
    }

    #[test]
    fn refreeze_moves_the_frozen_instant() {
        let config = test::fixtures::config();
        let first = Moment::parse(&config, "2001-01-01 00:00:00").unwrap();
        let second = Moment::parse(&config, "2002-02-02 00:00:00").unwrap();

        let frozen = freeze(Some(&first));
        assert_eq!(frozen_at(), Some(first.instant()));
        frozen.refreeze(Some(&second));
        assert_eq!(frozen_at(), Some(second.instant()));
    }

    #[test]
    fn freezing_again_in_the_same_thread_nests() {
        let config = test::fixtures::config();
        let first = Moment::parse(&config, "2001-01-01 00:00:00").unwrap();
        let second = Moment::parse(&config, "2002-02-02 00:00:00").unwrap();

        let outer = freeze(Some(&first));
        let inner = freeze(Some(&second));
        assert_eq!(frozen_at(), Some(second.instant()));

        drop(inner);
        assert_eq!(frozen_at(), Some(first.instant()));

        outer.unfreeze();
        let _lock = exclusive();
        assert!(!is_frozen());
    }

    #[test]
    fn repeated_freezes_without_unfreezing_do_not_block() {
        let config = test::fixtures::config();
        let first = Moment::parse(&config, "2001-01-01 00:00:00").unwrap();
        let second = Moment::parse(&config, "2002-02-02 00:00:00").unwrap();

        let (sender, receiver) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _first = freeze(Some(&first));
            let _second = freeze(Some(&second));
            sender.send(frozen_at()).unwrap();
        });

        let frozen = receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("second freeze in the same thread blocked");
        assert_eq!(frozen, Some(second.instant()));
    }

    #[test]
    fn releasing_the_outer_window_first_leaves_the_clock_thawed() {
        let config = test::fixtures::config();
        let first = Moment::parse(&config, "2001-01-01 00:00:00").unwrap();
        let second = Moment::parse(&config, "2002-02-02 00:00:00").unwrap();

        let outer = freeze(Some(&first));
        let inner = freeze(Some(&second));
        drop(outer);
        drop(inner);

        let _lock = exclusive();
        assert!(!is_frozen());
    }
}
