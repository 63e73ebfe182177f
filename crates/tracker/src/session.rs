//! Live workout timer.
//!
//! A workout is "in progress" while its stored row has a `start_time` and no
//! `end_time`. The timer derives elapsed seconds from that start time, so a
//! session survives restarts of the front-end.

use std::future::Future;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use storage::models::Workout;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;

/// Sessions running longer than this are saved and closed automatically
pub const AUTO_FINISH_AFTER_SECS: i64 = 7200;

const TICK_PERIOD: StdDuration = StdDuration::from_secs(1);

/// How the timer starts when an editor opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPlan {
    /// Today's workout is already in progress
    Resume { start: DateTime<Utc> },
    /// Nothing to time: another day, or a session that already has a duration
    Frozen { elapsed: i64 },
    /// New session; `start` must be stored on the workout row
    Begin { start: DateTime<Utc> },
}

impl SessionPlan {
    pub fn for_workout(workout: Option<&Workout>, is_today: bool, now: DateTime<Utc>) -> Self {
        let recorded = workout.and_then(|w| w.duration).filter(|d| *d > 0);

        if !is_today {
            return Self::Frozen {
                elapsed: recorded.unwrap_or(0),
            };
        }

        if let Some(start) = workout.filter(|w| w.is_in_progress()).and_then(|w| w.start_time) {
            return Self::Resume { start };
        }

        match recorded {
            Some(elapsed) => Self::Frozen { elapsed },
            None => Self::Begin { start: now },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(i64),
    /// Crossed [`AUTO_FINISH_AFTER_SECS`]; reported once
    Expired(i64),
    /// Frozen, or already expired
    Stopped(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTimer {
    start: Option<DateTime<Utc>>,
    frozen: i64,
    last: i64,
    expired: bool,
}

impl SessionTimer {
    pub fn running(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let mut timer = Self {
            start: Some(start),
            frozen: 0,
            last: 0,
            expired: false,
        };
        timer.last = timer.elapsed(now);
        timer
    }

    pub fn frozen(elapsed: i64) -> Self {
        Self {
            start: None,
            frozen: elapsed.max(0),
            last: elapsed.max(0),
            expired: false,
        }
    }

    pub fn from_plan(plan: SessionPlan, now: DateTime<Utc>) -> Self {
        match plan {
            SessionPlan::Resume { start } | SessionPlan::Begin { start } => {
                Self::running(start, now)
            }
            SessionPlan::Frozen { elapsed } => Self::frozen(elapsed),
        }
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some() && !self.expired
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Seconds since start, never less than a value already reported
    pub fn elapsed(&self, now: DateTime<Utc>) -> i64 {
        match self.start {
            Some(start) => (now - start).num_seconds().max(0).max(self.last),
            None => self.frozen,
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if !self.is_running() {
            return Tick::Stopped(self.last);
        }

        let elapsed = self.elapsed(now);
        self.last = elapsed;

        if elapsed > AUTO_FINISH_AFTER_SECS {
            self.expired = true;
            return Tick::Expired(elapsed);
        }

        Tick::Running(elapsed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickerExit {
    Expired(i64),
    Shutdown,
    /// The timer was not running to begin with
    Idle,
}

/// Drive `timer` once a second until it expires or `shutdown` resolves.
///
/// `on_tick` sees every elapsed value, including the one that expired.
pub async fn run_ticker<C, S, F>(
    timer: &mut SessionTimer,
    clock: &C,
    shutdown: S,
    mut on_tick: F,
) -> TickerExit
where
    C: Clock + ?Sized,
    S: Future<Output = ()>,
    F: FnMut(i64),
{
    if !timer.is_running() {
        return TickerExit::Idle;
    }

    let mut interval = tokio::time::interval(TICK_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("Session ticker stopped");
                return TickerExit::Shutdown;
            }
            _ = interval.tick() => match timer.tick(clock.now()) {
                Tick::Running(elapsed) => on_tick(elapsed),
                Tick::Expired(elapsed) => {
                    on_tick(elapsed);
                    tracing::info!("Session passed {}s, finishing", AUTO_FINISH_AFTER_SECS);
                    return TickerExit::Expired(elapsed);
                }
                Tick::Stopped(_) => return TickerExit::Idle,
            },
        }
    }
}
