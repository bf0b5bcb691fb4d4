use chrono::{DateTime, Utc};

/// Countdown decomposition shown while the gate is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    fn between(now: DateTime<Utc>, target: DateTime<Utc>) -> Self {
        let total = (target - now).num_seconds().max(0);
        Remaining {
            days: total / 86_400,
            hours: (total / 3_600) % 24,
            minutes: (total / 60) % 60,
            seconds: total % 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Locked(Remaining),
    /// The transition observation; reported exactly once.
    Opened,
    Open,
}

/// Two-state release gate: locked until the release instant, then open for
/// good. The initial state is computed once at construction; a changed
/// release date is handled by building a fresh gate.
#[derive(Debug)]
pub struct ReleaseGate {
    release_at: DateTime<Utc>,
    open: bool,
}

impl ReleaseGate {
    pub fn new(release_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        ReleaseGate {
            release_at,
            open: now >= release_at,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn release_at(&self) -> DateTime<Utc> {
        self.release_at
    }

    /// Re-derives the state from the current instant. The locked-to-open
    /// transition fires exactly once and never reverts, even if the clock
    /// moves backwards afterwards.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.open {
            return Tick::Open;
        }
        if now >= self.release_at {
            self.open = true;
            Tick::Opened
        } else {
            Tick::Locked(Remaining::between(now, self.release_at))
        }
    }
}
