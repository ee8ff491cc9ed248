//! Shared helpers for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! each suite pulls this module in with `mod support;` and uses what it needs.

#![allow(dead_code, reason = "each test crate uses a different subset")]

pub mod pg_embed;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;

use mandalart::domain::{EpicTreeService, HabitStreakService};
use mandalart::outbound::memory::InMemoryStore;

/// Clock whose current instant tests move forward explicitly.
pub struct MutableClock {
    now: Mutex<DateTime<Utc>>,
}

impl MutableClock {
    pub fn starting_at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|err| err.into_inner());
        *now += by;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|err| err.into_inner())
    }
}

/// Monday 2 March 2026, 09:00 UTC.
pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Both engines sharing one in-memory store and clock.
pub struct Engines {
    pub store: Arc<InMemoryStore>,
    pub epics: EpicTreeService<InMemoryStore>,
    pub habits: HabitStreakService<InMemoryStore, InMemoryStore>,
    pub clock: Arc<MutableClock>,
}

pub fn in_memory_engines() -> Engines {
    let store = Arc::new(InMemoryStore::new());
    let clock = MutableClock::starting_at(monday_morning());
    Engines {
        epics: EpicTreeService::new(store.clone(), clock.clone()),
        habits: HabitStreakService::new(store.clone(), store.clone(), clock.clone()),
        store,
        clock,
    }
}
