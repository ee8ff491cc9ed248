//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::ports::{
    MockEpicTreeCommand, MockEpicTreeQuery, MockHabitCommand, MockHabitQuery,
};
use crate::domain::{
    ComboStats, Epic, EpicDraft, EpicId, GridPosition, Habit, HabitDraft, HabitId, HabitStatus,
    Schedule,
};
use crate::inbound::http::state::HttpState;

/// Mock driving ports; tests set expectations before calling [`Self::into_state`].
#[derive(Default)]
pub struct MockPorts {
    pub epics: MockEpicTreeCommand,
    pub epics_query: MockEpicTreeQuery,
    pub habits: MockHabitCommand,
    pub habits_query: MockHabitQuery,
}

impl MockPorts {
    pub fn into_state(self) -> HttpState {
        HttpState::new(
            Arc::new(self.epics),
            Arc::new(self.epics_query),
            Arc::new(self.habits),
            Arc::new(self.habits_query),
        )
    }
}

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub fn root_epic(title: &str) -> Epic {
    Epic::new(EpicDraft {
        id: EpicId::random(),
        title: title.to_owned(),
        description: None,
        status: "active".to_owned(),
        depth: 0,
        position: GridPosition::Center,
        core_epic_id: None,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    })
    .expect("valid root epic")
}

pub fn sub_epic(parent: &Epic, title: &str, position: GridPosition) -> Epic {
    Epic::new(EpicDraft {
        id: EpicId::random(),
        title: title.to_owned(),
        description: None,
        status: "active".to_owned(),
        depth: parent.depth() + 1,
        position,
        core_epic_id: Some(parent.id()),
        created_at: fixed_time(),
        updated_at: fixed_time(),
    })
    .expect("valid sub-epic")
}

pub fn habit(title: &str, epic_id: Option<EpicId>) -> Habit {
    Habit::new(HabitDraft {
        id: HabitId::random(),
        epic_id,
        title: title.to_owned(),
        description: None,
        schedule: Schedule::default(),
        target_count: 1,
        status: HabitStatus::Active,
        stats: ComboStats::default(),
        created_at: fixed_time(),
        updated_at: fixed_time(),
    })
    .expect("valid habit")
}
