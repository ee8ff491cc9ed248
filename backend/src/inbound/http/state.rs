//! Shared HTTP adapter state.
//!
//! Handlers receive this through `actix_web::web::Data` and only see the
//! driving ports, so they stay testable without a database.

use std::sync::Arc;

use crate::domain::ports::{EpicTreeCommand, EpicTreeQuery, HabitCommand, HabitQuery};

/// Dependency bundle for HTTP handlers.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use mandalart::domain::{EpicTreeService, HabitStreakService};
/// use mandalart::inbound::http::state::HttpState;
/// use mandalart::outbound::memory::InMemoryStore;
/// use mockable::DefaultClock;
///
/// let store = Arc::new(InMemoryStore::new());
/// let clock = Arc::new(DefaultClock);
/// let epics = Arc::new(EpicTreeService::new(store.clone(), clock.clone()));
/// let habits = Arc::new(HabitStreakService::new(store.clone(), store, clock));
/// let state = HttpState::new(epics.clone(), epics, habits.clone(), habits);
/// let _ = state.epics.clone();
/// ```
#[derive(Clone)]
pub struct HttpState {
    pub epics: Arc<dyn EpicTreeCommand>,
    pub epics_query: Arc<dyn EpicTreeQuery>,
    pub habits: Arc<dyn HabitCommand>,
    pub habits_query: Arc<dyn HabitQuery>,
}

impl HttpState {
    pub fn new(
        epics: Arc<dyn EpicTreeCommand>,
        epics_query: Arc<dyn EpicTreeQuery>,
        habits: Arc<dyn HabitCommand>,
        habits_query: Arc<dyn HabitQuery>,
    ) -> Self {
        Self {
            epics,
            epics_query,
            habits,
            habits_query,
        }
    }
}
