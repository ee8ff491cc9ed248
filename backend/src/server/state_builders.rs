//! Builders wiring the domain services onto a record store.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::warn;

use mandalart::domain::ports::{EpicRepository, HabitRepository};
use mandalart::domain::{EpicTreeService, HabitStreakService};
use mandalart::inbound::http::state::HttpState;
use mandalart::outbound::memory::InMemoryStore;
use mandalart::outbound::persistence::{DbPool, DieselEpicRepository, DieselHabitRepository};

fn build_services<E, H>(epic_repo: Arc<E>, habit_repo: Arc<H>) -> HttpState
where
    E: EpicRepository + 'static,
    H: HabitRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let epics = Arc::new(EpicTreeService::new(epic_repo.clone(), clock.clone()));
    let habits = Arc::new(HabitStreakService::new(habit_repo, epic_repo, clock));
    HttpState::new(epics.clone(), epics, habits.clone(), habits)
}

/// Build handler state over PostgreSQL when a pool is configured, otherwise
/// over a fresh in-memory store.
pub(crate) fn build_http_state(pool: Option<&DbPool>) -> web::Data<HttpState> {
    let state = match pool {
        Some(pool) => build_services(
            Arc::new(DieselEpicRepository::new(pool.clone())),
            Arc::new(DieselHabitRepository::new(pool.clone())),
        ),
        None => {
            warn!("no database configured; records are kept in memory and lost on restart");
            let store = Arc::new(InMemoryStore::new());
            build_services(store.clone(), store)
        }
    };
    web::Data::new(state)
}
