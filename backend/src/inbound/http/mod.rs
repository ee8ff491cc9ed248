//! HTTP inbound adapter exposing REST endpoints.

pub mod epics;
pub mod error;
pub mod habits;
pub mod health;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register the epic and habit endpoints under `/api`.
///
/// Handlers expect [`state::HttpState`] in the application data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(epics::create_epic)
            .service(epics::list_epics)
            .service(epics::delete_all_epics)
            .service(epics::get_epic)
            .service(epics::update_epic)
            .service(epics::delete_epic)
            .service(epics::list_subs)
            .service(epics::list_cores)
            .service(habits::create_habit)
            .service(habits::list_habits)
            .service(habits::get_habit)
            .service(habits::update_habit)
            .service(habits::delete_habit)
            .service(habits::update_habit_status)
            .service(habits::record_completion)
            .service(habits::list_commits)
            .service(habits::update_commit)
            .service(habits::recompute_stats),
    );
}
