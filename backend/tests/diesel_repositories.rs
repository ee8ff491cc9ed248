//! Diesel adapters against embedded PostgreSQL.
//!
//! Opt-in: run with `RUN_PG_EMBEDDED=1 cargo test --test diesel_repositories -- --ignored`.

mod support;

use std::sync::Arc;

use chrono::Duration;
use mandalart::domain::ports::{
    CreateEpicRequest, CreateHabitRequest, EpicPatch, EpicTreeCommand, EpicTreeQuery,
    HabitCommand, HabitQuery, ListCommitsRequest, RecordCompletionRequest, UpdateEpicRequest,
};
use mandalart::domain::{EpicId, EpicTreeService, ErrorCode, GridPosition, HabitStreakService};
use mandalart::outbound::persistence::{
    DbPool, DieselEpicRepository, DieselHabitRepository, PoolConfig, run_pending_migrations,
};
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use support::pg_embed::{pg_embedded_requested, test_cluster};
use support::{MutableClock, monday_morning};
use tokio::runtime::Runtime;

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    epics: EpicTreeService<DieselEpicRepository>,
    habits: HabitStreakService<DieselHabitRepository, DieselEpicRepository>,
    clock: Arc<MutableClock>,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    let database_url = cluster.connection().database_url("postgres");
    runtime
        .block_on(run_pending_migrations(&database_url))
        .map_err(|err| err.to_string())?;
    let pool = runtime
        .block_on(DbPool::new(
            PoolConfig::new(&database_url)
                .with_max_size(2)
                .with_min_idle(Some(1)),
        ))
        .map_err(|err| err.to_string())?;

    let epic_repo = Arc::new(DieselEpicRepository::new(pool.clone()));
    let habit_repo = Arc::new(DieselHabitRepository::new(pool));
    let clock = MutableClock::starting_at(monday_morning());
    Ok(TestContext {
        runtime,
        _cluster: cluster,
        epics: EpicTreeService::new(epic_repo.clone(), clock.clone()),
        habits: HabitStreakService::new(habit_repo, epic_repo, clock.clone()),
        clock,
    })
}

#[fixture]
fn context() -> Option<TestContext> {
    if !pg_embedded_requested() {
        eprintln!("skipping: set RUN_PG_EMBEDDED=1 to run the PostgreSQL suite");
        return None;
    }
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => panic!("embedded PostgreSQL setup failed: {reason}"),
    }
}

fn epic_request(title: &str, core_epic_id: Option<EpicId>) -> CreateEpicRequest {
    CreateEpicRequest {
        title: title.to_owned(),
        description: None,
        status: "active".to_owned(),
        core_epic_id,
        position: None,
    }
}

#[rstest]
#[ignore = "requires embedded PostgreSQL; set RUN_PG_EMBEDDED=1"]
fn tree_round_trips_through_postgres(context: Option<TestContext>) {
    let Some(ctx) = context else { return };
    ctx.runtime.block_on(async {
        let root = ctx
            .epics
            .create_epic(epic_request("Health", None))
            .await
            .expect("root");
        let child = ctx
            .epics
            .create_epic(epic_request("Exercise", Some(root.id())))
            .await
            .expect("child");
        let grandchild = ctx
            .epics
            .create_epic(epic_request("Run", Some(child.id())))
            .await
            .expect("grandchild");

        let tree = ctx.epics.get_epic(root.id()).await.expect("tree");
        assert_eq!(tree.subtree_size(), 3);
        assert_eq!(tree.subs[0].subs[0].epic.id(), grandchild.id());
        assert_eq!(tree.subs[0].subs[0].epic.depth(), 2);

        let cores = ctx.epics.list_cores(grandchild.id()).await.expect("cores");
        assert_eq!(cores[0].epic_id, child.id());
        assert_eq!(cores[0].depth, 2);
    });
}

#[rstest]
#[ignore = "requires embedded PostgreSQL; set RUN_PG_EMBEDDED=1"]
fn move_and_cascade_delete_are_transactional(context: Option<TestContext>) {
    let Some(ctx) = context else { return };
    ctx.runtime.block_on(async {
        let a = ctx
            .epics
            .create_epic(epic_request("A", None))
            .await
            .expect("a");
        let b = ctx
            .epics
            .create_epic(epic_request("B", None))
            .await
            .expect("b");
        let b1 = ctx
            .epics
            .create_epic(epic_request("B1", Some(b.id())))
            .await
            .expect("b1");
        let habit = ctx
            .habits
            .create_habit(CreateHabitRequest {
                epic_id: Some(b1.id()),
                title: "Stretch".to_owned(),
                description: None,
                schedule: None,
                target_count: None,
            })
            .await
            .expect("habit");

        let moved = ctx
            .epics
            .update_epic(UpdateEpicRequest {
                epic_id: b.id(),
                patch: EpicPatch {
                    core_epic_id: Some(Some(a.id())),
                    position: Some(GridPosition::Bottom),
                    ..EpicPatch::default()
                },
            })
            .await
            .expect("moved");
        assert_eq!(moved.depth(), 1);
        let b1_after = ctx.epics.get_epic(b1.id()).await.expect("b1");
        assert_eq!(b1_after.epic.depth(), 2);

        let cycle = ctx
            .epics
            .update_epic(UpdateEpicRequest {
                epic_id: a.id(),
                patch: EpicPatch {
                    core_epic_id: Some(Some(b1.id())),
                    ..EpicPatch::default()
                },
            })
            .await
            .expect_err("cycle rejected");
        assert_eq!(cycle.code(), ErrorCode::InvalidOperation);

        let deleted = ctx.epics.delete_epic(a.id()).await.expect("deleted");
        assert_eq!(deleted.removed_count, 3);
        let kept = ctx.habits.get_habit(habit.id()).await.expect("habit kept");
        assert_eq!(kept.epic_id(), None);
    });
}

#[rstest]
#[ignore = "requires embedded PostgreSQL; set RUN_PG_EMBEDDED=1"]
fn completions_persist_with_stats(context: Option<TestContext>) {
    let Some(ctx) = context else { return };
    ctx.runtime.block_on(async {
        let habit = ctx
            .habits
            .create_habit(CreateHabitRequest {
                epic_id: None,
                title: "Read".to_owned(),
                description: Some("twenty pages".to_owned()),
                schedule: Some("daily".to_owned()),
                target_count: Some(1),
            })
            .await
            .expect("habit");

        for _ in 0..3 {
            ctx.habits
                .record_completion(RecordCompletionRequest {
                    habit_id: habit.id(),
                    description: None,
                    effort: 2,
                })
                .await
                .expect("completion");
            ctx.clock.advance(Duration::days(1));
        }

        let stored = ctx.habits.get_habit(habit.id()).await.expect("habit");
        assert_eq!(stored.stats().current_combo, 3);
        assert_eq!(stored.stats().total_completions, 3);

        let commits = ctx
            .habits
            .list_commits(ListCommitsRequest {
                habit_id: habit.id(),
                limit: Some(2),
            })
            .await
            .expect("commits");
        assert_eq!(commits.len(), 2);
        assert!(commits[0].created_at > commits[1].created_at);

        ctx.habits.delete_habit(habit.id()).await.expect("deleted");
        let missing = ctx.habits.get_habit(habit.id()).await;
        assert_eq!(
            missing.map(|h| h.id()).map_err(|e| e.code()),
            Err(ErrorCode::NotFound)
        );
    });
}
