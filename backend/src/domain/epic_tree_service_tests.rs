//! Tests for the epic tree service.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{EpicPatch, MockEpicRepository};

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

#[fixture]
fn clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

fn make_epic(title: &str, parent: Option<&Epic>, position: GridPosition) -> Epic {
    Epic::new(EpicDraft {
        id: EpicId::random(),
        title: title.to_owned(),
        description: None,
        status: "active".to_owned(),
        depth: parent.map_or(0, |p| p.depth() + 1),
        position,
        core_epic_id: parent.map(Epic::id),
        created_at: fixture_timestamp(),
        updated_at: fixture_timestamp(),
    })
    .expect("valid epic")
}

/// Serve `find_by_id` and `list_children` from a fixed set of epics.
fn backed_by(repo: &mut MockEpicRepository, epics: Vec<Epic>) {
    let lookup = epics.clone();
    repo.expect_find_by_id()
        .returning(move |id| Ok(lookup.iter().find(|epic| epic.id() == *id).cloned()));
    repo.expect_list_children().returning(move |parents| {
        Ok(epics
            .iter()
            .filter(|epic| epic.core_epic_id().is_some_and(|p| parents.contains(&p)))
            .cloned()
            .collect())
    });
}

fn create_request(parent: Option<EpicId>, position: Option<GridPosition>) -> CreateEpicRequest {
    CreateEpicRequest {
        title: "Exercise".to_owned(),
        description: None,
        status: "active".to_owned(),
        core_epic_id: parent,
        position,
    }
}

#[rstest]
#[tokio::test]
async fn create_root_sits_at_centre_depth_zero(clock: Arc<dyn Clock>) {
    let mut repo = MockEpicRepository::new();
    repo.expect_insert().times(1).return_once(|_| Ok(()));

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let epic = service
        .create_epic(create_request(None, None))
        .await
        .expect("root created");

    assert_eq!(epic.depth(), 0);
    assert_eq!(epic.position(), GridPosition::Center);
    assert_eq!(epic.created_at(), fixture_timestamp());
}

#[rstest]
#[tokio::test]
async fn create_root_rejects_surrounding_position(clock: Arc<dyn Clock>) {
    let mut repo = MockEpicRepository::new();
    repo.expect_insert().times(0);

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .create_epic(create_request(None, Some(GridPosition::Top)))
        .await
        .expect_err("root must be centred");

    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[rstest]
#[tokio::test]
async fn create_child_takes_lowest_free_slot(clock: Arc<dyn Clock>) {
    let root = make_epic("Health", None, GridPosition::Center);
    let first = make_epic("Sleep", Some(&root), GridPosition::TopLeft);
    let second = make_epic("Food", Some(&root), GridPosition::Top);
    let root_id = root.id();

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![root, first, second]);
    repo.expect_insert()
        .withf(|epic| epic.position() == GridPosition::TopRight && epic.depth() == 1)
        .times(1)
        .return_once(|_| Ok(()));

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let epic = service
        .create_epic(create_request(Some(root_id), None))
        .await
        .expect("child created");

    assert_eq!(epic.core_epic_id(), Some(root_id));
}

#[rstest]
#[case::centre(Some(GridPosition::Center), ErrorCode::InvalidRequest)]
#[case::occupied(Some(GridPosition::Top), ErrorCode::Conflict)]
#[tokio::test]
async fn create_child_rejects_unusable_positions(
    clock: Arc<dyn Clock>,
    #[case] position: Option<GridPosition>,
    #[case] expected: ErrorCode,
) {
    let root = make_epic("Health", None, GridPosition::Center);
    let taken = make_epic("Food", Some(&root), GridPosition::Top);
    let root_id = root.id();

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![root, taken]);
    repo.expect_insert().times(0);

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .create_epic(create_request(Some(root_id), position))
        .await
        .expect_err("position rejected");

    assert_eq!(error.code(), expected);
}

#[rstest]
#[tokio::test]
async fn ninth_child_exceeds_capacity(clock: Arc<dyn Clock>) {
    let root = make_epic("Health", None, GridPosition::Center);
    let root_id = root.id();
    let mut epics: Vec<Epic> = GridPosition::SURROUNDING
        .iter()
        .map(|slot| make_epic("child", Some(&root), *slot))
        .collect();
    epics.push(root);

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, epics);
    repo.expect_insert().times(0);

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .create_epic(create_request(Some(root_id), None))
        .await
        .expect_err("grid full");

    assert_eq!(error.code(), ErrorCode::CapacityExceeded);
}

#[rstest]
#[tokio::test]
async fn create_child_of_missing_parent_is_not_found(clock: Arc<dyn Clock>) {
    let mut repo = MockEpicRepository::new();
    repo.expect_find_by_id().times(1).return_once(|_| Ok(None));
    repo.expect_insert().times(0);

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .create_epic(create_request(Some(EpicId::random()), None))
        .await
        .expect_err("parent missing");

    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn store_conflict_maps_to_conflict(clock: Arc<dyn Clock>) {
    let mut repo = MockEpicRepository::new();
    repo.expect_insert()
        .times(1)
        .return_once(|_| Err(EpicRepositoryError::conflict("duplicate slot")));

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .create_epic(create_request(None, None))
        .await
        .expect_err("conflict surfaces");

    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn connection_failure_maps_to_service_unavailable(clock: Arc<dyn Clock>) {
    let mut repo = MockEpicRepository::new();
    repo.expect_find_by_id()
        .times(1)
        .return_once(|_| Err(EpicRepositoryError::connection("pool exhausted")));

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .get_epic(EpicId::random())
        .await
        .expect_err("store down");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[rstest]
#[tokio::test]
async fn reparenting_under_own_descendant_is_rejected(clock: Arc<dyn Clock>) {
    let root = make_epic("Health", None, GridPosition::Center);
    let child = make_epic("Exercise", Some(&root), GridPosition::Top);
    let grandchild = make_epic("Run", Some(&child), GridPosition::Left);
    let root_id = root.id();
    let grandchild_id = grandchild.id();

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![root, child, grandchild]);
    repo.expect_update_many().times(0);

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .update_epic(UpdateEpicRequest {
            epic_id: root_id,
            patch: EpicPatch {
                core_epic_id: Some(Some(grandchild_id)),
                ..EpicPatch::default()
            },
        })
        .await
        .expect_err("cycle rejected");

    assert_eq!(error.code(), ErrorCode::InvalidOperation);
}

#[rstest]
#[tokio::test]
async fn self_parenting_is_rejected(clock: Arc<dyn Clock>) {
    let root = make_epic("Health", None, GridPosition::Center);
    let root_id = root.id();

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![root]);
    repo.expect_update_many().times(0);

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let error = service
        .update_epic(UpdateEpicRequest {
            epic_id: root_id,
            patch: EpicPatch {
                core_epic_id: Some(Some(root_id)),
                ..EpicPatch::default()
            },
        })
        .await
        .expect_err("self parent rejected");

    assert_eq!(error.code(), ErrorCode::InvalidOperation);
}

#[rstest]
#[tokio::test]
async fn reparenting_shifts_descendant_depths(clock: Arc<dyn Clock>) {
    let health = make_epic("Health", None, GridPosition::Center);
    let life = make_epic("Life", None, GridPosition::Center);
    let work = make_epic("Work", Some(&life), GridPosition::Right);
    let exercise = make_epic("Exercise", Some(&health), GridPosition::Top);
    let run = make_epic("Run", Some(&exercise), GridPosition::Left);
    let (work_id, exercise_id, run_id) = (work.id(), exercise.id(), run.id());
    let work_child = make_epic("Email", Some(&work), GridPosition::Top);

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![health, life, work, exercise, run, work_child]);
    repo.expect_update_many()
        .withf(move |epics| {
            let depth_of = |id: EpicId| epics.iter().find(|e| e.id() == id).map(Epic::depth);
            epics.len() == 2 && depth_of(exercise_id) == Some(2) && depth_of(run_id) == Some(3)
        })
        .times(1)
        .return_once(|_| Ok(()));

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let moved = service
        .update_epic(UpdateEpicRequest {
            epic_id: exercise_id,
            patch: EpicPatch {
                core_epic_id: Some(Some(work_id)),
                ..EpicPatch::default()
            },
        })
        .await
        .expect("move succeeds");

    // Slot 2 is taken under the new parent, so the lowest free slot is used.
    assert_eq!(moved.position(), GridPosition::TopLeft);
    assert_eq!(moved.core_epic_id(), Some(work_id));
}

#[rstest]
#[tokio::test]
async fn promoting_to_root_recentres(clock: Arc<dyn Clock>) {
    let health = make_epic("Health", None, GridPosition::Center);
    let exercise = make_epic("Exercise", Some(&health), GridPosition::Right);
    let exercise_id = exercise.id();

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![health, exercise]);
    repo.expect_update_many()
        .times(1)
        .return_once(|_| Ok(()));

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let promoted = service
        .update_epic(UpdateEpicRequest {
            epic_id: exercise_id,
            patch: EpicPatch {
                core_epic_id: Some(None),
                ..EpicPatch::default()
            },
        })
        .await
        .expect("promotion succeeds");

    assert_eq!(promoted.depth(), 0);
    assert_eq!(promoted.position(), GridPosition::Center);
}

#[rstest]
#[tokio::test]
async fn delete_removes_children_before_parents(clock: Arc<dyn Clock>) {
    let root = make_epic("Health", None, GridPosition::Center);
    let child = make_epic("Exercise", Some(&root), GridPosition::Top);
    let grandchild = make_epic("Run", Some(&child), GridPosition::Left);
    let ids = [root.id(), child.id(), grandchild.id()];

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![root, child, grandchild]);
    repo.expect_delete_many()
        .withf(move |order, detached_at| {
            order == [ids[2], ids[1], ids[0]] && *detached_at == fixture_timestamp()
        })
        .times(1)
        .return_once(|order, _| Ok(order.len() as u64));

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let response = service.delete_epic(ids[0]).await.expect("delete succeeds");

    assert_eq!(response.removed_count, 3);
    assert_eq!(response.epic.id(), ids[0]);
}

#[rstest]
#[tokio::test]
async fn get_epic_nests_whole_subtree(clock: Arc<dyn Clock>) {
    let root = make_epic("Health", None, GridPosition::Center);
    let child = make_epic("Exercise", Some(&root), GridPosition::Top);
    let grandchild = make_epic("Run", Some(&child), GridPosition::Left);
    let root_id = root.id();

    let mut repo = MockEpicRepository::new();
    backed_by(&mut repo, vec![root, child, grandchild]);

    let service = EpicTreeService::new(Arc::new(repo), clock);
    let tree = service.get_epic(root_id).await.expect("tree loads");

    assert_eq!(tree.subtree_size(), 3);
    let exercise = tree.subs.first().expect("child present");
    assert_eq!(exercise.subs.len(), 1);
}
