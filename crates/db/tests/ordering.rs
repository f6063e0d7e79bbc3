//! Position renumbering for lists and tasks: the persistence half of
//! drag-and-drop.

use db::models::{
    list::{BoardList, CreateList},
    task::{CreateTask, Task},
};
use db::test_utils::{create_test_pool, seed_board};

async fn add_task(pool: &sqlx::SqlitePool, list_id: uuid::Uuid, title: &str) -> Task {
    Task::create(
        pool,
        list_id,
        &CreateTask {
            title: title.to_string(),
            description: None,
            due_date: None,
            assignee_id: None,
        },
    )
    .await
    .expect("create task")
}

#[tokio::test]
async fn tasks_append_to_end_of_list() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, _, _, list) = seed_board(&pool).await;

    let a = add_task(&pool, list.id, "a").await;
    let b = add_task(&pool, list.id, "b").await;
    let c = add_task(&pool, list.id, "c").await;

    assert_eq!(a.position, 0);
    assert_eq!(b.position, 1);
    assert_eq!(c.position, 2);
}

#[tokio::test]
async fn move_within_list_shifts_neighbours() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, _, _, list) = seed_board(&pool).await;

    let a = add_task(&pool, list.id, "a").await;
    let b = add_task(&pool, list.id, "b").await;
    let c = add_task(&pool, list.id, "c").await;

    // c -> front
    let moved = Task::move_to_list(&pool, c.id, list.id, 0).await.unwrap();
    assert_eq!(moved.position, 0);

    let tasks = Task::find_by_list_id(&pool, list.id).await.unwrap();
    let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["c", "a", "b"]);
    assert_eq!(
        tasks.iter().map(|t| t.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    // keep ids meaningful
    assert_eq!(tasks[1].id, a.id);
    assert_eq!(tasks[2].id, b.id);
}

#[tokio::test]
async fn move_across_lists_renumbers_both() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, _, board, src) = seed_board(&pool).await;
    let dst = BoardList::create(
        &pool,
        board.id,
        &CreateList {
            name: "Doing".to_string(),
        },
    )
    .await
    .unwrap();

    let a = add_task(&pool, src.id, "a").await;
    let _b = add_task(&pool, src.id, "b").await;
    let x = add_task(&pool, dst.id, "x").await;

    let moved = Task::move_to_list(&pool, a.id, dst.id, 0).await.unwrap();
    assert_eq!(moved.list_id, dst.id);
    assert_eq!(moved.position, 0);

    let src_tasks = Task::find_by_list_id(&pool, src.id).await.unwrap();
    assert_eq!(src_tasks.len(), 1);
    assert_eq!(src_tasks[0].title, "b");
    assert_eq!(src_tasks[0].position, 0);

    let dst_tasks = Task::find_by_list_id(&pool, dst.id).await.unwrap();
    assert_eq!(
        dst_tasks.iter().map(|t| t.id).collect::<Vec<_>>(),
        vec![a.id, x.id]
    );
}

#[tokio::test]
async fn move_index_past_end_clamps() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, _, _, list) = seed_board(&pool).await;

    let a = add_task(&pool, list.id, "a").await;
    let _b = add_task(&pool, list.id, "b").await;

    let moved = Task::move_to_list(&pool, a.id, list.id, 99).await.unwrap();
    assert_eq!(moved.position, 1); // clamped to last slot

    let tasks = Task::find_by_list_id(&pool, list.id).await.unwrap();
    let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["b", "a"]);
}

#[tokio::test]
async fn list_reorder_within_board() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, _, board, first) = seed_board(&pool).await;

    let second = BoardList::create(
        &pool,
        board.id,
        &CreateList {
            name: "Doing".to_string(),
        },
    )
    .await
    .unwrap();
    let third = BoardList::create(
        &pool,
        board.id,
        &CreateList {
            name: "Done".to_string(),
        },
    )
    .await
    .unwrap();

    let moved = BoardList::reorder(&pool, third.id, 0).await.unwrap();
    assert_eq!(moved.position, 0);

    let lists = BoardList::find_by_board_id(&pool, board.id).await.unwrap();
    assert_eq!(
        lists.iter().map(|l| l.id).collect::<Vec<_>>(),
        vec![third.id, first.id, second.id]
    );
}

#[tokio::test]
async fn deleting_list_cascades_to_tasks() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, _, _, list) = seed_board(&pool).await;

    let task = add_task(&pool, list.id, "doomed").await;
    BoardList::delete(&pool, list.id).await.unwrap();

    assert!(Task::find_by_id(&pool, task.id).await.unwrap().is_none());
}
