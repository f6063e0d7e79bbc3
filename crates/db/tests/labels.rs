//! Label junction maintenance: attach, detach, replace-set.

use db::models::{
    label::{CreateLabel, Label},
    task::{CreateTask, Task},
};
use db::test_utils::{create_test_pool, seed_board};

async fn add_label(pool: &sqlx::SqlitePool, project_id: uuid::Uuid, name: &str) -> Label {
    Label::create(
        pool,
        project_id,
        &CreateLabel {
            name: name.to_string(),
            color: "#3b82f6".to_string(),
        },
    )
    .await
    .expect("create label")
}

#[tokio::test]
async fn attach_and_detach_single_label() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, project, _, list) = seed_board(&pool).await;

    let task = Task::create(
        &pool,
        list.id,
        &CreateTask {
            title: "t".to_string(),
            description: None,
            due_date: None,
            assignee_id: None,
        },
    )
    .await
    .unwrap();
    let urgent = add_label(&pool, project.id, "urgent").await;

    Label::attach_to_task(&pool, task.id, urgent.id).await.unwrap();
    // Attaching twice is a no-op, not an error.
    Label::attach_to_task(&pool, task.id, urgent.id).await.unwrap();

    let attached = Label::find_by_task_id(&pool, task.id).await.unwrap();
    assert_eq!(attached.len(), 1);
    assert_eq!(attached[0].id, urgent.id);

    let removed = Label::detach_from_task(&pool, task.id, urgent.id).await.unwrap();
    assert_eq!(removed, 1);
    assert!(Label::find_by_task_id(&pool, task.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn set_task_labels_replaces_the_set() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, project, _, list) = seed_board(&pool).await;

    let task = Task::create(
        &pool,
        list.id,
        &CreateTask {
            title: "t".to_string(),
            description: None,
            due_date: None,
            assignee_id: None,
        },
    )
    .await
    .unwrap();
    let a = add_label(&pool, project.id, "a").await;
    let b = add_label(&pool, project.id, "b").await;
    let c = add_label(&pool, project.id, "c").await;

    Label::set_task_labels(&pool, task.id, &[a.id, b.id]).await.unwrap();
    let labels = Label::set_task_labels(&pool, task.id, &[b.id, c.id]).await.unwrap();

    let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["b", "c"]);
}

#[tokio::test]
async fn deleting_a_label_clears_its_junction_rows() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, project, _, list) = seed_board(&pool).await;

    let task = Task::create(
        &pool,
        list.id,
        &CreateTask {
            title: "t".to_string(),
            description: None,
            due_date: None,
            assignee_id: None,
        },
    )
    .await
    .unwrap();
    let label = add_label(&pool, project.id, "gone").await;
    Label::attach_to_task(&pool, task.id, label.id).await.unwrap();

    Label::delete(&pool, label.id).await.unwrap();
    assert!(Label::find_by_task_id(&pool, task.id).await.unwrap().is_empty());
}
