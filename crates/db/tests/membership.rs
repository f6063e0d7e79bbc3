//! Membership roles and the array-scan authorization model.

use db::models::{
    project::{Project, ProjectMember, ProjectRole},
    user::{CreateUser, User},
};
use db::test_utils::{create_test_pool, seed_board};

async fn add_user(pool: &sqlx::SqlitePool, name: &str) -> User {
    User::create(
        pool,
        &CreateUser {
            email: format!("{name}@example.com"),
            username: name.to_string(),
            password_hash: "x".to_string(),
            avatar_url: None,
        },
    )
    .await
    .expect("create user")
}

#[tokio::test]
async fn creator_becomes_owner() {
    let (pool, _tmp) = create_test_pool().await;
    let (user, project, _, _) = seed_board(&pool).await;

    let role = ProjectMember::role_for(&pool, project.id, user.id)
        .await
        .unwrap();
    assert_eq!(role, Some(ProjectRole::Owner));
    assert_eq!(ProjectMember::owner_count(&pool, project.id).await.unwrap(), 1);
}

#[tokio::test]
async fn non_member_has_no_role() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, project, _, _) = seed_board(&pool).await;
    let outsider = add_user(&pool, "outsider").await;

    let role = ProjectMember::role_for(&pool, project.id, outsider.id)
        .await
        .unwrap();
    assert_eq!(role, None);
}

#[tokio::test]
async fn add_and_promote_member() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, project, _, _) = seed_board(&pool).await;
    let bob = add_user(&pool, "bob").await;

    let member = ProjectMember::add(&pool, project.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    assert_eq!(member.role, ProjectRole::Member);
    assert!(!member.role.can_manage_members());

    let promoted = ProjectMember::set_role(&pool, project.id, bob.id, ProjectRole::Admin)
        .await
        .unwrap();
    assert!(promoted.role.can_manage_members());

    let members = ProjectMember::find_by_project_id(&pool, project.id)
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn duplicate_membership_rejected() {
    let (pool, _tmp) = create_test_pool().await;
    let (user, project, _, _) = seed_board(&pool).await;

    // Creator is already enrolled by Project::create.
    let err = ProjectMember::add(&pool, project.id, user.id, ProjectRole::Member).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn removing_member_leaves_project_intact() {
    let (pool, _tmp) = create_test_pool().await;
    let (_, project, _, _) = seed_board(&pool).await;
    let bob = add_user(&pool, "bob").await;

    ProjectMember::add(&pool, project.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    let removed = ProjectMember::remove(&pool, project.id, bob.id)
        .await
        .unwrap();
    assert_eq!(removed, 1);

    assert!(Project::find_by_id(&pool, project.id).await.unwrap().is_some());
    assert_eq!(
        ProjectMember::find_by_project_id(&pool, project.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn deleting_project_cascades_membership() {
    let (pool, _tmp) = create_test_pool().await;
    let (user, project, _, _) = seed_board(&pool).await;

    Project::delete(&pool, project.id).await.unwrap();

    let role = ProjectMember::role_for(&pool, project.id, user.id)
        .await
        .unwrap();
    assert_eq!(role, None);
}

#[tokio::test]
async fn projects_listed_for_member_only() {
    let (pool, _tmp) = create_test_pool().await;
    let (owner, project, _, _) = seed_board(&pool).await;
    let bob = add_user(&pool, "bob").await;

    assert_eq!(Project::find_for_user(&pool, owner.id).await.unwrap().len(), 1);
    assert!(Project::find_for_user(&pool, bob.id).await.unwrap().is_empty());

    ProjectMember::add(&pool, project.id, bob.id, ProjectRole::Member)
        .await
        .unwrap();
    assert_eq!(Project::find_for_user(&pool, bob.id).await.unwrap().len(), 1);
}
