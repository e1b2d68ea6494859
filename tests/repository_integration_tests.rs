//! Runs the Postgres repository against a live database. Every test returns early when
//! `DATABASE_URL` is not set. Names carry a random suffix so runs do not collide.

use sqlx::PgPool;
use uuid::Uuid;
use yamdb_api::{
    AppError,
    models::{
        CatalogKind, CatalogRow, CreateReviewRequest, NewUser, PageRequest, Role, TitleFilter,
        TitleWrite, UpdateTitleRequest, UpdateUserRequest, User,
    },
    repository::{PostgresRepository, Repository},
};

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();
        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres repository test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

async fn create_test_user(repo: &PostgresRepository, role: Role) -> User {
    let name = format!("user_{}", suffix());
    repo.create_user(NewUser {
        email: format!("{name}@test.com"),
        username: name,
        role,
        ..NewUser::default()
    })
    .await
    .expect("create user")
}

async fn create_catalog_entry(repo: &PostgresRepository, kind: CatalogKind) -> String {
    let slug = format!("s-{}", suffix());
    repo.create_catalog(kind, format!("Name {slug}"), slug.clone())
        .await
        .expect("create catalog entry");
    slug
}

// --- Tests ---

#[tokio::test]
async fn test_user_uniqueness_maps_to_field_errors() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::User).await;

    let err = repo
        .create_user(NewUser {
            username: user.username.clone(),
            email: format!("other_{}@test.com", suffix()),
            ..NewUser::default()
        })
        .await
        .unwrap_err();
    match err {
        AppError::Validation(fields) => assert!(fields.get("username").is_some()),
        other => panic!("expected validation error, got {other:?}"),
    }

    let updated = repo
        .update_user(
            user.id,
            UpdateUserRequest {
                bio: Some(Some("hello".into())),
                role: Some(Role::Moderator),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.bio.as_deref(), Some("hello"));
    assert_eq!(updated.role, Role::Moderator);
    assert_eq!(updated.email, user.email);
}

#[tokio::test]
async fn test_confirmation_digest_is_consumed_once() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::User).await;

    repo.set_confirmation_digest(user.id, "first").await.unwrap();
    repo.set_confirmation_digest(user.id, "second").await.unwrap();

    assert!(!repo.consume_confirmation_digest(user.id, "first").await.unwrap());
    assert!(repo.consume_confirmation_digest(user.id, "second").await.unwrap());
    assert!(!repo.consume_confirmation_digest(user.id, "second").await.unwrap());
}

#[tokio::test]
async fn test_title_lifecycle_with_rating() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let category = create_catalog_entry(&repo, CatalogKind::Category).await;
    let genre = create_catalog_entry(&repo, CatalogKind::Genre).await;

    let title = repo
        .create_title(TitleWrite {
            name: format!("Title {}", suffix()),
            year: 1999,
            description: None,
            category: Some(category.clone()),
            genre: vec![genre.clone()],
        })
        .await
        .unwrap();
    assert_eq!(title.rating, None);
    assert_eq!(title.category.as_ref().map(|c| c.slug.as_str()), Some(category.as_str()));
    assert_eq!(title.genre.len(), 1);

    for score in [3, 8] {
        let author = create_test_user(&repo, Role::User).await;
        repo.create_review(
            title.id,
            author.id,
            CreateReviewRequest {
                text: "ok".into(),
                score,
            },
        )
        .await
        .unwrap();
    }
    let fetched = repo.get_title(title.id).await.unwrap().unwrap();
    assert_eq!(fetched.rating, Some(5.5));

    let filter = TitleFilter {
        genre: Some(genre.clone()),
        ..Default::default()
    };
    let (found, count) = repo
        .list_titles(&filter, PageRequest::new(None, 10))
        .await
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(found[0].id, title.id);

    // Deleting the category keeps the title.
    assert!(repo.delete_catalog(CatalogKind::Category, &category).await.unwrap());
    let orphan = repo.get_title(title.id).await.unwrap().unwrap();
    assert!(orphan.category.is_none());

    assert!(repo.delete_title(title.id).await.unwrap());
    let (_, reviews) = repo
        .list_reviews(title.id, PageRequest::new(None, 10))
        .await
        .unwrap();
    assert_eq!(reviews, 0);
}

#[tokio::test]
async fn test_unknown_slugs_roll_back_title_creation() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let name = format!("Ghost {}", suffix());

    let err = repo
        .create_title(TitleWrite {
            name: name.clone(),
            year: 2000,
            description: None,
            category: None,
            genre: vec!["no-such-genre-slug".into()],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let filter = TitleFilter {
        name: Some(name),
        ..Default::default()
    };
    let (_, count) = repo
        .list_titles(&filter, PageRequest::new(None, 10))
        .await
        .unwrap();
    assert_eq!(count, 0);

    let patched = repo
        .update_title(-1, UpdateTitleRequest::default())
        .await
        .unwrap();
    assert!(patched.is_none());
}

#[tokio::test]
async fn test_duplicate_review_violates_constraint() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let genre = create_catalog_entry(&repo, CatalogKind::Genre).await;
    let title = repo
        .create_title(TitleWrite {
            name: format!("Dup {}", suffix()),
            year: 2010,
            description: None,
            category: None,
            genre: vec![genre],
        })
        .await
        .unwrap();
    let author = create_test_user(&repo, Role::User).await;
    let review = || CreateReviewRequest {
        text: "again".into(),
        score: 5,
    };

    repo.create_review(title.id, author.id, review()).await.unwrap();
    let err = repo
        .create_review(title.id, author.id, review())
        .await
        .unwrap_err();
    match err {
        AppError::Validation(fields) => assert!(fields.get("non_field_errors").is_some()),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_import_advances_sequence() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let high_id = 1_000_000 + rand_id();
    let slug = format!("imp-{}", suffix());

    let inserted = repo
        .import_catalog(
            CatalogKind::Genre,
            vec![CatalogRow {
                id: Some(high_id),
                name: "Imported".into(),
                slug,
            }],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    let next = repo
        .create_catalog(CatalogKind::Genre, "After".into(), format!("after-{}", suffix()))
        .await
        .unwrap();
    assert!(next.id > high_id);

    assert_eq!(
        repo.import_catalog(CatalogKind::Genre, vec![]).await.unwrap(),
        0
    );
}

fn rand_id() -> i64 {
    (Uuid::new_v4().as_u128() % 1_000_000) as i64
}

#[tokio::test]
async fn test_title_patch_distinguishes_null_from_absent() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let repo = ctx.repository();
    let category = create_catalog_entry(&repo, CatalogKind::Category).await;
    let genre = create_catalog_entry(&repo, CatalogKind::Genre).await;
    let title = repo
        .create_title(TitleWrite {
            name: format!("Nullable {}", suffix()),
            year: 2001,
            description: Some("Kept".into()),
            category: Some(category.clone()),
            genre: vec![genre],
        })
        .await
        .unwrap();

    let untouched = repo
        .update_title(
            title.id,
            UpdateTitleRequest {
                year: Some(2002),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.description.as_deref(), Some("Kept"));
    assert!(untouched.category.is_some());

    let cleared = repo
        .update_title(
            title.id,
            UpdateTitleRequest {
                description: Some(None),
                category: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cleared.year, 2002);
    assert!(cleared.description.is_none());
    assert!(cleared.category.is_none());

    let user = create_test_user(&repo, Role::User).await;
    repo.update_user(
        user.id,
        UpdateUserRequest {
            bio: Some(Some("temporary".into())),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let user = repo
        .update_user(
            user.id,
            UpdateUserRequest {
                bio: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(user.bio.is_none());
}
