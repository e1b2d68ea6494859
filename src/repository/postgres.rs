use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::Repository;
use crate::{
    errors::{AppError, FieldErrors},
    models::{
        CatalogItem, CatalogKind, CatalogRow, Comment, CreateReviewRequest, NewUser, PageRequest,
        Review, TitleFilter, TitleResponse, TitleWrite, UpdateCommentRequest, UpdateReviewRequest,
        UpdateTitleRequest, UpdateUserRequest, User,
    },
};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, bio, role, is_staff, confirmation_digest";

// Rating is computed per read so it always reflects the current reviews.
const TITLE_SELECT: &str = r#"
    SELECT
        t.id, t.name, t.year, t.description,
        (SELECT AVG(r.score)::float8 FROM reviews r WHERE r.title_id = t.id) AS rating,
        c.id AS category_id, c.name AS category_name, c.slug AS category_slug
    FROM titles t
    LEFT JOIN categories c ON c.id = t.category_id
"#;

const TITLE_COUNT: &str =
    "SELECT COUNT(*) FROM titles t LEFT JOIN categories c ON c.id = t.category_id";

const REVIEW_SELECT: &str = r#"
    SELECT r.id, r.title_id, r.author_id, u.username AS author, r.text, r.score, r.pub_date
    FROM reviews r
    JOIN users u ON u.id = r.author_id
"#;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.review_id, c.author_id, u.username AS author, c.text, c.pub_date
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

#[derive(FromRow)]
struct TitleRow {
    id: i64,
    name: String,
    year: i32,
    description: Option<String>,
    rating: Option<f64>,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_slug: Option<String>,
}

#[derive(FromRow)]
struct TitleGenreRow {
    title_id: i64,
    id: i64,
    name: String,
    slug: String,
}

/// Escapes LIKE wildcards in user input and wraps it for a substring match.
fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_title_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &TitleFilter) {
    builder.push(" WHERE TRUE");
    if let Some(genre) = &filter.genre {
        builder.push(
            " AND EXISTS (SELECT 1 FROM title_genres tg JOIN genres g ON g.id = tg.genre_id \
             WHERE tg.title_id = t.id AND g.slug = ",
        );
        builder.push_bind(genre.clone());
        builder.push(")");
    }
    if let Some(category) = &filter.category {
        builder.push(" AND c.slug = ");
        builder.push_bind(category.clone());
    }
    if let Some(name) = &filter.name {
        builder.push(" AND t.name ILIKE ");
        builder.push_bind(like_pattern(name));
    }
    if let Some(year) = filter.year {
        builder.push(" AND t.year = ");
        builder.push_bind(year);
    }
}

fn push_catalog_search(
    builder: &mut QueryBuilder<'_, Postgres>,
    kind: CatalogKind,
    search: &Option<String>,
) {
    if let Some(term) = search {
        match kind {
            CatalogKind::Category => {
                builder.push(" WHERE name ILIKE ");
                builder.push_bind(like_pattern(term));
            }
            CatalogKind::Genre => {
                builder.push(" WHERE LOWER(name) = LOWER(");
                builder.push_bind(term.clone());
                builder.push(")");
            }
        }
    }
}

/// Looks up a category id by slug inside the caller's transaction.
async fn resolve_category(conn: &mut PgConnection, slug: &str) -> Result<i64, AppError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::field("category", format!("Object with slug={slug} does not exist."))
        })
}

/// Looks up genre ids by slug, reporting every unknown slug at once.
async fn resolve_genres(conn: &mut PgConnection, slugs: &[String]) -> Result<Vec<i64>, AppError> {
    let mut wanted: Vec<String> = slugs.to_vec();
    wanted.sort();
    wanted.dedup();

    let found: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, slug FROM genres WHERE slug = ANY($1)")
            .bind(&wanted)
            .fetch_all(&mut *conn)
            .await?;

    let mut errors = FieldErrors::new();
    for slug in &wanted {
        if !found.iter().any(|(_, s)| s == slug) {
            errors.add("genre", format!("Object with slug={slug} does not exist."));
        }
    }
    errors.into_result()?;

    Ok(found.into_iter().map(|(id, _)| id).collect())
}

async fn link_genres(
    conn: &mut PgConnection,
    title_id: i64,
    genre_ids: &[i64],
) -> Result<(), AppError> {
    if genre_ids.is_empty() {
        return Ok(());
    }
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO title_genres (title_id, genre_id) ");
    builder.push_values(genre_ids.iter(), |mut row, genre_id| {
        row.push_bind(title_id).push_bind(*genre_id);
    });
    builder.build().execute(&mut *conn).await?;
    Ok(())
}

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime (`query_as::<_, T>`)
/// so the crate builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Expands title rows with their genres, preserving row order.
    async fn with_genres(&self, rows: Vec<TitleRow>) -> Result<Vec<TitleResponse>, AppError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let links = if ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, TitleGenreRow>(
                r#"
                SELECT tg.title_id, g.id, g.name, g.slug
                FROM title_genres tg
                JOIN genres g ON g.id = tg.genre_id
                WHERE tg.title_id = ANY($1)
                ORDER BY g.name, g.id
                "#,
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?
        };

        let mut genres: HashMap<i64, Vec<CatalogItem>> = HashMap::new();
        for link in links {
            genres.entry(link.title_id).or_default().push(CatalogItem {
                id: link.id,
                name: link.name,
                slug: link.slug,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let category = match (row.category_id, row.category_name, row.category_slug) {
                    (Some(id), Some(name), Some(slug)) => Some(CatalogItem { id, name, slug }),
                    _ => None,
                };
                TitleResponse {
                    genre: genres.remove(&row.id).unwrap_or_default(),
                    id: row.id,
                    name: row.name,
                    year: row.year,
                    rating: row.rating,
                    description: row.description,
                    category,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(
        &self,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), AppError> {
        let pattern = search.as_deref().map(like_pattern);

        let mut count: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users");
        if let Some(p) = &pattern {
            count.push(" WHERE username ILIKE ");
            count.push_bind(p.clone());
        }
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        if let Some(p) = pattern {
            builder.push(" WHERE username ILIKE ");
            builder.push_bind(p);
        }
        builder.push(" ORDER BY username LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok((users, total))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, first_name, last_name, bio, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(username = %created.username, role = %created.role, "User created");
        Ok(created)
    }

    /// Uses `COALESCE` so that only the provided fields change. `bio` is nullable and carries a
    /// separate "present" flag.
    async fn update_user(
        &self,
        id: Uuid,
        patch: UpdateUserRequest,
    ) -> Result<Option<User>, AppError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = COALESCE($2, username),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                bio = CASE WHEN $6 THEN $7 ELSE bio END,
                role = COALESCE($8, role)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.username)
        .bind(patch.email)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.bio.is_some())
        .bind(patch.bio.flatten())
        .bind(patch.role.map(|role| role.as_str()))
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- CONFIRMATION CODES ---

    async fn set_confirmation_digest(&self, user_id: Uuid, digest: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET confirmation_digest = $2 WHERE id = $1")
            .bind(user_id)
            .bind(digest)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// A single conditional UPDATE, so two concurrent exchanges of one code cannot both win.
    async fn consume_confirmation_digest(
        &self,
        user_id: Uuid,
        digest: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET confirmation_digest = NULL WHERE id = $1 AND confirmation_digest = $2",
        )
        .bind(user_id)
        .bind(digest)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- CATEGORIES & GENRES ---

    async fn list_catalog(
        &self,
        kind: CatalogKind,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<(Vec<CatalogItem>, i64), AppError> {
        let mut count: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", kind.table()));
        push_catalog_search(&mut count, kind, &search);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT id, name, slug FROM {}", kind.table()));
        push_catalog_search(&mut builder, kind, &search);
        builder.push(" ORDER BY name, id LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let items = builder
            .build_query_as::<CatalogItem>()
            .fetch_all(&self.pool)
            .await?;
        Ok((items, total))
    }

    async fn create_catalog(
        &self,
        kind: CatalogKind,
        name: String,
        slug: String,
    ) -> Result<CatalogItem, AppError> {
        let item = sqlx::query_as::<_, CatalogItem>(&format!(
            "INSERT INTO {} (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
            kind.table()
        ))
        .bind(name)
        .bind(slug)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn delete_catalog(&self, kind: CatalogKind, slug: &str) -> Result<bool, AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE slug = $1", kind.table()))
            .bind(slug)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One multi-row INSERT, then the id sequence is moved past any explicit ids.
    async fn import_catalog(
        &self,
        kind: CatalogKind,
        rows: Vec<CatalogRow>,
    ) -> Result<u64, AppError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let table = kind.table();
        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} (id, name, slug) "));
        builder.push_values(rows, |mut values, row| {
            match row.id {
                Some(id) => values.push_bind(id),
                None => values.push("DEFAULT"),
            };
            values.push_bind(row.name).push_bind(row.slug);
        });
        let inserted = builder.build().execute(&mut *tx).await?.rows_affected();

        sqlx::query(&format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), \
             COALESCE((SELECT MAX(id) FROM {table}), 0) + 1, false)"
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    // --- TITLES ---

    async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> Result<(Vec<TitleResponse>, i64), AppError> {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new(TITLE_COUNT);
        push_title_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(TITLE_SELECT);
        push_title_filters(&mut builder, filter);
        builder.push(" ORDER BY t.id LIMIT ");
        builder.push_bind(page.limit);
        builder.push(" OFFSET ");
        builder.push_bind(page.offset);

        let rows = builder
            .build_query_as::<TitleRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok((self.with_genres(rows).await?, total))
    }

    async fn get_title(&self, id: i64) -> Result<Option<TitleResponse>, AppError> {
        let row = sqlx::query_as::<_, TitleRow>(&format!("{TITLE_SELECT} WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.with_genres(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Slug resolution, the title row and its genre links share one transaction.
    async fn create_title(&self, title: TitleWrite) -> Result<TitleResponse, AppError> {
        let mut tx = self.pool.begin().await?;

        let category_id = match title.category.as_deref() {
            Some(slug) => Some(resolve_category(&mut tx, slug).await?),
            None => None,
        };
        let genre_ids = resolve_genres(&mut tx, &title.genre).await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO titles (name, year, description, category_id) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&title.name)
        .bind(title.year)
        .bind(&title.description)
        .bind(category_id)
        .fetch_one(&mut *tx)
        .await?;

        link_genres(&mut tx, id, &genre_ids).await?;
        tx.commit().await?;

        tracing::info!(title_id = id, name = %title.name, "Title created");
        self.get_title(id).await?.ok_or(AppError::NotFound("Title"))
    }

    async fn update_title(
        &self,
        id: i64,
        patch: UpdateTitleRequest,
    ) -> Result<Option<TitleResponse>, AppError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM titles WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let category_id = match &patch.category {
            Some(Some(slug)) => Some(resolve_category(&mut tx, slug).await?),
            _ => None,
        };

        // Nullable columns take a "present" flag so that an explicit null clears them.
        sqlx::query(
            r#"
            UPDATE titles
            SET name = COALESCE($2, name),
                year = COALESCE($3, year),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                category_id = CASE WHEN $6 THEN $7 ELSE category_id END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.year)
        .bind(patch.description.is_some())
        .bind(patch.description.as_ref().and_then(|text| text.as_deref()))
        .bind(patch.category.is_some())
        .bind(category_id)
        .execute(&mut *tx)
        .await?;

        if let Some(genre) = &patch.genre {
            let genre_ids = resolve_genres(&mut tx, genre).await?;
            sqlx::query("DELETE FROM title_genres WHERE title_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_genres(&mut tx, id, &genre_ids).await?;
        }

        tx.commit().await?;
        self.get_title(id).await
    }

    async fn delete_title(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM titles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- REVIEWS ---

    async fn list_reviews(
        &self,
        title_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Review>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE title_id = $1")
            .bind(title_id)
            .fetch_one(&self.pool)
            .await?;
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 ORDER BY r.pub_date DESC, r.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(title_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok((reviews, total))
    }

    async fn get_review(&self, title_id: i64, review_id: i64) -> Result<Option<Review>, AppError> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "{REVIEW_SELECT} WHERE r.title_id = $1 AND r.id = $2"
        ))
        .bind(title_id)
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    /// Insert and author join in one CTE. The `(title_id, author_id)` unique constraint
    /// rejects a second review.
    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        review: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        let created = sqlx::query_as::<_, Review>(
            r#"
            WITH inserted AS (
                INSERT INTO reviews (title_id, author_id, text, score)
                VALUES ($1, $2, $3, $4)
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT i.id, i.title_id, i.author_id, u.username AS author, i.text, i.score, i.pub_date
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(title_id)
        .bind(author_id)
        .bind(review.text)
        .bind(review.score)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_review(
        &self,
        review_id: i64,
        patch: UpdateReviewRequest,
    ) -> Result<Option<Review>, AppError> {
        let updated = sqlx::query_as::<_, Review>(
            r#"
            WITH updated AS (
                UPDATE reviews
                SET text = COALESCE($2, text),
                    score = COALESCE($3, score)
                WHERE id = $1
                RETURNING id, title_id, author_id, text, score, pub_date
            )
            SELECT x.id, x.title_id, x.author_id, u.username AS author, x.text, x.score, x.pub_date
            FROM updated x JOIN users u ON u.id = x.author_id
            "#,
        )
        .bind(review_id)
        .bind(patch.text)
        .bind(patch.score)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_review(&self, review_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(review_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn list_comments(
        &self,
        review_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Comment>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE review_id = $1")
            .bind(review_id)
            .fetch_one(&self.pool)
            .await?;
        let comments = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 ORDER BY c.pub_date DESC, c.id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(review_id)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;
        Ok((comments, total))
    }

    async fn get_comment(
        &self,
        review_id: i64,
        comment_id: i64,
    ) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "{COMMENT_SELECT} WHERE c.review_id = $1 AND c.id = $2"
        ))
        .bind(review_id)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn create_comment(
        &self,
        review_id: i64,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, AppError> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (review_id, author_id, text)
                VALUES ($1, $2, $3)
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT i.id, i.review_id, i.author_id, u.username AS author, i.text, i.pub_date
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(review_id)
        .bind(author_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        patch: UpdateCommentRequest,
    ) -> Result<Option<Comment>, AppError> {
        let updated = sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments
                SET text = COALESCE($2, text)
                WHERE id = $1
                RETURNING id, review_id, author_id, text, pub_date
            )
            SELECT x.id, x.review_id, x.author_id, u.username AS author, x.text, x.pub_date
            FROM updated x JOIN users u ON u.id = x.author_id
            "#,
        )
        .bind(comment_id)
        .bind(patch.text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
