use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::Repository;
use crate::{
    errors::{
        AppError, DUPLICATE_REVIEW, EMAIL_TAKEN, FieldErrors, ID_TAKEN, SLUG_TAKEN,
        USERNAME_RESERVED, USERNAME_TAKEN,
    },
    models::{
        CatalogItem, CatalogKind, CatalogRow, Comment, CreateReviewRequest, NewUser, PageRequest,
        Review, TitleFilter, TitleResponse, TitleWrite, UpdateCommentRequest, UpdateReviewRequest,
        UpdateTitleRequest, UpdateUserRequest, User,
    },
};

struct StoredTitle {
    id: i64,
    name: String,
    year: i32,
    description: Option<String>,
    category_id: Option<i64>,
    genre_ids: Vec<i64>,
}

struct StoredReview {
    id: i64,
    title_id: i64,
    author_id: Uuid,
    text: String,
    score: i32,
    pub_date: DateTime<Utc>,
}

struct StoredComment {
    id: i64,
    review_id: i64,
    author_id: Uuid,
    text: String,
    pub_date: DateTime<Utc>,
}

#[derive(Default)]
struct Catalog {
    items: BTreeMap<i64, CatalogItem>,
    next_id: i64,
}

impl Catalog {
    fn allocate_id(&mut self) -> i64 {
        self.next_id = self.next_id.max(self.items.keys().max().copied().unwrap_or(0)) + 1;
        self.next_id
    }

    fn by_slug(&self, slug: &str) -> Option<&CatalogItem> {
        self.items.values().find(|item| item.slug == slug)
    }
}

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<Uuid, User>,
    categories: Catalog,
    genres: Catalog,
    titles: BTreeMap<i64, StoredTitle>,
    next_title_id: i64,
    reviews: BTreeMap<i64, StoredReview>,
    next_review_id: i64,
    comments: BTreeMap<i64, StoredComment>,
    next_comment_id: i64,
}

fn slice<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page_items = items
        .into_iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect();
    (page_items, total)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl MemoryState {
    fn catalog(&self, kind: CatalogKind) -> &Catalog {
        match kind {
            CatalogKind::Category => &self.categories,
            CatalogKind::Genre => &self.genres,
        }
    }

    fn catalog_mut(&mut self, kind: CatalogKind) -> &mut Catalog {
        match kind {
            CatalogKind::Category => &mut self.categories,
            CatalogKind::Genre => &mut self.genres,
        }
    }

    fn username_of(&self, id: Uuid) -> String {
        self.users
            .get(&id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }

    /// Mirrors the `users` unique and check constraints. `except` is the row being updated.
    fn check_user_identity(
        &self,
        username: Option<&str>,
        email: Option<&str>,
        except: Option<Uuid>,
    ) -> Result<(), AppError> {
        let others = self.users.values().filter(|user| Some(user.id) != except);
        let mut errors = FieldErrors::new();
        if let Some(username) = username {
            if username.eq_ignore_ascii_case("me") {
                errors.add("username", USERNAME_RESERVED);
            } else if others.clone().any(|user| user.username == username) {
                errors.add("username", USERNAME_TAKEN);
            }
        }
        if let Some(email) = email {
            if others.clone().any(|user| user.email == email) {
                errors.add("email", EMAIL_TAKEN);
            }
        }
        errors.into_result()
    }

    fn resolve_category(&self, slug: &str) -> Result<i64, AppError> {
        self.categories
            .by_slug(slug)
            .map(|item| item.id)
            .ok_or_else(|| {
                AppError::field("category", format!("Object with slug={slug} does not exist."))
            })
    }

    fn resolve_genres(&self, slugs: &[String]) -> Result<Vec<i64>, AppError> {
        let mut ids = Vec::new();
        let mut errors = FieldErrors::new();
        for slug in slugs {
            match self.genres.by_slug(slug) {
                Some(item) if !ids.contains(&item.id) => ids.push(item.id),
                Some(_) => {}
                None => errors.add("genre", format!("Object with slug={slug} does not exist.")),
            }
        }
        errors.into_result()?;
        Ok(ids)
    }

    fn title_response(&self, title: &StoredTitle) -> TitleResponse {
        let scores: Vec<i32> = self
            .reviews
            .values()
            .filter(|review| review.title_id == title.id)
            .map(|review| review.score)
            .collect();
        let rating = if scores.is_empty() {
            None
        } else {
            Some(scores.iter().map(|s| *s as f64).sum::<f64>() / scores.len() as f64)
        };

        let mut genre: Vec<CatalogItem> = title
            .genre_ids
            .iter()
            .filter_map(|id| self.genres.items.get(id).cloned())
            .collect();
        genre.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        TitleResponse {
            id: title.id,
            name: title.name.clone(),
            year: title.year,
            rating,
            description: title.description.clone(),
            genre,
            category: title
                .category_id
                .and_then(|id| self.categories.items.get(&id).cloned()),
        }
    }

    fn matches(&self, title: &StoredTitle, filter: &TitleFilter) -> bool {
        if let Some(genre) = &filter.genre {
            let linked = title
                .genre_ids
                .iter()
                .filter_map(|id| self.genres.items.get(id))
                .any(|item| &item.slug == genre);
            if !linked {
                return false;
            }
        }
        if let Some(category) = &filter.category {
            let in_category = title
                .category_id
                .and_then(|id| self.categories.items.get(&id))
                .is_some_and(|item| &item.slug == category);
            if !in_category {
                return false;
            }
        }
        if let Some(name) = &filter.name {
            if !contains_ignore_case(&title.name, name) {
                return false;
            }
        }
        filter.year.is_none_or(|year| title.year == year)
    }

    fn review(&self, stored: &StoredReview) -> Review {
        Review {
            id: stored.id,
            title_id: stored.title_id,
            author_id: stored.author_id,
            author: self.username_of(stored.author_id),
            text: stored.text.clone(),
            score: stored.score,
            pub_date: stored.pub_date,
        }
    }

    fn comment(&self, stored: &StoredComment) -> Comment {
        Comment {
            id: stored.id,
            review_id: stored.review_id,
            author_id: stored.author_id,
            author: self.username_of(stored.author_id),
            text: stored.text.clone(),
            pub_date: stored.pub_date,
        }
    }

    fn remove_reviews_where(&mut self, predicate: impl Fn(&StoredReview) -> bool) {
        let doomed: Vec<i64> = self
            .reviews
            .values()
            .filter(|review| predicate(review))
            .map(|review| review.id)
            .collect();
        self.reviews.retain(|id, _| !doomed.contains(id));
        self.comments
            .retain(|_, comment| !doomed.contains(&comment.review_id));
    }
}

/// InMemoryRepository
///
/// Process-local `Repository` used by the router tests and for running the API without a
/// database. It enforces the same constraints and cascades as the SQL schema and reports
/// violations with the same field errors.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the maps half-written in a way that
    // matters to readers, so poisoning is ignored.
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    // --- USERS ---

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state().users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .state()
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list_users(
        &self,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64), AppError> {
        let state = self.state();
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|user| {
                search
                    .as_deref()
                    .is_none_or(|term| contains_ignore_case(&user.username, term))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(slice(users, page))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut state = self.state();
        state.check_user_identity(Some(&user.username), Some(&user.email), None)?;
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: user.bio,
            role: user.role,
            is_staff: false,
            confirmation_digest: None,
        };
        state.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_user(
        &self,
        id: Uuid,
        patch: UpdateUserRequest,
    ) -> Result<Option<User>, AppError> {
        let mut state = self.state();
        if !state.users.contains_key(&id) {
            return Ok(None);
        }
        state.check_user_identity(patch.username.as_deref(), patch.email.as_deref(), Some(id))?;

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = patch.username {
            user.username = username;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(bio) = patch.bio {
            user.bio = bio;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut state = self.state();
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.comments.retain(|_, comment| comment.author_id != id);
        state.remove_reviews_where(|review| review.author_id == id);
        Ok(true)
    }

    // --- CONFIRMATION CODES ---

    async fn set_confirmation_digest(&self, user_id: Uuid, digest: &str) -> Result<(), AppError> {
        if let Some(user) = self.state().users.get_mut(&user_id) {
            user.confirmation_digest = Some(digest.to_string());
        }
        Ok(())
    }

    async fn consume_confirmation_digest(
        &self,
        user_id: Uuid,
        digest: &str,
    ) -> Result<bool, AppError> {
        let mut state = self.state();
        match state.users.get_mut(&user_id) {
            Some(user) if user.confirmation_digest.as_deref() == Some(digest) => {
                user.confirmation_digest = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    // --- CATEGORIES & GENRES ---

    async fn list_catalog(
        &self,
        kind: CatalogKind,
        search: Option<String>,
        page: PageRequest,
    ) -> Result<(Vec<CatalogItem>, i64), AppError> {
        let state = self.state();
        let mut items: Vec<CatalogItem> = state
            .catalog(kind)
            .items
            .values()
            .filter(|item| match (&search, kind) {
                (None, _) => true,
                (Some(term), CatalogKind::Category) => contains_ignore_case(&item.name, term),
                (Some(term), CatalogKind::Genre) => item.name.to_lowercase() == term.to_lowercase(),
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(slice(items, page))
    }

    async fn create_catalog(
        &self,
        kind: CatalogKind,
        name: String,
        slug: String,
    ) -> Result<CatalogItem, AppError> {
        let mut state = self.state();
        let catalog = state.catalog_mut(kind);
        if catalog.by_slug(&slug).is_some() {
            return Err(AppError::field("slug", SLUG_TAKEN));
        }
        let item = CatalogItem {
            id: catalog.allocate_id(),
            name,
            slug,
        };
        catalog.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete_catalog(&self, kind: CatalogKind, slug: &str) -> Result<bool, AppError> {
        let mut state = self.state();
        let Some(id) = state.catalog(kind).by_slug(slug).map(|item| item.id) else {
            return Ok(false);
        };
        state.catalog_mut(kind).items.remove(&id);
        for title in state.titles.values_mut() {
            match kind {
                CatalogKind::Category if title.category_id == Some(id) => title.category_id = None,
                CatalogKind::Genre => title.genre_ids.retain(|genre_id| *genre_id != id),
                _ => {}
            }
        }
        Ok(true)
    }

    async fn import_catalog(
        &self,
        kind: CatalogKind,
        rows: Vec<CatalogRow>,
    ) -> Result<u64, AppError> {
        let mut state = self.state();
        let catalog = state.catalog_mut(kind);

        // Validate the whole batch before writing anything. Rows without an id draw from the
        // counter in order, as the column default does, and may collide with explicit ids.
        let mut next_id = catalog
            .next_id
            .max(catalog.items.keys().max().copied().unwrap_or(0));
        let mut slugs: Vec<&str> = Vec::new();
        let mut ids: Vec<i64> = Vec::with_capacity(rows.len());
        for row in &rows {
            if catalog.by_slug(&row.slug).is_some() || slugs.contains(&row.slug.as_str()) {
                return Err(AppError::field("slug", SLUG_TAKEN));
            }
            slugs.push(&row.slug);
            let id = match row.id {
                Some(id) => id,
                None => {
                    next_id += 1;
                    next_id
                }
            };
            if catalog.items.contains_key(&id) || ids.contains(&id) {
                return Err(AppError::field("id", ID_TAKEN));
            }
            ids.push(id);
        }

        let count = rows.len() as u64;
        for (id, row) in ids.into_iter().zip(rows) {
            catalog.items.insert(
                id,
                CatalogItem {
                    id,
                    name: row.name,
                    slug: row.slug,
                },
            );
        }
        catalog.next_id = next_id;
        Ok(count)
    }

    // --- TITLES ---

    async fn list_titles(
        &self,
        filter: &TitleFilter,
        page: PageRequest,
    ) -> Result<(Vec<TitleResponse>, i64), AppError> {
        let state = self.state();
        let titles: Vec<TitleResponse> = state
            .titles
            .values()
            .filter(|title| state.matches(title, filter))
            .map(|title| state.title_response(title))
            .collect();
        Ok(slice(titles, page))
    }

    async fn get_title(&self, id: i64) -> Result<Option<TitleResponse>, AppError> {
        let state = self.state();
        Ok(state.titles.get(&id).map(|title| state.title_response(title)))
    }

    async fn create_title(&self, title: TitleWrite) -> Result<TitleResponse, AppError> {
        let mut state = self.state();

        let category_id = title
            .category
            .as_deref()
            .map(|slug| state.resolve_category(slug))
            .transpose();
        let genre_ids = state.resolve_genres(&title.genre);
        let (category_id, genre_ids) = match (category_id, genre_ids) {
            (Ok(category_id), Ok(genre_ids)) => (category_id, genre_ids),
            (category, genres) => {
                let mut errors = FieldErrors::new();
                for result in [category.map(|_| ()), genres.map(|_| ())] {
                    match result {
                        Err(AppError::Validation(fields)) => errors.merge(fields),
                        Err(other) => return Err(other),
                        Ok(()) => {}
                    }
                }
                return Err(AppError::Validation(errors));
            }
        };

        state.next_title_id += 1;
        let stored = StoredTitle {
            id: state.next_title_id,
            name: title.name,
            year: title.year,
            description: title.description,
            category_id,
            genre_ids,
        };
        let response = state.title_response(&stored);
        state.titles.insert(stored.id, stored);
        Ok(response)
    }

    async fn update_title(
        &self,
        id: i64,
        patch: UpdateTitleRequest,
    ) -> Result<Option<TitleResponse>, AppError> {
        let mut state = self.state();
        if !state.titles.contains_key(&id) {
            return Ok(None);
        }
        let category_id = match &patch.category {
            Some(Some(slug)) => Some(Some(state.resolve_category(slug)?)),
            Some(None) => Some(None),
            None => None,
        };
        let genre_ids = match patch.genre.as_deref() {
            Some(slugs) => Some(state.resolve_genres(slugs)?),
            None => None,
        };

        let Some(title) = state.titles.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            title.name = name;
        }
        if let Some(year) = patch.year {
            title.year = year;
        }
        if let Some(description) = patch.description {
            title.description = description;
        }
        if let Some(category_id) = category_id {
            title.category_id = category_id;
        }
        if let Some(genre_ids) = genre_ids {
            title.genre_ids = genre_ids;
        }

        let state = &*state;
        Ok(state.titles.get(&id).map(|title| state.title_response(title)))
    }

    async fn delete_title(&self, id: i64) -> Result<bool, AppError> {
        let mut state = self.state();
        if state.titles.remove(&id).is_none() {
            return Ok(false);
        }
        state.remove_reviews_where(|review| review.title_id == id);
        Ok(true)
    }

    // --- REVIEWS ---

    async fn list_reviews(
        &self,
        title_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Review>, i64), AppError> {
        let state = self.state();
        let mut reviews: Vec<Review> = state
            .reviews
            .values()
            .filter(|review| review.title_id == title_id)
            .map(|review| state.review(review))
            .collect();
        reviews.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(slice(reviews, page))
    }

    async fn get_review(&self, title_id: i64, review_id: i64) -> Result<Option<Review>, AppError> {
        let state = self.state();
        Ok(state
            .reviews
            .get(&review_id)
            .filter(|review| review.title_id == title_id)
            .map(|review| state.review(review)))
    }

    async fn create_review(
        &self,
        title_id: i64,
        author_id: Uuid,
        review: CreateReviewRequest,
    ) -> Result<Review, AppError> {
        let mut state = self.state();
        if !state.titles.contains_key(&title_id) || !state.users.contains_key(&author_id) {
            return Err(AppError::NotFound("Related object"));
        }
        let duplicate = state
            .reviews
            .values()
            .any(|r| r.title_id == title_id && r.author_id == author_id);
        if duplicate {
            return Err(AppError::field("non_field_errors", DUPLICATE_REVIEW));
        }

        state.next_review_id += 1;
        let stored = StoredReview {
            id: state.next_review_id,
            title_id,
            author_id,
            text: review.text,
            score: review.score,
            pub_date: Utc::now(),
        };
        let created = state.review(&stored);
        state.reviews.insert(stored.id, stored);
        Ok(created)
    }

    async fn update_review(
        &self,
        review_id: i64,
        patch: UpdateReviewRequest,
    ) -> Result<Option<Review>, AppError> {
        let mut state = self.state();
        let Some(review) = state.reviews.get_mut(&review_id) else {
            return Ok(None);
        };
        if let Some(text) = patch.text {
            review.text = text;
        }
        if let Some(score) = patch.score {
            review.score = score;
        }
        let state = &*state;
        Ok(state.reviews.get(&review_id).map(|review| state.review(review)))
    }

    async fn delete_review(&self, review_id: i64) -> Result<bool, AppError> {
        let mut state = self.state();
        let existed = state.reviews.contains_key(&review_id);
        state.remove_reviews_where(|review| review.id == review_id);
        Ok(existed)
    }

    // --- COMMENTS ---

    async fn list_comments(
        &self,
        review_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<Comment>, i64), AppError> {
        let state = self.state();
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|comment| comment.review_id == review_id)
            .map(|comment| state.comment(comment))
            .collect();
        comments.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(slice(comments, page))
    }

    async fn get_comment(
        &self,
        review_id: i64,
        comment_id: i64,
    ) -> Result<Option<Comment>, AppError> {
        let state = self.state();
        Ok(state
            .comments
            .get(&comment_id)
            .filter(|comment| comment.review_id == review_id)
            .map(|comment| state.comment(comment)))
    }

    async fn create_comment(
        &self,
        review_id: i64,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, AppError> {
        let mut state = self.state();
        if !state.reviews.contains_key(&review_id) || !state.users.contains_key(&author_id) {
            return Err(AppError::NotFound("Related object"));
        }
        state.next_comment_id += 1;
        let stored = StoredComment {
            id: state.next_comment_id,
            review_id,
            author_id,
            text,
            pub_date: Utc::now(),
        };
        let created = state.comment(&stored);
        state.comments.insert(stored.id, stored);
        Ok(created)
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        patch: UpdateCommentRequest,
    ) -> Result<Option<Comment>, AppError> {
        let mut state = self.state();
        let Some(comment) = state.comments.get_mut(&comment_id) else {
            return Ok(None);
        };
        if let Some(text) = patch.text {
            comment.text = text;
        }
        let state = &*state;
        Ok(state
            .comments
            .get(&comment_id)
            .map(|comment| state.comment(comment)))
    }

    async fn delete_comment(&self, comment_id: i64) -> Result<bool, AppError> {
        Ok(self.state().comments.remove(&comment_id).is_some())
    }
}
