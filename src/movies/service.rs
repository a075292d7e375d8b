use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    movies::{
        filter::{FilterClause, MovieFilter, Page},
        model::{Movie, MovieChanges, NewMovie},
        store::MovieStore,
    },
};

const MOVIE_NOT_FOUND: &str = "Movie not found";

#[derive(Debug, Serialize)]
pub struct PagedMovies {
    pub movies: Vec<Movie>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

/// Movie CRUD and listing. Every operation is scoped to the owner taken from
/// the authenticated caller; client-supplied owner ids are ignored.
#[derive(Clone)]
pub struct MovieService {
    store: Arc<dyn MovieStore>,
}

impl MovieService {
    pub fn new(store: Arc<dyn MovieStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, owner: Uuid, data: NewMovie) -> ApiResult<Movie> {
        validate_new(&data)?;
        let movie = self.store.create(owner, data).await?;
        info!(movie_id = movie.id, user_id = %owner, "movie created");
        Ok(movie)
    }

    pub async fn list(&self, owner: Uuid) -> ApiResult<Vec<Movie>> {
        self.store
            .find_many(&[FilterClause::OwnerEq(owner)], None, None)
            .await
    }

    pub async fn list_paginated(&self, owner: Uuid, page: Page) -> ApiResult<PagedMovies> {
        self.list_filtered_paginated(owner, MovieFilter::default(), page)
            .await
    }

    pub async fn list_filtered(&self, owner: Uuid, filter: MovieFilter) -> ApiResult<Vec<Movie>> {
        let clauses = owner_scoped(owner, filter);
        self.store.find_many(&clauses, None, None).await
    }

    pub async fn list_filtered_paginated(
        &self,
        owner: Uuid,
        filter: MovieFilter,
        page: Page,
    ) -> ApiResult<PagedMovies> {
        let clauses = owner_scoped(owner, filter);
        // Count and slice must run against the identical predicate or the
        // page metadata drifts from the items.
        let total = self.store.count(&clauses).await?;
        let movies = self
            .store
            .find_many(&clauses, Some(page.offset()), Some(page.limit))
            .await?;
        Ok(PagedMovies {
            movies,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: page.total_pages(total),
        })
    }

    pub async fn find_one(&self, owner: Uuid, id: i64) -> ApiResult<Movie> {
        self.store
            .find_by_id_and_owner(id, owner)
            .await?
            .ok_or(ApiError::NotFound(MOVIE_NOT_FOUND))
    }

    pub async fn update(&self, owner: Uuid, id: i64, changes: MovieChanges) -> ApiResult<Movie> {
        validate_changes(&changes)?;
        let movie = self
            .store
            .update(id, owner, changes)
            .await?
            .ok_or(ApiError::NotFound(MOVIE_NOT_FOUND))?;
        info!(movie_id = id, user_id = %owner, "movie updated");
        Ok(movie)
    }

    pub async fn delete(&self, owner: Uuid, id: i64) -> ApiResult<Movie> {
        let movie = self
            .store
            .delete(id, owner)
            .await?
            .ok_or(ApiError::NotFound(MOVIE_NOT_FOUND))?;
        info!(movie_id = id, user_id = %owner, "movie deleted");
        Ok(movie)
    }
}

/// Replaces any client-supplied owner filter with the authenticated owner
/// before the clause list is built.
fn owner_scoped(owner: Uuid, filter: MovieFilter) -> Vec<FilterClause> {
    MovieFilter {
        user_id: Some(owner),
        ..filter
    }
    .clauses()
}

fn validate_genres(genres: &[String]) -> ApiResult<()> {
    if genres.iter().any(|g| g.contains(',')) {
        return Err(ApiError::BadRequest(
            "Genre values must not contain commas".into(),
        ));
    }
    Ok(())
}

fn validate_new(data: &NewMovie) -> ApiResult<()> {
    if data.duration <= 0 {
        return Err(ApiError::BadRequest("Duration must be positive".into()));
    }
    if data.budget < 0.0 {
        return Err(ApiError::BadRequest("Budget must not be negative".into()));
    }
    if !(0..=100).contains(&data.rating) {
        return Err(ApiError::BadRequest("Rating must be between 0 and 100".into()));
    }
    validate_genres(&data.genres)
}

fn validate_changes(changes: &MovieChanges) -> ApiResult<()> {
    if matches!(changes.duration, Some(d) if d <= 0) {
        return Err(ApiError::BadRequest("Duration must be positive".into()));
    }
    if matches!(changes.budget, Some(b) if b < 0.0) {
        return Err(ApiError::BadRequest("Budget must not be negative".into()));
    }
    if matches!(changes.rating, Some(r) if !(0..=100).contains(&r)) {
        return Err(ApiError::BadRequest("Rating must be between 0 and 100".into()));
    }
    if let Some(genres) = &changes.genres {
        validate_genres(genres)?;
    }
    Ok(())
}
