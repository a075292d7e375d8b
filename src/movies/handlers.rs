use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::jwt::AuthUser,
    error::ApiResult,
    movies::{
        dto::{CreateMovieRequest, MovieFilterQuery, PaginationQuery, UpdateMovieRequest},
        filter::Page,
        model::Movie,
        service::PagedMovies,
    },
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route("/movies/paginated", get(list_movies_paginated))
        .route("/movies/filter", get(list_movies_filtered))
        .route("/movies/filter/paginated", get(list_movies_filtered_paginated))
        .route(
            "/movies/:id",
            get(get_movie).patch(update_movie).delete(delete_movie),
        )
}

#[instrument(skip(state, payload))]
async fn create_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMovieRequest>,
) -> ApiResult<(StatusCode, Json<Movie>)> {
    let movie = state
        .movies
        .create(user_id, payload.into_new_movie()?)
        .await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

#[instrument(skip(state))]
async fn list_movies(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Json<Vec<Movie>>> {
    Ok(Json(state.movies.list(user_id).await?))
}

#[instrument(skip(state))]
async fn list_movies_paginated(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(pagination): Query<PaginationQuery>,
) -> ApiResult<Json<PagedMovies>> {
    let page = Page::new(pagination.page, pagination.limit);
    Ok(Json(state.movies.list_paginated(user_id, page).await?))
}

#[instrument(skip(state))]
async fn list_movies_filtered(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<MovieFilterQuery>,
) -> ApiResult<Json<Vec<Movie>>> {
    let (filter, _) = query.into_filter()?;
    Ok(Json(state.movies.list_filtered(user_id, filter).await?))
}

#[instrument(skip(state))]
async fn list_movies_filtered_paginated(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<MovieFilterQuery>,
) -> ApiResult<Json<PagedMovies>> {
    let (filter, page) = query.into_filter()?;
    Ok(Json(
        state
            .movies
            .list_filtered_paginated(user_id, filter, page)
            .await?,
    ))
}

#[instrument(skip(state))]
async fn get_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Movie>> {
    Ok(Json(state.movies.find_one(user_id, id).await?))
}

#[instrument(skip(state, payload))]
async fn update_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateMovieRequest>,
) -> ApiResult<Json<Movie>> {
    let changes = payload.into_changes()?;
    Ok(Json(state.movies.update(user_id, id, changes).await?))
}

#[instrument(skip(state))]
async fn delete_movie(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<Movie>> {
    Ok(Json(state.movies.delete(user_id, id).await?))
}
