use axum::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    movies::{
        filter::FilterClause,
        model::{join_genres, Movie, MovieChanges, MovieRow, NewMovie},
    },
};

/// Persistence contract for movies. Single-entity operations are scoped to
/// the owning user; listing takes the already-built clause conjunction.
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn create(&self, owner: Uuid, data: NewMovie) -> ApiResult<Movie>;
    async fn find_by_id_and_owner(&self, id: i64, owner: Uuid) -> ApiResult<Option<Movie>>;
    async fn find_many(
        &self,
        clauses: &[FilterClause],
        skip: Option<i64>,
        take: Option<i64>,
    ) -> ApiResult<Vec<Movie>>;
    async fn count(&self, clauses: &[FilterClause]) -> ApiResult<i64>;
    async fn update(&self, id: i64, owner: Uuid, changes: MovieChanges)
        -> ApiResult<Option<Movie>>;
    async fn delete(&self, id: i64, owner: Uuid) -> ApiResult<Option<Movie>>;
}

const MOVIE_COLUMNS: &str = "id, title, original_title, description, release_date, duration, \
     budget, revenue, profit, image_url, slogan, trailer_url, rating, vote_count, age_rating, \
     status, language, genres, user_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Renders one clause. LIKE (not ILIKE) keeps the substring match
/// case-preserving, mirroring the in-memory evaluation.
fn push_clause(qb: &mut QueryBuilder<'_, Postgres>, clause: &FilterClause) {
    match clause {
        FilterClause::TitleContains(s) => {
            qb.push("title LIKE ").push_bind(like_pattern(s));
        }
        FilterClause::OriginalTitleContains(s) => {
            qb.push("original_title LIKE ").push_bind(like_pattern(s));
        }
        FilterClause::DescriptionContains(s) => {
            qb.push("description LIKE ").push_bind(like_pattern(s));
        }
        FilterClause::GenresContain(s) => {
            qb.push("genres LIKE ").push_bind(like_pattern(s));
        }
        FilterClause::OwnerEq(id) => {
            qb.push("user_id = ").push_bind(*id);
        }
        FilterClause::ReleaseDateFrom(d) => {
            qb.push("release_date >= ").push_bind(*d);
        }
        FilterClause::ReleaseDateTo(d) => {
            qb.push("release_date <= ").push_bind(*d);
        }
        FilterClause::MinDuration(v) => {
            qb.push("duration >= ").push_bind(*v);
        }
        FilterClause::MaxDuration(v) => {
            qb.push("duration <= ").push_bind(*v);
        }
        FilterClause::MinBudget(v) => {
            qb.push("budget >= ").push_bind(*v);
        }
        FilterClause::MaxBudget(v) => {
            qb.push("budget <= ").push_bind(*v);
        }
        FilterClause::MinRating(v) => {
            qb.push("rating >= ").push_bind(*v);
        }
        FilterClause::MaxRating(v) => {
            qb.push("rating <= ").push_bind(*v);
        }
    }
}

fn push_clauses(qb: &mut QueryBuilder<'_, Postgres>, clauses: &[FilterClause]) {
    for clause in clauses {
        qb.push(" AND ");
        push_clause(qb, clause);
    }
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn create(&self, owner: Uuid, data: NewMovie) -> ApiResult<Movie> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "INSERT INTO movies (title, original_title, description, release_date, duration, \
             budget, revenue, profit, image_url, slogan, trailer_url, rating, vote_count, \
             age_rating, status, language, genres, user_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&data.title)
        .bind(&data.original_title)
        .bind(&data.description)
        .bind(data.release_date)
        .bind(data.duration)
        .bind(data.budget)
        .bind(data.revenue)
        .bind(data.profit)
        .bind(&data.image_url)
        .bind(&data.slogan)
        .bind(&data.trailer_url)
        .bind(data.rating)
        .bind(data.vote_count)
        .bind(&data.age_rating)
        .bind(&data.status)
        .bind(&data.language)
        .bind(join_genres(&data.genres))
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_by_id_and_owner(&self, id: i64, owner: Uuid) -> ApiResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Movie::from))
    }

    async fn find_many(
        &self,
        clauses: &[FilterClause],
        skip: Option<i64>,
        take: Option<i64>,
    ) -> ApiResult<Vec<Movie>> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE 1=1"));
        push_clauses(&mut qb, clauses);
        qb.push(" ORDER BY created_at DESC, id DESC");
        if let Some(take) = take {
            qb.push(" LIMIT ").push_bind(take);
        }
        if let Some(skip) = skip {
            qb.push(" OFFSET ").push_bind(skip);
        }

        let rows: Vec<MovieRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Movie::from).collect())
    }

    async fn count(&self, clauses: &[FilterClause]) -> ApiResult<i64> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM movies WHERE 1=1");
        push_clauses(&mut qb, clauses);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn update(
        &self,
        id: i64,
        owner: Uuid,
        changes: MovieChanges,
    ) -> ApiResult<Option<Movie>> {
        if changes.is_empty() {
            return self.find_by_id_and_owner(id, owner).await;
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE movies SET updated_at = now()");
        macro_rules! set {
            ($field:expr, $column:literal) => {
                if let Some(value) = $field {
                    qb.push(concat!(", ", $column, " = ")).push_bind(value);
                }
            };
        }
        set!(changes.title, "title");
        set!(changes.original_title, "original_title");
        set!(changes.description, "description");
        set!(changes.release_date, "release_date");
        set!(changes.duration, "duration");
        set!(changes.budget, "budget");
        set!(changes.revenue, "revenue");
        set!(changes.profit, "profit");
        set!(changes.image_url, "image_url");
        set!(changes.slogan, "slogan");
        set!(changes.trailer_url, "trailer_url");
        set!(changes.rating, "rating");
        set!(changes.vote_count, "vote_count");
        set!(changes.age_rating, "age_rating");
        set!(changes.status, "status");
        set!(changes.language, "language");
        if let Some(genres) = &changes.genres {
            qb.push(", genres = ").push_bind(join_genres(genres));
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" AND user_id = ").push_bind(owner);
        qb.push(format!(" RETURNING {MOVIE_COLUMNS}"));

        let row: Option<MovieRow> = qb.build_query_as().fetch_optional(&self.pool).await?;
        Ok(row.map(Movie::from))
    }

    async fn delete(&self, id: i64, owner: Uuid) -> ApiResult<Option<Movie>> {
        let row = sqlx::query_as::<_, MovieRow>(&format!(
            "DELETE FROM movies WHERE id = $1 AND user_id = $2 RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Movie::from))
    }
}

#[cfg(test)]
pub mod memory {
    use std::sync::Mutex;

    use time::OffsetDateTime;

    use super::*;

    /// In-memory store for unit tests of the movie service. Evaluates the
    /// same clause list the Postgres store renders to SQL.
    #[derive(Default)]
    pub struct InMemoryMovieStore {
        movies: Mutex<Vec<Movie>>,
        next_id: Mutex<i64>,
    }

    #[async_trait]
    impl MovieStore for InMemoryMovieStore {
        async fn create(&self, owner: Uuid, data: NewMovie) -> ApiResult<Movie> {
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let now = OffsetDateTime::now_utc();
            let movie = Movie {
                id: *next_id,
                title: data.title,
                original_title: data.original_title,
                description: data.description,
                release_date: data.release_date,
                duration: data.duration,
                budget: data.budget,
                revenue: data.revenue,
                profit: data.profit,
                image_url: data.image_url,
                slogan: data.slogan,
                trailer_url: data.trailer_url,
                rating: data.rating,
                vote_count: data.vote_count,
                age_rating: data.age_rating,
                status: data.status,
                language: data.language,
                genres: data.genres,
                user_id: owner,
                created_at: now,
                updated_at: now,
            };
            self.movies.lock().unwrap().push(movie.clone());
            Ok(movie)
        }

        async fn find_by_id_and_owner(&self, id: i64, owner: Uuid) -> ApiResult<Option<Movie>> {
            let movies = self.movies.lock().unwrap();
            Ok(movies
                .iter()
                .find(|m| m.id == id && m.user_id == owner)
                .cloned())
        }

        async fn find_many(
            &self,
            clauses: &[FilterClause],
            skip: Option<i64>,
            take: Option<i64>,
        ) -> ApiResult<Vec<Movie>> {
            let movies = self.movies.lock().unwrap();
            let mut matched: Vec<Movie> = movies
                .iter()
                .filter(|m| clauses.iter().all(|c| c.matches(m)))
                .cloned()
                .collect();
            matched.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

            let skip = skip.unwrap_or(0).max(0) as usize;
            let mut page: Vec<Movie> = matched.into_iter().skip(skip).collect();
            if let Some(take) = take {
                page.truncate(take.max(0) as usize);
            }
            Ok(page)
        }

        async fn count(&self, clauses: &[FilterClause]) -> ApiResult<i64> {
            let movies = self.movies.lock().unwrap();
            Ok(movies
                .iter()
                .filter(|m| clauses.iter().all(|c| c.matches(m)))
                .count() as i64)
        }

        async fn update(
            &self,
            id: i64,
            owner: Uuid,
            changes: MovieChanges,
        ) -> ApiResult<Option<Movie>> {
            let mut movies = self.movies.lock().unwrap();
            let Some(movie) = movies.iter_mut().find(|m| m.id == id && m.user_id == owner)
            else {
                return Ok(None);
            };

            macro_rules! apply {
                ($field:ident) => {
                    if let Some(value) = changes.$field {
                        movie.$field = value;
                    }
                };
                (opt $field:ident) => {
                    if let Some(value) = changes.$field {
                        movie.$field = Some(value);
                    }
                };
            }
            apply!(title);
            apply!(original_title);
            apply!(description);
            apply!(release_date);
            apply!(duration);
            apply!(budget);
            apply!(opt revenue);
            apply!(opt profit);
            apply!(image_url);
            apply!(opt slogan);
            apply!(opt trailer_url);
            apply!(rating);
            apply!(opt vote_count);
            apply!(opt age_rating);
            apply!(opt status);
            apply!(opt language);
            apply!(genres);
            movie.updated_at = OffsetDateTime::now_utc();
            Ok(Some(movie.clone()))
        }

        async fn delete(&self, id: i64, owner: Uuid) -> ApiResult<Option<Movie>> {
            let mut movies = self.movies.lock().unwrap();
            let pos = movies
                .iter()
                .position(|m| m.id == id && m.user_id == owner);
            Ok(pos.map(|i| movies.remove(i)))
        }
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(super::like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(super::like_pattern("plain"), "%plain%");
    }
}
