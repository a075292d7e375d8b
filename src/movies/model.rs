use serde::Serialize;
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Movie as exposed by the service. `genres` is a list here; the store keeps
/// it comma-joined, so genre values must not contain commas.
#[derive(Debug, Clone, Serialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub description: String,
    pub release_date: Date,
    pub duration: i32,
    pub budget: f64,
    pub revenue: Option<f64>,
    pub profit: Option<f64>,
    pub image_url: String,
    pub slogan: Option<String>,
    pub trailer_url: Option<String>,
    pub rating: i32,
    pub vote_count: Option<i32>,
    pub age_rating: Option<String>,
    pub status: Option<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Row shape as stored, with the delimited genre string.
#[derive(Debug, Clone, FromRow)]
pub struct MovieRow {
    pub id: i64,
    pub title: String,
    pub original_title: String,
    pub description: String,
    pub release_date: Date,
    pub duration: i32,
    pub budget: f64,
    pub revenue: Option<f64>,
    pub profit: Option<f64>,
    pub image_url: String,
    pub slogan: Option<String>,
    pub trailer_url: Option<String>,
    pub rating: i32,
    pub vote_count: Option<i32>,
    pub age_rating: Option<String>,
    pub status: Option<String>,
    pub language: Option<String>,
    pub genres: String,
    pub user_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            original_title: row.original_title,
            description: row.description,
            release_date: row.release_date,
            duration: row.duration,
            budget: row.budget,
            revenue: row.revenue,
            profit: row.profit,
            image_url: row.image_url,
            slogan: row.slogan,
            trailer_url: row.trailer_url,
            rating: row.rating,
            vote_count: row.vote_count,
            age_rating: row.age_rating,
            status: row.status,
            language: row.language,
            genres: split_genres(&row.genres),
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input shape for creation. The owner id is supplied separately by the
/// authenticated caller, never as part of client data.
#[derive(Debug, Clone)]
pub struct NewMovie {
    pub title: String,
    pub original_title: String,
    pub description: String,
    pub release_date: Date,
    pub duration: i32,
    pub budget: f64,
    pub revenue: Option<f64>,
    pub profit: Option<f64>,
    pub image_url: String,
    pub slogan: Option<String>,
    pub trailer_url: Option<String>,
    pub rating: i32,
    pub vote_count: Option<i32>,
    pub age_rating: Option<String>,
    pub status: Option<String>,
    pub language: Option<String>,
    pub genres: Vec<String>,
}

/// Partial update: `Some` fields are written, `None` fields left alone.
#[derive(Debug, Clone, Default)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<Date>,
    pub duration: Option<i32>,
    pub budget: Option<f64>,
    pub revenue: Option<f64>,
    pub profit: Option<f64>,
    pub image_url: Option<String>,
    pub slogan: Option<String>,
    pub trailer_url: Option<String>,
    pub rating: Option<i32>,
    pub vote_count: Option<i32>,
    pub age_rating: Option<String>,
    pub status: Option<String>,
    pub language: Option<String>,
    pub genres: Option<Vec<String>>,
}

impl MovieChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.original_title.is_none()
            && self.description.is_none()
            && self.release_date.is_none()
            && self.duration.is_none()
            && self.budget.is_none()
            && self.revenue.is_none()
            && self.profit.is_none()
            && self.image_url.is_none()
            && self.slogan.is_none()
            && self.trailer_url.is_none()
            && self.rating.is_none()
            && self.vote_count.is_none()
            && self.age_rating.is_none()
            && self.status.is_none()
            && self.language.is_none()
            && self.genres.is_none()
    }
}

pub fn join_genres(genres: &[String]) -> String {
    genres.join(",")
}

pub fn split_genres(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genres_roundtrip_through_delimited_string() {
        let genres = vec!["Drama".to_string(), "Crime".to_string()];
        assert_eq!(split_genres(&join_genres(&genres)), genres);
    }

    #[test]
    fn split_genres_drops_empty_segments() {
        assert_eq!(split_genres(""), Vec::<String>::new());
        assert_eq!(split_genres("Drama,,Crime, "), vec!["Drama", "Crime"]);
    }
}
