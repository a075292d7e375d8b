use serde::Deserialize;
use time::{format_description::FormatItem, macros::format_description, Date};

use crate::{
    error::{ApiError, ApiResult},
    movies::{
        filter::{MovieFilter, Page},
        model::{MovieChanges, NewMovie},
    },
};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

fn parse_date(value: &str, field: &str) -> ApiResult<Date> {
    Date::parse(value, DATE_FORMAT)
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field}, expected YYYY-MM-DD")))
}

#[derive(Debug, Deserialize)]
pub struct CreateMovieRequest {
    pub title: String,
    pub original_title: String,
    pub description: String,
    pub release_date: String,
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
    #[serde(default)]
    pub genres: Vec<String>,
}

impl CreateMovieRequest {
    pub fn into_new_movie(self) -> ApiResult<NewMovie> {
        Ok(NewMovie {
            release_date: parse_date(&self.release_date, "release_date")?,
            title: self.title,
            original_title: self.original_title,
            description: self.description,
            duration: self.duration,
            budget: self.budget,
            revenue: self.revenue,
            profit: self.profit,
            image_url: self.image_url,
            slogan: self.slogan,
            trailer_url: self.trailer_url,
            rating: self.rating,
            vote_count: self.vote_count,
            age_rating: self.age_rating,
            status: self.status,
            language: self.language,
            genres: self.genres,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<String>,
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

impl UpdateMovieRequest {
    pub fn into_changes(self) -> ApiResult<MovieChanges> {
        let release_date = self
            .release_date
            .as_deref()
            .map(|d| parse_date(d, "release_date"))
            .transpose()?;
        Ok(MovieChanges {
            release_date,
            title: self.title,
            original_title: self.original_title,
            description: self.description,
            duration: self.duration,
            budget: self.budget,
            revenue: self.revenue,
            profit: self.profit,
            image_url: self.image_url,
            slogan: self.slogan,
            trailer_url: self.trailer_url,
            rating: self.rating,
            vote_count: self.vote_count,
            age_rating: self.age_rating,
            status: self.status,
            language: self.language,
            genres: self.genres,
        })
    }
}

/// Query parameters for the filtered listing endpoints. Pagination fields are
/// only honored by the paginated variants. A `user_id` parameter is
/// deliberately absent: the owner always comes from the token.
#[derive(Debug, Default, Deserialize)]
pub struct MovieFilterQuery {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub description: Option<String>,
    pub genres: Option<String>,
    pub release_year: Option<i32>,
    pub release_date_start: Option<String>,
    pub release_date_end: Option<String>,
    pub min_duration: Option<i32>,
    pub max_duration: Option<i32>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl MovieFilterQuery {
    pub fn into_filter(self) -> ApiResult<(MovieFilter, Page)> {
        let release_date_start = self
            .release_date_start
            .as_deref()
            .map(|d| parse_date(d, "release_date_start"))
            .transpose()?;
        let release_date_end = self
            .release_date_end
            .as_deref()
            .map(|d| parse_date(d, "release_date_end"))
            .transpose()?;

        let filter = MovieFilter {
            title: self.title,
            original_title: self.original_title,
            description: self.description,
            genres: self.genres,
            user_id: None,
            release_year: self.release_year,
            release_date_start,
            release_date_end,
            min_duration: self.min_duration,
            max_duration: self.max_duration,
            min_budget: self.min_budget,
            max_budget: self.max_budget,
            min_rating: self.min_rating,
            max_rating: self.max_rating,
        };
        Ok((filter, Page::new(self.page, self.limit)))
    }
}

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
