use time::{Date, Month};
use uuid::Uuid;

use crate::movies::model::{join_genres, Movie};

/// Optional-field filter for movie listings. Every present field contributes
/// exactly one independent clause; absent fields contribute nothing.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub description: Option<String>,
    pub genres: Option<String>,
    pub user_id: Option<Uuid>,
    pub release_year: Option<i32>,
    pub release_date_start: Option<Date>,
    pub release_date_end: Option<Date>,
    pub min_duration: Option<i32>,
    pub max_duration: Option<i32>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub min_rating: Option<i32>,
    pub max_rating: Option<i32>,
}

/// One conjunct of the listing predicate. The Postgres store renders these as
/// SQL; the in-memory store evaluates them with [`FilterClause::matches`].
/// Both must stay in agreement.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterClause {
    TitleContains(String),
    OriginalTitleContains(String),
    DescriptionContains(String),
    GenresContain(String),
    OwnerEq(Uuid),
    ReleaseDateFrom(Date),
    ReleaseDateTo(Date),
    MinDuration(i32),
    MaxDuration(i32),
    MinBudget(f64),
    MaxBudget(f64),
    MinRating(i32),
    MaxRating(i32),
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn year_bounds(year: i32) -> Option<(Date, Date)> {
    let start = Date::from_calendar_date(year, Month::January, 1).ok()?;
    let end = Date::from_calendar_date(year, Month::December, 31).ok()?;
    Some((start, end))
}

impl MovieFilter {
    /// Builds the conjunction for this filter. Zero-valued lower bounds are
    /// real clauses. When both `release_year` and an explicit date bound are
    /// supplied, the explicit bound wins on its side of the range.
    pub fn clauses(&self) -> Vec<FilterClause> {
        let mut clauses = Vec::new();

        if let Some(s) = present(&self.title) {
            clauses.push(FilterClause::TitleContains(s.to_string()));
        }
        if let Some(s) = present(&self.original_title) {
            clauses.push(FilterClause::OriginalTitleContains(s.to_string()));
        }
        if let Some(s) = present(&self.description) {
            clauses.push(FilterClause::DescriptionContains(s.to_string()));
        }
        if let Some(s) = present(&self.genres) {
            clauses.push(FilterClause::GenresContain(s.to_string()));
        }
        if let Some(id) = self.user_id {
            clauses.push(FilterClause::OwnerEq(id));
        }

        let year_range = self.release_year.and_then(year_bounds);
        if let Some(from) = self
            .release_date_start
            .or(year_range.map(|(start, _)| start))
        {
            clauses.push(FilterClause::ReleaseDateFrom(from));
        }
        if let Some(to) = self.release_date_end.or(year_range.map(|(_, end)| end)) {
            clauses.push(FilterClause::ReleaseDateTo(to));
        }

        if let Some(v) = self.min_duration {
            clauses.push(FilterClause::MinDuration(v));
        }
        if let Some(v) = self.max_duration {
            clauses.push(FilterClause::MaxDuration(v));
        }
        if let Some(v) = self.min_budget {
            clauses.push(FilterClause::MinBudget(v));
        }
        if let Some(v) = self.max_budget {
            clauses.push(FilterClause::MaxBudget(v));
        }
        if let Some(v) = self.min_rating {
            clauses.push(FilterClause::MinRating(v));
        }
        if let Some(v) = self.max_rating {
            clauses.push(FilterClause::MaxRating(v));
        }

        clauses
    }
}

impl FilterClause {
    /// In-process evaluation with the same semantics as the SQL rendering:
    /// case-preserving substring match, inclusive range bounds.
    pub fn matches(&self, movie: &Movie) -> bool {
        match self {
            FilterClause::TitleContains(s) => movie.title.contains(s.as_str()),
            FilterClause::OriginalTitleContains(s) => movie.original_title.contains(s.as_str()),
            FilterClause::DescriptionContains(s) => movie.description.contains(s.as_str()),
            FilterClause::GenresContain(s) => join_genres(&movie.genres).contains(s.as_str()),
            FilterClause::OwnerEq(id) => movie.user_id == *id,
            FilterClause::ReleaseDateFrom(d) => movie.release_date >= *d,
            FilterClause::ReleaseDateTo(d) => movie.release_date <= *d,
            FilterClause::MinDuration(v) => movie.duration >= *v,
            FilterClause::MaxDuration(v) => movie.duration <= *v,
            FilterClause::MinBudget(v) => movie.budget >= *v,
            FilterClause::MaxBudget(v) => movie.budget <= *v,
            FilterClause::MinRating(v) => movie.rating >= *v,
            FilterClause::MaxRating(v) => movie.rating <= *v,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Normalized pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        if total == 0 {
            0
        } else {
            (total + self.limit - 1) / self.limit
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Page::new(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn full_filter(user_id: Uuid) -> MovieFilter {
        MovieFilter {
            title: Some("Godfather".into()),
            original_title: Some("The Godfather".into()),
            description: Some("mafia".into()),
            genres: Some("Crime".into()),
            user_id: Some(user_id),
            release_year: None,
            release_date_start: Some(date!(1972 - 01 - 01)),
            release_date_end: Some(date!(1972 - 12 - 31)),
            min_duration: Some(90),
            max_duration: Some(200),
            min_budget: Some(0.0),
            max_budget: Some(10_000_000.0),
            min_rating: Some(80),
            max_rating: Some(100),
        }
    }

    #[test]
    fn empty_filter_builds_no_clauses() {
        assert!(MovieFilter::default().clauses().is_empty());
    }

    #[test]
    fn each_present_field_contributes_exactly_one_clause() {
        let user_id = Uuid::new_v4();
        let clauses = full_filter(user_id).clauses();
        assert_eq!(clauses.len(), 13);
        assert!(clauses.contains(&FilterClause::TitleContains("Godfather".into())));
        assert!(clauses.contains(&FilterClause::OwnerEq(user_id)));
        assert!(clauses.contains(&FilterClause::MinBudget(0.0)));
    }

    #[test]
    fn blank_strings_are_not_clauses() {
        let filter = MovieFilter {
            title: Some("".into()),
            description: Some("   ".into()),
            ..Default::default()
        };
        assert!(filter.clauses().is_empty());
    }

    #[test]
    fn zero_lower_bounds_are_real_clauses() {
        let filter = MovieFilter {
            min_duration: Some(0),
            min_budget: Some(0.0),
            min_rating: Some(0),
            ..Default::default()
        };
        let clauses = filter.clauses();
        assert_eq!(clauses.len(), 3);
        assert!(clauses.contains(&FilterClause::MinDuration(0)));
    }

    #[test]
    fn release_year_expands_to_full_year_range() {
        let filter = MovieFilter {
            release_year: Some(1972),
            ..Default::default()
        };
        let clauses = filter.clauses();
        assert_eq!(
            clauses,
            vec![
                FilterClause::ReleaseDateFrom(date!(1972 - 01 - 01)),
                FilterClause::ReleaseDateTo(date!(1972 - 12 - 31)),
            ]
        );
    }

    #[test]
    fn explicit_date_bound_overrides_year_on_its_side() {
        let filter = MovieFilter {
            release_year: Some(1972),
            release_date_start: Some(date!(1972 - 06 - 01)),
            ..Default::default()
        };
        let clauses = filter.clauses();
        assert_eq!(
            clauses,
            vec![
                FilterClause::ReleaseDateFrom(date!(1972 - 06 - 01)),
                FilterClause::ReleaseDateTo(date!(1972 - 12 - 31)),
            ]
        );
    }

    #[test]
    fn substring_match_is_case_preserving() {
        let movie = sample_movie();
        assert!(FilterClause::TitleContains("Godfather".into()).matches(&movie));
        assert!(!FilterClause::TitleContains("godfather".into()).matches(&movie));
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let movie = sample_movie();
        assert!(FilterClause::MinDuration(175).matches(&movie));
        assert!(FilterClause::MaxDuration(175).matches(&movie));
        assert!(!FilterClause::MinDuration(176).matches(&movie));
        assert!(FilterClause::ReleaseDateFrom(date!(1972 - 03 - 24)).matches(&movie));
        assert!(!FilterClause::ReleaseDateTo(date!(1972 - 03 - 23)).matches(&movie));
    }

    #[test]
    fn genre_clause_matches_the_delimited_string() {
        let movie = sample_movie();
        assert!(FilterClause::GenresContain("Crime".into()).matches(&movie));
        assert!(!FilterClause::GenresContain("Comedy".into()).matches(&movie));
    }

    #[test]
    fn page_defaults_and_caps() {
        assert_eq!(Page::new(None, None), Page { page: 1, limit: 10 });
        assert_eq!(Page::new(Some(0), Some(0)), Page { page: 1, limit: 1 });
        assert_eq!(Page::new(Some(3), Some(500)), Page { page: 3, limit: 100 });
    }

    #[test]
    fn offset_and_total_pages() {
        let page = Page::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(25), 3);
        assert_eq!(page.total_pages(30), 3);
        assert_eq!(page.total_pages(31), 4);
        assert_eq!(page.total_pages(0), 0);
    }

    fn sample_movie() -> Movie {
        use time::OffsetDateTime;
        Movie {
            id: 1,
            title: "The Godfather".into(),
            original_title: "The Godfather".into(),
            description: "A mafia classic".into(),
            release_date: date!(1972 - 03 - 24),
            duration: 175,
            budget: 6_000_000.0,
            revenue: Some(287_000_000.0),
            profit: Some(281_000_000.0),
            image_url: "https://example.com/poster.jpg".into(),
            slogan: None,
            trailer_url: None,
            rating: 92,
            vote_count: Some(1_500_000),
            age_rating: Some("18+".into()),
            status: Some("Released".into()),
            language: Some("English".into()),
            genres: vec!["Drama".into(), "Crime".into()],
            user_id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}
