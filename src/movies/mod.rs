use crate::state::AppState;
use axum::Router;

mod dto;
pub mod filter;
pub mod handlers;
pub mod model;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
