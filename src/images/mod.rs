use crate::{config::ImageConfig, state::AppState};
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router(cfg: &ImageConfig) -> Router<AppState> {
    handlers::image_routes(cfg)
}
