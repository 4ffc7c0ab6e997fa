//! # xapi server
//!
//! HTTP surface for the assets store: `/api/v1/assets` CRUD behind an API
//! key gate, plus an ungated `/ping`. All storage concerns live in
//! `xapi-core`; this crate only validates, delegates, and maps errors.

pub mod app;
pub mod gate;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use app::create_app;
pub use infra::app_state::AppState;
