pub mod actions;
pub mod auth;
pub mod error;
pub mod form;
pub mod middleware;
pub mod routes;
pub mod state;
