/*
 * Responsibility
 * - Public surface of v1 (routes() re-export and the types handlers hand out)
 */
pub mod dto;
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
