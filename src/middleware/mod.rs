/*
 * Responsibility
 * - Public interface of the middleware layer
 * - auth: bearer extraction + token verification, http: cross-cutting transport layers
 */
pub mod auth;
pub mod http;
