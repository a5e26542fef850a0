/*!
 * Authentication context extractor
 *
 * Responsibility:
 * - Hand the verified caller (AuthCtx) to handlers
 * - axum-specific code stays in core, the contract type lives in types
 *
 * Public API:
 * - AuthCtx
 * - AuthCtxExtractor
 */

mod core;
mod types;

pub use core::AuthCtxExtractor;
pub use types::AuthCtx;
