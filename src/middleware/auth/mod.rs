pub mod access;
pub mod bearer;

pub use bearer::bearer_token;
