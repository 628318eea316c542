pub mod response;
pub mod sentry;
pub mod text;
