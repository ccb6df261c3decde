//! Integration tests
//!
//! Both suites need external services and are ignored by default:
//!   DATABASE_URL=postgres://... cargo test -- --ignored

mod api;
mod store;
