//! PostgreSQL implementation of the source repository.

pub mod queries;
mod source_repository;

pub use source_repository::PostgresSourceRepository;
