pub mod document;
pub mod memory_repo;
pub mod sqlx_repo;
