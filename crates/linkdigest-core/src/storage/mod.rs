mod bookmark_repo;
mod database;
mod job_repo;
pub mod memory;
pub mod retry;

pub use bookmark_repo::BookmarkRepository;
pub use database::Database;
pub use job_repo::JobRepository;
pub use memory::MemoryStore;
