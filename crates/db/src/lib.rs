pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{directory_counts, seed_demo_data, DirectoryCounts};
pub use repositories::{
    DirectoryRepository, InMemoryDirectoryRepository, RepositoryError, SqlDirectoryRepository,
};
