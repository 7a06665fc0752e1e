use async_trait::async_trait;
use thiserror::Error;

use campusdesk_core::domain::directory::{
    AdministrativeService, CalendarEvent, Course, DirectoryFilter, Fee, Hostel, LibraryService,
};

pub mod directory;
pub mod memory;

pub use directory::SqlDirectoryRepository;
pub use memory::InMemoryDirectoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    /// Transient pool or I/O conditions; everything else will fail again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(error) => matches!(
                error,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            Self::Decode(_) => false,
        }
    }
}

/// Read access to the university directory.
///
/// `filter.term` is matched per table:
/// - courses: case-insensitive substring of name or code
/// - calendar: substring of semester, ordered by event date
/// - fees: substring of level
/// - hostels: exact gender, case-insensitive, plus `Mixed` halls; ordered by name
/// - library: substring of category, name or details
/// - administrative: substring of service name
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    async fn courses(&self, filter: &DirectoryFilter) -> Result<Vec<Course>, RepositoryError>;
    async fn calendar(&self, filter: &DirectoryFilter)
        -> Result<Vec<CalendarEvent>, RepositoryError>;
    async fn fees(&self, filter: &DirectoryFilter) -> Result<Vec<Fee>, RepositoryError>;
    async fn hostels(&self, filter: &DirectoryFilter) -> Result<Vec<Hostel>, RepositoryError>;
    async fn library(&self, filter: &DirectoryFilter)
        -> Result<Vec<LibraryService>, RepositoryError>;
    async fn administrative(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<AdministrativeService>, RepositoryError>;
}
