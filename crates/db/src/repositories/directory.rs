use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use campusdesk_core::domain::directory::{
    AdministrativeService, CalendarEvent, Course, DirectoryFilter, Fee, Hostel, LibraryService,
};

use super::{DirectoryRepository, RepositoryError};
use crate::DbPool;

const COURSES_SQL: &str = "SELECT code, name, credits, prerequisites, semester, lecturer, department
     FROM courses
     WHERE ?1 IS NULL OR LOWER(name) LIKE ?1 ESCAPE '\\' OR LOWER(code) LIKE ?1 ESCAPE '\\'
     ORDER BY code
     LIMIT ?2";

const CALENDAR_SQL: &str = "SELECT event_type, event_date, semester, session, description
     FROM academic_calendar
     WHERE ?1 IS NULL OR LOWER(semester) LIKE ?1 ESCAPE '\\'
     ORDER BY event_date, id
     LIMIT ?2";

const FEES_SQL: &str = "SELECT level, amount, fee_type, session
     FROM fees
     WHERE ?1 IS NULL OR LOWER(level) LIKE ?1 ESCAPE '\\'
     ORDER BY id
     LIMIT ?2";

const HOSTELS_SQL: &str = "SELECT name, gender, capacity, status, facilities
     FROM hostels
     WHERE ?1 IS NULL OR LOWER(gender) = ?1 OR LOWER(gender) = 'mixed'
     ORDER BY name
     LIMIT ?2";

const LIBRARY_SQL: &str = "SELECT category, name, details
     FROM library_services
     WHERE ?1 IS NULL
        OR LOWER(category) LIKE ?1 ESCAPE '\\'
        OR LOWER(name) LIKE ?1 ESCAPE '\\'
        OR LOWER(details) LIKE ?1 ESCAPE '\\'
     ORDER BY id
     LIMIT ?2";

const ADMINISTRATIVE_SQL: &str = "SELECT service, fee, processing_time, requirements
     FROM administrative_services
     WHERE ?1 IS NULL OR LOWER(service) LIKE ?1 ESCAPE '\\'
     ORDER BY id
     LIMIT ?2";

pub struct SqlDirectoryRepository {
    pool: DbPool,
}

impl SqlDirectoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        sql: &'static str,
        term: Option<String>,
        limit: u32,
    ) -> Result<Vec<SqliteRow>, RepositoryError> {
        let rows = sqlx::query(sql).bind(term).bind(i64::from(limit)).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl DirectoryRepository for SqlDirectoryRepository {
    async fn courses(&self, filter: &DirectoryFilter) -> Result<Vec<Course>, RepositoryError> {
        let rows = self.fetch(COURSES_SQL, filter.like_pattern(), filter.limit).await?;
        rows.iter().map(course_from_row).collect()
    }

    async fn calendar(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<CalendarEvent>, RepositoryError> {
        let rows = self.fetch(CALENDAR_SQL, filter.like_pattern(), filter.limit).await?;
        rows.iter().map(calendar_event_from_row).collect()
    }

    async fn fees(&self, filter: &DirectoryFilter) -> Result<Vec<Fee>, RepositoryError> {
        let rows = self.fetch(FEES_SQL, filter.like_pattern(), filter.limit).await?;
        rows.iter().map(fee_from_row).collect()
    }

    async fn hostels(&self, filter: &DirectoryFilter) -> Result<Vec<Hostel>, RepositoryError> {
        let gender = filter.term.as_ref().map(|term| term.to_lowercase());
        let rows = self.fetch(HOSTELS_SQL, gender, filter.limit).await?;
        rows.iter().map(hostel_from_row).collect()
    }

    async fn library(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<LibraryService>, RepositoryError> {
        let rows = self.fetch(LIBRARY_SQL, filter.like_pattern(), filter.limit).await?;
        rows.iter().map(library_service_from_row).collect()
    }

    async fn administrative(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<AdministrativeService>, RepositoryError> {
        let rows = self.fetch(ADMINISTRATIVE_SQL, filter.like_pattern(), filter.limit).await?;
        rows.iter().map(administrative_service_from_row).collect()
    }
}

fn course_from_row(row: &SqliteRow) -> Result<Course, RepositoryError> {
    Ok(Course {
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        credits: row.try_get("credits")?,
        prerequisites: row.try_get("prerequisites")?,
        semester: row.try_get("semester")?,
        lecturer: row.try_get("lecturer")?,
        department: row.try_get("department")?,
    })
}

fn calendar_event_from_row(row: &SqliteRow) -> Result<CalendarEvent, RepositoryError> {
    Ok(CalendarEvent {
        event_type: row.try_get("event_type")?,
        event_date: row.try_get("event_date")?,
        semester: row.try_get("semester")?,
        session: row.try_get("session")?,
        description: row.try_get("description")?,
    })
}

fn fee_from_row(row: &SqliteRow) -> Result<Fee, RepositoryError> {
    Ok(Fee {
        level: row.try_get("level")?,
        amount: row.try_get("amount")?,
        fee_type: row.try_get("fee_type")?,
        session: row.try_get("session")?,
    })
}

fn hostel_from_row(row: &SqliteRow) -> Result<Hostel, RepositoryError> {
    Ok(Hostel {
        name: row.try_get("name")?,
        gender: row.try_get("gender")?,
        capacity: row.try_get("capacity")?,
        status: row.try_get("status")?,
        facilities: row.try_get("facilities")?,
    })
}

fn library_service_from_row(row: &SqliteRow) -> Result<LibraryService, RepositoryError> {
    Ok(LibraryService {
        category: row.try_get("category")?,
        name: row.try_get("name")?,
        details: row.try_get("details")?,
    })
}

fn administrative_service_from_row(
    row: &SqliteRow,
) -> Result<AdministrativeService, RepositoryError> {
    Ok(AdministrativeService {
        service: row.try_get("service")?,
        fee: row.try_get("fee")?,
        processing_time: row.try_get("processing_time")?,
        requirements: row.try_get("requirements")?,
    })
}
