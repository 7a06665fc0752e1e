use tokio::sync::RwLock;

use campusdesk_core::domain::directory::{
    AdministrativeService, CalendarEvent, Course, DirectoryFilter, Fee, Hostel, LibraryService,
};

use super::{DirectoryRepository, RepositoryError};

/// Directory held in process memory, with the same filter rules as the SQL store.
#[derive(Default)]
pub struct InMemoryDirectoryRepository {
    courses: RwLock<Vec<Course>>,
    calendar: RwLock<Vec<CalendarEvent>>,
    fees: RwLock<Vec<Fee>>,
    hostels: RwLock<Vec<Hostel>>,
    library: RwLock<Vec<LibraryService>>,
    administrative: RwLock<Vec<AdministrativeService>>,
}

impl InMemoryDirectoryRepository {
    pub async fn add_course(&self, course: Course) {
        self.courses.write().await.push(course);
    }

    pub async fn add_calendar_event(&self, event: CalendarEvent) {
        self.calendar.write().await.push(event);
    }

    pub async fn add_fee(&self, fee: Fee) {
        self.fees.write().await.push(fee);
    }

    pub async fn add_hostel(&self, hostel: Hostel) {
        self.hostels.write().await.push(hostel);
    }

    pub async fn add_library_service(&self, service: LibraryService) {
        self.library.write().await.push(service);
    }

    pub async fn add_administrative_service(&self, service: AdministrativeService) {
        self.administrative.write().await.push(service);
    }
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.map(|value| value.to_lowercase().contains(needle)).unwrap_or(false)
}

fn select<T: Clone>(
    rows: &[T],
    filter: &DirectoryFilter,
    matches: impl Fn(&T, &str) -> bool,
) -> Vec<T> {
    let needle = filter.term.as_ref().map(|term| term.to_lowercase());
    rows.iter()
        .filter(|row| needle.as_deref().map(|needle| matches(row, needle)).unwrap_or(true))
        .take(filter.limit as usize)
        .cloned()
        .collect()
}

#[async_trait::async_trait]
impl DirectoryRepository for InMemoryDirectoryRepository {
    async fn courses(&self, filter: &DirectoryFilter) -> Result<Vec<Course>, RepositoryError> {
        let mut courses = self.courses.read().await.clone();
        courses.sort_by(|left, right| left.code.cmp(&right.code));
        Ok(select(courses.as_slice(), filter, |course, needle| {
            contains(Some(&course.name), needle) || contains(Some(&course.code), needle)
        }))
    }

    async fn calendar(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<CalendarEvent>, RepositoryError> {
        let mut events = self.calendar.read().await.clone();
        events.sort_by(|left, right| left.event_date.cmp(&right.event_date));
        Ok(select(events.as_slice(), filter, |event, needle| {
            contains(event.semester.as_deref(), needle)
        }))
    }

    async fn fees(&self, filter: &DirectoryFilter) -> Result<Vec<Fee>, RepositoryError> {
        let fees = self.fees.read().await;
        Ok(select(fees.as_slice(), filter, |fee, needle| contains(Some(&fee.level), needle)))
    }

    async fn hostels(&self, filter: &DirectoryFilter) -> Result<Vec<Hostel>, RepositoryError> {
        let mut hostels = self.hostels.read().await.clone();
        hostels.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(select(hostels.as_slice(), filter, |hostel, needle| {
            let gender = hostel.gender.as_deref().map(str::to_lowercase);
            matches!(gender.as_deref(), Some(value) if value == needle || value == "mixed")
        }))
    }

    async fn library(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<LibraryService>, RepositoryError> {
        let services = self.library.read().await;
        Ok(select(services.as_slice(), filter, |service, needle| {
            contains(Some(&service.category), needle)
                || contains(Some(&service.name), needle)
                || contains(service.details.as_deref(), needle)
        }))
    }

    async fn administrative(
        &self,
        filter: &DirectoryFilter,
    ) -> Result<Vec<AdministrativeService>, RepositoryError> {
        let services = self.administrative.read().await;
        Ok(select(services.as_slice(), filter, |service, needle| {
            contains(Some(&service.service), needle)
        }))
    }
}
