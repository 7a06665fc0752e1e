//! Deterministic demo directory used by `campusdesk seed`, by startup seeding
//! and by store-backed tests.

use serde::Serialize;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

type CourseSeed =
    (&'static str, &'static str, i64, &'static str, &'static str, &'static str, &'static str);

const COURSES: &[CourseSeed] = &[
    (
        "CSC201",
        "Computer Programming II",
        3,
        "CSC101",
        "Advanced programming concepts, data structures, and algorithms",
        "Second Semester",
        "Dr. Adeyemi O.",
    ),
    (
        "CSC301",
        "Database Management Systems",
        3,
        "CSC201",
        "Database design, SQL, normalization, and transaction management",
        "First Semester",
        "Prof. Ibrahim S.",
    ),
    (
        "CSC302",
        "Operating Systems",
        3,
        "CSC201",
        "Process management, memory management, file systems, and concurrency",
        "Second Semester",
        "Dr. Ogunleye T.",
    ),
    (
        "CSC303",
        "Web Programming",
        3,
        "CSC201",
        "HTML, CSS, JavaScript, backend development, and web frameworks",
        "First Semester",
        "Mr. Adeleke M.",
    ),
    (
        "CSC401",
        "Software Engineering",
        4,
        "CSC301",
        "Software development lifecycle, design patterns, testing, and project management",
        "First Semester",
        "Prof. Olaniyan K.",
    ),
    (
        "MTH301",
        "Discrete Mathematics",
        3,
        "MTH201",
        "Logic, set theory, graph theory, and combinatorics",
        "First Semester",
        "Dr. Balogun F.",
    ),
    (
        "MTH302",
        "Numerical Analysis",
        3,
        "MTH201, CSC201",
        "Numerical methods for solving mathematical problems using computers",
        "Second Semester",
        "Prof. Akinola J.",
    ),
];

const SESSION: &str = "2024/2025";

const FEES: &[(&str, i64, &str)] = &[
    ("100 Level", 100_000, "Tuition + Acceptance"),
    ("200-400 Level", 75_000, "Tuition"),
    ("500 Level", 85_000, "Tuition"),
];

const CALENDAR: &[(&str, &str, &str, &str)] = &[
    ("Registration Start", "2024-09-01", "First Semester", "Registration opens"),
    ("Registration End", "2024-09-15", "First Semester", "Registration closes"),
    ("Semester Start", "2024-09-16", "First Semester", "Classes begin"),
    ("Add/Drop Deadline", "2024-09-30", "First Semester", "Last day to add or drop courses"),
    ("Mid-Semester Break", "2024-11-04", "First Semester", "Mid-semester break begins"),
    ("Semester End", "2024-12-20", "First Semester", "Lectures end"),
    ("Exam Period", "2025-01-06", "First Semester", "Examinations run until 2025-01-20"),
    ("Registration Start", "2025-02-01", "Second Semester", "Registration opens"),
    ("Registration End", "2025-02-15", "Second Semester", "Registration closes"),
    ("Semester Start", "2025-02-16", "Second Semester", "Classes begin"),
    ("Add/Drop Deadline", "2025-03-02", "Second Semester", "Last day to add or drop courses"),
    ("Mid-Semester Break", "2025-04-14", "Second Semester", "Mid-semester break begins"),
    ("Semester End", "2025-06-15", "Second Semester", "Lectures end"),
    ("Exam Period", "2025-06-20", "Second Semester", "Examinations run until 2025-07-10"),
];

const HOSTEL_FACILITIES: &str = "24/7 electricity, Water, Security";

const HOSTELS: &[(&str, &str, i64)] = &[
    ("Ajose Hall", "Male", 400),
    ("Yusuf Hall", "Male", 350),
    ("Adeoye Hall", "Female", 380),
    ("Mercy Hall", "Female", 400),
];

const LIBRARY: &[(&str, &str, &str)] = &[
    ("hours", "Weekday opening hours", "8:00 AM - 10:00 PM"),
    ("hours", "Weekend opening hours", "10:00 AM - 6:00 PM"),
    ("hours", "Exam period opening hours", "24/7 with student ID"),
    ("borrowing", "Book borrowing", "Up to 4 books for 2 weeks, renewable once"),
    ("borrowing", "Late return fine", "N50 per day for late returns"),
    ("resources", "Digital resources", "E-books plus JSTOR, IEEE and ScienceDirect access"),
    ("resources", "Reference materials", "Use in library only"),
    ("facilities", "Study rooms", "Bookable study rooms and common reading rooms"),
    ("facilities", "Computer lab", "Internet access, printing and scanning"),
    ("contact", "Library desk", "library@lautech.edu.ng"),
];

const ADMINISTRATIVE: &[(&str, &str, &str, &str)] = &[
    (
        "Student ID Card",
        "N2,000",
        "2 weeks",
        "Admission letter and 2 passport photos; collect at the Registry Office",
    ),
    (
        "Undergraduate Transcript",
        "N10,000 (official)",
        "4-6 weeks",
        "Application letter, payment receipt, photocopy of degree certificate, valid ID",
    ),
    ("Postgraduate Transcript", "N15,000 (official)", "4-6 weeks", "Application letter, payment receipt"),
    (
        "Certificate Collection",
        "None",
        "6 months after final exams",
        "Clearance from all departments, no outstanding fees, valid student ID",
    ),
    (
        "Verification Letter",
        "N5,000",
        "3-5 working days",
        "Purpose of request (employment, NYSC, further studies)",
    ),
    (
        "Clearance",
        "None",
        "Before certificate collection",
        "Library, Bursary, Hostel, Department and ICT sign-off",
    ),
];

/// Row counts of every directory table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryCounts {
    pub courses: i64,
    pub fees: i64,
    pub calendar_events: i64,
    pub hostels: i64,
    pub library_services: i64,
    pub administrative_services: i64,
}

impl DirectoryCounts {
    pub fn total(&self) -> i64 {
        self.courses
            + self.fees
            + self.calendar_events
            + self.hostels
            + self.library_services
            + self.administrative_services
    }
}

/// Replaces the directory contents with the demo dataset in one transaction.
pub async fn seed_demo_data(pool: &DbPool) -> Result<DirectoryCounts, RepositoryError> {
    let mut tx = pool.begin().await?;

    for table in [
        "courses",
        "fees",
        "academic_calendar",
        "hostels",
        "library_services",
        "administrative_services",
    ] {
        sqlx::query(&format!("DELETE FROM {table}")).execute(&mut *tx).await?;
    }

    for &(code, name, credits, prerequisites, description, semester, lecturer) in COURSES {
        let department =
            if code.starts_with("MTH") { "Mathematics" } else { "Computer Science" };
        sqlx::query(
            "INSERT INTO courses
                (code, name, credits, prerequisites, description, semester, lecturer, department)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(code)
        .bind(name)
        .bind(credits)
        .bind(prerequisites)
        .bind(description)
        .bind(semester)
        .bind(lecturer)
        .bind(department)
        .execute(&mut *tx)
        .await?;
    }

    for &(level, amount, fee_type) in FEES {
        sqlx::query("INSERT INTO fees (level, amount, fee_type, session) VALUES (?, ?, ?, ?)")
            .bind(level)
            .bind(amount)
            .bind(fee_type)
            .bind(SESSION)
            .execute(&mut *tx)
            .await?;
    }

    for &(event_type, event_date, semester, description) in CALENDAR {
        sqlx::query(
            "INSERT INTO academic_calendar (event_type, event_date, semester, session, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event_type)
        .bind(event_date)
        .bind(semester)
        .bind(SESSION)
        .bind(description)
        .execute(&mut *tx)
        .await?;
    }

    for &(name, gender, capacity) in HOSTELS {
        sqlx::query(
            "INSERT INTO hostels (name, gender, capacity, status, facilities)
             VALUES (?, ?, ?, 'Available', ?)",
        )
        .bind(name)
        .bind(gender)
        .bind(capacity)
        .bind(HOSTEL_FACILITIES)
        .execute(&mut *tx)
        .await?;
    }

    for &(category, name, details) in LIBRARY {
        sqlx::query("INSERT INTO library_services (category, name, details) VALUES (?, ?, ?)")
            .bind(category)
            .bind(name)
            .bind(details)
            .execute(&mut *tx)
            .await?;
    }

    for &(service, fee, processing_time, requirements) in ADMINISTRATIVE {
        sqlx::query(
            "INSERT INTO administrative_services (service, fee, processing_time, requirements)
             VALUES (?, ?, ?, ?)",
        )
        .bind(service)
        .bind(fee)
        .bind(processing_time)
        .bind(requirements)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    directory_counts(pool).await
}

pub async fn directory_counts(pool: &DbPool) -> Result<DirectoryCounts, RepositoryError> {
    let count = |table: &'static str| async move {
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
    };

    Ok(DirectoryCounts {
        courses: count("courses").await?,
        fees: count("fees").await?,
        calendar_events: count("academic_calendar").await?,
        hostels: count("hostels").await?,
        library_services: count("library_services").await?,
        administrative_services: count("administrative_services").await?,
    })
}

#[cfg(test)]
mod tests {
    use super::{directory_counts, seed_demo_data, DirectoryCounts};
    use crate::{connect_with_settings, migrations};

    async fn migrated_pool() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        pool
    }

    #[tokio::test]
    async fn empty_directory_counts_are_zero() {
        let pool = migrated_pool().await;

        let counts = directory_counts(&pool).await.expect("counts");

        assert_eq!(counts, DirectoryCounts::default());
    }

    #[tokio::test]
    async fn seeding_populates_every_table() {
        let pool = migrated_pool().await;

        let counts = seed_demo_data(&pool).await.expect("seed");

        assert_eq!(counts.courses, 7);
        assert_eq!(counts.fees, 3);
        assert_eq!(counts.calendar_events, 14);
        assert_eq!(counts.hostels, 4);
        assert_eq!(counts.library_services, 10);
        assert_eq!(counts.administrative_services, 6);
    }

    #[tokio::test]
    async fn reseeding_replaces_rather_than_duplicates() {
        let pool = migrated_pool().await;

        let first = seed_demo_data(&pool).await.expect("first seed");
        let second = seed_demo_data(&pool).await.expect("second seed");

        assert_eq!(first, second);
        assert_eq!(second.total(), 44);
    }
}
