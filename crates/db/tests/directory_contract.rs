use campusdesk_core::domain::directory::DirectoryFilter;
use campusdesk_db::{
    connect_with_settings, migrations, seed_demo_data, DirectoryRepository,
    InMemoryDirectoryRepository, SqlDirectoryRepository,
};

type ContractResult<T = ()> = Result<T, String>;

macro_rules! require_eq {
    ($left:expr, $right:expr, $($arg:tt)*) => {
        if $left != $right {
            return Err(format!($($arg)*));
        }
    };
}

async fn seeded_sql() -> ContractResult<SqlDirectoryRepository> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect failed: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate failed: {error}"))?;
    seed_demo_data(&pool).await.map_err(|error| format!("seed failed: {error}"))?;
    Ok(SqlDirectoryRepository::new(pool))
}

/// Copies every row of the SQL store into a fresh in-memory directory.
async fn mirror(sql: &SqlDirectoryRepository) -> ContractResult<InMemoryDirectoryRepository> {
    let all = DirectoryFilter::unfiltered(1000);
    let memory = InMemoryDirectoryRepository::default();
    let error = |error: campusdesk_db::RepositoryError| error.to_string();

    for course in sql.courses(&all).await.map_err(error)? {
        memory.add_course(course).await;
    }
    for event in sql.calendar(&all).await.map_err(error)? {
        memory.add_calendar_event(event).await;
    }
    for fee in sql.fees(&all).await.map_err(error)? {
        memory.add_fee(fee).await;
    }
    for hostel in sql.hostels(&all).await.map_err(error)? {
        memory.add_hostel(hostel).await;
    }
    for service in sql.library(&all).await.map_err(error)? {
        memory.add_library_service(service).await;
    }
    for service in sql.administrative(&all).await.map_err(error)? {
        memory.add_administrative_service(service).await;
    }

    Ok(memory)
}

const TERMS: &[Option<&str>] = &[
    None,
    Some("csc"),
    Some("first"),
    Some("SECOND"),
    Some("200"),
    Some("male"),
    Some("Female"),
    Some("nonbinary"),
    Some("borrow"),
    Some("transcript"),
    Some("%"),
    Some("_"),
    Some("2_0"),
];

#[tokio::test]
async fn in_memory_directory_filters_like_the_sql_store() -> ContractResult {
    let sql = seeded_sql().await?;
    let memory = mirror(&sql).await?;

    for term in TERMS {
        for limit in [2_u32, 50] {
            let filter = DirectoryFilter::new(term.map(str::to_string), limit);

            require_eq!(
                sql.courses(&filter).await.map_err(|e| e.to_string())?,
                memory.courses(&filter).await.map_err(|e| e.to_string())?,
                "courses diverge for {term:?} / {limit}"
            );
            require_eq!(
                sql.calendar(&filter).await.map_err(|e| e.to_string())?,
                memory.calendar(&filter).await.map_err(|e| e.to_string())?,
                "calendar diverges for {term:?} / {limit}"
            );
            require_eq!(
                sql.fees(&filter).await.map_err(|e| e.to_string())?,
                memory.fees(&filter).await.map_err(|e| e.to_string())?,
                "fees diverge for {term:?} / {limit}"
            );
            require_eq!(
                sql.hostels(&filter).await.map_err(|e| e.to_string())?,
                memory.hostels(&filter).await.map_err(|e| e.to_string())?,
                "hostels diverge for {term:?} / {limit}"
            );
            require_eq!(
                sql.library(&filter).await.map_err(|e| e.to_string())?,
                memory.library(&filter).await.map_err(|e| e.to_string())?,
                "library diverges for {term:?} / {limit}"
            );
            require_eq!(
                sql.administrative(&filter).await.map_err(|e| e.to_string())?,
                memory.administrative(&filter).await.map_err(|e| e.to_string())?,
                "administrative services diverge for {term:?} / {limit}"
            );
        }
    }

    Ok(())
}

#[tokio::test]
async fn wildcard_characters_in_terms_match_literally() -> ContractResult {
    let sql = seeded_sql().await?;
    let memory = mirror(&sql).await?;
    let filter = DirectoryFilter::new(Some("%".to_string()), 50);

    let sql_fees = sql.fees(&filter).await.map_err(|e| e.to_string())?;
    let memory_fees = memory.fees(&filter).await.map_err(|e| e.to_string())?;

    require_eq!(sql_fees.len(), 0, "sql store treated `%` as a wildcard: {sql_fees:?}");
    require_eq!(memory_fees.len(), 0, "in-memory store matched `%`: {memory_fees:?}");

    Ok(())
}
