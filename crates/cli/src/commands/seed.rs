use crate::commands::{prepare, CommandResult};
use campusdesk_db::{connect_with_config, migrations, seed_demo_data, DirectoryCounts};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let counts = seed_demo_data(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8));

        pool.close().await;
        counts
    });

    match result {
        Ok(counts) => CommandResult::success("seed", summary(&counts)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn summary(counts: &DirectoryCounts) -> String {
    format!(
        "demo directory loaded ({} rows):\n  - courses: {}\n  - fees: {}\n  - calendar events: {}\n  - hostels: {}\n  - library services: {}\n  - administrative services: {}",
        counts.total(),
        counts.courses,
        counts.fees,
        counts.calendar_events,
        counts.hostels,
        counts.library_services,
        counts.administrative_services,
    )
}
