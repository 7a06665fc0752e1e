use std::sync::Arc;

use crate::commands::{prepare, CommandResult};
use campusdesk_agent::runtime::{AssistantRequest, AssistantRuntime};
use campusdesk_db::{connect_with_config, migrations, seed_demo_data, SqlDirectoryRepository};

/// Answers one question through the same runtime the server uses and prints
/// the response payload. Exit code 7 when the response carries an error.
pub fn run(request: AssistantRequest) -> CommandResult {
    let (config, runtime) = match prepare("ask") {
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
        if config.database.seed_demo_data {
            seed_demo_data(&pool)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;
        }

        let directory = Arc::new(SqlDirectoryRepository::new(pool.clone()));
        let assistant = AssistantRuntime::from_config(&config, directory)
            .map_err(|error| ("model_client", error.to_string(), 3u8))?;
        let response = assistant.handle(request).await;

        pool.close().await;
        Ok::<_, (&'static str, String, u8)>(response)
    });

    match result {
        Ok(response) => {
            let exit_code = if response.is_error() { 7 } else { 0 };
            match serde_json::to_string(&response) {
                Ok(output) => CommandResult { exit_code, output },
                Err(error) => CommandResult::failure("ask", "serialization", error.to_string(), 1),
            }
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}
