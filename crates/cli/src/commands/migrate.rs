use techstore_db::{connect, migrations};

use crate::commands::{prepare, CommandResult, StepError, EXIT_DB_CONNECTIVITY, EXIT_MIGRATION};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("migrate") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        let applied = migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION));
        pool.close().await;
        applied?;
        Ok::<(), StepError>(())
    });

    match result {
        Ok(()) => CommandResult::success(
            "migrate",
            format!("applied pending migrations to {}", config.database.url),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
