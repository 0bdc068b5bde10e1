use techstore_db::{connect, migrations, DemoCatalog, SeedResult};

use crate::commands::{
    prepare, CommandResult, StepError, EXIT_DB_CONNECTIVITY, EXIT_MIGRATION,
    EXIT_SEED_VERIFICATION,
};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;
        let outcome = load_and_verify(&pool).await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", success_message(&seeded)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

async fn load_and_verify(pool: &techstore_db::DbPool) -> Result<SeedResult, StepError> {
    migrations::run_pending(pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

    let seeded = DemoCatalog::load(pool)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), EXIT_MIGRATION))?;

    let verification = DemoCatalog::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), EXIT_SEED_VERIFICATION))?;
    if !verification.all_present {
        return Err((
            "seed_verification",
            verification_failure_message(&verification.failed_checks()),
            EXIT_SEED_VERIFICATION,
        ));
    }

    Ok(seeded)
}

fn success_message(seeded: &SeedResult) -> String {
    format!(
        "demo catalog ready: {} product(s) inserted, {} already present ({} total)",
        seeded.inserted,
        seeded.already_present,
        DemoCatalog::len()
    )
}

fn verification_failure_message(failed_checks: &[&str]) -> String {
    if failed_checks.is_empty() {
        "demo catalog verification failed".to_string()
    } else {
        format!("demo catalog is missing: {}", failed_checks.join(", "))
    }
}
