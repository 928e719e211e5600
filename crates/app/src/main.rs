use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "prestito={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let engine = engine::Engine::builder().database(db).build().await?;

    // Reclassify loans that went past due since the last run.
    let today = chrono::Local::now().date_naive();
    let swept = engine.sweep_overdue(today).await?;
    tracing::info!("overdue sweep for {today}: {swept} loans flagged");

    for loan in engine.list_overdue(today).await? {
        tracing::warn!(
            "loan {} for user {} is {} days overdue (due {})",
            loan.id,
            loan.user_id,
            loan.days_late(today),
            loan.due_date
        );
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
