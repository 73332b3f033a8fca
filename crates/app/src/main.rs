use migration::{Migrator, MigratorTrait};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "keystone={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;
    let engine = engine::Engine::builder().database(db).build();

    if let Some(demo) = settings.demo {
        match engine.create_user(&demo.username, &demo.password).await {
            Ok(()) => tracing::info!(user = %demo.username, "demo account provisioned"),
            Err(engine::EngineError::ExistingKey(_)) => {
                tracing::info!(user = %demo.username, "demo account already present");
            }
            Err(err) => return Err(err.into()),
        }
    }

    tracing::info!(
        seed_balance = %engine::SEED_BALANCE,
        min_transfer = %engine::MIN_TRANSFER,
        "engine ready"
    );
    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{path}?mode=rwc"),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
