//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs without hand-written SQL. Creation is idempotent (`IF NOT EXISTS`),
//! and the month table is seeded on every start.

use crate::entities::{
    Attendance, AttendanceHistory, Grade, Guardian, Month, Payment, PaymentMonth, PaymentPlan,
    PaymentPlanMonth, Receipt, Student, StudentGuardian, month,
};
use crate::errors::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Schema, Set,
};
use std::path::Path;
use tracing::{debug, info};

/// Months in billing order, seeded into the `months` table.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Establishes a connection to the database at `database_url`.
///
/// For file-backed `SQLite` URLs the parent directory is created first so a fresh
/// checkout can start without manual setup.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    ensure_sqlite_parent_dir(database_url)?;
    debug!("Connecting to database at {}", database_url);
    Database::connect(database_url).await.map_err(Into::into)
}

fn ensure_sqlite_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or_default();
    if file.is_empty() || file.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// Referenced tables are created before the tables that point at them.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Grade).await?;
    create_table(db, &schema, PaymentPlan).await?;
    create_table(db, &schema, Month).await?;
    create_table(db, &schema, Student).await?;
    create_table(db, &schema, Guardian).await?;
    create_table(db, &schema, StudentGuardian).await?;
    create_table(db, &schema, Attendance).await?;
    create_table(db, &schema, AttendanceHistory).await?;
    create_table(db, &schema, PaymentPlanMonth).await?;
    create_table(db, &schema, Payment).await?;
    create_table(db, &schema, PaymentMonth).await?;
    create_table(db, &schema, Receipt).await?;

    Ok(())
}

/// Inserts any of the twelve months that are missing. Existing rows are left alone.
pub async fn seed_months<C>(db: &C) -> Result<usize>
where
    C: ConnectionTrait,
{
    let mut inserted = 0;
    for (index, name) in MONTH_NAMES.iter().enumerate() {
        let exists = Month::find()
            .filter(month::Column::Name.eq(*name))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let sort_order = index as i32 + 1;
        month::ActiveModel {
            name: Set((*name).to_string()),
            sort_order: Set(sort_order),
            ..Default::default()
        }
        .insert(db)
        .await?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Connects, creates the tables and seeds the months.
pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    let db = create_connection(database_url).await?;
    create_tables(&db).await?;
    let seeded = seed_months(&db).await?;
    info!("Database ready ({} month(s) seeded)", seeded);
    Ok(db)
}
