//! Schema bootstrap
//!
//! Idempotent: every statement is `IF NOT EXISTS`, so it runs on each start.

use products_core::{Context, Database};

use super::repos::{bounded, DbError};

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "Products" (
        "Id" varchar(36),
        "Name" varchar(17),
        "Description" varchar(35),
        "Price" decimal(6,2),
        "DeliveryPrice" decimal(4,2),
        PRIMARY KEY("Id")
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "product_id_index" ON "Products" ("Name" ASC)"#,
    r#"CREATE TABLE IF NOT EXISTS "ProductOptions" (
        "Id" varchar(36),
        "ProductId" varchar(36),
        "Name" varchar(9),
        "Description" varchar(23),
        PRIMARY KEY("Id"),
        FOREIGN KEY("ProductId") REFERENCES "Products"("Id") ON DELETE CASCADE
    )"#,
];

/// Create the product tables on the read-write database.
pub async fn bootstrap(db: &Database, ctx: &Context) -> Result<(), DbError> {
    let pool = db.rw(ctx).await?;
    for statement in STATEMENTS {
        bounded(ctx, sqlx::query(statement).execute(&pool)).await?;
    }
    tracing::info!("product schema ready");
    Ok(())
}
