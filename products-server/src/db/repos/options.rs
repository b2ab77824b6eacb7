//! Product option repository
//!
//! Every statement is scoped by product id, so an option is only reachable
//! through the product that owns it.

use products_core::{Context, Database};
use sqlx::{Executor, FromRow, Sqlite};
use uuid::Uuid;

use super::{bounded, DbError};
use crate::models::ProductOption;

#[derive(Debug, FromRow)]
struct OptionRow {
    #[sqlx(rename = "Id")]
    id: Option<String>,
    #[sqlx(rename = "Name")]
    name: Option<String>,
    #[sqlx(rename = "Description")]
    description: Option<String>,
}

impl From<OptionRow> for ProductOption {
    fn from(row: OptionRow) -> Self {
        Self {
            id: row.id.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
        }
    }
}

/// Product option repository
pub struct OptionRepo<'a> {
    db: &'a Database,
}

impl<'a> OptionRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    #[tracing::instrument(name = "options.list", skip(self, ctx))]
    pub async fn list(
        &self,
        ctx: &Context,
        product_id: Uuid,
    ) -> Result<Vec<ProductOption>, DbError> {
        let pool = self.db.ro(ctx).await?;

        let rows: Vec<OptionRow> = bounded(
            ctx,
            sqlx::query_as(
                r#"
                SELECT "Id", "Name", "Description" FROM "ProductOptions"
                WHERE "ProductId" = ? COLLATE NOCASE
                ORDER BY rowid
                "#,
            )
            .bind(product_id.to_string())
            .fetch_all(&pool),
        )
        .await?;

        Ok(rows.into_iter().map(ProductOption::from).collect())
    }

    #[tracing::instrument(name = "options.show", skip(self, ctx))]
    pub async fn get(
        &self,
        ctx: &Context,
        product_id: Uuid,
        option_id: Uuid,
    ) -> Result<ProductOption, DbError> {
        let pool = self.db.ro(ctx).await?;

        let row: Option<OptionRow> = bounded(
            ctx,
            sqlx::query_as(
                r#"
                SELECT "Id", "Name", "Description" FROM "ProductOptions"
                WHERE "Id" = ? COLLATE NOCASE AND "ProductId" = ? COLLATE NOCASE
                "#,
            )
            .bind(option_id.to_string())
            .bind(product_id.to_string())
            .fetch_optional(&pool),
        )
        .await?;

        row.map(ProductOption::from).ok_or_else(|| DbError::NotFound {
            resource: "product_option",
            id: option_id.to_string(),
        })
    }

    /// Insert an option for `product_id` under a fresh id, returning the id.
    #[tracing::instrument(name = "options.create", skip(self, ctx, option))]
    pub async fn create(
        &self,
        ctx: &Context,
        product_id: Uuid,
        option: &ProductOption,
    ) -> Result<Uuid, DbError> {
        let pool = self.db.rw(ctx).await?;
        let id = Uuid::new_v4();

        bounded(
            ctx,
            sqlx::query(
                r#"
                INSERT INTO "ProductOptions" ("Id", "ProductId", "Name", "Description")
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(id.to_string())
            .bind(product_id.to_string())
            .bind(&option.name)
            .bind(&option.description)
            .execute(&pool),
        )
        .await?;

        tracing::debug!(%id, "product option created");
        Ok(id)
    }

    #[tracing::instrument(name = "options.update", skip(self, ctx, option))]
    pub async fn update(
        &self,
        ctx: &Context,
        product_id: Uuid,
        option_id: Uuid,
        option: &ProductOption,
    ) -> Result<u64, DbError> {
        let pool = self.db.rw(ctx).await?;

        let result = bounded(
            ctx,
            sqlx::query(
                r#"
                UPDATE "ProductOptions" SET "Name" = ?, "Description" = ?
                WHERE "Id" = ? COLLATE NOCASE AND "ProductId" = ? COLLATE NOCASE
                "#,
            )
            .bind(&option.name)
            .bind(&option.description)
            .bind(option_id.to_string())
            .bind(product_id.to_string())
            .execute(&pool),
        )
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(name = "options.delete", skip(self, ctx))]
    pub async fn delete(
        &self,
        ctx: &Context,
        product_id: Uuid,
        option_id: Uuid,
    ) -> Result<u64, DbError> {
        let pool = self.db.rw(ctx).await?;

        let result = bounded(
            ctx,
            sqlx::query(
                r#"
                DELETE FROM "ProductOptions"
                WHERE "Id" = ? COLLATE NOCASE AND "ProductId" = ? COLLATE NOCASE
                "#,
            )
            .bind(option_id.to_string())
            .bind(product_id.to_string())
            .execute(&pool),
        )
        .await?;

        Ok(result.rows_affected())
    }

    /// Remove every option of a product through `executor`, which may be an
    /// open transaction.
    #[tracing::instrument(name = "options.delete_all", skip(ctx, executor))]
    pub(crate) async fn delete_all<'e, E>(
        ctx: &Context,
        executor: E,
        product_id: Uuid,
    ) -> Result<u64, DbError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = bounded(
            ctx,
            sqlx::query(r#"DELETE FROM "ProductOptions" WHERE "ProductId" = ? COLLATE NOCASE"#)
                .bind(product_id.to_string())
                .execute(executor),
        )
        .await?;

        Ok(result.rows_affected())
    }
}
