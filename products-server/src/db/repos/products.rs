//! Product repository
//!
//! Handles product CRUD:
//! - list: optional case-insensitive name filter
//! - delete: options and product removed in one transaction

use products_core::{Context, Database};
use sqlx::FromRow;
use uuid::Uuid;

use super::{bounded, DbError, OptionRepo};
use crate::models::Product;

const SELECT_PRODUCTS: &str = r#"
    SELECT "Id", "Name", "Description",
           CAST("Price" AS REAL) AS "Price",
           CAST("DeliveryPrice" AS REAL) AS "DeliveryPrice"
    FROM "Products"
"#;

/// Product row; every column is nullable in the schema.
#[derive(Debug, FromRow)]
struct ProductRow {
    #[sqlx(rename = "Id")]
    id: Option<String>,
    #[sqlx(rename = "Name")]
    name: Option<String>,
    #[sqlx(rename = "Description")]
    description: Option<String>,
    #[sqlx(rename = "Price")]
    price: Option<f64>,
    #[sqlx(rename = "DeliveryPrice")]
    delivery_price: Option<f64>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            price: row.price.unwrap_or_default(),
            delivery_price: row.delivery_price.unwrap_or_default(),
        }
    }
}

/// Product repository
pub struct ProductRepo<'a> {
    db: &'a Database,
}

impl<'a> ProductRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// All products, optionally filtered by a case-insensitive name fragment.
    #[tracing::instrument(name = "products.list", skip(self, ctx))]
    pub async fn list(&self, ctx: &Context, name: Option<&str>) -> Result<Vec<Product>, DbError> {
        let pool = self.db.ro(ctx).await?;

        let rows: Vec<ProductRow> = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                let sql = format!(
                    r#"{SELECT_PRODUCTS} WHERE lower("Name") LIKE ? ORDER BY rowid"#
                );
                bounded(
                    ctx,
                    sqlx::query_as(&sql)
                        .bind(format!("%{}%", name.to_lowercase()))
                        .fetch_all(&pool),
                )
                .await?
            }
            None => {
                let sql = format!("{SELECT_PRODUCTS} ORDER BY rowid");
                bounded(ctx, sqlx::query_as(&sql).fetch_all(&pool)).await?
            }
        };

        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[tracing::instrument(name = "products.show", skip(self, ctx))]
    pub async fn get(&self, ctx: &Context, id: Uuid) -> Result<Product, DbError> {
        let pool = self.db.ro(ctx).await?;
        let sql = format!(r#"{SELECT_PRODUCTS} WHERE "Id" = ? COLLATE NOCASE"#);

        let row: Option<ProductRow> = bounded(
            ctx,
            sqlx::query_as(&sql).bind(id.to_string()).fetch_optional(&pool),
        )
        .await?;

        row.map(Product::from).ok_or_else(|| DbError::NotFound {
            resource: "product",
            id: id.to_string(),
        })
    }

    /// Insert a product under a fresh id, returning the id.
    #[tracing::instrument(name = "products.create", skip(self, ctx, product))]
    pub async fn create(&self, ctx: &Context, product: &Product) -> Result<Uuid, DbError> {
        let pool = self.db.rw(ctx).await?;
        let id = Uuid::new_v4();

        bounded(
            ctx,
            sqlx::query(
                r#"
                INSERT INTO "Products" ("Id", "Name", "Description", "Price", "DeliveryPrice")
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(id.to_string())
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.delivery_price)
            .execute(&pool),
        )
        .await?;

        tracing::debug!(%id, "product created");
        Ok(id)
    }

    /// Overwrite a product's fields. Returns the number of rows changed.
    #[tracing::instrument(name = "products.update", skip(self, ctx, product))]
    pub async fn update(&self, ctx: &Context, id: Uuid, product: &Product) -> Result<u64, DbError> {
        let pool = self.db.rw(ctx).await?;

        let result = bounded(
            ctx,
            sqlx::query(
                r#"
                UPDATE "Products"
                SET "Name" = ?, "Description" = ?, "Price" = ?, "DeliveryPrice" = ?
                WHERE "Id" = ? COLLATE NOCASE
                "#,
            )
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price)
            .bind(product.delivery_price)
            .bind(id.to_string())
            .execute(&pool),
        )
        .await?;

        Ok(result.rows_affected())
    }

    /// Delete a product and all of its options atomically.
    /// Returns the number of product rows removed.
    #[tracing::instrument(name = "products.delete", skip(self, ctx))]
    pub async fn delete(&self, ctx: &Context, id: Uuid) -> Result<u64, DbError> {
        let pool = self.db.rw(ctx).await?;
        let mut tx = bounded(ctx, pool.begin()).await?;

        OptionRepo::delete_all(ctx, &mut *tx, id).await?;

        let result = bounded(
            ctx,
            sqlx::query(r#"DELETE FROM "Products" WHERE "Id" = ? COLLATE NOCASE"#)
                .bind(id.to_string())
                .execute(&mut *tx),
        )
        .await?;

        bounded(ctx, tx.commit()).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::testing;
    use crate::db::OptionRepo;
    use crate::models::ProductOption;

    fn product(name: &str) -> Product {
        Product {
            name: name.into(),
            description: format!("{name} description"),
            price: 10.5,
            delivery_price: 2.0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_then_get() {
        let (_dir, db) = testing::database().await;
        let ctx = Context::background();
        let repo = ProductRepo::new(&db);

        let id = repo.create(&ctx, &product("Galaxy")).await.unwrap();
        let stored = repo.get(&ctx, id).await.unwrap();

        assert_eq!(stored.id, id.to_string());
        assert_eq!(stored.name, "Galaxy");
        assert_eq!(stored.price, 10.5);
        assert_eq!(stored.delivery_price, 2.0);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let (_dir, db) = testing::database().await;
        let err = ProductRepo::new(&db)
            .get(&Context::background(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { resource: "product", .. }));
    }

    #[tokio::test]
    async fn list_filters_by_name_case_insensitively() {
        let (_dir, db) = testing::database().await;
        let ctx = Context::background();
        let repo = ProductRepo::new(&db);
        repo.create(&ctx, &product("Apple iPhone")).await.unwrap();
        repo.create(&ctx, &product("Samsung Galaxy")).await.unwrap();

        assert_eq!(repo.list(&ctx, None).await.unwrap().len(), 2);

        let found = repo.list(&ctx, Some("IPHONE")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Apple iPhone");

        assert!(repo.list(&ctx, Some("nokia")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_reports_rows_affected() {
        let (_dir, db) = testing::database().await;
        let ctx = Context::background();
        let repo = ProductRepo::new(&db);
        let id = repo.create(&ctx, &product("Old")).await.unwrap();

        assert_eq!(repo.update(&ctx, id, &product("New")).await.unwrap(), 1);
        assert_eq!(repo.get(&ctx, id).await.unwrap().name, "New");
        assert_eq!(repo.update(&ctx, Uuid::new_v4(), &product("X")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_removes_options_too() {
        let (_dir, db) = testing::database().await;
        let ctx = Context::background();
        let repo = ProductRepo::new(&db);
        let options = OptionRepo::new(&db);

        let id = repo.create(&ctx, &product("Doomed")).await.unwrap();
        let option = ProductOption {
            name: "Black".into(),
            description: "Black finish".into(),
            ..Default::default()
        };
        options.create(&ctx, id, &option).await.unwrap();

        assert_eq!(repo.delete(&ctx, id).await.unwrap(), 1);
        assert!(options.list(&ctx, id).await.unwrap().is_empty());
        assert_eq!(repo.delete(&ctx, id).await.unwrap(), 0);
    }
}
