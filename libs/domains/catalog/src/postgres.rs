use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use tracing::info;
use uuid::Uuid;

use crate::{
    entity,
    error::{CatalogError, CatalogResult},
    models::Product,
    repository::{CatalogRepository, resolve_in_order},
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_products (
    id uuid PRIMARY KEY,
    title varchar NOT NULL,
    content text NOT NULL,
    tags jsonb NOT NULL DEFAULT '[]'::jsonb,
    image_id uuid NOT NULL,
    created_at timestamptz NOT NULL DEFAULT now()
);
CREATE INDEX IF NOT EXISTS idx_catalog_products_created_at
    ON catalog_products (created_at, id);
"#;

const TAG_FILTER: &str =
    "EXISTS (SELECT 1 FROM jsonb_array_elements_text(tags) AS tag WHERE tag LIKE $1)";

/// Postgres-backed catalog store.
///
/// Rows are ordered by `(created_at, id)`; ids are UUIDv7 so the secondary key
/// also follows insertion time.
pub struct PgCatalogRepository {
    db: DatabaseConnection,
}

impl PgCatalogRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> CatalogResult<Self> {
        let mut opt = ConnectOptions::new(database_url);
        opt.max_connections(20)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .acquire_timeout(Duration::from_secs(8))
            .sqlx_logging(false);

        let db = Database::connect(opt).await?;
        info!("Connected to catalog database");
        Ok(Self::new(db))
    }

    /// Create the products table if it does not exist
    pub async fn init_schema(&self) -> CatalogResult<()> {
        self.db.execute_unprepared(SCHEMA).await?;
        Ok(())
    }
}

/// Escape LIKE metacharacters and wrap for a substring match
fn like_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Unique violations on insert mean the id is already stored
fn save_error(sql_err: Option<SqlErr>, err: DbErr, id: Uuid) -> CatalogError {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => CatalogError::DuplicateId {
            target: "catalog store".to_string(),
            id,
        },
        _ => err.into(),
    }
}

fn to_products(models: Vec<entity::Model>) -> CatalogResult<Vec<Product>> {
    models.into_iter().map(Product::try_from).collect()
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn save(&self, product: &Product) -> CatalogResult<()> {
        let active_model: entity::ActiveModel = product.into();

        entity::Entity::insert(active_model)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e: DbErr| save_error(e.sql_err(), e, product.id))?;

        info!(product_id = %product.id, "Saved product");
        Ok(())
    }

    async fn get(&self, id: Uuid) -> CatalogResult<Option<Product>> {
        entity::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn get_many(&self, ids: &[Uuid]) -> CatalogResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut unique = ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let models = entity::Entity::find()
            .filter(entity::Column::Id.is_in(unique))
            .all(&self.db)
            .await?;

        let found: HashMap<Uuid, Product> = to_products(models)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(resolve_in_order(ids, found))
    }

    async fn filter_by_tag(
        &self,
        tag: &str,
        limit: u64,
        skip: u64,
    ) -> CatalogResult<Vec<Product>> {
        let models = entity::Entity::find()
            .filter(Expr::cust_with_values(TAG_FILTER, [like_pattern(tag)]))
            .order_by_asc(entity::Column::CreatedAt)
            .order_by_asc(entity::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&self.db)
            .await?;

        to_products(models)
    }

    async fn list_ids(&self, limit: u64) -> CatalogResult<Vec<Uuid>> {
        let ids = entity::Entity::find()
            .select_only()
            .column(entity::Column::Id)
            .order_by_asc(entity::Column::CreatedAt)
            .order_by_asc(entity::Column::Id)
            .limit(limit)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;

        Ok(ids)
    }
}
