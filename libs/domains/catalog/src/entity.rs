use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Content, Product};

/// Sea-ORM Entity for the catalog_products table
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub tags: Json, // JSONB array of strings
    pub image_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Product {
    type Error = CatalogError;

    fn try_from(model: Model) -> CatalogResult<Self> {
        let tags: Vec<String> = serde_json::from_value(model.tags).map_err(|e| {
            CatalogError::Internal(format!("Corrupt tags for product {}: {}", model.id, e))
        })?;

        Ok(Product {
            id: model.id,
            content: Content {
                title: model.title,
                content: model.content,
                tags,
            },
            image_id: model.image_id,
        })
    }
}

impl From<&Product> for ActiveModel {
    fn from(product: &Product) -> Self {
        let tags = serde_json::Value::from(product.content.tags.clone());

        ActiveModel {
            id: Set(product.id),
            title: Set(product.content.title.clone()),
            content: Set(product.content.content.clone()),
            tags: Set(tags),
            image_id: Set(product.image_id),
            created_at: Set(chrono::Utc::now().into()),
        }
    }
}
