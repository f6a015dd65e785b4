use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Catalog product. `category` holds the owning category's slug, not its id,
/// so renaming a category slug detaches its products.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "product")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(indexed)]
    pub category: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    //integer FCFA, no fractional unit
    pub price: i64,
    pub original_price: Option<i64>,
    pub image: Option<String>,
    pub in_stock: bool,
    pub stock_quantity: i32,
    pub is_popular: bool,
    pub is_new: bool,
    pub is_featured: bool,
    //lowercased name and description, matched by search filters
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub search_text: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
