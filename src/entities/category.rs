use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub image: Option<String>,
    #[sea_orm(indexed)]
    pub parent_id: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    //lowercased name and description, matched by search filters
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub search_text: String,
    //bumped on every update, lets an editor detect that someone else saved first
    pub version: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Parent,
}

impl ActiveModelBehavior for ActiveModel {}
