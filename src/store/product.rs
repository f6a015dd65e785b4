use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::entities::{
    category::{self, Entity as CategoryEntity},
    product::{self, Entity as ProductEntity},
};
use crate::error::StoreError;
use crate::images::{ImageStore, ImageUpload, PRODUCT_FOLDER};
use crate::store::slug::{slugify, SLUG_REGEX};
use crate::store::{clean, matches_search, search_text, Page, PageRequest, Pagination};

#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub in_stock: Option<bool>,
}

impl ProductFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty() && *c != "all") {
            condition = condition.add(product::Column::Category.eq(category));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(matches_search(
                (ProductEntity, product::Column::SearchText),
                search,
            ));
        }
        if let Some(in_stock) = self.in_stock {
            condition = condition.add(product::Column::InStock.eq(in_stock));
        }
        condition
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(max = 200, message = "Le nom ne peut pas dépasser 200 caractères"))]
    pub name: String,
    #[serde(default)]
    #[validate(regex(
        path = *SLUG_REGEX,
        message = "Le slug ne peut contenir que des lettres minuscules, chiffres et tirets"
    ))]
    pub slug: Option<String>,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0, message = "Le prix ne peut pas être négatif"))]
    pub price: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Le prix barré ne peut pas être négatif"))]
    pub original_price: Option<i64>,
    #[serde(default = "default_true")]
    pub in_stock: bool,
    #[serde(default)]
    #[validate(range(min = 0, message = "Le stock ne peut pas être négatif"))]
    pub stock_quantity: i32,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_featured: bool,
}

/// Partial product update. Renaming a product re-derives its slug.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Le nom doit contenir entre 1 et 200 caractères"
    ))]
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Le prix ne peut pas être négatif"))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "Le prix barré ne peut pas être négatif"))]
    pub original_price: Option<i64>,
    pub in_stock: Option<bool>,
    #[validate(range(min = 0, message = "Le stock ne peut pas être négatif"))]
    pub stock_quantity: Option<i32>,
    pub is_popular: Option<bool>,
    pub is_new: Option<bool>,
    pub is_featured: Option<bool>,
}

#[derive(Clone)]
pub struct ProductStore {
    db: Arc<DatabaseConnection>,
    images: Arc<dyn ImageStore>,
}

impl ProductStore {
    pub fn new(db: Arc<DatabaseConnection>, images: Arc<dyn ImageStore>) -> Self {
        Self { db, images }
    }

    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<Page<product::Model>, StoreError> {
        let db = &*self.db;
        let condition = filter.condition();

        let total = ProductEntity::find()
            .filter(condition.clone())
            .count(db)
            .await?;
        let items = ProductEntity::find()
            .filter(condition)
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn get(&self, id: i32) -> Result<product::Model, StoreError> {
        ProductEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<product::Model, StoreError> {
        ProductEntity::find()
            .filter(product::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?
            .ok_or_else(not_found)
    }

    pub async fn create(
        &self,
        mut input: ProductInput,
        image: Option<ImageUpload>,
    ) -> Result<product::Model, StoreError> {
        input.name = input.name.trim().to_string();
        input.slug = clean(input.slug).map(|slug| slug.to_lowercase());
        input.category = input.category.trim().to_string();
        if input.name.is_empty() {
            return Err(StoreError::Validation("Le nom du produit est requis".to_string()));
        }
        input.validate()?;

        let slug = input.slug.clone().unwrap_or_else(|| slugify(&input.name));
        if slug.is_empty() {
            return Err(StoreError::Validation(
                "Impossible de générer un slug à partir du nom".to_string(),
            ));
        }

        let db = &*self.db;
        ensure_category(db, &input.category).await?;
        if slug_taken(db, &slug, None).await? {
            return Err(StoreError::Conflict(
                "Un produit avec ce slug existe déjà".to_string(),
            ));
        }

        let image_ref = match image {
            Some(upload) => Some(self.images.upload(upload, PRODUCT_FOLDER).await?),
            None => None,
        };

        let now = Utc::now();
        let new_product = product::ActiveModel {
            search_text: Set(search_text(&[
                Some(input.name.as_str()),
                Some(input.description.as_str()),
            ])),
            name: Set(input.name),
            slug: Set(slug),
            category: Set(input.category),
            description: Set(input.description),
            price: Set(input.price),
            original_price: Set(input.original_price),
            image: Set(image_ref.clone()),
            in_stock: Set(input.in_stock),
            stock_quantity: Set(input.stock_quantity),
            is_popular: Set(input.is_popular),
            is_new: Set(input.is_new),
            is_featured: Set(input.is_featured),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        //the unique slug index still catches a concurrent insert
        let saved = match new_product.insert(db).await {
            Ok(saved) => saved,
            Err(err) => {
                self.discard_image(image_ref.as_deref()).await;
                return Err(err.into());
            }
        };

        info!(product_id = saved.id, slug = %saved.slug, category = %saved.category, "Created product");
        Ok(saved)
    }

    pub async fn update(&self, id: i32, patch: ProductPatch) -> Result<product::Model, StoreError> {
        patch.validate()?;

        let txn = self.db.begin().await?;
        let existing = ProductEntity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(not_found)?;
        let mut product: product::ActiveModel = existing.clone().into();
        let mut name_now = existing.name.clone();
        let mut description_now = existing.description.clone();

        if let Some(name) = patch.name.map(|n| n.trim().to_string()) {
            if name.is_empty() {
                return Err(StoreError::Validation("Le nom du produit est requis".to_string()));
            }
            if name != existing.name {
                let slug = slugify(&name);
                if slug.is_empty() {
                    return Err(StoreError::Validation(
                        "Impossible de générer un slug à partir du nom".to_string(),
                    ));
                }
                if slug != existing.slug && slug_taken(&txn, &slug, Some(id)).await? {
                    return Err(StoreError::Conflict(
                        "Un produit avec ce slug existe déjà".to_string(),
                    ));
                }
                product.slug = Set(slug);
            }
            name_now = name.clone();
            product.name = Set(name);
        }
        if let Some(category) = patch.category.map(|c| c.trim().to_string()) {
            ensure_category(&txn, &category).await?;
            product.category = Set(category);
        }
        if let Some(description) = patch.description {
            description_now = description.clone();
            product.description = Set(description);
        }
        if let Some(price) = patch.price {
            product.price = Set(price);
        }
        if let Some(original_price) = patch.original_price {
            product.original_price = Set(Some(original_price));
        }
        if let Some(in_stock) = patch.in_stock {
            product.in_stock = Set(in_stock);
        }
        if let Some(stock_quantity) = patch.stock_quantity {
            product.stock_quantity = Set(stock_quantity);
        }
        if let Some(is_popular) = patch.is_popular {
            product.is_popular = Set(is_popular);
        }
        if let Some(is_new) = patch.is_new {
            product.is_new = Set(is_new);
        }
        if let Some(is_featured) = patch.is_featured {
            product.is_featured = Set(is_featured);
        }
        product.search_text = Set(search_text(&[
            Some(name_now.as_str()),
            Some(description_now.as_str()),
        ]));
        product.updated_at = Set(Utc::now());

        let saved = product.update(&txn).await?;
        txn.commit().await?;

        info!(product_id = saved.id, "Updated product");
        Ok(saved)
    }

    pub async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let product = self.get(id).await?;
        ProductEntity::delete_by_id(id).exec(&*self.db).await?;
        self.discard_image(product.image.as_deref()).await;

        info!(product_id = id, slug = %product.slug, "Deleted product");
        Ok(())
    }

    async fn discard_image(&self, reference: Option<&str>) {
        if let Some(reference) = reference {
            if let Err(err) = self.images.delete(reference).await {
                warn!(reference = %reference, error = %err, "Failed to delete product image");
            }
        }
    }
}

fn not_found() -> StoreError {
    StoreError::NotFound("Produit non trouvé".to_string())
}

async fn ensure_category<C: ConnectionTrait>(conn: &C, slug: &str) -> Result<(), StoreError> {
    let exists = CategoryEntity::find()
        .filter(category::Column::Slug.eq(slug))
        .count(conn)
        .await?
        > 0;
    if exists {
        Ok(())
    } else {
        Err(StoreError::Validation(format!("Catégorie inconnue: {slug}")))
    }
}

async fn slug_taken<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude: Option<i32>,
) -> Result<bool, StoreError> {
    let mut query = ProductEntity::find().filter(product::Column::Slug.eq(slug));
    if let Some(id) = exclude {
        query = query.filter(product::Column::Id.ne(id));
    }
    Ok(query.count(conn).await? > 0)
}
