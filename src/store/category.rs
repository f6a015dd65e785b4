//! Category management: CRUD over the category forest with slug uniqueness,
//! parent checks and deletion guards.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::entities::{
    category::{self, Entity as CategoryEntity},
    product::{self, Entity as ProductEntity},
};
use crate::error::StoreError;
use crate::images::{ImageStore, ImageUpload, CATEGORY_FOLDER};
use crate::store::slug::{slugify, SLUG_REGEX};
use crate::store::tree::{CategoryTree, TreeNode};
use crate::store::{clean, matches_search, search_text, Page, PageRequest, Pagination};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    Active,
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentFilter {
    TopLevel,
    Parent(i32),
}

/// Unset fields match everything.
#[derive(Clone, Debug, Default)]
pub struct CategoryFilter {
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub parent: Option<ParentFilter>,
}

impl CategoryFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            condition = condition.add(matches_search(
                (CategoryEntity, category::Column::SearchText),
                search,
            ));
        }

        match self.status {
            Some(StatusFilter::Active) => {
                condition = condition.add(category::Column::IsActive.eq(true))
            }
            Some(StatusFilter::Inactive) => {
                condition = condition.add(category::Column::IsActive.eq(false))
            }
            None => {}
        }

        match self.parent {
            Some(ParentFilter::TopLevel) => {
                condition = condition.add(category::Column::ParentId.is_null())
            }
            Some(ParentFilter::Parent(id)) => {
                condition = condition.add(category::Column::ParentId.eq(id))
            }
            None => {}
        }

        condition
    }
}

/// Every mutable field of a category. Create and update both take the full set.
#[derive(Clone, Debug, Validate)]
pub struct CategoryInput {
    #[validate(length(max = 100, message = "Le nom ne peut pas dépasser 100 caractères"))]
    pub name: String,
    #[validate(regex(
        path = *SLUG_REGEX,
        message = "Le slug ne peut contenir que des lettres minuscules, chiffres et tirets"
    ))]
    pub slug: Option<String>,
    #[validate(length(
        max = 500,
        message = "La description ne peut pas dépasser 500 caractères"
    ))]
    pub description: Option<String>,
    pub parent_id: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
    #[validate(length(max = 60, message = "Le titre SEO ne peut pas dépasser 60 caractères"))]
    pub seo_title: Option<String>,
    #[validate(length(
        max = 160,
        message = "La description SEO ne peut pas dépasser 160 caractères"
    ))]
    pub seo_description: Option<String>,
    /// Version the editor started from. Only checked on update.
    pub expected_version: Option<i32>,
}

impl CategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: None,
            description: None,
            parent_id: None,
            is_active: true,
            sort_order: 0,
            seo_title: None,
            seo_description: None,
            expected_version: None,
        }
    }

    fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.slug = clean(self.slug).map(|slug| slug.to_lowercase());
        self.description = clean(self.description);
        self.seo_title = clean(self.seo_title);
        self.seo_description = clean(self.seo_description);
        self
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.name.is_empty() {
            return Err(StoreError::Validation(
                "Le nom de la catégorie est requis".to_string(),
            ));
        }
        self.validate()?;
        Ok(())
    }
}

/// What to do with the stored image on update.
#[derive(Debug)]
pub enum ImageChange {
    Keep,
    Remove,
    Replace(ImageUpload),
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ParentRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SubcategoryRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct CategoryView {
    #[serde(flatten)]
    pub category: category::Model,
    pub parent: Option<ParentRef>,
    pub subcategories: Vec<SubcategoryRef>,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub view: CategoryView,
    pub product_count: u64,
    pub path: String,
}

#[derive(Clone)]
pub struct CategoryStore {
    db: Arc<DatabaseConnection>,
    images: Arc<dyn ImageStore>,
}

impl CategoryStore {
    pub fn new(db: Arc<DatabaseConnection>, images: Arc<dyn ImageStore>) -> Self {
        Self { db, images }
    }

    pub async fn list(
        &self,
        filter: &CategoryFilter,
        page: PageRequest,
    ) -> Result<Page<CategoryView>, StoreError> {
        let db = &*self.db;
        let condition = filter.condition();

        let total = CategoryEntity::find()
            .filter(condition.clone())
            .count(db)
            .await?;

        let models = CategoryEntity::find()
            .filter(condition)
            .order_by_asc(category::Column::SortOrder)
            .order_by_asc(category::Column::Name)
            .offset(page.offset())
            .limit(page.limit)
            .all(db)
            .await?;

        Ok(Page {
            items: annotate(db, models).await?,
            pagination: Pagination::new(page, total),
        })
    }

    pub async fn get(&self, id: i32) -> Result<CategoryDetail, StoreError> {
        let db = &*self.db;
        let model = find_category(db, id).await?;

        let product_count = ProductEntity::find()
            .filter(product::Column::Category.eq(model.slug.as_str()))
            .count(db)
            .await?;

        let tree = CategoryTree::new(CategoryEntity::find().all(db).await?);
        let path = tree.full_path(model.id);

        Ok(CategoryDetail {
            view: annotate_one(db, model).await?,
            product_count,
            path,
        })
    }

    pub async fn create(
        &self,
        input: CategoryInput,
        image: Option<ImageUpload>,
    ) -> Result<CategoryView, StoreError> {
        let input = input.normalized();
        input.check()?;

        let slug = match &input.slug {
            Some(slug) => slug.clone(),
            None => {
                let derived = slugify(&input.name);
                if derived.is_empty() {
                    return Err(StoreError::Validation(
                        "Impossible de générer un slug à partir du nom".to_string(),
                    ));
                }
                derived
            }
        };

        let db = &*self.db;
        if slug_taken(db, &slug, None).await? {
            let message = if input.slug.is_some() {
                "Ce slug existe déjà"
            } else {
                "Une catégorie avec ce slug existe déjà"
            };
            return Err(StoreError::Conflict(message.to_string()));
        }
        if let Some(parent_id) = input.parent_id {
            if CategoryEntity::find_by_id(parent_id).one(db).await?.is_none() {
                return Err(StoreError::Validation(
                    "Catégorie parente introuvable".to_string(),
                ));
            }
        }

        let image_ref = match image {
            Some(upload) => Some(self.images.upload(upload, CATEGORY_FOLDER).await?),
            None => None,
        };

        let now = Utc::now();
        let new_category = category::ActiveModel {
            search_text: Set(search_text(&[
                Some(input.name.as_str()),
                input.description.as_deref(),
            ])),
            name: Set(input.name),
            slug: Set(slug),
            description: Set(input.description),
            image: Set(image_ref.clone()),
            parent_id: Set(input.parent_id),
            is_active: Set(input.is_active),
            sort_order: Set(input.sort_order),
            seo_title: Set(input.seo_title),
            seo_description: Set(input.seo_description),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        //the unique slug index still catches a concurrent insert
        let saved = match new_category.insert(db).await {
            Ok(saved) => saved,
            Err(err) => {
                self.discard_image(image_ref.as_deref()).await;
                return Err(err.into());
            }
        };

        info!(category_id = saved.id, slug = %saved.slug, "Created category");
        annotate_one(db, saved).await
    }

    /// Checks run first and the image is uploaded before anything is written.
    /// The write itself is a single `UPDATE ... WHERE version = <read version>`,
    /// so an edit saved in between turns into a `Conflict`.
    pub async fn update(
        &self,
        id: i32,
        input: CategoryInput,
        image: ImageChange,
    ) -> Result<CategoryView, StoreError> {
        let db = &*self.db;
        let existing = find_category(db, id).await?;

        let input = input.normalized();
        input.check()?;

        if let Some(expected) = input.expected_version {
            if expected != existing.version {
                return Err(stale_version());
            }
        }

        let slug = input.slug.clone().unwrap_or_else(|| existing.slug.clone());
        if slug != existing.slug && slug_taken(db, &slug, Some(id)).await? {
            return Err(StoreError::Conflict("Ce slug existe déjà".to_string()));
        }

        if let Some(parent_id) = input.parent_id {
            if parent_id == id {
                return Err(StoreError::Validation(
                    "Une catégorie ne peut pas être son propre parent".to_string(),
                ));
            }
            let tree = CategoryTree::new(CategoryEntity::find().all(db).await?);
            if tree.get(parent_id).is_none() {
                return Err(StoreError::Validation(
                    "Catégorie parente introuvable".to_string(),
                ));
            }
            if tree.is_descendant(id, parent_id) {
                return Err(StoreError::Validation(
                    "Une catégorie ne peut pas être rattachée à l'une de ses sous-catégories"
                        .to_string(),
                ));
            }
        }

        let (image_ref, uploaded, stale) = match image {
            ImageChange::Keep => (existing.image.clone(), None, None),
            ImageChange::Remove => (None, None, existing.image.clone()),
            ImageChange::Replace(upload) => {
                let reference = self.images.upload(upload, CATEGORY_FOLDER).await?;
                (
                    Some(reference.clone()),
                    Some(reference),
                    existing.image.clone(),
                )
            }
        };

        let read_version = existing.version;
        let mut category: category::ActiveModel = existing.into();
        category.search_text = Set(search_text(&[
            Some(input.name.as_str()),
            input.description.as_deref(),
        ]));
        category.name = Set(input.name);
        category.slug = Set(slug);
        category.description = Set(input.description);
        category.image = Set(image_ref);
        category.parent_id = Set(input.parent_id);
        category.is_active = Set(input.is_active);
        category.sort_order = Set(input.sort_order);
        category.seo_title = Set(input.seo_title);
        category.seo_description = Set(input.seo_description);
        category.version = Set(read_version + 1);
        category.updated_at = Set(Utc::now());

        let written = CategoryEntity::update_many()
            .set(category)
            .filter(category::Column::Id.eq(id))
            .filter(category::Column::Version.eq(read_version))
            .exec(db)
            .await;
        let rows = match written {
            Ok(result) => result.rows_affected,
            Err(err) => {
                self.discard_image(uploaded.as_deref()).await;
                return Err(err.into());
            }
        };
        if rows == 0 {
            self.discard_image(uploaded.as_deref()).await;
            return Err(stale_version());
        }

        self.discard_image(stale.as_deref()).await;

        let saved = find_category(db, id).await?;
        info!(category_id = saved.id, version = saved.version, "Updated category");
        annotate_one(db, saved).await
    }

    pub async fn delete(&self, id: i32) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        let category = find_category(&txn, id).await?;

        let product_count = ProductEntity::find()
            .filter(product::Column::Category.eq(category.slug.as_str()))
            .count(&txn)
            .await?;
        if product_count > 0 {
            return Err(StoreError::Conflict(format!(
                "Impossible de supprimer cette catégorie car elle contient {product_count} produit(s)"
            )));
        }

        let subcategory_count = CategoryEntity::find()
            .filter(category::Column::ParentId.eq(id))
            .count(&txn)
            .await?;
        if subcategory_count > 0 {
            return Err(StoreError::Conflict(format!(
                "Impossible de supprimer cette catégorie car elle contient {subcategory_count} sous-catégorie(s)"
            )));
        }

        CategoryEntity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        self.discard_image(category.image.as_deref()).await;

        info!(category_id = id, slug = %category.slug, "Deleted category");
        Ok(())
    }

    pub async fn tree(&self, active_only: bool) -> Result<Vec<TreeNode>, StoreError> {
        let models = CategoryEntity::find().all(&*self.db).await?;
        Ok(CategoryTree::new(models).nested(active_only))
    }

    //failures are logged and swallowed
    async fn discard_image(&self, reference: Option<&str>) {
        if let Some(reference) = reference {
            if let Err(err) = self.images.delete(reference).await {
                warn!(reference = %reference, error = %err, "Failed to delete category image");
            }
        }
    }
}

fn stale_version() -> StoreError {
    StoreError::Conflict(
        "La catégorie a été modifiée entre-temps, rechargez-la avant d'enregistrer".to_string(),
    )
}

async fn find_category<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> Result<category::Model, StoreError> {
    CategoryEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| StoreError::NotFound("Catégorie non trouvée".to_string()))
}

async fn slug_taken<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude: Option<i32>,
) -> Result<bool, StoreError> {
    let mut query = CategoryEntity::find().filter(category::Column::Slug.eq(slug));
    if let Some(id) = exclude {
        query = query.filter(category::Column::Id.ne(id));
    }
    Ok(query.count(conn).await? > 0)
}

/// Resolves parents and direct subcategories for a page in two queries.
async fn annotate<C: ConnectionTrait>(
    conn: &C,
    models: Vec<category::Model>,
) -> Result<Vec<CategoryView>, StoreError> {
    let parent_ids: Vec<i32> = models.iter().filter_map(|m| m.parent_id).collect();
    let parents: HashMap<i32, ParentRef> = if parent_ids.is_empty() {
        HashMap::new()
    } else {
        CategoryEntity::find()
            .filter(category::Column::Id.is_in(parent_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|parent| {
                (
                    parent.id,
                    ParentRef {
                        id: parent.id,
                        name: parent.name,
                        slug: parent.slug,
                    },
                )
            })
            .collect()
    };

    let ids: Vec<i32> = models.iter().map(|m| m.id).collect();
    let mut subcategories: HashMap<i32, Vec<SubcategoryRef>> = HashMap::new();
    if !ids.is_empty() {
        let children = CategoryEntity::find()
            .filter(category::Column::ParentId.is_in(ids))
            .order_by_asc(category::Column::SortOrder)
            .order_by_asc(category::Column::Name)
            .all(conn)
            .await?;
        for child in children {
            if let Some(parent_id) = child.parent_id {
                subcategories
                    .entry(parent_id)
                    .or_default()
                    .push(SubcategoryRef {
                        id: child.id,
                        name: child.name,
                        slug: child.slug,
                        is_active: child.is_active,
                    });
            }
        }
    }

    Ok(models
        .into_iter()
        .map(|model| CategoryView {
            parent: model.parent_id.and_then(|id| parents.get(&id).cloned()),
            subcategories: subcategories.remove(&model.id).unwrap_or_default(),
            category: model,
        })
        .collect())
}

async fn annotate_one<C: ConnectionTrait>(
    conn: &C,
    model: category::Model,
) -> Result<CategoryView, StoreError> {
    let id = model.id;
    annotate(conn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| StoreError::NotFound(format!("Catégorie {id} introuvable")))
}
