use async_trait::async_trait;
use axum::body::Bytes;
use chrono::Utc;
use rita_aloe::entities::{category, setup_schema};
use rita_aloe::error::StoreError;
use rita_aloe::images::{ImageStore, ImageStoreError, ImageUpload};
use rita_aloe::store::category::{CategoryFilter, CategoryInput, CategoryStore, ImageChange};
use rita_aloe::store::PageRequest;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use std::sync::Arc;
use tempfile::TempDir;

/// Uploads succeed unless `fail_upload` is set; deletes always fail.
struct FlakyImages {
    fail_upload: bool,
}

#[async_trait]
impl ImageStore for FlakyImages {
    async fn upload(&self, _image: ImageUpload, folder: &str) -> Result<String, ImageStoreError> {
        if self.fail_upload {
            return Err(std::io::Error::other("bucket unreachable").into());
        }
        Ok(format!("/uploads/{folder}/fixed.png"))
    }

    async fn delete(&self, reference: &str) -> Result<(), ImageStoreError> {
        Err(ImageStoreError::NotFound(reference.to_string()))
    }
}

async fn store(fail_upload: bool) -> (CategoryStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("store.db").display());
    let db = Database::connect(&url).await.unwrap();
    setup_schema(&db).await.unwrap();
    (
        CategoryStore::new(Arc::new(db), Arc::new(FlakyImages { fail_upload })),
        dir,
    )
}

fn upload() -> ImageUpload {
    ImageUpload {
        file_name: "aloe.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: Bytes::from_static(b"\x89PNG"),
    }
}

#[tokio::test]
async fn failed_upload_leaves_no_record() {
    let (store, _dir) = store(true).await;

    let result = store
        .create(CategoryInput::new("Boissons"), Some(upload()))
        .await;
    assert!(matches!(result, Err(StoreError::Collaborator(_))));

    let page = store
        .list(&CategoryFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 0);
}

#[tokio::test]
async fn failed_replacement_keeps_the_record() {
    let (store, _dir) = store(true).await;
    let created = store.create(CategoryInput::new("Boissons"), None).await.unwrap();
    let id = created.category.id;

    let result = store
        .update(id, CategoryInput::new("Boissons Aloe"), ImageChange::Replace(upload()))
        .await;
    assert!(matches!(result, Err(StoreError::Collaborator(_))));

    let detail = store.get(id).await.unwrap();
    assert_eq!(detail.view.category.name, "Boissons");
    assert_eq!(detail.view.category.version, 1);
}

#[tokio::test]
async fn image_cleanup_failures_are_swallowed() {
    let (store, _dir) = store(false).await;
    let created = store
        .create(CategoryInput::new("Boissons"), Some(upload()))
        .await
        .unwrap();
    let id = created.category.id;
    assert_eq!(
        created.category.image.as_deref(),
        Some("/uploads/categories/fixed.png")
    );

    let updated = store
        .update(id, CategoryInput::new("Boissons"), ImageChange::Remove)
        .await
        .unwrap();
    assert_eq!(updated.category.image, None);

    store.delete(id).await.unwrap();
    assert!(matches!(store.get(id).await, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn tree_nests_children() {
    let (store, _dir) = store(false).await;
    let skin = store
        .create(CategoryInput::new("Soins de la Peau"), None)
        .await
        .unwrap();

    let mut face = CategoryInput::new("Visage");
    face.parent_id = Some(skin.category.id);
    store.create(face, None).await.unwrap();

    let mut hidden = CategoryInput::new("Corps");
    hidden.parent_id = Some(skin.category.id);
    hidden.is_active = false;
    store.create(hidden, None).await.unwrap();

    let all = store.tree(false).await.unwrap();
    assert_eq!(all[0].children.len(), 2);
    let active = store.tree(true).await.unwrap();
    assert_eq!(active[0].children.len(), 1);
    assert_eq!(active[0].children[0].name, "Visage");
}

/// Writes a row of its own while an upload is in flight.
struct WritingImages {
    db: Arc<DatabaseConnection>,
}

#[async_trait]
impl ImageStore for WritingImages {
    async fn upload(&self, _image: ImageUpload, folder: &str) -> Result<String, ImageStoreError> {
        let now = Utc::now();
        category::ActiveModel {
            name: Set("Pendant l'upload".to_string()),
            slug: Set(format!("pendant-{folder}-{}", now.timestamp_nanos_opt().unwrap_or(0))),
            search_text: Set("pendant l'upload".to_string()),
            is_active: Set(true),
            sort_order: Set(0),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|err| std::io::Error::other(err.to_string()))?;
        Ok(format!("/uploads/{folder}/written.png"))
    }

    async fn delete(&self, _reference: &str) -> Result<(), ImageStoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn uploads_run_outside_any_open_write() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("store.db").display());
    let db = Arc::new(Database::connect(&url).await.unwrap());
    setup_schema(&db).await.unwrap();
    let store = CategoryStore::new(db.clone(), Arc::new(WritingImages { db: db.clone() }));

    let created = store
        .create(CategoryInput::new("Boissons"), Some(upload()))
        .await
        .unwrap();
    let updated = store
        .update(
            created.category.id,
            CategoryInput::new("Boissons"),
            ImageChange::Replace(upload()),
        )
        .await
        .unwrap();
    assert_eq!(updated.category.version, 2);

    let page = store
        .list(&CategoryFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total, 3);
}

#[tokio::test]
async fn concurrent_edit_turns_into_conflict() {
    let (store, _dir) = store(false).await;
    let created = store.create(CategoryInput::new("Boissons"), None).await.unwrap();
    let id = created.category.id;

    let mut first = CategoryInput::new("Boissons Aloe");
    first.expected_version = Some(1);
    store.update(id, first, ImageChange::Keep).await.unwrap();

    let mut second = CategoryInput::new("Boissons Fraîches");
    second.expected_version = Some(1);
    let result = store.update(id, second, ImageChange::Keep).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
    assert_eq!(store.get(id).await.unwrap().view.category.name, "Boissons Aloe");
}
