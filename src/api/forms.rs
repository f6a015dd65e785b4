//! Multipart form decoding for the admin endpoints.

use axum::extract::Multipart;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::images::ImageUpload;
use crate::store::category::{CategoryInput, ImageChange};
use crate::store::product::ProductInput;

pub const IMAGE_FIELD: &str = "image";

/// Text parts keyed by field name plus the optional `image` file part.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    image: Option<ImageUpload>,
}

impl MultipartForm {
    pub async fn read(multipart: &mut Multipart) -> Result<Self, StoreError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| invalid_form(err.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == IMAGE_FIELD && field.file_name().is_some() {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| invalid_form(err.body_text()))?;

                //browsers send an empty part when no file was picked
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|err| invalid_form(err.body_text()))?;
            form.fields.insert(name, value);
        }

        Ok(form)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn take_image(&mut self) -> Option<ImageUpload> {
        self.image.take()
    }

    pub fn category_input(&self) -> Result<CategoryInput, StoreError> {
        let mut input = CategoryInput::new(self.text("name").unwrap_or_default());
        input.slug = self.owned("slug");
        input.description = self.owned("description");
        input.seo_title = self.owned("seo_title");
        input.seo_description = self.owned("seo_description");
        input.parent_id = self.optional_int("parent_category", "Catégorie parente invalide")?;
        input.is_active = self.text("is_active").map_or(true, parse_flag);
        input.sort_order = self
            .optional_int("sort_order", "L'ordre de tri doit être un nombre entier")?
            .unwrap_or(0);
        input.expected_version = self.optional_int("version", "Version invalide")?;
        Ok(input)
    }

    /// Image mode for an update: a new file wins over `remove_image`.
    pub fn image_change(&mut self) -> ImageChange {
        match self.take_image() {
            Some(upload) => ImageChange::Replace(upload),
            None if self.text("remove_image").is_some_and(parse_flag) => ImageChange::Remove,
            None => ImageChange::Keep,
        }
    }

    /// Product fields travel as one JSON document in the `data` part.
    pub fn product_input(&self) -> Result<ProductInput, StoreError> {
        let raw = self
            .text("data")
            .ok_or_else(|| StoreError::Validation("Données produit manquantes".to_string()))?;
        serde_json::from_str(raw)
            .map_err(|err| StoreError::Validation(format!("Données produit invalides: {err}")))
    }

    fn owned(&self, key: &str) -> Option<String> {
        self.text(key).map(str::to_string)
    }

    fn optional_int(&self, key: &str, message: &str) -> Result<Option<i32>, StoreError> {
        match self.text(key).map(str::trim) {
            None | Some("") | Some("null") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| StoreError::Validation(message.to_string())),
        }
    }
}

pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "true" | "on" | "1")
}

fn invalid_form(reason: String) -> StoreError {
    StoreError::Validation(format!("Formulaire invalide: {reason}"))
}
