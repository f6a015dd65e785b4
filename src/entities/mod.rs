pub mod admin;
pub mod category;
pub mod product;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Schema, Set,
};
use tracing::info;

use crate::config::SeedAdmin;
use crate::entities::{
    admin::Entity as Admin, category::Entity as Category, product::Entity as Product,
};

pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut create_admin_table = schema.create_table_from_entity(Admin);
    let mut create_category_table = schema.create_table_from_entity(Category);
    let mut create_product_table = schema.create_table_from_entity(Product);

    for table in [
        &mut create_admin_table,
        &mut create_category_table,
        &mut create_product_table,
    ] {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    let indexes = schema
        .create_index_from_entity(Category)
        .into_iter()
        .chain(schema.create_index_from_entity(Product));
    for mut index in indexes {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Creates the configured super admin when no admin account exists yet.
pub async fn seed_admin(db: &DatabaseConnection, seed: &SeedAdmin) -> Result<(), DbErr> {
    if Admin::find().count(db).await? > 0 {
        return Ok(());
    }

    let password = hash_password(&seed.password)
        .map_err(|err| DbErr::Custom(format!("Failed to hash seed password: {err}")))?;

    let new_admin = admin::ActiveModel {
        email: Set(seed.email.to_lowercase()),
        name: Set(seed.name.clone()),
        password: Set(password),
        role: Set(admin::Role::SuperAdmin),
        is_active: Set(true),
        last_login: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Admin::insert(new_admin).exec(db).await?;

    info!(email = %seed.email, "Seeded super admin account");
    Ok(())
}
