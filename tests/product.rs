mod common;

use common::{png_part, spawn_app};
use reqwest::{header, multipart::Form, StatusCode};
use serde_json::{json, Value};

#[tokio::test]
async fn create_and_fetch_by_slug() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    let drinks = app.category(&token, "Boissons", None).await;

    let form = Form::new()
        .text(
            "data",
            json!({
                "name": "Gel d'Aloe Vera",
                "category": "boissons",
                "description": "Pulpe d'aloès stabilisée",
                "price": 19500,
                "original_price": 22000,
                "stock_quantity": 12,
                "is_popular": true
            })
            .to_string(),
        )
        .part("image", png_part("gel.png"));
    let response = app
        .client
        .post(app.url("/api/admin/products"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["data"]["slug"], "gel-daloe-vera");
    assert_eq!(body["data"]["price"], 19500);
    assert_eq!(body["data"]["in_stock"], true);
    assert!(body["data"]["image"]
        .as_str()
        .unwrap()
        .starts_with("/uploads/products/"));

    let (status, fetched) = app.get_json("/api/products/gel-daloe-vera").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["name"], "Gel d'Aloe Vera");

    let (status, _) = app.get_json("/api/products/inconnu").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, detail) = app
        .get_json(&format!("/api/admin/categories/{}", drinks["id"]))
        .await;
    assert_eq!(detail["data"]["product_count"], 1);
}

#[tokio::test]
async fn unknown_category_and_bad_prices_are_rejected() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    app.category(&token, "Boissons", None).await;

    let unknown = app
        .create_product(&token, json!({ "name": "Thé", "category": "the", "price": 100 }))
        .await;
    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);

    let negative = app
        .create_product(
            &token,
            json!({ "name": "Thé", "category": "boissons", "price": -1 }),
        )
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);

    let no_data = app
        .client
        .post(app.url("/api/admin/products"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .multipart(Form::new().text("name", "Thé"))
        .send()
        .await
        .unwrap();
    assert_eq!(no_data.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_listing_only_shows_stocked_products() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    app.category(&token, "Boissons", None).await;
    app.category(&token, "Soins", None).await;

    for (name, category, in_stock) in [
        ("Aloe Berry Nectar", "boissons", true),
        ("Aloe Peaches", "boissons", false),
        ("Crème Visage", "soins", true),
    ] {
        let response = app
            .create_product(
                &token,
                json!({ "name": name, "category": category, "price": 1000, "in_stock": in_stock }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let (_, public) = app.get_json("/api/products?category=boissons").await;
    assert_eq!(public["pagination"]["total"], 1);
    assert_eq!(public["data"][0]["slug"], "aloe-berry-nectar");

    let (_, all) = app.get_json("/api/products").await;
    assert_eq!(all["pagination"]["total"], 2);

    let (_, out) = app.get_json("/api/admin/products?status=out-of-stock").await;
    assert_eq!(out["pagination"]["total"], 1);
    assert_eq!(out["data"][0]["name"], "Aloe Peaches");

    let (_, search) = app.get_json("/api/admin/products?search=CRÈME").await;
    assert_eq!(search["pagination"]["total"], 1);

    let (_, wildcard) = app.get_json("/api/admin/products?search=%25").await;
    assert_eq!(wildcard["pagination"]["total"], 0);
}

#[tokio::test]
async fn patch_updates_fields_and_renames_slug() {
    let app = spawn_app().await;
    let token = app.admin_token().await;
    app.category(&token, "Boissons", None).await;
    let created = app
        .create_product(
            &token,
            json!({ "name": "Aloe Vera Gel", "category": "boissons", "price": 19500 }),
        )
        .await
        .json::<Value>()
        .await
        .unwrap();
    let id = created["data"]["id"].as_i64().unwrap();

    let response = app
        .client
        .patch(app.url(&format!("/api/admin/products/{id}")))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .json(&json!({ "name": "Aloe Vera Gel 1L", "price": 21000, "in_stock": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["data"]["slug"], "aloe-vera-gel-1l");
    assert_eq!(body["data"]["price"], 21000);
    assert_eq!(body["data"]["in_stock"], false);

    let (_, found) = app.get_json("/api/admin/products?search=gel%201l").await;
    assert_eq!(found["pagination"]["total"], 1);

    let response = app
        .client
        .delete(app.url(&format!("/api/admin/products/{id}")))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let (status, _) = app.get_json(&format!("/api/admin/products/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
