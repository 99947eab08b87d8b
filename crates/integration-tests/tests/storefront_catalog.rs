//! Integration tests for the public catalog and health endpoints.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use pasteleria_integration_tests::TestApp;
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_health_and_home() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let resp = client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = client.get(app.url("/health/ready")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.get(app.url("/")).send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "API Pastelería funcionando");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let resp = client
        .get(app.url("/health"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "req-123");

    let resp = client.get(app.url("/health")).send().await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_product_listing_and_filters() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let all: Vec<Value> = client
        .get(app.url("/api/products"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    let mousse = all
        .iter()
        .find(|p| p["slug"] == "mousse-de-chocolate")
        .unwrap();
    assert_eq!(mousse["disponible"], false);
    assert_eq!(mousse["precio_display"], "$4.750");

    let tortas: Vec<Value> = client
        .get(app.url("/api/products?categoria=tortas-cuadradas"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tortas.len(), 2);
    assert!(tortas.iter().all(|p| p["categoria"]["slug"] == "tortas-cuadradas"));

    let chocolate: Vec<Value> = client
        .get(app.url("/api/products?q=chocolate"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chocolate.len(), 2);

    // Case and accents are ignored: TIRAMISÚ, then clasico
    for q in ["TIRAMIS%C3%9A", "clasico"] {
        let found: Vec<Value> = client
            .get(app.url(&format!("/api/products?q={q}")))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(found.len(), 1, "q={q}");
        assert_eq!(found[0]["slug"], "tiramisu-clasico");
    }

    // Blank filters behave like no filter
    let blank: Vec<Value> = client
        .get(app.url("/api/products?q=&categoria="))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(blank.len(), 4);
}

#[tokio::test]
async fn test_product_detail() {
    let app = TestApp::spawn().await;
    let client = app.client();
    let id = app.pastel_id("tiramisu-clasico").await;

    let by_id: Value = client
        .get(app.url(&format!("/api/products/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_id["nombre"], "Tiramisú Clásico");
    assert_eq!(by_id["precio"], 9_500);

    let by_slug: Value = client
        .get(app.url("/api/products/slug/tiramisu-clasico"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_slug["id"], by_id["id"]);

    let resp = client.get(app.url("/api/products/9999")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    let resp = client
        .get(app.url("/api/products/slug/no-existe"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_categories_with_counts() {
    let app = TestApp::spawn().await;

    let categorias: Vec<Value> = app
        .client()
        .get(app.url("/api/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(categorias.len(), 3);

    let count = |slug: &str| {
        categorias
            .iter()
            .find(|c| c["slug"] == slug)
            .map(|c| c["product_count"].clone())
            .unwrap()
    };
    assert_eq!(count("tortas-cuadradas"), 2);
    assert_eq!(count("postres-individuales"), 2);
    assert_eq!(count("productos-veganos"), 0);
}

#[tokio::test]
async fn test_contact_form() {
    let app = TestApp::spawn().await;
    let client = app.client();

    let resp = client
        .post(app.url("/api/contact"))
        .json(&json!({
            "nombre": "Pedro Pérez",
            "correo": "pedro@gmail.com",
            "mensaje": "¿Hacen tortas sin gluten?"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .post(app.url("/api/contact"))
        .json(&json!({ "nombre": "Pedro", "correo": "no-es-correo", "mensaje": "Hola" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(app.url("/api/contact"))
        .json(&json!({ "nombre": "Pedro", "correo": "pedro@gmail.com", "mensaje": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reportes_contacto")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(stored, 1);
}
