//! Integration tests for the Pastelería storefront.
//!
//! Each test spawns the real router on an ephemeral port, backed by a fresh
//! SQLite file and a fake PayPal server, and drives it over HTTP with a
//! cookie-keeping client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pasteleria-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_*` - Catalog, cart, accounts and checkout
//! - `admin_*` - Back-office API

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use pasteleria_core::{PastelId, Role};
use pasteleria_storefront::config::{PayPalConfig, PayPalEnvironment, StorefrontConfig};
use pasteleria_storefront::db::{
    self,
    seed::{SeedCatalog, SeedCategoria, SeedPastel, seed_catalog},
};
use pasteleria_storefront::services::{AuthService, Registro};
use pasteleria_storefront::state::AppState;

/// Password given to every account the helpers create.
pub const PASSWORD: &str = "milsabores";

/// Valid Visa test number.
pub const TEST_CARD: &str = "4111 1111 1111 1111";

/// PayPal order id the fake server refuses to capture.
pub const DECLINED_ORDER: &str = "DECLINED-ORDER";

/// Source of distinct client addresses, so rate limits never leak between
/// clients.
static NEXT_CLIENT: AtomicU32 = AtomicU32::new(1);

/// A running storefront plus its backing stores.
pub struct TestApp {
    /// `http://127.0.0.1:<port>`
    pub base_url: String,
    /// Pool on the same database file the server uses.
    pub pool: SqlitePool,
    /// Fake PayPal server the storefront talks to.
    pub paypal: FakePayPal,
    _dir: TempDir,
}

impl TestApp {
    /// Start a storefront seeded with [`test_catalog`].
    ///
    /// # Panics
    ///
    /// Panics if any part of the setup fails.
    pub async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pool = db::open(&dir.path().join("pasteleria.db"), true)
            .await
            .expect("Failed to open database");
        seed_catalog(&pool, &test_catalog())
            .await
            .expect("Failed to seed catalog");

        let paypal = FakePayPal::spawn().await;
        let state = AppState::new(test_config(&paypal.base_url), pool.clone())
            .expect("Failed to build state");
        let app = pasteleria_storefront::app(state)
            .await
            .expect("Failed to build router");

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to read address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            base_url: format!("http://{addr}"),
            pool,
            paypal,
            _dir: dir,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// A fresh browser: own cookie jar, own client address.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client(&self) -> Client {
        let n = NEXT_CLIENT.fetch_add(1, Ordering::Relaxed);
        let ip = Ipv4Addr::from(0x0a00_0000 | n);

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_str(&ip.to_string()).expect("Invalid header"),
        );

        Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Id of a seeded product.
    ///
    /// # Panics
    ///
    /// Panics if no product has that slug.
    pub async fn pastel_id(&self, slug: &str) -> PastelId {
        let id: i64 = sqlx::query_scalar("SELECT id FROM pasteles WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .expect("Unknown product slug");
        PastelId::new(id)
    }

    /// Current stock of a product.
    ///
    /// # Panics
    ///
    /// Panics if the product does not exist.
    pub async fn stock(&self, id: PastelId) -> i64 {
        sqlx::query_scalar("SELECT stock FROM pasteles WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .expect("Unknown product")
    }

    /// Create an account directly in the database.
    ///
    /// # Panics
    ///
    /// Panics if registration fails.
    pub async fn create_account(&self, correo: &str, role: Role) {
        let registro = Registro {
            nombre: "Ana".to_string(),
            apellido: "Rojas".to_string(),
            correo: correo.to_string(),
            password: PASSWORD.to_string(),
            fecha_nacimiento: None,
            direccion: Some("Av. Siempre Viva 742, Santiago".to_string()),
            imagen: None,
        };
        AuthService::new(&self.pool)
            .register(&registro, role)
            .await
            .expect("Failed to create account");
    }

    /// A client logged in as a new account with `role`.
    ///
    /// # Panics
    ///
    /// Panics if the account cannot be created or the login fails.
    pub async fn logged_in(&self, correo: &str, role: Role) -> Client {
        self.create_account(correo, role).await;
        let client = self.client();
        self.login(&client, correo).await;
        client
    }

    /// Log `client` in.
    ///
    /// # Panics
    ///
    /// Panics if the login is rejected.
    pub async fn login(&self, client: &Client, correo: &str) {
        let resp = client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "correo": correo, "password": PASSWORD }))
            .send()
            .await
            .expect("Login request failed");
        assert_eq!(resp.status(), reqwest::StatusCode::OK, "login as {correo}");
    }

    /// Add `cantidad` units of a product to `client`'s cart.
    ///
    /// # Panics
    ///
    /// Panics if the request fails.
    pub async fn add_to_cart(&self, client: &Client, pastel_id: PastelId, cantidad: i64) -> reqwest::Response {
        client
            .post(self.url("/api/cart/items"))
            .json(&json!({ "pastel_id": pastel_id, "cantidad": cantidad }))
            .send()
            .await
            .expect("Add to cart request failed")
    }
}

/// Card payload accepted by the simulated gateway.
#[must_use]
pub fn card_payment() -> Value {
    json!({
        "payment_method": "tarjeta",
        "card": {
            "holder": "Ana Rojas",
            "number": TEST_CARD,
            "expiry": "12/99",
            "cvv": "123"
        }
    })
}

/// Catalog every test starts from. Prices are multiples of 950 so USD
/// amounts come out round.
#[must_use]
pub fn test_catalog() -> SeedCatalog {
    let pastel = |nombre: &str, precio: i64, stock: i64, categoria: &str| SeedPastel {
        nombre: nombre.to_string(),
        descripcion: format!("{nombre} de la casa"),
        precio,
        stock,
        stock_critico: 3,
        categoria: Some(categoria.to_string()),
        imagen: None,
    };

    SeedCatalog {
        categorias: vec![
            SeedCategoria {
                nombre: "Tortas Cuadradas".to_string(),
                descripcion: None,
            },
            SeedCategoria {
                nombre: "Postres Individuales".to_string(),
                descripcion: Some("Porciones para una persona".to_string()),
            },
            SeedCategoria {
                nombre: "Productos Veganos".to_string(),
                descripcion: None,
            },
        ],
        pasteles: vec![
            pastel("Torta Cuadrada de Chocolate", 47_500, 10, "Tortas Cuadradas"),
            pastel("Torta Cuadrada de Frutas", 47_500, 2, "Tortas Cuadradas"),
            pastel("Tiramisú Clásico", 9_500, 5, "Postres Individuales"),
            pastel("Mousse de Chocolate", 4_750, 0, "Postres Individuales"),
        ],
    }
}

fn test_config(paypal_base: &str) -> StorefrontConfig {
    StorefrontConfig {
        database_path: "unused.db".into(),
        ignore_db_missing: false,
        host: Ipv4Addr::LOCALHOST.into(),
        port: 0,
        base_url: "http://localhost:3001".to_string(),
        paypal: PayPalConfig {
            client_id: "test-client".to_string(),
            secret: SecretString::from("test-secret"),
            environment: PayPalEnvironment::Sandbox,
            api_base: paypal_base.to_string(),
        },
        clp_usd_rate: Decimal::from(950),
        cors_origin: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_traces_sample_rate: 0.0,
    }
}

// =============================================================================
// Fake PayPal
// =============================================================================

/// Minimal stand-in for the PayPal REST API.
///
/// Issues tokens, creates orders with sequential ids and completes every
/// capture except [`DECLINED_ORDER`].
#[derive(Clone)]
pub struct FakePayPal {
    pub base_url: String,
    state: Arc<FakePayPalState>,
}

#[derive(Default)]
struct FakePayPalState {
    next_order: AtomicU32,
    created: Mutex<Vec<Value>>,
}

impl FakePayPal {
    async fn spawn() -> Self {
        let state = Arc::new(FakePayPalState::default());
        let router = Router::new()
            .route("/v1/oauth2/token", post(token))
            .route("/v2/checkout/orders", post(create_order))
            .route("/v2/checkout/orders/{id}/capture", post(capture_order))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind fake PayPal");
        let addr = listener.local_addr().expect("Failed to read address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Fake PayPal error");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// Bodies of every `POST /v2/checkout/orders` received so far.
    pub async fn created_orders(&self) -> Vec<Value> {
        self.state.created.lock().await.clone()
    }
}

async fn token() -> Json<Value> {
    Json(json!({
        "scope": "https://uri.paypal.com/services/payments/payment",
        "access_token": "A21AAFakeToken",
        "token_type": "Bearer",
        "expires_in": 32400
    }))
}

async fn create_order(
    State(state): State<Arc<FakePayPalState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let n = state.next_order.fetch_add(1, Ordering::Relaxed) + 1;
    state.created.lock().await.push(body);

    let id = format!("5O190127TN{n:06}");
    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "status": "CREATED",
            "links": [
                {
                    "href": format!("https://www.sandbox.paypal.com/checkoutnow?token={id}"),
                    "rel": "approve",
                    "method": "GET"
                }
            ]
        })),
    )
}

async fn capture_order(Path(id): Path<String>) -> (StatusCode, Json<Value>) {
    if id == DECLINED_ORDER {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "name": "UNPROCESSABLE_ENTITY",
                "details": [{ "issue": "INSTRUMENT_DECLINED" }]
            })),
        );
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "status": "COMPLETED",
            "purchase_units": []
        })),
    )
}
