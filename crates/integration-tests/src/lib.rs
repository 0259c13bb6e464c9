//! Integration test harness for Shopfront.
//!
//! [`MockBackend`] is an in-process axum server that speaks the storefront
//! backend's REST surface against in-memory state. It binds `127.0.0.1:0`, so
//! tests run in parallel without port clashes, and records every request it
//! receives (method, path, authorization header, request ID, JSON body and
//! multipart field names) for assertions.
//!
//! # Example
//!
//! ```rust,ignore
//! let backend = MockBackend::start().await?;
//! backend.seed_user("shopper@example.com", "secret");
//! let client = backend.client()?;
//! client.api.login(&email, &password).await?;
//! assert_eq!(backend.count("POST", "/api/auth/login"), 1);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shopfront_core::ProductId;
use shopfront_storefront::{
    ApiClient, ApiError, ClientConfig, ConfigError, LoginRedirect, MemorySessionStore,
    REQUEST_ID_HEADER,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Timestamp stamped on every created record.
const CREATED_AT: &str = "2024-05-01T12:00:00";

/// Errors raised while setting up the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Failed to bind mock backend: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

// =============================================================================
// Recorded traffic
// =============================================================================

/// A request as seen by the mock backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    /// Body, when it parsed as JSON.
    pub json: Option<Value>,
    /// Multipart field names in submission order.
    pub form_fields: Vec<String>,
}

/// Login redirect that counts how often it fired.
#[derive(Debug, Default)]
pub struct RecordingRedirect {
    count: AtomicUsize,
}

impl RecordingRedirect {
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

/// An API client wired to the mock backend, with handles on its session store
/// and login redirect.
#[derive(Debug)]
pub struct TestClient {
    pub api: ApiClient,
    pub session: Arc<MemorySessionStore>,
    pub redirect: Arc<RecordingRedirect>,
}

// =============================================================================
// Backend state
// =============================================================================

#[derive(Debug, Clone, Serialize)]
struct MockProduct {
    id: i64,
    name: String,
    description: String,
    price: f64,
    quantity: u32,
    category: Option<String>,
    featured: bool,
    image_url: Option<String>,
}

#[derive(Debug, Clone)]
struct MockUser {
    id: i64,
    email: String,
    password: String,
}

#[derive(Debug, Clone)]
struct CartLine {
    id: i64,
    product_id: i64,
    quantity: u32,
}

#[derive(Debug, Clone, Serialize)]
struct MockOrderItem {
    product_id: i64,
    quantity: u32,
    price: f64,
}

#[derive(Debug, Clone, Serialize)]
struct MockOrder {
    id: i64,
    user_id: i64,
    items: Vec<MockOrderItem>,
    price: f64,
    status: &'static str,
    created_at: &'static str,
}

#[derive(Debug, Default)]
struct BackendState {
    next_id: i64,
    users: Vec<MockUser>,
    tokens: HashMap<String, i64>,
    products: Vec<MockProduct>,
    carts: HashMap<i64, Vec<CartLine>>,
    orders: Vec<MockOrder>,
    requests: Vec<RecordedRequest>,
    register_issues_token: bool,
    cart_failure: Option<StatusCode>,
}

impl BackendState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn product(&self, id: i64) -> Option<&MockProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    fn issue_token(&mut self, user_id: i64) -> Value {
        let token = format!("token-{}", self.next_id());
        self.tokens.insert(token.clone(), user_id);
        let email = self
            .users
            .iter()
            .find(|u| u.id == user_id)
            .map(|u| u.email.clone());
        json!({
            "access_token": token,
            "token_type": "bearer",
            "user_id": user_id,
            "email": email,
        })
    }

    fn cart_json(&self, user_id: i64) -> Value {
        let lines = self.carts.get(&user_id).map(Vec::as_slice).unwrap_or_default();
        let mut total = 0.0;
        let items: Vec<Value> = lines
            .iter()
            .filter_map(|line| {
                let product = self.product(line.product_id)?;
                total += product.price * f64::from(line.quantity);
                Some(json!({
                    "id": line.id,
                    "product_id": product.id,
                    "name": product.name,
                    "description": product.description,
                    "price": product.price,
                    "quantity": line.quantity,
                    "image": product.image_url,
                }))
            })
            .collect();

        json!({
            "id": user_id,
            "items": items,
            "total_price": total,
            "created_at": CREATED_AT,
        })
    }
}

#[derive(Debug, Clone, Default)]
struct Shared(Arc<Mutex<BackendState>>);

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type Failure = (StatusCode, Json<Value>);

fn detail(status: StatusCode, message: &str) -> Failure {
    (status, Json(json!({ "detail": message })))
}

fn authenticate(state: &BackendState, headers: &HeaderMap) -> Result<i64, Failure> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| state.tokens.get(token).copied())
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
}

// =============================================================================
// MockBackend
// =============================================================================

/// In-process storefront backend.
///
/// The server task is aborted when the value is dropped.
#[derive(Debug)]
pub struct MockBackend {
    addr: SocketAddr,
    shared: Shared,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind a random local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> Result<Self, HarnessError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shared = Shared::default();
        let app = router(shared.clone());

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self {
            addr,
            shared,
            server,
        })
    }

    /// Base URL of the running server.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is rejected.
    pub fn config(&self) -> Result<ClientConfig, HarnessError> {
        Ok(ClientConfig::new(&self.base_url())?)
    }

    /// A client with default configuration and a fresh in-memory session.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn client(&self) -> Result<TestClient, HarnessError> {
        self.client_with(|_| {})
    }

    /// A client whose configuration is adjusted by `configure` first.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn client_with(
        &self,
        configure: impl FnOnce(&mut ClientConfig),
    ) -> Result<TestClient, HarnessError> {
        let mut config = self.config()?;
        configure(&mut config);

        let session = Arc::new(MemorySessionStore::new());
        let redirect = Arc::new(RecordingRedirect::default());
        let api = ApiClient::new(&config, session.clone(), redirect.clone())?;
        Ok(TestClient {
            api,
            session,
            redirect,
        })
    }

    // =========================================================================
    // Seeding and behaviour switches
    // =========================================================================

    /// Create an account directly.
    pub fn seed_user(&self, email: &str, password: &str) -> i64 {
        let mut state = self.shared.lock();
        let id = state.next_id();
        state.users.push(MockUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    /// Add a product to the catalog.
    pub fn seed_product(&self, name: &str, price: f64, quantity: u32, featured: bool) -> ProductId {
        let mut state = self.shared.lock();
        let id = state.next_id();
        state.products.push(MockProduct {
            id,
            name: name.to_string(),
            description: format!("{name} description"),
            price,
            quantity,
            category: None,
            featured,
            image_url: None,
        });
        ProductId::new(id)
    }

    /// Remaining stock of a product.
    #[must_use]
    pub fn stock(&self, id: ProductId) -> Option<u32> {
        self.shared.lock().product(id.get()).map(|p| p.quantity)
    }

    /// Whether registration answers with a token (`true`) or only with the
    /// created account (`false`, the default).
    pub fn register_issues_token(&self, issues_token: bool) {
        self.shared.lock().register_issues_token = issues_token;
    }

    /// Make `GET /api/cart` fail with `status` for authenticated callers;
    /// `None` restores normal behaviour.
    pub fn fail_cart_fetches(&self, status: Option<u16>) {
        self.shared.lock().cart_failure =
            status.and_then(|code| StatusCode::from_u16(code).ok());
    }

    /// Invalidate every issued token.
    pub fn expire_sessions(&self) {
        self.shared.lock().tokens.clear();
    }

    // =========================================================================
    // Recorded traffic
    // =========================================================================

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.shared.lock().requests.clone()
    }

    /// Requests received since the `skip`-th one.
    #[must_use]
    pub fn requests_since(&self, skip: usize) -> Vec<RecordedRequest> {
        self.shared
            .lock()
            .requests
            .iter()
            .skip(skip)
            .cloned()
            .collect()
    }

    /// Number of requests received for a method and path (query included).
    #[must_use]
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.shared
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.shared.lock().requests.last().cloned()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(shared: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/{id}", get(get_product))
        .route("/api/cart", get(get_cart).delete(clear_cart))
        .route("/api/cart/items", post(add_cart_item))
        .route(
            "/api/cart/items/{id}",
            put(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/orders", get(list_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order))
        .layer(middleware::from_fn_with_state(shared.clone(), record))
        .with_state(shared)
}

/// Record the request, then hand it on with its body intact.
async fn record(State(shared): State<Shared>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, usize::MAX).await else {
        return detail(StatusCode::BAD_REQUEST, "Unreadable body").into_response();
    };

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    };
    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_string(), ToString::to_string),
        authorization: header(AUTHORIZATION.as_str()),
        request_id: header(REQUEST_ID_HEADER),
        json: serde_json::from_slice(&bytes).ok(),
        form_fields: Vec::new(),
    };
    shared.lock().requests.push(recorded);

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

// =============================================================================
// Auth handlers
// =============================================================================

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(
    State(shared): State<Shared>,
    Json(body): Json<Credentials>,
) -> Result<Json<Value>, Failure> {
    let mut state = shared.lock();
    let user_id = state
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
        .map(|u| u.id)
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Incorrect email or password"))?;
    Ok(Json(state.issue_token(user_id)))
}

async fn register(
    State(shared): State<Shared>,
    Json(body): Json<Credentials>,
) -> Result<Json<Value>, Failure> {
    let mut state = shared.lock();
    if state.users.iter().any(|u| u.email == body.email) {
        return Err(detail(StatusCode::BAD_REQUEST, "Email already registered"));
    }

    let id = state.next_id();
    state.users.push(MockUser {
        id,
        email: body.email.clone(),
        password: body.password,
    });

    if state.register_issues_token {
        Ok(Json(state.issue_token(id)))
    } else {
        Ok(Json(json!({
            "id": id,
            "email": body.email,
            "is_active": true,
            "created_at": CREATED_AT,
        })))
    }
}

// =============================================================================
// Product handlers
// =============================================================================

#[derive(Deserialize)]
struct ProductQuery {
    #[serde(default)]
    featured: bool,
}

async fn list_products(
    State(shared): State<Shared>,
    Query(query): Query<ProductQuery>,
) -> Json<Vec<MockProduct>> {
    let state = shared.lock();
    Json(
        state
            .products
            .iter()
            .filter(|p| !query.featured || p.featured)
            .cloned()
            .collect(),
    )
}

async fn get_product(
    State(shared): State<Shared>,
    Path(id): Path<i64>,
) -> Result<Json<MockProduct>, Failure> {
    shared
        .lock()
        .product(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Product not found"))
}

async fn create_product(
    State(shared): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MockProduct>), Failure> {
    {
        let state = shared.lock();
        authenticate(&state, &headers)?;
    }

    let mut names = Vec::new();
    let mut text = HashMap::new();
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| detail(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        names.push(name.clone());
        if let Some(file_name) = field.file_name().map(ToString::to_string) {
            field
                .bytes()
                .await
                .map_err(|e| detail(StatusCode::BAD_REQUEST, &e.to_string()))?;
            upload = Some(file_name);
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| detail(StatusCode::BAD_REQUEST, &e.to_string()))?;
            text.insert(name, value);
        }
    }

    let mut state = shared.lock();
    if let Some(last) = state.requests.last_mut() {
        last.form_fields.clone_from(&names);
    }

    let missing: Vec<Value> = ["name", "description", "price"]
        .into_iter()
        .filter(|field| !text.contains_key(*field))
        .map(|field| json!({ "loc": ["body", field], "msg": "field required", "type": "missing" }))
        .collect();
    if !missing.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": missing })),
        ));
    }

    let field = |name: &str| text.get(name).cloned().unwrap_or_default();
    let price = field("price")
        .parse::<f64>()
        .map_err(|_| detail(StatusCode::UNPROCESSABLE_ENTITY, "price must be a number"))?;
    let quantity = text
        .get("quantity")
        .map(|q| q.parse::<u32>())
        .transpose()
        .map_err(|_| detail(StatusCode::UNPROCESSABLE_ENTITY, "quantity must be a number"))?
        .unwrap_or_default();
    let image_url = text
        .get("imageUrl")
        .cloned()
        .or_else(|| upload.map(|file| format!("/uploads/{file}")));

    let id = state.next_id();
    let product = MockProduct {
        id,
        name: field("name"),
        description: field("description"),
        price,
        quantity,
        category: text.get("category").cloned(),
        featured: text.get("featured").is_some_and(|f| f == "true"),
        image_url,
    };
    state.products.push(product.clone());
    Ok((StatusCode::CREATED, Json(product)))
}

// =============================================================================
// Cart handlers
// =============================================================================

#[derive(Deserialize)]
struct AddItem {
    product_id: i64,
    quantity: u32,
}

#[derive(Deserialize)]
struct UpdateItem {
    quantity: u32,
}

async fn get_cart(State(shared): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let state = shared.lock();
    let user_id = authenticate(&state, &headers)?;
    if let Some(status) = state.cart_failure {
        return Err(detail(status, "Cart unavailable"));
    }
    Ok(Json(state.cart_json(user_id)))
}

async fn add_cart_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<AddItem>,
) -> Result<Json<Value>, Failure> {
    let mut state = shared.lock();
    let user_id = authenticate(&state, &headers)?;
    let stock = state
        .product(body.product_id)
        .map(|p| p.quantity)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Product not found"))?;

    let in_cart = state
        .carts
        .get(&user_id)
        .and_then(|lines| lines.iter().find(|l| l.product_id == body.product_id))
        .map_or(0, |l| l.quantity);
    if in_cart + body.quantity > stock {
        return Err(detail(StatusCode::BAD_REQUEST, "Insufficient stock"));
    }

    let line_id = state.next_id();
    let lines = state.carts.entry(user_id).or_default();
    match lines.iter_mut().find(|l| l.product_id == body.product_id) {
        Some(line) => line.quantity += body.quantity,
        None => lines.push(CartLine {
            id: line_id,
            product_id: body.product_id,
            quantity: body.quantity,
        }),
    }
    Ok(Json(json!({ "message": "Item added to cart" })))
}

async fn update_cart_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<i64>,
    Json(body): Json<UpdateItem>,
) -> Result<Json<Value>, Failure> {
    let mut state = shared.lock();
    let user_id = authenticate(&state, &headers)?;
    let line = state
        .carts
        .get_mut(&user_id)
        .and_then(|lines| lines.iter_mut().find(|l| l.id == item_id))
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Cart item not found"))?;
    line.quantity = body.quantity;
    Ok(Json(json!({ "message": "Cart item updated" })))
}

async fn remove_cart_item(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(item_id): Path<i64>,
) -> Result<Json<Value>, Failure> {
    let mut state = shared.lock();
    let user_id = authenticate(&state, &headers)?;
    let lines = state
        .carts
        .get_mut(&user_id)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Cart item not found"))?;
    let before = lines.len();
    lines.retain(|l| l.id != item_id);
    if lines.len() == before {
        return Err(detail(StatusCode::NOT_FOUND, "Cart item not found"));
    }
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

async fn clear_cart(State(shared): State<Shared>, headers: HeaderMap) -> Result<Json<Value>, Failure> {
    let mut state = shared.lock();
    let user_id = authenticate(&state, &headers)?;
    state.carts.remove(&user_id);
    Ok(Json(json!({ "message": "Cart cleared" })))
}

// =============================================================================
// Order handlers
// =============================================================================

#[derive(Deserialize)]
struct OrderLineBody {
    #[serde(default)]
    product_id: Option<i64>,
    #[serde(default, rename = "productId")]
    product_id_camel: Option<i64>,
    quantity: u32,
}

#[derive(Deserialize)]
struct OrderBody {
    items: Vec<OrderLineBody>,
}

async fn create_order(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<OrderBody>,
) -> Result<(StatusCode, Json<MockOrder>), Failure> {
    let mut state = shared.lock();
    let user_id = authenticate(&state, &headers)?;

    let mut items = Vec::new();
    for line in &body.items {
        let product_id = line.product_id.or(line.product_id_camel).ok_or_else(|| {
            detail(StatusCode::BAD_REQUEST, "product_id or productId is required")
        })?;
        let product = state
            .product(product_id)
            .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Product not found"))?;
        if line.quantity > product.quantity {
            return Err(detail(
                StatusCode::BAD_REQUEST,
                &format!("Insufficient stock for {}", product.name),
            ));
        }
        items.push(MockOrderItem {
            product_id,
            quantity: line.quantity,
            price: product.price,
        });
    }

    for item in &items {
        if let Some(product) = state.products.iter_mut().find(|p| p.id == item.product_id) {
            product.quantity -= item.quantity;
        }
    }

    let id = state.next_id();
    let order = MockOrder {
        id,
        user_id,
        price: items.iter().map(|i| i.price * f64::from(i.quantity)).sum(),
        items,
        status: "Pending",
        created_at: CREATED_AT,
    };
    state.orders.push(order.clone());
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(shared): State<Shared>,
    headers: HeaderMap,
) -> Result<Json<Vec<MockOrder>>, Failure> {
    let state = shared.lock();
    let user_id = authenticate(&state, &headers)?;
    Ok(Json(
        state
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect(),
    ))
}

async fn get_order(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<MockOrder>, Failure> {
    let state = shared.lock();
    let user_id = authenticate(&state, &headers)?;
    let order = state
        .orders
        .iter()
        .find(|o| o.id == id)
        .ok_or_else(|| detail(StatusCode::NOT_FOUND, "Order not found"))?;
    if order.user_id != user_id {
        return Err(detail(StatusCode::FORBIDDEN, "Not authorized to view this order"));
    }
    Ok(Json(order.clone()))
}
