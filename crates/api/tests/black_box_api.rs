use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use shopfront_api::app::services::AppServices;
use shopfront_auth::{JwtClaims, Role, User};
use shopfront_core::UserId;
use shopfront_infra::config::StoreConfig;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory store, ephemeral port.
        let services = shopfront_api::app::services::build_services(&StoreConfig::InMemory)
            .await
            .expect("failed to build services");
        let app = shopfront_api::app::build_app(services.clone(), JWT_SECRET);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Provision a user and mint a token for them.
    async fn login(&self, role: Role) -> (UserId, String) {
        let id = UserId::new();
        let user = User::new(id, &format!("{id}@example.com"), None, role, Utc::now()).unwrap();
        self.services.users.provision(user).await.unwrap();
        (id, mint_jwt(id, role))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: UserId, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        role,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn expect_json(res: reqwest::Response, status: StatusCode) -> Value {
    let actual = res.status();
    let body = res.text().await.unwrap_or_default();
    assert_eq!(actual, status, "body={body}");
    if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&body).unwrap()
    }
}

#[tokio::test]
async fn health_is_public_and_api_requires_auth() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/api/whoami")).send().await.unwrap();
    let body = expect_json(res, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["error"], "unauthorized");

    let res = client
        .get(srv.url("/api/cart"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reflects_token_claims() {
    let srv = TestServer::spawn().await;
    let (id, token) = srv.login(Role::Admin).await;

    let res = reqwest::Client::new()
        .get(srv.url("/api/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    let body = expect_json(res, StatusCode::OK).await;

    assert_eq!(body["userId"], id.to_string());
    assert_eq!(body["role"], "ADMIN");
    assert_eq!(body["profile"]["email"], format!("{id}@example.com"));
}

#[tokio::test]
async fn checkout_pay_and_cancel_flow() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, admin) = srv.login(Role::Admin).await;
    let (_, customer) = srv.login(Role::Customer).await;

    // Admin stocks the catalog.
    let res = client
        .post(srv.url("/api/categories"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Lighting" }))
        .send()
        .await
        .unwrap();
    let category = expect_json(res, StatusCode::CREATED).await;

    let mut ids = Vec::new();
    for (name, price, stock) in [("Lamp", "10.00", 5), ("Bulb", "5.00", 3)] {
        let res = client
            .post(srv.url("/api/products"))
            .bearer_auth(&admin)
            .json(&json!({
                "name": name,
                "price": price,
                "stockCount": stock,
                "categoryId": category["id"],
            }))
            .send()
            .await
            .unwrap();
        let product = expect_json(res, StatusCode::CREATED).await;
        assert_eq!(product["category"], "Lighting");
        ids.push(product["id"].as_str().unwrap().to_string());
    }

    // Customers cannot touch the catalog.
    let res = client
        .delete(srv.url(&format!("/api/products/{}", ids[0])))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    for (id, quantity) in [(&ids[0], 2), (&ids[1], 1)] {
        let res = client
            .post(srv.url("/api/cart/items"))
            .bearer_auth(&customer)
            .json(&json!({ "productId": id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
        expect_json(res, StatusCode::OK).await;
    }

    let res = client
        .post(srv.url("/api/orders"))
        .bearer_auth(&customer)
        .json(&json!({ "shippingAddress": "1 Main St" }))
        .send()
        .await
        .unwrap();
    let order = expect_json(res, StatusCode::CREATED).await;
    assert_eq!(order["totalAmount"], "25.00");
    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["paymentStatus"], "PENDING");
    let order_id = order["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url(&format!("/api/products/{}", ids[0])))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let lamp = expect_json(res, StatusCode::OK).await;
    assert_eq!(lamp["stockCount"], 3);

    // Empty cart now.
    let res = client
        .post(srv.url("/api/orders"))
        .bearer_auth(&customer)
        .json(&json!({ "shippingAddress": "1 Main St" }))
        .send()
        .await
        .unwrap();
    let body = expect_json(res, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], "empty_cart");

    let res = client
        .post(srv.url(&format!("/api/payments/create-intent/{order_id}")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let intent = expect_json(res, StatusCode::OK).await;
    let intent_id = intent["paymentIntentId"].as_str().unwrap().to_string();
    assert!(intent_id.starts_with("pi_"));

    let res = client
        .post(srv.url(&format!("/api/payments/confirm/{intent_id}")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let paid = expect_json(res, StatusCode::OK).await;
    assert_eq!(paid["status"], "COMPLETED");
    assert_eq!(paid["orderStatus"], "CONFIRMED");

    let res = client
        .post(srv.url(&format!("/api/orders/{order_id}/cancel")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let cancelled = expect_json(res, StatusCode::OK).await;
    assert_eq!(cancelled["status"], "CANCELLED");

    let res = client
        .post(srv.url(&format!("/api/orders/{order_id}/cancel")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let body = expect_json(res, StatusCode::CONFLICT).await;
    assert_eq!(body["error"], "invalid_transition");

    let res = client
        .get(srv.url(&format!("/api/products/{}", ids[0])))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let lamp = expect_json(res, StatusCode::OK).await;
    assert_eq!(lamp["stockCount"], 5);
    assert_eq!(lamp["inStock"], true);

    let res = client
        .get(srv.url("/api/admin/dashboard/stats"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let stats = expect_json(res, StatusCode::OK).await;
    assert_eq!(stats["totalOrders"], 1);
    assert_eq!(stats["cancelledOrders"], 1);
}

#[tokio::test]
async fn admin_status_updates_and_error_shapes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, admin) = srv.login(Role::Admin).await;
    let (_, customer) = srv.login(Role::Customer).await;

    let res = client
        .get(srv.url("/api/orders/not-a-uuid"))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let body = expect_json(res, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], "validation_error");

    let res = client
        .get(srv.url(&format!("/api/orders/{}", UserId::new())))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let body = expect_json(res, StatusCode::NOT_FOUND).await;
    assert_eq!(body["error"], "not_found");

    let res = client
        .post(srv.url("/api/products"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Lamp", "price": "10", "stockCount": 1 }))
        .send()
        .await
        .unwrap();
    let product = expect_json(res, StatusCode::CREATED).await;
    let res = client
        .post(srv.url("/api/cart/items"))
        .bearer_auth(&customer)
        .json(&json!({ "productId": product["id"] }))
        .send()
        .await
        .unwrap();
    expect_json(res, StatusCode::OK).await;
    let res = client
        .post(srv.url("/api/orders"))
        .bearer_auth(&customer)
        .json(&json!({ "shippingAddress": "1 Main St" }))
        .send()
        .await
        .unwrap();
    let order = expect_json(res, StatusCode::CREATED).await;
    let order_id = order["id"].as_str().unwrap();

    let status_url = |status: &str| srv.url(&format!("/api/admin/orders/{order_id}/status?status={status}"));

    let res = client.patch(status_url("CONFIRMED")).bearer_auth(&customer).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.patch(status_url("DELIVERED")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client.patch(status_url("confirmed")).bearer_auth(&admin).send().await.unwrap();
    let confirmed = expect_json(res, StatusCode::OK).await;
    assert_eq!(confirmed["status"], "CONFIRMED");

    let res = client
        .get(srv.url("/api/admin/orders?page=0&size=5"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let page = expect_json(res, StatusCode::OK).await;
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["items"][0]["userEmail"].as_str().map(|e| e.ends_with("@example.com")), Some(true));
}

#[tokio::test]
async fn product_search_and_wishlist() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, admin) = srv.login(Role::Admin).await;
    let (_, customer) = srv.login(Role::Customer).await;

    let mut lamp_id = String::new();
    for (name, price, featured) in [("Brass Lamp", "40", true), ("Oak Desk", "250", false), ("Paper Lamp", "15", false)] {
        let res = client
            .post(srv.url("/api/products"))
            .bearer_auth(&admin)
            .json(&json!({ "name": name, "price": price, "stockCount": 2, "featured": featured }))
            .send()
            .await
            .unwrap();
        let product = expect_json(res, StatusCode::CREATED).await;
        if name == "Paper Lamp" {
            lamp_id = product["id"].as_str().unwrap().to_string();
        }
    }

    let res = client
        .get(srv.url("/api/products?name=lamp&sort=price_asc&maxPrice=30"))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let page = expect_json(res, StatusCode::OK).await;
    assert_eq!(page["totalElements"], 1);
    assert_eq!(page["items"][0]["name"], "Paper Lamp");

    let res = client
        .get(srv.url("/api/products/featured"))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let featured = expect_json(res, StatusCode::OK).await;
    assert_eq!(featured.as_array().map(Vec::len), Some(1));

    let wishlist_url = srv.url(&format!("/api/wishlist/{lamp_id}"));
    let res = client.post(&wishlist_url).bearer_auth(&customer).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let res = client.post(&wishlist_url).bearer_auth(&customer).send().await.unwrap();
    let body = expect_json(res, StatusCode::CONFLICT).await;
    assert_eq!(body["error"], "conflict");

    let res = client
        .get(srv.url(&format!("/api/wishlist/check/{lamp_id}")))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    let check = expect_json(res, StatusCode::OK).await;
    assert_eq!(check["inWishlist"], true);
}

#[tokio::test]
async fn user_profiles_and_admin_user_management() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, admin) = srv.login(Role::Admin).await;
    let (customer_id, customer) = srv.login(Role::Customer).await;

    let res = client
        .put(srv.url("/api/users/me"))
        .bearer_auth(&customer)
        .json(&json!({ "name": "Ana", "phone": "555-0100" }))
        .send()
        .await
        .unwrap();
    let me = expect_json(res, StatusCode::OK).await;
    assert_eq!(me["displayName"], "Ana");

    let res = client.get(srv.url("/api/users/me")).bearer_auth(&customer).send().await.unwrap();
    let me = expect_json(res, StatusCode::OK).await;
    assert_eq!(me["phone"], "555-0100");
    assert_eq!(me["enabled"], true);

    let res = client
        .get(srv.url("/api/admin/users?page=0&size=10"))
        .bearer_auth(&customer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.get(srv.url("/api/admin/users")).bearer_auth(&admin).send().await.unwrap();
    let page = expect_json(res, StatusCode::OK).await;
    assert_eq!(page["totalElements"], 2);

    // A role change applies to tokens minted before it.
    let user_url = srv.url(&format!("/api/admin/users/{customer_id}"));
    let res = client
        .patch(format!("{user_url}/role?role=admin"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let promoted = expect_json(res, StatusCode::OK).await;
    assert_eq!(promoted["role"], "ADMIN");
    let res = client.get(srv.url("/api/admin/users")).bearer_auth(&customer).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .patch(format!("{user_url}/role?role=owner"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body = expect_json(res, StatusCode::BAD_REQUEST).await;
    assert_eq!(body["error"], "validation_error");

    let res = client
        .patch(format!("{user_url}/toggle-enabled"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let disabled = expect_json(res, StatusCode::OK).await;
    assert_eq!(disabled["enabled"], false);
    let res = client.get(srv.url("/api/users/me")).bearer_auth(&customer).send().await.unwrap();
    let body = expect_json(res, StatusCode::FORBIDDEN).await;
    assert_eq!(body["error"], "access_denied");

    let res = client.delete(&user_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = client.get(&user_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_analytics_shape() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, admin) = srv.login(Role::Admin).await;

    let res = client
        .get(srv.url("/api/admin/analytics?days=7"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let analytics = expect_json(res, StatusCode::OK).await;
    assert_eq!(analytics["days"], 7);
    assert_eq!(analytics["dailyStats"], json!([]));
    assert_eq!(analytics["categorySales"], json!([]));
    assert_eq!(analytics["topProducts"], json!([]));
    assert_eq!(analytics["orderStatusBreakdown"]["pending"], 0);
    assert_eq!(analytics["orderStatusBreakdown"]["cancelled"], 0);

    let res = client
        .get(srv.url("/api/admin/analytics?days=0"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
