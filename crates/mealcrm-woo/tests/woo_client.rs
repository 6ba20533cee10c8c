//! Integration tests for `WooClient` against a `wiremock` server.

use serde_json::json;
use wiremock::matchers::{basic_auth, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mealcrm_woo::{OrderQuery, WooClient, WooCredentials, WooError};

const ORDERS_PATH: &str = "/wp-json/wc/v3/orders";

fn test_client(base: &str) -> WooClient {
    WooClient::new(
        base,
        WooCredentials {
            consumer_key: "ck_test".to_owned(),
            consumer_secret: "cs_test".to_owned(),
        },
        5,
        "mealcrm-test/0.1",
        0,
        0,
    )
    .expect("failed to build test WooClient")
}

fn order_json(id: i64, email: &str, customer_id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "status": "processing",
        "customer_id": customer_id,
        "billing": {
            "first_name": "Ana",
            "last_name": "Petrovic",
            "email": email,
            "phone": "064 307-3023",
            "address_1": "Bulevar 1",
            "city": "Novi Sad"
        },
        "date_created": "2024-03-01T10:15:00",
        "total": "1250.00",
        "payment_method_title": "Cash on delivery",
        "line_items": [{ "id": 1, "name": "Fit plan 20 dana", "quantity": 1 }]
    })
}

#[tokio::test]
async fn list_orders_sends_auth_and_reads_pagination_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .and(basic_auth("ck_test", "cs_test"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "100"))
        .and(query_param("status", "any"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([order_json(11, "a@x.com", 0)]))
                .insert_header("X-WP-Total", "101")
                .insert_header("X-WP-TotalPages", "2"),
        )
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client
        .list_orders(&OrderQuery::page(2, 100).with_status("any"))
        .await
        .expect("page");

    assert_eq!(page.orders.len(), 1);
    assert_eq!(page.orders[0].id, 11);
    assert_eq!(page.meta.total_pages, Some(2));
    assert_eq!(page.meta.total, Some(101));
}

#[tokio::test]
async fn search_orders_passes_search_term() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .and(query_param("search", "0643073023"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            order_json(1, "a@x.com", 0),
            order_json(2, "a@x.com", 5)
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let orders = client
        .search_orders("0643073023", 100)
        .await
        .expect("search");
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1].customer_id, 5);
}

#[tokio::test]
async fn get_order_maps_404_to_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("{ORDERS_PATH}/999")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "woocommerce_rest_shop_order_invalid_id",
            "message": "Invalid ID."
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.get_order(999).await.expect_err("should fail");
    assert!(err.is_not_found(), "expected NotFound, got: {err:?}");
}

#[tokio::test]
async fn bad_credentials_map_to_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .list_orders(&OrderQuery::page(1, 10))
        .await
        .expect_err("should fail");
    assert!(
        matches!(err, WooError::Unauthorized { .. }),
        "expected Unauthorized, got: {err:?}"
    );
}

#[tokio::test]
async fn rate_limit_reads_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "17"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .list_orders(&OrderQuery::page(1, 10))
        .await
        .expect_err("should fail");
    assert!(
        matches!(err, WooError::RateLimited { retry_after_secs: 17 }),
        "expected RateLimited(17), got: {err:?}"
    );
}

#[tokio::test]
async fn server_error_maps_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .list_orders(&OrderQuery::page(1, 10))
        .await
        .expect_err("should fail");
    assert!(
        matches!(err, WooError::UnexpectedStatus { status: 503, .. }),
        "expected UnexpectedStatus(503), got: {err:?}"
    );
}

#[tokio::test]
async fn malformed_body_maps_to_deserialize() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ORDERS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .list_orders(&OrderQuery::page(1, 10))
        .await
        .expect_err("should fail");
    assert!(
        matches!(err, WooError::Deserialize { .. }),
        "expected Deserialize, got: {err:?}"
    );
}

#[tokio::test]
async fn customers_lookup_by_email() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/customers"))
        .and(query_param("email", "ana@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 5,
            "email": "ana@example.com",
            "first_name": "Ana",
            "last_name": "Petrovic",
            "billing": { "phone": "0643073023", "city": "Novi Sad" }
        }])))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let customers = client
        .find_customers_by_email("ana@example.com")
        .await
        .expect("customers");
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].id, 5);
    assert_eq!(customers[0].billing.city, "Novi Sad");
}

#[tokio::test]
async fn get_customer_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wp-json/wc/v3/customers/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 5,
            "email": "ana@example.com",
            "first_name": "Ana",
            "last_name": "Petrovic"
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let customer = client.get_customer(5).await.expect("customer");
    assert_eq!(customer.email, "ana@example.com");
}
