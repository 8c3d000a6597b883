//! Drives the proxy router end to end against a mock exchange bound on localhost.

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, Uri},
};
use c2cads::{
    AdForm, AdvancedFilters, C2cRestAPI, Credentials, DisclaimerGate, FilterField, FixedAdDefaults, FormState,
    ProxyConfig, TradeMethodTagging, build_ad_payload, proxy, signer,
};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;

const DETAILS_PATH: &str = "/sapi/v1/c2c/ads/getDetailByNo";
const CREATE_PATH: &str = "/sapi/v1/c2c/ads/post";

/// One request as seen by the mock exchange
#[derive(Clone, Debug)]
struct Recorded {
    method: Method,
    path: String,
    query: String,
    api_key: Option<String>,
    content_type: Option<String>,
    body: String,
}

impl Recorded {
    /// The query without the trailing signature, and the signature
    fn split_signature(&self) -> (String, String) {
        let (canonical, signature) = self.query.rsplit_once("&signature=").expect("signature is last");
        (canonical.to_string(), signature.to_string())
    }
}

struct MockExchange {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl MockExchange {
    /// Serve canned `(path, status, body)` responses. Unknown paths get a 404.
    async fn spawn(routes: Vec<(&'static str, StatusCode, &'static str)>) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorder = calls.clone();
        let app = Router::new().fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let recorder = recorder.clone();
            let routes = routes.clone();
            async move {
                let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
                recorder.lock().unwrap().push(Recorded {
                    method,
                    path: uri.path().to_string(),
                    query: uri.query().unwrap_or_default().to_string(),
                    api_key: header("x-mbx-apikey"),
                    content_type: header("content-type"),
                    body: String::from_utf8_lossy(&body).to_string(),
                });
                routes
                    .iter()
                    .find(|(path, _, _)| *path == uri.path())
                    .map(|(_, status, body)| (*status, *body))
                    .unwrap_or((StatusCode::NOT_FOUND, ""))
            }
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        Self { addr, calls }
    }

    fn api(&self) -> C2cRestAPI {
        api_for(&format!("http://{}", self.addr))
    }

    fn router(&self) -> Router {
        proxy::router(Arc::new(self.api()))
    }

    fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

fn api_for(base_url: &str) -> C2cRestAPI {
    let config = ProxyConfig::builder().base_url(base_url).build().unwrap();
    C2cRestAPI::new(&config).unwrap()
}

async fn post_json(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn now_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
}

const DETAILS_BODY: &str = r#"{"code":"000000","message":"success","data":{"advNo":"123","tradeMethods":[{"payId":11,"payType":"BANK_TRANSFER","identifier":"BankTransfer","tradeMethodName":"Bank Transfer"},{"payId":"22","payType":"MOBILE","identifier":"MPesa"}]}}"#;

#[tokio::test]
async fn test_get_ad_details_signs_and_forwards() {
    let exchange = MockExchange::spawn(vec![(DETAILS_PATH, StatusCode::OK, DETAILS_BODY)]).await;

    let before = now_millis();
    let (status, body) = post_json(
        exchange.router(),
        "/get-ad-details",
        json!({"apiKey": "k", "secretKey": "s", "adId": "123"}).to_string(),
    )
    .await;
    let after = now_millis();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::from_str::<Value>(DETAILS_BODY).unwrap());

    let calls = exchange.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.method, Method::POST);
    assert_eq!(call.path, DETAILS_PATH);
    assert_eq!(call.api_key.as_deref(), Some("k"));

    let (canonical, signature) = call.split_signature();
    let timestamp: u64 = canonical
        .strip_prefix("adsNo=123&recvWindow=5000&timestamp=")
        .expect("parameters in order")
        .parse()
        .unwrap();
    assert!(before <= timestamp && timestamp <= after);
    assert_eq!(signature, signer::sign(&canonical, "s").unwrap());
}

#[tokio::test]
async fn test_get_ad_details_accepts_numeric_ad_id_on_alias_route() {
    let exchange = MockExchange::spawn(vec![(DETAILS_PATH, StatusCode::OK, DETAILS_BODY)]).await;
    let (status, _) = post_json(
        exchange.router(),
        "/api/binance/get-ad-details",
        r#"{"apiKey":"k","secretKey":"s","adId":13753690538259550208}"#.to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (canonical, _) = exchange.calls()[0].split_signature();
    assert!(canonical.starts_with("adsNo=13753690538259550208&recvWindow=5000&timestamp="));
}

#[tokio::test]
async fn test_get_ad_details_missing_parameters() {
    let exchange = MockExchange::spawn(vec![(DETAILS_PATH, StatusCode::OK, DETAILS_BODY)]).await;
    let bodies = [
        json!({"secretKey": "s", "adId": "1"}),
        json!({"apiKey": "k", "adId": "1"}),
        json!({"apiKey": "k", "secretKey": "s"}),
        json!({"apiKey": "", "secretKey": "s", "adId": "1"}),
        json!({"apiKey": "k", "secretKey": "s", "adId": null}),
        json!({"apiKey": "k", "secretKey": "s", "adId": 0}),
        json!({"apiKey": "k", "secretKey": "s", "adId": false}),
        json!({"apiKey": false, "secretKey": "s", "adId": "1"}),
        json!({"apiKey": "k", "secretKey": 0, "adId": "1"}),
        json!({}),
    ];
    for body in bodies {
        let (status, response) = post_json(exchange.router(), "/get-ad-details", body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert_eq!(response, json!({"error": "Missing required parameters"}));
    }
    assert!(exchange.calls().is_empty());
}

#[tokio::test]
async fn test_create_ad_missing_parameters() {
    let exchange = MockExchange::spawn(vec![(CREATE_PATH, StatusCode::OK, "")]).await;
    let bodies = [
        json!({"secretKey": "s", "adData": {"asset": "USDT"}}),
        json!({"apiKey": "k", "adData": {"asset": "USDT"}}),
        json!({"apiKey": "k", "secretKey": "s"}),
        json!({"apiKey": "k", "secretKey": "s", "adData": null}),
        json!({"apiKey": "k", "secretKey": "s", "adData": false}),
        json!({"apiKey": "k", "secretKey": "s", "adData": 0}),
        json!({"apiKey": false, "secretKey": "s", "adData": {"asset": "USDT"}}),
    ];
    for body in bodies {
        let (status, response) = post_json(exchange.router(), "/create-ad", body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
        assert!(response["error"].is_string());
    }
    assert!(exchange.calls().is_empty());
}

#[tokio::test]
async fn test_create_ad_sends_payload_as_body() {
    let exchange = MockExchange::spawn(vec![(CREATE_PATH, StatusCode::OK, r#"{"code":"000000","data":"987"}"#)]).await;
    let payload = build_ad_payload(&FixedAdDefaults::default(), &AdvancedFilters::default(), "11")
        .unwrap()
        .into_value();

    let (status, body) = post_json(
        exchange.router(),
        "/create-ad",
        json!({"apiKey": "k", "secretKey": "s", "adData": payload.clone()}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"code": "000000", "data": "987"}));

    let calls = exchange.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.path, CREATE_PATH);
    assert_eq!(call.api_key.as_deref(), Some("k"));
    assert_eq!(call.content_type.as_deref(), Some("application/json"));

    // Only recvWindow and timestamp are signed, the payload travels in the body
    let (canonical, signature) = call.split_signature();
    assert!(canonical.starts_with("recvWindow=5000&timestamp="));
    assert_eq!(canonical.matches('&').count(), 1);
    assert_eq!(signature, signer::sign(&canonical, "s").unwrap());
    assert_eq!(serde_json::from_str::<Value>(&call.body).unwrap(), payload);
}

#[tokio::test]
async fn test_create_ad_empty_response_is_success() {
    let exchange = MockExchange::spawn(vec![(CREATE_PATH, StatusCode::OK, "")]).await;
    let (status, body) = post_json(
        exchange.router(),
        "/create-ad",
        json!({"apiKey": "k", "secretKey": "s", "adData": {"asset": "USDT"}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
}

#[tokio::test]
async fn test_exchange_rejection_is_passed_through() {
    let exchange = MockExchange::spawn(vec![(
        CREATE_PATH,
        StatusCode::BAD_REQUEST,
        r#"{"code":-1102,"msg":"Invalid ad"}"#,
    )])
    .await;
    let (status, body) = post_json(
        exchange.router(),
        "/create-ad",
        json!({"apiKey": "k", "secretKey": "s", "adData": {"asset": "USDT"}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid ad"}));
}

#[tokio::test]
async fn test_exchange_rejection_without_message_uses_fallback() {
    let exchange = MockExchange::spawn(vec![
        (DETAILS_PATH, StatusCode::FORBIDDEN, "{}"),
        (CREATE_PATH, StatusCode::FORBIDDEN, r#"{"code":-1}"#),
    ])
    .await;
    let (status, body) = post_json(
        exchange.router(),
        "/get-ad-details",
        json!({"apiKey": "k", "secretKey": "s", "adId": "1"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "Failed to fetch ad details"}));

    let (status, body) = post_json(
        exchange.router(),
        "/create-ad",
        json!({"apiKey": "k", "secretKey": "s", "adData": {"asset": "USDT"}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({"error": "Failed to create ad"}));
}

#[tokio::test]
async fn test_exchange_rejection_with_unparseable_body_is_internal_error() {
    let exchange = MockExchange::spawn(vec![
        (DETAILS_PATH, StatusCode::SERVICE_UNAVAILABLE, "upstream down"),
        (CREATE_PATH, StatusCode::SERVICE_UNAVAILABLE, "upstream down"),
    ])
    .await;
    for (uri, body) in [
        ("/get-ad-details", json!({"apiKey": "k", "secretKey": "s", "adId": "1"})),
        ("/create-ad", json!({"apiKey": "k", "secretKey": "s", "adData": {"asset": "USDT"}})),
    ] {
        let (status, response) = post_json(exchange.router(), uri, body.to_string()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{}", uri);
        assert_eq!(response, json!({"error": "Internal server error"}));
    }
}

#[tokio::test]
async fn test_exchange_rejection_with_empty_body() {
    let exchange = MockExchange::spawn(vec![
        (DETAILS_PATH, StatusCode::BAD_REQUEST, ""),
        (CREATE_PATH, StatusCode::BAD_REQUEST, ""),
    ])
    .await;
    // Nothing to parse on details, but an empty create answer has no message
    let (status, body) = post_json(
        exchange.router(),
        "/get-ad-details",
        json!({"apiKey": "k", "secretKey": "s", "adId": "1"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));

    let (status, body) = post_json(
        exchange.router(),
        "/create-ad",
        json!({"apiKey": "k", "secretKey": "s", "adData": {"asset": "USDT"}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Failed to create ad"}));
}

#[tokio::test]
async fn test_create_ad_whitespace_response_is_internal_error() {
    let exchange = MockExchange::spawn(vec![(CREATE_PATH, StatusCode::OK, "   ")]).await;
    let (status, body) = post_json(
        exchange.router(),
        "/create-ad",
        json!({"apiKey": "k", "secretKey": "s", "adData": {"asset": "USDT"}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_unparseable_success_body_is_internal_error() {
    let exchange = MockExchange::spawn(vec![(DETAILS_PATH, StatusCode::OK, "not json")]).await;
    let (status, body) = post_json(
        exchange.router(),
        "/get-ad-details",
        json!({"apiKey": "k", "secretKey": "s", "adId": "1"}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_transport_failure_is_internal_error() {
    // Bind and immediately release a port so nothing is listening on it
    let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let app = proxy::router(Arc::new(api_for(&format!("http://{}", addr))));
    let (status, body) = post_json(
        app,
        "/create-ad",
        json!({"apiKey": "k", "secretKey": "s", "adData": {"asset": "USDT"}}).to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn test_malformed_request_body_is_internal_error() {
    let exchange = MockExchange::spawn(vec![]).await;
    let (status, body) = post_json(exchange.router(), "/get-ad-details", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));
    assert!(exchange.calls().is_empty());
}

#[tokio::test]
async fn test_form_flow_through_proxy() {
    let exchange = MockExchange::spawn(vec![
        (DETAILS_PATH, StatusCode::OK, DETAILS_BODY),
        (CREATE_PATH, StatusCode::OK, ""),
    ])
    .await;
    let api = exchange.api();

    let mut gate = DisclaimerGate::new(0);
    gate.acknowledge().unwrap();
    let mut form = AdForm::new(&gate, TradeMethodTagging::BankTransfer).unwrap();
    form.enter_credentials(Credentials::new("k", "s")).unwrap();
    form.set_ad_id("123").unwrap();

    let request = form.begin_fetch().unwrap();
    form.finish_fetch(proxy::fetch_ad_details(&api, request).await).unwrap();
    assert_eq!(form.state(), FormState::MethodsFetched);
    assert_eq!(form.methods().len(), 2);

    form.select_method("22").unwrap();
    form.set_filter(FilterField::AllTradeCountMin, "100000").unwrap();
    form.set_filter(FilterField::TradeCountFilterTime, "2").unwrap();

    let request = form.begin_submit().unwrap();
    form.finish_submit(proxy::create_ad(&api, request).await).unwrap();
    assert_eq!(form.state(), FormState::Created);

    let calls = exchange.calls();
    assert_eq!(calls.len(), 2);
    let sent: Value = serde_json::from_str(&calls[1].body).unwrap();
    assert_eq!(sent["payId"], json!("22"));
    assert_eq!(sent["userAllTradeCountMin"], json!(100000));
    assert_eq!(sent["userBuyTradeCountMin"], json!(-1));
    assert_eq!(sent["tradeMethods"].as_array().unwrap().len(), 1);
    assert_eq!(sent["tradeMethods"][0]["payId"], json!("22"));
}

#[tokio::test]
async fn test_form_reports_upstream_error() {
    let exchange = MockExchange::spawn(vec![(
        DETAILS_PATH,
        StatusCode::UNAUTHORIZED,
        r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#,
    )])
    .await;
    let api = exchange.api();

    let mut gate = DisclaimerGate::new(0);
    gate.acknowledge().unwrap();
    let mut form = AdForm::new(&gate, TradeMethodTagging::BankTransfer).unwrap();
    form.enter_credentials(Credentials::new("k", "s")).unwrap();
    form.set_ad_id("123").unwrap();
    let request = form.begin_fetch().unwrap();
    form.finish_fetch(proxy::fetch_ad_details(&api, request).await).unwrap();

    assert_eq!(form.state(), FormState::Error);
    assert_eq!(form.message(), "Error: Invalid API-key, IP, or permissions for action.");
    assert!(form.can_fetch());
}
