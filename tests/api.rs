//! HTTP trading flow: quote, buy, sell, portfolio, history.

mod common;

use std::str::FromStr;

use paper_ledger::api::routes::{AppState, app_router};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

async fn spawn_app(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let app = app_router(state);
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (base_url, handle)
}

fn decimal(v: &Value) -> Decimal {
    Decimal::from_str(v.as_str().unwrap()).unwrap()
}

/// Starts a server with AAA=100 and BBB=20, registers a user and returns (base_url, token).
async fn logged_in() -> (String, String, tokio::task::JoinHandle<()>) {
    let h = common::harness(dec!(10000), &[("AAA", dec!(100)), ("BBB", dec!(20))]).await;
    let state = AppState {
        engine: h.engine.clone(),
        jwt_secret: b"api-test-secret".to_vec(),
    };
    let (base_url, handle) = spawn_app(state).await;
    let client = reqwest::Client::new();
    let creds = json!({ "username": "trader", "password": "pw" });
    client
        .post(format!("{base_url}/auth/register"))
        .json(&creds)
        .send()
        .await
        .unwrap();
    let json: Value = client
        .post(format!("{base_url}/auth/login"))
        .json(&creds)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token = json["token"].as_str().unwrap().to_string();
    (base_url, token, handle)
}

#[tokio::test]
async fn health_is_public() {
    let (base_url, _token, _handle) = logged_in().await;
    let res = reqwest::get(format!("{base_url}/health")).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.text().await.unwrap(), "healthy");
}

#[tokio::test]
async fn trading_routes_require_token() {
    let (base_url, _token, _handle) = logged_in().await;
    let client = reqwest::Client::new();

    let res = client.get(format!("{base_url}/portfolio")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 401);

    let res = client
        .get(format!("{base_url}/history"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 401);
}

#[tokio::test]
async fn quote_lookup() {
    let (base_url, token, _handle) = logged_in().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base_url}/quote/aaa"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["symbol"], "AAA");
    assert_eq!(decimal(&json["price"]), dec!(100));

    let res = client
        .get(format!("{base_url}/quote/nope"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["kind"], "unknown_symbol");
}

#[tokio::test]
async fn buy_sell_then_inspect() {
    let (base_url, token, _handle) = logged_in().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{base_url}/buy"))
        .bearer_auth(&token)
        .json(&json!({ "symbol": "AAA", "shares": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let receipt: Value = res.json().await.unwrap();
    assert_eq!(decimal(&receipt["new_balance"]), dec!(9000));

    let res = client
        .post(format!("{base_url}/sell"))
        .bearer_auth(&token)
        .json(&json!({ "symbol": "AAA", "shares": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let portfolio: Value = client
        .get(format!("{base_url}/portfolio"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decimal(&portfolio["cash"]), dec!(9400));
    assert_eq!(portfolio["positions"][0]["shares"], 6);
    assert_eq!(decimal(&portfolio["grand_total"]), dec!(10000));

    let history: Value = client
        .get(format!("{base_url}/history"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history[0]["type"], "SELL");
    assert_eq!(history[0]["shares"], -4);
    assert_eq!(history[1]["type"], "BUY");

    let sellable: Value = client
        .get(format!("{base_url}/portfolio/sellable"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sellable, json!([{ "symbol": "AAA", "shares": 6 }]));
}

#[tokio::test]
async fn business_rejections_are_400_with_kind() {
    let (base_url, token, _handle) = logged_in().await;
    let client = reqwest::Client::new();

    let cases = [
        ("/buy", json!({ "symbol": "AAA", "shares": 101 }), "insufficient_funds"),
        ("/sell", json!({ "symbol": "BBB", "shares": 1 }), "insufficient_holdings"),
        ("/buy", json!({ "symbol": "AAA", "shares": 0 }), "invalid_input"),
        ("/buy", json!({ "symbol": "", "shares": 1 }), "invalid_input"),
    ];
    for (path, body, kind) in cases {
        let res = client
            .post(format!("{base_url}{path}"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400, "{path} {body}");
        let json: Value = res.json().await.unwrap();
        assert_eq!(json["kind"], kind);
    }
}

#[tokio::test]
async fn malformed_shares_are_invalid_input() {
    let (base_url, token, _handle) = logged_in().await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "symbol": "AAA", "shares": 1.5 }),
        json!({ "symbol": "AAA", "shares": "abc" }),
        json!({ "symbol": "AAA" }),
        json!({ "symbol": "AAA", "shares": 5_000_000_000u64 }),
    ] {
        let res = client
            .post(format!("{base_url}/buy"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400, "{body}");
        let json: Value = res.json().await.unwrap();
        assert_eq!(json["kind"], "invalid_input");
        assert_eq!(json["error"], "invalid input: shares must be a positive integer");
    }

    let res = client
        .post(format!("{base_url}/buy"))
        .bearer_auth(&token)
        .json(&json!({ "symbol": "AAA", "shares": "2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn unparseable_body_is_json_400() {
    let (base_url, token, _handle) = logged_in().await;
    let res = reqwest::Client::new()
        .post(format!("{base_url}/sell"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["kind"], "invalid_input");
    assert!(json["error"].is_string());
}
