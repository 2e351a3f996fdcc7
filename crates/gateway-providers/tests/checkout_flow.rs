//! Paystack checkout lifecycle against a mock API.

mod common;

use common::{registry, settings, TTL_SECS};
use gateway_core::{
    CallbackHandle, GatewayError, InMemorySessionStore, PaymentProvider, ProviderContext,
    SessionRequest,
};
use gateway_providers::{PaystackProvider, ReqwestTransport};
use std::sync::Arc;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn initialize_response(reference: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": true,
        "message": "Authorization URL created",
        "data": {
            "authorization_url": "https://checkout.paystack.com/0peioxfhpn",
            "access_code": "0peioxfhpn",
            "reference": reference
        }
    }))
}

#[tokio::test]
async fn test_initialize_then_confirm() {
    let server = MockServer::start().await;
    let (registry, recorder) = registry(&server);
    let paystack = registry.resolve("paystack").unwrap();

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(header("authorization", "Bearer sk_test_paystack"))
        .and(body_partial_json(json!({"amount": 5000, "currency": "NGN", "email": "a@b.com"})))
        .respond_with(initialize_response("PTK_fromserver"))
        .expect(1)
        .mount(&server)
        .await;

    let session = paystack
        .initialize_session(
            SessionRequest::new("NGN", dec!(50), "a@b.com")
                .with_callback(CallbackHandle::new("record", json!({"order_id": "ord_1"}))),
        )
        .await
        .unwrap();

    assert!(session.session_reference.starts_with("PTK_"));
    assert_eq!(session.expires, TTL_SECS);
    assert_eq!(session.checkout_secret.as_deref(), Some("0peioxfhpn"));
    assert_eq!(session.payment_reference.as_deref(), Some("PTK_fromserver"));

    let checkout = registry
        .context()
        .signer
        .verify_url(&session.checkout_url)
        .unwrap();
    assert_eq!(checkout.provider, "paystack");
    assert_eq!(checkout.reference, session.session_reference);

    Mock::given(method("GET"))
        .and(path(format!("/transaction/verify/{}", session.session_reference)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "amount": 5000,
            "currency": "NGN",
            "customer": {"email": "a@b.com"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transaction = paystack
        .confirm_session(&session.session_reference)
        .await
        .unwrap();

    assert_eq!(transaction.amount, dec!(50));
    assert_eq!(transaction.currency, "NGN");
    assert_eq!(transaction.email, "a@b.com");
    assert!(transaction.is_successful());
    assert_eq!(recorder.calls(), 1);
}

#[tokio::test]
async fn test_repeated_confirm_notifies_once() {
    let server = MockServer::start().await;
    let (registry, recorder) = registry(&server);
    let paystack = registry.resolve("paystack").unwrap();

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(initialize_response("PTK_repeat"))
        .mount(&server)
        .await;

    let session = paystack
        .initialize_session(
            SessionRequest::new("NGN", dec!(50), "a@b.com")
                .with_callback(CallbackHandle::new("record", json!({"order_id": "ord_2"}))),
        )
        .await
        .unwrap();
    let verify_path = format!("/transaction/verify/{}", session.session_reference);

    // First verify fails; the stored callback stays for the retry
    Mock::given(method("GET"))
        .and(path(verify_path.clone()))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "Try again"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(verify_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "amount": 5000,
            "currency": "NGN",
            "customer": {"email": "a@b.com"}
        })))
        .expect(3)
        .mount(&server)
        .await;

    let err = paystack
        .confirm_session(&session.session_reference)
        .await
        .unwrap_err();
    assert_eq!(err.upstream_status(), Some(503));
    assert_eq!(recorder.calls(), 0);

    for _ in 0..3 {
        let transaction = paystack
            .confirm_session(&session.session_reference)
            .await
            .unwrap();
        assert!(transaction.is_successful());
    }
    assert_eq!(recorder.calls(), 1);
}

#[tokio::test]
async fn test_amount_is_scaled_to_kobo() {
    let server = MockServer::start().await;
    let (registry, _) = registry(&server);

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(body_partial_json(json!({"amount": 10000})))
        .respond_with(initialize_response("PTK_x"))
        .expect(1)
        .mount(&server)
        .await;

    let session = registry
        .resolve("paystack")
        .unwrap()
        .initialize_session(SessionRequest::new("NGN", dec!(100), "a@b.com"))
        .await
        .unwrap();

    assert_eq!(session.extra["amount"], json!(10000));
}

#[tokio::test]
async fn test_failed_verification_skips_callback() {
    let server = MockServer::start().await;
    let (registry, recorder) = registry(&server);

    Mock::given(method("GET"))
        .and(path("/transaction/verify/PTK_missing01"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "status": false,
            "message": "Transaction reference not found"
        })))
        .mount(&server)
        .await;

    let err = registry
        .resolve("paystack")
        .unwrap()
        .confirm_transaction(
            "PTK_missing01",
            Some(CallbackHandle::new("record", json!({}))),
        )
        .await
        .unwrap_err();

    match err {
        GatewayError::Verification {
            provider,
            status,
            message,
        } => {
            assert_eq!(provider, "paystack");
            assert_eq!(status, Some(404));
            assert_eq!(message, "Transaction reference not found");
        }
        other => panic!("expected verification error, got {}", other),
    }
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn test_initialize_upstream_error() {
    let server = MockServer::start().await;
    let (registry, _) = registry(&server);

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": false,
            "message": "Invalid key"
        })))
        .mount(&server)
        .await;

    let paystack = registry.resolve("paystack").unwrap();
    let err = paystack
        .initialize_session(SessionRequest::new("NGN", dec!(10), "a@b.com").with_reference("PTK_rejected1"))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Initialization { status: Some(401), .. }));
    assert_eq!(paystack.initialized_session("PTK_rejected1").await, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_initialize_calls_remote_once() {
    let server = MockServer::start().await;
    let (registry, _) = registry(&server);

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(initialize_response("PTK_shared0001").set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let paystack = registry.resolve("paystack").unwrap();
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let paystack = paystack.clone();
            tokio::spawn(async move {
                paystack
                    .initialize_session(
                        SessionRequest::new("NGN", dec!(20), "a@b.com").with_reference("PTK_shared0001"),
                    )
                    .await
            })
        })
        .collect();

    let mut sessions = Vec::new();
    for task in tasks {
        sessions.push(task.await.unwrap().unwrap());
    }

    assert!(sessions.windows(2).all(|pair| pair[0] == pair[1]));
    server.verify().await;
}

#[tokio::test]
async fn test_configured_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(initialize_response("PTK_slow").set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let settings = settings(&server).with_request_timeout(1);
    let transport = ReqwestTransport::new(settings.request_timeout()).unwrap();
    let paystack = PaystackProvider::new(ProviderContext::new(
        settings,
        Arc::new(transport),
        Arc::new(InMemorySessionStore::new()),
    ));

    let err = paystack
        .initialize_session(SessionRequest::new("NGN", dec!(20), "a@b.com"))
        .await
        .unwrap_err();

    match err {
        GatewayError::Initialization { status, message, .. } => {
            assert_eq!(status, None);
            assert!(message.contains("timed out"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
