//! HTTP integrations against a one-shot local server

use awning_estimator::error::EstimatorError;
use awning_estimator::integrations::{HubSpotClient, MapsClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serves one canned response and hands back the raw request text
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });

    (base_url, handle)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

const ROUTE_BODY: &str = r#"{
    "rows": [{"elements": [{
        "distance": {"text": "20.0 mi", "value": 32186.88},
        "duration": {"text": "45 mins", "value": 2700},
        "status": "OK"
    }]}],
    "status": "OK"
}"#;

#[tokio::test]
async fn test_maps_route_from_local_server() {
    let (base_url, server) = serve_once("200 OK", ROUTE_BODY).await;
    let client = MapsClient::new("maps-key".into(), 5).unwrap().with_base_url(base_url);

    let route = client.route("410 Industrial Pkwy", "12 Harbor Rd").await.unwrap();
    assert!((route.miles - 20.0).abs() < 1e-9);
    assert_eq!(route.hours, 0.75);

    let request = server.await.unwrap();
    assert!(request.starts_with("GET /?"));
    assert!(request.contains("key=maps-key"));
    assert!(request.contains("units=imperial"));
}

#[tokio::test]
async fn test_maps_rejected_key_is_auth_error() {
    let (base_url, server) = serve_once("403 Forbidden", r#"{"error_message": "denied"}"#).await;
    let client = MapsClient::new("bad-key".into(), 5).unwrap().with_base_url(base_url);

    let err = client.route("a", "b").await.unwrap_err();
    match err {
        EstimatorError::Api { service, reason } => {
            assert_eq!(service, "Google Maps");
            assert!(reason.contains("authentication failed"), "reason = {}", reason);
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_hubspot_search_from_local_server() {
    let body = r#"{"total": 1, "results": [{"id": "1842", "properties": {"name": "Bayside Marina", "city": "Clearwater"}}]}"#;
    let (base_url, server) = serve_once("200 OK", body).await;
    let client = HubSpotClient::new("hs-token".into(), 5).unwrap().with_base_url(format!("{}/", base_url));

    let records = client.search_companies(" Bayside ").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Bayside Marina");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /crm/v3/objects/companies/search "));
    assert!(request.to_lowercase().contains("authorization: bearer hs-token"));
    assert!(request.contains("CONTAINS_TOKEN"));
    assert!(request.contains(r#""value":"Bayside""#));
}

#[tokio::test]
async fn test_hubspot_unauthorized() {
    let (base_url, server) = serve_once("401 Unauthorized", r#"{"status": "error"}"#).await;
    let client = HubSpotClient::new("expired".into(), 5).unwrap().with_base_url(base_url);

    let err = client.search_companies("Bayside").await.unwrap_err();
    assert!(matches!(err, EstimatorError::Api { ref reason, .. } if reason.contains("HTTP 401")));
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let (base_url, server) = serve_once("500 Internal Server Error", r#"{"message": "upstream down"}"#).await;
    let client = HubSpotClient::new("hs-token".into(), 5).unwrap().with_base_url(base_url);

    let err = client.search_companies("Bayside").await.unwrap_err();
    match err {
        EstimatorError::Api { service, reason } => {
            assert_eq!(service, "HubSpot");
            assert!(reason.contains("500"), "reason = {}", reason);
            assert!(reason.contains("upstream down"), "reason = {}", reason);
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    server.await.unwrap();
}
