//! HttpSink against a mock history service.

use std::time::Duration;

use pricewatch::sink::ResultSink;
use pricewatch::{ExtractedProduct, HttpSink, ResultBatch};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn batch() -> ResultBatch {
    ResultBatch {
        data: vec![
            ExtractedProduct {
                name: Some("GTA 5 Xbox 360".into()),
                url: Some("https://amazon.ca/GTA-5/dp/B00KWFCV32".into()),
                image: Some("https://m.media-amazon.com/images/I/gta.jpg".into()),
                price: Some(19.99),
            },
        ],
        search_text: "GTA 5".into(),
        source: "https://amazon.ca".into(),
    }
}

#[tokio::test]
async fn test_batch_is_posted_as_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/results"))
        .and(body_json(json!({
            "data": [{
                "name": "GTA 5 Xbox 360",
                "url": "https://amazon.ca/GTA-5/dp/B00KWFCV32",
                "img": "https://m.media-amazon.com/images/I/gta.jpg",
                "price": 19.99
            }],
            "search_text": "GTA 5",
            "source": "https://amazon.ca"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": "Received data successfully"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let sink = HttpSink::new(server.uri(), Duration::from_secs(5));
    sink.deliver("/results", &batch()).await.unwrap();
}

#[tokio::test]
async fn test_non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/results"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is locked"))
        .mount(&server)
        .await;

    let sink = HttpSink::new(server.uri(), Duration::from_secs(5));
    let err = sink.deliver("/results", &batch()).await.unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("500"));
    assert!(msg.contains("database is locked"));
}
