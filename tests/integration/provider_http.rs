//! OpenAI-compatible client against a loopback HTTP stub.

use deckwright::error::ProviderError;
use deckwright::provider::{
    CallFailureKind, ChatMessage, CompletionOptions, ModelProviderClient, OpenAIClient, RawResult,
    RemoteCallAdapter,
};
use deckwright::store::MemoryFallbackSink;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Serve exactly one HTTP response, returning the raw request text.
fn serve_once(status_line: &'static str, body: &'static str) -> (SocketAddr, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).unwrap();
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
            status_line,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request).to_string()
    });

    (addr, handle)
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

fn client_for(addr: SocketAddr) -> OpenAIClient {
    OpenAIClient::new(
        "o4-mini-2025-04-16".to_string(),
        "test-key".to_string(),
        Some(format!("http://{}/v1", addr)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_rate_limit_status_keeps_body() {
    let (addr, server) = serve_once(
        "429 Too Many Requests",
        r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#,
    );
    let client = client_for(addr);

    let result = client
        .complete(vec![ChatMessage::user("hello")], CompletionOptions::default())
        .await;

    match result {
        Err(ProviderError::Status { status, body }) => {
            assert_eq!(status, 429);
            assert!(body.contains("Rate limit reached"));
        }
        other => panic!("expected status error, got {:?}", other.map(|r| r.content)),
    }

    let request = server.join().unwrap().to_lowercase();
    assert!(request.starts_with("post /v1/chat/completions"));
    assert!(request.contains("authorization: bearer test-key"));
}

#[tokio::test]
async fn test_success_envelope_is_parsed() {
    let (addr, server) = serve_once(
        "200 OK",
        r#"{"model":"o4-mini-2025-04-16","choices":[{"message":{"role":"assistant","content":"{\"a\":1}"},"finish_reason":"stop"}]}"#,
    );
    let client = client_for(addr);

    let response = client
        .complete(
            vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
            CompletionOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(response.content, "{\"a\":1}");
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));

    let request = server.join().unwrap();
    assert!(request.contains("\"role\":\"system\""));
    assert!(!request.contains("temperature"));
}

#[tokio::test]
async fn test_garbled_envelope_is_malformed() {
    let (addr, server) = serve_once("200 OK", "<html>gateway</html>");
    let client = client_for(addr);

    let result = client
        .complete(vec![ChatMessage::user("hello")], CompletionOptions::default())
        .await;

    match result {
        Err(ProviderError::MalformedEnvelope { body, .. }) => assert!(body.contains("gateway")),
        other => panic!("expected malformed envelope, got {:?}", other.map(|r| r.content)),
    }
    server.join().unwrap();
}

#[tokio::test]
async fn test_adapter_dumps_rate_limited_body() {
    let (addr, server) = serve_once("429 Too Many Requests", r#"{"error":"slow down"}"#);
    let sink = Arc::new(MemoryFallbackSink::new());
    let adapter = RemoteCallAdapter::new(Arc::new(client_for(addr)), sink.clone(), "system");

    let result = adapter.call("<html/>", "produce slides", "batch1-3_call").await;

    match result {
        RawResult::Failed(failure) => assert_eq!(failure.kind, CallFailureKind::Status(429)),
        other => panic!("expected failure, got {:?}", other),
    }
    let dumps = sink.entries_with_prefix("batch1-3_call");
    assert_eq!(dumps.len(), 1);
    assert!(dumps[0].1.contains("slow down"));
    server.join().unwrap();
}
