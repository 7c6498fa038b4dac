#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Serves a fixed sequence of JWKS responses, repeating the last one once
/// the sequence is exhausted, and counts the requests it receives. The
/// server task dies with the test runtime.
pub async fn serve_sequence(responses: Vec<(u16, String)>) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_task = Arc::clone(&hits);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let idx = hits_task.fetch_add(1, Ordering::SeqCst);
            let (status, body) = responses
                .get(idx)
                .unwrap_or_else(|| responses.last().expect("response"))
                .clone();
            read_request_headers(&mut stream).await;
            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.flush().await;
        }
    });

    (format!("http://{}", addr), hits)
}

pub async fn serve_json(body: String) -> (String, Arc<AtomicUsize>) {
    serve_sequence(vec![(200, body)]).await
}

async fn read_request_headers(stream: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while buf.len() < MAX_HEADER_BYTES {
        let Ok(read) = stream.read(&mut chunk).await else {
            return;
        };
        if read == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..read]);
        if buf.windows(4).any(|window| window == b"\r\n\r\n") {
            return;
        }
    }
}
