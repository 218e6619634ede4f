//! End-to-end tests against a throwaway HTTP server on localhost.
//!
//! Run the live storage test with:
//! JSONBIN_BIN_ID=... JSONBIN_MASTER_KEY=... cargo test --test e2e -- --ignored

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use ticketview::error::{LOAD_FAILED_NOTICE, MISSING_ID_NOTICE};
use ticketview::{
    AssetError, AssetFetcher, Config, HttpAssetFetcher, LoadError, RenderOptions, ViewRequest,
    inline_assets, load_transcript, parse_document, view,
};

struct Reply {
    status: u16,
    content_type: Option<&'static str>,
    body: Vec<u8>,
}

impl Reply {
    fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: Some("application/json"),
            body: body.as_bytes().to_vec(),
        }
    }

    fn bytes(content_type: Option<&'static str>, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type,
            body: body.to_vec(),
        }
    }
}

/// Serve `replies` in order, one per connection. Request heads come back on the channel.
fn serve(replies: Vec<Reply>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for reply in replies {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                head.push_str(&line);
            }
            let _ = tx.send(head);

            let reason = match reply.status {
                200 => "OK",
                401 => "Unauthorized",
                404 => "Not Found",
                _ => "Status",
            };
            let mut response = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
                reply.status,
                reason,
                reply.body.len()
            );
            if let Some(ct) = reply.content_type {
                response.push_str(&format!("Content-Type: {ct}\r\n"));
            }
            response.push_str("\r\n");
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.write_all(&reply.body);
            let _ = stream.flush();
        }
    });

    (format!("http://{addr}"), rx)
}

fn config_for(host: &str, master_key: Option<&str>) -> Config {
    Config {
        storage_host: host.to_string(),
        master_key: master_key.map(str::to_string),
        ..Config::default()
    }
}

const RECORD: &str = r#"{
    "record": {
        "channelName": "ticket-0042",
        "createdAt": "2024-03-01T12:00:00.000Z",
        "closedBy": "moderator",
        "closeReason": "Resolved",
        "messages": [
            {"username": "alice", "timestamp": "2024-03-01T12:01:00.000Z", "content": "my order is missing"},
            {"username": "moderator", "timestamp": "2024-03-01T12:05:00.000Z", "content": "refund issued"}
        ]
    },
    "metadata": {"id": "bin123", "private": true}
}"#;

#[test]
fn view_renders_fetched_transcript() {
    let (host, requests) = serve(vec![Reply::json(200, RECORD)]);
    let request = ViewRequest::from_link("https://tickets.example/view.html?id=bin123&key=link-key");

    let outcome = view(&request, &config_for(&host, Some("config-key")), &RenderOptions::default());
    assert!(outcome.is_success());

    let head = requests.recv().unwrap();
    assert!(head.starts_with("GET /v3/b/bin123/latest HTTP/1.1"), "{head}");
    assert!(head.to_lowercase().contains("x-master-key: link-key"), "{head}");

    let html = &outcome.html;
    assert!(html.contains("<h1 id=\"ticket-name\">ticket-0042</h1>"));
    assert!(html.contains("<dd id=\"message-count\">2</dd>"));
    assert!(html.contains("<dd id=\"closed-by\">moderator</dd>"));
    assert_eq!(html.matches("<div class=\"message\">").count(), 2);
    assert_eq!(html.matches("close-notice").count(), 1);
    assert!(html.find("my order is missing").unwrap() < html.find("refund issued").unwrap());
    assert!(html.find("refund issued").unwrap() < html.find("Reason: Resolved").unwrap());
}

#[test]
fn key_falls_back_to_config() {
    let (host, requests) = serve(vec![Reply::json(200, RECORD)]);
    let request = ViewRequest::from_link("?id=bin123");

    let transcript = load_transcript(&request, &config_for(&host, Some("config-key"))).unwrap();
    assert_eq!(transcript.messages.len(), 2);

    let head = requests.recv().unwrap().to_lowercase();
    assert!(head.contains("x-master-key: config-key"), "{head}");
}

#[test]
fn no_key_anywhere_sends_no_header() {
    let (host, requests) = serve(vec![Reply::json(200, RECORD)]);
    let request = ViewRequest::from_link("?id=bin123");

    load_transcript(&request, &config_for(&host, None)).unwrap();
    let head = requests.recv().unwrap().to_lowercase();
    assert!(!head.contains("x-master-key"), "{head}");
}

#[test]
fn not_found_shows_single_notice() {
    let (host, _requests) = serve(vec![Reply::json(404, r#"{"message":"Bin not found"}"#)]);
    let request = ViewRequest::from_link("?id=missing");

    let outcome = view(&request, &config_for(&host, None), &RenderOptions::default());
    assert!(matches!(outcome.error, Some(LoadError::Status { status: 404 })));

    let html = &outcome.html;
    assert_eq!(html.matches("class=\"error\"").count(), 1);
    assert!(html.contains(LOAD_FAILED_NOTICE));
    assert!(!html.contains("Bin not found"));
    assert!(html.contains("<h1 id=\"ticket-name\"></h1>"));
    assert!(html.contains("<dd id=\"message-count\"></dd>"));
    assert!(!html.contains("class=\"message"));
}

#[test]
fn unauthorized_is_a_load_failure() {
    let (host, _requests) = serve(vec![Reply::json(401, r#"{"message":"Invalid key"}"#)]);
    let err = load_transcript(&ViewRequest::from_link("?id=x&key=bad"), &config_for(&host, None))
        .unwrap_err();
    assert!(matches!(err, LoadError::Status { status: 401 }));
    assert_eq!(err.notice(), LOAD_FAILED_NOTICE);
}

#[test]
fn malformed_body_is_a_load_failure() {
    let (host, _requests) = serve(vec![Reply::json(200, "<html>maintenance</html>")]);
    let outcome = view(
        &ViewRequest::from_link("?id=bin123"),
        &config_for(&host, None),
        &RenderOptions::default(),
    );
    assert!(matches!(outcome.error, Some(LoadError::Decode(_))));
    assert!(outcome.html.contains(LOAD_FAILED_NOTICE));
}

#[test]
fn unreachable_host_is_a_load_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let host = format!("http://127.0.0.1:{port}");
    let err = load_transcript(&ViewRequest::from_link("?id=bin123"), &config_for(&host, None))
        .unwrap_err();
    assert!(matches!(err, LoadError::Transport(_)));
}

#[test]
fn missing_id_never_connects() {
    let (host, requests) = serve(vec![Reply::json(200, RECORD)]);
    let outcome = view(
        &ViewRequest::from_link("https://tickets.example/view.html?key=k"),
        &config_for(&host, None),
        &RenderOptions::default(),
    );
    assert!(matches!(outcome.error, Some(LoadError::MissingIdentifier)));
    assert!(outcome.html.contains(MISSING_ID_NOTICE));
    assert!(requests.try_recv().is_err());
}

#[test]
fn http_fetcher_reads_bytes_and_type() {
    let (host, _requests) = serve(vec![Reply::bytes(Some("image/png"), b"\x89PNG")]);
    let fetcher = HttpAssetFetcher::new(1024);
    let asset = fetcher.fetch(&format!("{host}/a.png")).unwrap();
    assert_eq!(asset.bytes, b"\x89PNG");
    assert_eq!(asset.to_data_url(), "data:image/png;base64,iVBORw==");
}

#[test]
fn http_fetcher_enforces_size_limit() {
    let (host, _requests) = serve(vec![Reply::bytes(Some("image/png"), &[0u8; 64])]);
    let fetcher = HttpAssetFetcher::new(16);
    let err = fetcher.fetch(&format!("{host}/big.png")).unwrap_err();
    assert!(matches!(err, AssetError::TooLarge { limit: 16, .. }));
}

#[test]
fn inliner_over_http_survives_a_dead_asset() {
    let (host, requests) = serve(vec![
        Reply::bytes(Some("image/png"), b"avatar"),
        Reply::json(404, "gone"),
        Reply::bytes(None, b"embed"),
    ]);
    let json = format!(
        r#"{{
            "messages": [{{
                "username": "alice",
                "avatar_url": "{host}/avatar.png",
                "attachments": [{{"name": "shot.jpg", "url": "{host}/shot.jpg"}}],
                "embeds": [{{"image": {{"url": "{host}/embed.webp"}}}}]
            }}]
        }}"#
    );
    let mut transcript = parse_document(&json).unwrap();
    let report = inline_assets(&mut transcript, &HttpAssetFetcher::new(1024));
    assert_eq!(report.inlined, 2);
    assert_eq!(report.failed, 1);

    let paths: Vec<String> = requests
        .try_iter()
        .map(|head| head.split_whitespace().nth(1).unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["/avatar.png", "/shot.jpg", "/embed.webp"]);

    let msg = &transcript.messages[0];
    assert_eq!(msg.avatar_base64.as_deref(), Some("data:image/png;base64,YXZhdGFy"));
    assert_eq!(msg.attachments()[0].base64, None);
    assert_eq!(
        msg.embeds()[0].image_src(),
        Some("data:application/octet-stream;base64,ZW1iZWQ=")
    );

    // The degraded attachment still renders as an external link
    let html = ticketview::display_transcript(&transcript, &RenderOptions::default());
    assert!(html.contains("📎 shot.jpg (external link)"));
}

/// Fetch a real bin from JSONBin
#[test]
#[ignore]
fn live_storage_fetch() {
    let id = std::env::var("JSONBIN_BIN_ID").expect("JSONBIN_BIN_ID not set");
    let config = Config {
        master_key: std::env::var("JSONBIN_MASTER_KEY").ok(),
        ..Config::default()
    };
    let request = ViewRequest::default().with_overrides(Some(id), None);

    let outcome = view(&request, &config, &RenderOptions::local());
    if let Some(err) = &outcome.error {
        panic!("live fetch failed: {err}");
    }
    assert!(outcome.html.contains("id=\"messages\""));
    println!("✓ Live fetch rendered {} bytes", outcome.html.len());
}
