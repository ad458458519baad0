/*!
Pinning backend on the wire: request shape, authentication, signature and CID resolution
*/

use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use spl_token_launcher::metadata::{HttpMetadataStorage, MetadataDescriptor, MetadataStorage};

const GATEWAY: &str = "https://gateway.pinata.cloud/ipfs/";

struct CapturedRequest {
    head: String,
    body: Vec<u8>,
}

impl CapturedRequest {
    fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim().to_string())
        })
    }

    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Accept one HTTP/1.1 request on a local port, answer with `status` and `reply`.
async fn serve_once(status: &'static str, reply: &'static str) -> (String, JoinHandle<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.trim()
                    .eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().unwrap())
            })
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body was complete");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = buf[header_end..header_end + content_length].to_vec();

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            reply.len(),
            reply
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        CapturedRequest { head, body }
    });

    (format!("http://{}/pinning/pinJSONToIPFS", addr), handle)
}

fn descriptor() -> MetadataDescriptor {
    MetadataDescriptor {
        name: "Launch Token".to_string(),
        symbol: "LNCH".to_string(),
        description: "Community token".to_string(),
        image: "https://gateway.pinata.cloud/ipfs/bafkreiimage".to_string(),
    }
}

fn storage(pin_url: String, group_id: Option<&str>) -> HttpMetadataStorage {
    HttpMetadataStorage::new(
        pin_url,
        GATEWAY,
        Some("test-jwt".to_string()),
        group_id.map(str::to_string),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn pins_signed_descriptor_and_resolves_cid() {
    let (pin_url, server) = serve_once(
        "200 OK",
        r#"{"IpfsHash":"bafkreipinned","PinSize":187,"Timestamp":"2026-10-17T09:00:00.000Z"}"#,
    )
    .await;
    let authority = Keypair::new();

    let uri = storage(pin_url, Some("launch-group"))
        .upload(&descriptor(), &authority)
        .await
        .unwrap();
    assert_eq!(uri, "https://gateway.pinata.cloud/ipfs/bafkreipinned");

    let request = server.await.unwrap();
    assert!(request.request_line().starts_with("POST /pinning/pinJSONToIPFS "));
    assert_eq!(request.header("authorization").as_deref(), Some("Bearer test-jwt"));
    assert!(request.header("content-type").unwrap().starts_with("application/json"));

    let body = request.json();
    let pinned: MetadataDescriptor = serde_json::from_value(body["pinataContent"].clone()).unwrap();
    assert_eq!(pinned, descriptor());
    assert_eq!(body["pinataOptions"]["cidVersion"], 1);
    assert_eq!(body["pinataOptions"]["groupId"], "launch-group");

    let keyvalues = &body["pinataMetadata"]["keyvalues"];
    assert_eq!(keyvalues["authority"], authority.pubkey().to_string());
    let signature = Signature::from_str(keyvalues["signature"].as_str().unwrap()).unwrap();
    let signed_bytes = serde_json::to_vec(&pinned).unwrap();
    assert!(signature.verify(authority.pubkey().as_ref(), &signed_bytes));
}

#[tokio::test]
async fn rejected_pin_reports_provider_reason() {
    let (pin_url, server) = serve_once(
        "401 Unauthorized",
        r#"{"error":{"reason":"INVALID_CREDENTIALS","details":"Invalid authentication"}}"#,
    )
    .await;

    let err = storage(pin_url, None)
        .upload(&descriptor(), &Keypair::new())
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("401"));
    assert!(message.contains("INVALID_CREDENTIALS"));

    let request = server.await.unwrap();
    assert!(request.json()["pinataOptions"].get("groupId").is_none());
}

#[tokio::test]
async fn response_without_hash_is_an_error() {
    let (pin_url, server) = serve_once("200 OK", r#"{"PinSize":187}"#).await;

    let result = storage(pin_url, None).upload(&descriptor(), &Keypair::new()).await;
    assert!(result.is_err());
    server.await.unwrap();
}
