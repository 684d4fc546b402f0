//! Slack Webhook 客户端模块
//!
//! 每次发送一个 POST，带超时，不重试，不保留空闲连接。
//! 失败以 `DeliveryError` 返回，由调用方记录日志。

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::formatter::truncate_chars;
use super::payload::WebhookPayload;

/// 错误响应体在错误信息中保留的最大字符数
const MAX_ERROR_BODY_CHARS: usize = 200;

/// 投递错误
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

impl DeliveryError {
    /// HTTP 状态码（仅 `Status` 变体）
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Webhook 发送端
pub trait WebhookSender: Send + Sync {
    /// 发送端名称（用于日志）
    fn name(&self) -> &str;

    /// 向 endpoint 发送 payload
    fn send(&self, endpoint: &str, payload: &WebhookPayload) -> Result<(), DeliveryError>;
}

/// 基于 reqwest 的 HTTP 发送端
pub struct HttpWebhookSender {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpWebhookSender {
    /// 创建发送端
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| DeliveryError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl WebhookSender for HttpWebhookSender {
    fn name(&self) -> &str {
        "http"
    }

    fn send(&self, endpoint: &str, payload: &WebhookPayload) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)?;
        let redacted = redact_endpoint(endpoint);

        debug!(
            endpoint = %redacted,
            bytes = body.len(),
            timeout_ms = self.timeout.as_millis() as u64,
            "Posting webhook payload"
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .map_err(|source| DeliveryError::Transport {
                endpoint: redacted.clone(),
                source,
            })?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Webhook request completed"
        );

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DeliveryError::Status {
                endpoint: redacted,
                status: status.as_u16(),
                body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }

        Ok(())
    }
}

/// Dry-run 发送端：只打印 payload
#[derive(Debug, Default)]
pub struct DryRunSender;

impl WebhookSender for DryRunSender {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn send(&self, endpoint: &str, payload: &WebhookPayload) -> Result<(), DeliveryError> {
        let json = serde_json::to_string_pretty(payload)?;
        eprintln!("[DRY-RUN] Would POST to {}:", redact_endpoint(endpoint));
        eprintln!("{}", json);
        Ok(())
    }
}

/// 隐藏 webhook 地址中的密钥路径，只保留 scheme 和 host
pub fn redact_endpoint(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }

    match reqwest::Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}://{}:{}/***", parsed.scheme(), host, port),
            (Some(host), None) => format!("{}://{}/***", parsed.scheme(), host),
            (None, _) => "***".to_string(),
        },
        Err(_) => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::payload::Attachment;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn payload() -> WebhookPayload {
        WebhookPayload {
            attachments: vec![Attachment {
                title: Some("Printer issue".to_string()),
                color: Some("good".to_string()),
                ..Default::default()
            }],
        }
    }

    /// 启动只应答一次的本地 HTTP 服务，返回 (地址, 收到的请求)
    fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
                    let len = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= pos + 4 + len {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{}/services/T000/B000/SECRET", addr), handle)
    }

    #[test]
    fn test_send_success_posts_json() {
        let (url, server) = serve_once("200 OK", "ok");
        let sender = HttpWebhookSender::new(Duration::from_secs(5)).unwrap();

        sender.send(&url, &payload()).unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("POST /services/T000/B000/SECRET"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.contains(r#""title":"Printer issue""#));
    }

    #[test]
    fn test_non_2xx_is_status_error() {
        let (url, server) = serve_once("500 Internal Server Error", "invalid_payload");
        let sender = HttpWebhookSender::new(Duration::from_secs(5)).unwrap();

        let err = sender.send(&url, &payload()).unwrap_err();
        server.join().unwrap();

        match err {
            DeliveryError::Status { endpoint, status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "invalid_payload");
                assert!(!endpoint.contains("SECRET"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        // 绑定后立即释放，得到一个无人监听的端口
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let sender = HttpWebhookSender::new(Duration::from_secs(2)).unwrap();

        let err = sender
            .send(&format!("http://127.0.0.1:{}/hook", port), &payload())
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport { .. }), "{:?}", err);
    }

    #[test]
    fn test_dry_run_sender_never_fails() {
        assert!(DryRunSender.send("https://hooks.slack.com/services/X", &payload()).is_ok());
        assert_eq!(DryRunSender.name(), "dry-run");
    }

    #[test]
    fn test_redact_endpoint() {
        assert_eq!(
            redact_endpoint("https://hooks.slack.com/services/T000/B000/XXXX"),
            "https://hooks.slack.com/***"
        );
        assert_eq!(redact_endpoint("http://127.0.0.1:8080/hook"), "http://127.0.0.1:8080/***");
        assert_eq!(redact_endpoint("not a url"), "***");
        assert_eq!(redact_endpoint("  "), "");
    }
}
