//! Push delivery.
//!
//! [`Transport`] is the only way a notification leaves the process.  The
//! production implementation posts to an [ntfy](https://ntfy.sh/) topic URL:
//! the message is the request body, the banner goes in the `Attach` header
//! and the store page in the `Click` header.

use std::time::Duration;

use crate::error::DispatchError;
use crate::source::Notification;

/// Sink for rendered notifications.
pub trait Transport {
    /// Deliver `notification` to `topic`.  Failures are reported, never
    /// retried here.
    fn publish(&self, topic: &str, notification: &Notification) -> Result<(), DispatchError>;
}

pub struct NtfyTransport {
    client: reqwest::blocking::Client,
}

impl NtfyTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    fn request(
        &self,
        topic: &str,
        notification: &Notification,
    ) -> reqwest::blocking::RequestBuilder {
        let mut request = self
            .client
            .post(topic)
            .body(notification.message.clone().into_bytes());
        if let Some(image_url) = &notification.image_url {
            request = request.header("Attach", image_url);
        }
        if let Some(action_url) = &notification.action_url {
            request = request.header("Click", action_url);
        }
        request
    }
}

impl Transport for NtfyTransport {
    fn publish(&self, topic: &str, notification: &Notification) -> Result<(), DispatchError> {
        let response = self.request(topic, notification).send().map_err(|source| DispatchError::Http {
            topic: topic.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status {
                topic: topic.to_string(),
                status,
            });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::serve_once;

    fn transport() -> NtfyTransport {
        NtfyTransport::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn request_carries_message_and_links() {
        let notification = Notification::new("Hades – 50 % off")
            .with_image(Some("https://cdn.example/hades.jpg".to_string()))
            .with_action(Some("https://store.example/app/1145360".to_string()));

        let request = transport()
            .request("https://ntfy.sh/games", &notification)
            .build()
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://ntfy.sh/games");
        assert_eq!(
            request.body().and_then(|body| body.as_bytes()),
            Some("Hades – 50 % off".as_bytes())
        );
        assert_eq!(request.headers()["Attach"], "https://cdn.example/hades.jpg");
        assert_eq!(request.headers()["Click"], "https://store.example/app/1145360");
    }

    #[test]
    fn absent_links_send_no_headers() {
        let notification = Notification::new("plain");

        let request = transport()
            .request("https://ntfy.sh/games", &notification)
            .build()
            .unwrap();

        assert!(request.headers().get("Attach").is_none());
        assert!(request.headers().get("Click").is_none());
    }

    #[test]
    fn publish_posts_to_topic() {
        let (url, server) = serve_once("200 OK", "{}");
        let notification = Notification::new("hello")
            .with_action(Some("https://store.example/p/x".to_string()));

        transport()
            .publish(&format!("{url}/games"), &notification)
            .unwrap();

        let received = server.join().unwrap();
        assert!(received.starts_with("POST /games "), "{received}");
        let received = received.to_ascii_lowercase();
        assert!(received.contains("click: https://store.example/p/x\r\n"), "{received}");
        assert!(!received.contains("attach:"), "{received}");
        assert!(received.ends_with("\r\n\r\nhello"), "{received}");
    }

    #[test]
    fn error_status_is_rejected() {
        let (url, server) = serve_once("503 Service Unavailable", "");

        let err = transport()
            .publish(&url, &Notification::new("hello"))
            .unwrap_err();
        server.join().unwrap();

        match err {
            DispatchError::Status { topic, status } => {
                assert_eq!(topic, url);
                assert_eq!(status, reqwest::StatusCode::SERVICE_UNAVAILABLE);
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }
}
