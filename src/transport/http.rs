//! reqwest-backed implementation of the transport boundary.

use async_trait::async_trait;

use super::{
    Method, TransportBody, TransportClient, TransportError, TransportRequest, TransportResponse,
};

/// Production transport: reqwest client against a configured base URL.
///
/// Authentication headers are applied per-client at construction (the token
/// comes from the session layer, which owns refresh; this client only
/// attaches it).
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| TransportError::ConnectionLost(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Build with a bearer token attached to every request.
    pub fn with_bearer_token(
        base_url: impl Into<String>,
        token: &str,
    ) -> Result<Self, TransportError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| TransportError::InvalidBody(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::ConnectionLost(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn classify(request: &TransportRequest, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            return TransportError::TimedOut(request.timeout);
        }
        if error.is_connect() {
            // reqwest folds DNS failures into connect errors; inspect the chain.
            let text = format!("{error:?}");
            if text.contains("dns") {
                return TransportError::Dns(error.to_string());
            }
            return TransportError::NotConnected;
        }
        TransportError::ConnectionLost(error.to_string())
    }

    /// Pull a human-readable message out of an error body.
    /// Backends answer `{"message": "..."}`; fall back to raw text.
    fn error_message(body: &[u8]) -> String {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            message: String,
        }
        if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
            return parsed.message;
        }
        String::from_utf8_lossy(body).trim().to_string()
    }
}

#[async_trait]
impl TransportClient for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);

        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        let builder = builder.timeout(request.timeout);

        let builder = match &request.body {
            TransportBody::Empty => builder,
            TransportBody::Json(value) => builder.json(value),
            TransportBody::Multipart {
                file_name,
                mime_type,
                bytes,
                metadata,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(|e| TransportError::InvalidBody(e.to_string()))?;
                let mut form = reqwest::multipart::Form::new().part("file", part);
                if let Some(meta) = metadata {
                    form = form.text("metadata", meta.to_string());
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify(&request, e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::ConnectionLost(e.to_string()))?
            .to_vec();

        if !(200..300).contains(&status) {
            return Err(TransportError::from_status(status, Self::error_message(&body)));
        }

        Ok(TransportResponse { status, body })
    }
}
