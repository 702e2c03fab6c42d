//! QR publishers selected by `QR_MODE`.
//!
//! - [`LinkQrPublisher`] renders a URL from a template, no network call.
//! - [`HttpQrPublisher`] uploads the encoded data to an asset service and
//!   returns the hosted image URL.

use crate::config::{QrMode, QrSettings};
use repair_desk_core::{QrError, QrPublisher, TicketNumber};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<String, QrError>> + Send + 'a>>;

/// QR publisher could not be configured.
#[derive(Debug, Error)]
pub enum QrSetupError {
    /// `QR_MODE=http` without `QR_UPLOAD_URL`
    #[error("QR_UPLOAD_URL is required when QR_MODE=http")]
    MissingUploadUrl,

    /// Link template has no placeholder
    #[error("QR_LINK_TEMPLATE must contain {{data}}")]
    MissingPlaceholder,

    /// HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Build the configured publisher, `None` when QR codes are disabled.
///
/// # Errors
///
/// Returns [`QrSetupError`] if the selected mode is missing settings.
pub fn from_settings(settings: &QrSettings) -> Result<Option<Arc<dyn QrPublisher>>, QrSetupError> {
    match settings.mode {
        QrMode::Disabled => Ok(None),
        QrMode::Link => Ok(Some(Arc::new(LinkQrPublisher::new(
            settings.link_template.clone(),
        )?))),
        QrMode::Http => {
            let url = settings
                .upload_url
                .clone()
                .ok_or(QrSetupError::MissingUploadUrl)?;
            let client = reqwest::Client::builder().timeout(settings.timeout).build()?;
            Ok(Some(Arc::new(HttpQrPublisher {
                client,
                url,
                api_key: settings.upload_api_key.clone(),
                folder: settings.folder.clone(),
            })))
        }
    }
}

/// Renders `template` with `{data}` replaced by the URL-encoded check URL.
#[derive(Debug, Clone)]
pub struct LinkQrPublisher {
    template: String,
}

impl LinkQrPublisher {
    /// Create from a template containing `{data}`.
    ///
    /// # Errors
    ///
    /// Returns [`QrSetupError::MissingPlaceholder`] otherwise.
    pub fn new(template: impl Into<String>) -> Result<Self, QrSetupError> {
        let template = template.into();
        if !template.contains("{data}") {
            return Err(QrSetupError::MissingPlaceholder);
        }
        Ok(Self { template })
    }

    /// URL for the given payload.
    #[must_use]
    pub fn render(&self, data: &str) -> String {
        self.template.replace("{data}", &urlencoding::encode(data))
    }
}

impl QrPublisher for LinkQrPublisher {
    fn publish(&self, _ticket_number: &TicketNumber, check_url: &str) -> PublishFuture<'_> {
        let url = self.render(check_url);
        Box::pin(async move { Ok(url) })
    }
}

/// Upload request sent to the asset service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    public_id: String,
    folder: String,
    data: String,
}

/// Accepts either a `secureUrl` or a plain `url`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

/// Uploads `{publicId, folder, data}` to an asset service.
#[derive(Debug, Clone)]
pub struct HttpQrPublisher {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    folder: String,
}

impl HttpQrPublisher {
    /// Create with an explicit client.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        api_key: Option<String>,
        folder: impl Into<String>,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
            folder: folder.into(),
        }
    }
}

impl QrPublisher for HttpQrPublisher {
    fn publish(&self, ticket_number: &TicketNumber, check_url: &str) -> PublishFuture<'_> {
        let body = UploadRequest {
            public_id: ticket_number.to_string(),
            folder: self.folder.clone(),
            data: check_url.to_string(),
        };

        Box::pin(async move {
            let mut request = self.client.post(&self.url).json(&body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            let response = request
                .send()
                .await
                .map_err(|e| QrError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                tracing::warn!(status = status.as_u16(), "QR upload rejected");
                return Err(QrError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            let uploaded: UploadResponse = response
                .json()
                .await
                .map_err(|e| QrError::Transport(e.to_string()))?;
            uploaded
                .secure_url
                .or(uploaded.url)
                .ok_or_else(|| QrError::Transport("Upload response carried no URL".to_string()))
        })
    }
}
