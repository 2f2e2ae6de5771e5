//! ImageKit client.
//!
//! Uploads go to the `locations` folder. Display URLs for images hosted on
//! the configured endpoint get a resize transformation inserted.

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{MediaError, MediaResult};

const UPLOAD_API_URL: &str = "https://upload.imagekit.io/api/v1/files/upload";

/// Folder that receives location images.
pub const UPLOAD_FOLDER: &str = "locations";

/// Largest accepted upload in bytes.
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Accepted upload MIME types.
pub const ALLOWED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

const DEFAULT_FILE_NAME: &str = "image.jpg";

/// Checks an upload against the size and type limits.
pub fn check_image(content_type: &str, size: usize) -> MediaResult<()> {
    if size > MAX_IMAGE_SIZE {
        return Err(MediaError::TooLarge { size });
    }
    if !ALLOWED_MIME_TYPES.contains(&content_type) {
        return Err(MediaError::UnsupportedType {
            mime: content_type.to_string(),
        });
    }
    Ok(())
}

/// Normalizes a credential read from the environment.
///
/// Removes all whitespace and one pair of surrounding quotes.
pub fn clean_env(value: &str) -> String {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact
        .strip_prefix(['"', '\''])
        .unwrap_or(&compact);
    compact
        .strip_suffix(['"', '\''])
        .unwrap_or(compact)
        .to_string()
}

/// Replaces characters outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Size of an image on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplaySize {
    /// Detail page, 640px wide.
    #[default]
    Show,
    /// Index card, 400px wide.
    Thumb,
}

impl DisplaySize {
    fn transformation(self) -> &'static str {
        match self {
            Self::Show => "tr:w-640,q-90",
            Self::Thumb => "tr:w-400,q-85",
        }
    }
}

/// Settings for [`ImageKitClient`].
#[derive(Debug, Clone, Default)]
pub struct ImageKitConfig {
    pub private_key: Option<String>,
    pub public_key: Option<String>,
    pub url_endpoint: Option<String>,
    /// Route external image URLs through the ImageKit web proxy.
    pub use_web_proxy: bool,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Debug, Clone)]
struct Credentials {
    private_key: String,
}

/// Client for the ImageKit upload API and URL endpoint.
#[derive(Clone)]
pub struct ImageKitClient {
    credentials: Option<Credentials>,
    url_endpoint: Option<String>,
    use_web_proxy: bool,
    upload_url: String,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for ImageKitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageKitClient")
            .field("configured", &self.is_configured())
            .field("url_endpoint", &self.url_endpoint)
            .field("use_web_proxy", &self.use_web_proxy)
            .finish_non_exhaustive()
    }
}

fn cleaned(value: Option<&String>) -> Option<String> {
    value.map(|v| clean_env(v)).filter(|v| !v.is_empty())
}

impl ImageKitClient {
    /// Creates a client. Uploads require all three credentials.
    pub fn new(config: &ImageKitConfig) -> Self {
        let private_key = cleaned(config.private_key.as_ref());
        let public_key = cleaned(config.public_key.as_ref());
        let url_endpoint =
            cleaned(config.url_endpoint.as_ref()).map(|e| e.trim_end_matches('/').to_string());

        let credentials = match (private_key, public_key, &url_endpoint) {
            (Some(private_key), Some(_), Some(_)) => Some(Credentials { private_key }),
            _ => None,
        };

        Self {
            credentials,
            url_endpoint,
            use_web_proxy: config.use_web_proxy,
            upload_url: UPLOAD_API_URL.to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    /// Overrides the upload endpoint.
    pub fn with_upload_url(mut self, upload_url: impl Into<String>) -> Self {
        self.upload_url = upload_url.into();
        self
    }

    /// Returns true if uploads are possible.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Uploads an image and returns its public URL.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        file_name: Option<&str>,
        content_type: &str,
    ) -> MediaResult<String> {
        let credentials = self.credentials.as_ref().ok_or(MediaError::NotConfigured)?;

        let original = file_name.filter(|n| !n.is_empty()).unwrap_or(DEFAULT_FILE_NAME);
        let unique_name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_file_name(original)
        );
        debug!(file_name = %unique_name, size = bytes.len(), "Uploading image");

        let file = Part::bytes(bytes)
            .file_name(unique_name.clone())
            .mime_str(content_type)?;
        let form = Form::new()
            .part("file", file)
            .text("fileName", unique_name)
            .text("folder", UPLOAD_FOLDER);

        let response = self
            .http_client
            .post(&self.upload_url)
            .basic_auth(&credentials.private_key, Some(""))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(MediaError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(url = %uploaded.url, "Image uploaded");
        Ok(uploaded.url)
    }

    /// Returns the URL to render for an image.
    ///
    /// Images under the configured endpoint are resized. With the web proxy
    /// enabled, other http(s) images are proxied at the show size. Anything
    /// else passes through trimmed.
    pub fn display_url(&self, url: &str, size: DisplaySize) -> String {
        let url = url.trim();
        let Some(endpoint) = &self.url_endpoint else {
            return url.to_string();
        };
        let base = format!("{endpoint}/");
        let transformation = size.transformation();

        if url.contains("ik.imagekit.io") {
            if let Some(path) = url.strip_prefix(&base) {
                return format!("{base}{transformation}/{path}");
            }
        }

        let is_http = url.starts_with("http://") || url.starts_with("https://");
        if size == DisplaySize::Show && is_http && self.use_web_proxy {
            return format!("{base}{transformation}/{}", urlencoding::encode(url));
        }

        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://ik.imagekit.io/buenavista";

    fn client(use_web_proxy: bool) -> ImageKitClient {
        ImageKitClient::new(&ImageKitConfig {
            private_key: Some("private_abc".to_string()),
            public_key: Some("public_abc".to_string()),
            url_endpoint: Some(format!("{ENDPOINT}/")),
            use_web_proxy,
        })
    }

    #[test]
    fn test_clean_env() {
        assert_eq!(clean_env("  \"private_ab c\"\n"), "private_abc");
        assert_eq!(clean_env("'key'"), "key");
        assert_eq!(clean_env("plain"), "plain");
        assert_eq!(clean_env("   "), "");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("my photo (1).JPG"), "my_photo__1_.JPG");
        assert_eq!(sanitize_file_name("a-b_c.png"), "a-b_c.png");
    }

    #[test]
    fn test_check_image() {
        assert!(check_image("image/png", 1024).is_ok());
        assert!(check_image("image/webp", MAX_IMAGE_SIZE).is_ok());
        assert!(matches!(
            check_image("image/png", MAX_IMAGE_SIZE + 1),
            Err(MediaError::TooLarge { .. })
        ));
        assert!(matches!(
            check_image("video/mp4", 1024),
            Err(MediaError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_missing_credentials_are_not_configured() {
        let partial = ImageKitClient::new(&ImageKitConfig {
            private_key: Some("  ".to_string()),
            public_key: Some("public".to_string()),
            url_endpoint: Some(ENDPOINT.to_string()),
            use_web_proxy: false,
        });
        assert!(!partial.is_configured());
        assert!(client(false).is_configured());
    }

    #[tokio::test]
    async fn test_upload_without_credentials_fails() {
        let client = ImageKitClient::new(&ImageKitConfig::default());
        let result = client.upload(vec![1, 2, 3], Some("a.png"), "image/png").await;
        assert!(matches!(result, Err(MediaError::NotConfigured)));
    }

    #[test]
    fn test_display_url_transforms_hosted_images() {
        let client = client(false);
        let hosted = format!("{ENDPOINT}/locations/123-lake.jpg");

        assert_eq!(
            client.display_url(&hosted, DisplaySize::Show),
            format!("{ENDPOINT}/tr:w-640,q-90/locations/123-lake.jpg")
        );
        assert_eq!(
            client.display_url(&format!(" {hosted} "), DisplaySize::Thumb),
            format!("{ENDPOINT}/tr:w-400,q-85/locations/123-lake.jpg")
        );
    }

    #[test]
    fn test_display_url_passes_external_through() {
        let external = "https://images.example.com/lake.jpg";
        assert_eq!(client(false).display_url(external, DisplaySize::Show), external);

        let unconfigured = ImageKitClient::new(&ImageKitConfig::default());
        assert_eq!(
            unconfigured.display_url(&format!("{ENDPOINT}/x.jpg"), DisplaySize::Show),
            format!("{ENDPOINT}/x.jpg")
        );
    }

    #[test]
    fn test_display_url_web_proxy() {
        let client = client(true);
        let external = "https://images.example.com/lake.jpg";

        assert_eq!(
            client.display_url(external, DisplaySize::Show),
            format!("{ENDPOINT}/tr:w-640,q-90/https%3A%2F%2Fimages.example.com%2Flake.jpg")
        );
        assert_eq!(client.display_url(external, DisplaySize::Thumb), external);
        assert_eq!(client.display_url("/relative.jpg", DisplaySize::Show), "/relative.jpg");
    }
}
