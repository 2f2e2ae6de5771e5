//! Preview image extraction from pasted links.
//!
//! Only literal hosts are checked against the private-address blocklist.
//! Hostnames that resolve to private addresses are not caught.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::{Host, Url};

use crate::ExtractError;

/// Desktop browser User-Agent sent when fetching pages.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Page fetch timeout.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

const META_IMAGE_SELECTORS: [&str; 3] = [
    r#"meta[property="og:image"]"#,
    r#"meta[name="twitter:image"]"#,
    r#"meta[property="twitter:image"]"#,
];

/// Trait for retrieving the HTML of a page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the page body.
    async fn fetch(&self, url: &Url) -> Result<String, ExtractError>;
}

/// Fetches pages over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::with_timeout(FETCH_TIMEOUT)
    }
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher that gives up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), timeout)
    }

    /// Creates a fetcher on a preconfigured client.
    pub fn with_client(http_client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }
}

fn transport_error(e: reqwest::Error) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout
    } else {
        ExtractError::Fetch(e.to_string())
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, ExtractError> {
        let response = self
            .http_client
            .get(url.clone())
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "text/html")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::BadStatus {
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport_error)
    }
}

/// Returns the direct image URL from a Google Images result link.
///
/// Recognizes `google.com/imgres?imgurl=...` where `imgurl` is http(s).
pub fn google_images_target(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let is_google = matches!(url.host_str(), Some("google.com" | "www.google.com"));
    if !is_google || !url.path().contains("/imgres") {
        return None;
    }

    url.query_pairs()
        .find(|(key, _)| key == "imgurl")
        .map(|(_, value)| value.into_owned())
        .filter(|value| value.starts_with("http://") || value.starts_with("https://"))
}

fn is_blocked_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.octets()[0] == 0
}

fn is_blocked_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    ip.to_ipv4_mapped().is_some_and(|v4| is_blocked_ipv4(&v4))
}

/// Returns true if the server may fetch this URL.
///
/// Rejects unparsable URLs, `localhost`, and loopback, private, link-local
/// or unspecified IP literals.
pub fn is_url_allowed_for_fetch(link: &str) -> bool {
    let Ok(url) = Url::parse(link) else {
        return false;
    };
    match url.host() {
        Some(Host::Domain(domain)) => !domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => !is_blocked_ipv4(&ip),
        Some(Host::Ipv6(ip)) => !is_blocked_ipv6(&ip),
        None => false,
    }
}

/// Returns the first non-empty preview image declared in the page's meta tags.
///
/// Checks `og:image`, then `twitter:image` by name, then by property.
pub fn extract_meta_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    META_IMAGE_SELECTORS
        .iter()
        .filter_map(|selector| Selector::parse(selector).ok())
        .find_map(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|element| element.value().attr("content"))
                .map(str::trim)
                .filter(|content| !content.is_empty())
                .map(str::to_string)
        })
}

/// Finds an image URL for a pasted link.
#[derive(Clone)]
pub struct LinkImageExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl Default for LinkImageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LinkImageExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkImageExtractor").finish_non_exhaustive()
    }
}

impl LinkImageExtractor {
    /// Creates an extractor that fetches over HTTP.
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(HttpPageFetcher::new()))
    }

    /// Creates an extractor with a custom fetcher.
    pub fn with_fetcher(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Returns the image URL for `link`.
    pub async fn extract(&self, link: &str) -> Result<String, ExtractError> {
        let link = link.trim();
        if link.is_empty() {
            return Err(ExtractError::EmptyLink);
        }
        if !link.starts_with("http://") && !link.starts_with("https://") {
            return Err(ExtractError::UnsupportedScheme);
        }

        if let Some(target) = google_images_target(link) {
            debug!(link, "Using Google Images target");
            return Ok(target);
        }

        if !is_url_allowed_for_fetch(link) {
            warn!(link, "Refusing to fetch disallowed link");
            return Err(ExtractError::NotAllowed);
        }
        let url = Url::parse(link).map_err(|_| ExtractError::NotAllowed)?;

        let html = self.fetcher.fetch(&url).await.inspect_err(|e| {
            debug!(link, error = ?e, "Page fetch failed");
        })?;

        let image = extract_meta_image(&html).map(|candidate| match candidate.strip_prefix("//") {
            Some(rest) => format!("https://{rest}"),
            None => candidate,
        });

        match image {
            Some(image) if image.starts_with("http") => Ok(image),
            _ => Err(ExtractError::NoImageFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    use super::*;

    /// Serves one connection with `response` and reports the request head.
    async fn serve_once(response: &'static str) -> (Url, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (head_tx, head_rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let _ = head_tx.send(String::from_utf8_lossy(&head).to_lowercase());

            if response.is_empty() {
                // Hold the connection open without answering.
                tokio::time::sleep(Duration::from_secs(5)).await;
            } else {
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        let url = Url::parse(&format!("http://{addr}/post")).unwrap();
        (url, head_rx)
    }

    fn loopback_fetcher(timeout: Duration) -> HttpPageFetcher {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpPageFetcher::with_client(client, timeout)
    }

    struct StubFetcher {
        response: Result<String, ExtractError>,
        calls: AtomicUsize,
    }

    impl StubFetcher {
        fn page(html: &str) -> Arc<Self> {
            Arc::new(Self {
                response: Ok(html.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(error: ExtractError) -> Arc<Self> {
            Arc::new(Self {
                response: Err(error),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for StubFetcher {
        async fn fetch(&self, _url: &Url) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone()
        }
    }

    fn page_with_meta(meta: &str) -> String {
        format!("<html><head><title>t</title>{meta}</head><body></body></html>")
    }

    #[test]
    fn test_google_images_target() {
        assert_eq!(
            google_images_target(
                "https://www.google.com/imgres?imgurl=https%3A%2F%2Fcdn.example.com%2Fa.jpg&imgrefurl=x"
            )
            .as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
        assert!(google_images_target("https://www.google.com/imgres?imgurl=ftp://x/a.jpg").is_none());
        assert!(google_images_target("https://www.google.com/search?imgurl=https://x/a.jpg").is_none());
        assert!(google_images_target("https://images.google.com/imgres?imgurl=https://x/a.jpg").is_none());
    }

    #[test]
    fn test_blocked_hosts() {
        for link in [
            "http://localhost:8080/",
            "http://LOCALHOST/",
            "http://127.0.0.1/",
            "http://127.8.9.10/",
            "http://[::1]/",
            "http://[::]/",
            "http://[::ffff:10.0.0.1]/",
            "http://10.1.2.3/",
            "http://172.16.0.1/",
            "http://172.31.255.255/",
            "http://192.168.1.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://0.0.0.0/",
            "not a url",
        ] {
            assert!(!is_url_allowed_for_fetch(link), "{link} should be blocked");
        }
    }

    #[test]
    fn test_allowed_hosts() {
        for link in [
            "https://example.com/page",
            "http://172.32.0.1/",
            "http://8.8.8.8/",
            "https://[2606:4700::1111]/",
        ] {
            assert!(is_url_allowed_for_fetch(link), "{link} should be allowed");
        }
    }

    #[test]
    fn test_meta_image_precedence() {
        let html = page_with_meta(
            r#"<meta property="twitter:image" content="https://c/3.jpg">
               <meta name="twitter:image" content="https://c/2.jpg">
               <meta property="og:image" content="https://c/1.jpg">"#,
        );
        assert_eq!(extract_meta_image(&html).as_deref(), Some("https://c/1.jpg"));

        let html = page_with_meta(
            r#"<meta property="og:image" content="">
               <meta property="twitter:image" content="https://c/3.jpg">"#,
        );
        assert_eq!(extract_meta_image(&html).as_deref(), Some("https://c/3.jpg"));

        assert!(extract_meta_image("<html><body>nothing</body></html>").is_none());
    }

    #[tokio::test]
    async fn test_rejects_bad_input_without_fetching() {
        let fetcher = StubFetcher::page("");
        let extractor = LinkImageExtractor::with_fetcher(fetcher.clone());

        assert_eq!(extractor.extract("   ").await, Err(ExtractError::EmptyLink));
        assert_eq!(
            extractor.extract("ftp://example.com").await,
            Err(ExtractError::UnsupportedScheme)
        );
        assert_eq!(
            extractor.extract("http://192.168.0.10/admin").await,
            Err(ExtractError::NotAllowed)
        );
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_google_images_link_skips_fetch() {
        let fetcher = StubFetcher::page("");
        let extractor = LinkImageExtractor::with_fetcher(fetcher.clone());

        let image = extractor
            .extract("https://google.com/imgres?imgurl=https://cdn.example.com/a.jpg")
            .await
            .unwrap();

        assert_eq!(image, "https://cdn.example.com/a.jpg");
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_extracts_and_normalizes_protocol_relative() {
        let fetcher = StubFetcher::page(&page_with_meta(
            r#"<meta property="og:image" content="//cdn.example.com/lake.jpg">"#,
        ));
        let extractor = LinkImageExtractor::with_fetcher(fetcher.clone());

        let image = extractor.extract(" https://example.com/post ").await.unwrap();

        assert_eq!(image, "https://cdn.example.com/lake.jpg");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_image_found() {
        let extractor = LinkImageExtractor::with_fetcher(StubFetcher::page(&page_with_meta(
            r#"<meta property="og:image" content="/relative.jpg">"#,
        )));
        assert_eq!(
            extractor.extract("https://example.com/").await,
            Err(ExtractError::NoImageFound)
        );

        let extractor = LinkImageExtractor::with_fetcher(StubFetcher::page("<html></html>"));
        assert_eq!(
            extractor.extract("https://example.com/").await,
            Err(ExtractError::NoImageFound)
        );
    }

    #[tokio::test]
    async fn test_fetch_errors_propagate() {
        let extractor =
            LinkImageExtractor::with_fetcher(StubFetcher::failing(ExtractError::Timeout));
        assert_eq!(
            extractor.extract("https://slow.example.com/").await,
            Err(ExtractError::Timeout)
        );

        let extractor = LinkImageExtractor::with_fetcher(StubFetcher::failing(
            ExtractError::BadStatus { status: 404 },
        ));
        let err = extractor.extract("https://example.com/missing").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not fetch the page. Check the link or try a direct image URL."
        );
    }

    #[tokio::test]
    async fn test_http_fetcher_sends_browser_headers() {
        let (url, head) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 13\r\nConnection: close\r\n\r\n<html></html>",
        )
        .await;

        let body = loopback_fetcher(FETCH_TIMEOUT).fetch(&url).await.unwrap();
        assert_eq!(body, "<html></html>");

        let head = head.await.unwrap();
        assert!(head.contains(&format!("user-agent: {}", BROWSER_USER_AGENT.to_lowercase())));
        assert!(head.contains("accept: text/html"));
    }

    #[tokio::test]
    async fn test_http_fetcher_reports_bad_status() {
        let (url, _head) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let err = loopback_fetcher(FETCH_TIMEOUT).fetch(&url).await.unwrap_err();
        assert!(matches!(err, ExtractError::BadStatus { status: 404 }));
    }

    #[tokio::test]
    async fn test_http_fetcher_times_out() {
        let (url, _head) = serve_once("").await;

        let err = loopback_fetcher(Duration::from_millis(200))
            .fetch(&url)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Timeout));
    }
}
