//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with manual redirect following
//! - Retry with exponential backoff on 5xx responses
//! - TLS fallback to an unverified client
//! - Capped body streaming and charset decoding
//! - Error classification

use crate::config::AuditConfig;
use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Method, Response};
use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use url::Url;

/// Maximum redirect hops followed for one page
pub const MAX_REDIRECTS: usize = 5;

/// Bytes inspected when sniffing a `<meta charset>`
const CHARSET_SNIFF_BYTES: usize = 2048;

static META_CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_\-:.]+)"#)
        .expect("charset pattern should be valid")
});

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("SSL error: {0}")]
    Tls(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Redirect error: {0}")]
    Redirect(String),

    #[error("Request failed: {0}")]
    Other(String),
}

/// A successfully received response
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    pub status_code: u16,
    /// Seconds until the final response's headers arrived
    pub ttfb: f64,
    pub content_type: String,
    /// Response headers, lowercase names
    pub headers: BTreeMap<String, String>,
    /// Every URL visited, first to last; empty when there was no redirect
    pub redirect_chain: Vec<String>,
    /// Status of the first redirect hop, 0 when there was none
    pub redirect_type: u16,
    /// Decoded body; empty for non-HTML responses
    pub body: String,
    /// Bytes read, or the declared Content-Length when nothing was read
    pub content_length: usize,
    /// The body hit the size cap and was cut off
    pub truncated: bool,
    /// The page was only reachable with certificate checks disabled
    pub tls_fallback: bool,
}

impl FetchedPage {
    pub fn is_html(&self) -> bool {
        self.content_type.to_lowercase().contains("text/html")
    }
}

/// The set of HTTP clients an audit shares across workers
///
/// Page clients never follow redirects so the chain can be recorded; probe
/// clients follow them because only the final status matters.
#[derive(Debug, Clone)]
pub struct HttpClients {
    pub page: Client,
    pub page_insecure: Client,
    pub probe: Client,
    pub probe_insecure: Client,
    pub page_timeout: Duration,
    pub status_timeout: Duration,
    pub resource_timeout: Duration,
    pub max_retries: usize,
}

/// Builds the HTTP clients for one audit
///
/// # Arguments
///
/// * `config` - The audit configuration (user agent, timeouts, retries)
///
/// # Returns
///
/// * `Ok(HttpClients)` - Successfully built clients
/// * `Err(reqwest::Error)` - Failed to build a client
pub fn build_http_clients(config: &AuditConfig) -> Result<HttpClients, reqwest::Error> {
    let build = |follow: bool, insecure: bool| {
        Client::builder()
            .user_agent(config.crawler.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .redirect(if follow {
                Policy::limited(10)
            } else {
                Policy::none()
            })
            .danger_accept_invalid_certs(insecure)
            .gzip(true)
            .brotli(true)
            .build()
    };

    Ok(HttpClients {
        page: build(false, false)?,
        page_insecure: build(false, true)?,
        probe: build(true, false)?,
        probe_insecure: build(true, true)?,
        page_timeout: Duration::from_secs(config.timeouts.page_secs),
        status_timeout: Duration::from_secs(config.timeouts.status_secs),
        resource_timeout: Duration::from_secs(config.timeouts.resource_secs),
        max_retries: config.crawler.max_retries,
    })
}

/// Backoff between retries of a 5xx response
fn retry_strategy(max_retries: usize) -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(10)
        .factor(70)
        .max_delay(Duration::from_secs(3))
        .take(max_retries)
}

enum AttemptError {
    ServerError(Response),
    Request(reqwest::Error),
}

/// Sends one request, retrying while the server answers 5xx
///
/// The last 5xx response is returned as `Ok` once retries are exhausted;
/// transport errors are never retried here.
pub async fn send_with_retry(
    client: &Client,
    method: Method,
    url: &Url,
    timeout: Duration,
    max_retries: usize,
) -> Result<Response, reqwest::Error> {
    let result = RetryIf::spawn(
        retry_strategy(max_retries),
        || {
            let request = client
                .request(method.clone(), url.clone())
                .timeout(timeout);
            async move {
                match request.send().await {
                    Ok(response) if response.status().is_server_error() => {
                        tracing::debug!("{} answered {}, may retry", url, response.status());
                        Err(AttemptError::ServerError(response))
                    }
                    Ok(response) => Ok(response),
                    Err(e) => Err(AttemptError::Request(e)),
                }
            }
        },
        |e: &AttemptError| matches!(e, AttemptError::ServerError(_)),
    )
    .await;

    match result {
        Ok(response) | Err(AttemptError::ServerError(response)) => Ok(response),
        Err(AttemptError::Request(e)) => Err(e),
    }
}

/// Returns true if the error, or anything in its source chain, is a TLS or
/// certificate failure
pub fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = source {
        let message = e.to_string().to_lowercase();
        if message.contains("certificate") || message.contains("tls") || message.contains("ssl")
        {
            return true;
        }
        source = e.source();
    }
    false
}

/// Maps a transport error onto a fetch fault
pub fn classify_error(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if is_tls_error(err) {
        FetchError::Tls(truncate(&err.to_string(), 200))
    } else if err.is_connect() {
        FetchError::Connect(truncate(&err.to_string(), 200))
    } else if err.is_builder() {
        FetchError::InvalidUrl(truncate(&err.to_string(), 150))
    } else {
        FetchError::Other(truncate(&err.to_string(), 200))
    }
}

/// Fetches a page with redirect, retry and TLS fallback handling
///
/// # Request Flow
///
/// 1. GET with the verifying client, following up to five redirects by hand
/// 2. On a TLS failure, repeat the whole flow once with certificate checks
///    disabled and flag the result
/// 3. For HTML responses, stream the body up to `max-html-bytes` and decode it
///
/// # Arguments
///
/// * `clients` - Shared HTTP clients
/// * `url` - Absolute URL to fetch
/// * `max_bytes` - Body size cap
///
/// # Returns
///
/// The received page, or the fault that prevented fetching it
pub async fn fetch_page(
    clients: &HttpClients,
    url: &str,
    max_bytes: usize,
) -> Result<FetchedPage, FetchError> {
    let start = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    match fetch_with(clients, &clients.page, &start, max_bytes).await {
        Err(FetchError::Tls(reason)) => {
            tracing::warn!("TLS error on {}, retrying unverified: {}", url, reason);
            match fetch_with(clients, &clients.page_insecure, &start, max_bytes).await {
                Ok(mut page) => {
                    page.tls_fallback = true;
                    Ok(page)
                }
                Err(e) => Err(FetchError::Tls(format!("SSL + fallback error: {}", e))),
            }
        }
        other => other,
    }
}

async fn fetch_with(
    clients: &HttpClients,
    client: &Client,
    start: &Url,
    max_bytes: usize,
) -> Result<FetchedPage, FetchError> {
    let mut current = start.clone();
    let mut chain = vec![current.to_string()];
    let mut seen: HashSet<String> = HashSet::from([current.to_string()]);
    let mut redirect_type = 0u16;

    let (response, ttfb) = loop {
        let started = Instant::now();
        let response = send_with_retry(
            client,
            Method::GET,
            &current,
            clients.page_timeout,
            clients.max_retries,
        )
        .await
        .map_err(|e| classify_error(&e))?;
        let ttfb = started.elapsed().as_secs_f64();

        if !response.status().is_redirection() {
            break (response, ttfb);
        }
        let Some(location) = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            break (response, ttfb);
        };

        let next = current
            .join(location)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", location, e)))?;
        if redirect_type == 0 {
            redirect_type = response.status().as_u16();
        }
        if chain.len() > MAX_REDIRECTS {
            return Err(FetchError::Redirect(format!(
                "more than {} redirects from {}",
                MAX_REDIRECTS, start
            )));
        }
        if !seen.insert(next.to_string()) {
            return Err(FetchError::Redirect(format!("redirect loop at {}", next)));
        }
        chain.push(next.to_string());
        current = next;
    };

    let status_code = response.status().as_u16();
    let headers = header_map(response.headers());
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let declared_length = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut page = FetchedPage {
        final_url: current,
        status_code,
        ttfb,
        content_type,
        headers,
        redirect_chain: if chain.len() > 1 { chain } else { Vec::new() },
        redirect_type,
        body: String::new(),
        content_length: declared_length,
        truncated: false,
        tls_fallback: false,
    };

    if !page.is_html() {
        return Ok(page);
    }

    let (bytes, truncated) = read_capped(response, max_bytes).await;
    if !bytes.is_empty() {
        page.content_length = bytes.len();
    }
    page.truncated = truncated;
    page.body = decode_body(&bytes, &page.content_type);
    Ok(page)
}

/// Streams a body chunk by chunk, stopping at `max_bytes`
///
/// Read errors end the stream; whatever arrived so far is kept.
async fn read_capped(mut response: Response, max_bytes: usize) -> (Vec<u8>, bool) {
    let mut bytes = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = max_bytes.saturating_sub(bytes.len());
                if chunk.len() > room {
                    bytes.extend_from_slice(&chunk[..room]);
                    return (bytes, true);
                }
                bytes.extend_from_slice(&chunk);
            }
            Ok(None) => return (bytes, false),
            Err(e) => {
                tracing::debug!("Body read interrupted: {}", e);
                return (bytes, false);
            }
        }
    }
}

/// Decodes an HTML body
///
/// The charset comes from the Content-Type header, else from a
/// `<meta charset>` in the first bytes, else UTF-8. Malformed sequences are
/// replaced rather than rejected.
pub fn decode_body(bytes: &[u8], content_type: &str) -> String {
    let encoding = charset_from_content_type(content_type)
        .or_else(|| sniff_meta_charset(bytes))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Extracts the `charset=` parameter of a Content-Type value
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then(|| value.to_lowercase())
        } else {
            None
        }
    })
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(CHARSET_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head);
    META_CHARSET_RE
        .captures(&head)
        .map(|caps| caps[1].to_lowercase())
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).to_string();
        map.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

/// Cuts a message to at most `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
