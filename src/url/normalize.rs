use url::Url;

/// Normalizes a URL so that equivalent spellings share one key
///
/// # Normalization Steps
///
/// 1. Parse the URL; unparseable input is returned unchanged
/// 2. Lowercase the scheme and host (done by the parser), drop default ports
/// 3. Remove trailing slashes from the path, keeping the root `/`
/// 4. Remove the fragment
/// 5. Sort query pairs by key, keeping blank values and the original
///    order of repeated keys
/// 6. Remove an empty query string
///
/// Unlike a crawler that merges hosts, `www.` and tracking parameters are
/// kept: they are exactly what an audit wants to report on.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize
///
/// # Returns
///
/// The normalized URL as a string. Calling this on its own output returns
/// the same string.
///
/// # Examples
///
/// ```
/// use site_audit::url::normalize_url;
///
/// assert_eq!(
///     normalize_url("HTTPS://Example.COM/Page/?b=2&a=1#top"),
///     "https://example.com/Page?a=1&b=2"
/// );
/// ```
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => normalize_parsed(url),
        Err(_) => raw.to_string(),
    }
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(mut url: Url) -> String {
    url.set_fragment(None);

    if !url.cannot_be_a_base() {
        let trimmed = url.path().trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            url.set_path("/");
        } else {
            url.set_path(&trimmed);
        }
    }

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if params.is_empty() {
            url.set_query(None);
        } else {
            // sort_by is stable, so repeated keys keep their relative order
            params.sort_by(|a, b| a.0.cmp(&b.0));
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    url.to_string()
}

/// Resolves a link found on a page against the page URL
///
/// Returns `None` for hrefs that do not resolve to an http(s) URL.
pub fn resolve_url(base: &Url, href: &str) -> Option<Url> {
    let resolved = base.join(href.trim()).ok()?;
    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Key used to compare a page with its canonical target
///
/// Scheme, host without `www.` and path without trailing slash. Query and
/// fragment are ignored.
pub fn canonical_compare_key(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(url) => {
            let host = url.host_str().unwrap_or_default();
            let host = host.strip_prefix("www.").unwrap_or(host);
            let path = url.path().trim_end_matches('/');
            format!("{}://{}{}", url.scheme(), host, path)
        }
        Err(_) => raw.trim_end_matches('/').to_lowercase(),
    }
}
