//! Product image URL normalization.
//!
//! Pure string work: object keys become public storage URLs, and URLs served by
//! the platform get its on-the-fly transformation parameters. No network calls.

use url::Url;

/// Shown when a product has no image.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/800x800?text=Sin+imagen";

/// Bucket path segment bare object keys are resolved under.
pub const DEFAULT_BUCKET: &str = "productos";

/// Target width when the caller does not ask for one.
pub const DEFAULT_WIDTH: u32 = 800;

/// Fixed compression quality requested from the transformer.
pub const IMAGE_QUALITY: u32 = 80;

/// Output format forced on transformed images.
pub const IMAGE_FORMAT: &str = "webp";

const PUBLIC_OBJECT_PATH: &str = "/storage/v1/object/public/";
const PLATFORM_DOMAIN: &str = "supabase.co";

/// optimize_image_url
///
/// Resolves `src` (an object key or a full URL) into the URL the storefront
/// should render, sized to `width` pixels (default [`DEFAULT_WIDTH`]).
///
/// Applying the function to its own output with the same width returns the
/// same string.
pub fn optimize_image_url(endpoint: &str, src: Option<&str>, width: Option<u32>) -> String {
    let src = match src.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return PLACEHOLDER_IMAGE_URL.to_string(),
    };
    let width = width.unwrap_or(DEFAULT_WIDTH);
    let endpoint = endpoint.trim_end_matches('/');

    let absolute = if has_scheme(src) {
        src.to_string()
    } else {
        public_object_url(endpoint, src)
    };

    let Ok(mut url) = Url::parse(&absolute) else {
        return absolute;
    };

    if !is_platform_host(&url, endpoint) {
        return absolute;
    }

    url.set_query(None);
    url.query_pairs_mut()
        .append_pair("width", &width.to_string())
        .append_pair("quality", &IMAGE_QUALITY.to_string())
        .append_pair("format", IMAGE_FORMAT);

    url.into()
}

/// public_object_url
///
/// Expands an object key into its public storage URL, qualifying it with
/// [`DEFAULT_BUCKET`] unless the key already starts with it.
pub fn public_object_url(endpoint: &str, key: &str) -> String {
    let key = key.trim_start_matches('/');
    let bucket_prefix = format!("{DEFAULT_BUCKET}/");
    let path = if key.starts_with(&bucket_prefix) {
        key.to_string()
    } else {
        format!("{bucket_prefix}{key}")
    };
    format!("{}{}{}", endpoint.trim_end_matches('/'), PUBLIC_OBJECT_PATH, path)
}

fn has_scheme(src: &str) -> bool {
    let lower = src.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

// Hosted projects live under the platform domain; self-hosted or local stacks
// are recognised by matching the configured endpoint's host.
fn is_platform_host(url: &Url, endpoint: &str) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    if host == PLATFORM_DOMAIN || host.ends_with(&format!(".{PLATFORM_DOMAIN}")) {
        return true;
    }

    Url::parse(endpoint)
        .ok()
        .and_then(|endpoint| endpoint.host_str().map(|h| h.eq_ignore_ascii_case(host)))
        .unwrap_or(false)
}
