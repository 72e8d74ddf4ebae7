pub mod google;
pub mod indexnow;

/// Outcome of one IndexNow batch request. Success is chunk-granular: the
/// provider acknowledges the whole urlList or none of it.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub urls: Vec<String>,
    pub http_code: i64,
    pub response: String,
    pub success: bool,
}

/// Outcome of one per-URL Google Indexing request.
#[derive(Debug, Clone)]
pub struct UrlResult {
    pub url: String,
    pub http_code: i64,
    pub response: String,
    pub success: bool,
}

pub(crate) const HTTP_TIMEOUT_SECS: u64 = 10;

pub(crate) fn is_success(code: i64) -> bool {
    (200..300).contains(&code)
}
