//! User-Agent string for upstream API traffic.

/// Project URL for User-Agent identification (good citizenship; RFC 9308).
const PROJECT_UA_URL: &str = "https://github.com/fierce/scholar";

/// User-Agent sent with every provider request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("scholar/{version} (research-tool; +{PROJECT_UA_URL})")
}
