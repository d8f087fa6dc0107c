//! Browser identity shared by both rendering strategies.
//!
//! Many retail sites serve degraded or bot-challenge markup to default
//! automation identities, so both renderers present the same realistic
//! desktop profile.

/// Desktop Chrome on Windows; the least-challenged identity in practice.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Locale matching the target market.
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Navigation responses shorter than this are treated as a failed load
/// (challenge pages and empty shells, not real product markup).
pub const MIN_DOCUMENT_BYTES: usize = 512;
