//! Stable content hashing shared by job identity and deduplication.

use md5::{Digest, Md5};

/// Hex-encoded MD5 digest of the pipe-joined parts.
///
/// Used both for `JobRecord::content_hash` (title|company|location|description
/// prefix) and for deriving a canonical `job_id` from platform+url, so the
/// two identities are computed the same way throughout the crate.
pub fn md5_join(parts: &[&str]) -> String {
    let mut hasher = Md5::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"|");
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// `content_hash`: md5 over `title|company|location|description[:500]`.
pub fn content_hash(title: &str, company: &str, location: &str, description: &str) -> String {
    let prefix: String = description.chars().take(500).collect();
    md5_join(&[title, company, location, &prefix])
}

/// Canonical `job_id` derived from platform + URL.
pub fn job_id(platform: &str, url: &str) -> String {
    md5_join(&[platform, url])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_stable() {
        let a = content_hash("Eng", "Acme", "Sydney", "Build things");
        let b = content_hash("Eng", "Acme", "Sydney", "Build things");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_truncates_description() {
        let long = "x".repeat(1000);
        let short = "x".repeat(500);
        let a = content_hash("t", "c", "l", &long);
        let b = content_hash("t", "c", "l", &short);
        assert_eq!(a, b);
    }

    #[test]
    fn job_id_depends_on_platform_and_url() {
        let a = job_id("indeed", "https://indeed.com/job/1");
        let b = job_id("linkedin", "https://indeed.com/job/1");
        assert_ne!(a, b);
    }
}
