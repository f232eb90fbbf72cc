use crate::domain::models::BlockedSite;
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use url::Url;

static NEXT_SITE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_site_id() -> String {
    let sequence = NEXT_SITE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("site-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Reduces user input such as `https://www.Example.com/feed` to `example.com`.
pub fn normalize_site_url(input: &str) -> Result<String, InfraError> {
    let lowered = input.trim().to_lowercase();
    if lowered.is_empty() {
        return Err(InfraError::InvalidConfig("site url must not be empty".to_string()));
    }

    let candidate = if lowered.contains("://") {
        lowered
    } else {
        format!("http://{lowered}")
    };
    let parsed = Url::parse(&candidate).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid site url '{}': {error}", input.trim()))
    })?;
    let host = parsed
        .host_str()
        .map(|host| host.trim_end_matches('.'))
        .map(|host| host.strip_prefix("www.").unwrap_or(host))
        .filter(|host| !host.is_empty())
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("site url '{}' has no hostname", input.trim()))
        })?;
    Ok(host.to_string())
}

/// Returns the list with `input` appended and the entry for it. Duplicates resolve to
/// the existing entry and leave the list untouched.
pub fn with_site_added(
    sites: &[BlockedSite],
    input: &str,
) -> Result<(Vec<BlockedSite>, BlockedSite), InfraError> {
    let url = normalize_site_url(input)?;
    if let Some(existing) = sites.iter().find(|site| site.url == url) {
        return Ok((sites.to_vec(), existing.clone()));
    }

    let site = BlockedSite {
        id: next_site_id(),
        url,
        favicon: None,
    };
    let mut updated = sites.to_vec();
    updated.push(site.clone());
    Ok((updated, site))
}

pub fn with_site_removed(sites: &[BlockedSite], site_id: &str) -> Option<Vec<BlockedSite>> {
    let site_id = site_id.trim();
    if !sites.iter().any(|site| site.id == site_id) {
        return None;
    }
    Some(
        sites
            .iter()
            .filter(|site| site.id != site_id)
            .cloned()
            .collect(),
    )
}
