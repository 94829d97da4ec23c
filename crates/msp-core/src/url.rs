//! URL utilities for host hashing
//!
//! These functions avoid a full URL parser; they only need to find the host
//! and bring it into the canonical form the remote service hashes.

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();
    let colon_pos = bytes.iter().position(|&b| b == b':')?;

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

/// Byte range of the host, excluding userinfo and port. An IPv6 host keeps
/// its brackets.
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for (i, &b) in bytes.iter().enumerate().skip(scheme_end) {
        if b == b'@' {
            host_start = i + 1;
            break;
        }
        if b == b'/' || b == b'?' || b == b'#' {
            break;
        }
    }

    // Bracketed IPv6 literal; its colons are not a port separator.
    if bytes.get(host_start) == Some(&b'[') {
        let close = bytes[host_start..].iter().position(|&b| b == b']')?;
        return Some((host_start, host_start + close + 1));
    }

    let mut host_end = bytes.len();
    for (i, &b) in bytes.iter().enumerate().skip(host_start) {
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Host slice of `url`, without allocation.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    if host_start == host_end {
        return None;
    }
    Some(&url[host_start..host_end])
}

/// Canonical host of `url`: lowercased, trailing dot and leading `www.`
/// removed. `None` if the URL has no host.
pub fn canonical_host(url: &str) -> Option<String> {
    let host = extract_host(url)?.trim_end_matches('.');
    let host = host.to_ascii_lowercase();
    let host = match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    };
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

// =============================================================================
// Host Walking
// =============================================================================

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator from the full host down to its last two labels.
///
/// `a.b.example.com` yields `a.b.example.com`, `b.example.com`,
/// `example.com`. A single-label host or an IPv6 literal yields itself.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = if result.starts_with('[') {
            None
        } else {
            get_parent_domain(result).filter(|parent| parent.contains('.'))
        };
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter {
        current: if host.is_empty() { None } else { Some(host) },
    }
}
