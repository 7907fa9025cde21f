use url::Url;

/// Query keys that only track the visitor and never change the resource.
const TRACKING_KEYS: &[&str] = &[
    "fbclid", "gclid", "dclid", "msclkid", "mc_cid", "mc_eid", "igshid", "ref", "ref_src",
    "source",
];

fn is_tracking_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm") || TRACKING_KEYS.contains(&key.as_str())
}

/// Normalize a link for duplicate matching.
///
/// Drops scheme, `www.`, fragment, tracking parameters and trailing slash;
/// lower-cases the host and sorts the surviving query parameters. Links that
/// do not parse are compared as trimmed lower-case strings.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let parsed = match Url::parse(trimmed) {
        Ok(u) if u.host_str().is_some() => u,
        _ => return fallback(trimmed),
    };

    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut out = String::with_capacity(trimmed.len());
    out.push_str(host);
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(parsed.path().trim_end_matches('/'));

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_tracking_key(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !params.is_empty() {
        params.sort();
        out.push('?');
        let joined: Vec<String> = params
            .into_iter()
            .map(|(k, v)| if v.is_empty() { k } else { format!("{k}={v}") })
            .collect();
        out.push_str(&joined.join("&"));
    }
    out
}

fn fallback(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let no_fragment = lower.split('#').next().unwrap_or_default();
    no_fragment.trim_end_matches('/').to_string()
}
