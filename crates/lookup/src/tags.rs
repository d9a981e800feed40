//! Fixed flag vocabularies and their human-readable tag labels.

use serde_json::Value;

/// Anonymity flags reported for IP addresses.
pub const ANONYMITY_FLAGS: &[&str] = &[
    "is_proxy",
    "is_webproxy",
    "is_vpn",
    "is_hosting",
    "is_tor",
    "is_residential_proxy",
    "is_relay",
];

/// Site category flags reported for domains.
pub const CATEGORY_FLAGS: &[&str] = &[
    "is_free_hosting",
    "is_anonymizer",
    "is_url_shortener",
    "is_free_dynamic_dns",
    "is_code_sandbox",
    "is_form_builder",
    "is_free_file_sharing",
    "is_pastebin",
];

/// Heuristic security checks reported for domains.
pub const SECURITY_CHECK_FLAGS: &[&str] = &[
    "is_most_abused_tld",
    "is_domain_ipv4_assigned",
    "is_domain_ipv4_private",
    "is_domain_ipv4_loopback",
    "is_domain_ipv4_reserved",
    "is_domain_ipv4_valid",
    "is_domain_blacklisted",
    "is_uncommon_host_length",
    "is_uncommon_dash_char_count",
    "is_uncommon_dot_char_count",
    "is_suspicious_homoglyph",
    "is_possible_typosquatting",
    "is_uncommon_clickable_domain",
    "is_risky_category",
    "is_suspended_site",
    "is_sinkholed_domain",
    "is_parked_domain",
    "is_website_popular",
    "is_risky_geolocation",
];

const ACRONYMS: &[&str] = &["vpn", "tld", "url", "dns", "ip", "ipv4"];

/// `is_free_hosting` → "Free Hosting", `is_vpn` → "VPN", `is_webproxy` → "Web Proxy".
pub fn humanize(flag: &str) -> String {
    let stem = flag.strip_prefix("is_").unwrap_or(flag);
    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            if ACRONYMS.contains(&word) {
                word.to_uppercase()
            } else if word == "webproxy" {
                "Web Proxy".to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Loose truthiness: `true`, non-zero numbers, and non-empty strings.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
        Value::Null => false,
    }
}

/// Labels for every vocabulary flag that is present and truthy in `group`.
pub fn flag_tags(group: Option<&Value>, vocabulary: &[&str]) -> Vec<String> {
    let Some(group) = group else {
        return Vec::new();
    };
    vocabulary
        .iter()
        .filter(|flag| group.get(**flag).is_some_and(is_truthy))
        .map(|flag| humanize(flag))
        .collect()
}
