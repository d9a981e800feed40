//! Reading indicators and TLS material from disk or stdin.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use voidcheck_core::{Indicator, TlsConfig};
use voidcheck_lookup::TransportOptions;

/// Read a JSON array of indicators from `path`, or stdin for `None` / `-`.
pub fn read_indicators(path: Option<&Path>) -> Result<Vec<Indicator>> {
    let raw = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read indicators from {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read indicators from stdin")?;
            buf
        }
    };
    parse_indicators(&raw)
}

pub fn parse_indicators(raw: &str) -> Result<Vec<Indicator>> {
    serde_json::from_str(raw).context("indicators must be a JSON array of {value, kind} objects")
}

/// Attach the CA bundle and client identity named in `tls` to `options`.
///
/// The client certificate and key are concatenated into one PEM identity.
pub fn attach_tls_material(
    mut options: TransportOptions,
    tls: &TlsConfig,
) -> Result<TransportOptions> {
    if let Some(ca_file) = &tls.ca_file {
        let pem = std::fs::read(ca_file)
            .with_context(|| format!("failed to read CA file {}", ca_file.display()))?;
        options = options.with_ca_pem(pem);
    }

    match (&tls.cert_file, &tls.key_file) {
        (Some(cert_file), Some(key_file)) => {
            let mut pem = std::fs::read(cert_file)
                .with_context(|| format!("failed to read cert file {}", cert_file.display()))?;
            if !pem.ends_with(b"\n") {
                pem.push(b'\n');
            }
            pem.extend(
                std::fs::read(key_file)
                    .with_context(|| format!("failed to read key file {}", key_file.display()))?,
            );
            options = options.with_identity_pem(pem);
        }
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!("client certificate and key must both be set, ignoring client identity");
        }
        (None, None) => {}
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voidcheck_core::IndicatorKind;

    #[test]
    fn parses_indicator_array() {
        let indicators = parse_indicators(
            r#"[
                {"value": "185.220.101.1", "kind": "ipv4"},
                {"value": "10.1.1.1", "kind": "ipv4", "is_private": true},
                {"value": "example.com", "kind": "domain"},
                {"value": "44d88612fea8a8f36de82e1278abb02f", "kind": "md5"}
            ]"#,
        )
        .unwrap();

        assert_eq!(indicators.len(), 4);
        assert!(!indicators[0].is_private);
        assert!(indicators[1].is_private);
        assert_eq!(indicators[2].kind, IndicatorKind::Domain);
        assert_eq!(indicators[3].kind, IndicatorKind::Other);
    }

    #[test]
    fn rejects_non_array_input() {
        assert!(parse_indicators(r#"{"value": "example.com"}"#).is_err());
    }

    #[test]
    fn no_tls_files_leaves_options_untouched() {
        let options = TransportOptions::from_config(&Default::default());
        let options = attach_tls_material(options, &TlsConfig::default()).unwrap();
        assert!(options.ca_pem.is_none());
        assert!(options.identity_pem.is_none());
    }

    #[test]
    fn missing_ca_file_is_an_error() {
        let tls = TlsConfig {
            ca_file: Some("/nonexistent/voidcheck-ca.pem".into()),
            ..TlsConfig::default()
        };
        let options = TransportOptions::from_config(&Default::default());
        let err = attach_tls_material(options, &tls).unwrap_err();
        assert!(err.to_string().contains("voidcheck-ca.pem"));
    }
}
