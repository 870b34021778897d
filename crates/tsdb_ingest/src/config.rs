use serde::Deserialize;

use crate::error::ErrorDetailSink;

const HOST_TAG: &str = "host";

/// Read-only settings for [`crate::PutLineDecoder`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Host used when a line carries no host-tag key.
    pub default_host: String,
    /// Alternate tag keys, in priority order, that populate the host when `host` is absent.
    pub host_tag_names: Vec<String>,
}

impl DecoderConfig {
    pub fn new<I, S>(default_host: impl Into<String>, host_tag_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for name in host_tag_names {
            let name = name.into();
            if name.is_empty() || name == HOST_TAG || names.contains(&name) {
                continue;
            }
            names.push(name);
        }
        Self {
            default_host: default_host.into(),
            host_tag_names: names,
        }
    }

    pub fn is_host_tag(&self, key: &str) -> bool {
        key == HOST_TAG || self.host_tag_names.iter().any(|name| name == key)
    }

    /// Host-tag keys in precedence order: `host` first, then the configured alternates.
    pub(crate) fn host_tag_precedence(&self) -> impl Iterator<Item = &str> {
        std::iter::once(HOST_TAG).chain(self.host_tag_names.iter().map(String::as_str))
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            default_host: "localhost".to_string(),
            host_tag_names: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum CaptureRaw {
    #[default]
    None,
    Line,
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ErrorDetailCapture {
    #[default]
    RedactedSummaryOnly,
    FullDetails,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct IngestLimits {
    pub max_line_bytes: usize,
    /// Total bytes of raw lines that may be captured over the ingestor's lifetime.
    pub max_raw_bytes_total: Option<usize>,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_line_bytes: 64 * 1024,
            max_raw_bytes_total: None,
        }
    }
}

pub struct IngestConfig {
    pub limits: IngestLimits,
    pub capture_raw: CaptureRaw,
    pub error_detail_capture: ErrorDetailCapture,
    pub error_sink: Option<Box<dyn ErrorDetailSink>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            limits: IngestLimits::default(),
            capture_raw: CaptureRaw::None,
            error_detail_capture: ErrorDetailCapture::RedactedSummaryOnly,
            error_sink: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_dedupes_alternates_and_drops_literal_host() {
        let config = DecoderConfig::new("localhost", ["fqdn", "host", "fqdn", "", "hostname"]);
        assert_eq!(config.host_tag_names, vec!["fqdn", "hostname"]);
        assert!(config.is_host_tag("host"));
        assert!(config.is_host_tag("hostname"));
        assert!(!config.is_host_tag("region"));
    }

    #[test]
    fn precedence_starts_with_host() {
        let config = DecoderConfig::new("localhost", ["fqdn", "hostname"]);
        let order: Vec<&str> = config.host_tag_precedence().collect();
        assert_eq!(order, ["host", "fqdn", "hostname"]);
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let config: DecoderConfig = toml::from_str(r#"host_tag_names = ["fqdn"]"#).unwrap();
        assert_eq!(config.default_host, "localhost");
        assert_eq!(config.host_tag_names, vec!["fqdn"]);

        let config: DecoderConfig = toml::from_str("").unwrap();
        assert_eq!(config, DecoderConfig::default());
    }
}
