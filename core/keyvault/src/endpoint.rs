//! Vault and key endpoint URLs.
//!
//! Both URL forms share one host grammar; only the path differs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Key Vault DNS suffixes of the public and sovereign clouds.
pub const DEFAULT_DNS_SUFFIXES: [&str; 4] = [
    "vault.azure.net",
    "vault.azure.cn",
    "vault.usgovcloudapi.net",
    "vault.microsoftazure.de",
];

static ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^https://(?P<vault>[a-z0-9-]+)\.(?P<suffix>[a-z0-9-]+(?:\.[a-z0-9-]+)*)(?::(?P<port>443))?(?P<path>/.*)?$",
    )
    .expect("endpoint pattern is valid")
});

static KEY_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^/keys/(?P<key>[a-z0-9-]+)/(?P<version>[a-z0-9]+)/?$")
        .expect("key path pattern is valid")
});

/// Host and path pieces common to vault and key URLs.
struct Endpoint<'a> {
    vault: &'a str,
    suffix: &'a str,
    port: Option<u16>,
    path: &'a str,
}

fn split_endpoint<'a>(raw: &'a str, suffixes: &[String]) -> Option<Endpoint<'a>> {
    let caps = ENDPOINT.captures(raw)?;
    let suffix = caps.name("suffix")?.as_str();
    if !suffixes.iter().any(|s| s.eq_ignore_ascii_case(suffix)) {
        return None;
    }

    Some(Endpoint {
        vault: caps.name("vault")?.as_str(),
        suffix,
        port: caps.name("port").and_then(|p| p.as_str().parse().ok()),
        path: caps.name("path").map_or("", |p| p.as_str()),
    })
}

/// Parsed `https://<vault>.<suffix>[:443][/]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultUrl {
    pub vault_name: String,
    pub dns_suffix: String,
    pub port: Option<u16>,
}

impl VaultUrl {
    /// Parse a vault URL against the given set of accepted DNS suffixes.
    pub fn parse(raw: &str, suffixes: &[String]) -> Option<Self> {
        let endpoint = split_endpoint(raw, suffixes)?;
        if !endpoint.path.is_empty() && endpoint.path != "/" {
            return None;
        }
        Some(Self {
            vault_name: endpoint.vault.to_string(),
            dns_suffix: endpoint.suffix.to_string(),
            port: endpoint.port,
        })
    }
}

impl fmt::Display for VaultUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}.{}", self.vault_name, self.dns_suffix)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        f.write_str("/")
    }
}

/// Parsed `https://<vault>.<suffix>[:443]/keys/<name>/<version>[/]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KekUrl {
    pub vault_name: String,
    pub dns_suffix: String,
    pub port: Option<u16>,
    pub key_name: String,
    pub key_version: String,
}

impl KekUrl {
    /// Parse a key URL against the given set of accepted DNS suffixes.
    pub fn parse(raw: &str, suffixes: &[String]) -> Option<Self> {
        let endpoint = split_endpoint(raw, suffixes)?;
        let caps = KEY_PATH.captures(endpoint.path)?;
        Some(Self {
            vault_name: endpoint.vault.to_string(),
            dns_suffix: endpoint.suffix.to_string(),
            port: endpoint.port,
            key_name: caps["key"].to_string(),
            key_version: caps["version"].to_string(),
        })
    }
}

impl fmt::Display for KekUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "https://{}.{}", self.vault_name, self.dns_suffix)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        write!(f, "/keys/{}/{}", self.key_name, self.key_version)
    }
}
