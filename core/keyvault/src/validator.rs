//! Cross-field validation of Key Vault references.

use tracing::debug;

use adeprecheck_common::{keys, Error, Result};

use crate::endpoint::{KekUrl, VaultUrl, DEFAULT_DNS_SUFFIXES};
use crate::resource_id::VaultIdentifier;

/// Key-encryption algorithms the encryption engine can wrap keys with.
pub const SUPPORTED_KEK_ALGORITHMS: [&str; 3] = ["RSA-OAEP", "RSA-OAEP-256", "RSA1_5"];

const ABSENT: &str = "<absent>";

/// Parses and cross-checks Key Vault resource IDs, vault URLs and KEK URLs.
#[derive(Debug, Clone)]
pub struct IdentifierValidator {
    suffixes: Vec<String>,
}

impl IdentifierValidator {
    /// Validator accepting the public and sovereign cloud suffixes.
    pub fn new() -> Self {
        Self {
            suffixes: DEFAULT_DNS_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Also accept `suffix` (e.g. a test endpoint) as a vault DNS suffix.
    pub fn with_dns_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        let suffix = suffix.trim_start_matches('.').to_string();
        if !suffix.is_empty() && !self.suffixes.iter().any(|s| s.eq_ignore_ascii_case(&suffix)) {
            self.suffixes.push(suffix);
        }
        self
    }

    pub fn dns_suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// Parse a Key Vault resource ID held in setting `field`.
    ///
    /// # Errors
    /// - `InvalidResourceId` if `raw` does not follow the ARM grammar
    pub fn parse_resource_id(&self, field: &str, raw: &str) -> Result<VaultIdentifier> {
        VaultIdentifier::parse(raw).ok_or_else(|| Error::InvalidResourceId {
            field: field.to_string(),
            value: raw.to_string(),
        })
    }

    /// Parse a vault URL held in setting `field`.
    ///
    /// # Errors
    /// - `InvalidVaultUrl` if `raw` is not an https vault endpoint on a known suffix
    pub fn parse_vault_url(&self, field: &str, raw: &str) -> Result<VaultUrl> {
        VaultUrl::parse(raw, &self.suffixes).ok_or_else(|| Error::InvalidVaultUrl {
            field: field.to_string(),
            value: raw.to_string(),
        })
    }

    /// Parse a key-encryption-key URL held in setting `field`.
    ///
    /// # Errors
    /// - `InvalidKekUrl` if `raw` is not a `/keys/<name>/<version>` endpoint
    pub fn parse_kek_url(&self, field: &str, raw: &str) -> Result<KekUrl> {
        KekUrl::parse(raw, &self.suffixes).ok_or_else(|| Error::InvalidKekUrl {
            field: field.to_string(),
            value: raw.to_string(),
        })
    }

    /// Require the resource ID and the vault URL to name the same vault.
    pub fn cross_check_vault_names(
        &self,
        id: Option<&VaultIdentifier>,
        url: Option<&VaultUrl>,
    ) -> Result<()> {
        cross_check(
            keys::KEY_VAULT_RESOURCE_ID,
            id.map(|i| i.vault_name.as_str()),
            keys::KEY_VAULT_URL,
            url.map(|u| u.vault_name.as_str()),
        )
    }

    /// Require the KEK vault resource ID and the KEK URL to name the same vault.
    pub fn cross_check_kek_names(
        &self,
        kek_id: Option<&VaultIdentifier>,
        kek_url: Option<&KekUrl>,
    ) -> Result<()> {
        cross_check(
            keys::KEK_VAULT_RESOURCE_ID,
            kek_id.map(|i| i.vault_name.as_str()),
            keys::KEK_URL,
            kek_url.map(|u| u.vault_name.as_str()),
        )
    }

    /// Canonical spelling of a supported key-encryption algorithm.
    ///
    /// # Errors
    /// - `InvalidKeyEncryptionAlgorithm` for anything outside [`SUPPORTED_KEK_ALGORITHMS`]
    pub fn validate_key_encryption_algorithm(&self, raw: &str) -> Result<&'static str> {
        SUPPORTED_KEK_ALGORITHMS
            .into_iter()
            .find(|alg| alg.eq_ignore_ascii_case(raw))
            .ok_or_else(|| Error::InvalidKeyEncryptionAlgorithm {
                value: raw.to_string(),
            })
    }

    /// Vault name from a resource ID, for display only.
    pub fn vault_name_from_id(&self, raw: &str) -> Option<String> {
        VaultIdentifier::parse(raw).map(|id| id.vault_name)
    }

    /// Vault name from a vault URL, for display only.
    pub fn vault_name_from_url(&self, raw: &str) -> Option<String> {
        VaultUrl::parse(raw, &self.suffixes).map(|url| url.vault_name)
    }

    /// Vault name from a KEK URL, for display only.
    pub fn vault_name_from_kek_url(&self, raw: &str) -> Option<String> {
        KekUrl::parse(raw, &self.suffixes).map(|kek| kek.vault_name)
    }
}

impl Default for IdentifierValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn cross_check(
    id_field: &str,
    id_name: Option<&str>,
    url_field: &str,
    url_name: Option<&str>,
) -> Result<()> {
    match (id_name, url_name) {
        (Some(id), Some(url)) if id.eq_ignore_ascii_case(url) => {
            debug!(vault = id, "vault names match");
            Ok(())
        }
        _ => Err(Error::NameMismatch {
            id_field: id_field.to_string(),
            id_name: id_name.unwrap_or(ABSENT).to_string(),
            url_field: url_field.to_string(),
            url_name: url_name.unwrap_or(ABSENT).to_string(),
        }),
    }
}
