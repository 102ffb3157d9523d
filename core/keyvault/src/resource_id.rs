//! Key Vault ARM resource identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Provider namespace every vault resource ID must carry.
pub const PROVIDER_NAMESPACE: &str = "Microsoft.KeyVault";

static RESOURCE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^/subscriptions/(?P<subscription>[a-z0-9-]+)/resourcegroups/(?P<group>[-\w.()]+)/providers/microsoft\.keyvault/vaults/(?P<vault>[-\w.]+)$",
    )
    .expect("resource ID pattern is valid")
});

/// Parsed `/subscriptions/<id>/resourceGroups/<name>/providers/Microsoft.KeyVault/vaults/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultIdentifier {
    pub subscription_id: String,
    pub resource_group: String,
    pub vault_name: String,
}

impl VaultIdentifier {
    /// Parse a resource ID, returning `None` when it does not follow the grammar.
    ///
    /// Segment keywords are matched case-insensitively. Empty or extra
    /// segments and trailing slashes are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = RESOURCE_ID.captures(raw)?;
        Some(Self {
            subscription_id: caps["subscription"].to_string(),
            resource_group: caps["group"].to_string(),
            vault_name: caps["vault"].to_string(),
        })
    }

    pub fn provider_namespace(&self) -> &'static str {
        PROVIDER_NAMESPACE
    }
}

impl fmt::Display for VaultIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/vaults/{}",
            self.subscription_id, self.resource_group, PROVIDER_NAMESPACE, self.vault_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_canonical() {
        let id = VaultIdentifier::parse(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/adenszqtrrg/providers/Microsoft.KeyVault/vaults/adenszqtrkv",
        )
        .unwrap();
        assert_eq!(id.subscription_id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(id.resource_group, "adenszqtrrg");
        assert_eq!(id.vault_name, "adenszqtrkv");
        assert_eq!(id.provider_namespace(), "Microsoft.KeyVault");
    }

    #[test]
    fn test_parse_lowercase_keywords() {
        let id = VaultIdentifier::parse(
            "/subscriptions/00000000-0000-0000-0000-000000000000/resourcegroups/adenszqtrrg/providers/microsoft.keyvault/vaults/adenszqtrkv",
        );
        assert!(id.is_some());
    }

    #[test]
    fn test_vault_name_may_contain_dots() {
        let id = VaultIdentifier::parse(
            "/subscriptions/subid/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/my.vault",
        )
        .unwrap();
        assert_eq!(id.vault_name, "my.vault");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let cases = [
            "",
            "////",
            "/subscriptions/{subid}/resourceGroups/{rgname}/providers/Microsoft.KeyVault/",
            "/subscriptions/{subid}/resourceGroups/{rgname}/providers/Microsoft.KeyVault////////",
            "/subscriptions/{subid}/resourceGroupssss/{rgname}/providers/Microsoft.KeyVault/vaults/{vaultname}",
            "/subscriptions/{subid}/resourceGroups/{rgname}/providers/Microsoft.KeyVault/vaults/{vaultname}",
            "/subscriptions/subid/resourceGroups/rg/providers/Microsoft.Storage/vaults/kv",
            "/subscriptions/subid/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv/",
            "/subscriptions/subid/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv/keys",
            "/subscriptions//resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv",
            "subscriptions/subid/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv",
        ];
        for raw in cases {
            assert!(VaultIdentifier::parse(raw).is_none(), "accepted {raw}");
        }
    }

    proptest! {
        #[test]
        fn prop_render_round_trips(
            sub in "[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}",
            group in "[A-Za-z0-9_().-]{1,40}",
            vault in "[A-Za-z][A-Za-z0-9-]{2,23}",
            upper in any::<bool>(),
        ) {
            let raw = format!(
                "/subscriptions/{sub}/resourceGroups/{group}/providers/Microsoft.KeyVault/vaults/{vault}"
            );
            let input = if upper { raw.to_uppercase() } else { raw.clone() };
            let parsed = VaultIdentifier::parse(&input).unwrap();
            prop_assert_eq!(parsed.to_string().to_lowercase(), raw.to_lowercase());
        }
    }
}
