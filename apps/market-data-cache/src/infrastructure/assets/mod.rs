//! Asset Metadata Catalog
//!
//! Resolves display metadata for a symbol from two sources:
//!
//! 1. Built-in overrides for assets the upstream metadata gets wrong or
//!    omits (currently `SHIB` and `LINK`).
//! 2. Fetched metadata, loaded once at startup from a JSON file keyed by
//!    symbol (same shape as the upstream `assets/all` response).
//!
//! Overrides take precedence field by field; fetched metadata fills the gaps.

use std::collections::HashMap;
use std::path::Path;

use crate::domain::asset::AssetInfo;
use crate::domain::ticker::normalize_symbol;

/// Errors raised while loading fetched metadata.
#[derive(Debug, thiserror::Error)]
pub enum AssetCatalogError {
    /// Metadata file could not be read.
    #[error("failed to read asset metadata {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Metadata is not a JSON object of asset entries.
    #[error("invalid asset metadata: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Symbol → metadata lookup with built-in overrides.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    fetched: HashMap<String, AssetInfo>,
    overrides: HashMap<String, AssetInfo>,
}

impl AssetCatalog {
    /// Catalog with built-in overrides and the given fetched metadata.
    #[must_use]
    pub fn new(fetched: HashMap<String, AssetInfo>) -> Self {
        Self {
            fetched: normalize_keys(fetched),
            overrides: builtin_overrides(),
        }
    }

    /// Catalog with only the built-in overrides.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(HashMap::new())
    }

    /// Parse fetched metadata from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AssetCatalogError::Parse`] if `json` is not an object of
    /// asset entries.
    pub fn from_json(json: &str) -> Result<Self, AssetCatalogError> {
        let fetched: HashMap<String, AssetInfo> = serde_json::from_str(json)?;
        Ok(Self::new(fetched))
    }

    /// Load fetched metadata from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, AssetCatalogError> {
        let json = std::fs::read_to_string(path).map_err(|source| AssetCatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Resolved metadata for `symbol`, or `None` if neither source knows it.
    #[must_use]
    pub fn lookup(&self, symbol: &str) -> Option<AssetInfo> {
        let key = normalize_symbol(symbol);
        match (self.overrides.get(&key), self.fetched.get(&key)) {
            (Some(high), Some(low)) => Some(high.overlay(low)),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }

    /// Number of symbols with fetched metadata.
    #[must_use]
    pub fn fetched_len(&self) -> usize {
        self.fetched.len()
    }
}

fn normalize_keys(map: HashMap<String, AssetInfo>) -> HashMap<String, AssetInfo> {
    map.into_iter()
        .map(|(symbol, info)| (normalize_symbol(&symbol), info))
        .collect()
}

fn builtin_overrides() -> HashMap<String, AssetInfo> {
    HashMap::from([
        (
            "SHIB".to_string(),
            AssetInfo {
                image: Some(
                    "https://res.coinpaper.com/coinpaper/shiba_inu_shib_logo_a8ec09a691.png"
                        .to_string(),
                ),
                name: Some("Shiba Inu".to_string()),
                website: Some("https://shibatoken.com/".to_string()),
                summary: Some(
                    "Shiba Inu is a decentralized meme token that grew into a vibrant ecosystem."
                        .to_string(),
                ),
            },
        ),
        (
            "LINK".to_string(),
            AssetInfo {
                image: Some(
                    "https://res.coinpaper.com/coinpaper/chainlink_link_logo_26ead02910.png"
                        .to_string(),
                ),
                name: Some("Chainlink".to_string()),
                website: Some("https://chain.link/".to_string()),
                summary: Some(
                    "Chainlink is a decentralized oracle network that enables smart contracts \
                     to securely connect to external data sources, APIs, and payment systems."
                        .to_string(),
                ),
            },
        ),
    ])
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn builtin_knows_overrides_only() {
        let catalog = AssetCatalog::builtin();

        assert_eq!(
            catalog.lookup("SHIB").and_then(|i| i.name).as_deref(),
            Some("Shiba Inu")
        );
        assert_eq!(
            catalog.lookup("link").and_then(|i| i.name).as_deref(),
            Some("Chainlink")
        );
        assert!(catalog.lookup("BTC").is_none());
    }

    #[test]
    fn overrides_win_over_fetched_fields() {
        let catalog = AssetCatalog::from_json(
            r#"{
                "SHIB": {"name": "SHIBA INU (fetched)", "image": "https://cdn/shib.png"},
                "BTC": {"name": "Bitcoin", "website": "https://bitcoin.org"}
            }"#,
        )
        .unwrap();

        let shib = catalog.lookup("SHIB").unwrap();
        assert_eq!(shib.name.as_deref(), Some("Shiba Inu"));
        assert!(shib.image.unwrap().contains("coinpaper"));

        let btc = catalog.lookup("BTC").unwrap();
        assert_eq!(btc.name.as_deref(), Some("Bitcoin"));
        assert!(btc.image.is_none());
    }

    #[test]
    fn fetched_keys_are_normalized() {
        let catalog = AssetCatalog::from_json(r#"{"eth": {"name": "Ethereum"}}"#).unwrap();
        assert_eq!(catalog.fetched_len(), 1);
        assert!(catalog.lookup("ETH").is_some());
    }

    #[test]
    fn fetched_entries_tolerate_extra_fields() {
        let catalog =
            AssetCatalog::from_json(r#"{"ADA": {"name": "Cardano", "rank": 9, "tags": []}}"#)
                .unwrap();
        assert_eq!(
            catalog.lookup("ADA").and_then(|i| i.name).as_deref(),
            Some("Cardano")
        );
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(matches!(
            AssetCatalog::from_json("[]"),
            Err(AssetCatalogError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"DOGE": {{"name": "Dogecoin"}}}}"#).unwrap();

        let catalog = AssetCatalog::load(file.path()).unwrap();
        assert_eq!(
            catalog.lookup("DOGE").and_then(|i| i.name).as_deref(),
            Some("Dogecoin")
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");

        assert!(matches!(
            AssetCatalog::load(&missing),
            Err(AssetCatalogError::Read { .. })
        ));
    }
}
