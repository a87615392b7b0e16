//! Asset Metadata and Ticker Views
//!
//! Descriptive metadata (logo, display name, website, summary) is kept
//! separately from prices and joined at read time.
//!
//! # Merge Rules
//!
//! - [`AssetInfo::overlay`]: fields from the higher-precedence source win;
//!   the lower-precedence source only fills gaps.
//! - [`merge_ticker`]: missing metadata falls back to fixed display defaults,
//!   a missing ticker leaves `price` empty.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ticker::TickerRecord;

/// Display name used when no metadata names the asset.
pub const DEFAULT_NAME: &str = "N/A";

/// Website used when no metadata provides one.
pub const DEFAULT_WEBSITE: &str = "N/A";

/// Summary used when no metadata provides one.
pub const DEFAULT_SUMMARY: &str = "No summary available";

/// Descriptive metadata for one asset. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Logo URL.
    #[serde(default)]
    pub image: Option<String>,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Project website.
    #[serde(default)]
    pub website: Option<String>,
    /// Short description.
    #[serde(default)]
    pub summary: Option<String>,
}

impl AssetInfo {
    /// Combine two metadata records, preferring fields from `self`.
    ///
    /// Empty strings count as missing so a blank override never hides a
    /// populated lower-precedence field.
    #[must_use]
    pub fn overlay(&self, lower: &Self) -> Self {
        Self {
            image: pick(self.image.as_ref(), lower.image.as_ref()),
            name: pick(self.name.as_ref(), lower.name.as_ref()),
            website: pick(self.website.as_ref(), lower.website.as_ref()),
            summary: pick(self.summary.as_ref(), lower.summary.as_ref()),
        }
    }
}

fn pick(high: Option<&String>, low: Option<&String>) -> Option<String> {
    high.filter(|s| !s.is_empty())
        .or_else(|| low.filter(|s| !s.is_empty()))
        .cloned()
}

/// A ticker joined with its display metadata, as served to front ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CryptoView {
    /// Ticker symbol.
    pub id: String,
    /// Latest price, `null` when the feed has not reported the symbol.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub price: Option<Decimal>,
    /// Latest change percent, `null` when unknown.
    #[serde(with = "rust_decimal::serde::float_option")]
    pub change_percent: Option<Decimal>,
    /// When the price was received.
    pub last_updated: Option<DateTime<Utc>>,
    /// Logo URL, `null` when unknown.
    pub logo: Option<String>,
    /// Display name.
    pub name: String,
    /// Project website.
    pub website: String,
    /// Short description.
    pub summary: String,
}

/// Join a ticker record with resolved metadata for `id`.
#[must_use]
pub fn merge_ticker(
    id: &str,
    record: Option<&TickerRecord>,
    info: Option<&AssetInfo>,
) -> CryptoView {
    let info = info.cloned().unwrap_or_default();

    CryptoView {
        id: id.to_string(),
        price: record.map(|r| r.price),
        change_percent: record.map(|r| r.change_percent),
        last_updated: record.map(|r| r.last_updated),
        logo: info.image.filter(|s| !s.is_empty()),
        name: non_empty_or(info.name, DEFAULT_NAME),
        website: non_empty_or(info.website, DEFAULT_WEBSITE),
        summary: non_empty_or(info.summary, DEFAULT_SUMMARY),
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, image: Option<&str>) -> AssetInfo {
        AssetInfo {
            image: image.map(str::to_string),
            name: Some(name.to_string()),
            website: None,
            summary: None,
        }
    }

    #[test]
    fn overlay_prefers_higher_precedence_fields() {
        let high = info("Shiba Inu", None);
        let low = AssetInfo {
            image: Some("https://cdn/shib.png".to_string()),
            name: Some("SHIBA".to_string()),
            website: Some("https://shib.io".to_string()),
            summary: None,
        };

        let merged = high.overlay(&low);
        assert_eq!(merged.name.as_deref(), Some("Shiba Inu"));
        assert_eq!(merged.image.as_deref(), Some("https://cdn/shib.png"));
        assert_eq!(merged.website.as_deref(), Some("https://shib.io"));
        assert!(merged.summary.is_none());
    }

    #[test]
    fn overlay_treats_empty_strings_as_missing() {
        let high = AssetInfo {
            name: Some(String::new()),
            ..AssetInfo::default()
        };
        let low = info("Bitcoin", None);

        assert_eq!(high.overlay(&low).name.as_deref(), Some("Bitcoin"));
    }

    #[test]
    fn merge_fills_display_defaults() {
        let view = merge_ticker("XYZ", None, None);

        assert_eq!(view.id, "XYZ");
        assert!(view.price.is_none());
        assert!(view.logo.is_none());
        assert_eq!(view.name, DEFAULT_NAME);
        assert_eq!(view.website, DEFAULT_WEBSITE);
        assert_eq!(view.summary, DEFAULT_SUMMARY);
    }

    #[test]
    fn merge_carries_price_and_metadata() {
        let record = TickerRecord::new(
            "BTC",
            Decimal::new(50_500, 0),
            Decimal::new(31, 1),
            Utc::now(),
        );
        let meta = info("Bitcoin", Some("https://cdn/btc.png"));

        let view = merge_ticker("BTC", Some(&record), Some(&meta));
        assert_eq!(view.price, Some(Decimal::new(50_500, 0)));
        assert_eq!(view.change_percent, Some(Decimal::new(31, 1)));
        assert_eq!(view.name, "Bitcoin");
        assert_eq!(view.logo.as_deref(), Some("https://cdn/btc.png"));
    }

    #[test]
    fn view_serializes_missing_price_as_null() {
        let json = serde_json::to_value(merge_ticker("XYZ", None, None)).unwrap();
        assert!(json["price"].is_null());
        assert!(json["logo"].is_null());
        assert_eq!(json["summary"], DEFAULT_SUMMARY);
    }
}
