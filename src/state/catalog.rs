//! Catalog state management.
//!
//! Holds the full set of known stocks received once at connection time.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::Symbol;

/// A known stock, as announced by the server in the `connected` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub symbol: Symbol,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub catch_phrase: String,
    /// Reference price fixed at connect time.
    pub base_price: Decimal,
}

/// Catalog errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Catalog already populated with {count} stocks")]
    AlreadyPopulated { count: usize },
}

/// Immutable-after-population store of known stocks.
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    /// Stocks in the order the server sent them
    stocks: Vec<Stock>,
    /// Index by symbol for fast lookup
    index: HashMap<Symbol, usize>,
    populated: bool,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the catalog. Only the first call succeeds.
    ///
    /// Duplicate symbols keep their first occurrence.
    pub fn set_catalog(&mut self, stocks: Vec<Stock>) -> Result<(), CatalogError> {
        if self.populated {
            return Err(CatalogError::AlreadyPopulated {
                count: self.stocks.len(),
            });
        }

        for stock in stocks {
            if self.index.contains_key(&stock.symbol) {
                tracing::warn!("Duplicate stock '{}' in catalog, keeping the first", stock.symbol);
                continue;
            }
            self.index.insert(stock.symbol.clone(), self.stocks.len());
            self.stocks.push(stock);
        }
        self.populated = true;

        tracing::info!("Catalog populated with {} stocks", self.stocks.len());
        Ok(())
    }

    pub fn get(&self, symbol: &str) -> Option<&Stock> {
        self.index.get(symbol).map(|&idx| &self.stocks[idx])
    }

    pub fn all(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    /// Whether the `connected` catalog has been received
    pub fn is_populated(&self) -> bool {
        self.populated
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stock(symbol: &str, base_price: Decimal) -> Stock {
        Stock {
            symbol: Symbol::from(symbol),
            company_name: format!("{} Inc", symbol),
            catch_phrase: "Synergize scalable paradigms".to_string(),
            base_price,
        }
    }

    #[test]
    fn test_set_catalog_once() {
        let mut catalog = CatalogStore::new();
        assert!(!catalog.is_populated());

        catalog
            .set_catalog(vec![stock("IET", dec!(100)), stock("ZHT", dec!(42.5))])
            .unwrap();

        assert!(catalog.is_populated());
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("ZHT").unwrap().base_price, dec!(42.5));
        assert_eq!(catalog.all()[0].symbol.as_str(), "IET");

        let err = catalog.set_catalog(vec![stock("ABC", dec!(1))]).unwrap_err();
        assert_eq!(err, CatalogError::AlreadyPopulated { count: 2 });
        assert!(!catalog.contains("ABC"));
    }

    #[test]
    fn test_duplicate_symbols_keep_first() {
        let mut catalog = CatalogStore::new();
        catalog
            .set_catalog(vec![stock("IET", dec!(100)), stock("IET", dec!(200))])
            .unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("IET").unwrap().base_price, dec!(100));
    }

    #[test]
    fn test_empty_catalog_is_populated() {
        let mut catalog = CatalogStore::new();
        catalog.set_catalog(vec![]).unwrap();
        assert!(catalog.is_populated());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_stock_wire_format() {
        let json = r#"{
            "symbol": "IET",
            "companyName": "Iet Industries",
            "catchPhrase": "Reinvent bleeding-edge markets",
            "basePrice": 100.25
        }"#;
        let parsed: Stock = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.symbol.as_str(), "IET");
        assert_eq!(parsed.company_name, "Iet Industries");
        assert_eq!(parsed.base_price, dec!(100.25));
    }
}
