// market-core/src/universe.rs
// Index universe: the symbols the dashboard and the scanner know by name

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub symbol: String,
    pub name: String,
    pub region: String,
}

impl IndexInfo {
    fn new(symbol: &str, name: &str, region: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            region: region.to_string(),
        }
    }
}

pub struct IndexUniverse {
    indices: Vec<IndexInfo>,
}

impl Default for IndexUniverse {
    fn default() -> Self {
        Self {
            indices: vec![
                IndexInfo::new("^GSPC", "S&P 500", "US"),
                IndexInfo::new("^IXIC", "NASDAQ Composite", "US"),
                IndexInfo::new("^DJI", "Dow Jones Industrial Average", "US"),
                IndexInfo::new("^SOX", "PHLX Semiconductor", "US"),
                IndexInfo::new("^TWII", "TAIEX", "TW"),
                IndexInfo::new("^N225", "Nikkei 225", "JP"),
            ],
        }
    }
}

impl IndexUniverse {
    /// Known indices first, in configuration order; unknown symbols keep
    /// their ticker as display name.
    pub fn from_symbols(symbols: &[String]) -> Self {
        let known = Self::default();
        let indices = symbols
            .iter()
            .map(|s| {
                let symbol = s.trim().to_uppercase();
                known
                    .lookup(&symbol)
                    .cloned()
                    .unwrap_or_else(|| IndexInfo::new(&symbol, &symbol, "-"))
            })
            .collect();
        Self { indices }
    }

    pub fn lookup(&self, symbol: &str) -> Option<&IndexInfo> {
        self.indices
            .iter()
            .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn display_name(&self, symbol: &str) -> String {
        self.lookup(symbol)
            .map(|i| i.name.clone())
            .unwrap_or_else(|| symbol.to_string())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.indices.iter().map(|i| i.symbol.clone()).collect()
    }

    pub fn indices(&self) -> &[IndexInfo] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_symbols_keeps_order_and_names() {
        let universe =
            IndexUniverse::from_symbols(&["^twii".to_string(), "QQQ".to_string()]);
        assert_eq!(universe.symbols(), vec!["^TWII", "QQQ"]);
        assert_eq!(universe.display_name("^TWII"), "TAIEX");
        assert_eq!(universe.display_name("qqq"), "QQQ");
        assert_eq!(universe.display_name("^FTSE"), "^FTSE");
    }
}
