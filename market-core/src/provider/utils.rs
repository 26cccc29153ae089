// provider/utils.rs
// Symbol checks shared by providers

use super::ProviderError;

/// Index and ticker symbols: `^GSPC`, `2330.TW`, `BRK-B`, `EURUSD=X`.
pub fn validate_symbol(symbol: &str) -> Result<String, ProviderError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ProviderError::InvalidSymbol(
            "Symbol cannot be empty".to_string(),
        ));
    }

    let symbol = symbol.to_uppercase();

    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '^' | '.' | '-' | '='))
    {
        return Err(ProviderError::InvalidSymbol(format!(
            "Symbol '{}' contains invalid characters",
            symbol
        )));
    }

    if symbol.len() > 20 {
        return Err(ProviderError::InvalidSymbol(format!(
            "Symbol '{}' has invalid length",
            symbol
        )));
    }

    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_validation() {
        assert_eq!(validate_symbol("^gspc").unwrap(), "^GSPC");
        assert!(validate_symbol("2330.TW").is_ok());
        assert!(validate_symbol("BRK-B").is_ok());
        assert!(validate_symbol("").is_err());
        assert!(validate_symbol("   ").is_err());
        assert!(validate_symbol("BTC/USD").is_err());
        assert!(validate_symbol("A VERY LONG NAME").is_err());
    }
}
