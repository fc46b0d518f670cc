//! Supported chains and asset symbols.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A blockchain the custodial wallet holds balances on.
///
/// Declaration order is the routing discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Bitcoin,
    Ethereum,
    Solana,
    Sui,
}

impl Chain {
    /// Every supported chain, in discovery order.
    pub const ALL: [Chain; 4] = [Chain::Bitcoin, Chain::Ethereum, Chain::Solana, Chain::Sui];

    /// Lowercase chain name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "bitcoin",
            Chain::Ethereum => "ethereum",
            Chain::Solana => "solana",
            Chain::Sui => "sui",
        }
    }

    /// Symbol of the chain's native asset.
    #[must_use]
    pub const fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::Ethereum => "ETH",
            Chain::Solana => "SOL",
            Chain::Sui => "SUI",
        }
    }

    /// Infer the chain an external wallet address belongs to.
    ///
    /// Legacy Bitcoin addresses (leading `1`/`3`, at most 34 characters) win
    /// over Solana when both alphabets match.
    #[must_use]
    pub fn from_address(address: &str) -> Option<Chain> {
        if let Some(hex) = address.strip_prefix("0x") {
            if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            return match hex.len() {
                40 => Some(Chain::Ethereum),
                64 => Some(Chain::Sui),
                _ => None,
            };
        }

        if let Some(rest) = address.strip_prefix("bc1") {
            let valid = (39..=59).contains(&rest.len())
                && rest
                    .chars()
                    .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase());
            return valid.then_some(Chain::Bitcoin);
        }

        if !address.chars().all(is_base58) {
            return None;
        }

        let len = address.len();
        if (address.starts_with('1') || address.starts_with('3')) && (26..=34).contains(&len) {
            return Some(Chain::Bitcoin);
        }
        if (32..=44).contains(&len) {
            return Some(Chain::Solana);
        }
        None
    }
}

fn is_base58(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "solana" | "sol" => Ok(Chain::Solana),
            "sui" => Ok(Chain::Sui),
            other => Err(format!("unknown chain '{other}'")),
        }
    }
}

/// Asset ticker, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetSymbol(String);

impl AssetSymbol {
    /// Symbols treated as USD-pegged liquid balance.
    pub const STABLECOINS: [&'static str; 2] = ["USDC", "USDT"];

    /// Create a symbol, normalizing case and surrounding whitespace.
    pub fn new(symbol: impl AsRef<str>) -> Self {
        Self(symbol.as_ref().trim().to_ascii_uppercase())
    }

    /// The stablecoin that backs available balance.
    #[must_use]
    pub fn usdc() -> Self {
        Self("USDC".into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for USD-pegged stablecoins.
    #[must_use]
    pub fn is_stablecoin(&self) -> bool {
        Self::STABLECOINS.contains(&self.0.as_str())
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetSymbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
