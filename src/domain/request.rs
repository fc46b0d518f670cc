//! Transaction requests: loosely typed input and its validated form.
//!
//! [`TransactionInput`] mirrors what the surrounding application sends.
//! [`TransactionRequest::parse`] turns it into a tagged union whose variants
//! carry only the fields their type needs, so handlers never re-validate.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::{AssetCatalog, AssetSymbol, Chain, FeeSchedule, PaymentMethod, PaymentSource};
use super::{TransactionKind, Usd};

/// Raw transaction request as received from callers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Number or numeric string.
    pub amount: Option<serde_json::Value>,
    /// `@handle` for send, wallet address for transfer.
    pub recipient: Option<String>,
    /// `@handle` of the sender for receive.
    pub sender: Option<String>,
    pub asset: Option<String>,
    /// Payment method for add, or the funding source for buy.
    pub payment_method: Option<String>,
    /// Off-ramp destination for withdraw.
    pub destination: Option<String>,
}

impl TransactionInput {
    /// Start an input for the given type and amount.
    pub fn new(kind: &str, amount: impl Into<serde_json::Value>) -> Self {
        Self {
            kind: Some(kind.to_string()),
            amount: Some(amount.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn recipient(mut self, recipient: &str) -> Self {
        self.recipient = Some(recipient.to_string());
        self
    }

    #[must_use]
    pub fn sender(mut self, sender: &str) -> Self {
        self.sender = Some(sender.to_string());
        self
    }

    #[must_use]
    pub fn asset(mut self, asset: &str) -> Self {
        self.asset = Some(asset.to_string());
        self
    }

    #[must_use]
    pub fn payment_method(mut self, method: &str) -> Self {
        self.payment_method = Some(method.to_string());
        self
    }

    #[must_use]
    pub fn destination(mut self, destination: &str) -> Self {
        self.destination = Some(destination.to_string());
        self
    }
}

/// A platform user handle such as `@alice`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Handle(String);

impl Handle {
    /// Parse `@name` where name is 3-20 ASCII letters, digits or underscores.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = |reason| ValidationError::InvalidRecipient {
            value: value.to_string(),
            reason,
        };
        let name = value
            .trim()
            .strip_prefix('@')
            .ok_or_else(|| invalid("handle must start with '@'"))?;
        if !(3..=20).contains(&name.len()) {
            return Err(invalid("handle must be 3-20 characters"));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("handle may only contain letters, digits and '_'"));
        }
        Ok(Self(format!("@{}", name.to_ascii_lowercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An external wallet address together with the chain its format implies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletAddress {
    value: String,
    chain: Chain,
}

impl WalletAddress {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let value = value.trim();
        let chain = Chain::from_address(value).ok_or_else(|| ValidationError::InvalidRecipient {
            value: value.to_string(),
            reason: "not a recognised wallet address",
        })?;
        Ok(Self {
            value: value.to_string(),
            chain,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn chain(&self) -> Chain {
        self.chain
    }
}

/// A validated transaction request, one variant per type.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionRequest {
    Add {
        amount: Usd,
        method: PaymentMethod,
    },
    Withdraw {
        amount: Usd,
        destination: String,
    },
    Send {
        amount: Usd,
        recipient: Handle,
    },
    Receive {
        amount: Usd,
        sender: Handle,
    },
    Transfer {
        amount: Usd,
        address: WalletAddress,
    },
    Buy {
        amount: Usd,
        asset: AssetSymbol,
        source: PaymentSource,
    },
    Sell {
        amount: Usd,
        asset: AssetSymbol,
    },
    Invest {
        amount: Usd,
        asset: AssetSymbol,
    },
}

impl TransactionRequest {
    /// Validate raw input.
    ///
    /// Checks run in order: type, amount, per-type minimum, then the
    /// type-specific fields (recipient format, asset allow-list, payment
    /// method).
    pub fn parse(
        input: &TransactionInput,
        fees: &FeeSchedule,
        assets: &AssetCatalog,
    ) -> Result<Self, ValidationError> {
        let kind: TransactionKind = input
            .kind
            .as_deref()
            .ok_or(ValidationError::MissingField { field: "type" })?
            .parse()?;
        let amount = parse_amount(input.amount.as_ref())?;

        let minimum = fees.min_amount(kind);
        if amount < minimum {
            return Err(ValidationError::BelowMinimum {
                kind,
                amount,
                minimum,
            });
        }
        let maximum = fees.max_amount();
        if amount > maximum {
            return Err(ValidationError::AboveMaximum { amount, maximum });
        }

        let request = match kind {
            TransactionKind::Add => {
                let method = required(&input.payment_method, "payment_method")?.parse()?;
                TransactionRequest::Add { amount, method }
            }
            TransactionKind::Withdraw => {
                let destination = required(&input.destination, "destination")?.trim();
                if destination.is_empty() {
                    return Err(ValidationError::MissingField {
                        field: "destination",
                    });
                }
                TransactionRequest::Withdraw {
                    amount,
                    destination: destination.to_string(),
                }
            }
            TransactionKind::Send => TransactionRequest::Send {
                amount,
                recipient: Handle::parse(required(&input.recipient, "recipient")?)?,
            },
            TransactionKind::Receive => TransactionRequest::Receive {
                amount,
                sender: Handle::parse(required(&input.sender, "sender")?)?,
            },
            TransactionKind::Transfer => TransactionRequest::Transfer {
                amount,
                address: WalletAddress::parse(required(&input.recipient, "recipient")?)?,
            },
            TransactionKind::Buy => TransactionRequest::Buy {
                amount,
                asset: allowed_asset(input, kind, assets)?,
                source: parse_source(input.payment_method.as_deref())?,
            },
            TransactionKind::Sell => TransactionRequest::Sell {
                amount,
                asset: allowed_asset(input, kind, assets)?,
            },
            TransactionKind::Invest => TransactionRequest::Invest {
                amount,
                asset: allowed_asset(input, kind, assets)?,
            },
        };
        Ok(request)
    }

    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        match self {
            TransactionRequest::Add { .. } => TransactionKind::Add,
            TransactionRequest::Withdraw { .. } => TransactionKind::Withdraw,
            TransactionRequest::Send { .. } => TransactionKind::Send,
            TransactionRequest::Receive { .. } => TransactionKind::Receive,
            TransactionRequest::Transfer { .. } => TransactionKind::Transfer,
            TransactionRequest::Buy { .. } => TransactionKind::Buy,
            TransactionRequest::Sell { .. } => TransactionKind::Sell,
            TransactionRequest::Invest { .. } => TransactionKind::Invest,
        }
    }

    #[must_use]
    pub fn amount(&self) -> Usd {
        match self {
            TransactionRequest::Add { amount, .. }
            | TransactionRequest::Withdraw { amount, .. }
            | TransactionRequest::Send { amount, .. }
            | TransactionRequest::Receive { amount, .. }
            | TransactionRequest::Transfer { amount, .. }
            | TransactionRequest::Buy { amount, .. }
            | TransactionRequest::Sell { amount, .. }
            | TransactionRequest::Invest { amount, .. } => *amount,
        }
    }

    /// Asset leg, for buy, sell and invest.
    #[must_use]
    pub fn asset(&self) -> Option<&AssetSymbol> {
        match self {
            TransactionRequest::Buy { asset, .. }
            | TransactionRequest::Sell { asset, .. }
            | TransactionRequest::Invest { asset, .. } => Some(asset),
            _ => None,
        }
    }

    /// Returns true if an off-platform payment rail carries the value.
    #[must_use]
    pub fn uses_payment_provider(&self) -> bool {
        match self {
            TransactionRequest::Add { .. } | TransactionRequest::Withdraw { .. } => true,
            TransactionRequest::Buy { source, .. } => !source.is_wallet(),
            _ => false,
        }
    }

    /// Returns true if the request draws on available balance.
    #[must_use]
    pub fn debits_available(&self) -> bool {
        match self {
            TransactionRequest::Withdraw { .. }
            | TransactionRequest::Send { .. }
            | TransactionRequest::Transfer { .. }
            | TransactionRequest::Invest { .. } => true,
            TransactionRequest::Buy { source, .. } => source.is_wallet(),
            _ => false,
        }
    }

    /// Counterparty recorded on the transaction, if any.
    #[must_use]
    pub fn counterparty(&self) -> Option<String> {
        match self {
            TransactionRequest::Withdraw { destination, .. } => Some(destination.clone()),
            TransactionRequest::Send { recipient, .. } => Some(recipient.to_string()),
            TransactionRequest::Receive { sender, .. } => Some(sender.to_string()),
            TransactionRequest::Transfer { address, .. } => Some(address.as_str().to_string()),
            _ => None,
        }
    }
}

fn required<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ValidationError::MissingField { field })
}

fn parse_amount(value: Option<&serde_json::Value>) -> Result<Usd, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField { field: "amount" })?;
    let text = match value {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => return Err(ValidationError::MissingField { field: "amount" }),
        other => {
            return Err(ValidationError::InvalidAmount {
                value: other.to_string(),
            })
        }
    };
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ValidationError::InvalidAmount { value: text.clone() })?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount { amount });
    }
    Ok(amount)
}

fn allowed_asset(
    input: &TransactionInput,
    kind: TransactionKind,
    assets: &AssetCatalog,
) -> Result<AssetSymbol, ValidationError> {
    let symbol = AssetSymbol::new(required(&input.asset, "asset")?);
    if !assets.is_allowed(&symbol) {
        return Err(ValidationError::UnsupportedAsset {
            asset: symbol.to_string(),
            kind,
        });
    }
    Ok(symbol)
}

fn parse_source(method: Option<&str>) -> Result<PaymentSource, ValidationError> {
    match method.map(str::trim) {
        None | Some("") | Some("wallet") | Some("diboas_wallet") => Ok(PaymentSource::Wallet),
        Some(other) => Ok(PaymentSource::External(other.parse()?)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::domain::{AssetInfo, KindFees, RoutingFees};
    use rust_decimal_macros::dec;

    fn rules() -> (FeeSchedule, AssetCatalog) {
        let mut kinds = BTreeMap::new();
        for kind in TransactionKind::ALL {
            kinds.insert(
                kind,
                KindFees {
                    diboas_rate: Decimal::ZERO,
                    provider_rate: Decimal::ZERO,
                    provider_cap: Decimal::ZERO,
                    min_amount: dec!(5),
                },
            );
        }
        let fees = FeeSchedule::new(
            kinds,
            BTreeMap::new(),
            RoutingFees {
                bridge_base_fee: Decimal::ZERO,
                bridge_rate: Decimal::ZERO,
                slippage_rate: Decimal::ZERO,
            },
        );
        let mut assets = BTreeMap::new();
        assets.insert(
            AssetSymbol::new("ETH"),
            AssetInfo {
                chain: Chain::Ethereum,
                reference_price: dec!(3000),
                tradable: true,
            },
        );
        (fees, AssetCatalog::new(assets))
    }

    fn parse(input: TransactionInput) -> Result<TransactionRequest, ValidationError> {
        let (fees, assets) = rules();
        TransactionRequest::parse(&input, &fees, &assets)
    }

    #[test]
    fn parses_add_with_numeric_amount() {
        let request = parse(TransactionInput::new("add", 100).payment_method("card")).unwrap();
        assert_eq!(
            request,
            TransactionRequest::Add {
                amount: dec!(100),
                method: PaymentMethod::Card
            }
        );
    }

    #[test]
    fn accepts_string_amounts() {
        let request = parse(TransactionInput::new("sell", "12.50").asset("eth")).unwrap();
        assert_eq!(request.amount(), dec!(12.50));
        assert_eq!(request.asset(), Some(&AssetSymbol::new("ETH")));
    }

    #[test]
    fn rejects_missing_type_and_amount() {
        let input = TransactionInput::default();
        assert_eq!(parse(input), Err(ValidationError::MissingField { field: "type" }));

        let input = TransactionInput {
            kind: Some("add".into()),
            ..TransactionInput::default()
        };
        assert_eq!(parse(input), Err(ValidationError::MissingField { field: "amount" }));
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(matches!(
            parse(TransactionInput::new("mint", 10)),
            Err(ValidationError::UnknownTransactionType { .. })
        ));
    }

    #[test]
    fn rejects_negative_nan_and_non_numeric_amounts() {
        assert!(matches!(
            parse(TransactionInput::new("add", -5).payment_method("card")),
            Err(ValidationError::NonPositiveAmount { .. })
        ));
        assert!(matches!(
            parse(TransactionInput::new("add", "NaN").payment_method("card")),
            Err(ValidationError::InvalidAmount { .. })
        ));
        assert!(matches!(
            parse(TransactionInput::new("add", "ten").payment_method("card")),
            Err(ValidationError::InvalidAmount { .. })
        ));
        assert!(matches!(
            parse(TransactionInput::new("add", true).payment_method("card")),
            Err(ValidationError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn enforces_minimum_amount() {
        assert_eq!(
            parse(TransactionInput::new("send", "4.99").recipient("@alice")),
            Err(ValidationError::BelowMinimum {
                kind: TransactionKind::Send,
                amount: dec!(4.99),
                minimum: dec!(5),
            })
        );
    }

    #[test]
    fn validates_handles() {
        assert!(parse(TransactionInput::new("send", 10).recipient("@alice_01")).is_ok());
        assert!(matches!(
            parse(TransactionInput::new("send", 10).recipient("alice")),
            Err(ValidationError::InvalidRecipient { .. })
        ));
        assert!(matches!(
            parse(TransactionInput::new("send", 10).recipient("@a")),
            Err(ValidationError::InvalidRecipient { .. })
        ));
        assert_eq!(
            parse(TransactionInput::new("receive", 10)),
            Err(ValidationError::MissingField { field: "sender" })
        );
    }

    #[test]
    fn transfer_infers_chain_from_address() {
        let address = format!("0x{}", "ab".repeat(20));
        let request = parse(TransactionInput::new("transfer", 10).recipient(&address)).unwrap();
        match request {
            TransactionRequest::Transfer { address, .. } => {
                assert_eq!(address.chain(), Chain::Ethereum)
            }
            other => panic!("expected transfer, got {other:?}"),
        }
    }

    #[test]
    fn enforces_asset_allow_list() {
        assert!(matches!(
            parse(TransactionInput::new("buy", 10).asset("DOGE")),
            Err(ValidationError::UnsupportedAsset { .. })
        ));
        assert!(matches!(
            parse(TransactionInput::new("invest", 10).asset("USDC")),
            Err(ValidationError::UnsupportedAsset { .. })
        ));
    }

    #[test]
    fn buy_defaults_to_wallet_source() {
        let request = parse(TransactionInput::new("buy", 10).asset("ETH")).unwrap();
        assert!(request.debits_available());
        assert!(!request.uses_payment_provider());

        let request =
            parse(TransactionInput::new("buy", 10).asset("ETH").payment_method("apple_pay"))
                .unwrap();
        assert!(!request.debits_available());
        assert!(request.uses_payment_provider());
    }

    #[test]
    fn withdraw_requires_destination() {
        assert_eq!(
            parse(TransactionInput::new("withdraw", 10)),
            Err(ValidationError::MissingField {
                field: "destination"
            })
        );
    }
}
