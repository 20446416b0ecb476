//! NormalizedTrade: a validated trade with all derived USD fields.

use crate::domain::{Currency, CurrencyPair, Decimal, Direction, Platform, Timestamp};
use serde::{Deserialize, Serialize};

/// A trade after normalization. Immutable once built by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTrade {
    /// Stable identifier derived from the defining fields.
    pub trade_key: String,
    pub timestamp: Timestamp,
    pub platform: Platform,
    pub direction: Direction,
    pub currency_pair: CurrencyPair,
    /// Quantity of `currency` bought or sold. Always > 0.
    pub amount: Decimal,
    /// Quantity of `fill_currency` paid or received. May be 0 for forks,
    /// airdrops, ICOs and gifts.
    pub fill_amount: Decimal,
    pub price: Decimal,
    pub currency: Currency,
    pub fill_currency: Currency,
    pub fill_type: Direction,
    /// USD value of the trade.
    pub native_value: Decimal,
    pub native_currency: Currency,
    /// USD per unit of `currency`.
    pub basis: Decimal,
    /// USD per unit of `fill_currency`; 0 when `fill_amount` is 0.
    pub fill_basis: Decimal,
}

impl NormalizedTrade {
    /// Generate a stable key for a trade from the fields that define it.
    pub fn compute_trade_key(
        timestamp: Timestamp,
        platform: &Platform,
        direction: Direction,
        pair: &CurrencyPair,
        amount: &Decimal,
        fill_amount: &Decimal,
        price: &Decimal,
    ) -> String {
        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, &timestamp.to_string());
        hash_var(&mut hasher, platform.as_str());
        hasher.update(if direction == Direction::Buy { b"B" } else { b"S" });
        hash_var(&mut hasher, &pair.to_string());
        hash_var(&mut hasher, &amount.to_canonical_string());
        hash_var(&mut hasher, &fill_amount.to_canonical_string());
        hash_var(&mut hasher, &price.to_canonical_string());
        let hash = hasher.finalize();
        format!("trade:{}", hex::encode(&hash[..12]))
    }

    /// True when this trade has no fill side (zero-cost acquisition).
    pub fn is_zero_cost(&self) -> bool {
        self.fill_amount.is_zero()
    }
}
