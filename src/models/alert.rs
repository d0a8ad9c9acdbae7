//! Price alert rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a price threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    /// Fires when the price reaches or exceeds the target.
    Above,
    /// Fires when the price reaches or drops under the target.
    Below,
}

impl AlertCondition {
    /// Whether `price` crosses `target` in this direction. Equality counts.
    pub fn is_met(self, price: Decimal, target: Decimal) -> bool {
        match self {
            Self::Above => price >= target,
            Self::Below => price <= target,
        }
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Above => write!(f, "above"),
            Self::Below => write!(f, "below"),
        }
    }
}

impl std::str::FromStr for AlertCondition {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "above" | ">" | ">=" => Ok(Self::Above),
            "below" | "<" | "<=" => Ok(Self::Below),
            other => Err(crate::Error::validation(format!(
                "unknown alert condition '{}'",
                other
            ))),
        }
    }
}

/// A user's price alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Market data coin id (e.g. "bitcoin").
    pub coin_id: String,
    pub target_price: Decimal,
    pub condition: AlertCondition,
    pub is_active: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PriceAlert {
    /// Active and never triggered.
    pub fn is_armed(&self) -> bool {
        self.is_active && self.triggered_at.is_none()
    }

    /// Whether `price` satisfies this alert's threshold.
    pub fn is_met_by(&self, price: Decimal) -> bool {
        self.condition.is_met(price, self.target_price)
    }
}

/// Insert payload for a new alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPriceAlert {
    pub user_id: Uuid,
    pub coin_id: String,
    pub target_price: Decimal,
    pub condition: AlertCondition,
    pub is_active: bool,
}

impl NewPriceAlert {
    /// Build an active alert.
    pub fn new(
        user_id: Uuid,
        coin_id: impl Into<String>,
        target_price: Decimal,
        condition: AlertCondition,
    ) -> Self {
        Self {
            user_id,
            coin_id: coin_id.into(),
            target_price,
            condition,
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_condition_boundaries() {
        assert!(AlertCondition::Above.is_met(dec!(100), dec!(100)));
        assert!(AlertCondition::Above.is_met(dec!(100.01), dec!(100)));
        assert!(!AlertCondition::Above.is_met(dec!(99.99), dec!(100)));

        assert!(AlertCondition::Below.is_met(dec!(100), dec!(100)));
        assert!(AlertCondition::Below.is_met(dec!(99.99), dec!(100)));
        assert!(!AlertCondition::Below.is_met(dec!(100.01), dec!(100)));
    }

    #[test]
    fn test_condition_parse() {
        assert_eq!("Above".parse::<AlertCondition>().unwrap(), AlertCondition::Above);
        assert_eq!("<".parse::<AlertCondition>().unwrap(), AlertCondition::Below);
        assert!("sideways".parse::<AlertCondition>().is_err());
    }

    #[test]
    fn test_condition_wire_format() {
        let json = serde_json::to_string(&AlertCondition::Below).unwrap();
        assert_eq!(json, "\"below\"");
    }
}
