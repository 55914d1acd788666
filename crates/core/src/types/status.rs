//! Status enums for payments and catalog refresh.

use serde::{Deserialize, Serialize};

use super::barcode::Barcode;

/// Payment submission status.
///
/// Every submission moves `Idle -> Pending -> Succeeded | Failed`. A settled
/// status stays visible until the next submission starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Idle,
    Pending {
        barcode: Barcode,
        quantity: u32,
    },
    Succeeded {
        barcode: Barcode,
        message: String,
    },
    Failed {
        barcode: Barcode,
        message: String,
    },
}

impl PaymentStatus {
    /// Returns true while a submission is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Returns true once a submission has succeeded or failed.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Failed { .. })
    }
}

/// What a catalog load does with stock held in the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Subtract held cart quantities from freshly loaded stock, shrinking or
    /// dropping lines the fresh stock can no longer cover.
    #[default]
    Reserve,
    /// Replace the mirror verbatim. Held quantities are no longer reflected
    /// in catalog stock.
    Overwrite,
}

impl std::fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reserve => write!(f, "reserve"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

impl std::str::FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserve" => Ok(Self::Reserve),
            "overwrite" => Ok(Self::Overwrite),
            _ => Err(format!("invalid refresh policy: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_payment_status_wire_format() {
        let status = PaymentStatus::Pending {
            barcode: Barcode::parse("A").unwrap(),
            quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"state": "pending", "barcode": "A", "quantity": 2})
        );
        assert_eq!(
            serde_json::to_value(PaymentStatus::Idle).unwrap(),
            json!({"state": "idle"})
        );
    }

    #[test]
    fn test_payment_status_predicates() {
        let barcode = Barcode::parse("A").unwrap();
        assert!(!PaymentStatus::Idle.is_pending());
        assert!(!PaymentStatus::Idle.is_settled());
        assert!(
            PaymentStatus::Failed {
                barcode,
                message: "out of stock".to_owned()
            }
            .is_settled()
        );
    }

    #[test]
    fn test_refresh_policy_round_trip() {
        for policy in [RefreshPolicy::Reserve, RefreshPolicy::Overwrite] {
            assert_eq!(policy.to_string().parse::<RefreshPolicy>(), Ok(policy));
        }
        assert!("merge".parse::<RefreshPolicy>().is_err());
        assert_eq!(RefreshPolicy::default(), RefreshPolicy::Reserve);
    }
}
