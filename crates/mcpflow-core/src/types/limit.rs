//! Call limits

use serde::{Deserialize, Serialize};

/// A cap on tool calls; stored in settings as an integer where any negative
/// value means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum CallLimit {
    Unlimited,
    Limited(u32),
}

impl From<i64> for CallLimit {
    fn from(value: i64) -> Self {
        if value < 0 {
            CallLimit::Unlimited
        } else {
            CallLimit::Limited(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }
}

impl From<CallLimit> for i64 {
    fn from(limit: CallLimit) -> Self {
        match limit {
            CallLimit::Unlimited => -1,
            CallLimit::Limited(n) => i64::from(n),
        }
    }
}

impl CallLimit {
    /// `count` calls stay within the limit
    pub fn allows(&self, count: u32) -> bool {
        match self {
            CallLimit::Unlimited => true,
            CallLimit::Limited(n) => count <= *n,
        }
    }

    /// `count` has reached the limit, so no further call is allowed
    pub fn is_reached(&self, count: u32) -> bool {
        match self {
            CallLimit::Unlimited => false,
            CallLimit::Limited(n) => count >= *n,
        }
    }
}

impl std::fmt::Display for CallLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallLimit::Unlimited => write!(f, "unlimited"),
            CallLimit::Limited(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_forms() {
        assert_eq!(CallLimit::from(-1), CallLimit::Unlimited);
        assert_eq!(CallLimit::from(-7), CallLimit::Unlimited);
        assert_eq!(CallLimit::from(0), CallLimit::Limited(0));
        assert_eq!(i64::from(CallLimit::Limited(5)), 5);

        let parsed: CallLimit = serde_yaml::from_str("-1").unwrap();
        assert_eq!(parsed, CallLimit::Unlimited);
    }

    #[test]
    fn test_zero_allows_nothing() {
        let zero = CallLimit::Limited(0);
        assert!(zero.is_reached(0));
        assert!(!zero.allows(1));
    }

    #[test]
    fn test_unlimited() {
        assert!(CallLimit::Unlimited.allows(u32::MAX));
        assert!(!CallLimit::Unlimited.is_reached(u32::MAX));
        assert_eq!(CallLimit::Unlimited.to_string(), "unlimited");
    }
}
