//! TTL Policy Module
//!
//! Static table of named cache lifetimes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

// == TTL Policy ==
/// Named cache lifetimes, one per class of cached data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlPolicy {
    /// Live market quote
    ShortQuote,
    /// Company fundamentals
    Fundamentals,
    /// Technical indicators
    Technicals,
    /// Generated research report
    AiReport,
    News,
    /// Trading agent output
    AgentReport,
    /// Macro-economic series
    Macro,
}

impl TtlPolicy {
    /// Every policy, in table order.
    pub const ALL: [TtlPolicy; 7] = [
        TtlPolicy::ShortQuote,
        TtlPolicy::Fundamentals,
        TtlPolicy::Technicals,
        TtlPolicy::AiReport,
        TtlPolicy::News,
        TtlPolicy::AgentReport,
        TtlPolicy::Macro,
    ];

    /// Lifetime in seconds.
    pub const fn seconds(self) -> u64 {
        match self {
            TtlPolicy::ShortQuote => 300,
            TtlPolicy::Fundamentals => 3600,
            TtlPolicy::Technicals => 600,
            TtlPolicy::AiReport => 7200,
            TtlPolicy::News => 1800,
            TtlPolicy::AgentReport => 1800,
            TtlPolicy::Macro => 86400,
        }
    }

    /// Table name of the policy.
    pub const fn name(self) -> &'static str {
        match self {
            TtlPolicy::ShortQuote => "short_quote",
            TtlPolicy::Fundamentals => "fundamentals",
            TtlPolicy::Technicals => "technicals",
            TtlPolicy::AiReport => "ai_report",
            TtlPolicy::News => "news",
            TtlPolicy::AgentReport => "agent_report",
            TtlPolicy::Macro => "macro",
        }
    }
}

impl fmt::Display for TtlPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TtlPolicy {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TtlPolicy::ALL
            .into_iter()
            .find(|policy| policy.name() == s)
            .ok_or_else(|| CacheError::NotFound(format!("TTL policy '{}'", s)))
    }
}

// == TTL ==
/// Lifetime selected by a cached operation: a named policy or an explicit
/// number of seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Policy(TtlPolicy),
    Seconds(u64),
}

impl Ttl {
    /// Lifetime in seconds. An explicit `Seconds(0)` is passed through and
    /// rejected by the store.
    pub fn as_secs(self) -> u64 {
        match self {
            Ttl::Policy(policy) => policy.seconds(),
            Ttl::Seconds(secs) => secs,
        }
    }
}

impl From<TtlPolicy> for Ttl {
    fn from(policy: TtlPolicy) -> Self {
        Ttl::Policy(policy)
    }
}

impl From<u64> for Ttl {
    fn from(secs: u64) -> Self {
        Ttl::Seconds(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        let table: Vec<(&str, u64)> = TtlPolicy::ALL
            .iter()
            .map(|p| (p.name(), p.seconds()))
            .collect();

        assert_eq!(
            table,
            vec![
                ("short_quote", 300),
                ("fundamentals", 3600),
                ("technicals", 600),
                ("ai_report", 7200),
                ("news", 1800),
                ("agent_report", 1800),
                ("macro", 86400),
            ]
        );
    }

    #[test]
    fn test_policy_from_name() {
        assert_eq!("macro".parse::<TtlPolicy>().unwrap(), TtlPolicy::Macro);
        assert!("weekly".parse::<TtlPolicy>().is_err());
    }

    #[test]
    fn test_policy_serde_name_matches_display() {
        for policy in TtlPolicy::ALL {
            let json = serde_json::to_string(&policy).unwrap();
            assert_eq!(json, format!("\"{}\"", policy));
        }
    }

    #[test]
    fn test_ttl_override() {
        assert_eq!(Ttl::from(TtlPolicy::News).as_secs(), 1800);
        assert_eq!(Ttl::from(42u64).as_secs(), 42);
    }
}
