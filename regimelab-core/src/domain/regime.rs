//! Regime — closed set of market-state labels.

use serde::{Deserialize, Serialize};

/// Market regime label assigned per trading day.
///
/// The set is closed: the classifier maps every raw cluster onto one of
/// these four, falling back to `Trending` for clusters without an explicit
/// mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// Low volatility, narrow range.
    Consolidation,
    /// Clear direction, sustained momentum.
    Trending,
    /// High volatility, sharp decline.
    Panic,
    /// High volatility, sharp advance.
    Euphoria,
}

impl Regime {
    pub const ALL: [Regime; 4] = [
        Regime::Consolidation,
        Regime::Trending,
        Regime::Panic,
        Regime::Euphoria,
    ];

    /// Stable numeric id (0..4).
    pub fn id(&self) -> usize {
        match self {
            Regime::Consolidation => 0,
            Regime::Trending => 1,
            Regime::Panic => 2,
            Regime::Euphoria => 3,
        }
    }

    pub fn from_id(id: usize) -> Option<Regime> {
        Regime::ALL.get(id).copied()
    }

    /// Canonical English name.
    pub fn name(&self) -> &'static str {
        match self {
            Regime::Consolidation => "Consolidation",
            Regime::Trending => "Trending",
            Regime::Panic => "Panic",
            Regime::Euphoria => "Euphoria",
        }
    }

    /// Localized display name.
    pub fn local_name(&self) -> &'static str {
        match self {
            Regime::Consolidation => "震荡",
            Regime::Trending => "趋势",
            Regime::Panic => "恐慌",
            Regime::Euphoria => "狂热",
        }
    }

    pub fn from_name(name: &str) -> Option<Regime> {
        Regime::ALL.iter().copied().find(|r| r.name() == name)
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for regime in Regime::ALL {
            assert_eq!(Regime::from_id(regime.id()), Some(regime));
        }
        assert_eq!(Regime::from_id(4), None);
    }

    #[test]
    fn names_round_trip() {
        for regime in Regime::ALL {
            assert_eq!(Regime::from_name(regime.name()), Some(regime));
        }
        assert_eq!(Regime::from_name("Sideways"), None);
    }

    #[test]
    fn display_uses_canonical_name() {
        assert_eq!(Regime::Panic.to_string(), "Panic");
    }
}
