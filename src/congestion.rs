//! Congestion score classification.
//!
//! Two threshold tables are in use and are kept apart on purpose:
//! the live single-point monitor bands at 20/40/60 while the aggregated
//! route view bands at 25/50/75. Every comparison is a strict `<`, so a
//! score sitting exactly on a threshold lands in the higher band.

use serde::{Deserialize, Serialize};

/// Severity tier of a congestion score, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CongestionTier {
    Low,
    Moderate,
    High,
    Severe,
}

impl CongestionTier {
    /// Style class used by dashboards (`level-low` .. `level-severe`).
    pub fn css_class(self) -> &'static str {
        match self {
            CongestionTier::Low => "level-low",
            CongestionTier::Moderate => "level-moderate",
            CongestionTier::High => "level-high",
            CongestionTier::Severe => "level-severe",
        }
    }

    /// Route colour scale: green, orange, dark orange, red.
    pub fn color_hex(self) -> &'static str {
        match self {
            CongestionTier::Low => "#10b981",
            CongestionTier::Moderate => "#f59e0b",
            CongestionTier::High => "#f97316",
            CongestionTier::Severe => "#ef4444",
        }
    }
}

/// Result of classifying a score: a tier plus its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CongestionLevel {
    pub tier: CongestionTier,
    pub label: &'static str,
}

/// Named threshold tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CongestionBands {
    /// Single-point live monitor: `<20`, `<40`, `<60`, else severe.
    Live,
    /// Aggregated route view: `<25`, `<50`, `<75`, else severe.
    Route,
}

impl CongestionBands {
    fn thresholds(self) -> [f64; 3] {
        match self {
            CongestionBands::Live => [20.0, 40.0, 60.0],
            CongestionBands::Route => [25.0, 50.0, 75.0],
        }
    }

    fn label(self, tier: CongestionTier) -> &'static str {
        match (self, tier) {
            (CongestionBands::Live, CongestionTier::Low) => "Low Traffic",
            (CongestionBands::Live, CongestionTier::Moderate) => "Moderate Traffic",
            (CongestionBands::Live, CongestionTier::High) => "High Congestion",
            (CongestionBands::Live, CongestionTier::Severe) => "Severe Congestion",
            (CongestionBands::Route, CongestionTier::Low) => "Low",
            (CongestionBands::Route, CongestionTier::Moderate) => "Moderate",
            (CongestionBands::Route, CongestionTier::High) => "High",
            (CongestionBands::Route, CongestionTier::Severe) => "Severe",
        }
    }

    /// Classify a congestion score.
    ///
    /// Total over every `f64`: anything that fails all three `<` tests,
    /// NaN included, is `Severe`.
    pub fn classify(self, score: f64) -> CongestionLevel {
        let [low, moderate, high] = self.thresholds();
        let tier = if score < low {
            CongestionTier::Low
        } else if score < moderate {
            CongestionTier::Moderate
        } else if score < high {
            CongestionTier::High
        } else {
            CongestionTier::Severe
        };
        CongestionLevel { tier, label: self.label(tier) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_band_boundaries() {
        let cases = [
            (0.0, CongestionTier::Low),
            (19.999, CongestionTier::Low),
            (20.0, CongestionTier::Moderate),
            (39.999, CongestionTier::Moderate),
            (40.0, CongestionTier::High),
            (59.999, CongestionTier::High),
            (60.0, CongestionTier::Severe),
            (100.0, CongestionTier::Severe),
        ];
        for (score, tier) in cases {
            assert_eq!(CongestionBands::Live.classify(score).tier, tier, "score {}", score);
        }
    }

    #[test]
    fn test_route_band_boundaries() {
        let cases = [
            (24.999, CongestionTier::Low),
            (25.0, CongestionTier::Moderate),
            (40.0, CongestionTier::Moderate),
            (50.0, CongestionTier::High),
            (74.999, CongestionTier::High),
            (75.0, CongestionTier::Severe),
        ];
        for (score, tier) in cases {
            assert_eq!(CongestionBands::Route.classify(score).tier, tier, "score {}", score);
        }
    }

    #[test]
    fn test_bands_disagree_between_thresholds() {
        // 22 is moderate live traffic but still low on the route scale
        assert_eq!(CongestionBands::Live.classify(22.0).tier, CongestionTier::Moderate);
        assert_eq!(CongestionBands::Route.classify(22.0).tier, CongestionTier::Low);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CongestionBands::Live.classify(70.0).label, "Severe Congestion");
        assert_eq!(CongestionBands::Route.classify(10.0).label, "Low");
        assert_eq!(CongestionTier::High.css_class(), "level-high");
        assert_eq!(CongestionTier::Low.color_hex(), "#10b981");
    }
}
