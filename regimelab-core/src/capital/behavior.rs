//! Rule-based behavior classification over (return, volume-ratio) pairs.
//!
//! Deterministic, non-overlapping partition; rules are checked in the order
//! listed, so every pair lands in exactly one class:
//! 1. price down  & volume high → Accumulation
//! 2. price up    & volume high → Distribution
//! 3. price up    & volume normal/low → Pump
//! 4. price down  & volume normal/low → Dump
//! 5. otherwise → Sideways (including NaN inputs)

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behavior {
    Accumulation,
    Distribution,
    Pump,
    Dump,
    Sideways,
}

impl Behavior {
    pub const ALL: [Behavior; 5] = [
        Behavior::Accumulation,
        Behavior::Distribution,
        Behavior::Pump,
        Behavior::Dump,
        Behavior::Sideways,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Accumulation => "Accumulation",
            Behavior::Distribution => "Distribution",
            Behavior::Pump => "Pump",
            Behavior::Dump => "Dump",
            Behavior::Sideways => "Sideways",
        }
    }

    /// Localized display name.
    pub fn local_name(&self) -> &'static str {
        match self {
            Behavior::Accumulation => "吸筹",
            Behavior::Distribution => "派发",
            Behavior::Pump => "拉升",
            Behavior::Dump => "砸盘",
            Behavior::Sideways => "横盘",
        }
    }
}

/// Classification thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BehaviorThresholds {
    /// |return| beyond this counts as a price move (fraction).
    pub price_move: f64,
    /// volume / rolling-average ratio above this counts as high volume.
    pub volume_high: f64,
    /// ... and below this as low volume (informational; the partition only
    /// distinguishes high vs not-high).
    pub volume_low: f64,
}

impl Default for BehaviorThresholds {
    fn default() -> Self {
        Self {
            price_move: 0.01,
            volume_high: 1.2,
            volume_low: 0.8,
        }
    }
}

/// Classify one (return, volume-ratio) pair.
pub fn classify(ret: f64, volume_ratio: f64, t: &BehaviorThresholds) -> Behavior {
    let price_up = ret > t.price_move;
    let price_down = ret < -t.price_move;
    let volume_high = volume_ratio > t.volume_high;

    if price_down && volume_high {
        Behavior::Accumulation
    } else if price_up && volume_high {
        Behavior::Distribution
    } else if price_up {
        Behavior::Pump
    } else if price_down {
        Behavior::Dump
    } else {
        Behavior::Sideways
    }
}

/// Classify a whole series.
pub fn classify_series(
    returns: &[f64],
    volume_ratios: &[f64],
    t: &BehaviorThresholds,
) -> Vec<Behavior> {
    returns
        .iter()
        .zip(volume_ratios)
        .map(|(&r, &vr)| classify(r, vr, t))
        .collect()
}
