// =============================================================================
// Risk Levels — fixed-percentage stop-loss with R-multiple take-profits
// =============================================================================
//
//   sl   = entry * (1 - risk_pct)
//   R    = entry - sl
//   tp1  = entry + R * tp1_reward_multiple      (1:3 by default)
//   tp2  = entry + R * tp2_reward_multiple      (1:5 by default)
// =============================================================================

use serde::Serialize;

use crate::runtime_config::SignalParams;

/// Exit levels for a long entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskLevels {
    pub sl_price: f64,
    pub tp1_price: f64,
    pub tp2_price: f64,
}

impl RiskLevels {
    pub fn for_long(entry_price: f64, params: &SignalParams) -> Self {
        let sl_price = entry_price * (1.0 - params.risk_pct);
        let risk_distance = entry_price - sl_price;
        Self {
            sl_price,
            tp1_price: entry_price + risk_distance * params.tp1_reward_multiple,
            tp2_price: entry_price + risk_distance * params.tp2_reward_multiple,
        }
    }
}
