// =============================================================================
// Shared types used across the trend scanner
// =============================================================================

use serde::{Deserialize, Serialize};

/// How the exchange connection was established at startup.
///
/// `Live` means API credentials were supplied and accepted by the exchange.
/// `Public` is the unauthenticated fallback; market data endpoints still work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayMode {
    Live,
    Public,
}

impl Default for GatewayMode {
    fn default() -> Self {
        Self::Public
    }
}

impl std::fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => write!(f, "Live"),
            Self::Public => write!(f, "Public"),
        }
    }
}
