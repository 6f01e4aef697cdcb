//! Held positions.

use crate::domain::{AssetId, Decimal, ParticipantId};
use serde::{Deserialize, Serialize};

/// Quantity of one asset held by one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub participant: ParticipantId,
    pub asset: AssetId,
    /// Non-negative, possibly fractional quantity.
    pub quantity: Decimal,
}

impl Position {
    pub fn new(participant: ParticipantId, asset: AssetId, quantity: Decimal) -> Self {
        Self {
            participant,
            asset,
            quantity,
        }
    }
}
