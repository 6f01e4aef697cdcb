//! Portfolio valuation: cash plus positions marked at snapshot prices.

use crate::domain::{Decimal, ParticipantId, Position, PriceSnapshot, StagedValuation};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValuationError {
    #[error("total value of participant {0} overflows the minor-unit range")]
    Overflow(ParticipantId),
}

/// Truncated total value of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub total_value: i64,
    /// Positions whose asset had no price in the snapshot.
    pub unpriced_positions: usize,
}

/// Computes `cash + Σ quantity × price`, truncated toward zero.
///
/// A position whose asset is absent from the snapshot contributes zero.
pub fn value_participant(
    participant: ParticipantId,
    cash: i64,
    positions: &[Position],
    prices: &PriceSnapshot,
) -> Result<Valuation, ValuationError> {
    let overflow = || ValuationError::Overflow(participant);

    let mut total = Decimal::from(cash);
    let mut unpriced_positions = 0;

    for position in positions {
        let Some(price) = prices.price_of(position.asset) else {
            unpriced_positions += 1;
            continue;
        };
        let value = position.quantity.checked_mul(price).ok_or_else(overflow)?;
        total = total.checked_add(value).ok_or_else(overflow)?;
    }

    Ok(Valuation {
        total_value: total.trunc_to_i64().ok_or_else(overflow)?,
        unpriced_positions,
    })
}

/// Valuations of one page plus counters for degraded inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageValuation {
    pub rows: Vec<StagedValuation>,
    pub missing_cash: usize,
    pub unpriced_positions: usize,
}

/// Value every participant of a page, in page order.
///
/// Participants without a cash row are valued with zero cash.
pub fn value_page(
    participants: &[ParticipantId],
    cash: &HashMap<ParticipantId, i64>,
    positions: &HashMap<ParticipantId, Vec<Position>>,
    prices: &PriceSnapshot,
) -> Result<PageValuation, ValuationError> {
    let mut page = PageValuation {
        rows: Vec::with_capacity(participants.len()),
        ..Default::default()
    };

    for &participant in participants {
        let participant_cash = match cash.get(&participant) {
            Some(&c) => c,
            None => {
                page.missing_cash += 1;
                0
            }
        };
        let held = positions
            .get(&participant)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let valuation = value_participant(participant, participant_cash, held, prices)?;
        page.unpriced_positions += valuation.unpriced_positions;
        page.rows.push(StagedValuation {
            participant,
            total_value: valuation.total_value,
        });
    }

    Ok(page)
}
