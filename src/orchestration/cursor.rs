//! Bounded-size paging over a season's participants.

use crate::db::Repository;
use crate::domain::{ParticipantId, SeasonId};
use crate::error::{RankingError, StoreOp};
use crate::orchestration::store_call;

/// A slice of participant ids and the offset it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub participants: Vec<ParticipantId>,
}

/// Yields disjoint, ascending pages of participant ids.
///
/// Paging ends at the first empty or short page, or once the offset reaches the
/// participant count taken at the start of the run.
pub struct ParticipantCursor<'a> {
    repo: &'a Repository,
    season: SeasonId,
    page_size: i64,
    total: i64,
    offset: i64,
    exhausted: bool,
}

impl<'a> ParticipantCursor<'a> {
    pub fn new(repo: &'a Repository, season: SeasonId, page_size: i64, total: i64) -> Self {
        Self {
            repo,
            season,
            page_size,
            total,
            offset: 0,
            exhausted: false,
        }
    }

    /// Offset of the next page to be read.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Read the next page, or None once paging is complete.
    ///
    /// # Errors
    /// Fails on any store error, or when participants were counted but the first
    /// page comes back empty.
    pub async fn next_page(&mut self) -> Result<Option<Page>, RankingError> {
        if self.exhausted || self.offset >= self.total {
            self.exhausted = true;
            return Ok(None);
        }

        let offset = self.offset;
        let participants = store_call(
            StoreOp::PageParticipants { offset },
            self.repo
                .page_participants(self.season, self.page_size, offset),
        )
        .await?;

        if participants.is_empty() {
            self.exhausted = true;
            if offset == 0 {
                return Err(RankingError::Invariant(format!(
                    "counted {} participants in season {} but the first page is empty",
                    self.total, self.season
                )));
            }
            return Ok(None);
        }

        if (participants.len() as i64) < self.page_size {
            self.exhausted = true;
        }
        self.offset += self.page_size;

        Ok(Some(Page {
            offset,
            participants,
        }))
    }
}
