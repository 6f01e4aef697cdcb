//! Rank-to-tier policy.
//!
//! Rank 1 gets tier 7, ranks 2 and 3 get tier 6. Ranks 4..N are bucketed by their
//! position within the remainder, `(rank - 3) / max(N - 3, 1)`, against the
//! cumulative percentages below. Comparisons are done in integer arithmetic so the
//! in-process policy and the SQL rendering agree exactly.

use crate::domain::Tier;

/// Cumulative percentage of the remainder and the tier it maps to.
pub const PERCENTILE_TIERS: [(i64, u8); 4] = [(10, 5), (25, 4), (45, 3), (70, 2)];

const RUNNER_UP_TIER: u8 = 6;
const PODIUM_SIZE: i64 = 3;

/// Tier for a 1-based rank among `total` ranked participants.
pub fn tier_for_rank(rank: i64, total: i64) -> Tier {
    if rank <= 1 {
        return Tier::CHAMPION;
    }
    if rank <= PODIUM_SIZE {
        return tier(RUNNER_UP_TIER);
    }

    let relative = rank - PODIUM_SIZE;
    let remainder = (total - PODIUM_SIZE).max(1);
    PERCENTILE_TIERS
        .iter()
        .find(|(pct, _)| relative * 100 <= pct * remainder)
        .map(|&(_, t)| tier(t))
        .unwrap_or(Tier::LOWEST)
}

fn tier(value: u8) -> Tier {
    Tier::new(value).unwrap_or(Tier::LOWEST)
}

/// SQL `CASE` expression equivalent to [`tier_for_rank`].
///
/// `rank_col` and `total_col` must name integer columns in scope.
pub fn tier_case_sql(rank_col: &str, total_col: &str) -> String {
    let remainder = format!("MAX({total_col} - {PODIUM_SIZE}, 1)");
    let mut sql = format!(
        "CASE WHEN {rank_col} <= 1 THEN {champion} WHEN {rank_col} <= {PODIUM_SIZE} THEN {RUNNER_UP_TIER}",
        champion = Tier::CHAMPION.as_u8(),
    );
    for (pct, t) in PERCENTILE_TIERS {
        sql.push_str(&format!(
            " WHEN ({rank_col} - {PODIUM_SIZE}) * 100 <= {pct} * {remainder} THEN {t}"
        ));
    }
    sql.push_str(&format!(" ELSE {} END", Tier::LOWEST.as_u8()));
    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers(total: i64) -> Vec<u8> {
        (1..=total).map(|r| tier_for_rank(r, total).as_u8()).collect()
    }

    #[test]
    fn test_five_participants() {
        assert_eq!(tiers(5), vec![7, 6, 6, 2, 1]);
    }

    #[test]
    fn test_small_fields_never_reach_percentiles() {
        assert_eq!(tiers(1), vec![7]);
        assert_eq!(tiers(2), vec![7, 6]);
        assert_eq!(tiers(3), vec![7, 6, 6]);
    }

    #[test]
    fn test_four_participants_uses_floor_of_one() {
        // remainder = 1, relative rank 1 → 100%
        assert_eq!(tiers(4), vec![7, 6, 6, 1]);
    }

    #[test]
    fn test_thirteen_participants_boundaries() {
        // remainder = 10: relative 1 → 10%, 2 → 20%, 4 → 40%, 7 → 70%, 8 → 80%
        assert_eq!(
            tiers(13),
            vec![7, 6, 6, 5, 4, 3, 3, 2, 2, 2, 1, 1, 1]
        );
    }

    #[test]
    fn test_tiers_never_increase_with_rank() {
        for total in 1..200 {
            let t = tiers(total);
            assert!(t.windows(2).all(|w| w[0] >= w[1]), "total={}", total);
        }
    }

    #[test]
    fn test_exclusive_top_tiers() {
        for total in 1..50 {
            let t = tiers(total);
            assert_eq!(t.iter().filter(|&&x| x == 7).count(), 1);
            let runners_up = t.iter().filter(|&&x| x == 6).count() as i64;
            assert_eq!(runners_up, 2.min(total - 1));
        }
    }

    #[test]
    fn test_case_sql_mentions_every_threshold() {
        let sql = tier_case_sql("r", "n");
        assert!(sql.starts_with("CASE WHEN r <= 1 THEN 7"));
        for (pct, t) in PERCENTILE_TIERS {
            assert!(sql.contains(&format!("<= {} * MAX(n - 3, 1) THEN {}", pct, t)));
        }
        assert!(sql.ends_with("ELSE 1 END"));
    }
}
