//! Fair reviewer selection.
//!
//! Members who reviewed less are more likely to be picked next. With
//! `M = max(count) + 1`, a member with `count` past reviews gets weight
//! `(M - count)^2`, so everyone keeps a non-zero chance and the least busy
//! member is favored quadratically.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use relax_core::config::schema::TeamMember;

use crate::store::{CountStore, StoreError};
use crate::weighted::{self, WeightError, Weighted};

// ─────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────

/// A member who may be picked, with how often they already were.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub count: u64,
}

impl Candidate {
    pub fn new(id: impl Into<String>, count: u64) -> Self {
        Self {
            id: id.into(),
            count,
        }
    }
}

/// Integer chance, in percent, of a candidate being picked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Odds {
    pub id: String,
    pub percent: u32,
}

/// Everything worth knowing about one member as a reviewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewerProfile {
    pub member: TeamMember,
    /// Whether the member can be picked at all.
    pub is_available: bool,
    pub review_count: u64,
    /// For each other member asking for a review, this member's chance of being picked.
    pub odds: Vec<Odds>,
}

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("no eligible reviewers")]
    NoCandidates,

    #[error("unknown team member: {0}")]
    UnknownMember(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Weight(#[from] WeightError),
}

// ─────────────────────────────────────────────
// Weight policy
// ─────────────────────────────────────────────

/// Fairness weight for each count, in the same order.
pub fn fairness_weights(counts: &[u64]) -> Vec<u64> {
    let Some(&max) = counts.iter().max() else {
        return Vec::new();
    };

    counts
        .iter()
        .map(|&count| {
            let gap = (max - count).saturating_add(1);
            gap.saturating_mul(gap)
        })
        .collect()
}

/// Whole-percent share of each weight; floors, so the sum may be under 100.
///
/// A zero total spreads the odds evenly instead of dividing by zero.
pub fn odds_from_weights(weights: &[u64]) -> Vec<u32> {
    if weights.is_empty() {
        return Vec::new();
    }

    let total: u128 = weights.iter().map(|&w| w as u128).sum();
    if total == 0 {
        let even = 100 / weights.len() as u32;
        return vec![even; weights.len()];
    }

    weights
        .iter()
        .map(|&w| (w as u128 * 100 / total) as u32)
        .collect()
}

/// Odds of each candidate other than `self_id` being picked.
pub fn compute_odds(candidates: &[Candidate], self_id: &str) -> Vec<Odds> {
    let others: Vec<&Candidate> = candidates.iter().filter(|c| c.id != self_id).collect();
    let counts: Vec<u64> = others.iter().map(|c| c.count).collect();
    let percents = odds_from_weights(&fairness_weights(&counts));

    others
        .into_iter()
        .zip(percents)
        .map(|(candidate, percent)| Odds {
            id: candidate.id.clone(),
            percent,
        })
        .collect()
}

/// Whether a member can ever review: bots and restricted accounts cannot.
pub fn is_available(member: &TeamMember) -> bool {
    !member.is_bot && !member.is_restricted
}

/// Members who may review a request from `requester`.
pub fn eligible<'a>(team: &'a [TeamMember], requester: &str) -> Vec<&'a TeamMember> {
    team.iter()
        .filter(|m| is_available(m) && m.id != requester)
        .collect()
}

/// Choose one candidate by fairness weight.
pub fn choose<'a, R>(
    candidates: &'a [Candidate],
    rng: &mut R,
) -> Result<&'a Candidate, SelectionError>
where
    R: Rng + ?Sized,
{
    if candidates.is_empty() {
        return Err(SelectionError::NoCandidates);
    }

    let counts: Vec<u64> = candidates.iter().map(|c| c.count).collect();
    let entries: Vec<Weighted<&Candidate>> = candidates
        .iter()
        .zip(fairness_weights(&counts))
        .map(|(candidate, weight)| Weighted::new(candidate, weight))
        .collect();

    Ok(*weighted::pick(&entries, rng)?)
}

// ─────────────────────────────────────────────
// FairnessSelector
// ─────────────────────────────────────────────

/// Picks reviewers and keeps their counts in a [`CountStore`].
#[derive(Clone)]
pub struct FairnessSelector {
    store: Arc<dyn CountStore>,
}

impl FairnessSelector {
    pub fn new(store: Arc<dyn CountStore>) -> Self {
        Self { store }
    }

    /// Current counts for `ids`, as candidates.
    pub async fn candidates(&self, ids: &[String]) -> Result<Vec<Candidate>, SelectionError> {
        let counts = self.store.get_all(ids).await?;
        Ok(ids
            .iter()
            .zip(counts)
            .map(|(id, count)| Candidate::new(id.clone(), count))
            .collect())
    }

    /// Pick one of `candidates` and record the assignment.
    ///
    /// The winner is returned with its count after the increment.
    pub async fn pick_fair(&self, candidates: &[Candidate]) -> Result<Candidate, SelectionError> {
        let mut rng = StdRng::from_entropy();
        self.pick_fair_with(candidates, &mut rng).await
    }

    /// [`FairnessSelector::pick_fair`] with a caller-supplied random source.
    pub async fn pick_fair_with<R>(
        &self,
        candidates: &[Candidate],
        rng: &mut R,
    ) -> Result<Candidate, SelectionError>
    where
        R: Rng + Send + ?Sized,
    {
        let chosen = choose(candidates, rng)?;
        let count = self.store.increment(&chosen.id).await?;

        debug!(candidates = candidates.len(), previous = chosen.count, "fair pick");
        info!(reviewer = %chosen.id, count = count, "reviewer selected");

        Ok(Candidate::new(chosen.id.clone(), count))
    }

    /// Pick a reviewer from `team` for `requester`.
    pub async fn pick_reviewer(
        &self,
        team: &[TeamMember],
        requester: &str,
    ) -> Result<(TeamMember, u64), SelectionError> {
        let pool = eligible(team, requester);
        if pool.is_empty() {
            return Err(SelectionError::NoCandidates);
        }

        let ids: Vec<String> = pool.iter().map(|m| m.id.clone()).collect();
        let candidates = self.candidates(&ids).await?;
        let winner = self.pick_fair(&candidates).await?;

        let member = pool
            .into_iter()
            .find(|m| m.id == winner.id)
            .cloned()
            .ok_or_else(|| SelectionError::UnknownMember(winner.id.clone()))?;

        Ok((member, winner.count))
    }

    /// Everyone's current chance of being picked for `requester`.
    pub async fn odds_for(
        &self,
        team: &[TeamMember],
        requester: &str,
    ) -> Result<Vec<(TeamMember, Odds)>, SelectionError> {
        let pool = eligible(team, requester);
        let ids: Vec<String> = pool.iter().map(|m| m.id.clone()).collect();
        let candidates = self.candidates(&ids).await?;

        Ok(pool
            .into_iter()
            .cloned()
            .zip(compute_odds(&candidates, requester))
            .collect())
    }

    /// Count, availability, and per-requester odds for `member_id`.
    pub async fn reviewer_profile(
        &self,
        team: &[TeamMember],
        member_id: &str,
    ) -> Result<ReviewerProfile, SelectionError> {
        let member = team
            .iter()
            .find(|m| m.id == member_id)
            .cloned()
            .ok_or_else(|| SelectionError::UnknownMember(member_id.to_string()))?;

        let ids: Vec<String> = team.iter().map(|m| m.id.clone()).collect();
        let all = self.candidates(&ids).await?;
        let review_count = all
            .iter()
            .find(|c| c.id == member_id)
            .map_or(0, |c| c.count);

        let mut odds = Vec::new();
        for requester in team.iter().filter(|m| m.id != member_id) {
            let pool: Vec<Candidate> = eligible(team, &requester.id)
                .into_iter()
                .filter_map(|m| all.iter().find(|c| c.id == m.id).cloned())
                .collect();
            let percent = compute_odds(&pool, &requester.id)
                .into_iter()
                .find(|o| o.id == member_id)
                .map_or(0, |o| o.percent);

            odds.push(Odds {
                id: requester.id.clone(),
                percent,
            });
        }

        Ok(ReviewerProfile {
            is_available: is_available(&member),
            member,
            review_count,
            odds,
        })
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCountStore;
    use async_trait::async_trait;

    fn team() -> Vec<TeamMember> {
        let mut bot = TeamMember::new("B1", "Deploy Bot");
        bot.is_bot = true;
        let mut guest = TeamMember::new("G1", "Guest");
        guest.is_restricted = true;
        vec![
            TeamMember::new("U1", "Ada"),
            TeamMember::new("U2", "Grace"),
            TeamMember::new("U3", "Linus"),
            bot,
            guest,
        ]
    }

    fn selector(counts: &[(&str, u64)]) -> (FairnessSelector, Arc<MemoryCountStore>) {
        let store = Arc::new(MemoryCountStore::with_counts(counts.iter().copied()));
        (FairnessSelector::new(store.clone()), store)
    }

    /// Count store that is always down.
    struct BrokenStore;

    #[async_trait]
    impl CountStore for BrokenStore {
        async fn get(&self, _id: &str) -> Result<u64, StoreError> {
            Err(StoreError::Payload("down".into()))
        }
        async fn get_all(&self, _ids: &[String]) -> Result<Vec<u64>, StoreError> {
            Err(StoreError::Payload("down".into()))
        }
        async fn increment(&self, _id: &str) -> Result<u64, StoreError> {
            Err(StoreError::Payload("down".into()))
        }
    }

    #[test]
    fn test_weights_favor_low_counts() {
        let weights = fairness_weights(&[0, 0, 5]);
        assert_eq!(weights, vec![36, 36, 1]);
        assert!(weights.iter().all(|&w| w > 0));
    }

    #[test]
    fn test_weights_equal_counts() {
        assert_eq!(fairness_weights(&[4, 4, 4]), vec![1, 1, 1]);
        assert!(fairness_weights(&[]).is_empty());
    }

    #[test]
    fn test_weights_never_zero_at_extremes() {
        let weights = fairness_weights(&[0, u64::MAX]);
        assert!(weights.iter().all(|&w| w > 0));
    }

    #[test]
    fn test_odds_floor_percentages() {
        assert_eq!(odds_from_weights(&[36, 36, 1]), vec![49, 49, 1]);
        assert_eq!(odds_from_weights(&[1, 3]), vec![25, 75]);
    }

    #[test]
    fn test_odds_edge_cases() {
        assert_eq!(odds_from_weights(&[7]), vec![100]);
        assert_eq!(odds_from_weights(&[0, 0, 0]), vec![33, 33, 33]);
        assert_eq!(odds_from_weights(&[0, 4]), vec![0, 100]);
        assert!(odds_from_weights(&[]).is_empty());
    }

    #[test]
    fn test_compute_odds_excludes_self() {
        let candidates = vec![
            Candidate::new("U1", 0),
            Candidate::new("U2", 0),
            Candidate::new("U3", 2),
        ];
        let odds = compute_odds(&candidates, "U3");
        assert_eq!(
            odds,
            vec![
                Odds { id: "U1".into(), percent: 50 },
                Odds { id: "U2".into(), percent: 50 },
            ]
        );

        let single = compute_odds(&candidates[..2], "U1");
        assert_eq!(single, vec![Odds { id: "U2".into(), percent: 100 }]);
    }

    #[test]
    fn test_eligible_default_exclusion() {
        let team = team();
        let ids: Vec<&str> = eligible(&team, "U2").iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["U1", "U3"]);
    }

    #[test]
    fn test_choose_empty() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            choose(&[], &mut rng),
            Err(SelectionError::NoCandidates)
        ));
    }

    #[test]
    fn test_choose_prefers_fewer_reviews() {
        let candidates = vec![Candidate::new("busy", 3), Candidate::new("idle", 0)];
        let mut rng = StdRng::seed_from_u64(7);
        let mut idle = 0;
        for _ in 0..10_000 {
            if choose(&candidates, &mut rng).unwrap().id == "idle" {
                idle += 1;
            }
        }
        // Weights 1 and 16: idle should win about 94% of the time.
        assert!((9_100..9_700).contains(&idle), "idle picked {idle} times");
    }

    #[tokio::test]
    async fn test_pick_fair_increments_winner_once() {
        let (selector, store) = selector(&[("U1", 2)]);
        let candidates = vec![Candidate::new("U1", 2)];

        let winner = selector.pick_fair(&candidates).await.unwrap();

        assert_eq!(winner, Candidate::new("U1", 3));
        assert_eq!(store.get("U1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_pick_fair_empty_is_distinct_error() {
        let (selector, _) = selector(&[]);
        assert!(matches!(
            selector.pick_fair(&[]).await,
            Err(SelectionError::NoCandidates)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let selector = FairnessSelector::new(Arc::new(BrokenStore));
        let err = selector.pick_reviewer(&team(), "U1").await.unwrap_err();
        assert!(matches!(err, SelectionError::Store(_)));
    }

    #[tokio::test]
    async fn test_pick_reviewer_never_picks_excluded() {
        let (selector, store) = selector(&[]);
        let team = team();

        for _ in 0..30 {
            let (member, _) = selector.pick_reviewer(&team, "U1").await.unwrap();
            assert!(member.id == "U2" || member.id == "U3");
        }

        let ids = vec!["U1".to_string(), "U2".to_string(), "U3".to_string()];
        let counts = store.get_all(&ids).await.unwrap();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[1] + counts[2], 30);
    }

    #[tokio::test]
    async fn test_pick_reviewer_balances_over_time() {
        let (selector, store) = selector(&[]);
        let team = team();

        for _ in 0..60 {
            selector.pick_reviewer(&team, "U1").await.unwrap();
        }

        let ids = vec!["U2".to_string(), "U3".to_string()];
        let counts = store.get_all(&ids).await.unwrap();
        let spread = counts[0].abs_diff(counts[1]);
        assert!(spread <= 10, "counts drifted apart: {:?}", counts);
    }

    #[tokio::test]
    async fn test_pick_reviewer_no_one_left() {
        let (selector, _) = selector(&[]);
        let team = vec![TeamMember::new("U1", "Solo")];
        assert!(matches!(
            selector.pick_reviewer(&team, "U1").await,
            Err(SelectionError::NoCandidates)
        ));
    }

    #[tokio::test]
    async fn test_odds_for_requester() {
        let (selector, _) = selector(&[("U2", 1)]);
        let odds = selector.odds_for(&team(), "U1").await.unwrap();

        // U2 has weight 1, U3 has weight 4.
        let summary: Vec<(&str, u32)> = odds
            .iter()
            .map(|(m, o)| (m.id.as_str(), o.percent))
            .collect();
        assert_eq!(summary, vec![("U2", 20), ("U3", 80)]);
    }

    #[tokio::test]
    async fn test_reviewer_profile() {
        let (selector, _) = selector(&[("U1", 0), ("U2", 1), ("U3", 1)]);
        let profile = selector.reviewer_profile(&team(), "U1").await.unwrap();

        assert!(profile.is_available);
        assert_eq!(profile.review_count, 0);
        assert_eq!(profile.member.name, "Ada");

        let by_requester: Vec<(&str, u32)> = profile
            .odds
            .iter()
            .map(|o| (o.id.as_str(), o.percent))
            .collect();
        // Pool for U2 is {U1:0, U3:1} → weights 4 and 1.
        assert_eq!(
            by_requester,
            vec![("U2", 80), ("U3", 80), ("B1", 66), ("G1", 66)]
        );
    }

    #[tokio::test]
    async fn test_profile_of_bot_is_unavailable() {
        let (selector, _) = selector(&[]);
        let profile = selector.reviewer_profile(&team(), "B1").await.unwrap();
        assert!(!profile.is_available);
        assert!(profile.odds.iter().all(|o| o.percent == 0));
    }

    #[tokio::test]
    async fn test_profile_unknown_member() {
        let (selector, _) = selector(&[]);
        assert!(matches!(
            selector.reviewer_profile(&team(), "nobody").await,
            Err(SelectionError::UnknownMember(_))
        ));
    }
}
