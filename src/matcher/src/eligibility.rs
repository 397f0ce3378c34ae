use std::collections::HashSet;

use common::config::MatchingConfig;
use common::model::{Deal, DealStage, Role};

/// Which output lists a deal may appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Eligibility {
    pub needs: bool,
    pub deals: bool,
}

impl Eligibility {
    pub fn grants(&self, role: Role) -> bool {
        match role {
            Role::Needs => self.needs,
            Role::Deal => self.deals,
        }
    }
}

/// Classifies deals against the configured set of accepted corporate ranks.
#[derive(Debug, Clone)]
pub struct EligibilityClassifier {
    accepted_ranks: HashSet<String>,
}

impl EligibilityClassifier {
    pub fn new<I, S>(accepted_ranks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted_ranks: accepted_ranks.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(config.accepted_ranks.iter().cloned())
    }

    pub fn rank_accepted(&self, deal: &Deal) -> bool {
        self.accepted_ranks.contains(&deal.rank)
    }

    pub fn classify(&self, deal: &Deal) -> Eligibility {
        let rank_accepted = self.rank_accepted(deal);

        let needs = matches!(
            deal.stage,
            DealStage::CandidateUndecided | DealStage::CaseInProgress
        ) && rank_accepted
            && !deal.hidden;

        let deals = self.listable(deal.stage, &deal.rank);

        Eligibility { needs, deals }
    }

    /// Deals worth loading at all: listed for sellers already, or undecided with a good rank
    pub fn is_listable(&self, deal: &Deal) -> bool {
        self.classify(deal).deals
    }

    /// Listing for sellers only looks at stage and rank, so raw rows can be
    /// screened before their amounts are parsed
    pub fn listable(&self, stage: DealStage, rank: &str) -> bool {
        (stage == DealStage::CandidateUndecided && self.accepted_ranks.contains(rank))
            || matches!(
                stage,
                DealStage::BeforeCommissioning | DealStage::CaseInProgress
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(stage: DealStage, rank: &str, hidden: bool) -> Deal {
        Deal {
            id: "d1".to_string(),
            stage,
            rank: rank.to_string(),
            hidden,
            ..Default::default()
        }
    }

    fn classifier() -> EligibilityClassifier {
        EligibilityClassifier::new(["S", "A", "B", "B-"])
    }

    #[test]
    fn test_candidate_undecided_with_accepted_rank() {
        let e = classifier().classify(&deal(DealStage::CandidateUndecided, "A", false));
        assert_eq!(e, Eligibility { needs: true, deals: true });
    }

    #[test]
    fn test_candidate_undecided_with_other_rank() {
        let e = classifier().classify(&deal(DealStage::CandidateUndecided, "C", false));
        assert_eq!(e, Eligibility { needs: false, deals: false });
    }

    #[test]
    fn test_case_in_progress() {
        let c = classifier();
        assert_eq!(
            c.classify(&deal(DealStage::CaseInProgress, "S", false)),
            Eligibility { needs: true, deals: true }
        );
        // rank only matters for the needs list here
        assert_eq!(
            c.classify(&deal(DealStage::CaseInProgress, "C", false)),
            Eligibility { needs: false, deals: true }
        );
    }

    #[test]
    fn test_hidden_deal_never_listed_for_needs() {
        let e = classifier().classify(&deal(DealStage::CaseInProgress, "A", true));
        assert_eq!(e, Eligibility { needs: false, deals: true });
    }

    #[test]
    fn test_before_commissioning() {
        let e = classifier().classify(&deal(DealStage::BeforeCommissioning, "A", false));
        assert_eq!(e, Eligibility { needs: false, deals: true });
    }

    #[test]
    fn test_other_stage() {
        let e = classifier().classify(&deal(DealStage::Other, "A", false));
        assert_eq!(e, Eligibility::default());
    }

    #[test]
    fn test_rank_is_membership_not_ordering() {
        let c = EligibilityClassifier::new(["B"]);
        assert!(!c.rank_accepted(&deal(DealStage::Other, "A", false)));
        assert!(c.rank_accepted(&deal(DealStage::Other, "B", false)));
        assert!(!c.rank_accepted(&deal(DealStage::Other, "B-", false)));
    }

    #[test]
    fn test_listable_agrees_with_classify() {
        let c = classifier();
        for stage in [
            DealStage::BeforeCommissioning,
            DealStage::CaseInProgress,
            DealStage::CandidateUndecided,
            DealStage::Other,
        ] {
            for rank in ["S", "C", ""] {
                let d = deal(stage, rank, true);
                assert_eq!(c.listable(stage, rank), c.is_listable(&d), "{stage:?} {rank}");
            }
        }
    }

    #[test]
    fn test_grants() {
        let e = Eligibility { needs: true, deals: false };
        assert!(e.grants(Role::Needs));
        assert!(!e.grants(Role::Deal));
    }
}
