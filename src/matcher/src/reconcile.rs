use std::collections::{BTreeSet, HashMap};

use common::model::{Deal, ExistingPairRecord, Need, NewPairRecord, Role};

use crate::eligibility::EligibilityClassifier;

/// Records missing for `need` given what is already stored.
///
/// A role already stored for a deal is never emitted again, even when the
/// deal is eligible for it. Output follows `matched` order with the needs
/// role ahead of the deal role for the same deal.
pub fn reconcile(
    existing: &[ExistingPairRecord],
    matched: &[&Deal],
    need: &Need,
    classifier: &EligibilityClassifier,
) -> Vec<NewPairRecord> {
    let mut recorded: HashMap<&str, BTreeSet<Role>> = HashMap::new();
    for pair in existing {
        if let Some(role) = pair.role() {
            recorded.entry(pair.deal_id.as_str()).or_default().insert(role);
        }
    }

    let mut records = Vec::new();
    for deal in matched {
        let roles = recorded.entry(deal.id.as_str()).or_default();
        if roles.len() == Role::ALL.len() {
            continue;
        }

        let eligibility = classifier.classify(deal);
        for role in Role::ALL {
            if roles.contains(&role) || !eligibility.grants(role) {
                continue;
            }

            roles.insert(role);
            records.push(new_record(role, deal, need));
        }
    }

    records
}

fn new_record(role: Role, deal: &Deal, need: &Need) -> NewPairRecord {
    let owner_id = match role {
        Role::Needs => &need.owner_id,
        Role::Deal => &deal.owner_id,
    };

    NewPairRecord {
        role,
        deal_id: deal.id.clone(),
        need_id: need.id.clone(),
        account_id: need.account_id.clone(),
        owner_id: owner_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{DealStage, StoredPair};

    fn classifier() -> EligibilityClassifier {
        EligibilityClassifier::new(["S", "A", "B", "B-"])
    }

    fn need() -> Need {
        Need {
            id: "n1".to_string(),
            owner_id: "need-owner".to_string(),
            account_id: "acc-1".to_string(),
            ..Default::default()
        }
    }

    fn deal(id: &str, stage: DealStage) -> Deal {
        Deal {
            id: id.to_string(),
            owner_id: format!("{id}-owner"),
            stage,
            rank: "A".to_string(),
            ..Default::default()
        }
    }

    fn stored(deal_id: &str, role: Role) -> StoredPair {
        StoredPair {
            need_id: "n1".to_string(),
            sort_key: format!("{}_{}", deal_id, role.sort_suffix()),
            deal_id: deal_id.to_string(),
        }
    }

    fn roles(records: &[NewPairRecord]) -> Vec<(String, Role)> {
        records
            .iter()
            .map(|r| (r.deal_id.clone(), r.role))
            .collect()
    }

    #[test]
    fn test_no_existing_emits_every_granted_role() {
        let d1 = deal("d1", DealStage::CandidateUndecided);
        let d2 = deal("d2", DealStage::BeforeCommissioning);
        let d3 = deal("d3", DealStage::Other);

        let records = reconcile(&[], &[&d1, &d2, &d3], &need(), &classifier());
        assert_eq!(
            roles(&records),
            vec![
                ("d1".to_string(), Role::Needs),
                ("d1".to_string(), Role::Deal),
                ("d2".to_string(), Role::Deal),
            ]
        );
    }

    #[test]
    fn test_owner_depends_on_role() {
        let d1 = deal("d1", DealStage::CaseInProgress);
        let records = reconcile(&[], &[&d1], &need(), &classifier());

        assert_eq!(records[0].role, Role::Needs);
        assert_eq!(records[0].owner_id, "need-owner");
        assert_eq!(records[1].role, Role::Deal);
        assert_eq!(records[1].owner_id, "d1-owner");
        assert!(records.iter().all(|r| r.account_id == "acc-1"));
        assert!(records.iter().all(|r| r.need_id == "n1"));
    }

    #[test]
    fn test_missing_needs_role_only() {
        let d1 = deal("d1", DealStage::CaseInProgress);
        let existing = vec![stored("d1", Role::Deal)];

        let records = reconcile(&existing, &[&d1], &need(), &classifier());
        assert_eq!(roles(&records), vec![("d1".to_string(), Role::Needs)]);
    }

    #[test]
    fn test_missing_role_not_granted() {
        // before-commissioning is never listed for needs
        let d1 = deal("d1", DealStage::BeforeCommissioning);
        let existing = vec![stored("d1", Role::Deal)];

        let records = reconcile(&existing, &[&d1], &need(), &classifier());
        assert!(records.is_empty());
    }

    #[test]
    fn test_fully_recorded_deal_is_skipped() {
        let d1 = deal("d1", DealStage::CaseInProgress);
        let existing = vec![stored("d1", Role::Needs), stored("d1", Role::Deal)];

        let records = reconcile(&existing, &[&d1], &need(), &classifier());
        assert!(records.is_empty());
    }

    #[test]
    fn test_records_of_other_deals_are_ignored() {
        let d1 = deal("d1", DealStage::CaseInProgress);
        let existing = vec![stored("d2", Role::Needs), stored("d2", Role::Deal)];

        let records = reconcile(&existing, &[&d1], &need(), &classifier());
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_duplicate_matched_deal_emits_once() {
        let d1 = deal("d1", DealStage::CaseInProgress);

        let records = reconcile(&[], &[&d1, &d1], &need(), &classifier());
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let d1 = deal("d1", DealStage::CandidateUndecided);
        let d2 = deal("d2", DealStage::BeforeCommissioning);
        let matched = [&d1, &d2];

        let first = reconcile(&[], &matched, &need(), &classifier());
        assert!(!first.is_empty());

        let existing: Vec<StoredPair> = first.iter().map(NewPairRecord::to_stored).collect();
        let second = reconcile(&existing, &matched, &need(), &classifier());
        assert!(second.is_empty());
    }
}
