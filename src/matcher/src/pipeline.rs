use common::config::MatchingConfig;
use common::model::{Deal, Need};

use crate::range::{AmountRange, within_any, within_range};

/// Where a need's industry criteria come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy<'n> {
    /// Legacy single industry list, matched against the deal's single industry code
    Legacy { industries: &'n [String] },
    /// Current industry list, matched against the deal's three industry codes
    Current { industries: &'n [String] },
}

impl<'n> MatchStrategy<'n> {
    /// Needs that still carry the legacy list keep using it
    pub fn for_need(need: &'n Need) -> Self {
        if need.legacy_industries.is_empty() {
            MatchStrategy::Current {
                industries: &need.industries,
            }
        } else {
            MatchStrategy::Legacy {
                industries: &need.legacy_industries,
            }
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, MatchStrategy::Legacy { .. })
    }

    /// True when any of the deal's industry codes is wanted
    pub fn industry_matches(&self, deal: &Deal) -> bool {
        match self {
            MatchStrategy::Legacy { industries } => {
                !deal.legacy_industry.is_empty() && industries.contains(&deal.legacy_industry)
            }
            MatchStrategy::Current { industries } => {
                deal.industries.iter().any(|code| industries.contains(code))
            }
        }
    }
}

/// The three narrowing stages run for every need.
#[derive(Debug, Clone)]
pub struct MatchingPipeline {
    outside_home_region: String,
}

impl MatchingPipeline {
    pub fn new(outside_home_region: impl Into<String>) -> Self {
        Self {
            outside_home_region: outside_home_region.into(),
        }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(config.outside_home_region.clone())
    }

    /// Location and industry criteria.
    ///
    /// Location matches by region (never for the outside-home-country region)
    /// or by country of residence.
    pub fn base_filter<'d>(
        &self,
        need: &Need,
        strategy: MatchStrategy<'_>,
        deals: impl IntoIterator<Item = &'d Deal>,
    ) -> Vec<&'d Deal> {
        deals
            .into_iter()
            .filter(|deal| self.location_matches(need, deal) && strategy.industry_matches(deal))
            .collect()
    }

    /// Investable amount range against asking price or reference amount
    pub fn investment_filter<'d>(
        &self,
        need: &Need,
        deals: impl IntoIterator<Item = &'d Deal>,
    ) -> Vec<&'d Deal> {
        let range = AmountRange::new(need.investable_lower.as_ref(), need.investable_upper.as_ref());

        deals
            .into_iter()
            .filter(|deal| {
                within_any(
                    range,
                    [deal.asking_price.as_ref(), deal.reference_amount.as_ref()],
                )
            })
            .collect()
    }

    /// Sales scale range against the deal's sales figure
    pub fn sales_filter<'d>(
        &self,
        need: &Need,
        deals: impl IntoIterator<Item = &'d Deal>,
    ) -> Vec<&'d Deal> {
        let range = AmountRange::new(
            need.sales_scale_lower.as_ref(),
            need.sales_scale_upper.as_ref(),
        );

        deals
            .into_iter()
            .filter(|deal| within_range(range, deal.sales.as_ref()))
            .collect()
    }

    /// All stages in order. Output keeps the input order.
    pub fn run<'d>(
        &self,
        need: &Need,
        strategy: MatchStrategy<'_>,
        deals: &'d [Deal],
    ) -> Vec<&'d Deal> {
        let base = self.base_filter(need, strategy, deals);
        let invested = self.investment_filter(need, base.iter().copied());
        let matched = self.sales_filter(need, invested.iter().copied());

        log::debug!(
            "Need {} matched {} of {} deals (base {}, investment {}, legacy {})",
            need.id,
            matched.len(),
            deals.len(),
            base.len(),
            invested.len(),
            strategy.is_legacy()
        );

        matched
    }

    fn location_matches(&self, need: &Need, deal: &Deal) -> bool {
        let region_matches =
            deal.region != self.outside_home_region && need.regions.contains(&deal.region);

        region_matches || need.countries_of_residence.contains(&deal.country_of_residence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Option<BigDecimal> {
        Some(BigDecimal::from_str(s).unwrap())
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn need() -> Need {
        Need {
            id: "n1".to_string(),
            owner_id: "need-owner".to_string(),
            account_id: "acc".to_string(),
            regions: strings(&["A", "B"]),
            industries: strings(&["X"]),
            ..Default::default()
        }
    }

    fn deal(id: &str, region: &str, industries: &[&str]) -> Deal {
        Deal {
            id: id.to_string(),
            region: region.to_string(),
            industries: strings(industries),
            ..Default::default()
        }
    }

    fn pipeline() -> MatchingPipeline {
        MatchingPipeline::new("日本国外")
    }

    fn ids(deals: &[&Deal]) -> Vec<String> {
        deals.iter().map(|d| d.id.clone()).collect()
    }

    #[test]
    fn test_region_and_industry_match() {
        let need = need();
        let deals = vec![deal("d1", "A", &["X"])];

        let matched = pipeline().base_filter(&need, MatchStrategy::for_need(&need), &deals);
        assert_eq!(ids(&matched), vec!["d1"]);
    }

    #[test]
    fn test_any_of_three_industries() {
        let need = need();
        let deals = vec![
            deal("d1", "A", &["Q", "R", "X"]),
            deal("d2", "A", &["Q", "R"]),
        ];

        let matched = pipeline().base_filter(&need, MatchStrategy::for_need(&need), &deals);
        assert_eq!(ids(&matched), vec!["d1"]);
    }

    #[test]
    fn test_country_of_residence_matches_without_region() {
        let mut need = need();
        need.countries_of_residence = strings(&["US"]);

        let mut abroad = deal("d1", "日本国外", &["X"]);
        abroad.country_of_residence = "US".to_string();
        let elsewhere = deal("d2", "C", &["X"]);

        let deals = vec![abroad, elsewhere];
        let matched = pipeline().base_filter(&need, MatchStrategy::for_need(&need), &deals);
        assert_eq!(ids(&matched), vec!["d1"]);
    }

    #[test]
    fn test_outside_home_region_never_matches_by_region() {
        let mut need = need();
        need.regions.push("日本国外".to_string());

        let deals = vec![deal("d1", "日本国外", &["X"])];
        let matched = pipeline().base_filter(&need, MatchStrategy::for_need(&need), &deals);
        assert!(matched.is_empty());
    }

    #[test]
    fn test_legacy_strategy_selected_by_legacy_list() {
        let mut need = need();
        assert!(!MatchStrategy::for_need(&need).is_legacy());

        need.legacy_industries = strings(&["L1"]);
        let strategy = MatchStrategy::for_need(&need);
        assert!(strategy.is_legacy());

        let mut legacy = deal("d1", "A", &["X"]);
        legacy.legacy_industry = "L1".to_string();
        let current_only = deal("d2", "A", &["X"]);

        let deals = vec![legacy, current_only];
        let matched = pipeline().base_filter(&need, strategy, &deals);
        assert_eq!(ids(&matched), vec!["d1"]);
    }

    #[test]
    fn test_investment_filter_without_bounds_is_noop() {
        let need = need();
        let deals = vec![deal("d1", "A", &["X"]), deal("d2", "B", &["X"])];

        let matched = pipeline().investment_filter(&need, &deals);
        assert_eq!(ids(&matched), vec!["d1", "d2"]);
    }

    #[test]
    fn test_investment_filter_scenario() {
        let mut need = need();
        need.investable_lower = dec("100000");
        need.investable_upper = dec("500000");

        let mut cheap = deal("d1", "A", &["X"]);
        cheap.asking_price = dec("250000");
        let mut expensive = deal("d2", "A", &["X"]);
        expensive.asking_price = dec("700000");
        expensive.reference_amount = dec("900000");
        let unpriced = deal("d3", "A", &["X"]);
        let mut by_reference = deal("d4", "A", &["X"]);
        by_reference.asking_price = dec("700000");
        by_reference.reference_amount = dec("500000");

        let deals = vec![cheap, expensive, unpriced, by_reference];
        let matched = pipeline().investment_filter(&need, &deals);
        assert_eq!(ids(&matched), vec!["d1", "d4"]);
    }

    #[test]
    fn test_sales_filter() {
        let mut need = need();
        need.sales_scale_lower = dec("1000");

        let mut big = deal("d1", "A", &["X"]);
        big.sales = dec("1000");
        let mut small = deal("d2", "A", &["X"]);
        small.sales = dec("999");
        let unknown = deal("d3", "A", &["X"]);

        let deals = vec![big, small, unknown];
        let matched = pipeline().sales_filter(&need, &deals);
        assert_eq!(ids(&matched), vec!["d1"]);
    }

    #[test]
    fn test_run_intersects_stages_in_order() {
        let mut need = need();
        need.investable_upper = dec("500");
        need.sales_scale_upper = dec("50");

        let mut keep_a = deal("d1", "B", &["X"]);
        keep_a.asking_price = dec("500");
        keep_a.sales = dec("50");
        let mut wrong_region = deal("d2", "C", &["X"]);
        wrong_region.asking_price = dec("1");
        wrong_region.sales = dec("1");
        let mut too_expensive = deal("d3", "A", &["X"]);
        too_expensive.asking_price = dec("501");
        too_expensive.sales = dec("1");
        let mut too_big = deal("d4", "A", &["X"]);
        too_big.reference_amount = dec("10");
        too_big.sales = dec("51");
        let mut keep_b = deal("d5", "A", &["X"]);
        keep_b.reference_amount = dec("0");
        keep_b.sales = dec("0");

        let deals = vec![keep_a, wrong_region, too_expensive, too_big, keep_b];
        let strategy = MatchStrategy::for_need(&need);
        let matched = pipeline().run(&need, strategy, &deals);
        assert_eq!(ids(&matched), vec!["d1", "d5"]);
    }
}
