use bigdecimal::BigDecimal;

/// Inclusive amount range where either end may be missing.
///
/// Amounts are `BigDecimal` so that 20+ digit figures compare exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmountRange<'a> {
    pub lower: Option<&'a BigDecimal>,
    pub upper: Option<&'a BigDecimal>,
}

impl<'a> AmountRange<'a> {
    pub fn new(lower: Option<&'a BigDecimal>, upper: Option<&'a BigDecimal>) -> Self {
        Self { lower, upper }
    }

    /// No bound configured: the range constrains nothing
    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    pub fn contains(&self, value: &BigDecimal) -> bool {
        self.lower.is_none_or(|lower| lower <= value) && self.upper.is_none_or(|upper| value <= upper)
    }
}

/// Test one optional value against the range.
///
/// An unbounded range accepts anything, including a missing value.
/// A bounded range rejects a missing value.
pub fn within_range(range: AmountRange<'_>, value: Option<&BigDecimal>) -> bool {
    if range.is_unbounded() {
        return true;
    }

    value.is_some_and(|v| range.contains(v))
}

/// Test several candidate values; passes when any present value is in range.
/// With a bounded range and no present value this is a rejection.
pub fn within_any<'v, I>(range: AmountRange<'_>, values: I) -> bool
where
    I: IntoIterator<Item = Option<&'v BigDecimal>>,
{
    if range.is_unbounded() {
        return true;
    }

    values.into_iter().flatten().any(|v| range.contains(v))
}
