use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Qualitative label for a price within a comparison set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceLabel {
    #[serde(rename = "very inexpensive")]
    VeryInexpensive,
    #[serde(rename = "inexpensive")]
    Inexpensive,
    #[serde(rename = "average")]
    Average,
    #[serde(rename = "expensive")]
    Expensive,
    #[serde(rename = "very expensive")]
    VeryExpensive,
    #[serde(rename = "unknown")]
    Unknown,
}

impl PriceLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PriceLabel::VeryInexpensive => "very inexpensive",
            PriceLabel::Inexpensive => "inexpensive",
            PriceLabel::Average => "average",
            PriceLabel::Expensive => "expensive",
            PriceLabel::VeryExpensive => "very expensive",
            PriceLabel::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PriceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label a price by its rank within the comparison set.
///
/// The position is the number of prices at or below the given price, minus
/// one (floored at zero), scaled into [0, 1] by the set size. Rank-based, so
/// the label reflects where the price sits among its peers, not its
/// magnitude. An empty comparison set yields [`PriceLabel::Unknown`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn price_label(price: Decimal, all_prices: &[Decimal]) -> PriceLabel {
    if all_prices.is_empty() {
        return PriceLabel::Unknown;
    }

    let at_or_below = all_prices.iter().filter(|p| **p <= price).count();
    let position = at_or_below.saturating_sub(1);
    let span = (all_prices.len() - 1).max(1);
    let ratio = position as f64 / span as f64;

    if ratio <= 0.1 {
        PriceLabel::VeryInexpensive
    } else if ratio <= 0.3 {
        PriceLabel::Inexpensive
    } else if ratio <= 0.7 {
        PriceLabel::Average
    } else if ratio <= 0.9 {
        PriceLabel::Expensive
    } else {
        PriceLabel::VeryExpensive
    }
}
