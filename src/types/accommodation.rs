//! Accommodation categories and the INSEE activity codes that identify them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The accommodation types covered by both the capacity and the nights-stayed datasets.
///
/// Other INSEE accommodation categories (holiday villages, tourist residences, ...) have
/// capacity figures but no matching nights statistics, so they are left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccommodationType {
    Hotel,
    Camping,
}

impl AccommodationType {
    pub fn label(&self) -> &'static str {
        match self {
            AccommodationType::Hotel => "Hotel",
            AccommodationType::Camping => "Camping",
        }
    }
}

/// Allows formatting an `AccommodationType` using its label.
///
/// ```
/// use voyage_etl::AccommodationType;
///
/// assert_eq!(AccommodationType::Camping.to_string(), "Camping");
/// ```
impl fmt::Display for AccommodationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Granularity of a nights-stayed observation (`FREQ` in the INSEE dataset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TemporalRate {
    Annual,
    Monthly,
}

impl TemporalRate {
    pub(crate) fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "A" => Some(TemporalRate::Annual),
            "M" => Some(TemporalRate::Monthly),
            _ => None,
        }
    }
}

impl fmt::Display for TemporalRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalRate::Annual => write!(f, "A"),
            TemporalRate::Monthly => write!(f, "M"),
        }
    }
}

/// Maps raw activity codes to [`AccommodationType`].
///
/// Passed into the normalizers as data so that fixtures or newer nomenclatures can
/// substitute their own codes. The defaults are the NAF codes used by INSEE:
/// `I551` for hotels and `I553` for campsites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCodes {
    pub hotel: String,
    pub camping: String,
}

impl ActivityCodes {
    pub fn new(hotel: impl Into<String>, camping: impl Into<String>) -> Self {
        Self {
            hotel: hotel.into(),
            camping: camping.into(),
        }
    }

    /// Resolves a raw code, returning `None` for unsupported accommodation types.
    pub fn classify(&self, code: &str) -> Option<AccommodationType> {
        let code = code.trim();
        if code == self.hotel {
            Some(AccommodationType::Hotel)
        } else if code == self.camping {
            Some(AccommodationType::Camping)
        } else {
            None
        }
    }

    pub fn code_for(&self, accommodation_type: AccommodationType) -> &str {
        match accommodation_type {
            AccommodationType::Hotel => &self.hotel,
            AccommodationType::Camping => &self.camping,
        }
    }
}

impl Default for ActivityCodes {
    fn default() -> Self {
        Self::new("I551", "I553")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_codes_classify_hotels_and_campings_only() {
        let codes = ActivityCodes::default();
        assert_eq!(codes.classify("I551"), Some(AccommodationType::Hotel));
        assert_eq!(codes.classify(" I553 "), Some(AccommodationType::Camping));
        assert_eq!(codes.classify("I552B"), None);
        assert_eq!(codes.classify("I55"), None);
        assert_eq!(codes.code_for(AccommodationType::Camping), "I553");
    }

    #[test]
    fn temporal_rate_codes() {
        assert_eq!(TemporalRate::from_code("A"), Some(TemporalRate::Annual));
        assert_eq!(TemporalRate::from_code("M"), Some(TemporalRate::Monthly));
        assert_eq!(TemporalRate::from_code("Q"), None);
    }
}
