use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, ValidationError};

/// Returned by [`AlertRule::percent_distance`] when no meaningful ratio exists.
pub const FAR_DISTANCE_PERCENT: f64 = 100.0;

/// Which side of the threshold raises the alert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Alert when the price falls to or under the threshold.
    #[default]
    Below,
    /// Alert when the price rises to or over the threshold.
    Above,
}

impl Direction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Below => "below",
            Self::Above => "above",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ValidationError;

    /// Case-insensitive; blank means [`Direction::Below`].
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "below" => Ok(Self::Below),
            "above" => Ok(Self::Above),
            other => Err(ValidationError::InvalidDirection {
                value: other.to_owned(),
            }),
        }
    }
}

/// Threshold and direction for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlertRule {
    threshold: f64,
    direction: Direction,
}

impl AlertRule {
    pub fn new(threshold: f64, direction: Direction) -> Result<Self, ValidationError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ValidationError::InvalidThreshold {
                value: threshold.to_string(),
            });
        }

        Ok(Self {
            threshold,
            direction,
        })
    }

    pub fn below(threshold: f64) -> Result<Self, ValidationError> {
        Self::new(threshold, Direction::Below)
    }

    pub fn above(threshold: f64) -> Result<Self, ValidationError> {
        Self::new(threshold, Direction::Above)
    }

    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// `below` fires at or under the threshold, `above` at or over it.
    pub fn is_triggered(&self, price: f64) -> bool {
        match self.direction {
            Direction::Below => price <= self.threshold,
            Direction::Above => price >= self.threshold,
        }
    }

    /// One-sided gap to the threshold as a percentage of the threshold,
    /// clamped to `[0, 100]`. Zero once triggered.
    pub fn percent_distance(&self, price: f64) -> f64 {
        if self.threshold <= 0.0 || !price.is_finite() {
            return FAR_DISTANCE_PERCENT;
        }
        if self.is_triggered(price) {
            return 0.0;
        }

        let gap = match self.direction {
            Direction::Below => price - self.threshold,
            Direction::Above => self.threshold - price,
        };
        (gap * 100.0 / self.threshold).clamp(0.0, FAR_DISTANCE_PERCENT)
    }
}

/// Free-function form of [`AlertRule::is_triggered`].
pub fn is_triggered(price: f64, rule: &AlertRule) -> bool {
    rule.is_triggered(price)
}

/// Free-function form of [`AlertRule::percent_distance`].
pub fn percent_distance(price: f64, rule: &AlertRule) -> f64 {
    rule.percent_distance(price)
}

/// On-disk shape of a rule: a bare threshold (older files) or the full record.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RuleEncoding {
    Legacy(f64),
    Structured {
        threshold: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        direction: Option<String>,
    },
}

impl RuleEncoding {
    pub fn into_rule(self) -> Result<AlertRule, ValidationError> {
        match self {
            Self::Legacy(threshold) => AlertRule::below(threshold),
            Self::Structured {
                threshold,
                direction,
            } => {
                let direction = direction.as_deref().unwrap_or_default().parse()?;
                AlertRule::new(threshold, direction)
            }
        }
    }
}

/// Entry of the rules file that could not be turned into a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRule {
    /// Key as written in the file.
    pub key: String,
    pub error: ValidationError,
}

impl RejectedRule {
    /// Symbol the entry was meant for, when the key itself is a valid ticker.
    pub fn symbol(&self) -> Option<Symbol> {
        Symbol::parse(&self.key).ok()
    }
}

impl Display for RejectedRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

/// Validated rule per symbol, the active watch list for one cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    rules: BTreeMap<Symbol, AlertRule>,
}

impl RuleSet {
    /// Normalize keys and validate each entry on its own.
    ///
    /// Bad entries are returned next to the rules that did validate. Keys
    /// that normalize to the same symbol are ambiguous, so that symbol is
    /// rejected as a whole.
    pub fn from_encoded(
        entries: impl IntoIterator<Item = (String, RuleEncoding)>,
    ) -> (Self, Vec<RejectedRule>) {
        let mut rules = BTreeMap::new();
        let mut duplicates = BTreeSet::new();
        let mut rejected = Vec::new();
        for (key, encoding) in entries {
            let symbol = match Symbol::parse(&key) {
                Ok(symbol) => symbol,
                Err(error) => {
                    rejected.push(RejectedRule {
                        error: ValidationError::InvalidRule {
                            symbol: key.trim().to_owned(),
                            reason: error.to_string(),
                        },
                        key,
                    });
                    continue;
                }
            };
            match encoding.into_rule() {
                Ok(rule) => {
                    if rules.insert(symbol.clone(), rule).is_some() {
                        duplicates.insert(symbol);
                    }
                }
                Err(error) => rejected.push(RejectedRule {
                    key,
                    error: ValidationError::InvalidRule {
                        symbol: symbol.to_string(),
                        reason: error.to_string(),
                    },
                }),
            }
        }

        for symbol in duplicates {
            rules.remove(&symbol);
            rejected.push(RejectedRule {
                key: symbol.to_string(),
                error: ValidationError::DuplicateRule {
                    symbol: symbol.to_string(),
                },
            });
        }
        (Self { rules }, rejected)
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&AlertRule> {
        self.rules.get(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.rules.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.rules.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &AlertRule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<(Symbol, AlertRule)> for RuleSet {
    fn from_iter<I: IntoIterator<Item = (Symbol, AlertRule)>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn below(threshold: f64) -> AlertRule {
        AlertRule::below(threshold).expect("valid rule")
    }

    fn above(threshold: f64) -> AlertRule {
        AlertRule::above(threshold).expect("valid rule")
    }

    #[test]
    fn trigger_direction_is_inclusive() {
        assert!(is_triggered(95.0, &below(110.0)));
        assert!(!is_triggered(120.0, &below(110.0)));
        assert!(is_triggered(120.0, &above(110.0)));
        assert!(is_triggered(110.0, &below(110.0)));
        assert!(is_triggered(110.0, &above(110.0)));
        assert!(!is_triggered(100.0, &above(110.0)));
    }

    #[test]
    fn distance_is_one_sided_percentage_of_threshold() {
        assert_eq!(percent_distance(105.0, &below(100.0)), 5.0);
        assert_eq!(percent_distance(95.0, &below(100.0)), 0.0);
        assert_eq!(percent_distance(90.0, &above(100.0)), 10.0);
        assert_eq!(percent_distance(120.0, &above(100.0)), 0.0);
    }

    #[test]
    fn distance_is_clamped_to_far_sentinel() {
        assert_eq!(percent_distance(500.0, &below(100.0)), FAR_DISTANCE_PERCENT);
        assert_eq!(percent_distance(f64::NAN, &below(100.0)), FAR_DISTANCE_PERCENT);
    }

    #[test]
    fn non_positive_thresholds_are_rejected() {
        assert!(matches!(
            AlertRule::below(0.0),
            Err(ValidationError::InvalidThreshold { .. })
        ));
        assert!(AlertRule::above(-3.0).is_err());
        assert!(AlertRule::below(f64::INFINITY).is_err());
    }

    #[test]
    fn direction_parsing_is_lenient_about_case_and_blank() {
        assert_eq!("ABOVE".parse::<Direction>(), Ok(Direction::Above));
        assert_eq!(" below ".parse::<Direction>(), Ok(Direction::Below));
        assert_eq!("".parse::<Direction>(), Ok(Direction::Below));
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(ValidationError::InvalidDirection { .. })
        ));
    }

    #[test]
    fn bare_number_decodes_as_below_rule() {
        let encoded: BTreeMap<String, RuleEncoding> = serde_json::from_str(
            r#"{"icicibank": 880, "TSLA": {"threshold": 300, "direction": "above"}, "INFY": {"threshold": 1500}}"#,
        )
        .expect("valid json");

        let (rules, rejected) = RuleSet::from_encoded(encoded);

        assert!(rejected.is_empty());

        assert_eq!(
            rules.get(&Symbol::parse("ICICIBANK").expect("valid")),
            Some(&below(880.0))
        );
        assert_eq!(
            rules.get(&Symbol::parse("TSLA").expect("valid")),
            Some(&above(300.0))
        );
        assert_eq!(
            rules.get(&Symbol::parse("INFY").expect("valid")),
            Some(&below(1500.0))
        );
    }

    #[test]
    fn invalid_entries_name_the_symbol_and_spare_the_rest() {
        let (rules, rejected) = RuleSet::from_encoded([
            (
                String::from("aapl"),
                RuleEncoding::Structured {
                    threshold: 100.0,
                    direction: Some(String::from("up")),
                },
            ),
            (String::from("^SPX"), RuleEncoding::Legacy(5000.0)),
            (String::from("MSFT"), RuleEncoding::Legacy(0.0)),
            (String::from("NVDA"), RuleEncoding::Legacy(900.0)),
        ]);

        assert_eq!(rules.len(), 1);
        assert!(rules.contains(&Symbol::parse("NVDA").expect("valid")));
        assert_eq!(rejected.len(), 3);
        assert!(matches!(
            &rejected[0].error,
            ValidationError::InvalidRule { symbol, .. } if symbol == "AAPL"
        ));
        assert_eq!(rejected[0].symbol(), Symbol::parse("AAPL").ok());
        assert!(rejected[1].to_string().starts_with("invalid rule for ^SPX: "));
        assert_eq!(rejected[1].symbol(), None);
    }

    #[test]
    fn keys_that_normalize_alike_are_duplicates() {
        let (rules, rejected) = RuleSet::from_encoded([
            (String::from("aapl"), RuleEncoding::Legacy(100.0)),
            (String::from(" AAPL "), RuleEncoding::Legacy(90.0)),
            (String::from("TSLA"), RuleEncoding::Legacy(200.0)),
        ]);

        assert_eq!(rules.symbols().map(Symbol::as_str).collect::<Vec<_>>(), ["TSLA"]);
        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0].error, ValidationError::DuplicateRule { .. }));
        assert_eq!(rejected[0].symbol(), Symbol::parse("AAPL").ok());
    }
}
