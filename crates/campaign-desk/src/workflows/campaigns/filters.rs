//! Filter selections submitted by the coach table and the export dialog.

use serde::{Deserialize, Serialize};

use super::domain::{ProgramId, UniversityId};

/// Operators available on list facets (divisions, universities, programs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FacetOperator {
    #[serde(rename = "is")]
    Is,
    #[default]
    #[serde(rename = "is any of")]
    IsAnyOf,
    #[serde(rename = "is not")]
    IsNot,
    #[serde(rename = "is none of")]
    IsNoneOf,
}

impl FacetOperator {
    /// Negated operators name values to drop rather than values to keep.
    pub fn is_negated(self) -> bool {
        matches!(self, Self::IsNot | Self::IsNoneOf)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetFilter<T> {
    pub operator: FacetOperator,
    pub values: Vec<T>,
}

impl<T> FacetFilter<T> {
    pub fn any_of(values: Vec<T>) -> Self {
        Self {
            operator: FacetOperator::IsAnyOf,
            values,
        }
    }

    pub fn none_of(values: Vec<T>) -> Self {
        Self {
            operator: FacetOperator::IsNoneOf,
            values,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.values.is_empty()
    }
}

// Accepts either a bare list (implicit "is any of") or `{ operator, values }`.
impl<'de, T> Deserialize<'de> for FacetFilter<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw<T> {
            List(Vec<T>),
            Tagged {
                #[serde(default)]
                operator: FacetOperator,
                #[serde(default = "Vec::new")]
                values: Vec<T>,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::List(values) => FacetFilter::any_of(values),
            Raw::Tagged { operator, values } => FacetFilter { operator, values },
        })
    }
}

/// Numeric comparison operators on `total_yearly_cost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericOperator {
    #[serde(rename = "is")]
    Is,
    #[serde(rename = "is not")]
    IsNot,
    #[serde(rename = "is between")]
    IsBetween,
    #[serde(rename = "is not between")]
    IsNotBetween,
    #[serde(rename = "is less than")]
    IsLessThan,
    #[serde(rename = "is less than or equal", alias = "is less than or equal to")]
    IsLessThanOrEqual,
    #[serde(rename = "is greater than")]
    IsGreaterThan,
    #[serde(rename = "is greater than or equal", alias = "is greater than or equal to")]
    IsGreaterThanOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuitionFilter {
    pub operator: NumericOperator,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// A single comparison the directory can express in one range clause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuitionCondition {
    Equal(f64),
    NotEqual(f64),
    Between { min: f64, max: f64 },
    LessThan(f64),
    LessThanOrEqual(f64),
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
}

impl TuitionCondition {
    pub fn matches(&self, cost: f64) -> bool {
        match *self {
            Self::Equal(value) => cost == value,
            Self::NotEqual(value) => cost != value,
            Self::Between { min, max } => cost >= min && cost <= max,
            Self::LessThan(value) => cost < value,
            Self::LessThanOrEqual(value) => cost <= value,
            Self::GreaterThan(value) => cost > value,
            Self::GreaterThanOrEqual(value) => cost >= value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("tuition filter '{operator}' requires a value")]
    MissingTuitionValue { operator: &'static str },
    #[error("tuition filter '{operator}' requires both a minimum and a maximum")]
    MissingTuitionRange { operator: &'static str },
    #[error("tuition minimum {min} is greater than maximum {max}")]
    InvertedTuitionRange { min: f64, max: f64 },
}

impl TuitionFilter {
    /// Maps the operator to the range clauses to run. `is not between` needs two queries whose
    /// results are unioned, since a single range clause cannot express the disjunction.
    pub fn conditions(&self) -> Result<Vec<TuitionCondition>, FilterError> {
        let single = |operator: &'static str| {
            self.value
                .or(self.min)
                .or(self.max)
                .ok_or(FilterError::MissingTuitionValue { operator })
        };
        let range = |operator: &'static str| match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => {
                Err(FilterError::InvertedTuitionRange { min, max })
            }
            (Some(min), Some(max)) => Ok((min, max)),
            _ => Err(FilterError::MissingTuitionRange { operator }),
        };

        Ok(match self.operator {
            NumericOperator::Is => vec![TuitionCondition::Equal(single("is")?)],
            NumericOperator::IsNot => vec![TuitionCondition::NotEqual(single("is not")?)],
            NumericOperator::IsBetween => {
                let (min, max) = range("is between")?;
                vec![TuitionCondition::Between { min, max }]
            }
            NumericOperator::IsNotBetween => {
                let (min, max) = range("is not between")?;
                vec![
                    TuitionCondition::LessThan(min),
                    TuitionCondition::GreaterThan(max),
                ]
            }
            NumericOperator::IsLessThan => {
                vec![TuitionCondition::LessThan(single("is less than")?)]
            }
            NumericOperator::IsLessThanOrEqual => vec![TuitionCondition::LessThanOrEqual(
                single("is less than or equal")?,
            )],
            NumericOperator::IsGreaterThan => {
                vec![TuitionCondition::GreaterThan(single("is greater than")?)]
            }
            NumericOperator::IsGreaterThanOrEqual => vec![TuitionCondition::GreaterThanOrEqual(
                single("is greater than or equal")?,
            )],
        })
    }
}

/// Every filter the coach table can apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachFilters {
    #[serde(default)]
    pub divisions: Option<FacetFilter<String>>,
    #[serde(default)]
    pub universities: Option<FacetFilter<UniversityId>>,
    #[serde(default)]
    pub programs: Option<FacetFilter<ProgramId>>,
    #[serde(default)]
    pub tuition: Option<TuitionFilter>,
    #[serde(default)]
    pub min_tuition: Option<f64>,
    #[serde(default)]
    pub max_tuition: Option<f64>,
}

impl CoachFilters {
    /// The effective tuition filter. An explicit `tuition` entry wins over the
    /// `minTuition`/`maxTuition` shorthand.
    pub fn tuition_filter(&self) -> Option<TuitionFilter> {
        if let Some(filter) = self.tuition {
            return Some(filter);
        }
        let operator = match (self.min_tuition, self.max_tuition) {
            (Some(_), Some(_)) => NumericOperator::IsBetween,
            (Some(_), None) => NumericOperator::IsGreaterThanOrEqual,
            (None, Some(_)) => NumericOperator::IsLessThanOrEqual,
            (None, None) => return None,
        };
        Some(TuitionFilter {
            operator,
            value: None,
            min: self.min_tuition,
            max: self.max_tuition,
        })
    }

    pub fn active_divisions(&self) -> Option<&FacetFilter<String>> {
        self.divisions.as_ref().filter(|filter| filter.is_active())
    }

    pub fn active_universities(&self) -> Option<&FacetFilter<UniversityId>> {
        self.universities.as_ref().filter(|filter| filter.is_active())
    }

    pub fn active_programs(&self) -> Option<&FacetFilter<ProgramId>> {
        self.programs.as_ref().filter(|filter| filter.is_active())
    }
}

/// Already-chosen values for the filter dropdowns. Plain inclusion lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSelection {
    #[serde(default)]
    pub divisions: Vec<String>,
    #[serde(default)]
    pub university_ids: Vec<UniversityId>,
    #[serde(default)]
    pub program_ids: Vec<ProgramId>,
}

impl FacetSelection {
    pub fn without_divisions(&self) -> Self {
        Self {
            divisions: Vec::new(),
            ..self.clone()
        }
    }

    pub fn without_universities(&self) -> Self {
        Self {
            university_ids: Vec::new(),
            ..self.clone()
        }
    }

    pub fn without_programs(&self) -> Self {
        Self {
            program_ids: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_list_means_any_of() {
        let filters: CoachFilters =
            serde_json::from_value(json!({ "divisions": ["Division I"] })).expect("filters");
        let divisions = filters.divisions.expect("division filter");
        assert_eq!(divisions.operator, FacetOperator::IsAnyOf);
        assert_eq!(divisions.values, vec!["Division I".to_string()]);
    }

    #[test]
    fn tagged_filter_keeps_operator() {
        let filters: CoachFilters = serde_json::from_value(json!({
            "divisions": { "operator": "is none of", "values": ["NAIA", "JUCO"] },
            "tuition": { "operator": "is less than or equal to", "value": 30000 }
        }))
        .expect("filters");
        let divisions = filters.divisions.expect("division filter");
        assert!(divisions.operator.is_negated());
        assert_eq!(
            filters.tuition.expect("tuition").operator,
            NumericOperator::IsLessThanOrEqual
        );
    }

    #[test]
    fn min_and_max_shorthand_becomes_between() {
        let filters = CoachFilters {
            min_tuition: Some(20_000.0),
            max_tuition: Some(50_000.0),
            ..CoachFilters::default()
        };
        let tuition = filters.tuition_filter().expect("tuition filter");
        assert_eq!(tuition.operator, NumericOperator::IsBetween);
        assert_eq!(
            tuition.conditions().expect("conditions"),
            vec![TuitionCondition::Between {
                min: 20_000.0,
                max: 50_000.0
            }]
        );
    }

    #[test]
    fn not_between_splits_into_two_conditions() {
        let filter = TuitionFilter {
            operator: NumericOperator::IsNotBetween,
            value: None,
            min: Some(10_000.0),
            max: Some(40_000.0),
        };
        assert_eq!(
            filter.conditions().expect("conditions"),
            vec![
                TuitionCondition::LessThan(10_000.0),
                TuitionCondition::GreaterThan(40_000.0),
            ]
        );
    }

    #[test]
    fn range_operators_require_both_bounds() {
        let filter = TuitionFilter {
            operator: NumericOperator::IsBetween,
            value: None,
            min: Some(10_000.0),
            max: None,
        };
        assert_eq!(
            filter.conditions(),
            Err(FilterError::MissingTuitionRange {
                operator: "is between"
            })
        );
    }

    #[test]
    fn empty_facets_are_inactive() {
        let filters = CoachFilters {
            divisions: Some(FacetFilter::any_of(Vec::new())),
            ..CoachFilters::default()
        };
        assert!(filters.active_divisions().is_none());
    }
}
