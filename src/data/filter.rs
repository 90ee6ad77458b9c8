use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::model::{Dataset, Field, Row};

// ---------------------------------------------------------------------------
// Filter criteria
// ---------------------------------------------------------------------------

/// Inclusive invoice-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        DateRange { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Optional predicates narrowing a dataset. Unset (or blank) predicates are
/// no-ops; all set predicates are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub state: Option<String>,
    pub city: Option<String>,
    pub customer: Option<String>,
    pub t_code: Option<String>,
    pub location_code: Option<String>,
    pub date_range: Option<DateRange>,
}

impl FilterCriteria {
    /// Set equality predicates paired with the field they constrain.
    fn equalities(&self) -> impl Iterator<Item = (Field, &str)> {
        [
            (Field::State, &self.state),
            (Field::City, &self.city),
            (Field::Customer, &self.customer),
            (Field::TCode, &self.t_code),
            (Field::LocationCode, &self.location_code),
        ]
        .into_iter()
        .filter_map(|(field, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (field, v))
        })
    }

    pub fn is_unset(&self) -> bool {
        self.equalities().next().is_none() && self.date_range.is_none()
    }
}

enum Predicate<'a> {
    Equals { column: usize, wanted: &'a str },
    Within { column: usize, range: DateRange },
}

impl Predicate<'_> {
    fn accepts(&self, row: &Row) -> bool {
        match self {
            Predicate::Equals { column, wanted } => row[*column].matches(wanted),
            Predicate::Within { column, range } => {
                row[*column].as_date().is_some_and(|d| range.contains(d))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return the rows of `dataset` passing every set predicate in `criteria`.
///
/// A predicate whose column is absent (or entirely null) constrains nothing.
/// Rows with a null date are dropped when the date window applies.
pub fn filter(dataset: &Dataset, criteria: &FilterCriteria) -> Dataset {
    if dataset.is_empty() || criteria.is_unset() {
        return dataset.clone();
    }

    let mut predicates = Vec::new();
    for (field, wanted) in criteria.equalities() {
        match dataset.populated_field(field) {
            Some(column) => predicates.push(Predicate::Equals { column, wanted }),
            None => log::debug!("No {} column, skipping its filter", field.column_name()),
        }
    }
    if let Some(range) = criteria.date_range {
        match dataset.dated_field() {
            Some(column) => predicates.push(Predicate::Within { column, range }),
            None => log::debug!("No invoice dates, skipping date range"),
        }
    }

    dataset.retain(|row| predicates.iter().all(|p| p.accepts(row)))
}

// ---------------------------------------------------------------------------
// Cascading dropdown options
// ---------------------------------------------------------------------------

/// Distinct states, in first-appearance order.
pub fn state_options(dataset: &Dataset) -> Vec<String> {
    dataset.distinct(Field::State)
}

/// Distinct cities within `state`. Empty until a state is chosen.
pub fn city_options(dataset: &Dataset, state: Option<&str>) -> Vec<String> {
    let Some(state) = state.filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    let criteria = FilterCriteria {
        state: Some(state.to_string()),
        ..Default::default()
    };
    filter(dataset, &criteria).distinct(Field::City)
}

/// Distinct customers within `state` and `city`. Empty until both are chosen.
pub fn customer_options(dataset: &Dataset, state: Option<&str>, city: Option<&str>) -> Vec<String> {
    let (Some(state), Some(city)) = (
        state.filter(|s| !s.is_empty()),
        city.filter(|c| !c.is_empty()),
    ) else {
        return Vec::new();
    };
    let criteria = FilterCriteria {
        state: Some(state.to_string()),
        city: Some(city.to_string()),
        ..Default::default()
    };
    filter(dataset, &criteria).distinct(Field::Customer)
}
