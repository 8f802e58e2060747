//! Search parameter parsing and normalization
//!
//! Turns the raw query pairs handed over by the HTTP layer into a canonical
//! [`SearchParameters`] value:
//! - list-valued filters are deduplicated and sorted
//! - empty values are dropped (no key maps to an empty value afterwards)
//! - date part fields (`*_year`, `*_month`, `*_day`) are assembled into dates
//! - coordinates are parsed as decimals with fixed 6-digit rounding
//!
//! Malformed scalar values never fail the request; the affected filter is
//! simply omitted. The one exception, an unknown `geometry_relation` name,
//! is rejected later by the predicate compiler.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_LIMIT: usize = 10;

/// Filter keys that accept multiple values.
const LIST_KEYS: [&str; 9] = [
    "curie",
    "dataset",
    "entity",
    "geometry",
    "geometry_entity",
    "geometry_reference",
    "prefix",
    "reference",
    "typology",
];

/// Entry-state filter: presence or absence of an end date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntriesOption {
    #[default]
    All,
    Current,
    Historical,
}

impl EntriesOption {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "all" => Some(Self::All),
            "current" => Some(Self::Current),
            "historical" => Some(Self::Historical),
            _ => None,
        }
    }

    fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// How a date filter compares against its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMatch {
    Empty,
    Match,
    Before,
    Since,
}

impl DateMatch {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "empty" => Some(Self::Empty),
            "match" => Some(Self::Match),
            "before" => Some(Self::Before),
            "since" => Some(Self::Since),
            _ => None,
        }
    }
}

/// One date column's filter: an optional value and an optional match option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DateFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<NaiveDate>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub matches: Option<DateMatch>,
}

impl DateFilter {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.matches.is_none()
    }
}

/// Canonical, normalized filter parameters for one search request.
///
/// Echoed back in the search response, so absent filters serialize as
/// absent keys rather than `null`/`[]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchParameters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dataset: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub typology: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entity: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prefix: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reference: Vec<String>,
    /// `prefix:reference` pairs; split by the predicate compiler.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub curie: Vec<String>,
    /// WKT geometry values.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub geometry: Vec<String>,
    /// Entities whose stored geometry is used as a query geometry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub geometry_entity: Vec<i64>,
    /// References whose stored geometry is used as a query geometry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub geometry_reference: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Decimal>,
    /// Raw relation name; resolved against the whitelist at compile time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry_relation: Option<String>,
    #[serde(skip_serializing_if = "EntriesOption::is_all")]
    pub entries: EntriesOption,
    #[serde(skip_serializing_if = "DateFilter::is_empty")]
    pub start_date: DateFilter,
    #[serde(skip_serializing_if = "DateFilter::is_empty")]
    pub end_date: DateFilter,
    #[serde(skip_serializing_if = "DateFilter::is_empty")]
    pub entry_date: DateFilter,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_entity: Option<i64>,
}

impl SearchParameters {
    /// Normalize raw query pairs into canonical parameters.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut lists: HashMap<&str, Vec<&str>> = HashMap::new();
        let mut scalars: HashMap<&str, &str> = HashMap::new();

        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if LIST_KEYS.contains(&key.as_str()) {
                lists.entry(key.as_str()).or_default().push(value);
            } else {
                // last occurrence wins for scalar keys
                scalars.insert(key.as_str(), value);
            }
        }

        let mut params = SearchParameters {
            dataset: sorted_unique(lists.remove("dataset")),
            typology: sorted_unique(lists.remove("typology")),
            entity: sorted_unique_ids(lists.remove("entity")),
            prefix: sorted_unique(lists.remove("prefix")),
            reference: sorted_unique(lists.remove("reference")),
            curie: sorted_unique(lists.remove("curie")),
            geometry: sorted_unique(lists.remove("geometry")),
            geometry_entity: sorted_unique_ids(lists.remove("geometry_entity")),
            geometry_reference: sorted_unique(lists.remove("geometry_reference")),
            geometry_relation: scalars.get("geometry_relation").map(|v| v.to_string()),
            entries: scalars
                .get("entries")
                .and_then(|v| EntriesOption::parse(v))
                .unwrap_or_default(),
            start_date: date_filter("start_date", &scalars),
            end_date: date_filter("end_date", &scalars),
            entry_date: date_filter("entry_date", &scalars),
            limit: scalars
                .get("limit")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_LIMIT),
            offset: scalars.get("offset").and_then(|v| v.parse().ok()),
            next_entity: scalars.get("next_entity").and_then(|v| v.parse().ok()),
            ..Default::default()
        };

        // A point needs both coordinates; a lone or unparsable one is dropped
        // rather than failing the request.
        let longitude = scalars.get("longitude").and_then(|v| parse_coordinate(v));
        let latitude = scalars.get("latitude").and_then(|v| parse_coordinate(v));
        if let (Some(longitude), Some(latitude)) = (longitude, latitude) {
            params.longitude = Some(longitude);
            params.latitude = Some(latitude);
        }

        // The two pagination styles are mutually exclusive; the id cursor wins.
        if params.next_entity.is_some() {
            params.offset = None;
        }

        params
    }
}

fn sorted_unique(values: Option<Vec<&str>>) -> Vec<String> {
    let mut values: Vec<String> = values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.to_string())
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Entity id lists are numeric; non-numeric entries are silently dropped.
fn sorted_unique_ids(values: Option<Vec<&str>>) -> Vec<i64> {
    let mut ids: Vec<i64> = values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.parse().ok())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn parse_coordinate(raw: &str) -> Option<Decimal> {
    raw.parse::<Decimal>().ok().map(|d| d.round_dp(6))
}

fn date_filter(field: &str, scalars: &HashMap<&str, &str>) -> DateFilter {
    DateFilter {
        value: date_value(field, scalars),
        matches: scalars
            .get(format!("{field}_match").as_str())
            .and_then(|v| DateMatch::parse(v)),
    }
}

/// An explicit ISO date wins; otherwise the filter is assembled from
/// `*_year`/`*_month`/`*_day` parts, defaulting month and day to 1.
/// Non-numeric parts (or an impossible date) omit the filter entirely.
fn date_value(field: &str, scalars: &HashMap<&str, &str>) -> Option<NaiveDate> {
    if let Some(raw) = scalars.get(field) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
    }

    let year: i32 = scalars
        .get(format!("{field}_year").as_str())?
        .parse()
        .ok()?;
    if year == 0 {
        return None;
    }
    let month: u32 = match scalars.get(format!("{field}_month").as_str()) {
        Some(raw) => raw.parse().ok()?,
        None => 1,
    };
    let day: u32 = match scalars.get(format!("{field}_day").as_str()) {
        Some(raw) => raw.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn list_values_are_sorted_and_unique() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("dataset", "greenspace"),
            ("dataset", "brownfield-site"),
            ("dataset", "greenspace"),
            ("reference", "B"),
            ("reference", "A"),
        ]));
        assert_eq!(params.dataset, vec!["brownfield-site", "greenspace"]);
        assert_eq!(params.reference, vec!["A", "B"]);
    }

    #[test]
    fn empty_values_are_dropped() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("dataset", ""),
            ("typology", "  "),
            ("longitude", ""),
        ]));
        assert!(params.dataset.is_empty());
        assert!(params.typology.is_empty());
        assert!(params.longitude.is_none());

        let echoed = serde_json::to_value(&params).unwrap();
        assert!(echoed.get("dataset").is_none());
        assert_eq!(echoed["limit"], serde_json::json!(DEFAULT_LIMIT));
    }

    #[test]
    fn entity_ids_parse_numerically() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("entity", "30"),
            ("entity", "4"),
            ("entity", "not-a-number"),
            ("entity", "4"),
        ]));
        assert_eq!(params.entity, vec![4, 30]);
    }

    #[test]
    fn date_parts_assemble_with_defaults() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("entry_date_year", "2020"),
            ("entry_date_match", "since"),
        ]));
        assert_eq!(
            params.entry_date.value,
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        assert_eq!(params.entry_date.matches, Some(DateMatch::Since));
    }

    #[test]
    fn explicit_iso_date_wins_over_parts() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("start_date", "2019-03-07"),
            ("start_date_year", "1999"),
        ]));
        assert_eq!(
            params.start_date.value,
            NaiveDate::from_ymd_opt(2019, 3, 7)
        );
    }

    #[test]
    fn non_numeric_date_parts_omit_the_filter() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("entry_date_year", "twenty-twenty"),
            ("entry_date_match", "since"),
        ]));
        assert_eq!(params.entry_date.value, None);

        let params = SearchParameters::from_pairs(&pairs(&[
            ("entry_date_year", "2020"),
            ("entry_date_month", "x"),
        ]));
        assert_eq!(params.entry_date.value, None);
    }

    #[test]
    fn coordinates_round_to_six_digits_and_require_both() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("longitude", "-1.82398796081543"),
            ("latitude", "51.18064775509972"),
        ]));
        assert_eq!(params.longitude.unwrap().to_string(), "-1.823988");
        assert_eq!(params.latitude.unwrap().to_string(), "51.180648");

        let params = SearchParameters::from_pairs(&pairs(&[("longitude", "-1.82")]));
        assert!(params.longitude.is_none());
        assert!(params.latitude.is_none());

        let params = SearchParameters::from_pairs(&pairs(&[
            ("longitude", "east-ish"),
            ("latitude", "51.2"),
        ]));
        assert!(params.longitude.is_none());
    }

    #[test]
    fn cursor_and_offset_are_mutually_exclusive() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("offset", "20"),
            ("next_entity", "300"),
        ]));
        assert_eq!(params.next_entity, Some(300));
        assert_eq!(params.offset, None);

        let params = SearchParameters::from_pairs(&pairs(&[("offset", "20")]));
        assert_eq!(params.offset, Some(20));
    }

    #[test]
    fn unknown_scalar_values_degrade_to_defaults() {
        let params = SearchParameters::from_pairs(&pairs(&[
            ("entries", "everything"),
            ("limit", "lots"),
        ]));
        assert_eq!(params.entries, EntriesOption::All);
        assert_eq!(params.limit, DEFAULT_LIMIT);
    }
}
