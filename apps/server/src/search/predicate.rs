//! Backend-agnostic predicate compilation
//!
//! Compiles normalized [`SearchParameters`] into an ordered set of logical
//! filter clauses plus a pagination spec. Clauses carry only validated,
//! typed values; the backends render them into their own query form, so the
//! filter semantics stay identical across storage engines.

use chrono::NaiveDate;

use crate::search::params::{DateMatch, EntriesOption, SearchParameters};
use crate::search::relation::SpatialRelation;
use crate::Result;

/// Text-valued entity columns filterable by membership. Filters outside
/// this set never pass through to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextColumn {
    Typology,
    Dataset,
    Prefix,
    Reference,
}

impl TextColumn {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Typology => "typology",
            Self::Dataset => "dataset",
            Self::Prefix => "prefix",
            Self::Reference => "reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateColumn {
    StartDate,
    EndDate,
    EntryDate,
}

impl DateColumn {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::EntryDate => "entry_date",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOp {
    Eq,
    Lt,
    Ge,
}

impl DateOp {
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Ge => ">=",
        }
    }
}

/// A `prefix:reference` compact identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curie {
    pub prefix: String,
    pub reference: String,
}

impl Curie {
    /// Split on `:`; missing parts default to the empty string.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(':');
        Curie {
            prefix: parts.next().unwrap_or_default().to_string(),
            reference: parts.next().unwrap_or_default().to_string(),
        }
    }
}

/// One query geometry for the spatial clause.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    /// WKT point assembled from the longitude/latitude pair.
    Point { wkt: String },
    /// Caller-supplied WKT value.
    Wkt(String),
    /// The stored geometry of another entity.
    EntityGeometry(i64),
    /// The stored geometries of entities carrying this reference; always
    /// tested by intersection.
    ReferenceGeometry(String),
}

/// A single logical filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column IN (values)`
    TextIn {
        column: TextColumn,
        values: Vec<String>,
    },
    /// `entity IN (ids)`
    EntityIn { ids: Vec<i64> },
    /// `(prefix = p AND reference = r)` pairs, OR-combined
    CurieAny { curies: Vec<Curie> },
    /// Entry-state filter: an end date is present (historical) or absent
    /// (current).
    EndDate { present: bool },
    /// `column IS EMPTY`
    DateEmpty { column: DateColumn },
    /// `column <op> value`, only emitted with a value
    DateCmp {
        column: DateColumn,
        op: DateOp,
        value: NaiveDate,
    },
    /// Disjunction over query geometries, each tested against the entity's
    /// geometry and point columns under the resolved relation.
    Spatial {
        relation: SpatialRelation,
        sources: Vec<GeometrySource>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCursor {
    /// Restrict to ids strictly greater than the cursor.
    After(i64),
    /// Skip a fixed number of rows.
    Offset(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub limit: usize,
    pub cursor: Option<PageCursor>,
}

/// The compiled query: ordered filter clauses plus pagination. Results are
/// always ordered by ascending entity id.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateSet {
    pub filters: Vec<Predicate>,
    pub page: Page,
}

/// Compile normalized parameters into a predicate set.
///
/// The spatial relation is resolved up front, so an unknown relation name is
/// rejected even when no geometry value accompanies it.
pub fn compile(params: &SearchParameters) -> Result<PredicateSet> {
    let relation = SpatialRelation::resolve(params.geometry_relation.as_deref())?;

    let mut filters = Vec::new();

    push_text_in(&mut filters, TextColumn::Typology, &params.typology);
    push_text_in(&mut filters, TextColumn::Dataset, &params.dataset);
    if !params.entity.is_empty() {
        filters.push(Predicate::EntityIn {
            ids: params.entity.clone(),
        });
    }
    push_text_in(&mut filters, TextColumn::Prefix, &params.prefix);
    push_text_in(&mut filters, TextColumn::Reference, &params.reference);

    if !params.curie.is_empty() {
        filters.push(Predicate::CurieAny {
            curies: params.curie.iter().map(|c| Curie::parse(c)).collect(),
        });
    }

    match params.entries {
        EntriesOption::All => {}
        EntriesOption::Current => filters.push(Predicate::EndDate { present: false }),
        EntriesOption::Historical => filters.push(Predicate::EndDate { present: true }),
    }

    for (column, filter) in [
        (DateColumn::StartDate, &params.start_date),
        (DateColumn::EndDate, &params.end_date),
        (DateColumn::EntryDate, &params.entry_date),
    ] {
        match (filter.matches, filter.value) {
            (Some(DateMatch::Empty), _) => filters.push(Predicate::DateEmpty { column }),
            (matches, Some(value)) => {
                let op = match matches.unwrap_or(DateMatch::Match) {
                    DateMatch::Match => DateOp::Eq,
                    DateMatch::Before => DateOp::Lt,
                    DateMatch::Since => DateOp::Ge,
                    DateMatch::Empty => unreachable!(),
                };
                filters.push(Predicate::DateCmp { column, op, value });
            }
            (_, None) => {}
        }
    }

    let mut sources = Vec::new();
    if let (Some(longitude), Some(latitude)) = (params.longitude, params.latitude) {
        sources.push(GeometrySource::Point {
            wkt: format!("POINT({longitude:.6} {latitude:.6})"),
        });
    }
    for wkt in &params.geometry {
        sources.push(GeometrySource::Wkt(wkt.clone()));
    }
    for entity in &params.geometry_entity {
        sources.push(GeometrySource::EntityGeometry(*entity));
    }
    for reference in &params.geometry_reference {
        sources.push(GeometrySource::ReferenceGeometry(reference.clone()));
    }
    if !sources.is_empty() {
        filters.push(Predicate::Spatial { relation, sources });
    }

    let cursor = match (params.next_entity, params.offset) {
        (Some(id), _) => Some(PageCursor::After(id)),
        (None, Some(offset)) => Some(PageCursor::Offset(offset)),
        (None, None) => None,
    };

    Ok(PredicateSet {
        filters,
        page: Page {
            limit: params.limit,
            cursor,
        },
    })
}

fn push_text_in(filters: &mut Vec<Predicate>, column: TextColumn, values: &[String]) {
    if !values.is_empty() {
        filters.push(Predicate::TextIn {
            column,
            values: values.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::params::DateFilter;
    use crate::Error;

    fn params() -> SearchParameters {
        SearchParameters {
            limit: 10,
            ..Default::default()
        }
    }

    #[test]
    fn no_filters_compile_to_pagination_only() {
        let compiled = compile(&params()).unwrap();
        assert!(compiled.filters.is_empty());
        assert_eq!(compiled.page.limit, 10);
        assert_eq!(compiled.page.cursor, None);
    }

    #[test]
    fn membership_clauses_keep_a_fixed_order() {
        let mut p = params();
        p.dataset = vec!["brownfield-site".to_string(), "greenspace".to_string()];
        p.typology = vec!["geography".to_string()];
        p.entity = vec![7, 9];

        let compiled = compile(&p).unwrap();
        assert_eq!(
            compiled.filters,
            vec![
                Predicate::TextIn {
                    column: TextColumn::Typology,
                    values: vec!["geography".to_string()],
                },
                Predicate::TextIn {
                    column: TextColumn::Dataset,
                    values: vec!["brownfield-site".to_string(), "greenspace".to_string()],
                },
                Predicate::EntityIn { ids: vec![7, 9] },
            ]
        );
    }

    #[test]
    fn curies_split_with_defaults() {
        assert_eq!(
            Curie::parse("greenspace:Q123"),
            Curie {
                prefix: "greenspace".to_string(),
                reference: "Q123".to_string(),
            }
        );
        assert_eq!(
            Curie::parse("orphan"),
            Curie {
                prefix: "orphan".to_string(),
                reference: String::new(),
            }
        );
    }

    #[test]
    fn entries_options_map_to_end_date_presence() {
        let mut p = params();
        p.entries = EntriesOption::Current;
        assert_eq!(
            compile(&p).unwrap().filters,
            vec![Predicate::EndDate { present: false }]
        );

        p.entries = EntriesOption::Historical;
        assert_eq!(
            compile(&p).unwrap().filters,
            vec![Predicate::EndDate { present: true }]
        );
    }

    #[test]
    fn date_without_match_option_compares_equal() {
        let mut p = params();
        p.entry_date = DateFilter {
            value: NaiveDate::from_ymd_opt(2019, 1, 7),
            matches: None,
        };
        assert_eq!(
            compile(&p).unwrap().filters,
            vec![Predicate::DateCmp {
                column: DateColumn::EntryDate,
                op: DateOp::Eq,
                value: NaiveDate::from_ymd_opt(2019, 1, 7).unwrap(),
            }]
        );
    }

    #[test]
    fn match_option_without_value_emits_nothing() {
        let mut p = params();
        p.entry_date = DateFilter {
            value: None,
            matches: Some(DateMatch::Since),
        };
        assert!(compile(&p).unwrap().filters.is_empty());
    }

    #[test]
    fn point_source_renders_six_digit_wkt() {
        let mut p = params();
        p.longitude = Some("-1.823988".parse().unwrap());
        p.latitude = Some("51.18".parse().unwrap());

        let compiled = compile(&p).unwrap();
        let Predicate::Spatial { relation, sources } = &compiled.filters[0] else {
            panic!("expected spatial clause");
        };
        assert_eq!(*relation, SpatialRelation::Within);
        assert_eq!(
            sources,
            &vec![GeometrySource::Point {
                wkt: "POINT(-1.823988 51.180000)".to_string(),
            }]
        );
    }

    #[test]
    fn unknown_relation_fails_even_without_geometry() {
        let mut p = params();
        p.geometry_relation = Some("drop table".to_string());
        assert!(matches!(
            compile(&p).unwrap_err(),
            Error::UnsupportedRelation { .. }
        ));
    }

    #[test]
    fn cursor_styles_compile_mutually_exclusively() {
        let mut p = params();
        p.offset = Some(30);
        assert_eq!(
            compile(&p).unwrap().page.cursor,
            Some(PageCursor::Offset(30))
        );

        p.next_entity = Some(120);
        assert_eq!(
            compile(&p).unwrap().page.cursor,
            Some(PageCursor::After(120))
        );
    }
}
