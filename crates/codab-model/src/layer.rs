// SPDX-License-Identifier: Apache-2.0

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const COL_VALID_ON: &str = "valid_on";
pub const COL_VALID_TO: &str = "valid_to";
pub const COL_LANG: &str = "lang";

/// Geometry families the remote service publishes per layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
}

impl GeometryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
        }
    }

    #[must_use]
    pub fn of(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(Self::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Some(Self::Line)
            }
            Geometry::Polygon(_) | Geometry::MultiPolygon(_) | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(Self::Polygon),
            Geometry::GeometryCollection(_) => None,
        }
    }
}

/// Attribute scalar carried by a feature. Kept deliberately small:
/// the source service only emits strings, numbers, and nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Number(f64),
    Null,
}

impl AttrValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Null, or text that is blank after trimming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Display form of the scalar: text as-is, whole numbers without
    /// a fractional part. The service serves date-typed fields as
    /// epoch-millisecond numbers, which must render stably.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Some(format!("{}", *n as i64))
            }
            Self::Number(n) => Some(n.to_string()),
            Self::Null => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryFeature {
    pub geometry: Geometry<f64>,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl BoundaryFeature {
    #[must_use]
    pub fn attr(&self, column: &str) -> &AttrValue {
        self.attributes.get(column).unwrap_or(&AttrValue::Null)
    }
}

/// One admin level's geometry and attributes for one country.
///
/// Column presence is level-dependent and never guaranteed; `columns`
/// preserves the service's column order for output purposes while
/// feature attributes are looked up by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryLayer {
    pub columns: Vec<String>,
    pub features: Vec<BoundaryFeature>,
}

impl BoundaryLayer {
    #[must_use]
    pub fn new(columns: Vec<String>, features: Vec<BoundaryFeature>) -> Self {
        Self { columns, features }
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Dominant geometry kind across features, when they agree.
    #[must_use]
    pub fn geometry_kind(&self) -> Option<GeometryKind> {
        let mut kind = None;
        for feature in &self.features {
            let this = GeometryKind::of(&feature.geometry)?;
            match kind {
                None => kind = Some(this),
                Some(k) if k == this => {}
                Some(_) => return None,
            }
        }
        kind
    }
}

/// Ordered per-level layers for one country; index = admin level.
pub type LevelSequence = Vec<BoundaryLayer>;

/// Resolved mapping from (level, role, index) to column identity,
/// computed once per layer instead of per check via string matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIndex {
    level: u8,
    /// `adm{l}_name*` for l in 0..=level, in column order.
    pub name_columns: Vec<String>,
    /// `adm{l}_pcode` for l in 0..=level, in column order.
    pub pcode_columns: Vec<String>,
    /// `lang`, `lang1`, `lang2`, ... in column order.
    pub lang_columns: Vec<String>,
    /// `adm{level}_ref*` in column order.
    pub ref_columns: Vec<String>,
}

impl SchemaIndex {
    #[must_use]
    pub fn resolve(layer: &BoundaryLayer, level: u8) -> Self {
        let mut name_columns = Vec::new();
        let mut pcode_columns = Vec::new();
        let mut lang_columns = Vec::new();
        let mut ref_columns = Vec::new();
        let ref_prefix = format!("adm{level}_ref");
        for column in &layer.columns {
            for l in 0..=level {
                if column.starts_with(&format!("adm{l}_name")) {
                    name_columns.push(column.clone());
                } else if column == &format!("adm{l}_pcode") {
                    pcode_columns.push(column.clone());
                }
            }
            if is_lang_column(column) {
                lang_columns.push(column.clone());
            }
            if column.starts_with(&ref_prefix) {
                ref_columns.push(column.clone());
            }
        }
        Self {
            level,
            name_columns,
            pcode_columns,
            lang_columns,
            ref_columns,
        }
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.level
    }

    /// The layer's own P-code column (`adm{level}_pcode`), if present.
    #[must_use]
    pub fn own_pcode_column(&self) -> Option<&str> {
        let want = format!("adm{}_pcode", self.level);
        self.pcode_columns
            .iter()
            .find(|c| **c == want)
            .map(String::as_str)
    }

    /// The parent P-code column (`adm{level-1}_pcode`), if present.
    #[must_use]
    pub fn parent_pcode_column(&self) -> Option<&str> {
        let parent = self.level.checked_sub(1)?;
        let want = format!("adm{parent}_pcode");
        self.pcode_columns
            .iter()
            .find(|c| **c == want)
            .map(String::as_str)
    }

    /// Name columns whose suffix index is below `limit` (one column
    /// per declared language, `adm{l}_name` counting as index 0).
    #[must_use]
    pub fn name_columns_within(&self, limit: usize) -> Vec<&str> {
        self.name_columns
            .iter()
            .filter(|c| name_suffix_index(c).is_some_and(|i| i < limit))
            .map(String::as_str)
            .collect()
    }
}

fn is_lang_column(column: &str) -> bool {
    if column == COL_LANG {
        return true;
    }
    column
        .strip_prefix(COL_LANG)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Index of a name column within its level: `adm1_name` is 0,
/// `adm1_name2` is 2. Non-name columns yield `None`.
#[must_use]
pub fn name_suffix_index(column: &str) -> Option<usize> {
    let rest = column.split("_name").nth(1)?;
    if rest.is_empty() {
        return Some(0);
    }
    rest.parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Coord, LineString, Polygon};

    fn square(x: f64, y: f64, size: f64) -> Geometry<f64> {
        Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                Coord { x, y },
                Coord { x: x + size, y },
                Coord { x: x + size, y: y + size },
                Coord { x, y: y + size },
                Coord { x, y },
            ]),
            vec![],
        ))
    }

    fn feature(geometry: Geometry<f64>) -> BoundaryFeature {
        BoundaryFeature {
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn schema_index_resolves_roles_per_level() {
        let layer = BoundaryLayer::new(
            vec![
                "adm0_name".to_string(),
                "adm0_pcode".to_string(),
                "adm1_name".to_string(),
                "adm1_name1".to_string(),
                "adm1_pcode".to_string(),
                "adm1_ref_name".to_string(),
                "lang".to_string(),
                "lang1".to_string(),
                "language".to_string(),
                "valid_on".to_string(),
                "geometry".to_string(),
            ],
            vec![],
        );
        let schema = SchemaIndex::resolve(&layer, 1);
        assert_eq!(
            schema.name_columns,
            vec!["adm0_name", "adm1_name", "adm1_name1"]
        );
        assert_eq!(schema.pcode_columns, vec!["adm0_pcode", "adm1_pcode"]);
        assert_eq!(schema.lang_columns, vec!["lang", "lang1"]);
        assert_eq!(schema.ref_columns, vec!["adm1_ref_name"]);
        assert_eq!(schema.own_pcode_column(), Some("adm1_pcode"));
        assert_eq!(schema.parent_pcode_column(), Some("adm0_pcode"));
    }

    #[test]
    fn level_zero_has_no_parent_pcode() {
        let layer = BoundaryLayer::new(vec!["adm0_pcode".to_string()], vec![]);
        let schema = SchemaIndex::resolve(&layer, 0);
        assert_eq!(schema.own_pcode_column(), Some("adm0_pcode"));
        assert_eq!(schema.parent_pcode_column(), None);
    }

    #[test]
    fn name_suffix_indices() {
        assert_eq!(name_suffix_index("adm1_name"), Some(0));
        assert_eq!(name_suffix_index("adm1_name1"), Some(1));
        assert_eq!(name_suffix_index("adm2_name12"), Some(12));
        assert_eq!(name_suffix_index("adm1_pcode"), None);
    }

    #[test]
    fn geometry_kind_agrees_or_is_none() {
        let layer = BoundaryLayer::new(
            vec![],
            vec![feature(square(0.0, 0.0, 1.0)), feature(square(1.0, 0.0, 1.0))],
        );
        assert_eq!(layer.geometry_kind(), Some(GeometryKind::Polygon));

        let mixed = BoundaryLayer::new(
            vec![],
            vec![
                feature(square(0.0, 0.0, 1.0)),
                feature(Geometry::Point(geo_types::Point::new(0.5, 0.5))),
            ],
        );
        assert_eq!(mixed.geometry_kind(), None);
    }

    #[test]
    fn empty_attr_detection() {
        assert!(AttrValue::Null.is_empty());
        assert!(AttrValue::Text("   ".to_string()).is_empty());
        assert!(!AttrValue::Text("Bangui".to_string()).is_empty());
        assert!(!AttrValue::Number(3.0).is_empty());
    }

    #[test]
    fn attr_rendering_is_stable_for_epoch_numbers() {
        assert_eq!(
            AttrValue::Number(1_705_276_800_000.0).render().as_deref(),
            Some("1705276800000")
        );
        assert_eq!(AttrValue::Number(0.5).render().as_deref(), Some("0.5"));
        assert_eq!(
            AttrValue::Text("2024-01-15".to_string()).render().as_deref(),
            Some("2024-01-15")
        );
        assert_eq!(AttrValue::Null.render(), None);
    }
}
