//! Feature derivation for the house-price model.
//!
//! Builds the fixed-shape [`FeatureRow`] the fitted preprocessor was trained
//! against: the seven canonical request fields plus six derived numeric
//! features (interaction products, log transforms, one ratio). Derivation is
//! a pure function of the validated request; the one defined non-error edge
//! case is a zero land area, where the building-to-land ratio becomes
//! [`Value::Missing`] instead of dividing by zero.

use crate::api::models::predict::PredictionRequest;

/// The exact ordered column set the fitted preprocessor expects.
///
/// Order matters: the preprocessor checks its persisted column list against
/// this at transform time and refuses to run on any difference.
pub const COLUMNS: [&str; 13] = [
    "building_area",
    "land_area",
    "bathroom_count",
    "bedroom_count",
    "city_or_regency",
    "province",
    "property_type",
    "area_product",
    "log_building_area",
    "log_land_area",
    "building_area_x_bathrooms",
    "land_area_x_bedrooms",
    "building_to_land_area_ratio",
];

/// A single cell of a [`FeatureRow`].
///
/// `Missing` is the defined missing-value marker: "undefined / not
/// computable", distinct from zero and from an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// One request's worth of model input: a fixed ordered mapping of column
/// name to value. Constructed fresh per inference call and owned by it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    cells: Vec<(&'static str, Value)>,
}

impl FeatureRow {
    fn new(cells: Vec<(&'static str, Value)>) -> Self {
        debug_assert_eq!(cells.len(), COLUMNS.len());
        Self { cells }
    }

    /// Column names in their fixed order.
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(name, _)| *name)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn set(&mut self, column: &str, value: Value) {
        if let Some(cell) = self.cells.iter_mut().find(|(name, _)| *name == column) {
            cell.1 = value;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.cells.iter().map(|(name, value)| (*name, value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Derive the full feature row from a validated request.
///
/// Pure: same request in, same row out. The optional pass-through fields
/// (`price_per_sqm`, `building_to_land_ratio`) are not part of the fitted
/// column set and are intentionally not included here.
pub fn derive(request: &PredictionRequest) -> FeatureRow {
    let building_area = request.building_area;
    let land_area = request.land_area;
    let bathrooms = request.bathroom_count as f64;
    let bedrooms = request.bedroom_count as f64;

    let ratio = if land_area == 0.0 {
        Value::Missing
    } else {
        Value::Number(building_area / land_area)
    };

    FeatureRow::new(vec![
        ("building_area", Value::Number(building_area)),
        ("land_area", Value::Number(land_area)),
        ("bathroom_count", Value::Number(bathrooms)),
        ("bedroom_count", Value::Number(bedrooms)),
        (
            "city_or_regency",
            Value::Text(request.city_or_regency.clone()),
        ),
        ("province", Value::Text(request.province.clone())),
        ("property_type", Value::Text(request.property_type.clone())),
        ("area_product", Value::Number(building_area * land_area)),
        ("log_building_area", Value::Number(building_area.ln_1p())),
        ("log_land_area", Value::Number(land_area.ln_1p())),
        (
            "building_area_x_bathrooms",
            Value::Number(building_area * bathrooms),
        ),
        ("land_area_x_bedrooms", Value::Number(land_area * bedrooms)),
        ("building_to_land_area_ratio", ratio),
    ])
}
