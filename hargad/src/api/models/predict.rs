//! Request and response models for the prediction endpoint.
//!
//! The wire contract uses the historical CSV column names (`LB`, `LT`, `KM`,
//! `KT`, `Kota/Kab`, `Provinsi`, `Type`) while the rest of the crate works
//! with canonical field names. The mapping lives in [`WIRE_FIELDS`] and the
//! serde rename attributes; it is lossless in both directions so the external
//! contract can evolve independently of internal naming.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Canonical field name ↔ external wire name, in wire order.
pub const WIRE_FIELDS: [(&str, &str); 9] = [
    ("building_area", "LB"),
    ("land_area", "LT"),
    ("bathroom_count", "KM"),
    ("bedroom_count", "KT"),
    ("city_or_regency", "Kota/Kab"),
    ("province", "Provinsi"),
    ("property_type", "Type"),
    ("price_per_sqm", "harga_per_m2"),
    ("building_to_land_ratio", "ratio_bangunan_rumah"),
];

/// Wire name for a canonical field, if it exists.
pub fn wire_name(canonical: &str) -> Option<&'static str> {
    WIRE_FIELDS
        .iter()
        .find(|(c, _)| *c == canonical)
        .map(|(_, w)| *w)
}

/// Canonical name for a wire field, if it exists.
pub fn canonical_name(wire: &str) -> Option<&'static str> {
    WIRE_FIELDS.iter().find(|(_, w)| *w == wire).map(|(c, _)| *c)
}

/// An incoming prediction request, deserialized from the wire field names.
///
/// Range constraints are enforced by [`PredictionRequest::validate`], which
/// also trims surrounding whitespace from the string fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Floor area in square meters. Must be greater than zero.
    #[serde(rename = "LB")]
    pub building_area: f64,

    /// Lot area in square meters. Zero is accepted; downstream division
    /// degrades to the missing-value marker rather than raising.
    #[serde(rename = "LT")]
    pub land_area: f64,

    #[serde(rename = "KM")]
    pub bathroom_count: i64,

    #[serde(rename = "KT")]
    pub bedroom_count: i64,

    #[serde(rename = "Kota/Kab")]
    pub city_or_regency: String,

    #[serde(rename = "Provinsi")]
    pub province: String,

    #[serde(rename = "Type")]
    pub property_type: String,

    /// Pass-through auxiliary feature; not part of the fitted column set.
    #[serde(
        rename = "harga_per_m2",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub price_per_sqm: Option<f64>,

    /// Pass-through auxiliary feature; not part of the fitted column set.
    #[serde(
        rename = "ratio_bangunan_rumah",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub building_to_land_ratio: Option<f64>,
}

impl PredictionRequest {
    /// Normalize string fields and enforce range constraints.
    ///
    /// Runs before any artifact load or model work; a failure here rejects
    /// the request outright.
    pub fn validate(&mut self) -> Result<()> {
        self.city_or_regency = self.city_or_regency.trim().to_string();
        self.province = self.province.trim().to_string();
        self.property_type = self.property_type.trim().to_string();

        if !self.building_area.is_finite() || self.building_area <= 0.0 {
            return Err(Error::validation(
                "building_area (LB) must be greater than zero",
            ));
        }
        if !self.land_area.is_finite() || self.land_area < 0.0 {
            return Err(Error::validation("land_area (LT) must not be negative"));
        }
        if self.bathroom_count < 0 {
            return Err(Error::validation("bathroom_count (KM) must not be negative"));
        }
        if self.bedroom_count < 0 {
            return Err(Error::validation("bedroom_count (KT) must not be negative"));
        }
        if self.city_or_regency.is_empty() {
            return Err(Error::validation("city_or_regency (Kota/Kab) must not be empty"));
        }
        if self.province.is_empty() {
            return Err(Error::validation("province (Provinsi) must not be empty"));
        }
        if self.property_type.is_empty() {
            return Err(Error::validation("property_type (Type) must not be empty"));
        }
        Ok(())
    }
}

/// One entry of the top-3 feature importance summary.
///
/// Serialized as an array of label/score pairs instead of a JSON object so
/// the descending order survives serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub label: String,
    pub score: f64,
}

/// The prediction endpoint's response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Predicted price, non-negative, rounded to 2 decimals.
    pub prediction: f64,

    /// Wall-clock prediction time, ISO-8601 UTC with a trailing `Z`.
    pub prediction_time: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,

    /// `(low, high)` band around the prediction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<(f64, f64)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Top-3 importances, descending. Omitted entirely when the model
    /// exposes none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_importance: Option<Vec<FeatureImportance>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_time_ms: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_body() -> serde_json::Value {
        json!({
            "LB": 120.0,
            "LT": 150.0,
            "KM": 2,
            "KT": 3,
            "Kota/Kab": "Bandung",
            "Provinsi": "Jawa Barat",
            "Type": "rumah"
        })
    }

    #[test]
    fn deserializes_from_wire_names() {
        let req: PredictionRequest = serde_json::from_value(wire_body()).unwrap();
        assert_eq!(req.building_area, 120.0);
        assert_eq!(req.land_area, 150.0);
        assert_eq!(req.bathroom_count, 2);
        assert_eq!(req.bedroom_count, 3);
        assert_eq!(req.city_or_regency, "Bandung");
        assert_eq!(req.province, "Jawa Barat");
        assert_eq!(req.property_type, "rumah");
        assert_eq!(req.price_per_sqm, None);
        assert_eq!(req.building_to_land_ratio, None);
    }

    #[test]
    fn aliasing_round_trips_losslessly() {
        let req: PredictionRequest = serde_json::from_value(wire_body()).unwrap();
        let encoded = serde_json::to_value(&req).unwrap();
        assert_eq!(encoded, wire_body());

        let decoded: PredictionRequest = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let mut body = wire_body();
        body.as_object_mut().unwrap().remove("LB");
        let result: std::result::Result<PredictionRequest, _> = serde_json::from_value(body);
        assert!(result.is_err());
    }

    #[test]
    fn validate_trims_strings() {
        let mut req: PredictionRequest = serde_json::from_value(json!({
            "LB": 120.0,
            "LT": 150.0,
            "KM": 2,
            "KT": 3,
            "Kota/Kab": "  Bandung ",
            "Provinsi": " Jawa Barat",
            "Type": "rumah  "
        }))
        .unwrap();
        req.validate().unwrap();
        assert_eq!(req.city_or_regency, "Bandung");
        assert_eq!(req.province, "Jawa Barat");
        assert_eq!(req.property_type, "rumah");
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let base: PredictionRequest = serde_json::from_value(wire_body()).unwrap();

        let mut req = base.clone();
        req.building_area = 0.0;
        assert!(req.validate().is_err());

        let mut req = base.clone();
        req.land_area = -1.0;
        assert!(req.validate().is_err());

        let mut req = base.clone();
        req.bathroom_count = -1;
        assert!(req.validate().is_err());

        let mut req = base.clone();
        req.bedroom_count = -2;
        assert!(req.validate().is_err());

        let mut req = base.clone();
        req.province = "   ".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_accepts_zero_land_area() {
        let mut req: PredictionRequest = serde_json::from_value(wire_body()).unwrap();
        req.land_area = 0.0;
        assert!(req.validate().is_ok());
    }

    #[test]
    fn optional_pass_through_fields_are_accepted() {
        let mut body = wire_body();
        body.as_object_mut()
            .unwrap()
            .insert("harga_per_m2".to_string(), json!(4_500_000.0));
        body.as_object_mut()
            .unwrap()
            .insert("ratio_bangunan_rumah".to_string(), json!(0.8));

        let req: PredictionRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.price_per_sqm, Some(4_500_000.0));
        assert_eq!(req.building_to_land_ratio, Some(0.8));
    }

    #[test]
    fn wire_mapping_is_consistent_both_ways() {
        for (canonical, wire) in WIRE_FIELDS {
            assert_eq!(wire_name(canonical), Some(wire));
            assert_eq!(canonical_name(wire), Some(canonical));
        }
        assert_eq!(wire_name("no_such_field"), None);
        assert_eq!(canonical_name("no_such_field"), None);
    }

    #[test]
    fn response_omits_absent_enrichment_fields() {
        let response = PredictionResponse {
            prediction: 500_000_000.0,
            prediction_time: "2026-01-01T00:00:00.000000Z".to_string(),
            confidence_score: None,
            price_range: None,
            model_name: None,
            feature_importance: None,
            prediction_time_ms: None,
        };
        let encoded = serde_json::to_value(&response).unwrap();
        let object = encoded.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("prediction"));
        assert!(object.contains_key("prediction_time"));
    }
}
