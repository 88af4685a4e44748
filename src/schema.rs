//! Extraction result types.
//!
//! `ExtractionResult` is the only artifact the pipeline hands back to callers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The five vehicle fields, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    VehicleId,
    LicensePlate,
    Year,
    Make,
    Model,
}

impl FieldKind {
    pub const ALL: [FieldKind; 5] = [
        FieldKind::VehicleId,
        FieldKind::LicensePlate,
        FieldKind::Year,
        FieldKind::Make,
        FieldKind::Model,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::VehicleId => "vehicleId",
            FieldKind::LicensePlate => "licensePlate",
            FieldKind::Year => "year",
            FieldKind::Make => "make",
            FieldKind::Model => "model",
        }
    }
}

/// One extracted value with the confidence tier of the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: Option<String>,
    pub confidence: f64,
}

impl ExtractedField {
    /// A found value. Confidence is clamped into `[0, 1]`.
    pub fn found(value: impl Into<String>, confidence: f64) -> Self {
        Self {
            value: Some(value.into()),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// No value; confidence is always 0.
    pub fn absent() -> Self {
        Self {
            value: None,
            confidence: 0.0,
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl Default for ExtractedField {
    fn default() -> Self {
        Self::absent()
    }
}

/// Structured vehicle fields inferred from one document page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Last five characters of the VIN.
    pub vehicle_id: ExtractedField,
    pub license_plate: ExtractedField,
    pub year: ExtractedField,
    pub make: ExtractedField,
    pub model: ExtractedField,
    pub confidence: BTreeMap<FieldKind, f64>,
}

impl ExtractionResult {
    /// Assemble a result; every slot is set exactly once.
    pub fn new(
        vehicle_id: ExtractedField,
        license_plate: ExtractedField,
        year: ExtractedField,
        make: ExtractedField,
        model: ExtractedField,
    ) -> Self {
        let confidence = BTreeMap::from([
            (FieldKind::VehicleId, vehicle_id.confidence),
            (FieldKind::LicensePlate, license_plate.confidence),
            (FieldKind::Year, year.confidence),
            (FieldKind::Make, make.confidence),
            (FieldKind::Model, model.confidence),
        ]);
        Self {
            vehicle_id,
            license_plate,
            year,
            make,
            model,
            confidence,
        }
    }

    /// A result with all five fields absent.
    pub fn empty() -> Self {
        Self::new(
            ExtractedField::absent(),
            ExtractedField::absent(),
            ExtractedField::absent(),
            ExtractedField::absent(),
            ExtractedField::absent(),
        )
    }

    pub fn field(&self, kind: FieldKind) -> &ExtractedField {
        match kind {
            FieldKind::VehicleId => &self.vehicle_id,
            FieldKind::LicensePlate => &self.license_plate,
            FieldKind::Year => &self.year,
            FieldKind::Make => &self.make,
            FieldKind::Model => &self.model,
        }
    }

    /// Number of fields with a value.
    pub fn found_count(&self) -> usize {
        FieldKind::ALL
            .iter()
            .filter(|k| self.field(**k).is_present())
            .count()
    }
}
