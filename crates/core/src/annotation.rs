//! Annotation record, review patches, and correction validation.
//!
//! An [`Annotation`] is one detection + identification result for one image
//! region. The wire format is the service's snake_case JSON. Accept and
//! ignore are expressed as [`AnnotationPatch`]es applied on top of the
//! current record, so fields the action does not touch carry over unchanged.
//! A correction replaces the record with the reviewer's edited document.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::types::AnnotationId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Sentinel species/name meaning "no confident prediction".
pub const UNDETECTED: &str = "undetected";

/// Lowest valid species confidence.
pub const MIN_CONFIDENCE: f64 = 0.0;

/// Highest valid species confidence.
pub const MAX_CONFIDENCE: f64 = 1.0;

// ---------------------------------------------------------------------------
// BoundingBox
// ---------------------------------------------------------------------------

/// Detection region as `[x, y, width, height]`.
///
/// Serialized as a bare four-element array, matching the service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox(pub [f64; 4]);

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self([x, y, width, height])
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }

    pub fn width(&self) -> f64 {
        self.0[2]
    }

    pub fn height(&self) -> f64 {
        self.0[3]
    }

    /// Check that every coordinate is finite and the extent is non-negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.0.iter().any(|v| !v.is_finite()) {
            return Err(CoreError::Validation(
                "bbox values must be finite numbers".to_string(),
            ));
        }
        if self.width() < 0.0 || self.height() < 0.0 {
            return Err(CoreError::Validation(format!(
                "bbox width and height must be non-negative, got {}x{}",
                self.width(),
                self.height()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Annotation
// ---------------------------------------------------------------------------

/// One image-region prediction record.
///
/// `accepted` also deserializes from the legacy `reviewed` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Annotation {
    pub id: AnnotationId,

    #[validate(length(min = 1, message = "file_name must not be empty"))]
    pub file_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotated_file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cropped_file_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,

    pub species_confidence: f64,

    #[validate(length(min = 1, message = "predicted_species must not be empty"))]
    pub predicted_species: String,

    #[validate(length(min = 1, message = "predicted_name must not be empty"))]
    pub predicted_name: String,

    #[serde(default, alias = "reviewed", skip_serializing_if = "Option::is_none")]
    pub accepted: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored: Option<bool>,
}

impl Annotation {
    /// Whether the reviewer confirmed this prediction.
    pub fn is_accepted(&self) -> bool {
        self.accepted.unwrap_or(false)
    }

    /// Whether the reviewer excluded this annotation from downstream use.
    pub fn is_ignored(&self) -> bool {
        self.ignored.unwrap_or(false)
    }

    /// True when no identity could be resolved.
    pub fn has_undetected_name(&self) -> bool {
        self.predicted_name == UNDETECTED
    }

    /// True when no species could be detected.
    pub fn has_undetected_species(&self) -> bool {
        self.predicted_species == UNDETECTED
    }

    /// Species label for display: the first `_` becomes a space.
    pub fn display_species(&self) -> String {
        self.predicted_species.replacen('_', " ", 1)
    }

    /// Run the full schema check: derived field rules plus numeric ranges.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        validate_confidence(self.species_confidence)?;
        if let Some(bbox) = &self.bbox {
            bbox.validate()?;
        }
        Ok(())
    }
}

/// Validate that a species confidence is a finite value in `0..=1`.
pub fn validate_confidence(confidence: f64) -> Result<(), CoreError> {
    if !confidence.is_finite() {
        return Err(CoreError::Validation(
            "species_confidence must be a finite number".to_string(),
        ));
    }
    if !(MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence) {
        return Err(CoreError::Validation(format!(
            "species_confidence must be between {MIN_CONFIDENCE} and {MAX_CONFIDENCE}, got {confidence}"
        )));
    }
    Ok(())
}

/// Parse reviewer-edited correction JSON for `original`.
///
/// The text must decode to a complete annotation with the same `id` and pass
/// [`Annotation::check`]. The returned record is the edited document as a
/// whole, marked accepted and not ignored, since a correction counts as
/// reviewed. Nothing here touches the network; a failure means the
/// correction cannot be submitted.
pub fn parse_correction(json: &str, original: &Annotation) -> Result<Annotation, CoreError> {
    let mut corrected: Annotation = serde_json::from_str(json)
        .map_err(|e| CoreError::Validation(format!("Invalid annotation JSON: {e}")))?;

    if corrected.id != original.id {
        return Err(CoreError::Validation(format!(
            "Correction id {} does not match annotation {}",
            corrected.id, original.id
        )));
    }

    corrected.check()?;
    corrected.accepted = Some(true);
    corrected.ignored = Some(false);
    Ok(corrected)
}

// ---------------------------------------------------------------------------
// AnnotationPatch
// ---------------------------------------------------------------------------

/// Partial update for one annotation.
///
/// `None` fields leave the base record's value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationPatch {
    pub id: AnnotationId,
    #[serde(default)]
    pub predicted_species: Option<String>,
    #[serde(default)]
    pub predicted_name: Option<String>,
    #[serde(default)]
    pub species_confidence: Option<f64>,
    #[serde(default)]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub accepted: Option<bool>,
    #[serde(default)]
    pub ignored: Option<bool>,
}

impl AnnotationPatch {
    /// Confirm the prediction. Clears `ignored`.
    pub fn accept(id: AnnotationId) -> Self {
        Self {
            id,
            accepted: Some(true),
            ignored: Some(false),
            ..Default::default()
        }
    }

    /// Exclude the annotation from downstream use. Clears `accepted`.
    pub fn ignore(id: AnnotationId) -> Self {
        Self {
            id,
            accepted: Some(false),
            ignored: Some(true),
            ..Default::default()
        }
    }

    /// Produce the full record that results from applying this patch.
    pub fn apply_to(&self, base: &Annotation) -> Annotation {
        let mut updated = base.clone();
        if let Some(species) = &self.predicted_species {
            updated.predicted_species = species.clone();
        }
        if let Some(name) = &self.predicted_name {
            updated.predicted_name = name.clone();
        }
        if let Some(confidence) = self.species_confidence {
            updated.species_confidence = confidence;
        }
        if let Some(bbox) = self.bbox {
            updated.bbox = Some(bbox);
        }
        if let Some(accepted) = self.accepted {
            updated.accepted = Some(accepted);
        }
        if let Some(ignored) = self.ignored {
            updated.ignored = Some(ignored);
        }
        updated
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
