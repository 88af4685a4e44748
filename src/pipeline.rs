//! Title extraction pipeline.
//!
//! image → recognition passes → best raw candidate → normalize → correct →
//! five field extractors → one `ExtractionResult`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::aliases::MakeAliasTable;
use crate::config::PipelineConfig;
use crate::correction::{self, VariantKind};
use crate::fields::{
    extract_make, extract_model, extract_model_anchored, extract_plate_excluding, extract_vin,
    extract_vin_from_variant, extract_year,
};
use crate::normalize::normalize;
use crate::ocr::orchestrator::{PassProgress, RecognitionOrchestrator};
use crate::ocr::{PageImage, RecognitionEngine};
use crate::schema::ExtractionResult;
use crate::scoring::{ResultScorer, ScoredCandidate};

/// Infer the vehicle fields from one raw recognition string.
///
/// Pure; never fails. Fields left absent by the corrected text are retried
/// against one ambiguous-pair variant each: the VIN against letters read as
/// digits, the make against digits read as letters. Plate and year are not
/// retried, since a global rewrite invents mixed letter/digit tokens out of
/// ordinary words.
pub fn extract_fields(raw_text: &str, aliases: &MakeAliasTable) -> ExtractionResult {
    extract_fields_excluding(raw_text, aliases, &[])
}

/// [`extract_fields`] with extra words (configured jurisdictions) that are
/// never accepted as a plate.
pub fn extract_fields_excluding(
    raw_text: &str,
    aliases: &MakeAliasTable,
    plate_denylist: &[String],
) -> ExtractionResult {
    let normalized = normalize(raw_text);
    if normalized.is_empty() {
        return ExtractionResult::empty();
    }
    let corrected = correction::correct(&normalized);
    debug!("Corrected text: {:?}", corrected);

    let mut vehicle_id = extract_vin(&corrected);
    if !vehicle_id.is_present() {
        let variant = correction::variant(&corrected, VariantKind::LettersAsDigits);
        vehicle_id = extract_vin_from_variant(&corrected, &variant);
    }

    let license_plate = extract_plate_excluding(&corrected, plate_denylist);
    let year = extract_year(&corrected);

    let mut make = extract_make(&corrected, aliases);
    let mut model = extract_model(&corrected, make.value(), aliases);
    if !make.is_present() {
        // Only the make comes from the rewrite; the model is read from the
        // corrected text so digits in it survive.
        let variant = correction::variant(&corrected, VariantKind::DigitsAsLetters);
        make = extract_make(&variant, aliases);
        model = extract_model_anchored(&corrected, &variant, make.value(), aliases);
    }

    ExtractionResult::new(vehicle_id, license_plate, year, make, model)
}

/// Everything the pipeline learned about one page.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub result: ExtractionResult,
    /// The raw candidate that won scoring, if any pass produced text.
    pub selected: Option<ScoredCandidate>,
    pub selected_pass: Option<String>,
    pub passes_succeeded: usize,
}

/// Stateless pipeline over an engine, its pass settings and an alias table.
pub struct TitlePipeline {
    orchestrator: RecognitionOrchestrator,
    scorer: ResultScorer,
    aliases: Arc<MakeAliasTable>,
    plate_denylist: Vec<String>,
}

impl TitlePipeline {
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        config: &PipelineConfig,
        aliases: Arc<MakeAliasTable>,
    ) -> Self {
        let orchestrator = RecognitionOrchestrator::new(
            engine,
            config.passes.clone(),
            config.fallback_pass.clone(),
            config.pass_timeout(),
            config.max_concurrent_passes,
        );
        Self {
            orchestrator,
            scorer: ResultScorer::new(&config.all_keywords()),
            aliases,
            plate_denylist: config.plate_denylist(),
        }
    }

    pub fn aliases(&self) -> &MakeAliasTable {
        &self.aliases
    }

    pub fn orchestrator(&self) -> &RecognitionOrchestrator {
        &self.orchestrator
    }

    /// Extract fields from text that has already been recognized.
    pub fn extract_text(&self, raw_text: &str) -> ExtractionResult {
        extract_fields_excluding(raw_text, &self.aliases, &self.plate_denylist)
    }

    /// Run the whole pipeline over one page image.
    pub async fn extract_image(&self, image: &PageImage) -> PipelineOutcome {
        self.extract_image_with_progress(image, None).await
    }

    /// Run the whole pipeline, reporting pass progress on `progress`.
    ///
    /// Events are advisory; a dropped receiver does not affect the outcome.
    pub async fn extract_image_with_progress(
        &self,
        image: &PageImage,
        progress: Option<&UnboundedSender<PassProgress>>,
    ) -> PipelineOutcome {
        let passes = self.orchestrator.run(image, progress).await;
        let texts: Vec<&str> = passes.iter().map(|p| p.raw_text.as_str()).collect();

        let selected = self.scorer.select(&texts);
        let selected_pass = selected.as_ref().and_then(|best| {
            passes
                .iter()
                .find(|p| p.raw_text == best.text)
                .map(|p| p.configuration_id.clone())
        });

        let result = match &selected {
            Some(best) => {
                info!("Selected pass {:?} with score {}", selected_pass, best.score);
                self.extract_text(&best.text)
            }
            None => {
                info!("No recognition text for {}; returning empty result", image.filename);
                ExtractionResult::empty()
            }
        };

        info!(
            "Extraction for {} complete: {} of 5 fields found",
            image.filename,
            result.found_count()
        );

        PipelineOutcome {
            result,
            selected,
            selected_pass,
            passes_succeeded: passes.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{make, model, plate, vin, year};
    use crate::ocr::orchestrator::tests::{test_image, Script, ScriptedEngine};
    use crate::schema::{ExtractedField, FieldKind};

    fn table() -> MakeAliasTable {
        MakeAliasTable::builtin()
    }

    fn assert_absent(result: &ExtractionResult, kinds: &[FieldKind]) {
        for kind in kinds {
            assert_eq!(result.field(*kind), &ExtractedField::absent(), "{:?}", kind);
            assert_eq!(result.confidence[kind], 0.0);
        }
    }

    #[test]
    fn test_clean_vin_only() {
        let result = extract_fields("1HGCM82633A004352", &table());
        assert_eq!(result.vehicle_id.value(), Some("04352"));
        assert_eq!(result.vehicle_id.confidence, vin::VIN_CONFIDENCE);
        assert_eq!(result.confidence[&FieldKind::VehicleId], 0.95);
        assert_absent(
            &result,
            &[FieldKind::LicensePlate, FieldKind::Year, FieldKind::Make, FieldKind::Model],
        );
    }

    #[test]
    fn test_labelled_year_make_model() {
        let result = extract_fields("YEAR 2019 MAKE TOYOTA MODEL CAMRY", &table());
        assert_eq!(result.year.value(), Some("2019"));
        assert_eq!(result.year.confidence, year::CONTEXT_CONFIDENCE);
        assert_eq!(result.make.value(), Some("TOYOTA"));
        assert_eq!(result.make.confidence, make::CONTEXT_CONFIDENCE);
        assert_eq!(result.model.value(), Some("Camry"));
        assert_eq!(result.model.confidence, model::CONTEXT_CONFIDENCE);
        assert_absent(&result, &[FieldKind::VehicleId, FieldKind::LicensePlate]);
    }

    #[test]
    fn test_empty_text_is_fully_absent() {
        let result = extract_fields("", &table());
        assert_eq!(result, ExtractionResult::empty());
        assert_absent(&result, &FieldKind::ALL);
    }

    #[test]
    fn test_labelled_year_beats_larger_number() {
        let result = extract_fields("MODEL YEAR 2015 PHONE 2050", &table());
        assert_eq!(result.year.value(), Some("2015"));
        assert_eq!(result.year.confidence, year::CONTEXT_CONFIDENCE);
    }

    #[test]
    fn test_noisy_title() {
        let raw = "CERTIFICATE OF TITLE\n\
                   Vehicle Identification Number: 1HGCM8-2633A-OO4352\n\
                   Yr: 2O03   Make: Honda   Model: Accord\n\
                   License Plate: 5XYZ123";
        let result = extract_fields(raw, &table());
        assert_eq!(result.vehicle_id.value(), Some("04352"));
        assert_eq!(result.year.value(), Some("2003"));
        assert_eq!(result.make.value(), Some("HONDA"));
        assert_eq!(result.model.value(), Some("Accord"));
        assert_eq!(result.license_plate.value(), Some("5XYZ123"));
        assert_eq!(result.license_plate.confidence, plate::CONTEXT_CONFIDENCE);
    }

    #[test]
    fn test_make_recovered_from_variant() {
        let result = extract_fields("OWNER JANE H0NDA CIVIC", &table());
        assert_eq!(result.make.value(), Some("HONDA"));
        assert_eq!(result.model.value(), Some("Civic"));
    }

    #[test]
    fn test_make_from_variant_keeps_alphanumeric_model() {
        let result = extract_fields("2015 F0RD F150", &table());
        assert_eq!(result.make.value(), Some("FORD"));
        assert_eq!(result.model.value(), Some("F150"));
        assert_eq!(result.year.value(), Some("2015"));
    }

    #[test]
    fn test_vin_recovered_from_variant() {
        // The labelled chunks only form a valid VIN once O reads as 0.
        let result = extract_fields("VIN 1HGCM 82633A 0O4352", &table());
        assert_eq!(result.vehicle_id.value(), Some("04352"));
    }

    #[test]
    fn test_plain_vehicle_lines_have_no_vin() {
        for raw in [
            "2019 TOYOTA CAMRY SE",
            "2018 CHEVY MALIBU LT",
            "OWNER JANE DOE\n123 MAIN STREET APT 4",
            "2017 JEEP WRANGLER X",
        ] {
            let result = extract_fields(raw, &table());
            assert_eq!(result.vehicle_id, ExtractedField::absent(), "{:?}", raw);
        }
    }

    #[test]
    fn test_unlabelled_make_model_line() {
        let result = extract_fields("2019 TOYOTA CAMRY SE", &table());
        assert_eq!(result.year.value(), Some("2019"));
        assert_eq!(result.make.value(), Some("TOYOTA"));
        assert_eq!(result.model.value(), Some("Camry"));
        assert_absent(&result, &[FieldKind::VehicleId, FieldKind::LicensePlate]);
    }

    #[test]
    fn test_garbage_never_panics() {
        for raw in ["\u{0}\u{1}", "@@@@", "🚗🚗🚗", "O0O0O0O0O0O0O0O0O", "\n\n\n"] {
            let result = extract_fields(raw, &table());
            assert_eq!(result.confidence.len(), 5);
        }
    }

    #[tokio::test]
    async fn test_pipeline_selects_best_pass() {
        let engine = Arc::new(ScriptedEngine::new(&[
            ("block_vin_whitelist", Script::Text("1HGCM82633A004352")),
            ("auto_high_res", Script::Text("garbled")),
            (
                "sparse_text",
                Script::Text("TITLE VIN 1HGCM82633A004352 YEAR 2003 MAKE HONDA MODEL ACCORD"),
            ),
        ]));
        let pipeline = TitlePipeline::new(engine, &PipelineConfig::default(), Arc::new(table()));
        let outcome = pipeline.extract_image(&test_image()).await;

        assert_eq!(outcome.passes_succeeded, 3);
        assert_eq!(outcome.selected_pass.as_deref(), Some("sparse_text"));
        assert_eq!(outcome.result.vehicle_id.value(), Some("04352"));
        assert_eq!(outcome.result.model.value(), Some("Accord"));
    }

    #[tokio::test]
    async fn test_pipeline_rejects_configured_jurisdiction_as_plate() {
        let engine = Arc::new(ScriptedEngine::new(&[(
            "sparse_text",
            Script::Text("ISSUED IN ZONE4B\nMAKE HONDA"),
        )]));
        let config = PipelineConfig {
            jurisdictions: vec!["Zone 4B".to_string()],
            ..PipelineConfig::default()
        };
        let pipeline = TitlePipeline::new(engine, &config, Arc::new(table()));
        let outcome = pipeline.extract_image(&test_image()).await;

        assert_eq!(outcome.result.make.value(), Some("HONDA"));
        assert_eq!(outcome.result.license_plate, ExtractedField::absent());
    }

    #[tokio::test]
    async fn test_pipeline_reports_progress() {
        let engine = Arc::new(ScriptedEngine::new(&[("sparse_text", Script::Text("MAKE FORD"))]));
        let pipeline = TitlePipeline::new(engine, &PipelineConfig::default(), Arc::new(table()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let outcome = pipeline
            .extract_image_with_progress(&test_image(), Some(&tx))
            .await;
        drop(tx);

        assert_eq!(outcome.result.make.value(), Some("FORD"));
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(events.contains(&PassProgress::PassCompleted {
            pass: "sparse_text".to_string(),
            chars: 9,
        }));
        assert!(!events.contains(&PassProgress::FallbackStarted));
    }

    #[tokio::test]
    async fn test_pipeline_total_failure() {
        let engine = Arc::new(ScriptedEngine::new(&[]));
        let pipeline = TitlePipeline::new(engine, &PipelineConfig::default(), Arc::new(table()));
        let outcome = pipeline.extract_image(&test_image()).await;

        assert_eq!(outcome.passes_succeeded, 0);
        assert!(outcome.selected.is_none());
        assert_eq!(outcome.result, ExtractionResult::empty());
    }
}
