//! Title Extractor - multi-pass OCR field extraction for vehicle title and
//! registration documents.
//!
//! The pipeline runs several recognition passes over one page image, keeps
//! the raw text that looks most like a title, cleans it up and infers five
//! fields from it: VIN suffix, license plate, model year, make and model.

pub mod aliases;
pub mod config;
pub mod correction;
pub mod error;
pub mod fields;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod schema;
pub mod scoring;

pub use pipeline::{extract_fields, extract_fields_excluding, PipelineOutcome, TitlePipeline};
pub use schema::{ExtractedField, ExtractionResult, FieldKind};
