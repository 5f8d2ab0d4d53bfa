// PDF text acquisition
pub mod extraction_router;
pub mod ocr_engine;
pub mod text_layer;
pub mod tools;

pub use extraction_router::{ExtractionMethod, ExtractionResult, ExtractionRouter, TextExtractor};
