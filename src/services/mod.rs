pub mod class_aggregator;
pub mod export;
pub mod json_recovery;
pub mod llm_service;
pub mod master_key_parser;
pub mod prompts;
pub mod scoring_engine;
pub mod transcript_parser;
pub mod warn_writer;

pub use class_aggregator::summarize;
pub use export::{build_table, ExportTable};
pub use llm_service::{ExtractionRequest, LlmService, VisionExtractor};
pub use master_key_parser::{MasterKeyParse, MasterKeyParser};
pub use scoring_engine::{score_student, score_transcript};
pub use transcript_parser::TranscriptParser;
pub use warn_writer::{write_raw_output, WarnWriter};
