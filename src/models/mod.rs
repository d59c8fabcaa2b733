pub mod choice;
pub mod extraction;
pub mod image;
pub mod loaders;
pub mod master_key;
pub mod scoring;
pub mod summary;
pub mod transcript;

pub use choice::{Choice, NormalizedChoice};
pub use extraction::{Anomaly, ParseResult, Recovery};
pub use image::ImageInput;
pub use loaders::{
    load_images_in_dir, load_master_key, save_master_key, scan_student_dirs, MasterKeyFile,
    StudentSubmission,
};
pub use master_key::{MasterKey, MasterKeyItem};
pub use scoring::{ScoringResult, StudentAnswerItem, NO_WEAK_TOPIC};
pub use summary::{ClassSummary, ScoreDistribution, TopicFrequency, PASS_THRESHOLD};
pub use transcript::{RawAnswer, Transcript};
