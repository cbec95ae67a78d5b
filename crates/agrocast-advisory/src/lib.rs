//! Advisory presentation for Agrocast
//!
//! Normalizes the agent's loosely shaped advisory payloads into a
//! [`PresentationTree`], and builds the daily weather advisory and the
//! grower services report on top of it. Also puts free-form questions and
//! crop disease diagnoses to the agent.

pub mod ask;
pub mod daily;
pub mod diagnosis;
pub mod grower;
pub mod json_like;
pub mod normalize;
pub mod tree;

pub use ask::{QuestionAdvisor, NO_RESPONSE, REQUEST_FAILED};
pub use daily::{advisory_date, daily_advisory, date_key, upcoming_advisories};
pub use diagnosis::{
    encode_image, remedy_text, DiagnosisAdvisor, Remedy, RemedySummary, DIAGNOSIS_IMAGE_COUNT,
    NO_SUMMARY,
};
pub use grower::{GrowerAdvisor, GrowerCard, GrowerReport};
pub use json_like::JsonLike;
pub use normalize::{
    format_key, is_ordinal_key, normalize, split_on_colon, ColonSplit, ResponseNormalizer,
    TextParser,
};
pub use tree::{Leaf, PresentationTree, Section};
