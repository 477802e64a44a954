pub mod bilstm;

pub use bilstm::{build_model, build_models, fit_sentence_features};
pub use crate::qiqc::builder::build_sentence_feature;
