pub mod architectures;
pub mod builder;
pub mod error;
pub mod experiments;
pub mod sentence_features;
pub mod settings;
pub mod word_features;
