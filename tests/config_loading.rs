//! Experiment configuration files on disk.

use std::io::Write;

use qiqc_rs::BuildError;
use qiqc_rs::qiqc::architectures::base::config::ExperimentConfig;
use tempfile::Builder;

fn write_config(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_toml_experiment() {
    let file = write_config(
        ".toml",
        r#"
pos_weight = 2.5
cv = 4
seed = 17

[vocab]
min_count = 3

[model.embed]
add_noise = 0.1
dropout2d = 0.2

[model.encoder]
name = "gru"
n_hidden = 32
aggregator = "avg"
attention = "standard"
sentence_features = 6

[model.mlp]
n_hidden = 16
activation = "gelu"
"#,
    );

    let config = ExperimentConfig::load(file.path()).unwrap();
    assert_eq!(config.pos_weight, 2.5);
    assert_eq!(config.cv, 4);
    assert_eq!(config.seed, 17);
    assert_eq!(config.vocab.min_count, 3);
    assert_eq!(config.model.encoder.name, "gru");
    assert_eq!(config.model.encoder.attention.as_deref(), Some("standard"));
    assert_eq!(config.model.encoder.output_size().unwrap(), 38);
    assert_eq!(config.model.mlp.activation, "gelu");
    // unspecified fields keep their defaults
    assert_eq!(config.device, "cpu");
    assert_eq!(config.model.encoder.n_layers, 1);
    assert!(!config.model.embed.finetune);
    config.validate_consistent().unwrap();
}

#[test]
fn test_load_json_experiment() {
    let file = write_config(
        ".json",
        r#"{ "cv": 2, "model": { "encoder": { "name": "bilstm", "n_hidden": 8 } } }"#,
    );

    let config = ExperimentConfig::load(file.path()).unwrap();
    assert_eq!(config.cv, 2);
    assert_eq!(config.model.encoder.state_size().unwrap(), 16);
    assert_eq!(config.model.encoder.aggregator, "max");
}

#[test]
fn test_loaded_config_with_bad_values_fails_validation() {
    let file = write_config(
        ".toml",
        r#"
[model.embed]
dropout1d = 1.5

[model.encoder]
name = "lstm"
"#,
    );

    let config = ExperimentConfig::load(file.path()).unwrap();
    assert!(matches!(
        config.validate_consistent(),
        Err(BuildError::InvalidConfig(_))
    ));
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ExperimentConfig::load(dir.path().join("absent.toml")).is_err());
}
