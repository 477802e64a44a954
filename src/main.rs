use std::path::PathBuf;
use std::process::ExitCode;

use burn_ndarray::NdArray;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal, NormalError};

use qiqc_rs::qiqc::architectures::base::config::ExperimentConfig;
use qiqc_rs::qiqc::architectures::base::model::{pad_token_ids, padding_mask};
use qiqc_rs::qiqc::experiments::{build_models, fit_sentence_features};
use qiqc_rs::qiqc::word_features::{PAD_ID, UNK_ID, Vocabulary};
use qiqc_rs::settings;

type Backend = NdArray<f32>;

const SAMPLE: [&str; 4] = [
    "How do I learn Rust quickly?",
    "Why is the sky blue?",
    "What is the best way to cook rice?",
    "Is it true that THE MOON is made of cheese?",
];

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.qiqc.experiment.clone());
    let config = match &path {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };
    log::info!(
        "qiqc-rs starting (experiment {:?}, encoder {}, {} fold(s))",
        path,
        config.model.encoder.name,
        config.cv
    );

    let vocab = Vocabulary::build(&SAMPLE);
    let pretrained = vec![random_table(&vocab, settings.qiqc.embedding_dim, config.seed)?];

    let device = Default::default();
    let (models, unk) = build_models::<Backend>(&config, &vocab, &pretrained, &device)?;
    log::info!("built {} model(s), {} unknown token(s)", models.len(), unk.len());

    let features = fit_sentence_features::<Backend, _>(&config.model, &SAMPLE, &device)?
        .map(|(_, block)| block);

    let ids: Vec<Vec<i64>> = SAMPLE.iter().map(|s| vocab.encode(s)).collect();
    let max_len = ids.iter().map(Vec::len).max().unwrap_or(0);
    let tokens = pad_token_ids::<Backend>(&ids, max_len, PAD_ID as i64, &device);
    let mask = padding_mask(tokens.clone(), PAD_ID as i64);

    for (fold, model) in models.iter().enumerate() {
        let proba = model.predict_proba(tokens.clone(), features.clone(), mask.clone())?;
        let values: Vec<f32> = proba.into_data().to_vec().map_err(|e| format!("{:?}", e))?;
        for (sentence, p) in SAMPLE.iter().zip(values) {
            println!("fold {} p={:.4} {}", fold, p, sentence);
        }
    }

    Ok(())
}

/// Stand-in pretrained table; the padding and unknown rows stay zero.
fn random_table(vocab: &Vocabulary, dim: usize, seed: u64) -> Result<Vec<Vec<f32>>, NormalError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0f32, 0.1)?;
    Ok((0..vocab.len())
        .map(|id| {
            if id == PAD_ID || id == UNK_ID {
                vec![0.0; dim]
            } else {
                (0..dim).map(|_| normal.sample(&mut rng)).collect()
            }
        })
        .collect())
}
