use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::time::Duration;

use burn_ndarray::NdArray;

use qiqc_rs::SentenceFeatureExtractor;
use qiqc_rs::qiqc::architectures::base::config::ModelConfig;
use qiqc_rs::qiqc::architectures::base::layers::{DeterministicRngContext, PretrainedEmbedding};
use qiqc_rs::qiqc::architectures::base::model::{pad_token_ids, padding_mask};
use qiqc_rs::qiqc::experiments::build_model;

type BenchBackend = NdArray<f32>;

/// Deterministic corpus with a mix of casing and repeated words.
fn corpus(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| {
            let words = 4 + i % 12;
            (0..words)
                .map(|w| {
                    let word = format!("word{}", (i * 7 + w * 3) % 50);
                    if (i + w) % 5 == 0 { word.to_uppercase() } else { word }
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

fn benchmark_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("sentence_features");
    group.measurement_time(Duration::from_secs(5));

    for n in [100usize, 1_000, 10_000] {
        let sentences = corpus(n);
        group.bench_with_input(BenchmarkId::new("extract_batch", n), &sentences, |b, s| {
            let extractor = SentenceFeatureExtractor::new();
            b.iter(|| black_box(extractor.extract_batch(black_box(s)).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("fit_and_normalize", n), &sentences, |b, s| {
            let raw = SentenceFeatureExtractor::new().extract_batch(s).unwrap();
            b.iter(|| {
                let mut extractor = SentenceFeatureExtractor::new();
                black_box(extractor.fit_and_normalize(black_box(&raw)).unwrap())
            })
        });
    }

    group.finish();
}

fn benchmark_forward(c: &mut Criterion) {
    let device = Default::default();
    let mut group = c.benchmark_group("classifier_forward");
    group.measurement_time(Duration::from_secs(10));

    let vocab_size = 50;
    let dim = 32;
    let rows: Vec<Vec<f32>> = (0..vocab_size)
        .map(|id| (0..dim).map(|j| ((id * dim + j) as f32 * 0.01).sin()).collect())
        .collect();

    for (name, encoder) in [("lstm", "lstm"), ("bilstm", "bilstm"), ("gru", "gru")] {
        let mut config = ModelConfig::default();
        config.encoder.name = encoder.to_string();
        config.encoder.attention = Some("standard".to_string());

        let rng_ctx = DeterministicRngContext::<BenchBackend>::new(42, device);
        let embedding = PretrainedEmbedding::from_rows(&rows, true, &device);
        let model = build_model(&config, embedding, 1.0, &rng_ctx).unwrap();

        let ids: Vec<Vec<i64>> = (0..16)
            .map(|i| (0..24).map(|t| ((i * 3 + t) % (vocab_size - 1) + 1) as i64).collect())
            .collect();
        let tokens = pad_token_ids::<BenchBackend>(&ids, 24, 0, &device);
        let mask = padding_mask(tokens.clone(), 0);

        group.bench_function(BenchmarkId::new("forward", name), |b| {
            b.iter(|| {
                black_box(
                    model
                        .forward(tokens.clone(), None, mask.clone())
                        .unwrap(),
                )
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_extraction, benchmark_forward);
criterion_main!(benches);
