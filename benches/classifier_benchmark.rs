use std::collections::HashMap;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use team_classifier::classifier::{LinearSpec, TfidfSpec};
use team_classifier::{
    select_top_k, ArtifactStore, ClassificationService, LabelEncoder, LinearModel, RuntimeGate,
    ScoreDistribution, TfidfVectorizer,
};

const VOCABULARY_SIZE: usize = 2_000;

fn setup_benchmark_service(num_classes: usize) -> ClassificationService {
    let vocabulary: HashMap<String, usize> = (0..VOCABULARY_SIZE)
        .map(|i| (format!("term{}", i), i))
        .collect();
    let vectorizer = TfidfVectorizer::from_spec(TfidfSpec {
        vocabulary,
        idf: vec![1.0; VOCABULARY_SIZE],
        lowercase: true,
        token_pattern: r"(?u)\b\w\w+\b".to_string(),
        ngram_range: (1, 2),
        sublinear_tf: true,
        use_idf: true,
        norm: Some(team_classifier::classifier::Norm::L2),
        stop_words: Vec::new(),
    })
    .unwrap();

    let model = LinearModel::from_spec(LinearSpec {
        coefficients: (0..num_classes)
            .map(|c| (0..VOCABULARY_SIZE).map(|f| ((c * 31 + f * 7) % 13) as f32 / 13.0).collect())
            .collect(),
        intercept: vec![0.0; num_classes],
    })
    .unwrap();
    let encoder = LabelEncoder::new((0..num_classes).map(|c| format!("team_{}", c)).collect()).unwrap();

    let store = ArtifactStore::from_backends(Arc::new(vectorizer), Arc::new(encoder), Arc::new(model)).unwrap();
    ClassificationService::builder()
        .with_gate(Arc::new(RuntimeGate::new()))
        .with_store(store)
        .unwrap()
        .build()
        .unwrap()
}

fn bench_top_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("TopK");
    group.sample_size(50);

    for &classes in &[10usize, 100, 1_000] {
        let distribution = ScoreDistribution::new(
            (0..classes).map(|i| ((i * 7919) % 101) as f32 / 101.0).collect(),
        );
        group.bench_function(format!("classes_{}", classes), |b| {
            b.iter(|| select_top_k(black_box(&distribution), 5).unwrap())
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("Classify");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let text = "term1 term42 term1999 term7 and some words the vectorizer has never seen term42";
    for &classes in &[5usize, 50] {
        let service = setup_benchmark_service(classes);
        group.bench_function(format!("classes_{}", classes), |b| {
            b.iter(|| service.classify(black_box(text), 5).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_top_k, bench_classify);
criterion_main!(benches);
