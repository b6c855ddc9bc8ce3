//! Request pipeline performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use resume_tailor::models::tailor::{TailorRequest, Tone};
use resume_tailor::services::extractor::extract_text;
use resume_tailor::services::pricing::calculate_cost;
use resume_tailor::services::tailor::build_prompt;

/// Resume of roughly `chars` characters
fn create_resume(chars: usize) -> String {
    "Led a team of engineers delivering payment APIs with strong uptime. "
        .repeat(chars / 68 + 1)
        .chars()
        .take(chars)
        .collect()
}

fn create_job_description() -> String {
    "Senior backend engineer to design, build and operate resilient Rust services.".to_string()
}

fn bench_cost_calculation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cost_calculation");

    for model in ["gpt-4o-mini", "gpt-3.5-turbo", "custom-model"] {
        group.bench_with_input(BenchmarkId::from_parameter(model), model, |b, model| {
            b.iter(|| calculate_cost(black_box(model), black_box(1234), black_box(567)))
        });
    }

    group.finish();
}

fn bench_request_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_validation");

    for size in [200, 1000, 5000] {
        let request = TailorRequest {
            resume_text: create_resume(size),
            job_description: create_job_description(),
            tone: Tone::Professional,
            save_output: false,
        };

        group.bench_with_input(BenchmarkId::from_parameter(size), &request, |b, request| {
            b.iter(|| black_box(request.clone()).validate())
        });
    }

    group.finish();
}

fn bench_prompt_and_extraction(c: &mut Criterion) {
    let resume = create_resume(5000);
    let job = create_job_description();

    c.bench_function("build_prompt", |b| {
        b.iter(|| build_prompt(black_box(&resume), black_box(&job), Tone::Academic))
    });

    c.bench_function("extract_txt", |b| {
        b.iter(|| extract_text(black_box(resume.as_bytes()), "resume.txt"))
    });
}

criterion_group!(
    benches,
    bench_cost_calculation,
    bench_request_validation,
    bench_prompt_and_extraction
);
criterion_main!(benches);
