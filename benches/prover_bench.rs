//! Criterion benchmarks for a full proving run under the development engine.
//!
//! The guest sums a length-prefixed array of input words and commits the
//! total, so cycle count grows linearly with the input.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{RngCore, SeedableRng};
use rand::rngs::StdRng;

use zkvm_prover::engine::asm::{self, reg};
use zkvm_prover::engine::Program;
use zkvm_prover::memory::INPUT_START;
use zkvm_prover::{DevEngine, Prover};

fn sum_program() -> Program {
    let mut code = asm::li(reg::T0, INPUT_START).to_vec();
    code.extend([
        asm::lw(reg::T1, reg::T0, 0),
        asm::addi(reg::T0, reg::T0, 4),
        asm::addi(reg::A0, reg::ZERO, 0),
        asm::slli(reg::T2, reg::T1, 2),
        asm::add(reg::S0, reg::T0, reg::T2),
        // loop:
        asm::beq(reg::T0, reg::S0, 20),
        asm::lw(reg::A1, reg::T0, 0),
        asm::add(reg::A0, reg::A0, reg::A1),
        asm::addi(reg::T0, reg::T0, 4),
        asm::jal(reg::ZERO, -16),
    ]);
    code.extend(asm::li(reg::SP, 0x0010_0000));
    code.extend([
        asm::sw(reg::A0, reg::SP, 0),
        asm::addi(reg::T1, reg::ZERO, 4),
        asm::commit(reg::SP, reg::T1),
        asm::halt(),
    ]);
    Program::new(code).expect("valid program")
}

fn bench_prove(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("sum.bin");
    sum_program().save(&path).expect("save program");
    let engine = DevEngine::default();
    engine.write_code_id(&path).expect("write code id");

    let mut rng = StdRng::seed_from_u64(7);
    let mut group = c.benchmark_group("prove_sum");

    for words in [64usize, 1024, 8192] {
        let mut input = vec![0u8; 4 * (words + 1)];
        rng.fill_bytes(&mut input[4..]);
        input[..4].copy_from_slice(&(words as u32).to_le_bytes());

        group.throughput(Throughput::Elements(words as u64));
        group.bench_with_input(BenchmarkId::from_parameter(words), &input, |b, input| {
            b.iter(|| {
                let mut prover = Prover::new(&engine, &path);
                prover.write_input(black_box(input));
                black_box(prover.run().expect("proving run"))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_prove);
criterion_main!(benches);
