use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use kifu_replay::analysis::{analyze_record, AnalysisConfig};
use kifu_replay::board::{replay, BoardReplayer, Color, Move, Point, Position, Snapshots, POINT_COUNT};
use kifu_replay::nn::{FeatureEncoder, FeatureLayout};

/// A random legal game of `len` plies, no passes.
fn random_moves(seed: u64, len: usize) -> Vec<Move> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut replayer = BoardReplayer::new(Position::empty(), Color::Black);
    let mut moves = Vec::with_capacity(len);
    let mut color = Color::Black;
    while moves.len() < len {
        let Some(point) = Point::from_index(rng.gen_range(0..POINT_COUNT)) else {
            continue;
        };
        if !replayer.current().is_empty_at(point) {
            continue;
        }
        let mv = Move::play(color, point);
        if replayer.apply(&mv).is_ok() {
            moves.push(mv);
            color = color.opposite();
        }
    }
    moves
}

fn game(len: usize) -> Snapshots {
    replay(Position::empty(), Color::Black, &random_moves(42, len)).unwrap()
}

fn to_sgf(moves: &[Move]) -> String {
    let mut sgf = String::from("(;GM[1]SZ[19]");
    for mv in moves {
        let coord = mv.target.point().map(Point::to_sgf).unwrap_or_default();
        sgf.push_str(&format!(";{}[{}]", mv.color.sgf_char(), coord));
    }
    sgf.push(')');
    sgf
}

fn bench_replay(c: &mut Criterion) {
    let moves = random_moves(7, 250);
    c.bench_function("replay_250_moves", |b| {
        b.iter(|| replay(Position::empty(), Color::Black, black_box(&moves)).unwrap())
    });
}

fn bench_encode_ply(c: &mut Criterion) {
    let snapshots = game(250);
    let encoder = FeatureEncoder::default();
    c.bench_function("encode_single_ply", |b| {
        b.iter(|| encoder.encode(black_box(&snapshots), black_box(200)).unwrap())
    });
}

fn bench_encode_all(c: &mut Criterion) {
    let snapshots = game(250);
    let mut group = c.benchmark_group("encode_all_250");
    for layout in [FeatureLayout::Grouped, FeatureLayout::Sequential] {
        let encoder = FeatureEncoder::new(layout);
        group.bench_function(format!("{}_sequential", layout.name()), |b| {
            b.iter(|| encoder.encode_all(black_box(&snapshots)))
        });
        group.bench_function(format!("{}_parallel", layout.name()), |b| {
            b.iter(|| encoder.encode_all_par(black_box(&snapshots)))
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let sgf = to_sgf(&random_moves(9, 200));
    let config = AnalysisConfig::default();
    c.bench_function("analyze_record_200_moves", |b| {
        b.iter(|| analyze_record(black_box(sgf.as_bytes()), &config).unwrap())
    });
}

criterion_group!(
    benches,
    bench_replay,
    bench_encode_ply,
    bench_encode_all,
    bench_full_pipeline
);
criterion_main!(benches);
