//! End-to-end tests: SGF bytes -> snapshots -> feature tensors.

use kifu_replay::board::{replay, BoardReplayer, Color, Move, Point, Position, ReplayError, POINT_COUNT};
use kifu_replay::nn::encoding::{BLACK_TO_MOVE_PLANE, WHITE_TO_MOVE_PLANE};
use kifu_replay::nn::{occupancy_plane, FeatureEncoder, FeatureLayout, HISTORY_DEPTH};
use kifu_replay::protocol::{parse_record, RecordError};
use ndarray::{s, Array2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const LAYOUTS: [FeatureLayout; 2] = [FeatureLayout::Grouped, FeatureLayout::Sequential];

/// Plays `len` random moves, mostly on empty points with the odd pass.
fn random_game(seed: u64, len: usize) -> Vec<Move> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut replayer = BoardReplayer::new(Position::empty(), Color::Black);
    let mut moves = Vec::with_capacity(len);
    let mut color = Color::Black;
    while moves.len() < len {
        let mv = if rng.gen_ratio(1, 20) {
            Move::pass(color)
        } else {
            let point = Point::from_index(rng.gen_range(0..POINT_COUNT)).unwrap();
            if !replayer.current().is_empty_at(point) {
                continue;
            }
            Move::play(color, point)
        };
        replayer.apply(&mv).unwrap();
        moves.push(mv);
        color = color.opposite();
    }
    moves
}

fn to_sgf(moves: &[Move]) -> String {
    let mut sgf = String::from("(;GM[1]FF[4]SZ[19]");
    for mv in moves {
        let coord = mv.target.point().map(Point::to_sgf).unwrap_or_default();
        sgf.push_str(&format!(";{}[{}]", mv.color.sgf_char(), coord));
    }
    sgf.push(')');
    sgf
}

fn all_equal(plane: ndarray::ArrayView2<f32>, value: f32) -> bool {
    plane.iter().all(|&v| v == value)
}

#[test]
fn zero_move_record() {
    let record = parse_record(b"(;GM[1]SZ[19])").unwrap();
    let snapshots = record.replay().unwrap();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0], Position::empty());

    let batch = FeatureEncoder::default().encode_all(&snapshots);
    assert_eq!(batch.shape(), &[1, 18, 19, 19]);
    assert!(all_equal(batch.slice(s![0, BLACK_TO_MOVE_PLANE, .., ..]), 1.0));
    assert!(all_equal(batch.slice(s![0, WHITE_TO_MOVE_PLANE, .., ..]), 0.0));
    assert!(batch.slice(s![0, ..16, .., ..]).iter().all(|&v| v == 0.0));
}

#[test]
fn move_onto_occupied_point_stops_replay() {
    let record = parse_record(b"(;GM[1]SZ[19];B[dd];W[dd];B[pp])").unwrap();
    let err = record.replay().unwrap_err();
    assert_eq!(
        err,
        ReplayError::IllegalMove {
            ply: 1,
            point: Point::from_sgf("dd").unwrap(),
            occupant: Color::Black,
        }
    );

    // Exactly the setup and the first move were produced.
    let mut replayer = BoardReplayer::new(record.setup.clone(), record.first_mover);
    replayer.apply(&record.moves[0]).unwrap();
    assert!(replayer.apply(&record.moves[1]).is_err());
    assert_eq!(replayer.snapshots().len(), 2);
}

#[test]
fn pass_repeats_position_and_flips_perspective() {
    let record = parse_record(b"(;GM[1]SZ[19];B[pd];W[dp];B[];W[dd])").unwrap();
    let snapshots = record.replay().unwrap();
    let k = 3;
    assert_eq!(snapshots[k], snapshots[k - 1]);

    for layout in LAYOUTS {
        let encoder = FeatureEncoder::new(layout);
        let at_k = encoder.encode(&snapshots, k).unwrap();
        let before = encoder.encode(&snapshots, k - 1).unwrap();
        assert_eq!(
            at_k.index_axis(ndarray::Axis(0), layout.mover_channel(0)),
            before.index_axis(ndarray::Axis(0), layout.opponent_channel(0)),
            "{}",
            layout
        );
    }
}

#[test]
fn small_board_rejected_before_replay() {
    assert!(matches!(
        parse_record(b"(;GM[1]SZ[13];B[dd];W[dd])"),
        Err(RecordError::UnsupportedBoardSize(_))
    ));
}

#[test]
fn snapshot_count_is_moves_plus_one() {
    for seed in 0..8 {
        let moves = random_game(seed, 40 + 10 * seed as usize);
        let record = parse_record(to_sgf(&moves).as_bytes()).unwrap();
        assert_eq!(record.moves, moves);
        let snapshots = record.replay().unwrap();
        assert_eq!(snapshots.len(), moves.len() + 1);
    }
}

#[test]
fn depth_zero_matches_occupancy() {
    let moves = random_game(11, 120);
    let snapshots = replay(Position::empty(), Color::Black, &moves).unwrap();
    for layout in LAYOUTS {
        let encoder = FeatureEncoder::new(layout);
        for ply in [0, 1, 7, 8, 63, 120] {
            let tensor = encoder.encode(&snapshots, ply).unwrap();
            let mover = snapshots.mover(ply);
            let expected: Array2<f32> = occupancy_plane(&snapshots[ply], mover);
            assert_eq!(tensor.index_axis(ndarray::Axis(0), layout.mover_channel(0)), expected);
            let expected = occupancy_plane(&snapshots[ply], mover.opposite());
            assert_eq!(tensor.index_axis(ndarray::Axis(0), layout.opponent_channel(0)), expected);
        }
    }
}

#[test]
fn history_planes_look_back() {
    let moves = random_game(5, 30);
    let snapshots = replay(Position::empty(), Color::Black, &moves).unwrap();
    let encoder = FeatureEncoder::default();
    let ply = 20;
    let tensor = encoder.encode(&snapshots, ply).unwrap();
    let mover = snapshots.mover(ply);
    for depth in 0..HISTORY_DEPTH {
        let past = &snapshots[ply - depth];
        assert_eq!(
            tensor.index_axis(ndarray::Axis(0), FeatureLayout::Grouped.mover_channel(depth)),
            occupancy_plane(past, mover)
        );
    }
}

#[test]
fn encoding_is_deterministic() {
    let moves = random_game(3, 60);
    let snapshots = replay(Position::empty(), Color::Black, &moves).unwrap();
    let encoder = FeatureEncoder::new(FeatureLayout::Sequential);
    for ply in 0..snapshots.len() {
        assert_eq!(encoder.encode(&snapshots, ply).unwrap(), encoder.encode(&snapshots, ply).unwrap());
    }
    assert_eq!(encoder.encode_all(&snapshots), encoder.encode_all_par(&snapshots));
}

#[test]
fn first_ply_has_no_history() {
    let record = parse_record(b"(;GM[1]SZ[19]AB[dd][pp]AW[dp];W[pd])").unwrap();
    let snapshots = record.replay().unwrap();
    for layout in LAYOUTS {
        let tensor = FeatureEncoder::new(layout).encode(&snapshots, 0).unwrap();
        for depth in 1..HISTORY_DEPTH {
            assert!(all_equal(tensor.index_axis(ndarray::Axis(0), layout.mover_channel(depth)), 0.0));
            assert!(all_equal(tensor.index_axis(ndarray::Axis(0), layout.opponent_channel(depth)), 0.0));
        }
        // White moves first here, so the mover plane holds the white stone.
        let mover = tensor.index_axis(ndarray::Axis(0), layout.mover_channel(0));
        assert_eq!(mover.sum(), 1.0);
        assert!(all_equal(tensor.index_axis(ndarray::Axis(0), WHITE_TO_MOVE_PLANE), 1.0));
    }
}

#[test]
fn captures_clear_planes() {
    // White's corner stone at aa is captured by B[ab] after B[ba].
    let record = parse_record(b"(;GM[1]SZ[19];B[ba];W[aa];B[ab])").unwrap();
    let snapshots = record.replay().unwrap();
    let last = snapshots.last();
    assert!(last.is_empty_at(Point::from_sgf("aa").unwrap()));
    assert_eq!(last.stone_count(Color::White), 0);

    let tensor = FeatureEncoder::default().encode(&snapshots, 3).unwrap();
    // White to move at ply 3: mover depth 0 is empty, depth 1 still has the stone.
    assert_eq!(tensor.index_axis(ndarray::Axis(0), 0).sum(), 0.0);
    assert_eq!(tensor.index_axis(ndarray::Axis(0), 1).sum(), 1.0);
}
