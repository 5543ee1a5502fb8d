#![allow(dead_code)]

use linecount::counting::{Frame, FrameSize, Observation, Point};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const SIZE: FrameSize = FrameSize {
    width: 640,
    height: 480,
};

/// The default vertical line sits at x = 320 in a 640-wide frame.
pub const LINE_X: f64 = 320.0;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// An x coordinate strictly left of the line.
pub fn left_x() -> BoxedStrategy<f64> {
    (0u32..320).prop_map(f64::from).boxed()
}

/// An x coordinate strictly right of the line.
pub fn right_x() -> BoxedStrategy<f64> {
    (321u32..=640).prop_map(f64::from).boxed()
}

/// An x coordinate on either side, or exactly on the line.
pub fn any_x() -> BoxedStrategy<f64> {
    prop_oneof![
        8 => (0u32..=640).prop_map(f64::from),
        1 => Just(LINE_X),
    ]
    .boxed()
}

/// A path for one track that starts on one side, wanders on that side
/// (touching the line is allowed), then ends on the other side and stays
/// there. Returns the x coordinates and whether it started on the left.
pub fn single_crossing_path() -> BoxedStrategy<(Vec<f64>, bool)> {
    any::<bool>()
        .prop_flat_map(|starts_left| {
            let (near, far) = if starts_left {
                (left_x(), right_x())
            } else {
                (right_x(), left_x())
            };
            let near_or_line = prop_oneof![4 => near.clone(), 1 => Just(LINE_X)];
            let far_or_line = prop_oneof![4 => far.clone(), 1 => Just(LINE_X)];
            (
                near,
                proptest::collection::vec(near_or_line, 0..6),
                far,
                proptest::collection::vec(far_or_line, 0..6),
                Just(starts_left),
            )
        })
        .prop_map(|(first, before, cross, after, starts_left)| {
            let mut path = Vec::with_capacity(2 + before.len() + after.len());
            path.push(first);
            path.extend(before);
            path.push(cross);
            path.extend(after);
            (path, starts_left)
        })
        .boxed()
}

/// One frame per x coordinate, all for the same track.
pub fn frames_for_path(track_id: u64, class: &str, path: &[f64]) -> Vec<Frame> {
    path.iter()
        .enumerate()
        .map(|(i, x)| {
            Frame::new(
                i as u64,
                SIZE,
                vec![Observation::new(track_id, class, Point::new(*x, 240.0))],
            )
        })
        .collect()
}
