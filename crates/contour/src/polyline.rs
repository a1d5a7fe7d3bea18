//! Segment linking and smoothing.

use std::collections::{HashMap, VecDeque};

use crate::marching::{GridPoint, Segment};

/// Endpoint matching tolerance in grid units.
const LINK_EPSILON: f64 = 1e-6;

/// A connected contour line in grid coordinates.
///
/// Closed polylines repeat their first point at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub points: Vec<GridPoint>,
    pub closed: bool,
}

type PointKey = (i64, i64);

fn key(p: &GridPoint) -> PointKey {
    (
        (p.x / LINK_EPSILON).round() as i64,
        (p.y / LINK_EPSILON).round() as i64,
    )
}

/// Connect line segments into continuous polylines.
///
/// Starting from the lowest-index unused segment, a line is grown at its
/// tail and then at its head, each step taking the lowest-index unused
/// segment that shares the endpoint. Output order follows the seeds, so
/// identical input yields identical polylines.
pub fn connect_segments(segments: &[Segment]) -> Vec<Polyline> {
    if segments.is_empty() {
        return vec![];
    }

    let mut by_endpoint: HashMap<PointKey, Vec<usize>> = HashMap::new();
    for (i, seg) in segments.iter().enumerate() {
        by_endpoint.entry(key(&seg.start)).or_default().push(i);
        by_endpoint.entry(key(&seg.end)).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut lines = Vec::new();

    for seed in 0..segments.len() {
        if used[seed] {
            continue;
        }
        used[seed] = true;

        let mut points: VecDeque<GridPoint> = VecDeque::from([segments[seed].start, segments[seed].end]);

        while let Some(&tail) = points.back() {
            match next_point(segments, &by_endpoint, &mut used, &tail) {
                Some(p) => points.push_back(p),
                None => break,
            }
        }
        while let Some(&head) = points.front() {
            match next_point(segments, &by_endpoint, &mut used, &head) {
                Some(p) => points.push_front(p),
                None => break,
            }
        }

        let points: Vec<GridPoint> = points.into();
        let closed = points.len() > 2
            && key(&points[0]) == key(&points[points.len() - 1]);

        lines.push(Polyline { points, closed });
    }

    lines
}

/// Claim the next unused segment touching `at` and return its far end.
fn next_point(
    segments: &[Segment],
    by_endpoint: &HashMap<PointKey, Vec<usize>>,
    used: &mut [bool],
    at: &GridPoint,
) -> Option<GridPoint> {
    let k = key(at);
    let candidates = by_endpoint.get(&k)?;
    let idx = candidates.iter().copied().find(|&i| !used[i])?;
    used[idx] = true;

    let seg = &segments[idx];
    if key(&seg.start) == k {
        Some(seg.end)
    } else {
        Some(seg.start)
    }
}

/// Apply Chaikin's corner cutting algorithm for smoothing.
///
/// Open lines keep their endpoints; closed lines stay closed.
pub fn smooth_polyline(line: &Polyline, iterations: u32) -> Polyline {
    if iterations == 0 || line.points.len() < 3 {
        return line.clone();
    }

    // Work on the ring without its repeated closing point.
    let mut points = if line.closed {
        line.points[..line.points.len() - 1].to_vec()
    } else {
        line.points.clone()
    };

    for _ in 0..iterations {
        let n = points.len();
        let edges = if line.closed { n } else { n - 1 };
        let mut next = Vec::with_capacity(edges * 2 + 2);

        if !line.closed {
            next.push(points[0]);
        }
        for i in 0..edges {
            let p1 = points[i];
            let p2 = points[(i + 1) % n];
            next.push(GridPoint::new(0.75 * p1.x + 0.25 * p2.x, 0.75 * p1.y + 0.25 * p2.y));
            next.push(GridPoint::new(0.25 * p1.x + 0.75 * p2.x, 0.25 * p1.y + 0.75 * p2.y));
        }
        if !line.closed {
            next.push(points[n - 1]);
        }

        points = next;
    }

    if line.closed {
        points.push(points[0]);
    }

    Polyline {
        points,
        closed: line.closed,
    }
}
