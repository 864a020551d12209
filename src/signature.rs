//! Canonical solution signatures.
//!
//! Two correct solutions score separately only if they are genuinely different. A signature is
//! computed for every way of reading the same path (both directions, and every starting cell when
//! the path closes into a loop) and the lexicographically smallest reading wins, so reversals and
//! rotations of one solution collapse to one string.
//!
//! Each reading is `constraints || topology`, where `constraints` records the order in which
//! hint cells, stitch crossings and corner counts become determined (see [`constraint_signature`])
//! and `topology` is the reduced winding word of [`crate::topology`].

use std::collections::HashSet;

use itertools::Itertools;
use unordered_pair::UnorderedPair;

use crate::board::{CornerCount, StitchCorners};
use crate::cell::CellCode;
use crate::config::{CATEGORY_SEPARATOR, EMPTY_MARKER, EVENT_SEPARATOR, SIGNATURE_SEPARATOR};
use crate::location::{Location, Vertex};
use crate::snapshot::Snapshot;
use crate::step::Step;
use crate::topology::{find_islands, topology_signature, Island};

/// Which of the two crossing diagonals of a stitch vertex a step uses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum Slot {
    /// nw to se
    A,
    /// ne to sw
    B,
}

impl Slot {
    fn of(step: Step) -> Self {
        match step {
            Step::UpLeft | Step::DownRight => Self::A,
            _ => Self::B,
        }
    }

    fn as_char(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
        }
    }
}

/// The four grid edges meeting at a vertex, as pairs of path-adjacent cells, in mask bit order
/// north, west, east, south.
fn incident_edges(vertex: Vertex) -> [UnorderedPair<Location>; 4] {
    let StitchCorners { nw, ne, sw, se } = StitchCorners::from(vertex);
    [
        UnorderedPair::from((nw, ne)),
        UnorderedPair::from((nw, sw)),
        UnorderedPair::from((ne, se)),
        UnorderedPair::from((sw, se)),
    ]
}

fn corner_mask(vertex: Vertex, used: &HashSet<UnorderedPair<Location>>) -> u8 {
    incident_edges(vertex).iter()
        .fold(0, |mask, edge| (mask << 1) | u8::from(used.contains(edge)))
}

fn corner_token(vertex: Vertex, mask: u8) -> String {
    format!("{}:{:x}", vertex, mask)
}

fn render_category(events: &[String]) -> String {
    if events.is_empty() {
        EMPTY_MARKER.to_string()
    } else {
        events.join(EVENT_SEPARATOR)
    }
}

/// The constraint-event signature of one reading of a path.
///
/// Scanning `path` in order, three event categories are recorded:
/// - every hint or rock-paper-scissors cell on the path; hints carry how the path passes through
///   them (`t@2,3:U>R`) or `END` at a path end,
/// - the first crossing of each diagonal slot of a stitch vertex (`2,2:A`),
/// - the moment each corner count is first met exactly, with the mask of used incident edges
///   (`1,1:a`). Corner counts of zero are met before the scan starts.
pub(crate) fn constraint_signature(snapshot: &Snapshot, path: &[Location]) -> String {
    let mut cell_events = Vec::new();
    let mut stitch_events = Vec::new();
    let mut corner_events = Vec::new();

    let mut used_edges: HashSet<UnorderedPair<Location>> = HashSet::with_capacity(path.len());
    let mut crossed_slots: HashSet<(Vertex, Slot)> = HashSet::new();
    let (zero, mut pending): (Vec<&CornerCount>, Vec<&CornerCount>) = snapshot.corner_counts()
        .iter()
        .partition(|corner| corner.target == 0);
    corner_events.extend(zero.iter().map(|corner| corner_token(corner.vertex, 0)));

    for (i, &cell) in path.iter().enumerate() {
        if let Some(code) = snapshot.cell(cell).filter(CellCode::is_constraint) {
            cell_events.push(match code {
                CellCode::Hint(_) if i == 0 || i + 1 == path.len() => format!("{}@{}:END", code, cell),
                CellCode::Hint(_) => {
                    let incoming = Step::direction_to(path[i - 1], cell);
                    let outgoing = Step::direction_to(cell, path[i + 1]);
                    match (incoming, outgoing) {
                        (Some(incoming), Some(outgoing)) => format!("{}@{}:{}>{}", code, cell, incoming, outgoing),
                        // a legal path never jumps; fall back to the bare cell
                        _ => format!("{}@{}", code, cell),
                    }
                }
                _ => format!("{}@{}", code, cell),
            });
        }

        let Some(&next) = path.get(i + 1) else {
            continue;
        };
        let Some(step) = Step::direction_to(cell, next) else {
            continue;
        };

        if step.is_diagonal() {
            if let Some(vertex) = cell.shared_vertex(next).filter(|vertex| snapshot.stitch_set().contains(vertex)) {
                let slot = Slot::of(step);
                if crossed_slots.insert((vertex, slot)) {
                    stitch_events.push(format!("{}:{}", vertex, slot.as_char()));
                }
            }
            continue;
        }

        used_edges.insert(UnorderedPair::from((cell, next)));
        pending.retain(|corner| {
            let mask = corner_mask(corner.vertex, &used_edges);
            if mask.count_ones() == u32::from(corner.target) {
                corner_events.push(corner_token(corner.vertex, mask));
                false
            } else {
                true
            }
        });
    }

    [cell_events, stitch_events, corner_events].iter()
        .map(|events| render_category(events))
        .join(CATEGORY_SEPARATOR)
}

/// Every reading of the snapshot's path: forwards and backwards, and for a closed loop every
/// rotation of both. Duplicates are dropped.
pub(crate) fn candidate_paths(snapshot: &Snapshot) -> Vec<Vec<Location>> {
    let forward = snapshot.path().to_vec();
    let backward = forward.iter().rev().copied().collect_vec();

    let readings = if snapshot.is_closed_loop() {
        [forward, backward].into_iter()
            .flat_map(|reading| (0..reading.len()).map(move |k| {
                let mut rotated = reading.clone();
                rotated.rotate_left(k);
                rotated
            }))
            .collect_vec()
    } else {
        vec![forward, backward]
    };

    readings.into_iter().unique().collect_vec()
}

fn reading_signature(snapshot: &Snapshot, islands: &[Island], path: &[Location]) -> String {
    format!("{}{}{}", constraint_signature(snapshot, path), SIGNATURE_SEPARATOR, topology_signature(islands, path))
}

/// The canonical signature of the snapshot's path, or an empty string if there is no path.
///
/// Invariant under reversing the path and, for closed loops, under rotating it; distinct when the
/// constraint events happen in a different order or the path winds differently around interior walls.
pub fn canonical_signature(snapshot: &Snapshot) -> String {
    if snapshot.path().is_empty() {
        return String::new();
    }

    let islands = find_islands(snapshot.grid());
    candidate_paths(snapshot).iter()
        .map(|reading| reading_signature(snapshot, &islands, reading))
        .min()
        .unwrap_or_default()
}
