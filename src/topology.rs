//! The topological half of a solution signature.
//!
//! Interior wall clusters ("islands") act as obstacles the path can wind around. Each island
//! casts a horizontal ray towards increasing column from its centroid; every time a path step
//! crosses a ray it emits a generator `+k` (moving down) or `-k` (moving up). The word of
//! generators, freely reduced and relabelled by first appearance, describes how the path threads
//! through the obstacles independently of which literal island is which.
//!
//! All arithmetic is exact. Centroids are kept as rationals and the ray of island `k` sits at
//! `centroid row + k·ε` for an infinitesimal `ε`, so a cell centre can never lie on a ray and
//! rays of islands sharing a centroid row are stacked in id order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::Array2;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::UnGraphMap;

use crate::cell::CellCode;
use crate::config::{EMPTY_MARKER, GENERATOR_SEPARATOR};
use crate::location::Location;

/// A connected cluster of blocking cells that does not touch the grid boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Island {
    pub(crate) id: usize,
    // centroid = (sum_row / size, sum_col / size)
    size: i64,
    sum_row: i64,
    sum_col: i64,
}

impl Island {
    pub(crate) fn from_cells(cells: &[Location]) -> Self {
        Self {
            id: 0,
            size: cells.len() as i64,
            sum_row: cells.iter().map(|loc| loc.0 as i64).sum(),
            sum_col: cells.iter().map(|loc| loc.1 as i64).sum(),
        }
    }

    fn cmp_centroid(&self, other: &Self) -> Ordering {
        (self.sum_row * other.size).cmp(&(other.sum_row * self.size))
            .then((self.sum_col * other.size).cmp(&(other.sum_col * self.size)))
    }

    /// Whether a cell-centre row lies on the near (smaller row) side of this island's ray.
    #[inline]
    fn above_ray(&self, row: i64) -> bool {
        row * self.size <= self.sum_row
    }

    /// Where the step `from -> to` crosses this island's ray, if it does.
    ///
    /// The crossing parameter along the step is returned as an exact fraction `(num, den)` with `den > 0`,
    /// ignoring the `k·ε` offset of the ray; crossings at equal parameters are ordered by [`crossing_word`].
    pub(crate) fn crossing(&self, from: Location, to: Location) -> Option<(i64, i64)> {
        let (y1, x1) = (from.0 as i64, from.1 as i64);
        let (y2, x2) = (to.0 as i64, to.1 as i64);
        let (dy, dx) = (y2 - y1, x2 - x1);
        if dy == 0 || self.above_ray(y1) == self.above_ray(y2) {
            return None;
        }

        // (x_cross - centroid_x) * size * dy
        let offset = x1 * self.size * dy + (self.sum_row - y1 * self.size) * dx - self.sum_col * dy;
        let right_of_centroid = match (offset * dy.signum()).cmp(&0) {
            Ordering::Greater => true,
            Ordering::Less => false,
            // the crossing is exactly level with the centroid; the ray's infinitesimal offset decides
            Ordering::Equal => dx * dy > 0,
        };
        if !right_of_centroid {
            return None;
        }

        Some(((self.sum_row - y1 * self.size) * dy.signum(), self.size * dy.abs()))
    }
}

/// Find the islands of `grid`, ordered by centroid row then column, with ids counting up from 1.
pub(crate) fn find_islands(grid: &Array2<CellCode>) -> Vec<Island> {
    let (rows, cols) = grid.dim();
    let mut graph: UnGraphMap<Location, ()> = UnGraphMap::new();

    for (index, code) in grid.indexed_iter() {
        if !code.is_blocking() {
            continue;
        }

        let location = Location::from(index);
        graph.add_node(location);
        // link up and left; those neighbours were visited first in row-major order
        for neighbor in [location.offset_by((-1, 0)), location.offset_by((0, -1))] {
            if grid.get(neighbor.as_index()).is_some_and(CellCode::is_blocking) {
                graph.add_edge(location, neighbor, ());
            }
        }
    }

    let touches_edge = |loc: &Location| loc.0 == 0 || loc.1 == 0 || loc.0 + 1 == rows || loc.1 + 1 == cols;

    let mut islands = tarjan_scc(&graph)
        .into_iter()
        .filter(|component| !component.iter().any(&touches_edge))
        .map(|mut component| {
            component.sort();
            (component[0], Island::from_cells(&component))
        })
        .sorted_by(|(first_a, a), (first_b, b)| a.cmp_centroid(b).then(first_a.cmp(first_b)))
        .map(|(_, island)| island)
        .collect_vec();

    for (i, island) in islands.iter_mut().enumerate() {
        island.id = i + 1;
    }

    islands
}

/// One letter of a winding word: crossing island `id`'s ray, downwards if `positive`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Generator {
    pub(crate) id: usize,
    pub(crate) positive: bool,
}

impl Generator {
    #[inline]
    fn is_inverse_of(&self, other: &Self) -> bool {
        self.id == other.id && self.positive != other.positive
    }
}

impl Display for Generator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", if self.positive { '+' } else { '-' }, self.id)
    }
}

/// The raw, unreduced word of ray crossings along `path`.
pub(crate) fn crossing_word(islands: &[Island], path: &[Location]) -> Vec<Generator> {
    let mut word = Vec::new();

    for (&from, &to) in path.iter().tuple_windows() {
        if from.0 == to.0 {
            continue;
        }

        let positive = to.0 > from.0;
        let crossings = islands.iter()
            .filter_map(|island| island.crossing(from, to).map(|t| (t, Generator { id: island.id, positive })))
            .sorted_by(|((num_a, den_a), gen_a), ((num_b, den_b), gen_b)| {
                // equal parameters share a centroid row; ray k sits k·ε lower, so moving down meets
                // the lower ids first and moving up meets them last
                let by_ray_height = gen_a.id.cmp(&gen_b.id);
                (num_a * den_b).cmp(&(num_b * den_a))
                    .then(if positive { by_ray_height } else { by_ray_height.reverse() })
            })
            .map(|(_, generator)| generator);
        word.extend(crossings);
    }

    word
}

/// Cancel adjacent inverse pairs until none remain.
pub(crate) fn free_reduce(word: &[Generator]) -> Vec<Generator> {
    let mut reduced: Vec<Generator> = Vec::with_capacity(word.len());
    for generator in word {
        match reduced.last() {
            Some(top) if top.is_inverse_of(generator) => {
                reduced.pop();
            }
            _ => reduced.push(*generator),
        }
    }
    reduced
}

fn base36(mut n: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut digits = Vec::new();
    loop {
        digits.push(char::from(DIGITS[n % 36]));
        n /= 36;
        if n == 0 {
            break;
        }
    }
    digits.iter().rev().collect()
}

/// Render a reduced word with islands renamed `1, 2, ...` (base 36) in order of first appearance.
pub(crate) fn relabel(word: &[Generator]) -> String {
    if word.is_empty() {
        return EMPTY_MARKER.to_string();
    }

    let mut labels: HashMap<usize, String> = HashMap::new();
    word.iter()
        .map(|generator| {
            let next = labels.len() + 1;
            let label = labels.entry(generator.id).or_insert_with(|| base36(next));
            format!("{}{}", if generator.positive { '+' } else { '-' }, label)
        })
        .join(GENERATOR_SEPARATOR)
}

/// The topology signature of `path` around `islands`.
pub(crate) fn topology_signature(islands: &[Island], path: &[Location]) -> String {
    if islands.is_empty() {
        return EMPTY_MARKER.to_string();
    }

    relabel(&free_reduce(&crossing_word(islands, path)))
}
