//! Position Allocator
//!
//! Continuous positional ordering for anything that sorts inside a container
//! (lists in a board, cards in a list, checklist items in a card).
//!
//! Positions are plain `f64` sort keys. A moved entity takes the midpoint of its
//! new neighbours, so a reorder writes one row instead of renumbering every
//! sibling. Repeated bisection eventually runs out of precision; that is
//! detected by [`needs_rebalance`] and fixed by [`rebalance`], which spreads the
//! container back out to multiples of [`STEP`].
//!
//! Everything here is pure and synchronous. Persistence and concurrency live
//! in the repository layer.

use serde::{Deserialize, Serialize};

#[cfg(test)]
mod tests;

/// Spacing between freshly appended or rebalanced siblings
pub const STEP: f64 = 65535.0;

/// Smallest neighbour gap still considered safe to bisect
pub const MIN_GAP: f64 = 1e-9;

/// Largest position a caller may request explicitly
///
/// Well below the magnitude where adding [`STEP`] stops changing an `f64`.
pub const MAX_POSITION: f64 = 1e15;

/// Allocation errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum PositionError {
    /// Neighbours were not strictly ascending; the caller read a stale order
    #[error("neighbours out of order: prev {prev} is not below next {next}")]
    InvalidOrdering { prev: f64, next: f64 },
}

/// An entity ordered by position within a container
pub trait Orderable {
    fn position(&self) -> f64;

    fn set_position(&mut self, position: f64);

    /// Id of the board, list or card this entity is ordered within
    fn container_id(&self) -> u32;
}

/// Result of [`plan_insert`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Position for the inserted entity
    pub position: f64,
    /// Whether the sibling positions were reassigned first
    pub rebalanced: bool,
}

/// Position after every existing sibling
///
/// Past the magnitude where `max + STEP` rounds back to `max`, the next
/// representable value above `max` is returned instead.
pub fn append<T: Orderable>(siblings: &[T]) -> f64 {
    siblings
        .iter()
        .map(Orderable::position)
        .reduce(f64::max)
        .map_or(STEP, after)
}

/// Position strictly between two neighbours
///
/// A missing `prev` means "insert at head", a missing `next` means "insert at
/// tail". When the gap is too small to bisect the midpoint may collide with a
/// neighbour; check [`needs_rebalance`] first or use [`plan_insert`].
///
/// Non-finite neighbours are rejected; a missing side is reported as the
/// matching infinity.
pub fn insert_between(prev: Option<f64>, next: Option<f64>) -> Result<f64, PositionError> {
    let invalid = || PositionError::InvalidOrdering {
        prev: prev.unwrap_or(f64::NEG_INFINITY),
        next: next.unwrap_or(f64::INFINITY),
    };
    if prev.is_some_and(|p| !p.is_finite()) || next.is_some_and(|n| !n.is_finite()) {
        return Err(invalid());
    }

    match (prev, next) {
        (None, None) => Ok(STEP),
        (Some(prev), None) => Ok(after(prev)),
        (None, Some(next)) if next > 0.0 => Ok(next / 2.0),
        (None, Some(next)) => Ok(before(next)),
        (Some(prev), Some(next)) => {
            if !(prev < next) {
                return Err(invalid());
            }
            Ok(prev + (next - prev) / 2.0)
        }
    }
}

/// Position that lands the new entity at `target_index` once siblings are
/// sorted by position
///
/// `siblings` must not contain the entity being placed. An index past the end
/// is treated as an append.
pub fn insert_at_index<T: Orderable>(siblings: &[T], target_index: usize) -> Result<f64, PositionError> {
    let mut positions: Vec<f64> = siblings.iter().map(Orderable::position).collect();
    positions.sort_by(f64::total_cmp);

    let (prev, next) = neighbours(&positions, target_index);
    insert_between(prev, next)
}

/// True when `prev` and `next` are too close to bisect safely
///
/// Tied or misordered neighbours also report true: only a rebalance can
/// give them distinct positions again.
pub fn needs_rebalance(prev: f64, next: f64) -> bool {
    if !(next - prev >= MIN_GAP) {
        return true;
    }
    let mid = prev + (next - prev) / 2.0;
    !(prev < mid && mid < next)
}

/// Reassign `index * STEP` to every sibling in current order
///
/// The slice is sorted by position first. The sort is stable, so tied
/// siblings keep the order they were supplied in.
pub fn rebalance<T: Orderable>(siblings: &mut [T]) {
    siblings.sort_by(|a, b| a.position().total_cmp(&b.position()));
    for (index, sibling) in siblings.iter_mut().enumerate() {
        sibling.set_position(index as f64 * STEP);
    }
}

/// Resolve a position for `target_index`, rebalancing first if needed
///
/// On return `siblings` is sorted by position. When `rebalanced` is set the
/// caller must persist every sibling's new position alongside the insert.
pub fn plan_insert<T: Orderable>(siblings: &mut [T], target_index: usize) -> Result<Placement, PositionError> {
    siblings.sort_by(|a, b| a.position().total_cmp(&b.position()));

    let positions: Vec<f64> = siblings.iter().map(Orderable::position).collect();
    let (prev, next) = neighbours(&positions, target_index);
    if !exhausted(prev, next) {
        return Ok(Placement {
            position: insert_between(prev, next)?,
            rebalanced: false,
        });
    }

    rebalance(siblings);
    let positions: Vec<f64> = siblings.iter().map(Orderable::position).collect();
    let (prev, next) = neighbours(&positions, target_index);
    Ok(Placement {
        position: insert_between(prev, next)?,
        rebalanced: true,
    })
}

/// `value + STEP`, or the next representable value when STEP is absorbed
fn after(value: f64) -> f64 {
    let candidate = value + STEP;
    if candidate > value {
        candidate
    } else {
        next_representable(value, true)
    }
}

/// `value - STEP`, or the previous representable value when STEP is absorbed
fn before(value: f64) -> f64 {
    let candidate = value - STEP;
    if candidate < value {
        candidate
    } else {
        next_representable(value, false)
    }
}

/// Adjacent finite-or-infinite `f64` above (`up`) or below `value`
fn next_representable(value: f64, up: bool) -> f64 {
    if value.is_nan() || (up && value == f64::INFINITY) || (!up && value == f64::NEG_INFINITY) {
        return value;
    }
    if value == 0.0 {
        let tiny = f64::from_bits(1);
        return if up { tiny } else { -tiny };
    }
    let bits = value.to_bits();
    // Magnitude grows with the bit pattern on either side of zero
    if (value > 0.0) == up {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

fn neighbours(sorted: &[f64], target_index: usize) -> (Option<f64>, Option<f64>) {
    let index = target_index.min(sorted.len());
    let prev = index.checked_sub(1).map(|i| sorted[i]);
    let next = sorted.get(index).copied();
    (prev, next)
}

/// Like [`needs_rebalance`] but also covers head and tail inserts
fn exhausted(prev: Option<f64>, next: Option<f64>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => needs_rebalance(prev, next),
        (None, None) => false,
        _ => match insert_between(prev, next) {
            Ok(candidate) => {
                !candidate.is_finite()
                    || prev.is_some_and(|p| !(candidate - p >= MIN_GAP))
                    || next.is_some_and(|n| !(n - candidate >= MIN_GAP))
            }
            Err(_) => true,
        },
    }
}
