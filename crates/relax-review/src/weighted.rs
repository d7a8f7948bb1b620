//! Weighted random choice.
//!
//! Draw uniformly in `[0, total)`, walk the entries accumulating weights, and
//! return the first entry whose running total exceeds the draw.

use rand::Rng;
use thiserror::Error;

/// A value paired with its (strictly positive) selection weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Weighted<T> {
    pub value: T,
    pub weight: u64,
}

impl<T> Weighted<T> {
    pub fn new(value: T, weight: u64) -> Self {
        Self { value, weight }
    }
}

/// Inputs a weighted draw cannot be made from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WeightError {
    #[error("cannot pick from an empty list")]
    Empty,

    #[error("entry {index} has zero weight")]
    ZeroWeight { index: usize },

    #[error("total weight overflows u64")]
    Overflow,

    #[error("draw {draw} is outside [0, {total})")]
    DrawOutOfRange { draw: u64, total: u64 },
}

/// Sum of all weights after checking every entry is positive.
pub fn total_weight<T>(entries: &[Weighted<T>]) -> Result<u64, WeightError> {
    if entries.is_empty() {
        return Err(WeightError::Empty);
    }

    entries
        .iter()
        .enumerate()
        .try_fold(0u64, |total, (index, entry)| {
            if entry.weight == 0 {
                return Err(WeightError::ZeroWeight { index });
            }
            total.checked_add(entry.weight).ok_or(WeightError::Overflow)
        })
}

/// Pick one entry with probability proportional to its weight.
pub fn pick<'a, T, R>(entries: &'a [Weighted<T>], rng: &mut R) -> Result<&'a T, WeightError>
where
    R: Rng + ?Sized,
{
    let total = total_weight(entries)?;
    let draw = rng.gen_range(0..total);
    Ok(walk(entries, draw, total))
}

/// Deterministic variant of [`pick`] for a given draw in `[0, total)`.
pub fn pick_with_draw<T>(entries: &[Weighted<T>], draw: u64) -> Result<&T, WeightError> {
    let total = total_weight(entries)?;
    if draw >= total {
        return Err(WeightError::DrawOutOfRange { draw, total });
    }
    Ok(walk(entries, draw, total))
}

/// Entries must be validated and `draw < total`.
fn walk<T>(entries: &[Weighted<T>], draw: u64, total: u64) -> &T {
    debug_assert!(draw < total);
    let mut cumulative = 0u64;
    for entry in &entries[..entries.len() - 1] {
        cumulative += entry.weight;
        if draw < cumulative {
            return &entry.value;
        }
    }
    // Remaining mass [cumulative, total) belongs to the last entry.
    &entries[entries.len() - 1].value
}
