//! Axis identity, discovery and permutation
//!
//! Raw-data containers list their axes by short vendor labels in an order that
//! varies between sequences and software versions. This module resolves those
//! labels once into an [`AxisMap`] so the rest of the pipeline never compares
//! strings again.
//!
//! ## Synonym Table
//!
//! | Axis            | Accepted labels |
//! |-----------------|-----------------|
//! | FrequencyEncode | `Col`           |
//! | PhaseEncode     | `Lin`           |
//! | Channel         | `Cha`           |
//! | Slice           | `Slc`, `Sli`    |
//!
//! Every other label (`Rep`, `Eco`, `Ave`, `Set`, ...) is a loop axis.
//! Labels are matched exactly (case-sensitive).

use serde::{Deserialize, Serialize};

use crate::error::{KspaceError, KspaceResult};

/// One of the four axes every k-space tensor carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoreAxis {
    /// Readout direction (`Col`)
    FrequencyEncode,
    /// Phase-encode lines (`Lin`)
    PhaseEncode,
    /// Receiver channels (`Cha`)
    Channel,
    /// Slices (`Slc` / `Sli`)
    Slice,
}

impl CoreAxis {
    /// Core axes in the canonical tensor order, fastest-varying first.
    pub const CANONICAL: [CoreAxis; 4] = [
        CoreAxis::FrequencyEncode,
        CoreAxis::Channel,
        CoreAxis::PhaseEncode,
        CoreAxis::Slice,
    ];

    /// Labels accepted for this axis.
    pub const fn spellings(&self) -> &'static [&'static str] {
        match self {
            CoreAxis::FrequencyEncode => &["Col"],
            CoreAxis::PhaseEncode => &["Lin"],
            CoreAxis::Channel => &["Cha"],
            CoreAxis::Slice => &["Slc", "Sli"],
        }
    }

    /// Preferred label when writing a layout.
    pub const fn label(&self) -> &'static str {
        self.spellings()[0]
    }

    /// Position of this axis in [`CoreAxis::CANONICAL`].
    pub const fn canonical_index(&self) -> usize {
        match self {
            CoreAxis::FrequencyEncode => 0,
            CoreAxis::Channel => 1,
            CoreAxis::PhaseEncode => 2,
            CoreAxis::Slice => 3,
        }
    }

    /// Resolve a label against the synonym table.
    pub fn from_label(label: &str) -> Option<Self> {
        CoreAxis::CANONICAL
            .into_iter()
            .find(|axis| axis.spellings().contains(&label))
    }
}

impl std::fmt::Display for CoreAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CoreAxis::FrequencyEncode => "FrequencyEncode",
            CoreAxis::PhaseEncode => "PhaseEncode",
            CoreAxis::Channel => "Channel",
            CoreAxis::Slice => "Slice",
        };
        f.write_str(name)
    }
}

/// Identity of a container axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AxisTag {
    Core(CoreAxis),
    /// Any non-core axis such as repetitions or echoes, keyed by its label
    Loop(String),
}

impl AxisTag {
    pub fn parse(label: &str) -> Self {
        match CoreAxis::from_label(label) {
            Some(axis) => AxisTag::Core(axis),
            None => AxisTag::Loop(label.to_string()),
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, AxisTag::Loop(_))
    }
}

/// Locate `axis` in `labels`.
///
/// Returns `Ok(None)` when no label matches. More than one matching label
/// (e.g. both `Slc` and `Sli`, or a repeated `Cha`) is an error because the
/// template cannot be interpreted unambiguously.
pub fn find_axis<S: AsRef<str>>(labels: &[S], axis: CoreAxis) -> KspaceResult<Option<usize>> {
    let mut hits = labels
        .iter()
        .enumerate()
        .filter(|(_, label)| axis.spellings().contains(&label.as_ref()))
        .map(|(i, _)| i);

    let first = hits.next();
    if let Some(second) = hits.next() {
        let first = first.unwrap_or_default();
        return Err(KspaceError::AxisResolution {
            axis,
            reason: format!(
                "ambiguous, matched '{}' at {} and '{}' at {}",
                labels[first].as_ref(),
                first,
                labels[second].as_ref(),
                second
            ),
        });
    }
    Ok(first)
}

/// Order of the four core axes inside a container, relative to canonical order.
///
/// `order[k]` is the rank of canonical axis `k` among the container's core axes
/// (0 = outermost core axis in the container). For a container with exactly
/// the four core axes this is the container position of each canonical axis.
/// The inverse maps a container core rank back to its canonical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permutation([usize; 4]);

impl Permutation {
    pub const IDENTITY: Permutation = Permutation([0, 1, 2, 3]);

    /// Build from an index array, rejecting anything that is not a permutation of `0..4`.
    pub fn new(order: [usize; 4]) -> KspaceResult<Self> {
        let mut seen = [false; 4];
        for &idx in &order {
            if idx >= 4 || seen[idx] {
                return Err(KspaceError::InvalidDimensions(format!(
                    "{:?} is not a permutation of 0..4",
                    order
                )));
            }
            seen[idx] = true;
        }
        Ok(Self(order))
    }

    pub fn as_array(&self) -> [usize; 4] {
        self.0
    }

    pub fn inverse(&self) -> Permutation {
        let mut inv = [0; 4];
        for (k, &target) in self.0.iter().enumerate() {
            inv[target] = k;
        }
        Permutation(inv)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl std::ops::Index<usize> for Permutation {
    type Output = usize;

    fn index(&self, idx: usize) -> &usize {
        &self.0[idx]
    }
}

/// Resolved axis positions of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisMap {
    /// Container position of each canonical axis
    core: [usize; 4],
    /// Container positions of loop axes, in container order
    loops: Vec<usize>,
    rank: usize,
}

impl AxisMap {
    /// Resolve every core axis in `labels`. Missing or ambiguous core axes fail.
    pub fn discover<S: AsRef<str>>(labels: &[S]) -> KspaceResult<Self> {
        let mut core = [0usize; 4];
        for axis in CoreAxis::CANONICAL {
            core[axis.canonical_index()] = find_axis(labels, axis)?.ok_or_else(|| {
                KspaceError::AxisResolution {
                    axis,
                    reason: format!(
                        "none of {:?} present in {:?}",
                        axis.spellings(),
                        labels.iter().map(|l| l.as_ref()).collect::<Vec<_>>()
                    ),
                }
            })?;
        }

        let loops = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| AxisTag::parse(label.as_ref()).is_loop())
            .map(|(i, _)| i)
            .collect();
        Ok(Self {
            core,
            loops,
            rank: labels.len(),
        })
    }

    /// Container position of a core axis.
    pub fn position(&self, axis: CoreAxis) -> usize {
        self.core[axis.canonical_index()]
    }

    /// Container positions of all loop axes.
    pub fn loop_axes(&self) -> &[usize] {
        &self.loops
    }

    pub fn has_loops(&self) -> bool {
        !self.loops.is_empty()
    }

    /// Number of axes in the container.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Relative order of the core axes inside the container.
    pub fn permutation(&self) -> Permutation {
        let mut order = [0usize; 4];
        for (k, slot) in order.iter_mut().enumerate() {
            *slot = self.core.iter().filter(|&&p| p < self.core[k]).count();
        }
        Permutation(order)
    }

    /// Container positions of the core axes, ascending.
    pub fn core_positions_sorted(&self) -> [usize; 4] {
        let mut sorted = self.core;
        sorted.sort_unstable();
        sorted
    }
}
