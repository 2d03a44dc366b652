//! `rmfs-score` — candidate scoring and lexicographic selection.
//!
//! A scorer maps `(environment, candidate)` to an `f64` under the
//! **minimization convention**: smaller is better, `f64::INFINITY` is
//! "impossible".  Scorers are configured as tagged [`ScorerKind`] variants
//! and built once into closures capturing the variant's payload — no
//! downcasting and no per-call dispatch on configuration.
//!
//! [`BestOf`] runs the lexicographic tournament: a primary criterion plus
//! tie-breakers, evaluated lazily with a short-circuit at the first strict
//! dominance.

pub mod best_of;
pub mod context;
pub mod scorer;

#[cfg(test)]
mod tests;

pub use best_of::{BestOf, Objective};
pub use context::{Candidate, SelectionEnv};
pub use scorer::{
    build_scorer, DistanceMetric, FillPreference, ScoreRecord, Scorer, ScorerKind, ScorerStack,
    WorkValue,
};
