mod distance;
mod index;
pub mod phonetic;
mod strategy;

pub use distance::{Levenshtein, Metric, levenshtein, min_distance};
pub use index::{IndexNode, Iter, MetricIndex};
pub use strategy::Strategy;
