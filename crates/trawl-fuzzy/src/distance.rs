use edit_distance::edit_distance;

pub trait Metric {
    fn distance(&self, left: &str, right: &str) -> usize;
}

/// Case-insensitive Levenshtein distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Levenshtein;

impl Metric for Levenshtein {
    fn distance(&self, left: &str, right: &str) -> usize {
        levenshtein(left, right)
    }
}

pub fn levenshtein(left: &str, right: &str) -> usize {
    if left == right {
        return 0;
    }
    edit_distance(&left.to_lowercase(), &right.to_lowercase())
}

/// Smallest distance between any key of `left` and any key of `right`.
/// `None` when either side is empty.
pub fn min_distance<L, R>(left: &[L], right: &[R]) -> Option<usize>
where
    L: AsRef<str>,
    R: AsRef<str>,
{
    left.iter()
        .flat_map(|l| right.iter().map(move |r| levenshtein(l.as_ref(), r.as_ref())))
        .min()
}
