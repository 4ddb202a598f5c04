/// Indices of the `k` highest scores, highest first, ties in index order.
///
/// When `k < scores.len()` the k-th largest score is found with a linear-time
/// selection. Every index at or above it is kept (ties can push the candidate
/// count past `k`), and only that subset is sorted.
pub(crate) fn top_k_indices(scores: &[f32], k: usize) -> Vec<usize> {
    let n = scores.len();
    if k == 0 || n == 0 {
        return Vec::new();
    }

    let descending = |a: &usize, b: &usize| scores[*b].total_cmp(&scores[*a]);

    if k >= n {
        let mut all: Vec<usize> = (0..n).collect();
        all.sort_by(descending);
        return all;
    }

    let mut scratch = scores.to_vec();
    let (_, kth, _) = scratch.select_nth_unstable_by(k - 1, |a, b| b.total_cmp(a));
    let threshold = *kth;

    let mut candidates: Vec<usize> = (0..n)
        .filter(|&i| scores[i].total_cmp(&threshold).is_ge())
        .collect();
    candidates.sort_by(descending);
    candidates.truncate(k);
    candidates
}
