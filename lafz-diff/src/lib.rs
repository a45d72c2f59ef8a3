//! Shortest-edit-script diffing for the match scorer.
//!
//! Implements Myers' algorithm in the linear-space divide-and-conquer
//! form, generic over any comparable element type: the phonetic
//! normalizer diffs symbol sequences, the retrieval scorer diffs
//! trigram sequences.

/// One step of the minimal script converting `s1` into `s2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T> {
    /// Remove the element at `old_pos` in `s1`.
    Delete { old_pos: usize },
    /// Insert `elem` in front of `old_pos` in `s1`.
    Insert { old_pos: usize, elem: T },
}

impl<T> Edit<T> {
    pub fn old_pos(&self) -> usize {
        match self {
            Edit::Delete { old_pos } => *old_pos,
            Edit::Insert { old_pos, .. } => *old_pos,
        }
    }
}

/// Returns the minimal edit script converting `s1` into `s2`.
///
/// `i` and `j` offset the reported positions and exist for the
/// recursive calls; top-level callers pass `0, 0`. Runs in
/// O(min(N,M)) space and O(min(N,M) * D) time where D is the number
/// of differences.
pub fn diff<T: PartialEq + Clone>(s1: &[T], s2: &[T], i: usize, j: usize) -> Vec<Edit<T>> {
    let n = s1.len();
    let m = s2.len();

    if n == 0 {
        return s2
            .iter()
            .cloned()
            .map(|elem| Edit::Insert { old_pos: i, elem })
            .collect();
    }
    if m == 0 {
        return (0..n).map(|k| Edit::Delete { old_pos: i + k }).collect();
    }
    if s1 == s2 {
        return Vec::new();
    }

    let big_n = n as i64;
    let big_m = m as i64;
    let l = big_n + big_m;
    let z = (2 * big_n.min(big_m) + 2) as usize;
    let w = big_n - big_m;
    let mut g = vec![0i64; z];
    let mut p = vec![0i64; z];

    for h in 0..=(l / 2 + l % 2) {
        for r in 0..2 {
            let (c, d, o, sign): (&mut [i64], &mut [i64], i64, i64) = if r == 0 {
                (&mut g, &mut p, 1, 1)
            } else {
                (&mut p, &mut g, 0, -1)
            };

            let k_min = -(h - 2 * (h - big_m).max(0));
            let k_max = h - 2 * (h - big_n).max(0);
            let mut k = k_min;
            while k <= k_max {
                let mut a = if k == -h
                    || (k != h && at(c, (k - 1) % z as i64) < at(c, (k + 1) % z as i64))
                {
                    at(c, (k + 1) % z as i64)
                } else {
                    at(c, (k - 1) % z as i64) + 1
                };
                let mut b = a - k;
                let (s, t) = (a, b);

                while a < big_n
                    && b < big_m
                    && item(s1, (1 - o) * big_n + sign * a + (o - 1))
                        == item(s2, (1 - o) * big_m + sign * b + (o - 1))
                {
                    a += 1;
                    b += 1;
                }

                c[wrap(k % z as i64, z)] = a;
                let zk = -(k - w);

                if l % 2 == o
                    && zk >= -(h - o)
                    && zk <= h - o
                    && at(c, k % z as i64) + at(d, zk % z as i64) >= big_n
                {
                    let (depth, x, y, u, v) = if o == 1 {
                        (2 * h - 1, s, t, a, b)
                    } else {
                        (2 * h, big_n - a, big_m - b, big_n - s, big_m - t)
                    };

                    if depth > 1 || (x != u && y != v) {
                        let (x, y) = (x as usize, y as usize);
                        let (u, v) = (u as usize, v as usize);
                        let mut edits = diff(&s1[..x], &s2[..y], i, j);
                        edits.extend(diff(&s1[u..], &s2[v..], i + u, j + v));
                        return edits;
                    } else if big_m > big_n {
                        return diff(&s1[..0], &s2[n..], i + n, j + n);
                    } else if big_m < big_n {
                        return diff(&s1[m..], &s2[..0], i + m, j + m);
                    } else {
                        return Vec::new();
                    }
                }

                k += 2;
            }
        }
    }

    unreachable!("a middle snake always exists for non-empty inputs")
}

fn at(arr: &[i64], idx: i64) -> i64 {
    arr[wrap(idx, arr.len())]
}

fn wrap(idx: i64, len: usize) -> usize {
    if idx < 0 {
        (idx + len as i64) as usize
    } else {
        idx as usize
    }
}

fn item<T>(s: &[T], idx: i64) -> &T {
    if idx < 0 {
        &s[(s.len() as i64 + idx) as usize]
    } else {
        &s[idx as usize]
    }
}

/// Extracts the common subsequence kept by `edits`: `s1` with every
/// deleted index removed, plus the list of surviving indices into
/// `s1`.
pub fn lcs_indices<T: Clone>(s1: &[T], edits: &[Edit<T>]) -> (Vec<T>, Vec<usize>) {
    let mut deleted = vec![false; s1.len()];
    for edit in edits {
        if let Edit::Delete { old_pos } = edit {
            if *old_pos < deleted.len() {
                deleted[*old_pos] = true;
            }
        }
    }

    let mut kept = Vec::with_capacity(s1.len());
    let mut indices = Vec::with_capacity(s1.len());
    for (idx, elem) in s1.iter().enumerate() {
        if !deleted[idx] {
            kept.push(elem.clone());
            indices.push(idx);
        }
    }
    (kept, indices)
}

/// How tightly packed a set of surviving indices is. Consecutive
/// indices score 1.0; indices equally spaced with gap `d` score
/// `1/d`; a single index scores 1.0.
pub fn compactness(indices: &[usize]) -> f64 {
    if indices.len() <= 1 {
        return 1.0;
    }
    let sum: f64 = indices
        .windows(2)
        .map(|pair| 1.0 / (pair[1] as f64 - pair[0] as f64))
        .sum();
    sum / (indices.len() - 1) as f64
}

/// Combined match score of the query `s2` inside the document `s1`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    /// `|LCS| / |s2|` weighted by the compactness of the match.
    pub value: f64,
    /// Surviving indices into `s1`, for boundary reporting.
    pub kept_indices: Vec<usize>,
}

pub fn score<T: PartialEq + Clone>(s1: &[T], s2: &[T]) -> MatchScore {
    if s2.is_empty() {
        return MatchScore {
            value: 0.0,
            kept_indices: Vec::new(),
        };
    }
    let edits = diff(s1, s2, 0, 0);
    let (kept, kept_indices) = lcs_indices(s1, &edits);
    let lcs_score = kept.len() as f64 / s2.len() as f64;
    let value = lcs_score * compactness(&kept_indices);
    MatchScore { value, kept_indices }
}
