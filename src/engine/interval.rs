//! Resolve overlapping pixel spans on one scan-line.
//!
//! Input order is paint order: an interval listed later is drawn later and
//! therefore wins where it overlaps an earlier one.

/// Half-open span `start..end` of one row, owned by `id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval<T> {
    pub start: i32,
    pub end: i32,
    pub id: T,
    /// Leave whatever is under this interval in place instead of cutting it
    /// away.  Translucent or see-through walls set this.
    pub allow_overlap: bool,
}

/// Upper bound on the output length of [`merge_into`] for `n` inputs.
///
/// Every new interval can split each surviving entry once, so the worst
/// case grows like `1 + 2 + … + n`.  Without overlap-allowed intervals the
/// survivors never overlap each other, and the count stays within `2n`.
pub const fn max_output_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Cut `new`'s range out of every entry of `out`, keeping survivors in order.
fn remove_overlaps<T: Copy>(new: &Interval<T>, out: &mut Vec<Interval<T>>) {
    // backwards, so that inserting / removing doesn't disturb the unvisited part
    for i in (0..out.len()).rev() {
        let cur = out[i];
        let ostart = cur.start.max(new.start);
        let oend = cur.end.min(new.end);
        if ostart >= oend {
            continue;
        }

        match (cur.start < ostart, cur.end > oend) {
            (true, true) => {
                out[i].start = oend;
                out.insert(i, Interval { end: ostart, ..cur });
            }
            (true, false) => out[i].end = ostart,
            (false, true) => out[i].start = oend,
            (false, false) => {
                out.remove(i);
            }
        }
    }
}

/// Rewrite `input` into `out` so that no interval is drawn over by a later,
/// overlap-forbidding one.  `out` is cleared first and can be reused across
/// rows.
pub fn merge_into<T: Copy>(input: &[Interval<T>], out: &mut Vec<Interval<T>>) {
    out.clear();
    for iv in input {
        if !iv.allow_overlap {
            remove_overlaps(iv, out);
        }
        out.push(*iv);
    }
    debug_assert!(out.len() <= max_output_len(input.len()));
}

/// Allocating convenience wrapper around [`merge_into`].
pub fn non_overlapping<T: Copy>(input: &[Interval<T>]) -> Vec<Interval<T>> {
    let mut out = Vec::with_capacity(input.len());
    merge_into(input, &mut out);
    out
}

/*=== Tests ===*/
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn iv(start: i32, end: i32, id: u32, allow_overlap: bool) -> Interval<u32> {
        Interval {
            start,
            end,
            id,
            allow_overlap,
        }
    }

    fn random_set(rng: &mut StdRng, n: usize, allow_ratio: f64) -> Vec<Interval<u32>> {
        (0..n as u32)
            .map(|id| {
                let start = rng.random_range(0..600);
                let len = rng.random_range(1..200);
                iv(start, start + len, id, rng.random_bool(allow_ratio))
            })
            .collect()
    }

    #[test]
    fn mixed_walls_and_ellipsoids_regression() {
        let input = [
            iv(289, 331, 5, true),
            iv(316, 365, 43, true),
            iv(306, 393, 0, false),
            iv(354, 415, 81, true),
            iv(234, 385, 2, false),
            iv(415, 494, 113, true),
            iv(528, 599, 115, true),
        ];
        let expected = [
            iv(385, 393, 0, false),
            iv(385, 415, 81, true),
            iv(234, 385, 2, false),
            iv(415, 494, 113, true),
            iv(528, 599, 115, true),
        ];
        assert_eq!(non_overlapping(&input), expected);
    }

    #[test]
    fn split_keeps_left_piece_first() {
        let out = non_overlapping(&[iv(0, 10, 1, false), iv(4, 6, 2, false)]);
        assert_eq!(out, [iv(0, 4, 1, false), iv(6, 10, 1, false), iv(4, 6, 2, false)]);
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let input = [iv(0, 5, 1, false), iv(5, 9, 2, false)];
        assert_eq!(non_overlapping(&input), input);
    }

    #[test]
    fn covered_entry_is_removed() {
        let out = non_overlapping(&[iv(3, 5, 1, false), iv(8, 9, 3, true), iv(0, 10, 2, false)]);
        assert_eq!(out, [iv(0, 10, 2, false)]);
    }

    #[test]
    fn allow_overlap_keeps_what_is_below() {
        let input = [iv(0, 10, 1, false), iv(2, 4, 2, true)];
        assert_eq!(non_overlapping(&input), input);
    }

    #[test]
    fn later_interval_owns_every_pixel() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let n = rng.random_range(1..12);
            let input = random_set(&mut rng, n, 0.0);
            let out = non_overlapping(&input);

            assert!(out.len() <= 2 * input.len(), "{} > 2*{}", out.len(), input.len());
            for x in 0..800 {
                let owner = input.iter().rev().find(|i| i.start <= x && x < i.end);
                let covering: Vec<_> = out.iter().filter(|i| i.start <= x && x < i.end).collect();
                match owner {
                    None => assert!(covering.is_empty()),
                    Some(o) => {
                        assert_eq!(covering.len(), 1, "x={x} {out:?}");
                        assert_eq!(covering[0].id, o.id);
                    }
                }
            }
        }
    }

    #[test]
    fn merging_twice_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut again = Vec::new();
        for _ in 0..200 {
            let n = rng.random_range(0..15);
            let once = non_overlapping(&random_set(&mut rng, n, 0.0));
            merge_into(&once, &mut again);
            assert_eq!(once, again);
        }
    }

    #[test]
    fn mixed_sets_stay_within_bound() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..300 {
            let n = rng.random_range(0..20);
            let input = random_set(&mut rng, n, 0.5);
            let out = non_overlapping(&input);
            assert!(out.len() <= max_output_len(n));
            assert!(out.iter().all(|i| i.start < i.end));
            // the last interval is painted on top, untouched
            assert_eq!(out.last(), input.last());
        }
    }
}
