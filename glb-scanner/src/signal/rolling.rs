//! Trailing-window statistics over columns with gaps.
//!
//! Windows are positional (the last `window` rows, gaps included) and need a
//! single valid observation to produce a value, so the first rows of a
//! series yield a degenerate statistic instead of nothing.

use std::collections::VecDeque;

/// Rolling maximum, O(n) with a monotonic deque.
pub fn rolling_max(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    // Indices of candidate maxima, values strictly decreasing front to back
    let mut candidates: VecDeque<usize> = VecDeque::new();

    for (i, value) in values.iter().enumerate() {
        if let Some(v) = value {
            while let Some(&back) = candidates.back() {
                match values[back] {
                    Some(b) if b <= *v => {
                        candidates.pop_back();
                    }
                    _ => break,
                }
            }
            candidates.push_back(i);
        }

        while let Some(&front) = candidates.front() {
            if front + window <= i {
                candidates.pop_front();
            } else {
                break;
            }
        }

        out.push(candidates.front().and_then(|&idx| values[idx]));
    }

    out
}

/// Rolling arithmetic mean of the valid values in each window.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut count = 0usize;

    for (i, value) in values.iter().enumerate() {
        if let Some(v) = value {
            sum += v;
            count += 1;
        }
        if i >= window {
            if let Some(old) = values[i - window] {
                sum -= old;
                count -= 1;
            }
        }

        out.push(if count > 0 { Some(sum / count as f64) } else { None });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_rolling_max_min_periods_one() {
        let out = rolling_max(&col(&[3.0, 1.0, 4.0, 1.0, 5.0, 2.0, 2.0]), 3);
        assert_eq!(
            out,
            col(&[3.0, 3.0, 4.0, 4.0, 5.0, 5.0, 5.0])
        );
    }

    #[test]
    fn test_rolling_max_expires_old_peak() {
        let out = rolling_max(&col(&[9.0, 1.0, 2.0, 3.0]), 2);
        assert_eq!(out, col(&[9.0, 9.0, 2.0, 3.0]));
    }

    #[test]
    fn test_rolling_max_skips_gaps() {
        let values = vec![Some(2.0), None, None, Some(1.0)];
        assert_eq!(
            rolling_max(&values, 2),
            vec![Some(2.0), Some(2.0), None, Some(1.0)]
        );
    }

    #[test]
    fn test_rolling_max_ties_keep_value() {
        let out = rolling_max(&col(&[5.0, 5.0, 5.0]), 2);
        assert_eq!(out, col(&[5.0, 5.0, 5.0]));
    }

    #[test]
    fn test_rolling_mean() {
        let out = rolling_mean(&col(&[1.0, 2.0, 3.0, 4.0]), 2);
        assert_eq!(out, col(&[1.0, 1.5, 2.5, 3.5]));
    }

    #[test]
    fn test_rolling_mean_with_gaps() {
        let values = vec![Some(4.0), None, Some(2.0), None, None];
        assert_eq!(
            rolling_mean(&values, 2),
            vec![Some(4.0), Some(4.0), Some(2.0), Some(2.0), None]
        );
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        assert_eq!(rolling_max(&col(&[1.0, 3.0, 2.0]), 0), col(&[1.0, 3.0, 2.0]));
    }
}
