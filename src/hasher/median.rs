/// Exact median of `values` by Torben's bisection, without reordering the input.
///
/// For an even count this is the lower of the two middle values. Returns
/// `None` for an empty slice.
pub fn torben(values: &[f32]) -> Option<f32> {
    let mut min = values.iter().copied().reduce(f32::min)?;
    let mut max = values.iter().copied().reduce(f32::max)?;

    let half = (values.len() + 1) / 2;
    loop {
        let guess = (min + max) / 2.0;
        let mut less = 0;
        let mut greater = 0;
        let mut equal = 0;
        let mut max_lt_guess = min;
        let mut min_gt_guess = max;

        for &v in values {
            if v < guess {
                less += 1;
                if v > max_lt_guess {
                    max_lt_guess = v;
                }
            } else if v > guess {
                greater += 1;
                if v < min_gt_guess {
                    min_gt_guess = v;
                }
            } else {
                equal += 1;
            }
        }

        if less <= half && greater <= half {
            return Some(if less >= half {
                max_lt_guess
            } else if less + equal >= half {
                guess
            } else {
                min_gt_guess
            });
        } else if less > greater {
            max = max_lt_guess;
        } else {
            min = min_gt_guess;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn lower_median(values: &[f32]) -> f32 {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted[(sorted.len() - 1) / 2]
    }

    #[test]
    fn empty_has_no_median() {
        assert_eq!(torben(&[]), None);
    }

    #[test]
    fn small_cases_work() {
        assert_eq!(torben(&[5.0]), Some(5.0));
        assert_eq!(torben(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(torben(&[4.0, 1.0, 3.0, 2.0]), Some(2.0));
        assert_eq!(torben(&[7.0, 7.0, 7.0, 7.0]), Some(7.0));
    }

    #[test]
    fn matches_sorting() {
        let mut rng = thread_rng();
        for _ in 0..100 {
            let values: Vec<f32> = (0..256).map(|_| rng.gen_range(-500.0..500.0)).collect();
            assert_eq!(torben(&values), Some(lower_median(&values)));
        }
    }
}
