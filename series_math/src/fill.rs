//! Gap filling for series with missing observations
//!
//! The three passes are meant to be chained in the order
//! interpolate -> forward fill -> backward fill, see [`fill_gaps`].

/// Linearly interpolate interior gaps by position.
///
/// Only gaps with a present value on both sides are filled. Leading and
/// trailing gaps are left untouched.
pub fn interpolate_linear(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = values.to_vec();
    let mut previous: Option<(usize, f64)> = None;

    for (idx, value) in values.iter().enumerate() {
        let Some(current) = *value else {
            continue;
        };

        if let Some((start, start_value)) = previous {
            let span = (idx - start) as f64;
            for gap in start + 1..idx {
                let fraction = (gap - start) as f64 / span;
                out[gap] = Some(start_value + (current - start_value) * fraction);
            }
        }
        previous = Some((idx, current));
    }

    out
}

/// Propagate the last present value forward over missing entries
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|value| {
            if value.is_some() {
                last = *value;
            }
            last
        })
        .collect()
}

/// Propagate the next present value backward over missing entries
pub fn backward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut next = None;
    let mut out: Vec<Option<f64>> = values
        .iter()
        .rev()
        .map(|value| {
            if value.is_some() {
                next = *value;
            }
            next
        })
        .collect();
    out.reverse();
    out
}

/// Interpolate, then forward fill, then backward fill.
///
/// The result only contains `None` when the input had no present value at all.
pub fn fill_gaps(values: &[Option<f64>]) -> Vec<Option<f64>> {
    backward_fill(&forward_fill(&interpolate_linear(values)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_interior_gap() {
        let filled = interpolate_linear(&[Some(1.0), None, None, Some(4.0)]);
        assert_eq!(filled, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_interpolate_leaves_edges() {
        let filled = interpolate_linear(&[None, Some(2.0), None]);
        assert_eq!(filled, vec![None, Some(2.0), None]);
    }

    #[test]
    fn test_forward_and_backward_fill() {
        let values = [None, Some(2.0), None, Some(5.0), None];
        assert_eq!(
            forward_fill(&values),
            vec![None, Some(2.0), Some(2.0), Some(5.0), Some(5.0)]
        );
        assert_eq!(
            backward_fill(&values),
            vec![Some(2.0), Some(2.0), Some(5.0), Some(5.0), None]
        );
    }

    #[test]
    fn test_fill_gaps_order() {
        let values = [None, Some(10.0), None, Some(20.0), None];
        assert_eq!(
            fill_gaps(&values),
            vec![Some(10.0), Some(10.0), Some(15.0), Some(20.0), Some(20.0)]
        );
    }

    #[test]
    fn test_fill_gaps_all_missing() {
        assert_eq!(fill_gaps(&[None, None]), vec![None, None]);
    }
}
