use crate::error::{Degeneracy, EngineResult};
use serde::{Deserialize, Serialize};

/// Ordinary least squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
}

impl RegressionResult {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit an OLS line through `(xs[i], ys[i])` using mean-centred sums.
///
/// # Errors
/// Returns [`Degeneracy`] when the lengths differ, when there are fewer than
/// two points, or when all x values are identical.
pub fn fit(xs: &[f64], ys: &[f64]) -> EngineResult<RegressionResult> {
    if xs.len() != ys.len() {
        return Err(Degeneracy::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        }
        .into());
    }
    if xs.len() < 2 {
        return Err(Degeneracy::TooFewPoints(xs.len()).into());
    }

    let x_mean = compute_mean(xs);
    let y_mean = compute_mean(ys);

    let (sum_xy, sum_xx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sum_xy, sum_xx), (&x, &y)| {
            let dx = x - x_mean;
            (sum_xy + dx * (y - y_mean), sum_xx + dx * dx)
        });
    if sum_xx == 0.0 {
        return Err(Degeneracy::ZeroVariance.into());
    }

    let slope = sum_xy / sum_xx;
    Ok(RegressionResult {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

fn compute_mean(vals: &[f64]) -> f64 {
    vals.iter().sum::<f64>() / vals.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use proptest::prelude::*;

    #[test]
    fn recovers_exact_line() {
        let xs: Vec<f64> = (1880..1990).map(f64::from).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.0075 * x - 14.6).collect();
        let res = fit(&xs, &ys).unwrap();
        assert!((res.slope - 0.0075).abs() < 1e-9);
        assert!((res.intercept + 14.6).abs() < 1e-6);
        assert!((res.predict(2000.0) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert_eq!(
            fit(&[5.0, 5.0, 5.0], &[1.0, 2.0, 3.0]),
            Err(EngineError::DegenerateInput(Degeneracy::ZeroVariance))
        );
        assert_eq!(
            fit(&[2000.0], &[0.3]),
            Err(EngineError::DegenerateInput(Degeneracy::TooFewPoints(1)))
        );
        assert_eq!(
            fit(&[], &[]),
            Err(EngineError::DegenerateInput(Degeneracy::TooFewPoints(0)))
        );
        assert_eq!(
            fit(&[1.0, 2.0], &[1.0]),
            Err(EngineError::DegenerateInput(Degeneracy::LengthMismatch {
                xs: 2,
                ys: 1
            }))
        );
    }

    proptest! {
        #[test]
        fn fit_recovers_noiseless_lines(
            slope in -5.0f64..5.0,
            intercept in -100.0f64..100.0,
            start in 1850i32..2000,
            len in 2usize..150,
        ) {
            let xs: Vec<f64> = (start..start + len as i32).map(f64::from).collect();
            let ys: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
            let res = fit(&xs, &ys).unwrap();
            prop_assert!((res.slope - slope).abs() < 1e-6);
            prop_assert!((res.intercept - intercept).abs() < 1e-2);
        }

        #[test]
        fn fit_is_deterministic(ys in prop::collection::vec(-3.0f64..3.0, 2..60)) {
            let xs: Vec<f64> = (0..ys.len()).map(|x| x as f64).collect();
            prop_assert_eq!(fit(&xs, &ys), fit(&xs, &ys));
        }
    }
}
