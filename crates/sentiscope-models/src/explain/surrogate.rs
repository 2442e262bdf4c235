//! Weighted ridge surrogate and feature selection over binary masks

use sentiscope_core::{Error, Result};

/// Perturbed samples with model targets and proximity weights
pub struct Neighborhood {
    /// `masks[i][j]` is true when feature `j` is kept in sample `i`
    pub masks: Vec<Vec<bool>>,
    pub targets: Vec<f64>,
    pub weights: Vec<f64>,
}

/// Fitted surrogate over a subset of columns
#[derive(Debug, Clone)]
pub struct RidgeFit {
    pub columns: Vec<usize>,
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl Neighborhood {
    fn value(&self, row: usize, col: usize) -> f64 {
        if self.masks[row][col] {
            1.0
        } else {
            0.0
        }
    }

    fn total_weight(&self) -> Result<f64> {
        let total: f64 = self.weights.iter().sum();
        if total > 0.0 && total.is_finite() {
            Ok(total)
        } else {
            Err(Error::explanation("sample weights sum to zero"))
        }
    }

    /// Weighted ridge regression with an unpenalized intercept
    pub fn fit_ridge(&self, columns: &[usize], alpha: f64) -> Result<RidgeFit> {
        let total = self.total_weight()?;
        let p = columns.len();
        let n = self.targets.len();

        let y_mean = (0..n)
            .map(|i| self.weights[i] * self.targets[i])
            .sum::<f64>()
            / total;
        let x_mean: Vec<f64> = columns
            .iter()
            .map(|&c| (0..n).map(|i| self.weights[i] * self.value(i, c)).sum::<f64>() / total)
            .collect();

        // normal equations on weighted, centered data
        let mut gram = vec![0.0; p * p];
        let mut rhs = vec![0.0; p];
        let mut centered = vec![0.0; p];
        for i in 0..n {
            let w = self.weights[i];
            if w == 0.0 {
                continue;
            }
            for (a, &c) in columns.iter().enumerate() {
                centered[a] = self.value(i, c) - x_mean[a];
            }
            let dy = self.targets[i] - y_mean;
            for a in 0..p {
                let wa = w * centered[a];
                rhs[a] += wa * dy;
                for b in a..p {
                    gram[a * p + b] += wa * centered[b];
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                gram[a * p + b] = gram[b * p + a];
            }
            gram[a * p + a] += alpha;
        }

        let coef = cholesky_solve(gram, rhs, p)?;
        let intercept = y_mean - x_mean.iter().zip(&coef).map(|(m, c)| m * c).sum::<f64>();

        if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
            return Err(Error::explanation("surrogate produced non-finite coefficients"));
        }

        Ok(RidgeFit {
            columns: columns.to_vec(),
            coef,
            intercept,
        })
    }

    /// Weighted coefficient of determination of a fit
    pub fn weighted_r2(&self, fit: &RidgeFit) -> Result<f64> {
        let total = self.total_weight()?;
        let n = self.targets.len();
        let y_mean = (0..n)
            .map(|i| self.weights[i] * self.targets[i])
            .sum::<f64>()
            / total;

        let mut residual = 0.0;
        let mut spread = 0.0;
        for i in 0..n {
            let predicted = fit.intercept
                + fit
                    .columns
                    .iter()
                    .zip(&fit.coef)
                    .map(|(&c, coef)| coef * self.value(i, c))
                    .sum::<f64>();
            residual += self.weights[i] * (self.targets[i] - predicted).powi(2);
            spread += self.weights[i] * (self.targets[i] - y_mean).powi(2);
        }

        Ok(if spread == 0.0 {
            if residual == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - residual / spread
        })
    }

    /// Greedily add the column that most improves weighted R²
    pub fn forward_selection(&self, num_features: usize, alpha: f64) -> Result<Vec<usize>> {
        let d = self.masks.first().map_or(0, Vec::len);
        let mut selected: Vec<usize> = Vec::with_capacity(num_features);

        for _ in 0..num_features.min(d) {
            let mut best: Option<(usize, f64)> = None;
            for candidate in (0..d).filter(|c| !selected.contains(c)) {
                let mut columns = selected.clone();
                columns.push(candidate);
                let score = self.weighted_r2(&self.fit_ridge(&columns, alpha)?)?;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((candidate, score));
                }
            }
            match best {
                Some((column, _)) => selected.push(column),
                None => break,
            }
        }

        Ok(selected)
    }

    /// Columns with the largest absolute coefficient in a fit on all columns
    pub fn highest_weights(&self, num_features: usize, alpha: f64) -> Result<Vec<usize>> {
        let d = self.masks.first().map_or(0, Vec::len);
        let all: Vec<usize> = (0..d).collect();
        let fit = self.fit_ridge(&all, alpha)?;

        let mut ranked: Vec<usize> = all;
        ranked.sort_by(|&a, &b| fit.coef[b].abs().total_cmp(&fit.coef[a].abs()));
        ranked.truncate(num_features);
        Ok(ranked)
    }

    /// Forward selection for small requests, highest weights otherwise
    pub fn select_features(&self, num_features: usize, alpha: f64) -> Result<Vec<usize>> {
        if num_features <= 6 {
            self.forward_selection(num_features, alpha)
        } else {
            self.highest_weights(num_features, alpha)
        }
    }
}

/// Solve `a x = b` for symmetric positive-definite `a` (row-major, n x n)
fn cholesky_solve(mut a: Vec<f64>, mut b: Vec<f64>, n: usize) -> Result<Vec<f64>> {
    for j in 0..n {
        let mut diag = a[j * n + j];
        for k in 0..j {
            diag -= a[j * n + k] * a[j * n + k];
        }
        if diag <= 0.0 || !diag.is_finite() {
            return Err(Error::explanation("surrogate system is not positive definite"));
        }
        let diag = diag.sqrt();
        a[j * n + j] = diag;

        for i in (j + 1)..n {
            let mut value = a[i * n + j];
            for k in 0..j {
                value -= a[i * n + k] * a[j * n + k];
            }
            a[i * n + j] = value / diag;
        }
    }

    // forward substitution: L y = b
    for i in 0..n {
        for k in 0..i {
            b[i] -= a[i * n + k] * b[k];
        }
        b[i] /= a[i * n + i];
    }
    // back substitution: L^T x = y
    for i in (0..n).rev() {
        for k in (i + 1)..n {
            b[i] -= a[k * n + i] * b[k];
        }
        b[i] /= a[i * n + i];
    }

    Ok(b)
}
