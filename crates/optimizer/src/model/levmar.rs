#![forbid(unsafe_code)]

//! Small dense Levenberg-Marquardt solver for three-parameter curves.
//!
//! The normal equations are only ever 3x3 here, so they are solved
//! directly with partial-pivoting elimination instead of pulling in a
//! linear algebra stack.

const LAMBDA_INITIAL: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e12;
const COST_TOLERANCE: f64 = 1e-12;
const STEP_TOLERANCE: f64 = 1e-10;

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error("residuals are not finite at the initial guess")]
    NonFinite,
    #[error("empty data set")]
    EmptyData,
}

/// Fit `params` so that `eval(params, x)` tracks `ys` in least squares,
/// with each parameter clamped to its `[lower, upper]` box.
pub fn fit<F, J>(
    xs: &[f64],
    ys: &[f64],
    initial: [f64; 3],
    lower: [f64; 3],
    upper: [f64; 3],
    eval: F,
    jacobian: J,
    max_iterations: usize,
) -> Result<[f64; 3], SolveError>
where
    F: Fn(&[f64; 3], f64) -> f64,
    J: Fn(&[f64; 3], f64) -> [f64; 3],
{
    if xs.is_empty() || xs.len() != ys.len() {
        return Err(SolveError::EmptyData);
    }

    let mut params = clamp(initial, &lower, &upper);
    let mut cost = residual_cost(xs, ys, &params, &eval);
    if !cost.is_finite() {
        return Err(SolveError::NonFinite);
    }

    let mut lambda = LAMBDA_INITIAL;
    for _ in 0..max_iterations {
        // Accumulate JtJ and Jtr over the residuals r_i = eval(x_i) - y_i.
        let mut jtj = [[0.0f64; 3]; 3];
        let mut jtr = [0.0f64; 3];
        for (&x, &y) in xs.iter().zip(ys) {
            let row = jacobian(&params, x);
            let residual = eval(&params, x) - y;
            for i in 0..3 {
                jtr[i] += row[i] * residual;
                for j in 0..3 {
                    jtj[i][j] += row[i] * row[j];
                }
            }
        }

        // Damped system (JtJ + lambda * diag(JtJ)) step = -Jtr.
        let mut damped = jtj;
        for i in 0..3 {
            damped[i][i] += lambda * jtj[i][i].max(f64::EPSILON);
        }
        let Some(step) = solve_3x3(damped, [-jtr[0], -jtr[1], -jtr[2]]) else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
            continue;
        };

        let candidate = clamp(
            [
                params[0] + step[0],
                params[1] + step[1],
                params[2] + step[2],
            ],
            &lower,
            &upper,
        );
        let candidate_cost = residual_cost(xs, ys, &candidate, &eval);

        if candidate_cost.is_finite() && candidate_cost < cost {
            let improvement = cost - candidate_cost;
            let step_norm = (0..3)
                .map(|i| (candidate[i] - params[i]).powi(2))
                .sum::<f64>()
                .sqrt();
            params = candidate;
            cost = candidate_cost;
            lambda = (lambda / 10.0).max(1e-12);
            if improvement <= COST_TOLERANCE * cost.max(1.0) || step_norm <= STEP_TOLERANCE {
                break;
            }
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break;
            }
        }
    }

    Ok(params)
}

fn residual_cost<F>(xs: &[f64], ys: &[f64], params: &[f64; 3], eval: &F) -> f64
where
    F: Fn(&[f64; 3], f64) -> f64,
{
    xs.iter()
        .zip(ys)
        .map(|(&x, &y)| (eval(params, x) - y).powi(2))
        .sum()
}

fn clamp(params: [f64; 3], lower: &[f64; 3], upper: &[f64; 3]) -> [f64; 3] {
    let mut clamped = params;
    for i in 0..3 {
        clamped[i] = clamped[i].clamp(lower[i], upper[i]);
    }
    clamped
}

/// Gaussian elimination with partial pivoting; `None` when singular.
fn solve_3x3(mut a: [[f64; 3]; 3], mut b: [f64; 3]) -> Option<[f64; 3]> {
    for col in 0..3 {
        let pivot_row = (col..3)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot_row][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..3 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = [0.0f64; 3];
    for row in (0..3).rev() {
        let mut sum = b[row];
        for k in (row + 1)..3 {
            sum -= a[row][k] * x[k];
        }
        x[row] = sum / a[row][row];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
