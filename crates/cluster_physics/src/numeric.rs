//! Small numerical toolbox: interpolation, quadrature, and finite
//! differences on tabulated profiles.

/// Linear interpolation of `(xs, ys)` at `x`, clamped to the endpoints.
/// `xs` must be sorted ascending.
pub fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    if x <= xs[0] {
        return ys[0];
    }
    let last = xs.len() - 1;
    if x >= xs[last] {
        return ys[last];
    }
    let i = xs.partition_point(|&v| v < x);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Cumulative trapezoid integral of `ys` over `xs`, anchored at zero:
/// `out[i]` approximates the integral from `xs[0]` to `xs[i]`.
pub fn cumtrapz(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; xs.len()];
    for i in 1..xs.len() {
        out[i] = out[i - 1] + 0.5 * (ys[i] + ys[i - 1]) * (xs[i] - xs[i - 1]);
    }
    out
}

/// Reverse cumulative trapezoid: `out[i]` approximates the integral from
/// `xs[i]` to `xs[last]`.
pub fn reverse_cumtrapz(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut out = vec![0.0; n];
    for i in (0..n - 1).rev() {
        out[i] = out[i + 1] + 0.5 * (ys[i] + ys[i + 1]) * (xs[i + 1] - xs[i]);
    }
    out
}

/// Adaptive Simpson quadrature of `f` over `[a, b]` with relative
/// tolerance `tol`.
pub fn quad(f: &dyn Fn(f64) -> f64, a: f64, b: f64, tol: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    let c = 0.5 * (a + b);
    let (fa, fb, fc) = (f(a), f(b), f(c));
    let whole = simpson(fa, fc, fb, b - a);
    let tol_abs = tol * (1.0 + whole.abs());
    adaptive(f, a, b, fa, fb, fc, whole, tol_abs, 20)
}

fn simpson(fa: f64, fm: f64, fb: f64, h: f64) -> f64 {
    h / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn adaptive(
    f: &dyn Fn(f64) -> f64,
    a: f64,
    b: f64,
    fa: f64,
    fb: f64,
    fc: f64,
    whole: f64,
    tol: f64,
    depth: u32,
) -> f64 {
    let c = 0.5 * (a + b);
    let lm = 0.5 * (a + c);
    let rm = 0.5 * (c + b);
    let (flm, frm) = (f(lm), f(rm));
    let left = simpson(fa, flm, fc, c - a);
    let right = simpson(fc, frm, fb, b - c);
    let delta = left + right - whole;
    if depth == 0 || delta.abs() <= 15.0 * tol {
        left + right + delta / 15.0
    } else {
        adaptive(f, a, c, fa, fc, flm, left, 0.5 * tol, depth - 1)
            + adaptive(f, c, b, fc, fb, frm, right, 0.5 * tol, depth - 1)
    }
}

/// First derivative dy/dx on a (possibly non-uniform) grid via central
/// differences, one-sided at the boundaries.
pub fn derivative(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut out = vec![0.0; n];
    out[0] = (ys[1] - ys[0]) / (xs[1] - xs[0]);
    out[n - 1] = (ys[n - 1] - ys[n - 2]) / (xs[n - 1] - xs[n - 2]);
    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        // Weighted central difference, exact for quadratics
        out[i] = (h0 * h0 * ys[i + 1] - h1 * h1 * ys[i - 1]
            + (h1 * h1 - h0 * h0) * ys[i])
            / (h0 * h1 * (h0 + h1));
    }
    out
}

/// Second derivative d²y/dx² on a (possibly non-uniform) grid.
/// Interior points use the three-point formula; endpoints copy their
/// neighbors.
pub fn second_derivative(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut out = vec![0.0; n];
    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        out[i] = 2.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0) / (h0 + h1);
    }
    out[0] = out[1];
    out[n - 1] = out[n - 2];
    out
}

/// Log-spaced grid of `n` points from `lo` to `hi` inclusive.
pub fn log_grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let (la, lb) = (lo.ln(), hi.ln());
    (0..n)
        .map(|i| (la + (lb - la) * i as f64 / (n - 1) as f64).exp())
        .collect()
}
