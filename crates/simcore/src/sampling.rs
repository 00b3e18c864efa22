//! Sample grids for simulation outputs.

/// `n` evenly spaced points over the closed interval `[start, end]`.
///
/// The last point is exactly `end`. `n == 1` yields `[start]`, `n == 0` an empty grid.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// `n` points `i * step` for `i` in `0..n`, i.e. the half-open interval `[0, n * step)`.
pub fn arange(n: usize, step: f64) -> Vec<f64> {
    (0..n).map(|i| i as f64 * step).collect()
}
