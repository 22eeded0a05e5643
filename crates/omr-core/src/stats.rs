/// Linear-interpolation percentile over `values`, matching NumPy's default
/// `numpy.percentile` behavior. `p` is in `[0, 100]`. Returns `0.0` for an
/// empty slice rather than panicking — per-cell arithmetic faults are never
/// fatal (see the bubble decision engine's failure semantics).
pub fn percentile(values: &[f32], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.iter().map(|v| *v as f64).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f32], mean_val: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (*v as f64 - mean_val).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// The closed set of numeric features computed per cell (§4.6). Nothing
/// beyond this bag is passed to the bubble decision engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub std: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub dark_ratio: f64,
    pub very_dark_ratio: f64,
    pub filled_ratio: f64,
}

impl CellStats {
    /// Compute mean/median/min/std/percentiles/darkness ratios from the raw
    /// grayscale pixels of a cell, and the fill ratio from the paired binary
    /// pixels (same inset, same cell, adaptive-threshold binarized upstream).
    pub fn compute(gray_pixels: &[u8], binary_pixels: &[u8]) -> Self {
        if gray_pixels.is_empty() {
            return Self {
                mean: 0.0,
                median: 0.0,
                min: 0.0,
                std: 0.0,
                p10: 0.0,
                p25: 0.0,
                p50: 0.0,
                dark_ratio: 0.0,
                very_dark_ratio: 0.0,
                filled_ratio: 0.0,
            };
        }
        let as_f32: Vec<f32> = gray_pixels.iter().map(|&v| v as f32).collect();
        let mean_val = mean(&as_f32);
        let std_val = std_dev(&as_f32, mean_val);
        let min_val = gray_pixels.iter().copied().min().unwrap_or(0) as f64;

        let n = gray_pixels.len() as f64;
        let very_dark = gray_pixels.iter().filter(|&&v| (v as i32) < 80).count() as f64;
        let dark = gray_pixels.iter().filter(|&&v| (v as i32) < 120).count() as f64;

        let filled_ratio = if binary_pixels.is_empty() {
            0.0
        } else {
            binary_pixels.iter().filter(|&&v| v == 255).count() as f64 / binary_pixels.len() as f64
        };

        Self {
            mean: mean_val,
            median: percentile(&as_f32, 50.0),
            min: min_val,
            std: std_val,
            p10: percentile(&as_f32, 10.0),
            p25: percentile(&as_f32, 25.0),
            p50: percentile(&as_f32, 50.0),
            dark_ratio: dark / n,
            very_dark_ratio: very_dark / n,
            filled_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_matches_numpy_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-9);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-9);
        // rank = 0.25 * 3 = 0.75 -> between index 0 (1.0) and 1 (2.0)
        assert!((percentile(&values, 25.0) - 1.75).abs() < 1e-9);
    }

    #[test]
    fn percentile_empty_is_zero() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn cell_stats_darkness_ratios() {
        let gray = vec![200u8, 100, 50, 30];
        let binary = vec![0u8, 255, 255, 255];
        let stats = CellStats::compute(&gray, &binary);
        assert!((stats.dark_ratio - 0.75).abs() < 1e-9); // 100,50,30 < 120
        assert!((stats.very_dark_ratio - 0.5).abs() < 1e-9); // 50,30 < 80
        assert!((stats.filled_ratio - 0.75).abs() < 1e-9);
        assert_eq!(stats.min, 30.0);
    }
}
