use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid step must be positive")]
    BadStep,

    #[error("grid bounds are inverted or empty")]
    BadBounds,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    rh: f64,
    t: f64,
    report: f64,
    reference: f64,
}

impl Sample {
    fn error(&self) -> f64 {
        self.report - self.reference
    }
}

#[derive(Debug, Clone, Default)]
struct Cell {
    samples: Vec<Sample>,
}

impl Cell {
    /// Mean and sample standard deviation of the report-minus-reference
    /// error; stdev needs at least two samples.
    fn error_stats(&self) -> (Option<f64>, Option<f64>) {
        let n = self.samples.len();
        if n == 0 {
            return (None, None);
        }

        let mean = self.samples.iter().map(Sample::error).sum::<f64>() / n as f64;
        if n < 2 {
            return (Some(mean), None);
        }

        let variance = self
            .samples
            .iter()
            .map(|s| (s.error() - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;

        (Some(mean), Some(variance.sqrt()))
    }
}

/// Report for one cell of the grid.
#[derive(Debug, Serialize)]
pub struct CellReport {
    pub n: usize,
    pub avg: Option<f64>,
    pub stdev: Option<f64>,
}

/// Report for one humidity band: the band's mean humidity, the slope and
/// intercept of the error-on-temperature regression across the band, and the
/// per-cell statistics.
#[derive(Debug, Serialize)]
pub struct GridRow {
    #[serde(rename = "rH_avg")]
    pub rh_avg: Option<f64>,

    #[serde(rename = "mT")]
    pub m_t: Option<f64>,

    #[serde(rename = "cT")]
    pub c_t: Option<f64>,

    pub cells: Vec<CellReport>,
}

/// The transposed orientation: one temperature band per row, with the
/// error-on-humidity regression across the band.
#[derive(Debug, Serialize)]
pub struct GridTRow {
    #[serde(rename = "t_avg")]
    pub t_avg: Option<f64>,

    #[serde(rename = "mRH")]
    pub m_rh: Option<f64>,

    #[serde(rename = "cRH")]
    pub c_rh: Option<f64>,

    pub cells: Vec<CellReport>,
}

/// Groups gas-concentration errors by relative humidity (rows) and
/// temperature (columns), both on uniform inclusive bounds.
///
/// Samples outside the bounds are rejected, not counted.
#[derive(Debug)]
pub struct ErrorGrid {
    rh_min: f64,
    rh_max: f64,
    rh_step: f64,
    t_min: f64,
    t_max: f64,
    t_step: f64,
    cells: Vec<Vec<Cell>>,
}

impl ErrorGrid {
    pub fn construct(
        rh_min: f64,
        rh_max: f64,
        rh_step: f64,
        t_min: f64,
        t_max: f64,
        t_step: f64,
    ) -> Result<Self, GridError> {
        if rh_step <= 0.0 || t_step <= 0.0 {
            return Err(GridError::BadStep);
        }

        if rh_max <= rh_min || t_max <= t_min {
            return Err(GridError::BadBounds);
        }

        let rows = ((rh_max - rh_min) / rh_step).ceil() as usize;
        let cols = ((t_max - t_min) / t_step).ceil() as usize;

        Ok(Self {
            rh_min,
            rh_max,
            rh_step,
            t_min,
            t_max,
            t_step,
            cells: vec![vec![Cell::default(); cols]; rows],
        })
    }

    /// Append a reported / reference pair. Returns `false` when the sample's
    /// humidity or temperature falls outside the grid.
    pub fn append(&mut self, rh: f64, t: f64, report: f64, reference: f64) -> bool {
        let rows = self.cells.len();
        let cols = self.cells[0].len();

        let Some(row) = band(rh, self.rh_min, self.rh_max, self.rh_step, rows) else {
            return false;
        };
        let Some(col) = band(t, self.t_min, self.t_max, self.t_step, cols) else {
            return false;
        };

        self.cells[row][col].samples.push(Sample {
            rh,
            t,
            report,
            reference,
        });

        true
    }

    pub fn rows(&self) -> Vec<GridRow> {
        self.cells
            .iter()
            .map(|row| {
                let samples: Vec<&Sample> = row.iter().flat_map(|c| &c.samples).collect();

                let rh_avg = (!samples.is_empty())
                    .then(|| samples.iter().map(|s| s.rh).sum::<f64>() / samples.len() as f64);

                let ts: Vec<f64> = samples.iter().map(|s| s.t).collect();
                let errors: Vec<f64> = samples.iter().map(|s| s.error()).collect();
                let regression = linregress(&ts, &errors);

                GridRow {
                    rh_avg,
                    m_t: regression.map(|(m, _)| m),
                    c_t: regression.map(|(_, c)| c),
                    cells: row
                        .iter()
                        .map(|cell| {
                            let (avg, stdev) = cell.error_stats();
                            CellReport {
                                n: cell.samples.len(),
                                avg,
                                stdev,
                            }
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// The same grid with temperature bands as rows and humidity bands as
    /// columns, each row regressing the error on humidity instead.
    pub fn t_rows(&self) -> Vec<GridTRow> {
        let cols = self.cells[0].len();

        (0..cols)
            .map(|col| {
                let column: Vec<&Cell> = self.cells.iter().map(|row| &row[col]).collect();
                let samples: Vec<&Sample> =
                    column.iter().flat_map(|c| &c.samples).collect();

                let t_avg = (!samples.is_empty())
                    .then(|| samples.iter().map(|s| s.t).sum::<f64>() / samples.len() as f64);

                let rhs: Vec<f64> = samples.iter().map(|s| s.rh).collect();
                let errors: Vec<f64> = samples.iter().map(|s| s.error()).collect();
                let regression = linregress(&rhs, &errors);

                GridTRow {
                    t_avg,
                    m_rh: regression.map(|(m, _)| m),
                    c_rh: regression.map(|(_, c)| c),
                    cells: column
                        .iter()
                        .map(|cell| {
                            let (avg, stdev) = cell.error_stats();
                            CellReport {
                                n: cell.samples.len(),
                                avg,
                                stdev,
                            }
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// Mean of the per-cell error standard deviations, over the cells with
    /// enough samples to have one. `None` for an effectively empty grid.
    pub fn stdev(&self) -> Option<f64> {
        let stdevs: Vec<f64> = self
            .cells
            .iter()
            .flatten()
            .filter_map(|cell| cell.error_stats().1)
            .collect();

        if stdevs.is_empty() {
            return None;
        }

        Some(stdevs.iter().sum::<f64>() / stdevs.len() as f64)
    }
}

/// Band index for a value on inclusive uniform bounds; the upper bound folds
/// into the last band.
fn band(value: f64, min: f64, max: f64, step: f64, count: usize) -> Option<usize> {
    if value < min || value > max {
        return None;
    }

    Some((((value - min) / step) as usize).min(count - 1))
}

/// Least-squares slope and intercept of y on x. `None` with fewer than two
/// points or a degenerate x spread.
pub fn linregress(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }

    let x_mean = xs.iter().sum::<f64>() / n as f64;
    let y_mean = ys.iter().sum::<f64>() / n as f64;

    let sxx = xs.iter().map(|x| (x - x_mean).powi(2)).sum::<f64>();
    if sxx == 0.0 {
        return None;
    }

    let sxy = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (x - x_mean) * (y - y_mean))
        .sum::<f64>();

    let slope = sxy / sxx;
    Some((slope, y_mean - slope * x_mean))
}

// --------------------------------------------------------------------------
