//! Flat-kernel mean-shift clustering.
//!
//! Every sample seeds a mode search; converged modes closer than the bandwidth
//! are merged, keeping the one that attracted more samples. Samples are then
//! labelled with their nearest surviving mode. Cluster ids are ordered by
//! decreasing mode population.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

const MAX_ITER: usize = 300;

#[derive(Debug, Clone)]
pub struct MeanShift {
    pub bandwidth: f64,
}

#[derive(Debug, Clone)]
pub struct MeanShiftResult {
    /// One row per cluster.
    pub centers: Array2<f64>,
    /// Cluster id of every input sample.
    pub labels: Vec<usize>,
}

impl MeanShiftResult {
    pub fn n_clusters(&self) -> usize {
        self.centers.nrows()
    }

    /// Number of samples per cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_clusters()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Sample indices belonging to `cluster`, in input order.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect()
    }
}

fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

impl MeanShift {
    pub fn new(bandwidth: f64) -> Self {
        Self { bandwidth }
    }

    /// Clusters the rows of `points`. An empty input yields no clusters.
    pub fn fit(&self, points: ArrayView2<f64>) -> MeanShiftResult {
        let n = points.nrows();
        let dims = points.ncols();
        if n == 0 {
            return MeanShiftResult {
                centers: Array2::zeros((0, dims)),
                labels: Vec::new(),
            };
        }

        let stop_thresh = 1e-3 * self.bandwidth;

        // Mode search from every sample
        let mut modes: Vec<(Array1<f64>, usize)> = Vec::with_capacity(n);
        for seed in points.outer_iter() {
            let mut mean = seed.to_owned();
            let mut population = 0usize;
            for _ in 0..MAX_ITER {
                let mut sum = Array1::<f64>::zeros(dims);
                let mut count = 0usize;
                for p in points.outer_iter() {
                    if distance(p, mean.view()) <= self.bandwidth {
                        sum += &p;
                        count += 1;
                    }
                }
                if count == 0 {
                    break;
                }

                let old = std::mem::replace(&mut mean, sum / count as f64);
                population = count;
                if distance(mean.view(), old.view()) <= stop_thresh {
                    break;
                }
            }

            if population > 0 {
                modes.push((mean, population));
            }
        }

        // Most populated modes first; coordinates break ties
        modes.sort_by(|a, b| {
            b.1.cmp(&a.1).then_with(|| {
                b.0.iter()
                    .zip(a.0.iter())
                    .map(|(x, y)| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal))
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });

        let mut keep = vec![true; modes.len()];
        for i in 0..modes.len() {
            if !keep[i] {
                continue;
            }
            for j in (i + 1)..modes.len() {
                if keep[j] && distance(modes[i].0.view(), modes[j].0.view()) <= self.bandwidth {
                    keep[j] = false;
                }
            }
        }

        let kept: Vec<&Array1<f64>> = modes
            .iter()
            .zip(keep.iter())
            .filter(|(_, &k)| k)
            .map(|(m, _)| &m.0)
            .collect();

        let mut centers = Array2::<f64>::zeros((kept.len(), dims));
        for (mut row, center) in centers.axis_iter_mut(Axis(0)).zip(kept.iter()) {
            row.assign(*center);
        }

        let labels = points
            .outer_iter()
            .map(|p| {
                let mut best = 0usize;
                let mut best_dist = f64::INFINITY;
                for (idx, c) in centers.outer_iter().enumerate() {
                    let d = distance(p, c);
                    if d < best_dist {
                        best = idx;
                        best_dist = d;
                    }
                }
                best
            })
            .collect();

        MeanShiftResult { centers, labels }
    }

    /// Convenience wrapper for one-dimensional samples.
    pub fn fit_1d(&self, values: &[f64]) -> MeanShiftResult {
        let points = Array2::from_shape_vec((values.len(), 1), values.to_vec())
            .unwrap_or_else(|_| Array2::zeros((0, 1)));
        self.fit(points.view())
    }
}
