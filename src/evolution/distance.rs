//! Distance metrics over genome positions.

use std::collections::BTreeMap;

use crate::schema::DistanceMetricConfig;

use super::genome::CoordinateVector;

/// Distance and centroid computation in genotype space.
pub trait DistanceMetric: Send + Sync {
    /// Distance between two positions.
    fn distance(&self, a: &CoordinateVector, b: &CoordinateVector) -> f64;

    /// Centroid of a set of positions.
    fn centroid(&self, points: &[&CoordinateVector]) -> CoordinateVector {
        mean_centroid(points)
    }
}

/// One step of a merge over two sorted coordinate vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Pair {
    /// Id present in both vectors.
    Matched(f64, f64),
    /// Id present in only one vector.
    Mismatched(f64),
}

/// Walk two sorted coordinate vectors, calling `visit` once per distinct id.
fn merge_walk(a: &CoordinateVector, b: &CoordinateVector, mut visit: impl FnMut(Pair)) {
    let (a, b) = (a.coords(), b.coords());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (id_a, val_a) = a[i];
        let (id_b, val_b) = b[j];
        if id_a == id_b {
            visit(Pair::Matched(val_a, val_b));
            i += 1;
            j += 1;
        } else if id_a < id_b {
            visit(Pair::Mismatched(val_a));
            i += 1;
        } else {
            visit(Pair::Mismatched(val_b));
            j += 1;
        }
    }
    a[i..]
        .iter()
        .chain(&b[j..])
        .for_each(|&(_, v)| visit(Pair::Mismatched(v)));
}

/// Weighted Manhattan distance.
#[derive(Debug, Clone, Copy)]
pub struct ManhattanDistance {
    pub matching_coefficient: f64,
    pub mismatch_coefficient: f64,
    pub mismatch_constant: f64,
}

impl Default for ManhattanDistance {
    fn default() -> Self {
        Self {
            matching_coefficient: 1.0,
            mismatch_coefficient: 0.0,
            mismatch_constant: 10.0,
        }
    }
}

impl DistanceMetric for ManhattanDistance {
    fn distance(&self, a: &CoordinateVector, b: &CoordinateVector) -> f64 {
        let mut distance = 0.0;
        merge_walk(a, b, |pair| {
            distance += match pair {
                Pair::Matched(x, y) => self.matching_coefficient * (x - y).abs(),
                Pair::Mismatched(v) => self.mismatch_coefficient * v.abs() + self.mismatch_constant,
            }
        });
        distance
    }
}

/// Weighted Euclidean distance.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanDistance {
    pub matching_coefficient: f64,
    pub mismatch_coefficient: f64,
    pub mismatch_constant: f64,
}

impl Default for EuclideanDistance {
    fn default() -> Self {
        Self {
            matching_coefficient: 1.0,
            mismatch_coefficient: 0.0,
            mismatch_constant: 10.0,
        }
    }
}

impl DistanceMetric for EuclideanDistance {
    fn distance(&self, a: &CoordinateVector, b: &CoordinateVector) -> f64 {
        let mut sum = 0.0;
        merge_walk(a, b, |pair| {
            sum += match pair {
                Pair::Matched(x, y) => self.matching_coefficient * (x - y).powi(2),
                Pair::Mismatched(v) => self.mismatch_coefficient * v * v + self.mismatch_constant,
            }
        });
        sum.sqrt()
    }
}

/// Synthetic mean position: each coordinate is averaged over all points,
/// treating a missing coordinate as zero.
pub fn mean_centroid(points: &[&CoordinateVector]) -> CoordinateVector {
    match points {
        [] => CoordinateVector::default(),
        [single] => (*single).clone(),
        _ => {
            let mut sums: BTreeMap<u64, f64> = BTreeMap::new();
            for point in points {
                for &(id, value) in point.coords() {
                    *sums.entry(id).or_insert(0.0) += value;
                }
            }
            let n = points.len() as f64;
            CoordinateVector::new(sums.into_iter().map(|(id, sum)| (id, sum / n)).collect())
        }
    }
}

/// Build the metric described by a config.
pub fn metric_from_config(config: &DistanceMetricConfig) -> Box<dyn DistanceMetric> {
    match *config {
        DistanceMetricConfig::Manhattan {
            matching_coefficient,
            mismatch_coefficient,
            mismatch_constant,
        } => Box::new(ManhattanDistance {
            matching_coefficient,
            mismatch_coefficient,
            mismatch_constant,
        }),
        DistanceMetricConfig::Euclidean {
            matching_coefficient,
            mismatch_coefficient,
            mismatch_constant,
        } => Box::new(EuclideanDistance {
            matching_coefficient,
            mismatch_coefficient,
            mismatch_constant,
        }),
    }
}
