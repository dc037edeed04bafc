// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Adaptive Clustering
//!
//! Partitions the summary polylines of one (course, topic) scope into an
//! automatically sized number of clusters:
//!
//! 1. `n == 0` gives no clusters, `n == 1` gives `k = 1`.
//! 2. Otherwise k-means runs for every `k` in `1..n` and the elbow of the
//!    inertia curve is chosen: the `k` whose point lies farthest from the
//!    chord joining the curve's first and last points.
//! 3. A final k-means at the chosen `k` yields the labels.
//! 4. Each cluster's centroid is the mean of its members' map positions and
//!    its label is the most frequent keywords across its members.
//!
//! K-means is seeded deterministically (first point, then repeatedly the
//! point farthest from the chosen centroids) so identical input always
//! yields identical clusters.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::geometry::Position;
use crate::domain::polyline::{Polyline, PolylineError};

pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_MAX_KEYWORDS: usize = 10;

/// One clustering input: a summary's polyline, its map position and the
/// keywords extracted from it.
#[derive(Debug, Clone)]
pub struct ClusterInput {
    pub polyline: Polyline,
    pub position: Position,
    pub keywords: Vec<String>,
}

/// Result of k-means at a fixed `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub index: usize,
    pub centroid: Position,
    pub keywords: Vec<String>,
    /// Indices into the clustered input.
    pub members: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Clustering {
    pub k: usize,
    /// Cluster index of every input item.
    pub labels: Vec<usize>,
    pub clusters: Vec<ClusterSummary>,
}

impl Clustering {
    pub fn cluster_of(&self, item: usize) -> Option<&ClusterSummary> {
        let label = *self.labels.get(item)?;
        self.clusters.iter().find(|c| c.index == label)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .unwrap_or((0, 0.0))
}

/// Farthest-point seeding. May return fewer than `k` centroids when the
/// data has fewer distinct points.
fn seed_centroids(points: &[&[f64]], k: usize) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    let Some(first) = points.first() else {
        return centroids;
    };
    centroids.push(first.to_vec());

    let mut min_distances: Vec<f64> = points.iter().map(|p| squared_distance(p, first)).collect();
    while centroids.len() < k {
        let (index, farthest) = min_distances
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal).then(b.0.cmp(&a.0)))
            .map(|(i, d)| (i, *d))
            .unwrap_or((0, 0.0));
        if farthest <= f64::EPSILON {
            break;
        }
        let chosen = points[index].to_vec();
        for (slot, point) in min_distances.iter_mut().zip(points) {
            *slot = slot.min(squared_distance(point, &chosen));
        }
        centroids.push(chosen);
    }
    centroids
}

/// Lloyd's k-means with deterministic seeding.
pub fn kmeans(polylines: &[Polyline], k: usize, max_iterations: usize) -> Result<KMeansFit, PolylineError> {
    let first = polylines.first().ok_or(PolylineError::EmptyAggregation)?;
    for polyline in polylines {
        polyline.ensure_len(first.len())?;
    }
    let points: Vec<&[f64]> = polylines.iter().map(|p| p.as_slice()).collect();
    let dims = first.len();

    let mut centroids = seed_centroids(&points, k.max(1));
    let mut labels: Vec<usize> = points.iter().map(|p| nearest_centroid(p, &centroids).0).collect();

    for _ in 0..max_iterations {
        let mut sums = vec![vec![0.0; dims]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (point, &label) in points.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point.iter()) {
                *s += v;
            }
        }
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(&counts) {
            if *count > 0 {
                *centroid = sum.into_iter().map(|s| s / *count as f64).collect();
            }
        }

        let next: Vec<usize> = points.iter().map(|p| nearest_centroid(p, &centroids).0).collect();
        if next == labels {
            break;
        }
        labels = next;
    }

    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &l)| squared_distance(p, &centroids[l]))
        .sum();

    Ok(KMeansFit {
        labels,
        centroids,
        inertia,
    })
}

/// Elbow of an inertia curve whose entry `i` belongs to `k = i + 1`.
///
/// Falls back to 1 when the curve has fewer than two points or no point
/// lies off the chord.
pub fn elbow_k(inertias: &[f64]) -> usize {
    if inertias.len() < 2 {
        return 1;
    }
    let (x1, y1) = (1.0, inertias[0]);
    let (x2, y2) = (inertias.len() as f64, inertias[inertias.len() - 1]);
    let norm = ((y2 - y1).powi(2) + (x2 - x1).powi(2)).sqrt();
    if norm == 0.0 {
        return 1;
    }

    let mut best = 1;
    let mut max_distance = 0.0;
    for (i, &y) in inertias.iter().enumerate() {
        let x = (i + 1) as f64;
        let distance = ((y2 - y1) * x - (x2 - x1) * y + x2 * y1 - y2 * x1).abs() / norm;
        if distance > max_distance {
            max_distance = distance;
            best = i + 1;
        }
    }
    best
}

/// The `limit` most frequent keywords; ties keep first-seen order.
pub fn top_keywords<'a, I>(keywords: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut order: Vec<(&String, usize)> = Vec::new();
    let mut slots: HashMap<&String, usize> = HashMap::new();
    for keyword in keywords {
        match slots.get(keyword) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                slots.insert(keyword, order.len());
                order.push((keyword, 1));
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.into_iter().take(limit).map(|(k, _)| k.clone()).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ClusteringEngine {
    pub max_iterations: usize,
    pub max_keywords: usize,
}

impl Default for ClusteringEngine {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_keywords: DEFAULT_MAX_KEYWORDS,
        }
    }
}

impl ClusteringEngine {
    pub fn new(max_iterations: usize, max_keywords: usize) -> Self {
        Self {
            max_iterations,
            max_keywords,
        }
    }

    /// Elbow-selected cluster count for `polylines`.
    pub fn choose_k(&self, polylines: &[Polyline]) -> Result<usize, PolylineError> {
        let n = polylines.len();
        if n <= 1 {
            return Ok(n);
        }
        let inertias = (1..n)
            .map(|k| kmeans(polylines, k, self.max_iterations).map(|fit| fit.inertia))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(elbow_k(&inertias))
    }

    pub fn cluster(&self, items: &[ClusterInput]) -> Result<Clustering, PolylineError> {
        if items.is_empty() {
            return Ok(Clustering::default());
        }
        let polylines: Vec<Polyline> = items.iter().map(|i| i.polyline.clone()).collect();
        let k = self.choose_k(&polylines)?;
        let fit = kmeans(&polylines, k, self.max_iterations)?;

        let mut members: Vec<Vec<usize>> = vec![Vec::new(); fit.centroids.len()];
        for (item, &label) in fit.labels.iter().enumerate() {
            members[label].push(item);
        }

        let clusters = members
            .into_iter()
            .enumerate()
            .filter(|(_, m)| !m.is_empty())
            .filter_map(|(index, members)| {
                let centroid = Position::mean(members.iter().map(|&i| &items[i].position))?;
                let keywords = top_keywords(
                    members.iter().flat_map(|&i| items[i].keywords.iter()),
                    self.max_keywords,
                );
                Some(ClusterSummary {
                    index,
                    centroid,
                    keywords,
                    members,
                })
            })
            .collect();

        Ok(Clustering {
            k,
            labels: fit.labels,
            clusters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(values: &[f64], position: (f64, f64), keywords: &[&str]) -> ClusterInput {
        ClusterInput {
            polyline: Polyline::new(values.to_vec()).unwrap(),
            position: Position::new(position.0, position.1),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    #[test]
    fn test_empty_input_has_no_clusters() {
        let clustering = ClusteringEngine::default().cluster(&[]).unwrap();
        assert!(clustering.clusters.is_empty());
        assert_eq!(clustering.k, 0);
    }

    #[test]
    fn test_single_item_forms_one_cluster() {
        let items = vec![item(&[0.3, 0.7, 0.1], (0.2, 0.4), &["graph", "tree"])];
        let clustering = ClusteringEngine::default().cluster(&items).unwrap();
        assert_eq!(clustering.k, 1);
        assert_eq!(clustering.clusters.len(), 1);
        assert_eq!(clustering.clusters[0].members, vec![0]);
        assert_eq!(clustering.clusters[0].centroid, Position::new(0.2, 0.4));
        assert_eq!(clustering.clusters[0].keywords, vec!["graph", "tree"]);
    }

    #[test]
    fn test_two_items_use_one_cluster() {
        let items = vec![
            item(&[0.0, 0.0], (0.0, 0.0), &["a"]),
            item(&[1.0, 1.0], (1.0, 1.0), &["b"]),
        ];
        let clustering = ClusteringEngine::default().cluster(&items).unwrap();
        assert_eq!(clustering.k, 1);
        assert_eq!(clustering.clusters[0].centroid, Position::new(0.5, 0.5));
    }

    #[test]
    fn test_separated_groups_are_found() {
        let mut items = Vec::new();
        for i in 0..4 {
            let d = i as f64 * 0.01;
            items.push(item(&[0.1 + d, 0.1], (0.1, 0.1), &["sets"]));
            items.push(item(&[0.9 - d, 0.9], (0.9, 0.9), &["logic"]));
        }
        let clustering = ClusteringEngine::default().cluster(&items).unwrap();
        assert_eq!(clustering.k, 2);
        assert_eq!(clustering.labels[0], clustering.labels[2]);
        assert_ne!(clustering.labels[0], clustering.labels[1]);
        let low = clustering.cluster_of(0).unwrap();
        assert_eq!(low.keywords, vec!["sets"]);
        assert_eq!(low.members.len(), 4);
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let polylines: Vec<Polyline> = [[0.1, 0.2], [0.8, 0.7], [0.15, 0.25], [0.75, 0.9], [0.4, 0.5]]
            .iter()
            .map(|v| Polyline::new(v.to_vec()).unwrap())
            .collect();
        assert_eq!(kmeans(&polylines, 2, 100).unwrap(), kmeans(&polylines, 2, 100).unwrap());
    }

    #[test]
    fn test_kmeans_with_duplicate_points() {
        let polylines = vec![Polyline::new(vec![0.5, 0.5]).unwrap(); 4];
        let fit = kmeans(&polylines, 3, 100).unwrap();
        assert_eq!(fit.centroids.len(), 1);
        assert_eq!(fit.inertia, 0.0);
    }

    #[test]
    fn test_kmeans_rejects_mixed_lengths() {
        let polylines = vec![
            Polyline::new(vec![0.5, 0.5]).unwrap(),
            Polyline::new(vec![0.5]).unwrap(),
        ];
        assert!(kmeans(&polylines, 1, 10).is_err());
    }

    #[test]
    fn test_elbow_picks_bend() {
        assert_eq!(elbow_k(&[100.0, 20.0, 15.0, 12.0, 10.0]), 2);
        assert_eq!(elbow_k(&[5.0]), 1);
        assert_eq!(elbow_k(&[]), 1);
        assert_eq!(elbow_k(&[4.0, 3.0, 2.0, 1.0]), 1);
    }

    #[test]
    fn test_top_keywords_tie_break_first_seen() {
        let words: Vec<String> = ["b", "a", "c", "a", "b", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(top_keywords(words.iter(), 3), vec!["b", "a", "c"]);
        assert_eq!(top_keywords(words.iter(), 10).len(), 4);
    }
}
