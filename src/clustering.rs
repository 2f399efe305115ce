//! Destination clustering.
//!
//! Stay locations from many entities are grouped into shared destinations
//! by hierarchical clustering in (longitude, latitude) degree space. The
//! clustering itself sits behind the [`DestinationClusterer`] trait so a
//! different implementation can be plugged in; [`AgglomerativeClusterer`]
//! is the bundled one.
//!
//! Flat clusters follow the "distance" cut of a dendrogram: two points
//! share a label iff they are joined by merges whose linkage distance is at
//! most `max_distance`.

use std::fmt;
use std::str::FromStr;

use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StayError};
use crate::geo_utils::planar_distance;
use crate::medoid::distance_matrix;
use crate::union_find::UnionFind;
use crate::{DistanceMetric, GpsPoint};

/// Rule for the distance between two clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkageMethod {
    /// Nearest pair of members
    #[default]
    Single,
    /// Farthest pair of members
    Complete,
    /// Mean over all member pairs (UPGMA)
    Average,
    /// Mean of the two merged clusters' distances (WPGMA)
    Weighted,
    /// Minimum variance increase
    Ward,
}

impl LinkageMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkageMethod::Single => "single",
            LinkageMethod::Complete => "complete",
            LinkageMethod::Average => "average",
            LinkageMethod::Weighted => "weighted",
            LinkageMethod::Ward => "ward",
        }
    }

    /// Lance-Williams update: distance from the merge of `a` and `b` to `k`.
    fn merged_distance(
        &self,
        d_ak: f64,
        d_bk: f64,
        d_ab: f64,
        size_a: usize,
        size_b: usize,
        size_k: usize,
    ) -> f64 {
        let (na, nb, nk) = (size_a as f64, size_b as f64, size_k as f64);
        match self {
            LinkageMethod::Single => d_ak.min(d_bk),
            LinkageMethod::Complete => d_ak.max(d_bk),
            LinkageMethod::Average => (na * d_ak + nb * d_bk) / (na + nb),
            LinkageMethod::Weighted => (d_ak + d_bk) / 2.0,
            LinkageMethod::Ward => {
                let total = na + nb + nk;
                (((na + nk) * d_ak * d_ak + (nb + nk) * d_bk * d_bk - nk * d_ab * d_ab) / total)
                    .max(0.0)
                    .sqrt()
            }
        }
    }
}

impl fmt::Display for LinkageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkageMethod {
    type Err = StayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Ok(LinkageMethod::Single),
            "complete" => Ok(LinkageMethod::Complete),
            "average" => Ok(LinkageMethod::Average),
            "weighted" => Ok(LinkageMethod::Weighted),
            "ward" => Ok(LinkageMethod::Ward),
            other => Err(StayError::ConfigError {
                message: format!("unknown linkage method '{}'", other),
            }),
        }
    }
}

/// Assigns a cluster label to every point.
///
/// Implementations must return exactly one label per input point. Labels
/// need not be contiguous or start at zero.
pub trait DestinationClusterer: Send + Sync {
    fn assign_clusters(
        &self,
        points: &[GpsPoint],
        linkage: LinkageMethod,
        max_distance: f64,
    ) -> Result<Vec<i64>>;
}

/// Agglomerative hierarchical clustering in degree space.
///
/// Single linkage uses an R-tree radius query and Union-Find (connected
/// components of the "within `max_distance`" graph). The other linkages
/// run the Lance-Williams recurrence over a full distance matrix, which is
/// cubic in the number of points.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgglomerativeClusterer;

/// A point with its index for R-tree queries
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    idx: usize,
    lng: f64,
    lat: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlng = self.lng - point[0];
        let dlat = self.lat - point[1];
        dlng * dlng + dlat * dlat
    }
}

fn single_linkage(points: &[GpsPoint], max_distance: f64) -> Vec<i64> {
    let indexed: Vec<IndexedPoint> = points
        .iter()
        .enumerate()
        .map(|(idx, p)| IndexedPoint {
            idx,
            lng: p.longitude,
            lat: p.latitude,
        })
        .collect();
    let rtree = RTree::bulk_load(indexed);

    let mut uf = UnionFind::new(points.len());
    for (i, p) in points.iter().enumerate() {
        let query = [p.longitude, p.latitude];
        for neighbour in rtree.locate_within_distance(query, max_distance * max_distance) {
            if neighbour.idx > i && planar_distance(p, &points[neighbour.idx]) <= max_distance {
                uf.union(i, neighbour.idx);
            }
        }
    }
    uf.labels()
}

fn lance_williams(points: &[GpsPoint], linkage: LinkageMethod, max_distance: f64) -> Vec<i64> {
    let n = points.len();
    let mut dist = distance_matrix(points, DistanceMetric::Planar);
    let mut active: Vec<usize> = (0..n).collect();
    let mut sizes = vec![1usize; n];
    let mut uf = UnionFind::new(n);

    while active.len() > 1 {
        // Closest active pair; first pair wins ties
        let mut best: Option<(usize, usize, f64)> = None;
        for (pos, &a) in active.iter().enumerate() {
            for &b in &active[pos + 1..] {
                let d = dist[a][b];
                if best.map_or(true, |(_, _, best_d)| d < best_d) {
                    best = Some((a, b, d));
                }
            }
        }

        let Some((a, b, d_ab)) = best else { break };
        if d_ab > max_distance {
            break;
        }

        for &k in &active {
            if k == a || k == b {
                continue;
            }
            let updated =
                linkage.merged_distance(dist[a][k], dist[b][k], d_ab, sizes[a], sizes[b], sizes[k]);
            dist[a][k] = updated;
            dist[k][a] = updated;
        }

        sizes[a] += sizes[b];
        uf.union(a, b);
        active.retain(|&k| k != b);
    }

    uf.labels()
}

impl DestinationClusterer for AgglomerativeClusterer {
    fn assign_clusters(
        &self,
        points: &[GpsPoint],
        linkage: LinkageMethod,
        max_distance: f64,
    ) -> Result<Vec<i64>> {
        if !(max_distance.is_finite() && max_distance > 0.0) {
            return Err(StayError::ConfigError {
                message: format!("max_cluster_distance must be positive, got {}", max_distance),
            });
        }

        let labels = match linkage {
            LinkageMethod::Single => single_linkage(points, max_distance),
            _ => lance_williams(points, linkage, max_distance),
        };

        debug!(
            "[Destinations] {} linkage grouped {} points into {} clusters",
            linkage,
            points.len(),
            labels.iter().max().copied().unwrap_or(0)
        );

        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(offsets: &[f64]) -> Vec<GpsPoint> {
        offsets.iter().map(|&x| GpsPoint::new(0.0, x)).collect()
    }

    #[test]
    fn test_parse_linkage() {
        assert_eq!("single".parse::<LinkageMethod>().unwrap(), LinkageMethod::Single);
        assert_eq!("Ward".parse::<LinkageMethod>().unwrap(), LinkageMethod::Ward);
        assert!("centroid".parse::<LinkageMethod>().is_err());
        assert_eq!(LinkageMethod::Average.to_string(), "average");
    }

    #[test]
    fn test_single_linkage_chains() {
        // Gaps of 1.0 chain together under single linkage
        let points = line(&[0.0, 1.0, 2.0, 3.0, 10.0]);
        let labels = AgglomerativeClusterer
            .assign_clusters(&points, LinkageMethod::Single, 1.0)
            .unwrap();
        assert_eq!(labels, vec![1, 1, 1, 1, 2]);
    }

    #[test]
    fn test_complete_linkage_does_not_chain() {
        let points = line(&[0.0, 1.0, 2.0, 3.0]);
        let labels = AgglomerativeClusterer
            .assign_clusters(&points, LinkageMethod::Complete, 1.5)
            .unwrap();
        // Diameter of any cluster stays within 1.5
        assert_eq!(labels, vec![1, 1, 2, 2]);
    }

    fn cut(linkage: LinkageMethod, max_distance: f64) -> Vec<i64> {
        AgglomerativeClusterer
            .assign_clusters(&line(&[0.0, 1.0, 3.0, 7.0]), linkage, max_distance)
            .unwrap()
    }

    #[test]
    fn test_ward_merge_heights() {
        // {0,1} to {3}: sqrt((2*9 + 2*4 - 1) / 3) = sqrt(25/3) ~ 2.887
        assert_eq!(cut(LinkageMethod::Ward, 3.0), vec![1, 1, 1, 2]);
        assert_eq!(cut(LinkageMethod::Ward, 2.8), vec![1, 1, 2, 3]);
        // {0,1} to {7}: sqrt(169/3) ~ 7.5, {3} to {7}: 4.0
        assert_eq!(cut(LinkageMethod::Ward, 0.9), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_complete_merge_heights() {
        // {0,1} to {3}: 3.0, then {0,1,3} to {7}: 7.0
        assert_eq!(cut(LinkageMethod::Complete, 3.5), vec![1, 1, 1, 2]);
        assert_eq!(cut(LinkageMethod::Complete, 2.9), vec![1, 1, 2, 3]);
        assert_eq!(cut(LinkageMethod::Complete, 7.0), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_average_and_weighted_diverge() {
        // Both put {0,1} to {3} at 2.5
        for linkage in [LinkageMethod::Average, LinkageMethod::Weighted] {
            assert_eq!(cut(linkage, 2.5), vec![1, 1, 1, 2], "linkage {}", linkage);
            assert_eq!(cut(linkage, 2.4), vec![1, 1, 2, 3], "linkage {}", linkage);
        }
        // {0,1,3} to {7}: average (2*6.5 + 4) / 3 ~ 5.667, weighted (6.5 + 4) / 2 = 5.25
        assert_eq!(cut(LinkageMethod::Average, 5.5), vec![1, 1, 1, 2]);
        assert_eq!(cut(LinkageMethod::Weighted, 5.5), vec![1, 1, 1, 1]);
        assert_eq!(cut(LinkageMethod::Weighted, 5.2), vec![1, 1, 1, 2]);
        assert_eq!(cut(LinkageMethod::Average, 5.7), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_lance_williams_single_matches_rtree() {
        let points = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.3, 0.2),
            GpsPoint::new(5.0, 5.0),
            GpsPoint::new(0.1, 0.5),
            GpsPoint::new(5.2, 5.1),
            GpsPoint::new(9.0, 0.0),
        ];
        assert_eq!(
            single_linkage(&points, 0.6),
            lance_williams(&points, LinkageMethod::Single, 0.6)
        );
    }

    #[test]
    fn test_all_linkages_separate_far_groups() {
        let mut points = line(&[0.0, 0.1, 0.2]);
        points.extend(line(&[50.0, 50.1]));
        for linkage in [
            LinkageMethod::Single,
            LinkageMethod::Complete,
            LinkageMethod::Average,
            LinkageMethod::Weighted,
            LinkageMethod::Ward,
        ] {
            let labels = AgglomerativeClusterer
                .assign_clusters(&points, linkage, 1.0)
                .unwrap();
            assert_eq!(labels, vec![1, 1, 1, 2, 2], "linkage {}", linkage);
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(AgglomerativeClusterer
            .assign_clusters(&[], LinkageMethod::Average, 1.0)
            .unwrap()
            .is_empty());
        assert_eq!(
            AgglomerativeClusterer
                .assign_clusters(&line(&[3.0]), LinkageMethod::Ward, 1.0)
                .unwrap(),
            vec![1]
        );
        assert!(matches!(
            AgglomerativeClusterer.assign_clusters(&line(&[3.0]), LinkageMethod::Single, 0.0),
            Err(StayError::ConfigError { .. })
        ));
    }
}
