//! Spatial data structures for neighbourhood queries.
//!
//! - [`Aabb3`] - 3D axis-aligned bounding box
//! - [`Octree`] - 3D spatial partitioning with region and radius queries
//!
//! # Example
//!
//! ```
//! use rhizome_tilemesh_spatial::Octree;
//! use glam::Vec3;
//!
//! let points = [Vec3::ZERO, Vec3::new(0.05, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)];
//! let tree = Octree::from_points(&points);
//!
//! let near = tree.query_radius(Vec3::ZERO, 0.1);
//! assert_eq!(near.len(), 2);
//! ```

use glam::Vec3;

/// Default subdivision depth for [`Octree::from_points`].
pub const DEFAULT_MAX_DEPTH: usize = 8;
/// Default leaf capacity for [`Octree::from_points`].
pub const DEFAULT_LEAF_CAPACITY: usize = 16;

// ============================================================================
// AABB
// ============================================================================

/// 3D axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb3 {
    /// Creates a new AABB from min and max corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates an AABB from center and half-extents.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Computes the bounds of a point set.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self::new(min, max))
    }

    /// Returns the center of the AABB.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the size of the AABB.
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns a copy grown by `margin` on every side.
    pub fn expanded(&self, margin: f32) -> Self {
        Self::new(self.min - Vec3::splat(margin), self.max + Vec3::splat(margin))
    }

    /// Checks if this AABB contains a point.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Checks if this AABB intersects another AABB.
    pub fn intersects(&self, other: &Aabb3) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Returns the eight octant AABBs when subdividing this AABB.
    pub fn octants(&self) -> [Aabb3; 8] {
        let center = self.center();
        std::array::from_fn(|i| {
            let pick = |bit: usize, lo: f32, c: f32, hi: f32| {
                if i & bit == 0 { (lo, c) } else { (c, hi) }
            };
            let (x0, x1) = pick(1, self.min.x, center.x, self.max.x);
            let (y0, y1) = pick(2, self.min.y, center.y, self.max.y);
            let (z0, z1) = pick(4, self.min.z, center.z, self.max.z);
            Aabb3::new(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1))
        })
    }
}

// ============================================================================
// Octree
// ============================================================================

/// A point with associated data stored in an octree.
#[derive(Debug, Clone)]
struct OctreeEntry<T> {
    position: Vec3,
    data: T,
}

/// A node in the octree.
#[derive(Debug)]
enum OctreeNode<T> {
    /// Leaf node containing points.
    Leaf { entries: Vec<OctreeEntry<T>> },
    /// Internal node with eight children.
    Internal { children: Box<[OctreeNode<T>; 8]> },
}

impl<T> OctreeNode<T> {
    fn empty_leaf() -> Self {
        OctreeNode::Leaf {
            entries: Vec::new(),
        }
    }
}

/// An octree for 3D spatial partitioning.
///
/// Efficiently stores and queries points in 3D space by recursively subdividing
/// the space into octants.
#[derive(Debug)]
pub struct Octree<T> {
    root: OctreeNode<T>,
    bounds: Aabb3,
    max_depth: usize,
    max_entries_per_leaf: usize,
}

impl Octree<usize> {
    /// Builds an octree over a point slice, storing each point's index.
    pub fn from_points(points: &[Vec3]) -> Self {
        let bounds = Aabb3::from_points(points)
            .unwrap_or(Aabb3::new(Vec3::ZERO, Vec3::ZERO))
            .expanded(1e-4);
        let mut tree = Octree::new(bounds, DEFAULT_MAX_DEPTH, DEFAULT_LEAF_CAPACITY);
        for (i, p) in points.iter().enumerate() {
            tree.insert(*p, i);
        }
        tree
    }
}

impl<T> Octree<T> {
    /// Creates a new octree with the given bounds and parameters.
    ///
    /// # Arguments
    ///
    /// * `bounds` - The bounding box of the entire octree.
    /// * `max_depth` - Maximum depth of the tree (prevents infinite subdivision).
    /// * `max_entries_per_leaf` - Maximum entries per leaf before subdivision.
    pub fn new(bounds: Aabb3, max_depth: usize, max_entries_per_leaf: usize) -> Self {
        Self {
            root: OctreeNode::empty_leaf(),
            bounds,
            max_depth,
            max_entries_per_leaf,
        }
    }

    /// Returns the bounds of this octree.
    pub fn bounds(&self) -> Aabb3 {
        self.bounds
    }

    /// Inserts a point with associated data into the octree.
    ///
    /// Returns `true` if the point was inserted, `false` if it's outside bounds.
    pub fn insert(&mut self, position: Vec3, data: T) -> bool {
        if !self.bounds.contains_point(position) {
            return false;
        }

        Self::insert_recursive(
            &mut self.root,
            self.bounds,
            OctreeEntry { position, data },
            0,
            self.max_depth,
            self.max_entries_per_leaf,
        );
        true
    }

    fn insert_recursive(
        node: &mut OctreeNode<T>,
        bounds: Aabb3,
        entry: OctreeEntry<T>,
        depth: usize,
        max_depth: usize,
        max_entries: usize,
    ) {
        match node {
            OctreeNode::Leaf { entries } => {
                entries.push(entry);

                // Subdivide if we exceed capacity and haven't reached max depth
                if entries.len() > max_entries && depth < max_depth {
                    let old_entries = std::mem::take(entries);
                    let mut children: [OctreeNode<T>; 8] =
                        std::array::from_fn(|_| OctreeNode::empty_leaf());
                    let octants = bounds.octants();

                    for e in old_entries {
                        let i = Self::octant_index(&octants, e.position);
                        Self::insert_recursive(
                            &mut children[i],
                            octants[i],
                            e,
                            depth + 1,
                            max_depth,
                            max_entries,
                        );
                    }

                    *node = OctreeNode::Internal {
                        children: Box::new(children),
                    };
                }
            }
            OctreeNode::Internal { children } => {
                let octants = bounds.octants();
                let i = Self::octant_index(&octants, entry.position);
                Self::insert_recursive(
                    &mut children[i],
                    octants[i],
                    entry,
                    depth + 1,
                    max_depth,
                    max_entries,
                );
            }
        }
    }

    /// First octant containing the point; octant boundaries are shared, so
    /// the last octant catches anything float rounding lets slip through.
    fn octant_index(octants: &[Aabb3; 8], position: Vec3) -> usize {
        octants
            .iter()
            .position(|o| o.contains_point(position))
            .unwrap_or(7)
    }

    /// Queries all points within the given region.
    ///
    /// Returns an iterator over (position, data) pairs.
    pub fn query_region(&self, region: &Aabb3) -> impl Iterator<Item = (Vec3, &T)> {
        let mut results = Vec::new();
        Self::query_recursive(&self.root, self.bounds, region, &mut results);
        results.into_iter()
    }

    fn query_recursive<'a>(
        node: &'a OctreeNode<T>,
        bounds: Aabb3,
        region: &Aabb3,
        results: &mut Vec<(Vec3, &'a T)>,
    ) {
        if !bounds.intersects(region) {
            return;
        }

        match node {
            OctreeNode::Leaf { entries } => {
                for entry in entries {
                    if region.contains_point(entry.position) {
                        results.push((entry.position, &entry.data));
                    }
                }
            }
            OctreeNode::Internal { children } => {
                let octants = bounds.octants();
                for (i, child) in children.iter().enumerate() {
                    Self::query_recursive(child, octants[i], region, results);
                }
            }
        }
    }

    /// Queries all points within `radius` of `center` (inclusive).
    ///
    /// Returns (position, data, distance) triples in no particular order.
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<(Vec3, &T, f32)> {
        let region = Aabb3::from_center_half_extents(center, Vec3::splat(radius));
        self.query_region(&region)
            .filter_map(|(p, data)| {
                let dist = p.distance(center);
                (dist <= radius).then_some((p, data, dist))
            })
            .collect()
    }

    /// Returns the total number of entries in the tree.
    pub fn len(&self) -> usize {
        Self::count_recursive(&self.root)
    }

    /// Returns `true` if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count_recursive(node: &OctreeNode<T>) -> usize {
        match node {
            OctreeNode::Leaf { entries } => entries.len(),
            OctreeNode::Internal { children } => children.iter().map(Self::count_recursive).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points(n: usize, spacing: f32) -> Vec<Vec3> {
        let mut points = Vec::with_capacity(n * n * n);
        for x in 0..n {
            for y in 0..n {
                for z in 0..n {
                    points.push(Vec3::new(x as f32, y as f32, z as f32) * spacing);
                }
            }
        }
        points
    }

    #[test]
    fn test_aabb_from_points() {
        let bounds = Aabb3::from_points(&[Vec3::new(1.0, -2.0, 0.5), Vec3::new(-1.0, 3.0, 0.0)])
            .unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(Aabb3::from_points(&[]).is_none());
    }

    #[test]
    fn test_octants_cover_bounds() {
        let bounds = Aabb3::new(Vec3::ZERO, Vec3::splat(2.0));
        let octants = bounds.octants();
        assert_eq!(octants[0], Aabb3::new(Vec3::ZERO, Vec3::ONE));
        assert_eq!(octants[7], Aabb3::new(Vec3::ONE, Vec3::splat(2.0)));
        let volume: f32 = octants
            .iter()
            .map(|o| {
                let s = o.size();
                s.x * s.y * s.z
            })
            .sum();
        assert!((volume - 8.0).abs() < 0.001);
    }

    #[test]
    fn test_insert_outside_bounds() {
        let mut tree = Octree::new(Aabb3::new(Vec3::ZERO, Vec3::ONE), 4, 2);
        assert!(tree.insert(Vec3::splat(0.5), 0));
        assert!(!tree.insert(Vec3::splat(2.0), 1));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_from_points_keeps_all() {
        let points = grid_points(6, 0.1);
        let tree = Octree::from_points(&points);
        assert_eq!(tree.len(), points.len());
        assert!(!tree.is_empty());
    }

    #[test]
    fn test_query_radius_matches_brute_force() {
        let points = grid_points(6, 0.1);
        let tree = Octree::from_points(&points);

        for &center in &[Vec3::ZERO, Vec3::splat(0.25), Vec3::new(0.5, 0.1, 0.3)] {
            let radius = 0.15;
            let mut found: Vec<usize> = tree
                .query_radius(center, radius)
                .into_iter()
                .map(|(_, i, _)| *i)
                .collect();
            found.sort_unstable();

            let expected: Vec<usize> = points
                .iter()
                .enumerate()
                .filter(|(_, p)| p.distance(center) <= radius)
                .map(|(i, _)| i)
                .collect();

            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_query_radius_includes_self() {
        let points = vec![Vec3::ZERO, Vec3::X];
        let tree = Octree::from_points(&points);
        let hits = tree.query_radius(Vec3::ZERO, 0.5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].2, 0.0);
    }

    #[test]
    fn test_coincident_points() {
        let points = vec![Vec3::ONE; 40];
        let tree = Octree::from_points(&points);
        assert_eq!(tree.len(), 40);
        assert_eq!(tree.query_radius(Vec3::ONE, 0.01).len(), 40);
    }
}
