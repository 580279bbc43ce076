use crate::food::FoodSource;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Food source center stored in the R*-tree, keyed by its index in the world's list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FoodLocation {
    pub index: usize,
    pub position: [f64; 2],
}

impl RTreeObject for FoodLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for FoodLocation {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Build an R*-tree over food source centers via bulk_load (O(n log n)).
///
/// The tree only stores positions; it stays valid while sources are taken
/// from, and must be rebuilt whenever sources are added or removed.
pub fn build_index(sources: &[FoodSource]) -> RTree<FoodLocation> {
    RTree::bulk_load(
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| FoodLocation {
                index,
                position: source.position,
            })
            .collect(),
    )
}

/// Index of the nearest non-depleted source whose pickup radius contains `position`.
///
/// Walks centers nearest-first and stops once no remaining source could reach,
/// given the largest radius in `sources`.
pub fn nearest_available(
    tree: &RTree<FoodLocation>,
    sources: &[FoodSource],
    position: [f64; 2],
) -> Option<usize> {
    let max_radius = sources.iter().map(|s| s.radius).fold(0.0f64, f64::max);
    let max_radius_sq = max_radius * max_radius;
    for location in tree.nearest_neighbor_iter(&position) {
        if location.distance_2(&position) > max_radius_sq {
            break;
        }
        let Some(source) = sources.get(location.index) else {
            continue;
        };
        if !source.is_depleted() && source.in_pickup_range(position) {
            return Some(location.index);
        }
    }
    None
}
