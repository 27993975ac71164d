//! Geofence matching.
//!
//! A point is inside an incident zone when the sum of the absolute latitude
//! and longitude deltas is at most the incident's `radius_m`. That is an L1
//! ("diamond") test in raw coordinate degrees, not a geodesic distance, and
//! it must stay that way: subscribers observe exactly this boundary.

use crate::{incident::Incident, location::Point};

/// L1 distance between `point` and the incident centre, in degrees.
pub fn l1_distance(incident: &Incident, point: Point) -> f64 {
  (incident.latitude - point.latitude).abs()
    + (incident.longitude - point.longitude).abs()
}

/// Whether `point` falls inside `incident`. Inactive incidents never match.
pub fn contains(incident: &Incident, point: Point) -> bool {
  incident.active && l1_distance(incident, point) <= incident.radius_m as f64
}

/// Ids of every incident containing `point`, in the order the slice is given.
///
/// Each incident is visited once, so the result has no duplicates. An empty
/// result is a normal outcome, not an error.
pub fn matching_incidents(point: Point, incidents: &[Incident]) -> Vec<i64> {
  incidents
    .iter()
    .filter(|incident| contains(incident, point))
    .map(|incident| incident.id)
    .collect()
}
