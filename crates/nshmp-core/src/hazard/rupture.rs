use crate::domain::Location;
use crate::numerics::min_horizontal_distance_km;
use serde::{Deserialize, Serialize};

/// Evenly gridded rupture surface stored row by row, rows running down dip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuptureSurface {
    rows: usize,
    columns: usize,
    points: Vec<Location>,
}

impl RuptureSurface {
    /// `None` unless `points` fills a non-empty `rows x columns` grid.
    pub fn new(rows: usize, columns: usize, points: Vec<Location>) -> Option<Self> {
        if rows == 0 || columns == 0 || points.len() != rows * columns {
            return None;
        }
        Some(Self {
            rows,
            columns,
            points,
        })
    }

    pub fn point(location: Location) -> Self {
        Self {
            rows: 1,
            columns: 1,
            points: vec![location],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn location(&self, row: usize, column: usize) -> &Location {
        &self.points[row * self.columns + column]
    }

    pub fn points(&self) -> &[Location] {
        &self.points
    }

    /// Grid nodes on the outer edge: first column, last row, last column and
    /// first row.
    pub fn perimeter(&self) -> impl Iterator<Item = &Location> + '_ {
        let last_row = self.rows - 1;
        let last_column = self.columns - 1;
        (0..self.rows)
            .map(move |row| self.location(row, 0))
            .chain((0..self.columns).map(move |column| self.location(last_row, column)))
            .chain((0..self.rows).map(move |row| self.location(row, last_column)))
            .chain((0..self.columns).map(move |column| self.location(0, column)))
    }

    /// Closest horizontal approach of the surface edge to `site`, in km.
    pub fn perimeter_distance_km(&self, site: &Location) -> f64 {
        min_horizontal_distance_km(site, self.perimeter()).unwrap_or(f64::INFINITY)
    }

    pub fn min_distance_km(&self, site: &Location) -> f64 {
        min_horizontal_distance_km(site, &self.points).unwrap_or(f64::INFINITY)
    }
}

/// One earthquake realization with its probability of occurrence in the
/// forecast window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbEqkRupture {
    pub magnitude: f64,
    pub rake: f64,
    pub probability: f64,
    pub surface: RuptureSurface,
}

#[cfg(test)]
mod tests {
    use super::RuptureSurface;
    use crate::domain::Location;
    use crate::numerics::horizontal_distance_km;

    fn grid() -> RuptureSurface {
        let points = (0..3)
            .flat_map(|row| {
                (0..4).map(move |column| {
                    Location::new(row as f64 * 0.1, column as f64 * 0.1, row as f64 * 5.0)
                })
            })
            .collect();
        RuptureSurface::new(3, 4, points).expect("3 x 4 grid")
    }

    #[test]
    fn perimeter_visits_every_edge_node() {
        let surface = grid();
        assert_eq!(surface.perimeter().count(), 2 * 3 + 2 * 4);
        assert!(surface.perimeter().all(|location| {
            location.latitude == 0.0
                || location.latitude == 0.2
                || location.longitude == 0.0
                || location.longitude.to_bits() == (3.0_f64 * 0.1).to_bits()
        }));
    }

    #[test]
    fn perimeter_distance_ignores_interior_nodes() {
        let surface = grid();
        let site = *surface.location(1, 1);
        let to_edge = surface.perimeter_distance_km(&site);
        assert!(to_edge > 0.0);
        assert_eq!(surface.min_distance_km(&site), 0.0);
        let expected = horizontal_distance_km(&site, surface.location(0, 1));
        assert!(to_edge <= expected + 1.0e-9);
    }

    #[test]
    fn malformed_grid_is_rejected() {
        assert!(RuptureSurface::new(2, 2, vec![Location::new(0.0, 0.0, 0.0)]).is_none());
        assert!(RuptureSurface::new(0, 1, Vec::new()).is_none());
        let point = RuptureSurface::point(Location::new(1.0, 2.0, 3.0));
        assert_eq!(point.perimeter().count(), 4);
    }
}
