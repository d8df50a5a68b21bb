use nalgebra::Point3;
use std::collections::HashMap;
use std::f64::consts::PI;

/// Atom name to position lookup for a single residue.
pub type NamedCoords = HashMap<String, Point3<f64>>;

const COS_TOLERANCE: f64 = 1e-12;

/// Signed dihedral angle in radians between planes (a1, a2, a3) and (a2, a3, a4).
///
/// The magnitude follows the IUPAC convention (0 for cis, π for trans) and the
/// sign is taken from the scalar triple product `b1 · (b2 × b3)`. When the two
/// plane normals are numerically parallel the function returns π.
pub fn measure_dihedral(
    a1: &Point3<f64>,
    a2: &Point3<f64>,
    a3: &Point3<f64>,
    a4: &Point3<f64>,
) -> f64 {
    let n1 = (a1 - a2).cross(&(a3 - a2));
    let n2 = (a4 - a3).cross(&(a2 - a3));

    let denom = n1.norm() * n2.norm();
    let cos_angle = if denom > 0.0 {
        n1.dot(&n2) / denom
    } else {
        1.0
    };
    if (cos_angle - 1.0).abs() < COS_TOLERANCE {
        return PI;
    }

    let magnitude = PI - cos_angle.clamp(-1.0, 1.0).acos();
    let b1 = a2 - a1;
    let b2 = a3 - a2;
    let b3 = a4 - a3;
    if b1.dot(&b2.cross(&b3)) < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Wraps an angular difference in degrees into `(-180, 180]`.
pub fn wrap_degrees(delta: f64) -> f64 {
    let wrapped = delta % 360.0;
    if wrapped > 180.0 {
        wrapped - 360.0
    } else if wrapped <= -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

/// One atom of an internal-coordinate definition; `residue` is 0 for the
/// upstream residue of a link and 1 for the downstream one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IcAtom {
    pub residue: usize,
    pub name: &'static str,
}

pub const fn ic(residue: usize, name: &'static str) -> IcAtom {
    IcAtom { residue, name }
}

/// A dihedral fingerprint plus the reference value (degrees) each candidate patch expects.
#[derive(Debug, Clone, Copy)]
pub struct IcMap {
    pub atoms: [IcAtom; 4],
    pub references: &'static [(&'static str, f64)],
}

impl IcMap {
    pub fn reference(&self, candidate: &str) -> Option<f64> {
        self.references
            .iter()
            .find(|(name, _)| *name == candidate)
            .map(|(_, value)| *value)
    }

    /// Measures this dihedral in degrees, or `None` if any atom is absent.
    pub fn measure(&self, residues: [&NamedCoords; 2]) -> Option<f64> {
        let mut points = [Point3::origin(); 4];
        for (slot, atom) in points.iter_mut().zip(self.atoms.iter()) {
            *slot = *residues.get(atom.residue)?.get(atom.name)?;
        }
        Some(measure_dihedral(&points[0], &points[1], &points[2], &points[3]).to_degrees())
    }
}

/// Returns the candidate whose reference point is nearest to `observed` in
/// periodic angular space.
pub fn nearest_reference<'a>(observed: &[f64], candidates: &[(&'a str, Vec<f64>)]) -> Option<&'a str> {
    candidates
        .iter()
        .filter(|(_, reference)| reference.len() == observed.len())
        .map(|(name, reference)| {
            let distance = observed
                .iter()
                .zip(reference)
                .map(|(o, r)| wrap_degrees(o - r).powi(2))
                .sum::<f64>()
                .sqrt();
            (*name, distance)
        })
        .min_by(|(_, d1), (_, d2)| d1.partial_cmp(d2).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name)
}

/// Classifies a two-residue geometry against a set of IC maps.
///
/// The candidate set is taken from the first map; a candidate missing from any
/// later map is not considered. Returns `None` when no map is given or an atom
/// named by a map is absent from its residue.
pub fn ic_reference_closest(residues: [&NamedCoords; 2], maps: &[IcMap]) -> Option<&'static str> {
    let first = maps.first()?;
    let observed = maps
        .iter()
        .map(|map| map.measure(residues))
        .collect::<Option<Vec<f64>>>()?;

    let candidates: Vec<(&'static str, Vec<f64>)> = first
        .references
        .iter()
        .filter_map(|(name, _)| {
            maps.iter()
                .map(|map| map.reference(name))
                .collect::<Option<Vec<f64>>>()
                .map(|point| (*name, point))
        })
        .collect();

    nearest_reference(&observed, &candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn dihedral_points(theta_degrees: f64) -> [Point3<f64>; 4] {
        let theta = theta_degrees.to_radians();
        [
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, theta.cos(), theta.sin()),
        ]
    }

    fn coords_for(theta_degrees: f64) -> (NamedCoords, NamedCoords) {
        let [p1, p2, p3, p4] = dihedral_points(theta_degrees);
        let upstream = NamedCoords::from([("P1".to_string(), p1), ("P2".to_string(), p2)]);
        let downstream = NamedCoords::from([("P3".to_string(), p3), ("P4".to_string(), p4)]);
        (upstream, downstream)
    }

    #[test]
    fn measure_dihedral_recovers_known_angles() {
        for theta in [30.0, 60.0, 90.0, 120.0, 179.0, -45.0, -90.0, -150.0] {
            let [a, b, c, d] = dihedral_points(theta);
            let measured = measure_dihedral(&a, &b, &c, &d).to_degrees();
            assert!((measured - theta).abs() < 1e-6, "expected {theta}, got {measured}");
        }
    }

    #[test]
    fn measure_dihedral_is_pi_for_trans_geometry() {
        let [a, b, c, d] = dihedral_points(180.0);
        assert!((measure_dihedral(&a, &b, &c, &d) - PI).abs() < 1e-6);
    }

    #[test]
    fn measure_dihedral_returns_pi_when_normals_coincide() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(2.0, 0.0, 0.0);
        let d = Point3::new(3.0, 0.0, 0.0);
        assert!((measure_dihedral(&a, &b, &c, &d) - PI).abs() < EPS);
    }

    #[test]
    fn measure_dihedral_is_near_zero_for_cis_geometry() {
        let [a, b, c, d] = dihedral_points(0.5);
        assert!(measure_dihedral(&a, &b, &c, &d).to_degrees().abs() < 1.0);
    }

    #[test]
    fn wrap_degrees_maps_into_half_open_range() {
        assert!((wrap_degrees(-2.0) + 2.0).abs() < EPS);
        assert!((wrap_degrees(268.0) + 92.0).abs() < EPS);
        assert!((wrap_degrees(-268.0) - 92.0).abs() < EPS);
        assert!((wrap_degrees(180.0) - 180.0).abs() < EPS);
        assert!((wrap_degrees(-180.0) - 180.0).abs() < EPS);
        assert!((wrap_degrees(540.0) - 180.0).abs() < EPS);
    }

    #[test]
    fn nearest_reference_respects_periodicity() {
        let candidates = vec![("TRANS", vec![180.0]), ("MINUS", vec![-90.0])];
        assert_eq!(nearest_reference(&[178.0], &candidates), Some("TRANS"));
        assert_eq!(nearest_reference(&[-88.0], &candidates), Some("MINUS"));
        assert_eq!(nearest_reference(&[-179.0], &candidates), Some("TRANS"));
    }

    #[test]
    fn nearest_reference_uses_euclidean_distance_over_axes() {
        let candidates = vec![
            ("AA", vec![60.0, 60.0]),
            ("AB", vec![60.0, 180.0]),
            ("BB", vec![180.0, 180.0]),
        ];
        assert_eq!(nearest_reference(&[55.0, -170.0], &candidates), Some("AB"));
        assert_eq!(nearest_reference(&[-175.0, 175.0], &candidates), Some("BB"));
    }

    const SYNTHETIC_REFS: &[(&str, f64)] = &[("TRANS", 180.0), ("MINUS", -90.0)];
    const SYNTHETIC_MAP: IcMap = IcMap {
        atoms: [ic(0, "P1"), ic(0, "P2"), ic(1, "P3"), ic(1, "P4")],
        references: SYNTHETIC_REFS,
    };

    #[test]
    fn ic_reference_closest_classifies_measured_geometry() {
        let (up, down) = coords_for(178.0);
        assert_eq!(ic_reference_closest([&up, &down], &[SYNTHETIC_MAP]), Some("TRANS"));

        let (up, down) = coords_for(-88.0);
        assert_eq!(ic_reference_closest([&up, &down], &[SYNTHETIC_MAP]), Some("MINUS"));
    }

    #[test]
    fn ic_reference_closest_needs_every_atom() {
        let (mut up, down) = coords_for(178.0);
        up.remove("P1");
        assert_eq!(ic_reference_closest([&up, &down], &[SYNTHETIC_MAP]), None);
        assert_eq!(ic_reference_closest([&up, &down], &[]), None);
    }
}
