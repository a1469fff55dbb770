//! Euclidean face-descriptor comparison.

use votekiosk_types::FaceDescriptor;

use crate::FaceMatcher;

/// Distance below which two descriptors are taken to be the same face.
pub const DEFAULT_FACE_TOLERANCE: f64 = 0.6;

/// Matches when any enrolled descriptor is within `tolerance` of the
/// captured one. Descriptors of a different dimension never match.
#[derive(Clone, Copy, Debug)]
pub struct EuclideanFaceMatcher {
    tolerance: f64,
}

impl EuclideanFaceMatcher {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

impl Default for EuclideanFaceMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_FACE_TOLERANCE)
    }
}

impl FaceMatcher for EuclideanFaceMatcher {
    fn matches(&self, known: &[FaceDescriptor], candidate: &FaceDescriptor) -> bool {
        known
            .iter()
            .filter_map(|k| k.distance(candidate))
            .any(|d| d <= self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_descriptor_within_tolerance_matches() {
        let matcher = EuclideanFaceMatcher::default();
        let known = vec![
            FaceDescriptor::new(vec![5.0, 5.0]),
            FaceDescriptor::new(vec![0.0, 0.0]),
        ];
        assert!(matcher.matches(&known, &FaceDescriptor::new(vec![0.3, 0.4])));
        assert!(!matcher.matches(&known, &FaceDescriptor::new(vec![1.0, 1.0])));
    }

    #[test]
    fn dimension_mismatch_never_matches() {
        let matcher = EuclideanFaceMatcher::new(100.0);
        let known = vec![FaceDescriptor::new(vec![0.0; 128])];
        assert!(!matcher.matches(&known, &FaceDescriptor::new(vec![0.0; 64])));
    }
}
