/// Floating point type used for every coordinate and solver value.
pub type Real = f64;

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[Real]) -> Option<Real> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<Real>() / values.len() as Real)
    }
}
