use super::{DerivedFeatures, FeatureError};
use crate::ml::FeatureVector;

/// Look up every declared name in `derived`, in order.
///
/// A name with no derived value is an error; nothing is zero-filled.
pub fn assemble<S: AsRef<str>>(
    derived: &DerivedFeatures,
    names: &[S],
) -> Result<FeatureVector, FeatureError> {
    let mut values = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let value = derived
            .get(name)
            .ok_or_else(|| FeatureError::MissingFeature(name.to_string()))?;
        values.push(value);
    }

    FeatureVector::new(
        values,
        names.iter().map(|n| n.as_ref().to_string()).collect(),
    )
}
