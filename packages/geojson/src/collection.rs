//! Feature collection assembly.

use crate::{Feature, FeatureCollection};

/// Folds normalization results into a collection, dropping failures.
///
/// Order follows the input; the result is never null, only empty.
pub fn assemble<I>(features: I) -> FeatureCollection
where
    I: IntoIterator<Item = Option<Feature>>,
{
    features.into_iter().flatten().collect()
}
