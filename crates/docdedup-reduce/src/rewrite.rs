//! Reference rewriter: redirects every link to a duplicate onto its canonical survivor.

use crate::dedupe::ReplacementMap;
use crate::error::DedupError;
use crate::object::{Dictionary, Object};
use crate::store::ObjectStore;
use tracing::debug;

/// Rewrite references inside one object in place. Returns the number of
/// reference fields changed.
///
/// Descends only into owned array elements and dictionary values; a
/// reference is replaced, never followed.
pub fn rewrite_object(object: &mut Object, map: &ReplacementMap) -> usize {
    match object {
        Object::Reference(reference) => match map.resolve(reference) {
            Some(canonical) => {
                *reference = canonical;
                1
            }
            None => 0,
        },
        Object::Array(items) => items.iter_mut().map(|item| rewrite_object(item, map)).sum(),
        Object::Dictionary(dict) => rewrite_dictionary(dict, map),
        Object::Stream(stream) => rewrite_dictionary(&mut stream.dict, map),
        _ => 0,
    }
}

/// Rewrite references held in dictionary values. Keys are never touched.
pub fn rewrite_dictionary(dict: &mut Dictionary, map: &ReplacementMap) -> usize {
    dict.iter_mut().map(|(_, value)| rewrite_object(value, map)).sum()
}

/// Rewrite every object in the store, including the duplicates that are
/// about to be removed. Performs no deletions.
pub fn apply(store: &mut dyn ObjectStore, map: &ReplacementMap) -> Result<usize, DedupError> {
    if map.is_empty() {
        return Ok(0);
    }
    let references: Vec<_> = store
        .enumerate()
        .filter(|(_, object)| object.is_some())
        .map(|(reference, _)| reference)
        .collect();

    let mut rewritten = 0;
    for reference in references {
        let object = store
            .get_mut(reference)
            .ok_or_else(|| DedupError::Store(format!("object {} vanished during rewrite", reference)))?;
        rewritten += rewrite_object(object, map);
    }
    debug!(rewritten, "Reference rewrite complete");
    Ok(rewritten)
}
