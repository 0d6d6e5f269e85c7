//! The bean selection algorithm.
//!
//! One implementation backs every entry point (facade, container surface,
//! factory-side lookup); nothing else in the crate re-implements candidate
//! selection. Step ordering is load-bearing: qualifier filtering runs before
//! the alternative split, which runs before the priority tie-break.

use std::sync::Arc;

use crate::bean::BeanDef;
use crate::error::{OdiError, OdiResult};
use crate::qualifier::QualifierSet;

/// Selects exactly one definition for the required type.
///
/// 1. No candidates: `Unsatisfied`.
/// 2. Exactly one candidate: returned as-is, without qualifier validation
///    (the trivial case skips filtering).
/// 3. Filter by declared-qualifier matching; zero left is `Unsatisfied`,
///    one left wins.
/// 4. Non-alternatives are preferred: alternatives only compete with each
///    other, and only when no qualifier-matching non-alternative exists.
/// 5. Within the surviving subset the unique highest priority wins.
/// 6. Anything else is `Ambiguous`, listing every remaining candidate.
pub(crate) fn resolve(
    type_name: &'static str,
    candidates: &[Arc<BeanDef>],
    requested: &QualifierSet,
) -> OdiResult<Arc<BeanDef>> {
    match candidates {
        [] => Err(OdiError::Unsatisfied(type_name)),
        [only] => Ok(only.clone()),
        _ => {
            let matched: Vec<Arc<BeanDef>> = candidates
                .iter()
                .filter(|bean| bean.qualifiers().satisfies(requested))
                .cloned()
                .collect();
            resolve_among(type_name, matched)
        }
    }
}

/// Steps 4-6 over an already qualifier-filtered set.
///
/// Also backs the container's `resolve(beans)` surface, where the caller
/// supplies the filtered set directly.
pub(crate) fn resolve_among(
    type_name: &'static str,
    mut matched: Vec<Arc<BeanDef>>,
) -> OdiResult<Arc<BeanDef>> {
    match matched.len() {
        0 => return Err(OdiError::Unsatisfied(type_name)),
        1 => return Ok(matched.swap_remove(0)),
        _ => {}
    }

    let (alternatives, primaries): (Vec<_>, Vec<_>) =
        matched.into_iter().partition(|bean| bean.is_alternative());
    let mut pool = if primaries.is_empty() {
        alternatives
    } else {
        primaries
    };
    if pool.len() == 1 {
        return Ok(pool.swap_remove(0));
    }

    let top = pool.iter().map(|bean| bean.priority()).max().unwrap_or(0);
    let mut winners: Vec<Arc<BeanDef>> = pool
        .into_iter()
        .filter(|bean| bean.priority() == top)
        .collect();
    if winners.len() == 1 {
        return Ok(winners.swap_remove(0));
    }

    Err(OdiError::Ambiguous(
        type_name,
        winners.iter().map(|bean| bean.description()).collect(),
    ))
}
