//! Recursive haystack search for Anyfind.
//!
//! The search walks the haystack through decoder layers:
//! 1. Scan for every needle literally (memmem)
//! 2. If the layer budget is spent, give up on this branch
//! 3. Ask each decoder for candidate decoded buffers, dropping candidates
//!    already explored at this layer depth or deeper
//! 4. Recurse into the candidates, racing everything: the first branch to
//!    surface a needle wins and its decoder chain is returned
//!
//! The race is cooperative: branches interleave at await points on a
//! single task. Losing branches are not cancelled; their results are
//! discarded once a winner exists.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use memchr::memmem;

use crate::needle::Needle;
use crate::transform::Transformer;

/// Read-only state shared by every branch of one `find_value_in` call.
pub(crate) struct SearchContext<'a> {
    pub needles: &'a [Needle],
    pub decoders: &'a [Arc<dyn Transformer>],
    /// Heuristic lower bound on interesting encoded lengths; `0` = none.
    pub min_len: usize,
    /// Fingerprint of every candidate explored so far, keyed to the
    /// highest layer budget it was explored with. Re-exploring is only
    /// worthwhile with a strictly higher budget.
    pub seen_at_layer: Mutex<HashMap<u32, u32>>,
    pub verbose: bool,
}

/// Resolves to the first non-null result, or `None` once every branch has
/// settled null. Later results of settled races are discarded.
async fn race_first_hit<T, F>(futures: impl IntoIterator<Item = F>) -> Option<T>
where
    F: Future<Output = Option<T>>,
{
    let mut racing: FuturesUnordered<F> = futures.into_iter().collect();
    while let Some(result) = racing.next().await {
        if result.is_some() {
            return result;
        }
    }
    None
}

/// One decoder's branch: extract candidates, filter them through the
/// seen-map, recurse into the survivors and prepend the decoder identity
/// to whichever recursion wins.
async fn decode_branch<'a>(
    ctx: &'a SearchContext<'a>,
    decoder: &'a dyn Transformer,
    haystack: &'a [u8],
    layer: u32,
) -> Option<Vec<String>> {
    let candidates = decoder.extract_decode(haystack, ctx.min_len).await?;

    let accepted: Vec<Vec<u8>> = {
        let mut seen = ctx
            .seen_at_layer
            .lock()
            .expect("a search branch panicked while holding the seen-map");
        candidates
            .into_iter()
            .filter(|candidate| {
                let fingerprint = crc32fast::hash(candidate);
                match seen.get(&fingerprint) {
                    Some(&explored) if explored >= layer => false,
                    _ => {
                        seen.insert(fingerprint, layer);
                        true
                    }
                }
            })
            .collect()
    };

    if ctx.verbose && !accepted.is_empty() {
        eprintln!(
            "{}: recursing into {} candidate(s) at layer {}",
            decoder.id(),
            accepted.len(),
            layer
        );
    }

    let chain = race_first_hit(accepted.into_iter().map(|candidate| async move {
        find_impl(ctx, &candidate, layer - 1).await
    }))
    .await?;

    let mut full = Vec::with_capacity(chain.len() + 1);
    full.push(decoder.id());
    full.extend(chain);
    Some(full)
}

/// The recursive search. Returns the decoder chain (outermost first) that
/// exposes a needle, `Some(vec![])` for a literal hit, or `None`.
pub(crate) fn find_impl<'a>(
    ctx: &'a SearchContext<'a>,
    haystack: &'a [u8],
    layer: u32,
) -> BoxFuture<'a, Option<Vec<String>>> {
    Box::pin(async move {
        for needle in ctx.needles {
            if memmem::find(haystack, &needle.buffer).is_some() {
                return Some(needle.chain.clone());
            }
        }
        if layer == 0 {
            return None;
        }

        race_first_hit(
            ctx.decoders
                .iter()
                .map(|decoder| decode_branch(ctx, decoder.as_ref(), haystack, layer)),
        )
        .await
    })
}
