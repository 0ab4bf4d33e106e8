use std::collections::HashSet;

use super::types::Transfer;

/// Combine the outgoing- and incoming-queried transfer sets.
///
/// A transaction shows up in both queries when the wallet sends to itself,
/// and one hash can carry several assets. Entries are keyed by
/// (hash, asset or "", category), which is the per-wallet-and-chain part of
/// the stored transfer identity. The first occurrence of a key wins. Output
/// is ordered by block number, newest first; ties keep fetch order.
pub fn merge(outgoing: Vec<Transfer>, incoming: Vec<Transfer>) -> Vec<Transfer> {
    let mut seen = HashSet::with_capacity(outgoing.len() + incoming.len());
    let mut merged: Vec<Transfer> = outgoing
        .into_iter()
        .chain(incoming)
        .filter(|t| seen.insert(t.key()))
        .collect();

    // stable: equal blocks keep their fetch order
    merged.sort_by(|a, b| b.block_number.cmp(&a.block_number));
    merged
}
