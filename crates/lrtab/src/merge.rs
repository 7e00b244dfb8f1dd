//! Merging of states that share the same LR(0) core (LALR(1) construction).

use crate::{
    collection::{Automaton, State, StateID},
    item::{ItemKind, LRItemCore},
    types::Map,
};
use std::collections::BTreeSet;

/// Merge the states of a canonical LR(1) collection sharing the same core.
///
/// Merged states are numbered in order of their first member, so the
/// initial state stays state 0. The returned automaton records, for each
/// state, the canonical states it was built from.
pub fn merge_cores(canonical: &Automaton) -> Automaton {
    let span = tracing::debug_span!("merge_cores");
    let _entered = span.enter();

    debug_assert_eq!(canonical.kind(), ItemKind::LR1);

    // Group the canonical states by their cores.
    let mut groups: Map<BTreeSet<LRItemCore>, Vec<StateID>> = Map::default();
    for (id, state) in canonical.states() {
        groups.entry(state.items().cores()).or_default().push(id);
    }

    let mut mapping = vec![StateID::START; canonical.len()];
    let mut states = Vec::with_capacity(groups.len());
    for (i, members) in groups.values().enumerate() {
        let merged_id = StateID::from_raw(i as u32);
        let mut items = canonical.state(members[0]).items().clone();
        for member in &members[1..] {
            items.merge_from(canonical.state(*member).items());
        }
        for member in members {
            mapping[member.index()] = merged_id;
        }
        states.push(State {
            items,
            edges: Map::default(),
            merged_from: members.clone(),
        });
    }

    // The transitions only depend on the cores, so the induced edges of the
    // members of a group agree with each other.
    for (from, symbol, to) in canonical.transitions() {
        let from = mapping[from.index()];
        let to = mapping[to.index()];
        let previous = states[from.index()].edges.insert(symbol, to);
        debug_assert!(
            previous.map_or(true, |previous| previous == to),
            "inconsistent transitions after merging"
        );
    }

    tracing::debug!(
        "merged {} canonical states into {} states",
        canonical.len(),
        states.len()
    );

    Automaton {
        kind: ItemKind::LR1,
        states,
    }
}
