//! Transitive dependency resolution: the full set of rules reachable from
//! each declared rule.

use crate::graph::{RuleRef, SourceTree};
use anyhow::anyhow;
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};

/// Per-rule transitive closures, in deterministic order.
pub type RuleDeps = BTreeMap<RuleRef, BTreeSet<RuleRef>>;

/// Computes the closure of every rule in the tree.
pub fn resolve(tree: &SourceTree) -> anyhow::Result<RuleDeps> {
    let mut deps = RuleDeps::new();
    for rref in tree.rule_refs() {
        let closure = closure(tree, &rref)?;
        deps.insert(rref, closure);
    }
    Ok(deps)
}

/// Least fixpoint: seed with the rule itself and the implicit base rule,
/// then union in declared dependencies until a full pass adds nothing.
/// Terminates because the candidate universe is finite and the set only
/// grows.  A reference that resolves to no declared rule is fatal.
fn closure(tree: &SourceTree, start: &RuleRef) -> anyhow::Result<BTreeSet<RuleRef>> {
    let mut set = FxHashSet::default();
    set.insert(start.clone());
    set.insert(RuleRef::base());
    loop {
        let mut added = Vec::new();
        for rref in &set {
            let rule = tree
                .rule(rref)
                .ok_or_else(|| anyhow!("bad rule reference {}", rref))?;
            for dep in &rule.deps {
                if !set.contains(dep) {
                    added.push(dep.clone());
                }
            }
        }
        if added.is_empty() {
            break;
        }
        set.extend(added);
    }
    Ok(set.into_iter().collect())
}
