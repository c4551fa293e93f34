use std::collections::HashMap;

use petgraph::graph::DiGraph;
use petgraph::visit::Topo;

use alloy::primitives::TxHash;

/// Reconciliation stages. Each stage only assumes state its dependencies
/// have already converged, so ordering comes from the dependency graph
/// rather than a hand-maintained list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Core contract management: manage and replace batches.
    BaseInfra,
    /// Oracle parameter activation, grouped per oracle contract.
    Oracles,
    /// Lending parameter activation for mismatched tokens.
    Tokens,
    /// Strategy enablement and per-token strategy activation.
    Strategies,
    /// One-time tranche slot setup on the lending contract.
    TrancheSlot,
    /// Retirement of unrecognized managed contracts. Opt-in.
    Cleanup,
}

pub const ALL_STAGES: [Stage; 6] = [
    Stage::BaseInfra,
    Stage::Oracles,
    Stage::Tokens,
    Stage::Strategies,
    Stage::TrancheSlot,
    Stage::Cleanup,
];

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::BaseInfra => "base-infra",
            Stage::Oracles => "oracles",
            Stage::Tokens => "tokens",
            Stage::Strategies => "strategies",
            Stage::TrancheSlot => "tranche-slot",
            Stage::Cleanup => "cleanup",
        }
    }

    pub fn deps(&self) -> &'static [Stage] {
        match self {
            Stage::BaseInfra => &[],
            Stage::Oracles => &[Stage::BaseInfra],
            Stage::Tokens => &[Stage::Oracles],
            Stage::Strategies => &[Stage::Tokens],
            Stage::TrancheSlot => &[Stage::Tokens],
            Stage::Cleanup => &[Stage::Strategies, Stage::TrancheSlot],
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Topological execution order over the stage graph. Cleanup only enters
/// the graph when requested. Ties resolve in declaration order because
/// nodes are inserted in that order.
pub fn execution_order(include_cleanup: bool) -> Vec<Stage> {
    let mut graph = DiGraph::<Stage, ()>::new();
    let mut indices: HashMap<Stage, petgraph::graph::NodeIndex> = HashMap::new();

    for stage in ALL_STAGES {
        if stage == Stage::Cleanup && !include_cleanup {
            continue;
        }
        let idx = graph.add_node(stage);
        indices.insert(stage, idx);
    }

    for stage in ALL_STAGES {
        let Some(&to) = indices.get(&stage) else {
            continue;
        };
        for dep in stage.deps() {
            if let Some(&from) = indices.get(dep) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut topo = Topo::new(&graph);
    let mut order = Vec::new();
    while let Some(idx) = topo.next(&graph) {
        order.push(graph[idx]);
    }
    order
}

/// What a stage did during one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// On-chain state already matched; nothing submitted.
    Current,
    /// Units deployed and executed, one tx hash each.
    Executed(Vec<TxHash>),
    /// Work exists but could not be executed with the available
    /// authority. It is persisted; later stages must not run.
    Deferred,
    /// Plan-only mode: work was computed and printed, nothing sent.
    Planned,
}

impl StageOutcome {
    pub fn halts_pass(&self) -> bool {
        matches!(self, StageOutcome::Deferred)
    }
}

impl std::fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageOutcome::Current => write!(f, "current"),
            StageOutcome::Executed(hashes) => write!(f, "executed ({} units)", hashes.len()),
            StageOutcome::Deferred => write!(f, "deferred"),
            StageOutcome::Planned => write!(f, "planned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_respects_dependencies() {
        let order = execution_order(true);
        assert_eq!(order.len(), ALL_STAGES.len());
        let pos: HashMap<Stage, usize> =
            order.iter().enumerate().map(|(i, &s)| (s, i)).collect();
        for stage in ALL_STAGES {
            for dep in stage.deps() {
                assert!(pos[dep] < pos[&stage], "{dep} must precede {stage}");
            }
        }
    }

    #[test]
    fn cleanup_runs_last_when_included() {
        let order = execution_order(true);
        assert_eq!(order.last(), Some(&Stage::Cleanup));
    }

    #[test]
    fn cleanup_is_opt_in() {
        let order = execution_order(false);
        assert!(!order.contains(&Stage::Cleanup));
        assert_eq!(order.len(), ALL_STAGES.len() - 1);
    }

    #[test]
    fn base_infra_runs_first() {
        assert_eq!(execution_order(false).first(), Some(&Stage::BaseInfra));
    }

    #[test]
    fn only_deferral_halts() {
        assert!(StageOutcome::Deferred.halts_pass());
        assert!(!StageOutcome::Current.halts_pass());
        assert!(!StageOutcome::Executed(vec![]).halts_pass());
        assert!(!StageOutcome::Planned.halts_pass());
    }
}
