use crate::compute::ExecutionReport;
use crate::function::FunctionKind;
use crate::graph::{DependencyGraph, NodeId};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the upstream tree of `target` with each node's final state, so the
/// input that poisoned a failed node can be found at a glance.
///
/// ```text
/// FAILURE TRACE for node 'calc on Security~C':
/// --------------------------------------------------
/// [L1] calc on Security~C [FAILED]
/// `--[L2] calc on Security~B [FAILED]
///    `--[L3] calc on Security~A [FAILED] <- origin
/// ```
pub fn format_failure_trace(graph: &DependencyGraph, report: &ExecutionReport, target: NodeId) -> String {
    let mut tracer = Tracer { graph, report, visited_at_level: HashMap::new(), output: String::new() };

    match graph.node(target) {
        Some(node) => {
            let _ = writeln!(tracer.output, "FAILURE TRACE for node '{}':", node);
            let _ = writeln!(tracer.output, "--------------------------------------------------");
            tracer.trace_node(target, 1, "");
        }
        None => {
            let _ = writeln!(tracer.output, "Error: Invalid Node ID {:?}", target);
        }
    }
    tracer.output
}

struct Tracer<'a> {
    graph: &'a DependencyGraph,
    report: &'a ExecutionReport,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node_id: NodeId, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(&node_id) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(node_id, level);

        let node = &self.graph[node_id];
        let live = if node.kind() == FunctionKind::LiveDataSourcing { " (live data)" } else { "" };
        let origin = if self.is_origin(node_id) { " <- origin" } else { "" };
        let _ = writeln!(self.output, "{}[L{}] {}{} [{}]{}", prefix, level, node, live, self.state(node_id), origin);

        let inputs: Vec<NodeId> = self.graph.inputs(node_id).collect();
        self.recurse_children(prefix, &inputs, level);
    }

    fn recurse_children(&mut self, prefix: &str, children: &[NodeId], level: usize) {
        let stem = build_child_stem(prefix);
        for (i, &child) in children.iter().enumerate() {
            let connector = if i == children.len() - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_node(child, level + 1, &full_prefix);
        }
    }

    fn state(&self, id: NodeId) -> &'static str {
        if self.report.is_failed(id) {
            "FAILED"
        } else if self.report.is_executed(id) {
            "OK"
        } else {
            "NOT RUN"
        }
    }

    /// A failed node none of whose inputs failed: it failed on its own.
    fn is_origin(&self, id: NodeId) -> bool {
        self.report.is_failed(id) && !self.graph.inputs(id).any(|input| self.report.is_failed(input))
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}
