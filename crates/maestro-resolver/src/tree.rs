//! Text rendering of a resolved graph.

use crate::graph::{DependencyGraph, DependencyNode, NodeId, NodeState};
use std::fmt::Write;

/// Render the visible tree the way `dependency:tree` prints it.
///
/// ```text
/// org.acme:app:jar:1.0
/// +- org.acme:a:jar:1.0:compile
/// |  \- org.acme:c:jar:2.0:compile
/// \- org.acme:b:jar:1.0:compile
///    \- (org.acme:a:jar:1.1:compile - omitted for conflict with 1.0)
/// ```
#[must_use]
pub fn render(graph: &DependencyGraph) -> String {
    let mut out = String::new();
    let root = &graph[graph.root()];
    out.push_str(&root.artifact.coordinate.to_string());
    if let Some(version) = root.version() {
        let _ = write!(out, ":{version}");
    }
    out.push('\n');
    render_children(graph, graph.root(), "", &mut out);
    out
}

fn render_children(graph: &DependencyGraph, id: NodeId, prefix: &str, out: &mut String) {
    let children = graph.children(id);
    for (i, &child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        let node = &graph[child];
        let _ = writeln!(
            out,
            "{prefix}{}{}",
            if last { "\\- " } else { "+- " },
            label(graph, node)
        );
        if node.is_included() {
            let nested = format!("{prefix}{}", if last { "   " } else { "|  " });
            render_children(graph, child, &nested, out);
        }
    }
}

fn label(graph: &DependencyGraph, node: &DependencyNode) -> String {
    let artifact = node.artifact.to_string();
    match node.state {
        NodeState::Included | NodeState::Pending => artifact,
        NodeState::OmittedForCycle => format!("({artifact} - omitted for cycle)"),
        NodeState::Failed => format!("({artifact} - failed)"),
        NodeState::OmittedForConflict => {
            let kept = node.kept.and_then(|id| graph.get(id)).and_then(DependencyNode::version);
            match kept {
                Some(version) if Some(version) == node.version() => {
                    format!("({artifact} - omitted for duplicate)")
                }
                Some(version) => format!("({artifact} - omitted for conflict with {version})"),
                None => format!("({artifact} - omitted for conflict)"),
            }
        }
    }
}
