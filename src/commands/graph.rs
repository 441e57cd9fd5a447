use anyhow::{Context, Result};

use crate::client::KnowledgeBase;
use crate::model::{Backlink, Graph};

use super::page_line;

/// Print every page that links to `id`.
#[tracing::instrument(skip(kb))]
pub async fn backlinks<K: KnowledgeBase>(kb: &K, id: &str) -> Result<()> {
    let links = kb
        .backlinks(id)
        .await
        .with_context(|| format!("Failed to fetch backlinks for page {}", id))?;
    print!("{}", render_backlinks(&links));
    Ok(())
}

/// Print the link graph as a node list followed by `source -> target` edges.
#[tracing::instrument(skip(kb))]
pub async fn graph<K: KnowledgeBase>(kb: &K, page_id: Option<String>, depth: u32) -> Result<()> {
    let graph = kb
        .graph(page_id, depth)
        .await
        .context("Failed to fetch page graph")?;
    print!("{}", render_graph(&graph));
    Ok(())
}

fn render_backlinks(links: &[Backlink]) -> String {
    if links.is_empty() {
        return "No backlinks.\n".to_string();
    }
    links
        .iter()
        .map(|l| format!("{}\n", page_line(&l.id, l.icon.as_deref(), &l.title)))
        .collect()
}

fn render_graph(graph: &Graph) -> String {
    let mut out = format!(
        "{} node(s), {} edge(s)\n",
        graph.nodes.len(),
        graph.edges.len()
    );
    for node in &graph.nodes {
        out.push_str(&format!(
            "{} ({} link(s))\n",
            page_line(&node.id, node.icon.as_deref(), &node.label),
            node.link_count
        ));
    }
    for edge in &graph.edges {
        out.push_str(&format!("{} -> {}\n", edge.source, edge.target));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DEFAULT_GRAPH_DEPTH, MockKnowledgeBase};
    use crate::model::{GraphEdge, GraphNode};
    use mockall::predicate::eq;

    #[test]
    fn test_render_backlinks() {
        assert_eq!(render_backlinks(&[]), "No backlinks.\n");
        let links = vec![Backlink {
            id: "p2".to_string(),
            title: "Linker".to_string(),
            icon: None,
        }];
        assert_eq!(render_backlinks(&links), "[p2] Linker\n");
    }

    #[test]
    fn test_render_graph() {
        let graph = Graph {
            nodes: vec![GraphNode {
                id: "a".to_string(),
                label: "A".to_string(),
                icon: None,
                link_count: 1,
            }],
            edges: vec![GraphEdge {
                source: "a".to_string(),
                target: "b".to_string(),
            }],
        };
        assert_eq!(
            render_graph(&graph),
            "1 node(s), 1 edge(s)\n[a] A (1 link(s))\na -> b\n"
        );
    }

    #[tokio::test]
    async fn test_graph_forwards_arguments() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_graph()
            .with(eq(None::<String>), eq(DEFAULT_GRAPH_DEPTH))
            .times(1)
            .returning(|_, _| Ok(Graph::default()));

        graph(&kb, None, DEFAULT_GRAPH_DEPTH).await.unwrap();
    }

    #[tokio::test]
    async fn test_backlinks_forwards_id() {
        let mut kb = MockKnowledgeBase::new();
        kb.expect_backlinks()
            .with(eq("p1"))
            .times(1)
            .returning(|_| Ok(vec![]));

        backlinks(&kb, "p1").await.unwrap();
    }
}
