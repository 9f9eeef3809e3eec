//! JSON export of fit results, for notebooks and plotting scripts
//! downstream. The layout is stable: node names in column order, edges
//! ascending, the full configuration echoed so a result file is
//! self-describing.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use causal_core::{CausalConfig, Dag, Edge};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct GraphJson<'a> {
    nodes: &'a [String],
    edges: Vec<Edge>,
}

impl<'a> GraphJson<'a> {
    fn from_dag(dag: &'a Dag) -> Self {
        Self {
            nodes: dag.node_names(),
            // edges() is already sorted ascending
            edges: dag.edges(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportJson<'a> {
    run_label: &'a str,
    config: &'a CausalConfig,
    estimated: GraphJson<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    truth: Option<GraphJson<'a>>,
}

/// Serialize an estimated graph (and, when available, the ground truth
/// it is compared against) to a JSON value.
pub fn to_json_graphs(
    g_hat: &Dag,
    truth: Option<&Dag>,
    config: &CausalConfig,
    run_label: &str,
) -> serde_json::Value {
    let export = ExportJson {
        run_label,
        config,
        estimated: GraphJson::from_dag(g_hat),
        truth: truth.map(GraphJson::from_dag),
    };
    // All fields serialize infallibly: plain structs, no maps with
    // non-string keys.
    serde_json::to_value(&export).unwrap_or(serde_json::Value::Null)
}

/// Write the export JSON, pretty-printed, to `path`.
pub fn write_json_graphs(
    path: &Path,
    g_hat: &Dag,
    truth: Option<&Dag>,
    config: &CausalConfig,
    run_label: &str,
) -> io::Result<()> {
    let value = to_json_graphs(g_hat, truth, config, run_label);
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &value).map_err(io::Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_contains_sorted_edges_and_config() {
        let mut g = Dag::new(3);
        g.add_edge(1, 2).unwrap();
        g.add_edge(0, 2).unwrap();
        let value = to_json_graphs(&g, None, &CausalConfig::default(), "unit");

        assert_eq!(value["run_label"], "unit");
        assert_eq!(value["config"]["score_type"], "baseline");
        assert_eq!(value["estimated"]["nodes"][0], "x0");
        let edges = value["estimated"]["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0][0], 0);
        assert_eq!(edges[0][1], 2);
        assert!(value.get("truth").is_none());
    }

    #[test]
    fn truth_graph_is_included_when_given() {
        let mut g_hat = Dag::new(2);
        g_hat.add_edge(0, 1).unwrap();
        let truth = g_hat.clone();
        let value = to_json_graphs(&g_hat, Some(&truth), &CausalConfig::default(), "demo");
        assert_eq!(value["truth"]["edges"][0][0], 0);
    }
}
