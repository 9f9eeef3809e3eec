//! End-to-end fits through the façade, on generated data with known
//! ground truth.

use causal_core::{CausalConfig, DataMode, Dataset, GraphSearch, Matrix, ScoreType};
use causal_core::{Edge, FitError};
use causal_engine::{export, CausalChange, FitState};
use causal_gen::{gen_example_context, gen_example_continuous};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Undirected edge-set recall of the estimate against the truth.
fn skeleton_recall(estimated: &[Edge], truth: &[Edge]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let hit = truth
        .iter()
        .filter(|&&(a, b)| {
            estimated.contains(&(a, b)) || estimated.contains(&(b, a))
        })
        .count();
    hit as f64 / truth.len() as f64
}

#[test]
fn default_fit_recovers_most_of_the_skeleton() {
    init_tracing();
    let (data, truths) = gen_example_continuous(5, 3_000, 42);
    let mut cc = CausalChange::new(CausalConfig {
        seed: 42,
        ..Default::default()
    });
    let g_hat = cc.fit(&data).unwrap();

    assert_eq!(cc.state(), FitState::Done);
    assert!(g_hat.is_acyclic());
    assert!(g_hat.n_edges() <= 10, "5 nodes allow at most 10 edges");
    let outcome = cc.outcome().unwrap();
    assert!(outcome.evaluations <= cc.config().eval_budget);
    assert!(
        skeleton_recall(&g_hat.edges(), &truths.true_g.edges()) >= 0.5,
        "estimated {:?}, truth {:?}",
        g_hat.edges(),
        truths.true_g.edges()
    );
}

#[test]
fn fit_is_deterministic_given_the_seed() {
    init_tracing();
    let (data, _) = gen_example_continuous(5, 800, 7);
    let config = CausalConfig {
        seed: 11,
        ..Default::default()
    };

    let mut first = CausalChange::new(config.clone());
    let mut second = CausalChange::new(config);
    let g1 = first.fit(&data).unwrap();
    let g2 = second.fit(&data).unwrap();

    assert_eq!(g1.edges(), g2.edges());
    assert_eq!(
        first.outcome().unwrap().score.to_bits(),
        second.outcome().unwrap().score.to_bits()
    );
}

#[test]
fn greedy_and_spline_variants_fit() {
    init_tracing();
    let (data, _) = gen_example_continuous(4, 600, 3);
    for (score_type, graph_search) in [
        (ScoreType::Baseline, GraphSearch::Greedy),
        (ScoreType::Spline, GraphSearch::Topic),
    ] {
        let mut cc = CausalChange::new(CausalConfig {
            score_type,
            graph_search,
            seed: 3,
            ..Default::default()
        });
        let g_hat = cc.fit(&data).unwrap();
        assert!(g_hat.is_acyclic());
        assert_eq!(cc.state(), FitState::Done);
    }
}

#[test]
fn contexts_mode_fits_across_a_mechanism_change() {
    init_tracing();
    let (data, truths) = gen_example_context(5, 3, 600, 42);
    let mut cc = CausalChange::new(CausalConfig {
        data_mode: DataMode::Contexts,
        seed: 42,
        disagreement_penalty: 5.0,
        ..Default::default()
    });
    let g_hat = cc.fit(&data).unwrap();

    assert_eq!(cc.state(), FitState::Done);
    assert!(g_hat.is_acyclic());
    assert!(truths.broken_edge.is_some());
    // Flags are sorted and only reference usable contexts.
    let flags = cc.disagreements();
    assert!(flags.windows(2).all(|w| w[0] <= w[1]));
    assert!(flags.iter().all(|d| d.ctx < data.n_contexts()));
}

#[test]
fn mode_mismatch_is_rejected_before_any_scoring() {
    let (data, _) = gen_example_continuous(4, 100, 1);
    let mut cc = CausalChange::new(CausalConfig {
        data_mode: DataMode::Contexts,
        ..Default::default()
    });
    let err = cc.fit(&data).unwrap_err();
    assert!(matches!(err, FitError::DataModeMismatch { .. }));
    assert_eq!(cc.state(), FitState::Failed);
    assert!(cc.outcome().is_none());
}

#[test]
fn ragged_context_shapes_are_rejected() {
    let wide = Matrix::from_rows((0..40).map(|i| vec![i as f64; 3]).collect());
    let narrow = Matrix::from_rows((0..40).map(|i| vec![i as f64; 2]).collect());
    let mut cc = CausalChange::new(CausalConfig {
        data_mode: DataMode::Contexts,
        ..Default::default()
    });
    let err = cc
        .fit(&Dataset::contexts(vec![wide, narrow]))
        .unwrap_err();
    assert!(
        matches!(err, FitError::ShapeMismatch { context: 1, expected: 3, found: 2 }),
        "got {err}"
    );
}

#[test]
fn tiny_budget_still_returns_a_valid_structure() {
    init_tracing();
    let (data, _) = gen_example_continuous(5, 400, 9);
    let mut cc = CausalChange::new(CausalConfig {
        eval_budget: 7,
        seed: 9,
        ..Default::default()
    });
    let g_hat = cc.fit(&data).unwrap();

    assert!(g_hat.is_acyclic());
    let outcome = cc.outcome().unwrap();
    assert!(outcome.evaluations <= 7);
    assert!(outcome.budget_exhausted);
}

#[test]
fn huge_finite_values_do_not_fail_the_fit() {
    init_tracing();
    // Finite input whose spline basis overflows; affected candidates
    // are excluded and the fit still completes.
    let rows: Vec<Vec<f64>> = (0..50)
        .map(|i| {
            (0..5)
                .map(|j| 1e130 * (1.0 + (i * 5 + j) as f64 * 1e-3))
                .collect()
        })
        .collect();
    let data = Dataset::continuous(Matrix::from_rows(rows));
    let mut cc = CausalChange::new(CausalConfig {
        score_type: ScoreType::Spline,
        ..Default::default()
    });
    let g_hat = cc.fit(&data).unwrap();

    assert_eq!(cc.state(), FitState::Done);
    assert!(g_hat.is_acyclic());
}

#[test]
fn too_few_rows_fail_the_fit() {
    let data = Dataset::continuous(Matrix::from_rows(vec![
        vec![0.1, 0.4, 0.2],
        vec![0.3, 0.2, 0.9],
    ]));
    let mut cc = CausalChange::new(CausalConfig::default());
    let err = cc.fit(&data).unwrap_err();
    assert!(matches!(err, FitError::Score(_)), "got {err}");
    assert_eq!(cc.state(), FitState::Failed);
}

#[test]
fn export_round_trips_through_files() {
    let (data, truths) = gen_example_continuous(4, 500, 5);
    let mut cc = CausalChange::new(CausalConfig {
        seed: 5,
        ..Default::default()
    });
    let g_hat = cc.fit(&data).unwrap();

    let dir = std::env::temp_dir().join("causal-engine-export-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("run.json");
    export::write_json_graphs(&path, &g_hat, Some(&truths.true_g), cc.config(), "e2e")
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(value["run_label"], "e2e");
    assert_eq!(
        value["estimated"]["edges"].as_array().unwrap().len(),
        g_hat.n_edges()
    );
    assert_eq!(
        value["truth"]["edges"].as_array().unwrap().len(),
        truths.true_g.n_edges()
    );
    std::fs::remove_file(&path).ok();
}
