//! Property tests: for any seed and budget, both strategies return an
//! acyclic graph and never exceed the evaluation budget.

use std::sync::Arc;

use proptest::prelude::*;

use causal_context::SingleContext;
use causal_gen::gen_example_continuous;
use causal_score::BaselineScore;
use causal_search::{EvalBudget, GreedySearch, OrderSearch, SearchStrategy};

fn context_for(seed: u64) -> SingleContext {
    let (data, _) = gen_example_continuous(4, 80, seed);
    SingleContext::new(Arc::new(BaselineScore::new(data.matrices())))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn order_search_acyclic_within_budget(
        data_seed in 0u64..200,
        search_seed in 0u64..50,
        limit in 1usize..300,
    ) {
        let ctx = context_for(data_seed);
        let mut budget = EvalBudget::new(limit);
        let outcome = OrderSearch::new(search_seed, 3)
            .run(&ctx, 4, &mut budget)
            .unwrap();
        prop_assert!(outcome.dag.is_acyclic());
        prop_assert!(outcome.evaluations <= limit);
    }

    #[test]
    fn greedy_search_acyclic_within_budget(
        data_seed in 0u64..200,
        limit in 1usize..300,
    ) {
        let ctx = context_for(data_seed);
        let mut budget = EvalBudget::new(limit);
        let outcome = GreedySearch::new(3).run(&ctx, 4, &mut budget).unwrap();
        prop_assert!(outcome.dag.is_acyclic());
        prop_assert!(outcome.evaluations <= limit);
    }
}
