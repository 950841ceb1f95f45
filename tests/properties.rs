//! Property tests for tier scaling, traversal and the condition language.
mod common;
use common::*;
use proptest::prelude::*;
use sigilflow::prelude::*;

proptest! {
    #[test]
    fn prop_tier_lookup_clamps(values in prop::collection::vec(-500.0f64..500.0, 1..6), tier in -10i32..20) {
        let mut params = TierParameterConfig::new();
        params.set_values("power", values.clone());
        let index = (tier.max(1) as usize).min(values.len()) - 1;
        prop_assert_eq!(params.get_value("power", tier), values[index]);
    }

    #[test]
    fn prop_cooldown_shrinks_within_bounds(
        base in 0.0f64..600.0,
        max_tier in 1i32..10,
        tier in 1i32..12,
    ) {
        let current = ActivationScaling::cooldown(base, tier, max_tier);
        let next = ActivationScaling::cooldown(base, tier + 1, max_tier);
        prop_assert!(next <= current + 0.01);
        prop_assert!(current <= base + 0.01);
        prop_assert!(current >= base * 0.2 - 0.01);
    }

    #[test]
    fn prop_chance_never_exceeds_certainty(base in 0.0f64..100.0, tier in -3i32..50) {
        let chance = ActivationScaling::chance(base, tier);
        prop_assert!(chance <= 100.0);
        prop_assert!(chance >= base.min(100.0));
    }

    #[test]
    fn prop_linear_graph_runs_every_effect(count in 0usize..25) {
        let h = Harness::new();
        let names: Vec<String> = (0..count).map(|i| format!("FX{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let graph = shared(linear_graph(&refs));

        let ctx = h.executor.execute_with_context(&graph, h.context()).expect("start node exists");
        prop_assert!(ctx.error().is_none());
        prop_assert_eq!(ctx.effects_executed() as usize, count);
        prop_assert_eq!(h.effects.names(), names);
    }

    #[test]
    fn prop_numeric_comparison_matches_f64(a in -10_000i32..10_000, b in -10_000i32..10_000) {
        let evaluator = ExpressionEvaluator::new();
        let ctx = FlowContext::new(TriggerMetadata::default().with_event("a", a));
        let (x, y) = (a as f64, b as f64);
        prop_assert_eq!(evaluator.evaluate(&format!("{{a}} > {}", b), &ctx), Ok(x > y));
        prop_assert_eq!(evaluator.evaluate(&format!("{{a}} <= {}", b), &ctx), Ok(x <= y));
        prop_assert_eq!(evaluator.evaluate(&format!("{{a}} == {}", b), &ctx), Ok(a == b));
    }

    #[test]
    fn prop_written_graph_reads_back_equal(
        effects in prop::collection::vec("[A-Z]{1,8}", 0..8),
        amounts in prop::collection::vec(-50i64..50, 8),
    ) {
        let refs: Vec<&str> = effects.iter().map(String::as_str).collect();
        let mut graph = linear_graph(&refs);
        for (i, amount) in amounts.iter().enumerate().take(effects.len()) {
            if let Some(node) = graph.node_mut(&format!("e{}", i + 1)) {
                node.set_param("amount", *amount);
            }
        }
        let written = FlowSerializer::graph_to_value(&graph).expect("graph encodes");
        let reread = FlowSerializer::graph_from_value(&written, "other").expect("graph decodes");
        prop_assert_eq!(reread, graph);
    }
}
