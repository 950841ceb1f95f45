//! Node behavior, node validation and graph editing.
mod common;
use common::*;
use sigilflow::graph::GraphEditError;
use sigilflow::prelude::*;
use std::sync::Arc;

struct Named(&'static str);

impl Actor for Named {
    fn name(&self) -> &str {
        self.0
    }

    fn send_diagnostic(&self, _message: &str) {}
}

/// `START -> node`, with `node` left as the only work.
fn single(node: FlowNode) -> Arc<FlowGraph> {
    let id = node.id.clone();
    shared(
        FlowGraph::new("single")
            .with_start("start")
            .with_node(FlowNode::start("start").with_connection("next", id))
            .with_node(node),
    )
}

#[cfg(test)]
mod node_type_tests {
    use super::*;

    #[test]
    fn test_type_names_are_case_insensitive() {
        assert_eq!(NodeType::from_name("skip_cooldown"), Some(NodeType::SkipCooldown));
        assert_eq!(NodeType::from_name(" Effect "), Some(NodeType::Effect));
        assert_eq!(NodeType::from_name("TELEPORT"), None);
        assert_eq!(NodeType::SkipCooldown.to_string(), "SKIP_COOLDOWN");
    }

    #[test]
    fn test_deprecated_types() {
        let deprecated: Vec<NodeType> = NodeType::ALL
            .into_iter()
            .filter(|t| t.is_deprecated())
            .collect();
        assert_eq!(deprecated, vec![NodeType::Random, NodeType::Target, NodeType::Math]);
    }

    #[test]
    fn test_output_ports_per_type() {
        assert_eq!(FlowNode::condition("c", "x").output_ports(), vec!["yes", "no"]);
        assert_eq!(FlowNode::new("l", NodeType::Loop).output_ports(), vec!["body", "done"]);
        assert!(FlowNode::new("s", NodeType::SkipCooldown).output_ports().is_empty());
        assert_eq!(FlowNode::new("d", NodeType::Delay).output_ports(), vec!["next"]);

        let three = FlowNode::new("r", NodeType::Random).with_param("pathCount", 3);
        assert_eq!(three.output_ports(), vec!["path1", "path2", "path3"]);
        let too_many = FlowNode::new("r", NodeType::Random).with_param("pathCount", 9);
        assert_eq!(too_many.output_ports().len(), 4);
    }

    #[test]
    fn test_effect_name_renames_node() {
        let mut node = FlowNode::new("e", NodeType::Effect);
        assert_eq!(node.display_name, "Effect");
        node.set_effect(Some("IGNITE".to_string()));
        assert_eq!(node.display_name, "IGNITE");
        assert_eq!(node.effect_name(), Some("IGNITE"));
        assert_eq!(node.default_display_name(), "IGNITE");

        let mut delay = FlowNode::new("d", NodeType::Delay);
        delay.set_effect(Some("IGNITE".to_string()));
        assert_eq!(delay.effect_name(), None);
        assert_eq!(delay.display_name, "Delay");
    }

    #[test]
    fn test_typed_param_accessors() {
        let node = FlowNode::new("n", NodeType::Variable)
            .with_param("count", "4")
            .with_param("ratio", 0.5)
            .with_param("flag", "TRUE")
            .with_param("label", 7);
        assert_eq!(node.int_param("count", 0), 4);
        assert_eq!(node.float_param("ratio", 0.0), 0.5);
        assert!(node.bool_param("flag", false));
        assert_eq!(node.string_param("label", ""), "7");
        assert_eq!(node.float_param("missing", 1.5), 1.5);
    }

    #[test]
    fn test_deep_copy_is_independent() {
        let original = FlowNode::effect("e", "DAMAGE")
            .with_param("amount", 5)
            .with_connection("next", "x");
        let mut copy = original.deep_copy();
        copy.set_param("amount", 9);
        copy.set_connection("next", None);

        assert_eq!(original.param("amount"), Some(&ParamValue::Int(5)));
        assert_eq!(original.connection("next"), Some("x"));
        assert_eq!(copy.connection("next"), None);
    }
}

#[cfg(test)]
mod node_behavior_tests {
    use super::*;

    #[test]
    fn test_effect_params_are_resolved_and_filtered() {
        let h = Harness::new();
        let graph = single(
            FlowNode::effect("hit", "DAMAGE")
                .with_param("amount", "{damage}")
                .with_param("label", "{unknown}")
                .with_param("chance", 100)
                .with_param("storeAs", "landed"),
        );

        let ctx = h
            .executor
            .execute_with_context(&graph, h.context_with(TriggerMetadata::new(1).with_event("damage", 12)))
            .expect("start node");

        let calls = h.effects.calls();
        assert_eq!(calls.len(), 1);
        let params = &calls[0].params;
        assert_eq!(params.get("amount"), Some(&ParamValue::Int(12)));
        assert_eq!(params.get("label"), Some(&ParamValue::Text("{unknown}".into())));
        assert!(params.get("chance").is_none());
        assert!(params.get("storeAs").is_none());
        assert_eq!(ctx.variable("landed"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn test_effect_that_does_not_fire_is_not_counted() {
        let h = Harness::new();
        let graph = single(FlowNode::effect("hit", "NOOP").with_param("storeAs", "landed"));

        let ctx = h
            .executor
            .execute_with_context(&graph, h.context())
            .expect("start node");
        assert_eq!(ctx.effects_executed(), 0);
        assert_eq!(ctx.variable("landed"), Some(&ParamValue::Bool(false)));
    }

    #[test]
    fn test_zero_chance_effect_is_skipped() {
        let h = Harness::new();
        let graph = shared(
            FlowGraph::new("odds")
                .with_start("start")
                .with_node(FlowNode::start("start").with_connection("next", "never"))
                .with_node(
                    FlowNode::effect("never", "DAMAGE")
                        .with_param("chance", 0)
                        .with_connection("next", "always"),
                )
                .with_node(FlowNode::effect("always", "HEAL").with_param("chance", "{odds}")),
        );

        let ctx = h.context_with(TriggerMetadata::new(1).with_event("odds", 100));
        assert!(h.executor.execute(&graph, ctx));
        assert_eq!(h.effects.names(), vec!["HEAL"]);
    }

    #[test]
    fn test_effect_without_name_passes_through() {
        let h = Harness::new();
        let graph = shared(
            FlowGraph::new("blank")
                .with_start("start")
                .with_node(FlowNode::start("start").with_connection("next", "blank"))
                .with_node(FlowNode::new("blank", NodeType::Effect).with_connection("next", "hit"))
                .with_node(FlowNode::effect("hit", "DAMAGE")),
        );
        assert!(h.executor.execute(&graph, h.context()));
        assert_eq!(h.effects.names(), vec!["DAMAGE"]);
    }

    #[test]
    fn test_variable_operations_chain() {
        let h = Harness::new();
        let op = |id: &str, operation: &str, value: ParamValue, next: Option<&str>| {
            let node = FlowNode::new(id, NodeType::Variable)
                .with_param("name", "total")
                .with_param("operation", operation)
                .with_param("value", value);
            match next {
                Some(next) => node.with_connection("next", next),
                None => node,
            }
        };
        let graph = shared(
            FlowGraph::new("vars")
                .with_start("start")
                .with_node(FlowNode::start("start").with_connection("next", "set"))
                .with_node(op("set", "SET", 5.into(), Some("add")))
                .with_node(op("add", "ADD", "{bonus}".into(), Some("mul")))
                .with_node(op("mul", "multiply", 2.into(), Some("div")))
                .with_node(op("div", "DIVIDE", 0.into(), Some("sub")))
                .with_node(op("sub", "SUBTRACT", 0.5.into(), Some("report")))
                .with_node(FlowNode::effect("report", "REPORT").with_param("value", "$total")),
        );

        let ctx = h
            .executor
            .execute_with_context(&graph, h.context_with(TriggerMetadata::new(1).with_event("bonus", 3)))
            .expect("start node");

        assert_eq!(ctx.variable_f64("total", 0.0), 15.5);
        let calls = h.effects.calls();
        assert_eq!(calls[0].params.get("value"), Some(&ParamValue::Float(15.5)));
    }

    #[test]
    fn test_skip_cooldown_ends_branch() {
        let h = Harness::new();
        let graph = shared(
            FlowGraph::new("skip")
                .with_start("start")
                .with_node(FlowNode::start("start").with_connection("next", "skip"))
                .with_node(FlowNode::new("skip", NodeType::SkipCooldown).with_connection("next", "hit"))
                .with_node(FlowNode::effect("hit", "DAMAGE")),
        );

        let ctx = h
            .executor
            .execute_with_context(&graph, h.context())
            .expect("start node");
        assert!(ctx.skip_cooldown());
        assert_eq!(h.effects.count(), 0);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_random_follows_only_weighted_path() {
        let h = Harness::new();
        let graph = shared(
            FlowGraph::new("dice")
                .with_start("start")
                .with_node(FlowNode::start("start").with_connection("next", "roll"))
                .with_node(
                    FlowNode::new("roll", NodeType::Random)
                        .with_param("weight1", 0)
                        .with_param("weight2", 1)
                        .with_connection("path1", "left")
                        .with_connection("path2", "right"),
                )
                .with_node(FlowNode::effect("left", "LEFT"))
                .with_node(FlowNode::effect("right", "RIGHT")),
        );

        for _ in 0..20 {
            assert!(h.executor.execute(&graph, h.context()));
        }
        assert!(h.effects.names().iter().all(|name| name == "RIGHT"));
        assert_eq!(h.effects.count(), 20);
    }

    #[test]
    fn test_random_with_overflowing_weights_takes_first_path() {
        let h = Harness::new();
        let graph = shared(
            FlowGraph::new("huge")
                .with_start("start")
                .with_node(FlowNode::start("start").with_connection("next", "roll"))
                .with_node(
                    FlowNode::new("roll", NodeType::Random)
                        .with_param("weight1", 1e308)
                        .with_param("weight2", 1e308)
                        .with_connection("path1", "left")
                        .with_connection("path2", "right"),
                )
                .with_node(FlowNode::effect("left", "LEFT"))
                .with_node(FlowNode::effect("right", "RIGHT")),
        );

        let ctx = h.executor.execute_with_context(&graph, h.context()).expect("start node");
        assert!(ctx.error().is_none());
        assert_eq!(h.effects.names(), vec!["LEFT"]);
    }

    #[test]
    fn test_math_random_with_nan_bound_does_not_roll() {
        let h = Harness::new();
        let graph = single(
            FlowNode::new("calc", NodeType::Math)
                .with_param("left", "NaN")
                .with_param("right", 5)
                .with_param("operation", "RANDOM")
                .with_param("result", "roll"),
        );
        let ctx = h.executor.execute_with_context(&graph, h.context()).expect("start node");
        assert!(ctx.error().is_none());
        assert_eq!(ctx.variable_f64("roll", -1.0), 0.0);
    }

    #[test]
    fn test_nan_chance_counts_as_unset() {
        let h = Harness::new();
        let graph = single(FlowNode::effect("hit", "DAMAGE").with_param("chance", f64::NAN));
        for _ in 0..10 {
            assert!(h.executor.execute(&graph, h.context()));
        }
        assert_eq!(h.effects.count(), 10);
    }

    #[test]
    fn test_target_switches_to_victim() {
        let h = Harness::new();
        let graph = single(FlowNode::new("aim", NodeType::Target).with_param("targetType", "victim"));
        let ctx = h.context().with_victim(Arc::new(Named("zombie")));
        assert_eq!(ctx.target().map(|t| t.name().to_string()), Some("tester".to_string()));

        let ctx = h.executor.execute_with_context(&graph, ctx).expect("start node");
        assert_eq!(ctx.target().map(|t| t.name().to_string()), Some("zombie".to_string()));
    }

    #[test]
    fn test_math_writes_result_variable() {
        let h = Harness::new();
        let graph = single(
            FlowNode::new("calc", NodeType::Math)
                .with_param("left", "{hits}")
                .with_param("right", 3)
                .with_param("operation", "modulo")
                .with_param("result", "rem"),
        );
        let ctx = h
            .executor
            .execute_with_context(&graph, h.context_with(TriggerMetadata::new(1).with_event("hits", 10)))
            .expect("start node");
        assert_eq!(ctx.variable_f64("rem", -1.0), 1.0);
    }
}

#[cfg(test)]
mod node_validation_tests {
    use super::*;

    fn connected(node: FlowNode) -> FlowNode {
        let ports = node.output_ports();
        ports
            .into_iter()
            .fold(node, |node, port| node.with_connection(port, "elsewhere"))
    }

    #[test]
    fn test_unconfigured_nodes() {
        let effect = connected(FlowNode::new("e", NodeType::Effect));
        assert_eq!(effect.validate(), vec!["Effect type not configured"]);

        let condition = connected(FlowNode::new("c", NodeType::Condition));
        assert_eq!(condition.validate(), vec!["Condition expression not configured"]);

        let variable = connected(FlowNode::new("v", NodeType::Variable).with_param("name", " "));
        assert_eq!(variable.validate(), vec!["Variable name not configured"]);
    }

    #[test]
    fn test_delay_duration_must_be_positive() {
        let zero = connected(FlowNode::new("d", NodeType::Delay).with_param("duration", 0));
        assert_eq!(zero.validate(), vec!["Duration must be greater than 0"]);

        let templated = connected(FlowNode::new("d", NodeType::Delay).with_param("duration", "{secs}"));
        assert!(templated.is_valid());
    }

    #[test]
    fn test_loop_configuration() {
        let while_loop = connected(FlowNode::new("l", NodeType::Loop).with_param("type", "WHILE"));
        assert_eq!(while_loop.validate(), vec!["While loop requires a condition"]);

        let zero = connected(FlowNode::new("l", NodeType::Loop).with_param("count", 0));
        assert_eq!(zero.validate(), vec!["Loop count must be at least 1"]);

        let default_count = connected(FlowNode::new("l", NodeType::Loop));
        assert!(default_count.is_valid());
    }

    #[test]
    fn test_random_weights() {
        let negative = connected(
            FlowNode::new("r", NodeType::Random)
                .with_param("weight1", -1)
                .with_param("weight2", 0),
        );
        let errors = negative.validate();
        assert!(errors.contains(&"Path weights cannot be negative".to_string()));
        assert!(errors.contains(&"Total path weight must be greater than 0".to_string()));

        let overflowing = connected(
            FlowNode::new("r", NodeType::Random)
                .with_param("weight1", 1e308)
                .with_param("weight2", 1e308),
        );
        assert_eq!(overflowing.validate(), vec!["Path weights must be finite"]);

        let bad_count = connected(FlowNode::new("r", NodeType::Random).with_param("pathCount", 7));
        assert_eq!(bad_count.validate(), vec!["Path count must be between 2 and 4"]);
    }

    #[test]
    fn test_math_and_target_checks() {
        let math = connected(FlowNode::new("m", NodeType::Math).with_param("result", "2fast"));
        assert_eq!(math.validate(), vec!["Result variable name must be a valid identifier"]);

        let marked = connected(FlowNode::new("t", NodeType::Target).with_param("targetType", "MARKED"));
        assert_eq!(marked.validate(), vec!["Marked target requires a mark name"]);
    }

    #[test]
    fn test_every_unconnected_port_is_reported() {
        let node = FlowNode::condition("c", "x > 1").with_connection("yes", "a");
        assert_eq!(node.validate(), vec!["Output 'no' is not connected"]);
        assert!(FlowNode::new("s", NodeType::SkipCooldown).is_valid());
    }
}

#[cfg(test)]
mod graph_tests {
    use super::*;

    #[test]
    fn test_connect_checks_target_and_port() {
        let mut graph = linear_graph(&["DAMAGE"]);
        assert_eq!(
            graph.connect("start", "next", "ghost"),
            Err(GraphEditError::UnknownNode("ghost".to_string()))
        );
        assert_eq!(
            graph.connect("start", "yes", "e1"),
            Err(GraphEditError::UnknownPort {
                node_id: "start".to_string(),
                port: "yes".to_string()
            })
        );
        graph.add_node(FlowNode::effect("e2", "HEAL"));
        graph.connect("e1", "next", "e2").expect("valid connection");
        assert_eq!(graph.node("e1").and_then(|n| n.connection("next")), Some("e2"));
        assert_eq!(graph.disconnect("e1", "next"), Some("e2".to_string()));
    }

    #[test]
    fn test_remove_node_strips_references() {
        let mut graph = linear_graph(&["A", "B"]);
        assert_eq!(graph.incoming("e2"), vec!["e1"]);

        graph.remove_node("e2").expect("node exists");
        assert!(graph.node("e1").and_then(|n| n.connection("next")).is_none());

        graph.remove_node("start").expect("node exists");
        assert!(graph.start_node_id.is_none());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_reachability_and_validation() {
        let graph = linear_graph(&["A"]).with_node(FlowNode::effect("island", "B"));
        let reachable = graph.reachable_from_start();
        assert!(reachable.contains("e1"));
        assert!(!reachable.contains("island"));

        let errors = graph.validate();
        assert!(errors.contains(&"B (island): Node is not reachable from start".to_string()));
        assert!(errors.contains(&"A (e1): Output 'next' is not connected".to_string()));
    }

    #[test]
    fn test_missing_start_and_dangling_connection() {
        let mut graph = FlowGraph::new("empty");
        assert_eq!(graph.validate(), vec!["Flow has no start node"]);

        graph = graph
            .with_start("start")
            .with_node(FlowNode::start("start").with_connection("next", "ghost"));
        assert_eq!(
            graph.validate(),
            vec!["Start (start): Output 'next' connects to missing node 'ghost'"]
        );

        let dangling = FlowGraph::new("dangling").with_start("nope");
        assert_eq!(dangling.validate(), vec!["Start node 'nope' does not exist"]);
    }

    #[test]
    fn test_graph_deep_copy_is_independent() {
        let original = linear_graph(&["A"]);
        let mut copy = original.deep_copy();
        copy.node_mut("e1").expect("node").set_param("amount", 3);
        copy.name = Some("Copy".to_string());

        assert!(original.node("e1").and_then(|n| n.param("amount")).is_none());
        assert_eq!(original.display_name(), "linear");
        assert_eq!(copy.display_name(), "Copy");
    }
}
