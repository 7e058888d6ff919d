use std::collections::{BTreeSet, HashMap, HashSet};

use proptest::prelude::*;
use taskforge::dag::TaskGraph;
use taskforge::errors::GraphError;
use taskforge_test_utils::tasks::noop_task;

/// A random acyclic graph: task `i` may only depend on tasks `0..i`.
/// Registration order is shuffled so it differs from the index order.
#[derive(Debug, Clone)]
struct Dag {
    deps: Vec<BTreeSet<usize>>,
    order: Vec<usize>,
    roots: Vec<usize>,
}

fn name(i: usize) -> String {
    format!("t{i}")
}

fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Dag> {
    (1..=max_tasks).prop_flat_map(|n| {
        let deps = proptest::collection::vec(proptest::collection::vec(any::<usize>(), 0..4), n);
        let order = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        let roots = proptest::collection::vec(0..n, 1..4);
        (deps, order, roots).prop_map(|(raw, order, roots)| Dag {
            deps: raw
                .into_iter()
                .enumerate()
                .map(|(i, ds)| if i == 0 { BTreeSet::new() } else { ds.into_iter().map(|d| d % i).collect() })
                .collect(),
            order,
            roots,
        })
    })
}

fn build(dag: &Dag) -> TaskGraph {
    let mut graph = TaskGraph::new();
    for &i in &dag.order {
        let deps: Vec<String> = dag.deps[i].iter().map(|&d| name(d)).collect();
        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
        graph.register(&name(i), &deps, noop_task()).unwrap();
    }
    graph
}

fn closure(dag: &Dag) -> HashSet<usize> {
    let mut seen = HashSet::new();
    let mut stack: Vec<usize> = dag.roots.clone();
    while let Some(i) = stack.pop() {
        if seen.insert(i) {
            stack.extend(dag.deps[i].iter().copied());
        }
    }
    seen
}

fn longest_path(dag: &Dag, i: usize, memo: &mut HashMap<usize, usize>) -> usize {
    if let Some(&d) = memo.get(&i) {
        return d;
    }
    let depth = dag.deps[i]
        .iter()
        .map(|&d| longest_path(dag, d, memo) + 1)
        .max()
        .unwrap_or(0);
    memo.insert(i, depth);
    depth
}

proptest! {
    #[test]
    fn layering_is_longest_path_and_strict(dag in dag_strategy(12)) {
        let graph = build(&dag);
        prop_assert!(graph.validate().is_ok());

        let roots: Vec<String> = dag.roots.iter().map(|&r| name(r)).collect();
        let plan = graph.resolve_closure(&roots).unwrap();

        let expected = closure(&dag);
        let planned: HashSet<String> = plan.tasks().map(str::to_string).collect();
        prop_assert_eq!(planned, expected.iter().map(|&i| name(i)).collect::<HashSet<_>>());

        let mut memo = HashMap::new();
        for &i in &expected {
            let stage = plan.stage_of(&name(i)).unwrap();
            prop_assert_eq!(stage, longest_path(&dag, i, &mut memo));
            for &d in &dag.deps[i] {
                prop_assert!(plan.stage_of(&name(d)).unwrap() < stage);
            }
        }

        for stage in plan.stages() {
            prop_assert!(!stage.is_empty());
            let positions: Vec<usize> = stage.iter().map(|t| graph.index_of(t).unwrap()).collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]), "stage not in registration order: {:?}", stage);
        }
    }

    #[test]
    fn cycle_names_every_member_in_dependency_order(ring in 1usize..6, extra in dag_strategy(5)) {
        let mut graph = TaskGraph::new();
        for i in 0..ring {
            let next = format!("r{}", (i + 1) % ring);
            graph.register(&format!("r{i}"), &[next.as_str()], noop_task()).unwrap();
        }
        // Acyclic tasks hanging off the ring.
        for &i in &extra.order {
            let mut deps: Vec<String> = extra.deps[i].iter().map(|&d| name(d)).collect();
            deps.push("r0".to_string());
            let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
            graph.register(&name(i), &deps, noop_task()).unwrap();
        }

        let Err(GraphError::Cycle(cycle)) = graph.validate() else {
            return Err(TestCaseError::fail("expected a cycle"));
        };

        prop_assert_eq!(cycle.len(), ring);
        let mut members = cycle.clone();
        members.sort();
        let mut ring_names: Vec<String> = (0..ring).map(|i| format!("r{i}")).collect();
        ring_names.sort();
        prop_assert_eq!(members, ring_names);
        for (i, task) in cycle.iter().enumerate() {
            let next = &cycle[(i + 1) % cycle.len()];
            prop_assert!(graph.dependencies_of(task).contains(next));
        }
    }
}
