//! Integration tests for cospend-cluster.
//!
//! Tests end-to-end workflows: replaying event logs from disk, checking the
//! partition against a reference, and exporting it.

use cospend_cluster::{
    export_to_path, read_events_parallel, replay, Address, ClusterConfig, ClusterEngine,
    EventReader, ExportFormat, MembershipMode, MergePolicy,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use tempfile::TempDir;

fn addr(i: usize) -> Vec<u8> {
    (i as u32).to_be_bytes().to_vec()
}

/// Random transactions of 1..=4 inputs over `n` addresses. Single-input ones are degenerate.
fn random_events(seed: u64, n: usize, events: usize) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..events)
        .map(|_| {
            let k = rng.gen_range(1..=4);
            (0..k).map(|_| rng.gen_range(0..n)).collect()
        })
        .collect()
}

/// Reference partition: connected components by BFS over co-input edges.
fn reference_components(n: usize, events: &[Vec<usize>]) -> Vec<usize> {
    let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
    for inputs in events {
        for pair in inputs.windows(2) {
            adjacency.entry(pair[0]).or_default().push(pair[1]);
            adjacency.entry(pair[1]).or_default().push(pair[0]);
        }
    }

    let mut component = vec![usize::MAX; n];
    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        component[start] = start;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &next in adjacency.get(&node).into_iter().flatten() {
                if component[next] == usize::MAX {
                    component[next] = start;
                    stack.push(next);
                }
            }
        }
    }
    component
}

fn run_engine(config: ClusterConfig, n: usize, events: &[Vec<usize>]) -> ClusterEngine {
    let mut engine = ClusterEngine::new(config);
    for i in 0..n {
        engine.output_address(&addr(i));
    }
    for inputs in events {
        engine.open_event().unwrap();
        for &i in inputs {
            engine.input_address(&addr(i)).unwrap();
        }
        engine.close_event().unwrap();
    }
    engine
}

#[test]
fn test_partition_matches_reference() {
    let n = 2_000;
    let events = random_events(7, n, 1_200);
    let reference = reference_components(n, &events);

    for policy in [MergePolicy::BySize, MergePolicy::Anchor] {
        let config = ClusterConfig::default().with_merge_policy(policy);
        let mut engine = run_engine(config, n, &events);

        // Closure and no false merge: same engine cluster iff same component
        let mut cluster_to_component = HashMap::new();
        for i in 0..n {
            let cluster = engine.cluster_of(&addr(i)).unwrap();
            let component = *cluster_to_component.entry(cluster).or_insert(reference[i]);
            assert_eq!(component, reference[i], "address {i} under {policy:?}");
        }

        let components: HashSet<_> = reference.iter().collect();
        assert_eq!(engine.stats().cluster_count, components.len());
        assert_eq!(cluster_to_component.len(), components.len());
    }
}

#[test]
fn test_members_of_matches_cluster_of() {
    let n = 500;
    let events = random_events(11, n, 300);
    let config = ClusterConfig::default().with_membership(MembershipMode::Incremental);
    let mut engine = run_engine(config, n, &events);

    let mut seen = HashSet::new();
    for (cluster, members) in engine.clusters() {
        let mut listed = engine.members_of(cluster);
        listed.sort();
        let mut expected = members;
        expected.sort();
        assert_eq!(listed, expected);
        assert_eq!(engine.cluster_size(cluster), listed.len());

        for member in listed {
            assert_eq!(engine.cluster_of(member.as_bytes()).unwrap(), cluster);
            assert!(seen.insert(member), "address listed twice");
        }
    }
    assert_eq!(seen.len(), n);
}

#[test]
fn test_supercluster_from_log_file() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("events.jsonl");

    let n = 10_000;
    let hex_addresses: Vec<String> = (0..n).map(|i| hex::encode(addr(i))).collect();
    let mut file = std::fs::File::create(&input_path).unwrap();
    writeln!(
        file,
        "{}",
        serde_json::json!({"type": "tx", "outputs": hex_addresses})
    )
    .unwrap();
    writeln!(file, r#"{{"type":"block"}}"#).unwrap();
    writeln!(
        file,
        "{}",
        serde_json::json!({"type": "tx", "inputs": hex_addresses})
    )
    .unwrap();
    drop(file);

    let mut engine = ClusterEngine::default();
    let summary = replay(EventReader::open(&input_path).unwrap(), &mut engine).unwrap();
    assert_eq!(summary.events, 2);
    assert_eq!(summary.blocks, 1);

    assert_eq!(engine.stats().cluster_count, 1);
    let cluster = engine.cluster_of(&addr(0)).unwrap();
    let members = engine.members_of(cluster);
    assert_eq!(members.len(), n);
    let unique: HashSet<Address> = members.into_iter().collect();
    assert_eq!(unique.len(), n);
}

#[test]
fn test_log_to_csv_export() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("events.jsonl");
    let output_path = temp_dir.path().join("clusters.csv");

    std::fs::write(
        &input_path,
        r#"{"type":"tx","outputs":["0a","0b","0c","0d"]}
{"type":"block"}
{"type":"tx","inputs":["0a","0b"],"outputs":["0e"]}
{"type":"tx","inputs":["0b","0c"]}
{"type":"tx","inputs":["0d"]}
{"type":"block"}
"#,
    )
    .unwrap();

    let events = read_events_parallel(&input_path).unwrap();
    let mut engine = ClusterEngine::default();
    let summary = replay(events.into_iter().map(Ok), &mut engine).unwrap();
    assert_eq!(summary.events, 4);
    assert_eq!(summary.degenerate_events, 2);

    let exported = export_to_path(&mut engine, &output_path, ExportFormat::Csv).unwrap();
    assert_eq!(exported.addresses, 5);
    assert_eq!(exported.clusters, 3);

    let contents = std::fs::read_to_string(&output_path).unwrap();
    let rows: HashMap<&str, &str> = contents
        .lines()
        .skip(1)
        .map(|line| line.split_once(',').unwrap())
        .collect();
    assert_eq!(rows["0a"], rows["0b"]);
    assert_eq!(rows["0b"], rows["0c"]);
    assert_ne!(rows["0a"], rows["0d"]);
    assert_ne!(rows["0a"], rows["0e"]);
}

#[test]
fn test_stopped_stream_is_prefix_consistent() {
    let n = 300;
    let events = random_events(3, n, 200);
    let (prefix, _) = events.split_at(120);

    let mut engine = run_engine(ClusterConfig::default(), n, prefix);
    let reference = reference_components(n, prefix);

    for i in 0..n {
        for j in (i + 1)..n.min(i + 20) {
            let together = engine.cluster_of(&addr(i)).unwrap() == engine.cluster_of(&addr(j)).unwrap();
            assert_eq!(together, reference[i] == reference[j]);
        }
    }
}
