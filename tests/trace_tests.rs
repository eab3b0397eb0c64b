use invok_cluster::cluster::{dbscan_precomputed, estimate_epsilon_by_coverage};
use invok_cluster::distance::{disjoint_sets, DistanceEngine};
use invok_cluster::trace::TraceStore;
use std::io::Write;
use tempfile::NamedTempFile;

fn encode(words: &[i64]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[test]
fn test_trivial_trace_two_identical_invocations() {
    // Two invocations, both touching only page 0x1000
    let bytes = encode(&[-3, -1, 0x1000, -2, -3, -1, 0x1000, -2]);
    let store = TraceStore::from_bytes(&bytes).unwrap();

    assert_eq!(store.invocation_count(), 2);
    assert_eq!(store.invocation_set_count(), 1);
    assert_eq!(store.invocation_sets()[0].invocations, vec![0, 1]);
}

#[test]
fn test_trace_file_round_trip() {
    let bytes = encode(&[-3, -1, 1, 2, -2, -3, -1, 3, -2]);
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();

    let store = TraceStore::from_file(file.path()).unwrap();

    assert_eq!(store.invocation_count(), 2);
    assert_eq!(store.invocation_set_count(), 2);
    assert_eq!(store.subtrace_count(), 2);
}

#[test]
fn test_distance_matrix_symmetry_over_trace() {
    // Four distinct footprints of growing size
    let bytes = encode(&[
        -3, -1, 1, -2, //
        -3, -1, 1, 2, -2, //
        -3, -1, 1, 2, 3, -2, //
        -3, -1, 100, 200, 300, 400, -2,
    ]);
    let store = TraceStore::from_bytes(&bytes).unwrap();

    let mut engine = DistanceEngine::new(2);
    let matrix = engine.compute(store.invocation_sets(), disjoint_sets).unwrap();

    let n = matrix.size();
    assert_eq!(n, 4);
    for i in 0..n {
        assert_eq!(matrix.get(i, i), 0.0);
        for j in 0..n {
            assert_eq!(matrix.get(i, j), matrix.get(j, i));
            if i != j {
                assert!(matrix.get(i, j) > 0.0);
            }
        }
    }
}

#[test]
fn test_trace_clustering_end_to_end() {
    // Two families of footprints: small sets around {1,2} and large sets
    // around pages 100..110, plus one outlier touching 40 pages
    let mut words: Vec<i64> = Vec::new();
    for variant in 0..3i64 {
        for _ in 0..2 {
            words.extend([-3, -1, 1, 2, 10 + variant, -2]);
        }
    }
    for variant in 0..3i64 {
        for _ in 0..2 {
            words.push(-3);
            words.push(-1);
            words.extend(100..110);
            words.push(200 + variant);
            words.push(-2);
        }
    }
    words.push(-3);
    words.push(-1);
    words.extend(1000..1040);
    words.push(-2);

    let mut store = TraceStore::from_bytes(&encode(&words)).unwrap();
    assert_eq!(store.invocation_count(), 13);
    assert_eq!(store.invocation_set_count(), 7);

    let invocation_sets = store.invocation_set_ids();
    store.release_invocations();

    let mut engine = DistanceEngine::new(4);
    let matrix = engine.compute(store.invocation_sets(), disjoint_sets).unwrap();

    let epsilon = estimate_epsilon_by_coverage(matrix, 0.9).unwrap();
    let result = dbscan_precomputed(matrix, epsilon, 2, invocation_sets).unwrap();

    // Every invocation is accounted for exactly once
    let clustered: usize = (0..result.cluster_count())
        .map(|c| result.invocation_count_in_cluster(c))
        .sum();
    assert_eq!(clustered + result.noise_invocation_count(), 13);
    assert_eq!(result.invocation_count(), 13);
    assert!(result.cluster_count() >= 1);
}

#[test]
fn test_memory_estimate_matches_set_count() {
    let bytes = encode(&[-3, -1, 1, -2, -3, -1, 2, -2, -3, -1, 1, -2]);
    let store = TraceStore::from_bytes(&bytes).unwrap();

    // 3 invocations dedup into 2 sets; the matrix estimate follows the sets
    assert_eq!(store.invocation_set_count(), 2);
    assert_eq!(store.estimate_needed_memory(), 2 * 2 * 8);
}

#[test]
fn test_epsilon_monotone_in_coverage() {
    let mut words: Vec<i64> = Vec::new();
    for size in 1..=10i64 {
        words.push(-3);
        words.push(-1);
        words.extend(0..size * size);
        words.push(-2);
    }
    let store = TraceStore::from_bytes(&encode(&words)).unwrap();

    let mut engine = DistanceEngine::new(2);
    let matrix = engine.compute(store.invocation_sets(), disjoint_sets).unwrap();

    let mut previous = 0.0;
    for step in 1..=10 {
        let epsilon = estimate_epsilon_by_coverage(matrix, step as f64 / 10.0).unwrap();
        assert!(epsilon >= previous);
        previous = epsilon;
    }
}
