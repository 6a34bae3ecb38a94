//! Distributed merge tree over the in-memory mesh.

use recsort_lib::dist::{LocalCluster, RankDriver};
use recsort_lib::format::sorted_file_name;
use recsort_lib::generate::generate_unsorted_file;
use recsort_lib::sort::Backend;
use recsort_lib::SortConfig;
use rstest::rstest;
use tempfile::TempDir;

use crate::helpers::assert_sorted_records;

/// Run a full distributed sort with `world` simulated ranks against a
/// generated input, returning the sorted output bytes.
fn run_distributed(world: usize, records: u64, backend: Backend) -> Vec<u8> {
    let dir = TempDir::new().unwrap();
    generate_unsorted_file(dir.path(), records, 8, 42).unwrap();

    let config = SortConfig { records, payload_max: 8, threads: 2, cutoff: 256 };
    let mut clusters: Vec<Option<LocalCluster>> =
        LocalCluster::mesh(world).into_iter().map(Some).collect();

    let mut root_stats = None;
    std::thread::scope(|scope| {
        let work_dir = dir.path();
        for cluster in clusters.iter_mut().skip(1) {
            let mut comm = cluster.take().unwrap();
            scope.spawn(move || {
                let stats = RankDriver::new(config)
                    .backend(backend)
                    .run(&mut comm, work_dir)
                    .unwrap();
                assert!(stats.is_none(), "only rank 0 reports stats");
            });
        }

        let mut comm = clusters[0].take().unwrap();
        root_stats = RankDriver::new(config)
            .backend(backend)
            .verify(true)
            .run(&mut comm, work_dir)
            .unwrap();
    });

    let stats = root_stats.expect("rank 0 must report stats");
    assert_eq!(stats.records, records);
    assert_eq!(stats.bytes_out, stats.bytes_in);

    std::fs::read(dir.path().join(sorted_file_name(records, 8))).unwrap()
}

#[rstest]
#[case::recursive(Backend::Recursive)]
#[case::farm(Backend::Farm)]
fn test_four_ranks_full_pipeline(#[case] backend: Backend) {
    let n = 10_000u64;
    let output = run_distributed(4, n, backend);
    assert_sorted_records(&output, n);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(5)]
#[case(8)]
fn test_world_sizes(#[case] world: usize) {
    let n = 2_003u64; // odd count so slice boundaries are uneven
    let output = run_distributed(world, n, Backend::Recursive);
    assert_sorted_records(&output, n);
}

#[test]
fn test_more_ranks_than_records() {
    let output = run_distributed(8, 3, Backend::Recursive);
    assert_sorted_records(&output, 3);
}
