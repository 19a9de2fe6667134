use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use poe_bundle::{bundle_index::PathRegion, hasher::BuildMurmurHash64A, path::PathTable};

fn push_string(out: &mut Vec<u8>, cmd: u32, s: &str) {
    out.extend(cmd.to_le_bytes());
    out.extend(s.as_bytes());
    out.push(0);
}

/// A folder-like region: a few shared bases then many leaves hanging off them
fn synthetic_region(folder: usize) -> Vec<u8> {
    let mut out = vec![];

    out.extend(0_u32.to_le_bytes());
    push_string(&mut out, 1, &format!("metadata/folder{folder}/"));
    for sub in 0..8 {
        push_string(&mut out, 1, &format!("sub{sub}/"));
    }
    out.extend(0_u32.to_le_bytes());

    for leaf in 0..200 {
        let base = leaf % 9 + 1;
        push_string(&mut out, base as u32, &format!("file{leaf}.dat64"));
    }

    out
}

fn synthetic_table(regions: usize) -> (Vec<PathRegion>, Bytes) {
    let mut data = vec![];
    let reps = (0..regions)
        .map(|i| {
            let region = synthetic_region(i);
            let rep = PathRegion {
                hash: i as u64,
                offset: data.len() as u32,
                size: region.len() as u32,
                recursive_size: region.len() as u32,
            };
            data.extend(region);
            rep
        })
        .collect();

    (reps, Bytes::from(data))
}

fn path_table_benchmark(c: &mut Criterion) {
    let (reps, data) = synthetic_table(500);
    let table = PathTable::from_parts(data, &reps);
    let hasher = BuildMurmurHash64A::default();

    c.bench_function("hash_table", |b| {
        b.iter(|| black_box(table.hash_table(&hasher).unwrap().len()))
    });

    c.bench_function("filtered_paths", |b| {
        b.iter(|| {
            black_box(
                table
                    .filtered_paths(hasher, |p| p.ends_with("file7.dat64"))
                    .count(),
            )
        })
    });
}

criterion_group!(benches, path_table_benchmark);
criterion_main!(benches);
