use std::{iter::repeat_with, ops::Range};

use criterion::{
    black_box, criterion_group, criterion_main, measurement::WallTime, BatchSize, BenchmarkGroup,
    BenchmarkId, Criterion,
};
use pagebuf::{device::MemStore, OpenFlags, PageCacheBuilder};
use rand::{rngs::StdRng, Rng, SeedableRng};

const PAGE_SIZE: usize = 4096;
const FILE_PAGES: u64 = 4096;
const SAMPLE_SIZE: usize = 8192;

fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("Page Cache");

    bench_workload("sequential reads", &mut group, |_| {
        (0..SAMPLE_SIZE as u64).map(|i| i % FILE_PAGES).collect()
    });
    bench_workload("random reads", &mut group, |rng| {
        random_vec(rng, SAMPLE_SIZE, &(0..FILE_PAGES))
    });
    bench_workload("hot set reads", &mut group, |rng| {
        random_vec(rng, SAMPLE_SIZE, &(0..FILE_PAGES / 16))
    });
}

fn bench_workload<F>(id: &str, group: &mut BenchmarkGroup<'_, WallTime>, mut pages: F)
where
    F: FnMut(&mut StdRng) -> Vec<u64>,
{
    let mut rng = StdRng::seed_from_u64(0);
    let store = MemStore::new();
    {
        let mut cache = PageCacheBuilder::new().build(&store).unwrap();
        let fd = cache
            .open("bench", OpenFlags::READ_WRITE | OpenFlags::CREATE, 0o644)
            .unwrap();
        let page = vec![0xab; PAGE_SIZE];
        for _ in 0..FILE_PAGES {
            cache.write(fd, &page).unwrap();
        }
        cache.close(fd).unwrap();
    }

    for capacity in [64, 256, 1024] {
        let id = BenchmarkId::new(id, capacity);
        group.bench_with_input(id, &capacity, |b, &capacity| {
            b.iter_batched(
                || pages(&mut rng),
                |input| read_all(&store, capacity, &input),
                BatchSize::SmallInput,
            )
        });
    }
}

fn read_all(store: &MemStore, capacity: usize, pages: &[u64]) {
    let mut cache = PageCacheBuilder::new()
        .capacity(capacity)
        .build(store)
        .unwrap();
    let fd = cache.open("bench", OpenFlags::READ, 0).unwrap();

    let mut buf = [0; 64];
    for page in pages {
        cache
            .seek(fd, std::io::SeekFrom::Start(page * PAGE_SIZE as u64))
            .unwrap();
        cache.read(fd, black_box(&mut buf)).unwrap();
    }
}

fn random_vec(rng: &mut StdRng, count: usize, range: &Range<u64>) -> Vec<u64> {
    repeat_with(|| rng.gen_range(range.clone()))
        .take(count)
        .collect()
}

criterion_group!(benches, bench);
criterion_main!(benches);
