//! `LinkedList` benchmarks: arena-backed nodes against the global heap.
//!
//! Measures:
//! - Filling and draining a list of N elements
//! - Steady-state queue traffic (pop front, push back)

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use carve_list::LinkedList;
use carve_mem::{FixedArena, MemoryResource};

fn fill_and_drain<R: MemoryResource>(list: &mut LinkedList<u64, R>, n: u64) -> u64 {
    for i in 0..n {
        list.push_back(i).unwrap();
    }
    let mut sum = 0;
    while let Some(v) = list.pop_front() {
        sum += v;
    }
    sum
}

fn bench_fill_and_drain(c: &mut Criterion) {
    carve_log::init_from_env();
    let mut group = c.benchmark_group("fill_and_drain");

    for n in [64u64, 1024, 16384].iter() {
        group.bench_with_input(BenchmarkId::new("arena", n), n, |b, &n| {
            let arena = FixedArena::new(1 << 20).unwrap();
            let mut list = LinkedList::new_in(&arena);
            b.iter(|| black_box(fill_and_drain(&mut list, n)));
        });

        group.bench_with_input(BenchmarkId::new("system", n), n, |b, &n| {
            let mut list = LinkedList::new();
            b.iter(|| black_box(fill_and_drain(&mut list, n)));
        });
    }

    group.finish();
}

fn bench_queue_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_cycle_256");

    group.bench_function("arena", |b| {
        let arena = FixedArena::new(1 << 16).unwrap();
        let mut list = LinkedList::new_in(&arena);
        list.extend_back(0..256u64).unwrap();
        b.iter(|| {
            let v = list.pop_front().unwrap();
            list.push_back(black_box(v)).unwrap();
        });
    });

    group.bench_function("system", |b| {
        let mut list = LinkedList::new();
        list.extend_back(0..256u64).unwrap();
        b.iter(|| {
            let v = list.pop_front().unwrap();
            list.push_back(black_box(v)).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fill_and_drain, bench_queue_cycle);
criterion_main!(benches);
