//! Randomized allocate/free churn against the pool and the typed allocators.

use std::collections::HashMap;

use nexus_alloc::{Allocator, MAX_ALIGN, Pool, PoolAllocator, PoolBuilder, System};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

struct Live {
    ptr: *mut u8,
    bytes: usize,
    align: usize,
    fill: u8,
}

fn check(block: &Live) {
    let slice = unsafe { std::slice::from_raw_parts(block.ptr, block.bytes) };
    assert!(
        slice.iter().all(|&b| b == block.fill),
        "block of {} bytes was clobbered",
        block.bytes
    );
}

fn churn(pool: &mut Pool, seed: u64, rounds: usize, max_request: usize) {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut live: Vec<Live> = Vec::new();

    for round in 0..rounds {
        let op = rng.random_range(0..100);
        if op < 55 || live.is_empty() {
            let bytes = rng.random_range(0..=max_request);
            let align = [1, 2, 4, 8, 16, 32][rng.random_range(0..6)];
            let ptr = pool.allocate(bytes, align).unwrap();
            assert_eq!(ptr.as_ptr() as usize % align, 0);
            let fill = (round % 251) as u8;
            unsafe { std::ptr::write_bytes(ptr.as_ptr(), fill, bytes) };
            live.push(Live {
                ptr: ptr.as_ptr(),
                bytes,
                align,
                fill,
            });
        } else {
            let idx = rng.random_range(0..live.len());
            let block = live.swap_remove(idx);
            check(&block);
            let ptr = std::ptr::NonNull::new(block.ptr).unwrap();
            unsafe { pool.deallocate(ptr, block.bytes, block.align) };
        }
    }

    for block in &live {
        check(block);
    }
    for block in live {
        let ptr = std::ptr::NonNull::new(block.ptr).unwrap();
        unsafe { pool.deallocate(ptr, block.bytes, block.align) };
    }
}

#[test]
fn default_pool_churn() {
    let mut pool = Pool::new();
    churn(&mut pool, 12345, 20_000, 400);
    assert!(pool.chunk_count() >= 1);
    let stats = pool.stats();
    assert!(stats.reused > 0);
    assert!(stats.large > 0);
}

#[test]
fn tight_chunks_churn() {
    // Chunk barely larger than the largest class forces frequent residue spills
    let mut pool = PoolBuilder::default()
        .max_bytes(128)
        .block_size(144)
        .build()
        .unwrap();
    churn(&mut pool, 777, 10_000, 200);
    assert!(pool.chunk_count() > 10);
}

#[test]
fn small_blocks_never_overlap() {
    let mut pool = Pool::new();
    let mut rng = SmallRng::seed_from_u64(42);
    let mut spans: Vec<(usize, usize)> = Vec::new();

    for _ in 0..5_000 {
        let bytes = rng.random_range(1..=256);
        let ptr = pool.allocate(bytes, MAX_ALIGN).unwrap().as_ptr() as usize;
        spans.push((ptr, ptr + bytes));
    }

    spans.sort_unstable();
    for pair in spans.windows(2) {
        assert!(pair[0].1 <= pair[1].0, "overlapping blocks");
    }
}

#[test]
fn typed_allocators_agree() {
    let mut rng = SmallRng::seed_from_u64(9);
    let mut pooled: HashMap<usize, (std::ptr::NonNull<u64>, usize)> = HashMap::new();

    for id in 0..2_000 {
        let n = rng.random_range(0..64);
        let pool_ptr = PoolAllocator.allocate::<u64>(n).unwrap();
        let sys_ptr = System.allocate::<u64>(n).unwrap();
        unsafe {
            for i in 0..n {
                pool_ptr.as_ptr().add(i).write((id * 64 + i) as u64);
                sys_ptr.as_ptr().add(i).write((id * 64 + i) as u64);
            }
            let a = std::slice::from_raw_parts(pool_ptr.as_ptr(), n);
            let b = std::slice::from_raw_parts(sys_ptr.as_ptr(), n);
            assert_eq!(a, b);
            System.deallocate(sys_ptr, n);
        }
        pooled.insert(id, (pool_ptr, n));

        if rng.random_bool(0.5) {
            let victim = rng.random_range(0..=id);
            if let Some((ptr, n)) = pooled.remove(&victim) {
                unsafe {
                    let data = std::slice::from_raw_parts(ptr.as_ptr(), n);
                    for (i, &v) in data.iter().enumerate() {
                        assert_eq!(v, (victim * 64 + i) as u64);
                    }
                    PoolAllocator.deallocate(ptr, n);
                }
            }
        }
    }

    for (_, (ptr, n)) in pooled {
        unsafe { PoolAllocator.deallocate(ptr, n) };
    }
}
