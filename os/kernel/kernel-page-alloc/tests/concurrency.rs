mod common;

use common::{allocator, read_page, write_page};
use kernel_page_alloc::{AllocError, PhysicalAddress};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

const THREADS: usize = 8;

#[test]
fn concurrent_allocations_are_unique() {
    let iters = 2_000;
    let f = Arc::new(allocator(32));
    let outstanding = Arc::new(Mutex::new(HashSet::<PhysicalAddress>::new()));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|id| {
            let f = Arc::clone(&f);
            let outstanding = Arc::clone(&outstanding);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let marker = u8::try_from(0x10 + id).unwrap();
                let mut held = VecDeque::new();
                start.wait();

                for _ in 0..iters {
                    // 8 threads × 3 pages stay below the 31 pages available
                    if held.len() == 3 {
                        let page: PhysicalAddress = held.pop_front().unwrap();
                        assert!(
                            read_page(page).iter().all(|&b| b == marker),
                            "page {page} was written by another owner"
                        );
                        assert!(outstanding.lock().unwrap().remove(&page));
                        unsafe { f.free(page) };
                    }

                    let page = f.alloc().expect("pool must not run dry");
                    assert!(
                        outstanding.lock().unwrap().insert(page),
                        "page {page} handed out twice"
                    );
                    write_page(page, marker);
                    held.push_back(page);
                }

                for page in held {
                    assert!(outstanding.lock().unwrap().remove(&page));
                    unsafe { f.free(page) };
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert!(outstanding.lock().unwrap().is_empty());
    let stats = f.stats();
    assert_eq!(stats.free_pages, stats.total_pages);
}

#[test]
fn racing_drain_splits_the_pool_without_overlap() {
    let f = Arc::new(allocator(64));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let f = Arc::clone(&f);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut mine = Vec::new();
                loop {
                    match f.alloc() {
                        Ok(page) => mine.push(page),
                        Err(AllocError::OutOfMemory) => break mine,
                    }
                }
            })
        })
        .collect();

    let all: Vec<PhysicalAddress> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let unique: HashSet<_> = all.iter().copied().collect();

    assert_eq!(all.len(), f.total_pages());
    assert_eq!(unique.len(), all.len());
    assert_eq!(f.stats().free_pages, 0);
}

#[test]
fn shared_page_is_freed_by_the_last_owner() {
    let f = Arc::new(allocator(8));
    let page = f.alloc().unwrap();
    for _ in 0..THREADS {
        unsafe { f.increment_ref(page) };
    }
    assert_eq!(f.ref_count(page), 1 + u32::try_from(THREADS).unwrap());

    let start = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let f = Arc::clone(&f);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                unsafe { f.free(page) };
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(f.ref_count(page), 1);
    assert!(!f.is_free(page));

    unsafe { f.free(page) };
    assert_eq!(f.ref_count(page), 0);
    assert!(f.is_free(page));
}

#[test]
fn interleaved_sharing_keeps_exact_counts() {
    let iters = 5_000;
    let f = Arc::new(allocator(8));
    let page = f.alloc().unwrap();
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let f = Arc::clone(&f);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                for _ in 0..iters {
                    unsafe {
                        f.increment_ref(page);
                        f.free(page);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(f.ref_count(page), 1);
    assert!(!f.is_free(page));
    unsafe { f.free(page) };
    assert!(f.is_free(page));
}
