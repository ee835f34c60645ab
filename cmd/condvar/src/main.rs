//! Condition variable demo
//!
//! Several threads queue on one condition variable; main wakes them one at
//! a time and prints the order they came back in. With the emulated
//! backend the order always matches the order they started waiting.
//!
//! # Environment Variables
//!
//! - `STRAND_WAITERS` - waiting threads (default 5)
//! - `STRAND_LOG_LEVEL=debug` - log level (off, error, warn, info, debug, trace)

use std::sync::Arc;
use std::time::{Duration, Instant};
use strand::{env_get, kdebug, kinfo, Condvar, EmulatedCond, Mutex, PlatformEvent, Thread};

type FifoCond = Condvar<EmulatedCond<PlatformEvent>>;

struct Shared {
    order: Mutex<Vec<usize>>,
    cond: FifoCond,
}

fn wait_for(what: &str, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while !done() {
        if start.elapsed() > Duration::from_secs(10) {
            println!("WARNING: timeout waiting for {}", what);
            return false;
        }
        std::thread::yield_now();
    }
    true
}

// STRAND_WAITERS=8 cargo run -p strand-condvar
fn main() {
    println!("=== strand Condition Variable Example ===\n");

    let waiters: usize = env_get("STRAND_WAITERS", 5).max(1);
    let shared = match (Mutex::new(Vec::new()), FifoCond::with_backend()) {
        (Ok(order), Ok(cond)) => Arc::new(Shared { order, cond }),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let mut threads = Vec::with_capacity(waiters);
    for id in 0..waiters {
        let s = Arc::clone(&shared);
        let spawned = Thread::spawn(move || {
            let mut order = s.order.lock();
            kdebug!("[waiter {}] waiting", id);
            s.cond.wait(&mut order);
            order.push(id);
            kdebug!("[waiter {}] woken", id);
        });
        match spawned {
            Ok(t) => threads.push(t),
            Err(e) => {
                eprintln!("spawn failed: {}", e);
                std::process::exit(1);
            }
        }
        wait_for("waiter to queue", || shared.cond.backend().waiters() == id + 1);
    }
    kinfo!("{} waiters queued", waiters);

    for n in 1..=waiters {
        shared.cond.signal();
        if !wait_for("wakeup", || shared.order.lock().len() == n) {
            break;
        }
    }

    for t in threads {
        if let Err(e) = t.join() {
            eprintln!("join failed: {}", e);
        }
    }

    let order = shared.order.lock();
    println!("Wake order: {:?}", *order);
    let fifo = order.iter().enumerate().all(|(i, &id)| i == id);
    println!("FIFO:       {}", if fifo { "yes" } else { "no" });
    println!("\n=== Example Complete ===");
}
