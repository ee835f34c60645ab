//! Coroutine ring
//!
//! N contexts pass control around a ring for K laps, then hand back to
//! main. Prints the switch rate.
//!
//! # Environment Variables
//!
//! - `STRAND_RING_SIZE` - contexts in the ring (default 8)
//! - `STRAND_RING_LAPS` - laps around the ring (default 100000)
//! - `STRAND_LOG_LEVEL=debug` - log level (off, error, warn, info, debug, trace)

use std::cell::RefCell;
use std::time::Instant;
use strand::{active, env_get, kdebug, kinfo, switch_to, Context};

struct Ring {
    members: Vec<Context>,
    main: Context,
    laps: usize,
    laps_done: usize,
    switches: u64,
}

thread_local! {
    static RING: RefCell<Option<Ring>> = const { RefCell::new(None) };
}

extern "C" fn member() -> ! {
    loop {
        let next = RING.with(|r| {
            let mut r = r.borrow_mut();
            let Some(r) = r.as_mut() else {
                std::process::abort();
            };
            r.switches += 1;
            let me = active();
            let idx = r.members.iter().position(|c| *c == me).unwrap_or(0);
            if idx + 1 < r.members.len() {
                return r.members[idx + 1];
            }
            r.laps_done += 1;
            if r.laps_done == r.laps {
                r.main
            } else {
                r.members[0]
            }
        });
        unsafe { switch_to(next) };
    }
}

// STRAND_RING_SIZE=4 STRAND_LOG_LEVEL=debug cargo run -p strand-ring
fn main() {
    println!("=== strand Coroutine Ring ===\n");

    let size: usize = env_get("STRAND_RING_SIZE", 8).max(1);
    let laps: usize = env_get("STRAND_RING_LAPS", 100_000).max(1);

    let mut members = Vec::with_capacity(size);
    for i in 0..size {
        match Context::with_default_stack(member) {
            Ok(ctx) => {
                kdebug!("[ring] member {} = {:?}", i, ctx);
                members.push(ctx);
            }
            Err(e) => {
                eprintln!("failed to create context {}: {}", i, e);
                std::process::exit(1);
            }
        }
    }
    let first = members[0];

    RING.with(|r| {
        *r.borrow_mut() = Some(Ring {
            members: members.clone(),
            main: active(),
            laps,
            laps_done: 0,
            switches: 0,
        })
    });

    kinfo!("Running {} contexts for {} laps", size, laps);
    let start = Instant::now();
    unsafe { switch_to(first) };
    let elapsed = start.elapsed();

    let switches = RING.with(|r| r.borrow().as_ref().map_or(0, |r| r.switches));
    println!("Contexts:  {}", size);
    println!("Switches:  {}", switches);
    println!("Elapsed:   {:?}", elapsed);
    if elapsed.as_nanos() > 0 {
        println!(
            "Per switch: {:.1} ns",
            elapsed.as_nanos() as f64 / switches.max(1) as f64
        );
    }

    for ctx in members {
        unsafe { ctx.delete() };
    }
    println!("\n=== Ring Complete ===");
}
