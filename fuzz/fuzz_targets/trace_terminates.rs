//! Fuzzing the tracer over arbitrary graphs.
//!
//! 1. Generate a graph with arbitrary kinds and operand edges,
//!    including cycles through phis, loads and stores.
//! 2. Trace every node under an arbitrary configuration.
//! 3. Check that each trace terminates and expands no node twice.

#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use seminal::fuzzing::{trace_all, ArbitraryGraph};
use seminal::trace::{LedgerScope, StorePolicy, TraceConfig};

#[derive(Debug, Arbitrary)]
struct Input {
    graph: ArbitraryGraph,
    per_module: bool,
    follow_stores: bool,
    forward_scan: bool,
}

fuzz_target!(|input: Input| {
    let _ = env_logger::try_init();
    log::debug!("graph: {:?}", input.graph);
    let config = TraceConfig {
        scope: if input.per_module {
            LedgerScope::PerModule
        } else {
            LedgerScope::PerSeed
        },
        store_policy: if input.follow_stores {
            StorePolicy::FollowSource
        } else {
            StorePolicy::Terminal
        },
        forward_scan: input.forward_scan,
        ..TraceConfig::default()
    };
    trace_all(&input.graph, &config);
});
