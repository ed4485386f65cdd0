#![allow(dead_code)]

use ticksched::{InvariantMonitor, Pid, PolicyKind, Scenario, SimFormat, Simulator, Trace};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .event_format(SimFormat)
        .with_test_writer()
        .try_init();
}

/// Run `scenario` under `kind`, checking the queue and ownership
/// invariants at the end of every tick.
pub fn run_checked(kind: PolicyKind, scenario: Scenario) -> Trace {
    let mut monitor = InvariantMonitor::new();
    let trace = Simulator::new(kind.build())
        .run_with_monitor(scenario, &mut monitor)
        .unwrap();
    monitor.assert_clean();
    trace
}

/// Expected run sequence; 0 marks an idle tick.
pub fn seq(pids: &[u32]) -> Vec<Option<Pid>> {
    pids.iter()
        .map(|&p| if p == 0 { None } else { Some(Pid(p)) })
        .collect()
}

/// PIDs woken by releases, in order.
pub fn wake_order(trace: &Trace) -> Vec<Pid> {
    trace
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            ticksched::TraceKind::Woke { pid, .. } => Some(pid),
            _ => None,
        })
        .collect()
}

/// A workload with nested holds and contention from every direction, but
/// no hold-and-wait cycle.
pub fn contended_scenario() -> Scenario {
    use ticksched::ProcessDef;

    Scenario::builder()
        .resources(2)
        .process(
            ProcessDef::new(Pid(1), 8)
                .prio(2)
                .acquire(0, 1, 4)
                .acquire(1, 2, 2),
        )
        .process(ProcessDef::new(Pid(2), 5).prio(7).start(1).acquire(0, 0, 2))
        .process(
            ProcessDef::new(Pid(3), 6)
                .prio(4)
                .start(2)
                .acquire(1, 1, 3)
                .acquire(0, 4, 1),
        )
        .process(ProcessDef::new(Pid(4), 3).prio(9).start(3).acquire(1, 0, 1))
        .process(ProcessDef::new(Pid(5), 4).prio(1).start(6))
        .build()
        .unwrap()
}
