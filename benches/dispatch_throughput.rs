//! Benchmark for the adaptation paths of the target socket.
//!
//! Measures how fast the kernel pushes N concurrent blocking calls through the
//! dispatch task of a socket whose module only speaks the phase protocol, and
//! how fast N non-blocking exchanges complete against a blocking module.

use std::rc::Rc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tlm_bridge::harness::{
    BlockingTargetScenario, LatencyTarget, NonBlockingTargetScenario, PhaseTiming, PhaseTrace,
    PhasedTarget, RecordingInitiator, RequestStyle, ResponseMode, run_blocking_target,
    run_non_blocking_target,
};
use tlm_bridge::socket::{BackwardTransport, ForwardTransport};
use tlm_bridge::{SimpleTargetSocket, Simulation, Transaction};

/// Run `calls` blocking transactions concurrently through a non-blocking target.
fn blocking_calls(calls: usize, style: RequestStyle) {
    let sim = Simulation::new();
    let handle = sim.handle();
    let socket = SimpleTargetSocket::new("bench.b2nb", &handle).expect("socket");
    let timing = PhaseTiming {
        end_request: Duration::from_nanos(2),
        begin_response: Duration::from_nanos(5),
        style,
    };
    let target = Rc::new(PhasedTarget::new(
        "target",
        &handle,
        socket.backward_path(),
        timing,
        PhaseTrace::new(),
    ));
    socket
        .register_nb_transport_fw(&target, ())
        .expect("register");

    for i in 0..calls {
        let socket = socket.clone();
        sim.spawn(format!("caller{i}"), async move {
            let trans = Transaction::read(i as u64 * 4, 4);
            let mut delay = Duration::ZERO;
            let _ = socket.b_transport(&trans, &mut delay).await;
        });
    }
    sim.run().expect("run");
}

/// Run `calls` non-blocking exchanges concurrently against a blocking target.
fn non_blocking_calls(calls: usize) {
    let sim = Simulation::new();
    let handle = sim.handle();
    let trace = PhaseTrace::new();
    let socket = SimpleTargetSocket::new("bench.nb2b", &handle).expect("socket");
    let target = Rc::new(LatencyTarget::new(
        "target",
        &handle,
        Duration::from_nanos(5),
        trace.clone(),
    ));
    socket.register_b_transport(&target, ()).expect("register");
    let initiator = Rc::new(RecordingInitiator::new(
        "initiator",
        &handle,
        trace,
        ResponseMode::Accept,
    ));
    socket
        .bind(Rc::clone(&initiator) as Rc<dyn BackwardTransport>)
        .expect("bind");

    for i in 0..calls {
        let socket = socket.clone();
        let initiator = Rc::clone(&initiator);
        sim.spawn(format!("caller{i}"), async move {
            let trans = Transaction::read(i as u64 * 4, 4);
            let _ = initiator
                .transact_non_blocking(&socket as &dyn ForwardTransport, &trans)
                .await;
        });
    }
    sim.run().expect("run");
}

fn benchmark_blocking_adaptation(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocking_to_non_blocking");

    for calls in [1, 16, 128, 1024].iter() {
        group.bench_with_input(
            BenchmarkId::new("backward_phases", calls),
            calls,
            |b, &calls| b.iter(|| blocking_calls(calls, RequestStyle::Backward)),
        );
        group.bench_with_input(
            BenchmarkId::new("completed_at_once", calls),
            calls,
            |b, &calls| b.iter(|| blocking_calls(calls, RequestStyle::Complete)),
        );
    }

    group.finish();
}

fn benchmark_non_blocking_adaptation(c: &mut Criterion) {
    let mut group = c.benchmark_group("non_blocking_to_blocking");

    for calls in [1, 16, 128, 1024].iter() {
        group.bench_with_input(BenchmarkId::new("accepted", calls), calls, |b, &calls| {
            b.iter(|| non_blocking_calls(calls))
        });
    }

    group.finish();
}

fn benchmark_scenarios(c: &mut Criterion) {
    let blocking = BlockingTargetScenario::default();
    let non_blocking = NonBlockingTargetScenario::default();

    c.bench_function("scenario_blocking_target", |b| {
        b.iter(|| run_blocking_target(&blocking, None).expect("scenario"))
    });
    c.bench_function("scenario_non_blocking_target", |b| {
        b.iter(|| run_non_blocking_target(&non_blocking, None).expect("scenario"))
    });
}

criterion_group!(
    benches,
    benchmark_blocking_adaptation,
    benchmark_non_blocking_adaptation,
    benchmark_scenarios
);
criterion_main!(benches);
