//! Tagged sockets: one module behind several sockets, told apart by tag.

mod helpers;

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use helpers::ns;
use tlm_bridge::harness::{
    LatencyTarget, PhaseTiming, PhaseTrace, PhasedTarget, RecordingInitiator, RequestStyle,
    ResponseMode,
};
use tlm_bridge::socket::{BackwardTransport, ForwardMode, ForwardTransport};
use tlm_bridge::{Phase, Simulation, SyncStatus, TaggedTargetSocket, Transaction};

#[test]
fn shared_module_sees_the_tag_of_each_socket() {
    let sim = Simulation::new();
    let handle = sim.handle();
    let trace = PhaseTrace::new();
    let target = Rc::new(LatencyTarget::<i32>::new("memory", &handle, ns(20), trace.clone()));

    let sockets: Vec<TaggedTargetSocket> = (1..=2)
        .map(|tag| {
            let socket =
                TaggedTargetSocket::new(format!("top.memory.port{tag}"), &handle).expect("socket");
            socket.register_b_transport(&target, tag).expect("register");
            socket
        })
        .collect();

    for (index, socket) in sockets.iter().enumerate() {
        let socket = socket.clone();
        let trans = Transaction::read(0x100 * index as u64, 4);
        sim.spawn(format!("caller{index}"), async move {
            let mut delay = Duration::ZERO;
            let _ = socket.b_transport(&trans, &mut delay).await;
        });
    }
    sim.run().expect("run");

    assert_eq!(target.tags_seen(), vec![1, 2]);
    assert!(sockets.iter().all(|s| s.forward_mode() == ForwardMode::Blocking));
}

#[test]
fn tag_reaches_blocking_module_through_non_blocking_adaptation() {
    let sim = Simulation::new();
    let handle = sim.handle();
    let trace = PhaseTrace::new();
    let socket = TaggedTargetSocket::new("tagged.nb2b", &handle).expect("socket");
    let target = Rc::new(LatencyTarget::<i32>::new("memory", &handle, ns(12), trace.clone()));
    socket.register_b_transport(&target, 42).expect("register");
    let initiator = Rc::new(RecordingInitiator::new(
        "initiator",
        &handle,
        trace.clone(),
        ResponseMode::Complete,
    ));
    socket
        .bind(Rc::clone(&initiator) as Rc<dyn BackwardTransport>)
        .expect("bind");

    let trans = Transaction::read(0, 4);
    let mut phase = Phase::BeginReq;
    let mut delay = Duration::ZERO;
    let status = socket
        .nb_transport_fw(&trans, &mut phase, &mut delay)
        .expect("forward call");
    assert_eq!(status, SyncStatus::Accepted);
    sim.run().expect("run");

    assert_eq!(target.tags_seen(), vec![42]);
    assert_eq!(trace.received_at("initiator", Phase::BeginResp), vec![ns(12)]);
}

#[test]
fn tag_reaches_non_blocking_module_through_blocking_adaptation() {
    let sim = Simulation::new();
    let handle = sim.handle();
    let trace = PhaseTrace::new();
    let socket = TaggedTargetSocket::new("tagged.b2nb", &handle).expect("socket");
    let timing = PhaseTiming {
        end_request: ns(10),
        begin_response: ns(25),
        style: RequestStyle::Backward,
    };
    let target = Rc::new(PhasedTarget::<i32>::new(
        "target",
        &handle,
        socket.backward_path(),
        timing,
        trace.clone(),
    ));
    socket.register_nb_transport_fw(&target, 7).expect("register");

    let finished = Rc::new(Cell::new(None));
    {
        let socket = socket.clone();
        let out = Rc::clone(&finished);
        let handle = handle.clone();
        sim.spawn("caller", async move {
            let trans = Transaction::read(0, 4);
            let mut delay = Duration::ZERO;
            if socket.b_transport(&trans, &mut delay).await.is_ok() {
                out.set(Some(handle.now() + delay));
            }
        });
    }
    sim.run().expect("run");

    assert_eq!(finished.get(), Some(ns(35)));
    assert_eq!(target.tags_seen(), vec![7]);
}
