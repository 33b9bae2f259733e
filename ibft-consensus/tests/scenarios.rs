mod common;

use common::{single_node, Network};
use ibft_common::{Message, MessageType, Value};
use ibft_consensus::{ConsensusPhase, Directive, PreparedPairCheck, ValidationError};

#[test]
fn test_happy_path_all_nodes_decide() {
    let mut net = Network::new(4);
    net.start();
    net.run();

    assert_eq!(net.decided_values(), vec![Some(Value::Int(2)); 4]);
    for node in 0..4 {
        let stops: Vec<_> = net
            .log
            .iter()
            .filter(|d| d.to == node && d.directive == Directive::StopTimer)
            .collect();
        assert_eq!(stops.len(), 1, "node {node} stopped its timer once");
        assert_eq!(stops[0].message.kind(), MessageType::Commit);
        assert_eq!(net.nodes[node].round(), 1);
    }
}

#[test]
fn test_timeout_without_proposal() {
    let (mut node, out) = single_node(4, 1, |c| c);
    node.on_round_timeout();

    let snap = node.snapshot();
    assert_eq!(snap.round, 2);
    assert_eq!(snap.state, ConsensusPhase::RoundTimeout);
    assert_eq!(out.take(), vec![Message::round_change(2, 1, 0, None, vec![])]);
}

#[test]
fn test_silent_leader_is_replaced() {
    let mut net = Network::new(4);
    net.silence(0);
    // Node 0 keeps listening, the rest give up on round 1
    for node in 1..4 {
        net.timeout(node);
    }
    net.run();

    // Node 0 followed the others through the round-change signal
    assert!(net.log.iter().any(|d| d.to == 0 && d.directive == Directive::StartTimer));
    assert_eq!(net.decided_values(), vec![Some(Value::Int(4)); 4]);
    assert!(net.nodes.iter().all(|n| n.round() == 2));
}

#[test]
fn test_prepared_value_is_reproposed() {
    let mut net = Network::new(4);
    net.drop_kind(MessageType::Commit);
    for node in 0..4 {
        net.inject(node, Message::pre_prepare(1, 0, Value::Int(8), vec![]));
    }
    net.run();
    for node in &net.nodes {
        assert_eq!(node.phase(), ConsensusPhase::Committed);
        assert_eq!((node.prepared_round(), node.prepared_value()), (1, Some(&Value::Int(8))));
    }

    net.restore();
    net.timeout_undecided();
    net.run();

    // A fresh round-2 proposal would have been 4
    let proposal = net
        .log
        .iter()
        .map(|d| &d.message)
        .find(|m| m.kind() == MessageType::PrePrepare && m.round() == 2)
        .expect("round 2 proposal");
    assert_eq!(proposal.sender(), 1);
    assert_eq!(proposal.value(), Some(&Value::Int(8)));
    assert!(proposal.justification().len() >= 3);
    assert_eq!(net.decided_values(), vec![Some(Value::Int(8)); 4]);
}

#[test]
fn test_prepare_from_unknown_sender() {
    let (mut node, _) = single_node(4, 1, |c| c);
    node.process(Message::prepare(1, 2, Value::Int(2)));
    let before = node.store().len();

    assert_eq!(node.process(Message::prepare(1, 4, Value::Int(2))), Directive::MessageRejected);
    assert_eq!(node.store().len(), before);
    assert!(node.store().get_messages(1, MessageType::Prepare).iter().all(|m| m.sender() != 4));
}

#[test]
fn test_sub_quorum_prepare_proof_breaks_the_chain() {
    let (mut node, _) = single_node(4, 3, |c| c);
    let weak_proof: Vec<_> = (0..2).map(|s| Message::prepare(2, s, Value::Int(6))).collect();
    let round_changes = vec![
        Message::round_change(3, 0, 2, Some(Value::Int(6)), weak_proof),
        Message::round_change(3, 1, 0, None, vec![]),
        Message::round_change(3, 3, 0, None, vec![]),
    ];
    // Round 3 is led by node 2
    let proposal = Message::pre_prepare(3, 2, Value::Int(6), round_changes);

    assert_eq!(
        node.justify_pre_prepare(&proposal).unwrap_err(),
        ValidationError::InsufficientJustification { kind: MessageType::Prepare, got: 2, needed: 3 }
    );
    assert_eq!(node.process(proposal), Directive::MessageRejected);
    assert!(node.store().is_empty());
}

#[test]
fn test_future_round_change_signal() {
    let (mut node, out) = single_node(4, 1, |c| c);
    assert_eq!(node.process(Message::round_change(3, 0, 0, None, vec![])), Directive::NoChange);
    assert_eq!(node.round(), 1);

    assert_eq!(node.process(Message::round_change(2, 2, 0, None, vec![])), Directive::StartTimer);
    assert_eq!((node.phase(), node.round(), node.leader()), (ConsensusPhase::RoundChanged, 2, 1));
    assert_eq!(out.take(), vec![Message::round_change(2, 1, 0, None, vec![])]);
}

#[test]
fn test_buffered_messages_are_replayed_after_timeout() {
    let proposal = Message::pre_prepare(
        2,
        1,
        Value::Int(4),
        (0..3).map(|s| Message::round_change(2, s, 0, None, vec![])).collect(),
    );
    let prepares: Vec<_> = (0..3).map(|s| Message::prepare(2, s, Value::Int(4))).collect();

    let (mut node, out) = single_node(4, 3, |c| c);
    assert_eq!(node.process(proposal.clone()), Directive::FutureMessage);
    for p in &prepares {
        assert_eq!(node.process(p.clone()), Directive::FutureMessage);
    }
    // Accepting the buffered proposal restarts the timer for round 2
    assert_eq!(node.on_round_timeout(), Directive::StartTimer);
    assert_eq!(node.phase(), ConsensusPhase::Committed);
    assert_eq!(
        out.take(),
        vec![
            Message::round_change(2, 3, 0, None, vec![]),
            Message::prepare(2, 3, Value::Int(4)),
            Message::commit(2, 3, Value::Int(4)),
        ]
    );

    let (mut lazy, out) = single_node(4, 3, |c| c.with_reconsider_buffered(false));
    lazy.process(proposal);
    for p in prepares {
        lazy.process(p);
    }
    assert_eq!(lazy.on_round_timeout(), Directive::NoChange);
    assert_eq!(lazy.phase(), ConsensusPhase::RoundTimeout);
    assert_eq!(out.take().len(), 1);
}

#[test]
fn test_coupled_prepared_pair() {
    let proof: Vec<_> = (0..3).map(|s| Message::prepare(0, s, Value::Int(4))).collect();
    let rc = Message::round_change(2, 0, 0, Some(Value::Int(4)), proof);

    let (mut loose, _) = single_node(4, 1, |c| c);
    assert_eq!(loose.process(rc.clone()), Directive::NoChange);

    let (mut strict, _) = single_node(4, 1, |c| c.with_prepared_pair_check(PreparedPairCheck::Coupled));
    assert_eq!(strict.process(rc), Directive::MessageRejected);
}

#[test]
fn test_decided_node_rejects_everything() {
    let mut net = Network::new(4);
    net.start();
    net.run();

    let node = &mut net.nodes[2];
    assert_eq!(node.process(Message::round_change(5, 0, 0, None, vec![])), Directive::MessageRejected);
    assert_eq!(node.on_round_timeout(), Directive::NoChange);
    assert_eq!((node.phase(), node.round()), (ConsensusPhase::Decided, 1));
}

#[test]
fn test_round_zero_messages_never_count() {
    let (mut node, _) = single_node(4, 1, |c| c);
    for sender in [0, 2, 3] {
        assert_eq!(node.process(Message::commit(0, sender, Value::Int(2))), Directive::MessageRejected);
    }
    assert!(node.store().is_empty());
    assert_eq!(node.decided_value(), None);
    assert_eq!((node.phase(), node.round()), (ConsensusPhase::PrePrepared, 1));
}

#[test]
fn test_last_round_is_unreachable() {
    let (mut node, _) = single_node(4, 1, |c| c);
    for sender in [0, 2] {
        assert_eq!(
            node.process(Message::round_change(u64::MAX, sender, 0, None, vec![])),
            Directive::MessageRejected
        );
    }
    assert_eq!(node.round(), 1);

    // Jumping to the last valid round still leaves one timeout of headroom
    node.process(Message::round_change(u64::MAX - 1, 0, 0, None, vec![]));
    assert_eq!(node.process(Message::round_change(u64::MAX - 1, 2, 0, None, vec![])), Directive::StartTimer);
    assert_eq!(node.round(), u64::MAX - 1);

    node.on_round_timeout();
    assert_eq!(node.round(), u64::MAX);
    assert_eq!(node.on_round_timeout(), Directive::NoChange);
    assert_eq!((node.phase(), node.round()), (ConsensusPhase::RoundTimeout, u64::MAX));
}
