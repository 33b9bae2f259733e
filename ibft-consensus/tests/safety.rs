mod common;

use common::Network;
use ibft_common::{Message, Value};

/// Leader 0 equivocates in round 1: half the nodes see 2, the other half 4.
fn equivocating_run(seed: u64) -> Network {
    let mut net = Network::new(4).shuffled(seed);
    net.inject(0, Message::pre_prepare(1, 0, Value::Int(2), vec![]));
    net.inject(1, Message::pre_prepare(1, 0, Value::Int(2), vec![]));
    net.inject(2, Message::pre_prepare(1, 0, Value::Int(4), vec![]));
    net.inject(3, Message::pre_prepare(1, 0, Value::Int(4), vec![]));
    net.run();

    for _ in 0..5 {
        if net.all_decided() {
            break;
        }
        net.timeout_undecided();
        net.run();
    }
    net
}

#[test]
fn test_equivocating_leader_cannot_split_decisions() {
    for seed in 0..25 {
        let net = equivocating_run(seed);
        let decided: Vec<_> = net.decided_values().into_iter().flatten().collect();

        assert_eq!(decided.len(), 4, "seed {seed}: every node decides");
        assert!(decided.windows(2).all(|w| w[0] == w[1]), "seed {seed}: split decision {decided:?}");
    }
}

#[test]
fn test_shuffled_happy_path() {
    for seed in 100..110 {
        let mut net = Network::new(4).shuffled(seed);
        net.start();
        net.run();
        assert_eq!(net.decided_values(), vec![Some(Value::Int(2)); 4], "seed {seed}");
    }
}

#[test]
fn test_two_silent_nodes_out_of_seven() {
    let mut net = Network::new(7).shuffled(7);
    net.silence(5);
    net.silence(6);
    net.start();
    net.run();
    // 5 of 7 live: Q = 5
    assert!(net.all_decided());
    assert!(net.decided_values().iter().all(|v| *v == Some(Value::Int(2))));
}
