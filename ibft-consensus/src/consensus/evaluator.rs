use std::cmp::Reverse;
use std::collections::{BTreeMap, HashSet};

use ibft_common::{Message, NodeRegistry, Value, Weight};
use serde::{Deserialize, Serialize};

/// How the two weight thresholds of a protocol instance are chosen.
///
/// Unset fields fall back to the classic BFT bounds over the registry's total
/// weight `W`: Byzantine quorum `⌊2W/3⌋ + 1`, round-change threshold `⌊W/3⌋ + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuorumPolicy {
    #[serde(default)]
    pub byzantine_quorum: Option<Weight>,
    #[serde(default)]
    pub round_change_threshold: Option<Weight>,
}

impl QuorumPolicy {
    pub fn explicit(byzantine_quorum: Weight, round_change_threshold: Weight) -> Self {
        Self {
            byzantine_quorum: Some(byzantine_quorum),
            round_change_threshold: Some(round_change_threshold),
        }
    }

    pub fn thresholds(&self, registry: &NodeRegistry) -> Thresholds {
        let bft = Thresholds::bft(registry.total_weight());
        Thresholds {
            byzantine_quorum: self.byzantine_quorum.unwrap_or(bft.byzantine_quorum),
            round_change: self.round_change_threshold.unwrap_or(bft.round_change),
        }
    }
}

/// Resolved weight thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Weight needed to certify a PREPARE/COMMIT/ROUND_CHANGE quorum.
    pub byzantine_quorum: Weight,
    /// Weight of later-round ROUND_CHANGE signals needed to jump ahead.
    pub round_change: Weight,
}

impl Thresholds {
    // Q = floor(total * 2 / 3) + 1
    pub fn bft(total_weight: Weight) -> Self {
        Self {
            byzantine_quorum: total_weight * 2 / 3 + 1,
            round_change: total_weight / 3 + 1,
        }
    }
}

/// Result of tallying messages by the value they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub value: Value,
    pub weight: Weight,
    /// The messages backing `value`, in input order.
    pub supporters: Vec<Message>,
}

/// Picks the value with the most supporting weight among `messages`.
///
/// Each sender counts once and unknown senders weigh nothing. Ties go to the
/// lowest [`Value`].
pub fn best_supported(messages: &[Message], registry: &NodeRegistry) -> Option<Tally> {
    let mut by_value: BTreeMap<&Value, (Weight, Vec<&Message>)> = BTreeMap::new();
    let mut seen = HashSet::new();

    for msg in messages {
        let Some(value) = msg.value() else { continue };
        if !seen.insert(msg.sender()) {
            continue;
        }
        let entry = by_value.entry(value).or_default();
        entry.0 += registry.weight_of(msg.sender()).unwrap_or(0);
        entry.1.push(msg);
    }

    let mut best: Option<(&Value, Weight, Vec<&Message>)> = None;
    for (value, (weight, supporters)) in by_value {
        // Strictly greater: the first (lowest) value keeps a tie.
        if best.as_ref().map_or(true, |(_, w, _)| weight > *w) {
            best = Some((value, weight, supporters));
        }
    }

    best.map(|(value, weight, supporters)| Tally {
        value: value.clone(),
        weight,
        supporters: supporters.into_iter().cloned().collect(),
    })
}

/// Summed weight of the distinct senders of `messages`.
pub fn sender_weight<'a>(messages: impl IntoIterator<Item = &'a Message>, registry: &NodeRegistry) -> Weight {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|m| seen.insert(m.sender()))
        .map(|m| registry.weight_of(m.sender()).unwrap_or(0))
        .sum()
}

/// The ROUND_CHANGE with the highest `prepared_round`.
///
/// Among equals, one that carries a prepared value wins, then the lowest sender.
pub fn highest_prepared(round_changes: &[Message]) -> Option<&Message> {
    round_changes
        .iter()
        .filter_map(|m| m.prepared().map(|(round, value)| (m, round, value.is_some())))
        .max_by_key(|(m, round, has_value)| (*round, *has_value, Reverse(m.sender())))
        .map(|(m, _, _)| m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibft_common::NodeInfo;

    fn weighted(weights: &[Weight]) -> NodeRegistry {
        NodeRegistry::new(
            weights
                .iter()
                .enumerate()
                .map(|(i, w)| NodeInfo::new(i as u64, *w, vec![]).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_bft_thresholds() {
        // 4 nodes -> f=1 -> quorum=3, round change=2
        assert_eq!(Thresholds::bft(4), Thresholds { byzantine_quorum: 3, round_change: 2 });
        assert_eq!(Thresholds::bft(7), Thresholds { byzantine_quorum: 5, round_change: 3 });
        assert_eq!(Thresholds::bft(1), Thresholds { byzantine_quorum: 1, round_change: 1 });
    }

    #[test]
    fn test_policy_overrides() {
        let registry = NodeRegistry::uniform(4).unwrap();
        assert_eq!(QuorumPolicy::default().thresholds(&registry), Thresholds::bft(4));

        let partial = QuorumPolicy { byzantine_quorum: Some(4), round_change_threshold: None };
        assert_eq!(partial.thresholds(&registry), Thresholds { byzantine_quorum: 4, round_change: 2 });
    }

    #[test]
    fn test_weighted_tally() {
        let registry = weighted(&[5, 1, 1, 1]);
        let msgs = vec![
            Message::prepare(1, 1, Value::Int(2)),
            Message::prepare(1, 2, Value::Int(2)),
            Message::prepare(1, 3, Value::Int(2)),
            Message::prepare(1, 0, Value::Int(4)),
        ];
        let tally = best_supported(&msgs, &registry).unwrap();
        assert_eq!(tally.value, Value::Int(4));
        assert_eq!(tally.weight, 5);
        assert_eq!(tally.supporters, vec![msgs[3].clone()]);
    }

    #[test]
    fn test_tie_goes_to_lowest_value() {
        let registry = NodeRegistry::uniform(4).unwrap();
        let msgs = vec![
            Message::commit(1, 0, Value::Int(8)),
            Message::commit(1, 1, Value::Int(8)),
            Message::commit(1, 2, Value::Int(6)),
            Message::commit(1, 3, Value::Int(6)),
        ];
        let tally = best_supported(&msgs, &registry).unwrap();
        assert_eq!((tally.value, tally.weight), (Value::Int(6), 2));
        assert!(best_supported(&[], &registry).is_none());
    }

    #[test]
    fn test_sender_weight_counts_each_sender_once() {
        let registry = weighted(&[2, 3]);
        let msgs = [
            Message::round_change(2, 0, 0, None, vec![]),
            Message::round_change(3, 0, 0, None, vec![]),
            Message::round_change(3, 1, 0, None, vec![]),
            Message::round_change(3, 9, 0, None, vec![]),
        ];
        assert_eq!(sender_weight(&msgs, &registry), 5);
    }

    #[test]
    fn test_highest_prepared_tie_break() {
        let rcs = vec![
            Message::round_change(3, 2, 1, Some(Value::Int(4)), vec![]),
            Message::round_change(3, 0, 2, None, vec![]),
            Message::round_change(3, 3, 2, Some(Value::Int(6)), vec![]),
            Message::round_change(3, 1, 2, Some(Value::Int(6)), vec![]),
        ];
        assert_eq!(highest_prepared(&rcs).unwrap().sender(), 1);
        assert!(highest_prepared(&[]).is_none());
    }
}
