//! Application hooks: what gets proposed and what counts as a valid value.
//!
//! These are the only extension points of the protocol. The state machine
//! never inspects a value beyond equality and [`ValueStrategy::validate_value`].

use ibft_common::{Round, Value};

pub trait ValueStrategy: Send + Sync {
    /// Value the leader of `round` proposes when nothing was prepared before.
    fn propose_value(&self, round: Round) -> Value;

    /// Application-level check applied to every PRE_PREPARE, PREPARE and COMMIT value.
    fn validate_value(&self, round: Round, value: &Value) -> bool;
}

/// Proposes `2 * round` and accepts any even integer.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvenValue;

impl ValueStrategy for EvenValue {
    fn propose_value(&self, round: Round) -> Value {
        Value::Int((round as i64).saturating_mul(2))
    }

    fn validate_value(&self, _round: Round, value: &Value) -> bool {
        matches!(value.as_int(), Some(v) if v % 2 == 0)
    }
}

/// Proposes and accepts exactly one value, obtained out of band
/// (a randomness beacon, a block root...).
#[derive(Debug, Clone)]
pub struct FixedValue {
    value: Value,
}

impl FixedValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl ValueStrategy for FixedValue {
    fn propose_value(&self, _round: Round) -> Value {
        self.value.clone()
    }

    fn validate_value(&self, _round: Round, value: &Value) -> bool {
        *value == self.value
    }
}
