//! Explicit execution context.
//!
//! Everything that would otherwise be looked up from a process-wide default
//! graph or session lives here and is threaded through calls: the device,
//! the layer-name uid counters, the learning phase, and the two iteration
//! primitives the sequence driver builds on.

use std::collections::HashMap;

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Whether layers should behave as in training or inference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearningPhase {
    #[default]
    Inference,
    Training,
}

/// Per-computation context owned by the caller.
///
/// Two driver invocations never share accumulators; they may share a context
/// for the device and naming state.
#[derive(Debug)]
pub struct ExecutionContext<B: Backend> {
    device: B::Device,
    name_uids: HashMap<String, usize>,
    learning_phase: LearningPhase,
    manual_variable_initialization: bool,
}

impl<B: Backend> ExecutionContext<B> {
    pub fn new(device: &B::Device) -> Self {
        Self {
            device: device.clone(),
            name_uids: HashMap::new(),
            learning_phase: LearningPhase::default(),
            manual_variable_initialization: false,
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Next uid for `prefix`, starting at 1. Used to name layers uniquely.
    pub fn get_uid(&mut self, prefix: &str) -> usize {
        let counter = self.name_uids.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Unique name of the form `prefix_N`.
    pub fn unique_name(&mut self, prefix: &str) -> String {
        let uid = self.get_uid(prefix);
        format!("{prefix}_{uid}")
    }

    pub fn reset_uids(&mut self) {
        self.name_uids.clear();
    }

    pub fn learning_phase(&self) -> LearningPhase {
        self.learning_phase
    }

    pub fn set_learning_phase(&mut self, training: bool) {
        self.learning_phase = if training {
            LearningPhase::Training
        } else {
            LearningPhase::Inference
        };
    }

    pub fn manual_variable_initialization(&mut self, value: bool) {
        self.manual_variable_initialization = value;
    }

    pub fn is_manual_variable_initialization(&self) -> bool {
        self.manual_variable_initialization
    }

    /// Forget naming state and learning phase; the device is kept.
    pub fn clear_session(&mut self) {
        tracing::debug!(uids = self.name_uids.len(), "clearing session state");
        self.reset_uids();
        self.learning_phase = LearningPhase::default();
        self.manual_variable_initialization = false;
    }

    /// Host-level iteration over a statically known number of steps.
    pub fn unrolled<V>(
        &self,
        steps: usize,
        init: V,
        mut body: impl FnMut(usize, V) -> Result<V>,
    ) -> Result<V> {
        let mut vars = init;
        for i in 0..steps {
            vars = body(i, vars)?;
        }
        Ok(vars)
    }

    /// Runtime-bounded repetition: run `body` while `cond` holds.
    ///
    /// The bound lives in the loop variables, not in the caller's code, so the
    /// number of iterations is whatever the runtime values dictate.
    pub fn while_loop<V>(
        &self,
        cond: impl Fn(&V) -> bool,
        mut body: impl FnMut(V) -> Result<V>,
        init: V,
    ) -> Result<V> {
        let mut vars = init;
        let mut iterations = 0usize;
        while cond(&vars) {
            vars = body(vars)?;
            iterations += 1;
        }
        tracing::trace!(iterations, "while_loop finished");
        Ok(vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_uids_per_prefix() {
        let mut ctx = ExecutionContext::<TestBackend>::new(&Default::default());
        assert_eq!(ctx.get_uid("dense"), 1);
        assert_eq!(ctx.get_uid("dense"), 2);
        assert_eq!(ctx.get_uid("rnn"), 1);
        assert_eq!(ctx.unique_name("dense"), "dense_3");
        ctx.reset_uids();
        assert_eq!(ctx.get_uid("dense"), 1);
    }

    #[test]
    fn test_clear_session_resets_phase() {
        let mut ctx = ExecutionContext::<TestBackend>::new(&Default::default());
        ctx.set_learning_phase(true);
        ctx.manual_variable_initialization(true);
        assert_eq!(ctx.learning_phase(), LearningPhase::Training);
        ctx.clear_session();
        assert_eq!(ctx.learning_phase(), LearningPhase::Inference);
        assert!(!ctx.is_manual_variable_initialization());
    }

    #[test]
    fn test_while_loop_runs_to_bound() {
        let ctx = ExecutionContext::<TestBackend>::new(&Default::default());
        let (n, acc) = ctx
            .while_loop(|(t, _)| *t < 4, |(t, acc)| Ok((t + 1, acc + t)), (0usize, 0usize))
            .unwrap();
        assert_eq!(n, 4);
        assert_eq!(acc, 6);
    }

    #[test]
    fn test_unrolled_visits_each_index() {
        let ctx = ExecutionContext::<TestBackend>::new(&Default::default());
        let seen = ctx
            .unrolled(3, Vec::new(), |i, mut v| {
                v.push(i);
                Ok(v)
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
    }
}
