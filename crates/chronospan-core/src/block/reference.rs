//! Reference node: delegates evaluation to a named entry in the registry.

use std::cell::Cell;
use std::fmt;
use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::block::{EvalCtx, MergeState};
use crate::error::{Result, SpanError};
use crate::interval::Interval;

/// A block referring to a registered schedule by alphanumeric ID.
///
/// The referenced block stays owned by the registry; evaluation resolves the
/// ID through the [`crate::Schedule`] supplied in the call. IDs on the active
/// resolution path are tracked so cyclic registries fail with a
/// `ReferenceError` instead of recursing forever.
#[derive(Debug, Clone)]
pub struct ReferenceBlock {
    id: String,
    merge: MergeState,
    hash: Cell<Option<u64>>,
}

impl ReferenceBlock {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(SpanError::InvalidId { id });
        }
        Ok(Self {
            id,
            merge: MergeState::Default,
            hash: Cell::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn merge_state(&self) -> MergeState {
        self.merge
    }

    pub fn set_merge_state(&mut self, state: MergeState) {
        self.merge = state;
        self.hash.set(None);
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        if let Some(hash) = self.hash.get() {
            return hash;
        }
        let mut hasher = FxHasher::default();
        hasher.write_u8(4);
        std::hash::Hash::hash(&self.merge, &mut hasher);
        hasher.write(self.id.as_bytes());
        let hash = hasher.finish();
        self.hash.set(Some(hash));
        hash
    }

    pub(crate) fn eval(
        &self,
        start: i64,
        end: i64,
        merge: bool,
        ctx: &mut EvalCtx<'_>,
    ) -> Result<Vec<Interval>> {
        let schedule = ctx
            .schedule
            .ok_or_else(|| SpanError::reference(&self.id, "no schedule provided"))?;
        let entry = schedule
            .get(&self.id)
            .ok_or_else(|| SpanError::reference(&self.id, "not found in schedule"))?;
        if !ctx.visiting.insert(self.id.clone()) {
            return Err(SpanError::reference(&self.id, "cyclic reference"));
        }
        // The referenced block's own merge state may override again.
        let result = entry.block.eval(start, end, self.merge.resolve(merge), ctx);
        ctx.visiting.remove(&self.id);
        result
    }

    pub(crate) fn eval_timestamp(&self, t: i64, ctx: &mut EvalCtx<'_>) -> Result<bool> {
        let schedule = ctx
            .schedule
            .ok_or_else(|| SpanError::reference(&self.id, "no schedule provided"))?;
        let entry = schedule
            .get(&self.id)
            .ok_or_else(|| SpanError::reference(&self.id, "not found in schedule"))?;
        if !ctx.visiting.insert(self.id.clone()) {
            return Err(SpanError::reference(&self.id, "cyclic reference"));
        }
        let result = entry.block.eval_timestamp(t, ctx);
        ctx.visiting.remove(&self.id);
        result
    }
}

impl PartialEq for ReferenceBlock {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.merge == other.merge
    }
}

impl fmt::Display for ReferenceBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REF[{}]", self.id)
    }
}
