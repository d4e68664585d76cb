//! Condition blocks: AND, OR, and NOT over child blocks.
//!
//! AND and OR evaluate children cheapest-group-first (fields, then
//! conditions, then references) and combine the per-child interval lists
//! with the sweep-line set operations. AND short-circuits to `[]` on the
//! first empty child; NOT complements its child against the domain.

use std::cell::Cell;
use std::hash::Hasher;

use rustc_hash::FxHasher;

use crate::block::{Block, EvalCtx, MergeState};
use crate::error::Result;
use crate::interval::{self, Interval};

/// Intersection of all children.
#[derive(Debug, Clone)]
pub struct AndBlock {
    children: Vec<Block>,
    merge: MergeState,
    hash: Cell<Option<u64>>,
}

/// Union of all children.
#[derive(Debug, Clone)]
pub struct OrBlock {
    children: Vec<Block>,
    merge: MergeState,
    hash: Cell<Option<u64>>,
}

/// Complement of the child against the domain. A missing child means
/// "nothing to negate": the whole domain is on.
#[derive(Debug, Clone)]
pub struct NotBlock {
    child: Option<Box<Block>>,
    merge: MergeState,
    hash: Cell<Option<u64>>,
}

/// Child indices in evaluation order: fields, then conditions, then
/// references.
fn evaluation_order(children: &[Block]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..children.len()).collect();
    order.sort_by_key(|&i| children[i].group());
    order
}

impl AndBlock {
    pub fn new(children: Vec<Block>) -> Self {
        Self {
            children,
            merge: MergeState::Default,
            hash: Cell::new(None),
        }
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    pub fn add_child(&mut self, child: Block) {
        self.children.push(child);
        self.hash.set(None);
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
        hasher.write_u8(5);
        std::hash::Hash::hash(&self.merge, &mut hasher);
        for child in &self.children {
            hasher.write_u64(child.structural_hash());
        }
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
        if self.children.is_empty() {
            return Ok(Vec::new());
        }
        let resolved = self.merge.resolve(merge);
        let mut lists = Vec::with_capacity(self.children.len());
        for i in evaluation_order(&self.children) {
            let result = self.children[i].eval(start, end, resolved, ctx)?;
            if result.is_empty() {
                return Ok(Vec::new());
            }
            lists.push(result);
        }
        Ok(interval::intersection(&lists, resolved))
    }

    pub(crate) fn eval_timestamp(&self, t: i64, ctx: &mut EvalCtx<'_>) -> Result<bool> {
        if self.children.is_empty() {
            return Ok(false);
        }
        for i in evaluation_order(&self.children) {
            if !self.children[i].eval_timestamp(t, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl OrBlock {
    pub fn new(children: Vec<Block>) -> Self {
        Self {
            children,
            merge: MergeState::Default,
            hash: Cell::new(None),
        }
    }

    pub fn children(&self) -> &[Block] {
        &self.children
    }

    pub fn add_child(&mut self, child: Block) {
        self.children.push(child);
        self.hash.set(None);
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
        hasher.write_u8(6);
        std::hash::Hash::hash(&self.merge, &mut hasher);
        for child in &self.children {
            hasher.write_u64(child.structural_hash());
        }
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
        let resolved = self.merge.resolve(merge);
        let mut lists = Vec::with_capacity(self.children.len());
        for i in evaluation_order(&self.children) {
            let result = self.children[i].eval(start, end, resolved, ctx)?;
            if !result.is_empty() {
                lists.push(result);
            }
        }
        if lists.is_empty() {
            return Ok(Vec::new());
        }
        Ok(interval::union(&lists, resolved))
    }

    pub(crate) fn eval_timestamp(&self, t: i64, ctx: &mut EvalCtx<'_>) -> Result<bool> {
        for i in evaluation_order(&self.children) {
            if self.children[i].eval_timestamp(t, ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl NotBlock {
    pub fn new(child: Option<Block>) -> Self {
        Self {
            child: child.map(Box::new),
            merge: MergeState::Default,
            hash: Cell::new(None),
        }
    }

    pub fn child(&self) -> Option<&Block> {
        self.child.as_deref()
    }

    pub(crate) fn child_mut(&mut self) -> Option<&mut Block> {
        self.hash.set(None);
        self.child.as_deref_mut()
    }

    pub fn set_child(&mut self, child: Option<Block>) {
        self.child = child.map(Box::new);
        self.hash.set(None);
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
        hasher.write_u8(7);
        std::hash::Hash::hash(&self.merge, &mut hasher);
        match &self.child {
            Some(child) => hasher.write_u64(child.structural_hash()),
            None => hasher.write_u8(0),
        }
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
        let resolved = self.merge.resolve(merge);
        match &self.child {
            None => Ok(vec![Interval::new(start, end)]),
            Some(child) => {
                let inner = child.eval(start, end, resolved, ctx)?;
                Ok(interval::complement(&inner, start, end, resolved))
            }
        }
    }

    pub(crate) fn eval_timestamp(&self, t: i64, ctx: &mut EvalCtx<'_>) -> Result<bool> {
        match &self.child {
            None => Ok(true),
            Some(child) => Ok(!child.eval_timestamp(t, ctx)?),
        }
    }
}

impl PartialEq for AndBlock {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children && self.merge == other.merge
    }
}

impl PartialEq for OrBlock {
    fn eq(&self, other: &Self) -> bool {
        self.children == other.children && self.merge == other.merge
    }
}

impl PartialEq for NotBlock {
    fn eq(&self, other: &Self) -> bool {
        self.child == other.child && self.merge == other.merge
    }
}
