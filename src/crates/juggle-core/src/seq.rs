//! Lazy, nestable sequences with lookahead.
//!
//! A sequence is a tree: leaves are plain item lists, inner nodes concatenate
//! child sequences. Every node may repeat a finite or unbounded number of
//! times, and may splice replacement items over its first pass (entry) and
//! its last pass (exit). Peeking ahead with [`Sequence::get_item`] never
//! changes what [`Sequence::next_item`] yields.

use crate::error::SequenceError;
use std::collections::VecDeque;

/// Maximum nesting depth walked while pulling items
pub const MAX_DEPTH: usize = 99;

type Result<T> = std::result::Result<T, SequenceError>;

/// How many passes a node makes over its body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    Finite(usize),
    Infinite,
}

impl Iterations {
    fn is_last(&self, pass: usize) -> bool {
        matches!(self, Iterations::Finite(n) if pass + 1 == *n)
    }

    fn is_done(&self, pass: usize) -> bool {
        matches!(self, Iterations::Finite(n) if pass >= *n)
    }
}

/// Replacement of the first and/or last `count` leaves of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Splice<T> {
    pub count: usize,
    pub entry: Option<Vec<T>>,
    pub exit: Option<Vec<T>>,
}

/// Result of a bulk pull
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    /// Items still owed when the pull stopped
    pub remaining: usize,
    pub items: Vec<T>,
    pub exhausted: bool,
}

#[derive(Debug, Clone)]
enum Body<T> {
    Items { items: Vec<T>, next: usize },
    Children { children: Vec<Sequence<T>>, current: usize },
}

#[derive(Debug, Clone)]
struct Node<T> {
    body: Body<T>,
    iterations: Iterations,
    splice: Option<Splice<T>>,
    pass: usize,
    /// Raw leaves consumed in the current pass
    leaf: usize,
    entered: bool,
    exiting: bool,
    exhausted: bool,
    pending: VecDeque<T>,
}

impl<T: Clone> Node<T> {
    fn new(body: Body<T>, iterations: Iterations) -> Self {
        Node {
            body,
            iterations,
            splice: None,
            pass: 0,
            leaf: 0,
            entered: false,
            exiting: false,
            exhausted: false,
            pending: VecDeque::new(),
        }
    }

    /// Leaves in one pass over the body, `None` when unbounded
    fn pass_len(&self) -> Option<usize> {
        match &self.body {
            Body::Items { items, .. } => Some(items.len()),
            Body::Children { children, .. } => children.iter().map(|c| c.total_len()).sum(),
        }
    }

    fn total_len(&self) -> Option<usize> {
        let pass = self.pass_len()?;
        if pass == 0 {
            return Some(0);
        }
        let Iterations::Finite(n) = self.iterations else {
            return None;
        };
        if n == 0 {
            return Some(0);
        }
        let mut total = pass * n;
        if let Some(splice) = &self.splice {
            if let Some(entry) = &splice.entry {
                total = total - splice.count + entry.len();
            }
            if let Some(exit) = &splice.exit {
                total = total - splice.count + exit.len();
            }
        }
        Some(total)
    }

    fn rewind_body(&mut self) {
        match &mut self.body {
            Body::Items { next, .. } => *next = 0,
            Body::Children { children, current } => {
                *current = 0;
                children.iter_mut().for_each(Sequence::rewind);
            }
        }
        self.leaf = 0;
        self.exiting = false;
    }

    fn rewind(&mut self) {
        self.rewind_body();
        self.pass = 0;
        self.entered = false;
        self.exhausted = matches!(self.iterations, Iterations::Finite(0));
        self.pending.clear();
    }

    fn raw_next(&mut self, depth: usize) -> Result<Option<T>> {
        let item = match &mut self.body {
            Body::Items { items, next } => {
                let item = items.get(*next).cloned();
                if item.is_some() {
                    *next += 1;
                }
                item
            }
            Body::Children { children, current } => loop {
                let Some(child) = children.get_mut(*current) else {
                    break None;
                };
                if let Some(item) = child.advance(depth + 1)? {
                    break Some(item);
                }
                *current += 1;
            },
        };
        if item.is_some() {
            self.leaf += 1;
        }
        Ok(item)
    }

    fn skip_raw(&mut self, count: usize, depth: usize) -> Result<()> {
        for _ in 0..count {
            if self.raw_next(depth)?.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn end_pass(&mut self) {
        self.pass += 1;
        if self.iterations.is_done(self.pass) || self.pass_len() == Some(0) {
            self.exhausted = true;
        } else {
            self.rewind_body();
        }
    }

    fn advance(&mut self, depth: usize) -> Result<Option<T>> {
        if depth > MAX_DEPTH {
            return Err(SequenceError::RecursionLimit {
                depth,
                limit: MAX_DEPTH,
            });
        }
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }
            if self.exhausted {
                return Ok(None);
            }

            let shape = self
                .splice
                .as_ref()
                .map(|s| (s.count, s.entry.is_some(), s.exit.is_some()));
            if let Some((count, has_entry, has_exit)) = shape {
                if self.pass == 0 && !self.entered {
                    self.entered = true;
                    if has_entry {
                        let entry = self.splice.as_ref().and_then(|s| s.entry.clone());
                        self.pending.extend(entry.unwrap_or_default());
                        self.skip_raw(count, depth)?;
                        continue;
                    }
                }
                if has_exit && !self.exiting && self.iterations.is_last(self.pass) {
                    let len = self.pass_len().unwrap_or(usize::MAX);
                    if self.leaf >= len.saturating_sub(count) {
                        self.exiting = true;
                        let exit = self.splice.as_ref().and_then(|s| s.exit.clone());
                        self.pending.extend(exit.unwrap_or_default());
                        self.skip_raw(count, depth)?;
                        continue;
                    }
                }
            }

            match self.raw_next(depth)? {
                Some(item) => return Ok(Some(item)),
                None => self.end_pass(),
            }
        }
    }
}

/// A plain, single-pass list of items
#[derive(Debug, Clone)]
pub struct Seq<T> {
    node: Node<T>,
}

/// A list of items repeated a number of times (possibly forever)
#[derive(Debug, Clone)]
pub struct RepeatSeq<T> {
    node: Node<T>,
}

/// Concatenated child sequences, repeated a number of times
#[derive(Debug, Clone)]
pub struct HierRepeatSeq<T> {
    node: Node<T>,
}

impl<T: Clone> Seq<T> {
    pub fn new(items: Vec<T>) -> Self {
        Seq {
            node: Node::new(Body::Items { items, next: 0 }, Iterations::Finite(1)),
        }
    }
}

impl<T: Clone> RepeatSeq<T> {
    pub fn new(items: Vec<T>, iterations: Iterations) -> Self {
        let mut node = Node::new(Body::Items { items, next: 0 }, iterations);
        node.rewind();
        RepeatSeq { node }
    }
}

impl<T: Clone> HierRepeatSeq<T> {
    pub fn new(children: Vec<Sequence<T>>, iterations: Iterations) -> Self {
        let mut node = Node::new(
            Body::Children {
                children,
                current: 0,
            },
            iterations,
        );
        node.rewind();
        HierRepeatSeq { node }
    }
}

/// One of the three sequence kinds, plus its lookahead buffer
#[derive(Debug, Clone)]
pub struct Sequence<T> {
    kind: Kind<T>,
    lookahead: VecDeque<T>,
}

#[derive(Debug, Clone)]
enum Kind<T> {
    Seq(Seq<T>),
    Repeat(RepeatSeq<T>),
    Hier(HierRepeatSeq<T>),
}

impl<T: Clone> From<Seq<T>> for Sequence<T> {
    fn from(seq: Seq<T>) -> Self {
        Sequence::wrap(Kind::Seq(seq))
    }
}

impl<T: Clone> From<RepeatSeq<T>> for Sequence<T> {
    fn from(seq: RepeatSeq<T>) -> Self {
        Sequence::wrap(Kind::Repeat(seq))
    }
}

impl<T: Clone> From<HierRepeatSeq<T>> for Sequence<T> {
    fn from(seq: HierRepeatSeq<T>) -> Self {
        Sequence::wrap(Kind::Hier(seq))
    }
}

impl<T: Clone> Sequence<T> {
    fn wrap(kind: Kind<T>) -> Self {
        Sequence {
            kind,
            lookahead: VecDeque::new(),
        }
    }

    /// Single pass over `items`
    pub fn seq(items: Vec<T>) -> Self {
        Seq::new(items).into()
    }

    /// `items` repeated `iterations` times
    pub fn repeat(items: Vec<T>, iterations: Iterations) -> Self {
        RepeatSeq::new(items, iterations).into()
    }

    /// `children` concatenated and repeated `iterations` times
    pub fn hier(children: Vec<Sequence<T>>, iterations: Iterations) -> Self {
        HierRepeatSeq::new(children, iterations).into()
    }

    fn node(&self) -> &Node<T> {
        match &self.kind {
            Kind::Seq(s) => &s.node,
            Kind::Repeat(s) => &s.node,
            Kind::Hier(s) => &s.node,
        }
    }

    fn node_mut(&mut self) -> &mut Node<T> {
        match &mut self.kind {
            Kind::Seq(s) => &mut s.node,
            Kind::Repeat(s) => &mut s.node,
            Kind::Hier(s) => &mut s.node,
        }
    }

    /// Replace the first `count` leaves of the first pass with `entry` and the
    /// last `count` leaves of the final pass with `exit`.
    pub fn with_splice(
        mut self,
        count: usize,
        entry: Option<Vec<T>>,
        exit: Option<Vec<T>>,
    ) -> Result<Self> {
        let node = self.node();
        let pass_len = node.pass_len();
        if let Some(len) = pass_len {
            if count > len {
                return Err(SequenceError::Config(format!(
                    "splice of {count} leaves exceeds pass length {len}"
                )));
            }
            let single = node.iterations == Iterations::Finite(1);
            if single && entry.is_some() && exit.is_some() && 2 * count > len {
                return Err(SequenceError::Config(format!(
                    "entry and exit splices of {count} overlap in a pass of {len}"
                )));
            }
        }
        if exit.is_some() {
            if !matches!(node.iterations, Iterations::Finite(n) if n > 0) {
                return Err(SequenceError::Config(
                    "exit splice needs a finite number of passes".into(),
                ));
            }
            if pass_len.is_none() {
                return Err(SequenceError::Config(
                    "exit splice needs a bounded pass".into(),
                ));
            }
        }
        self.node_mut().splice = Some(Splice { count, entry, exit });
        self.rewind();
        Ok(self)
    }

    /// Consume the next item
    pub fn next_item(&mut self) -> Result<Option<T>> {
        if let Some(item) = self.lookahead.pop_front() {
            return Ok(Some(item));
        }
        self.advance(0)
    }

    /// Peek `index` items ahead without consuming anything
    pub fn get_item(&mut self, index: usize) -> Result<Option<T>> {
        self.sync_look_ahead(index + 1)?;
        Ok(self.lookahead.get(index).cloned())
    }

    /// Make sure at least `count` items are buffered, if the sequence has them
    pub fn sync_look_ahead(&mut self, count: usize) -> Result<()> {
        if self.lookahead.len() < count {
            let owed = count - self.lookahead.len();
            let batch = self.node_mut().take(owed, 0)?;
            self.lookahead.extend(batch.items);
        }
        Ok(())
    }

    /// Pull up to `count` items, reporting how many could not be produced
    pub fn get_items(&mut self, count: usize) -> Result<Batch<T>> {
        let mut items: Vec<T> = Vec::with_capacity(count);
        while items.len() < count {
            match self.lookahead.pop_front() {
                Some(item) => items.push(item),
                None => break,
            }
        }
        let mut batch = self.node_mut().take(count - items.len(), 0)?;
        items.append(&mut batch.items);
        batch.items = items;
        Ok(batch)
    }

    fn advance(&mut self, depth: usize) -> Result<Option<T>> {
        if let Some(item) = self.lookahead.pop_front() {
            return Ok(Some(item));
        }
        self.node_mut().advance(depth)
    }

    /// Leaves in one pass, `None` when unbounded
    pub fn period(&self) -> Option<usize> {
        self.node().pass_len()
    }

    /// Leaves in the whole sequence, `None` when unbounded
    pub fn total_len(&self) -> Option<usize> {
        self.node().total_len()
    }

    pub fn iterations(&self) -> Iterations {
        self.node().iterations
    }

    /// True once no more items can be produced
    pub fn is_exhausted(&self) -> bool {
        self.lookahead.is_empty() && self.node().exhausted && self.node().pending.is_empty()
    }

    /// The flattened body of one pass, without splices. `None` if a child is
    /// unbounded.
    pub fn get_seq(&self) -> Result<Option<Vec<T>>> {
        match &self.node().body {
            Body::Items { items, .. } => Ok(Some(items.clone())),
            Body::Children { children, .. } => {
                let mut out = Vec::new();
                for child in children {
                    if child.total_len().is_none() {
                        return Ok(None);
                    }
                    let mut fresh = child.clone();
                    fresh.rewind();
                    while let Some(item) = fresh.next_item()? {
                        out.push(item);
                    }
                }
                Ok(Some(out))
            }
        }
    }

    /// Restart from the first item, discarding any lookahead
    pub fn rewind(&mut self) {
        self.lookahead.clear();
        self.node_mut().rewind();
    }
}

impl<T: Clone> Node<T> {
    fn take(&mut self, count: usize, depth: usize) -> Result<Batch<T>> {
        let mut items = Vec::with_capacity(count);
        while items.len() < count {
            match self.advance(depth)? {
                Some(item) => items.push(item),
                None => {
                    return Ok(Batch {
                        remaining: count - items.len(),
                        items,
                        exhausted: true,
                    })
                }
            }
        }
        Ok(Batch {
            remaining: 0,
            items,
            exhausted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(seq: &mut Sequence<i32>, limit: usize) -> Vec<i32> {
        let mut out = Vec::new();
        while out.len() < limit {
            match seq.next_item().unwrap() {
                Some(x) => out.push(x),
                None => break,
            }
        }
        out
    }

    #[test]
    fn test_seq_single_pass() {
        let mut seq = Sequence::seq(vec![1, 2, 3]);
        assert_eq!(drain(&mut seq, 10), vec![1, 2, 3]);
        assert!(seq.is_exhausted());
        assert_eq!(seq.next_item().unwrap(), None);
    }

    #[test]
    fn test_repeat_finite() {
        let mut seq = Sequence::repeat(vec![1, 2], Iterations::Finite(3));
        assert_eq!(drain(&mut seq, 10), vec![1, 2, 1, 2, 1, 2]);
        assert_eq!(seq.total_len(), Some(6));
    }

    #[test]
    fn test_repeat_infinite() {
        let mut seq = Sequence::repeat(vec![7, 8, 9], Iterations::Infinite);
        assert_eq!(drain(&mut seq, 7), vec![7, 8, 9, 7, 8, 9, 7]);
        assert_eq!(seq.period(), Some(3));
        assert_eq!(seq.total_len(), None);
    }

    #[test]
    fn test_hier_entry_exit() {
        let child = Sequence::repeat(vec![1, 2, 3], Iterations::Finite(1));
        let mut seq = Sequence::hier(vec![child], Iterations::Finite(2))
            .with_splice(1, Some(vec![0]), Some(vec![9]))
            .unwrap();
        assert_eq!(drain(&mut seq, 10), vec![0, 2, 3, 1, 2, 9]);
    }

    #[test]
    fn test_single_pass_entry_and_exit() {
        let mut seq = Sequence::seq(vec![1, 2, 3, 4])
            .with_splice(2, Some(vec![10]), Some(vec![20, 21, 22]))
            .unwrap();
        assert_eq!(drain(&mut seq, 10), vec![10, 20, 21, 22]);
    }

    #[test]
    fn test_overlapping_splice_rejected() {
        let result = Sequence::seq(vec![1, 2, 3]).with_splice(2, Some(vec![0]), Some(vec![9]));
        assert!(matches!(result, Err(SequenceError::Config(_))));
    }

    #[test]
    fn test_exit_on_infinite_rejected() {
        let result = Sequence::repeat(vec![1, 2], Iterations::Infinite).with_splice(1, None, Some(vec![9]));
        assert!(result.is_err());
    }

    #[test]
    fn test_lookahead_does_not_consume() {
        let mut seq = Sequence::repeat(vec![1, 2, 3], Iterations::Infinite);
        assert_eq!(seq.get_item(4).unwrap(), Some(2));
        assert_eq!(seq.get_item(0).unwrap(), Some(1));
        assert_eq!(drain(&mut seq, 5), vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn test_lookahead_past_end() {
        let mut seq = Sequence::seq(vec![1, 2]);
        assert_eq!(seq.get_item(5).unwrap(), None);
        assert_eq!(drain(&mut seq, 5), vec![1, 2]);
    }

    #[test]
    fn test_get_items_reports_remaining() {
        let mut seq = Sequence::seq(vec![1, 2, 3]);
        seq.get_item(0).unwrap();
        let batch = seq.get_items(5).unwrap();
        assert_eq!(batch.items, vec![1, 2, 3]);
        assert_eq!(batch.remaining, 2);
        assert!(batch.exhausted);
    }

    #[test]
    fn test_get_seq_flattens_children() {
        let seq = Sequence::hier(
            vec![
                Sequence::repeat(vec![1], Iterations::Finite(2)),
                Sequence::seq(vec![2, 3]),
            ],
            Iterations::Infinite,
        );
        assert_eq!(seq.get_seq().unwrap(), Some(vec![1, 1, 2, 3]));
        assert_eq!(seq.period(), Some(4));
    }

    #[test]
    fn test_rewind() {
        let mut seq = Sequence::repeat(vec![1, 2, 3], Iterations::Finite(1));
        drain(&mut seq, 2);
        seq.rewind();
        assert_eq!(drain(&mut seq, 10), vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_infinite_is_exhausted() {
        let mut seq: Sequence<i32> = Sequence::repeat(vec![], Iterations::Infinite);
        assert_eq!(seq.next_item().unwrap(), None);
    }

    #[test]
    fn test_get_seq_unbounded_child() {
        let seq = Sequence::hier(
            vec![
                Sequence::seq(vec![1]),
                Sequence::repeat(vec![2], Iterations::Infinite),
            ],
            Iterations::Finite(1),
        );
        assert_eq!(seq.get_seq().unwrap(), None);
    }

    #[test]
    fn test_get_seq_reports_depth_limit() {
        let mut deep = Sequence::seq(vec![1]);
        for _ in 0..(MAX_DEPTH + 2) {
            deep = Sequence::hier(vec![deep], Iterations::Finite(1));
        }
        let seq = Sequence::hier(vec![Sequence::seq(vec![0]), deep], Iterations::Finite(1));
        assert!(matches!(
            seq.get_seq(),
            Err(SequenceError::RecursionLimit { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let mut seq = Sequence::seq(vec![1]);
        for _ in 0..(MAX_DEPTH + 2) {
            seq = Sequence::hier(vec![seq], Iterations::Finite(1));
        }
        assert!(matches!(
            seq.next_item(),
            Err(SequenceError::RecursionLimit { .. })
        ));
    }
}
