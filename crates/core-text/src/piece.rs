//! Undoable piece-table buffer.
//!
//! Content is a doubly linked list of immutable pieces bounded by two
//! sentinels. An insert either adds one piece at a boundary or splits the
//! containing piece into `before | new | after`; a delete may create `before`
//! and `after` pieces for the partial ends of the removed range. Each
//! mutation is recorded as a [`Change`] swapping an old span of pieces for a
//! new one, changes accumulate into the current [`Action`] until
//! [`PieceBuffer::commit_changes`] closes it, and undo/redo replay the swaps.
//!
//! The one exception to immutability is the *cached piece*: the piece most
//! recently produced by a mutation may be extended or trimmed in place so a
//! typing or backspace burst coalesces into a single piece instead of a pile
//! of one-byte pieces. The cache is transparent to the change log; it only
//! ever touches pieces created by the still-open action, so undo fidelity is
//! preserved.

use std::time::SystemTime;

use tracing::trace;

use crate::{Content, TextError};

/// Stable identifier of a piece; doubles as the index into the buffer's
/// piece arena. Pieces are never moved or reused, which keeps spans recorded
/// in past actions valid forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceRef(u32);

impl PieceRef {
    fn idx(self) -> usize {
        self.0 as usize
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

const BEGIN: PieceRef = PieceRef(0);
const END: PieceRef = PieceRef(1);

/// Piece payload. Pieces that survive from the initial content reference a
/// range of the buffer's [`Content`] (zero-copy for mapped files); pieces
/// created by edits own their bytes.
#[derive(Debug)]
enum PieceBytes {
    Owned(Vec<u8>),
    Source { start: usize, len: usize },
}

#[derive(Debug)]
struct Piece {
    prev: Option<PieceRef>,
    next: Option<PieceRef>,
    data: PieceBytes,
}

/// A contiguous sub-list of pieces with its total byte length snapshotted at
/// creation time. An empty span has no endpoints.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: Option<PieceRef>,
    end: Option<PieceRef>,
    len: usize,
}

impl Span {
    const EMPTY: Span = Span {
        start: None,
        end: None,
        len: 0,
    };

    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One atomic link swap: splice `new` where `old` was, at byte offset `pos`.
#[derive(Debug, Clone, Copy)]
struct Change {
    old: Span,
    new: Span,
    pos: usize,
}

/// A group of changes undone and redone together.
#[derive(Debug)]
struct Action {
    seq: u64,
    #[allow(dead_code)]
    at: SystemTime,
    changes: Vec<Change>,
}

/// In-place coalescing state. `next_fresh` records whether the piece after
/// the cached one was created by the same change, which is what makes the
/// forward-delete hop safe: trimming a piece that predates the open action
/// would lose bytes undo can no longer restore.
#[derive(Debug, Clone, Copy)]
struct Cached {
    piece: PieceRef,
    next_fresh: bool,
}

/// An undoable byte buffer backed by a piece table.
pub struct PieceBuffer {
    source: Content,
    pieces: Vec<Piece>,
    actions: Vec<Action>,
    /// Index of the next action slot; `actions[..head]` is the applied prefix.
    head: usize,
    /// Whether `actions[head - 1]` is still accepting changes.
    open: bool,
    cached: Option<Cached>,
    /// Sequence number of the action that was on top at the last `save`.
    saved: Option<u64>,
    next_seq: u64,
    size: usize,
}

impl PieceBuffer {
    /// Build a buffer whose initial content is `source`. The content becomes
    /// a single piece between the sentinels; an empty source yields an empty
    /// list.
    pub fn new(source: Content) -> Self {
        let mut buf = PieceBuffer {
            source,
            pieces: Vec::with_capacity(16),
            actions: Vec::new(),
            head: 0,
            open: false,
            cached: None,
            saved: None,
            next_seq: 1,
            size: 0,
        };
        buf.push_piece(PieceBytes::Owned(Vec::new()), None, Some(END));
        buf.push_piece(PieceBytes::Owned(Vec::new()), Some(BEGIN), None);
        let len = buf.source.len();
        if len > 0 {
            let p = buf.push_piece(
                PieceBytes::Source { start: 0, len },
                Some(BEGIN),
                Some(END),
            );
            buf.link(BEGIN, Some(p));
            buf.link_back(END, Some(p));
            buf.size = len;
        }
        buf
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Total pieces ever allocated, sentinels included. Diagnostics only.
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Number of actions currently on the stack (applied or undone).
    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    // ---------------------------------------------------------------------
    // piece arena
    // ---------------------------------------------------------------------

    fn push_piece(
        &mut self,
        data: PieceBytes,
        prev: Option<PieceRef>,
        next: Option<PieceRef>,
    ) -> PieceRef {
        let r = PieceRef(self.pieces.len() as u32);
        self.pieces.push(Piece { prev, next, data });
        r
    }

    fn plen(&self, r: PieceRef) -> usize {
        match &self.pieces[r.idx()].data {
            PieceBytes::Owned(v) => v.len(),
            PieceBytes::Source { len, .. } => *len,
        }
    }

    fn pdata(&self, r: PieceRef) -> &[u8] {
        match &self.pieces[r.idx()].data {
            PieceBytes::Owned(v) => v,
            PieceBytes::Source { start, len } => &self.source.bytes()[*start..*start + *len],
        }
    }

    fn next(&self, r: PieceRef) -> Option<PieceRef> {
        self.pieces[r.idx()].next
    }

    fn prev(&self, r: PieceRef) -> Option<PieceRef> {
        self.pieces[r.idx()].prev
    }

    fn link(&mut self, r: PieceRef, next: Option<PieceRef>) {
        self.pieces[r.idx()].next = next;
    }

    fn link_back(&mut self, r: PieceRef, prev: Option<PieceRef>) {
        self.pieces[r.idx()].prev = prev;
    }

    /// A sub-range of a piece's bytes as new piece data. Source pieces stay
    /// zero-copy; owned pieces copy the slice.
    fn sub(&self, r: PieceRef, from: usize, to: usize) -> PieceBytes {
        match &self.pieces[r.idx()].data {
            PieceBytes::Owned(v) => PieceBytes::Owned(v[from..to].to_vec()),
            PieceBytes::Source { start, .. } => PieceBytes::Source {
                start: start + from,
                len: to - from,
            },
        }
    }

    /// Append to a piece in place. Only owned pieces can grow.
    fn piece_append(&mut self, r: PieceRef, data: &[u8]) -> bool {
        match &mut self.pieces[r.idx()].data {
            PieceBytes::Owned(v) => {
                v.extend_from_slice(data);
                true
            }
            PieceBytes::Source { .. } => false,
        }
    }

    /// Splice bytes into a piece in place at `offset`.
    fn piece_splice(&mut self, r: PieceRef, offset: usize, data: &[u8]) -> bool {
        match &mut self.pieces[r.idx()].data {
            PieceBytes::Owned(v) if offset <= v.len() => {
                v.splice(offset..offset, data.iter().copied());
                true
            }
            _ => false,
        }
    }

    /// Remove `len` bytes at `offset` from a piece in place. Source pieces
    /// can only shed a prefix or a suffix (a range adjustment); anything else
    /// needs the general delete path.
    fn piece_trim(&mut self, r: PieceRef, offset: usize, len: usize) -> bool {
        match &mut self.pieces[r.idx()].data {
            PieceBytes::Owned(v) if offset + len <= v.len() => {
                v.drain(offset..offset + len);
                true
            }
            PieceBytes::Source { start, len: plen } if offset + len <= *plen => {
                if offset + len == *plen {
                    *plen -= len;
                    true
                } else if offset == 0 {
                    *start += len;
                    *plen -= len;
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }

    /// Find the piece holding byte offset `pos`. A boundary offset resolves
    /// to the piece on its left (so `pos == 0` yields the begin sentinel).
    /// `None` when `pos` is past the end of the buffer.
    fn find_piece(&self, pos: usize) -> Option<(PieceRef, usize)> {
        let mut cur = 0usize;
        let mut p = BEGIN;
        while self.next(p).is_some() {
            let l = self.plen(p);
            if cur <= pos && pos <= cur + l {
                return Some((p, pos - cur));
            }
            cur += l;
            p = match self.next(p) {
                Some(n) => n,
                None => break,
            };
        }
        None
    }

    // ---------------------------------------------------------------------
    // actions
    // ---------------------------------------------------------------------

    /// Record a change in the current action, opening a new action (and
    /// discarding any undone tail) if none is open. Opening an action
    /// invalidates the cached piece so coalescing never crosses an action
    /// boundary.
    fn record_change(&mut self, change: Change) {
        if !self.open {
            self.actions.truncate(self.head);
            self.actions.push(Action {
                seq: self.next_seq,
                at: SystemTime::now(),
                changes: Vec::new(),
            });
            self.next_seq += 1;
            self.head += 1;
            self.open = true;
            self.cached = None;
        }
        self.actions[self.head - 1].changes.push(change);
    }

    /// Close the current action; subsequent changes start a new one.
    pub fn commit_changes(&mut self) {
        self.open = false;
        self.cached = None;
    }

    /// Splice `new` where `old` sits in the list. Either span may be empty.
    /// Span endpoints are never sentinels, so their outward links always
    /// exist.
    fn swap_spans(&mut self, old: Span, new: Span) {
        let ends = |s: &Span| {
            let start = s.start.expect("non-empty span has a start");
            let end = s.end.expect("non-empty span has an end");
            (start, end)
        };
        if old.is_empty() && new.is_empty() {
            return;
        }
        if old.is_empty() {
            // Pure insertion: attach the new span to the context it was
            // created with.
            let (start, end) = ends(&new);
            let prev = self.prev(start).expect("span start is linked");
            let next = self.next(end).expect("span end is linked");
            self.link(prev, Some(start));
            self.link_back(next, Some(end));
        } else if new.is_empty() {
            // Pure removal: bridge over the old span.
            let (start, end) = ends(&old);
            let prev = self.prev(start).expect("span start is linked");
            let next = self.next(end).expect("span end is linked");
            self.link(prev, Some(next));
            self.link_back(next, Some(prev));
        } else {
            let (old_start, old_end) = ends(&old);
            let (new_start, new_end) = ends(&new);
            let prev = self.prev(old_start).expect("span start is linked");
            let next = self.next(old_end).expect("span end is linked");
            self.link(prev, Some(new_start));
            self.link_back(next, Some(new_end));
        }
    }

    fn span(&self, start: PieceRef, end: PieceRef) -> Span {
        let mut len = 0;
        let mut p = Some(start);
        while let Some(r) = p {
            len += self.plen(r);
            if r == end {
                break;
            }
            p = self.next(r);
        }
        Span {
            start: Some(start),
            end: Some(end),
            len,
        }
    }

    // ---------------------------------------------------------------------
    // mutation
    // ---------------------------------------------------------------------

    /// Insert `data` at byte offset `pos`. `TextError::WrongPos` when `pos`
    /// is greater than the buffer size.
    pub fn insert(&mut self, pos: usize, data: &[u8]) -> Result<(), TextError> {
        if data.is_empty() {
            return Ok(());
        }
        let (p, offset) = self.find_piece(pos).ok_or(TextError::WrongPos)?;

        if let Some(c) = self.cached
            && c.piece == p
            && self.piece_splice(p, offset, data)
        {
            self.size += data.len();
            return Ok(());
        }

        let mut change = Change {
            old: Span::EMPTY,
            new: Span::EMPTY,
            pos,
        };
        let pnew;
        let next_fresh;
        if offset == self.plen(p) {
            // Boundary: nothing to remove, one new piece holds the text.
            pnew = self.push_piece(PieceBytes::Owned(data.to_vec()), Some(p), self.next(p));
            change.new = self.span(pnew, pnew);
            next_fresh = false;
        } else {
            // Split the containing piece into before | new | after.
            let before = self.push_piece(self.sub(p, 0, offset), self.prev(p), None);
            pnew = self.push_piece(PieceBytes::Owned(data.to_vec()), Some(before), None);
            let after = self.push_piece(self.sub(p, offset, self.plen(p)), Some(pnew), self.next(p));
            self.link(before, Some(pnew));
            self.link(pnew, Some(after));
            change.new = self.span(before, after);
            change.old = self.span(p, p);
            next_fresh = true;
        }

        trace!(target: "text.piece", pos, len = data.len(), "insert");
        self.record_change(change);
        self.swap_spans(change.old, change.new);
        self.cached = Some(Cached {
            piece: pnew,
            next_fresh,
        });
        self.size += data.len();
        Ok(())
    }

    /// Delete `length` bytes at byte offset `pos`, clamped to the end of the
    /// buffer. `TextError::WrongPos` when `pos` is greater than the size.
    pub fn delete(&mut self, pos: usize, length: usize) -> Result<(), TextError> {
        if length == 0 {
            return Ok(());
        }
        let (p0, offset) = self.find_piece(pos).ok_or(TextError::WrongPos)?;

        if let Some(c) = self.cached
            && c.piece == p0
            && self.try_cached_delete(c, p0, offset, length)
        {
            self.size -= length;
            return Ok(());
        }
        self.cached = None;

        let mut length = length;
        let mut p = p0;
        let mut cur: usize;
        let mut midway_start = false;
        let mut midway_end = false;
        let start: PieceRef;

        let before: PieceRef;
        if offset == self.plen(p0) {
            // Deletion starts at a piece boundary.
            before = p0;
            cur = 0;
            start = match self.next(p0) {
                Some(n) if n != END => n,
                _ => return Ok(()), // deleting at the very end: nothing there
            };
        } else {
            midway_start = true;
            cur = self.plen(p0) - offset;
            start = p0;
            before = self.push_piece(PieceBytes::Owned(Vec::new()), None, None);
        }

        // Walk forward over the pieces covered by the deletion, clamping at
        // the end sentinel.
        while cur < length {
            match self.next(p) {
                Some(n) if n != END => {
                    p = n;
                    cur += self.plen(p);
                }
                _ => {
                    length = cur;
                    break;
                }
            }
        }
        if length == 0 {
            return Ok(());
        }

        let end: PieceRef;
        let after: Option<PieceRef>;
        if cur == length {
            end = p;
            after = self.next(p);
        } else {
            midway_end = true;
            end = p;
            let keep_from = self.plen(p) - (cur - length);
            let a = self.push_piece(self.sub(p, keep_from, self.plen(p)), Some(before), self.next(p));
            after = Some(a);
        }

        let mut new_start = None;
        let mut new_end = None;
        if midway_start {
            // Now that the right neighbor is known, fill in the before piece.
            self.pieces[before.idx()].data = self.sub(start, 0, offset);
            self.link_back(before, self.prev(start));
            self.link(before, after);
            new_start = Some(before);
            if !midway_end {
                new_end = Some(before);
            }
        }
        if midway_end {
            new_end = after;
            if !midway_start {
                new_start = after;
            }
        }

        let change = Change {
            old: self.span(start, end),
            new: match (new_start, new_end) {
                (Some(s), Some(e)) => self.span(s, e),
                _ => Span::EMPTY,
            },
            pos,
        };

        trace!(target: "text.piece", pos, length, "delete");
        self.record_change(change);
        self.swap_spans(change.old, change.new);
        self.cached = new_start.map(|piece| Cached {
            piece,
            next_fresh: midway_start && midway_end,
        });
        self.size -= length;
        Ok(())
    }

    /// In-place deletion inside the coalescing window. At the cached piece's
    /// right boundary the deletion hops to its successor, but only when that
    /// successor was created by the same change.
    fn try_cached_delete(
        &mut self,
        c: Cached,
        p: PieceRef,
        offset: usize,
        length: usize,
    ) -> bool {
        let (target, off) = if offset == self.plen(p) {
            if !c.next_fresh {
                return false;
            }
            match self.next(p) {
                Some(n) if n != END => (n, 0),
                _ => return false,
            }
        } else {
            (p, offset)
        };
        self.piece_trim(target, off, length)
    }

    // ---------------------------------------------------------------------
    // undo / redo
    // ---------------------------------------------------------------------

    /// Revert the most recent action. Returns the byte offset of the
    /// action's first change and the length of the text that reappeared
    /// there (zero when the undone change was an insertion), or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Option<(usize, usize)> {
        self.commit_changes();
        if self.head == 0 {
            return None;
        }
        self.head -= 1;
        let n = self.actions[self.head].changes.len();
        let mut at = (0, 0);
        for i in (0..n).rev() {
            let c = self.actions[self.head].changes[i];
            self.swap_spans(c.new, c.old);
            at = (c.pos, c.old.len.saturating_sub(c.new.len));
        }
        // Span lengths are snapshots; in-place coalescing can make them
        // stale, so the size is rewalked rather than adjusted.
        self.size = self.walk_size();
        trace!(target: "text.piece", head = self.head, "undo");
        Some(at)
    }

    /// Reapply the most recently undone action. Returns the byte offset of
    /// the action's last change and the length of the text it re-inserted
    /// (zero for a deletion), or `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<(usize, usize)> {
        self.commit_changes();
        if self.head >= self.actions.len() {
            return None;
        }
        let n = self.actions[self.head].changes.len();
        let mut at = (0, 0);
        for i in 0..n {
            let c = self.actions[self.head].changes[i];
            self.swap_spans(c.old, c.new);
            at = (c.pos, c.new.len.saturating_sub(c.old.len));
        }
        self.head += 1;
        self.size = self.walk_size();
        trace!(target: "text.piece", head = self.head, "redo");
        Some(at)
    }

    fn walk_size(&self) -> usize {
        let mut total = 0;
        let mut p = self.next(BEGIN);
        while let Some(r) = p {
            total += self.plen(r);
            p = self.next(r);
        }
        total
    }

    // ---------------------------------------------------------------------
    // save / dirty
    // ---------------------------------------------------------------------

    /// Remember the current top-of-stack action as the saved state.
    pub fn save(&mut self) {
        self.saved = if self.head > 0 {
            Some(self.actions[self.head - 1].seq)
        } else {
            None
        };
    }

    /// Whether the buffer differs from the state at the last `save`.
    pub fn dirty(&self) -> bool {
        if self.head == 0 {
            self.saved.is_some()
        } else {
            self.saved != Some(self.actions[self.head - 1].seq)
        }
    }

    // ---------------------------------------------------------------------
    // reading
    // ---------------------------------------------------------------------

    /// Read bytes starting at `off` into `data`. A short (possibly zero)
    /// count means the end of the buffer was reached; `TextError::WrongPos`
    /// when `off` is past the end.
    pub fn read_at(&self, data: &mut [u8], off: usize) -> Result<usize, TextError> {
        let mut off = off;
        let mut p = Some(BEGIN);
        while let Some(r) = p {
            let l = self.plen(r);
            if off < l {
                break;
            }
            off -= l;
            p = self.next(r);
        }
        let Some(first) = p else {
            return if off == 0 {
                Ok(0)
            } else {
                Err(TextError::WrongPos)
            };
        };

        let mut n = 0;
        let mut cur = Some(first);
        while let Some(r) = cur {
            if n == data.len() {
                break;
            }
            let src = &self.pdata(r)[off.min(self.plen(r))..];
            let k = src.len().min(data.len() - n);
            data[n..n + k].copy_from_slice(&src[..k]);
            n += k;
            off = 0;
            cur = self.next(r);
        }
        Ok(n)
    }

    /// The whole current content as one allocation. Search and tests only.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size);
        let mut p = self.next(BEGIN);
        while let Some(r) = p {
            if r == END {
                break;
            }
            out.extend_from_slice(self.pdata(r));
            p = self.next(r);
        }
        out
    }

    /// An `io::Read` adapter starting at byte offset `off`.
    pub fn reader_at(&self, off: usize) -> PieceReader<'_> {
        PieceReader { buf: self, off }
    }
}

/// Streaming reader over a [`PieceBuffer`], used by save and search paths.
pub struct PieceReader<'a> {
    buf: &'a PieceBuffer,
    off: usize,
}

impl std::io::Read for PieceReader<'_> {
    fn read(&mut self, data: &mut [u8]) -> std::io::Result<usize> {
        let n = self
            .buf
            .read_at(data, self.off)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
        self.off += n;
        Ok(n)
    }
}
