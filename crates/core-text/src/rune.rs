//! Rune-indexed view over a [`PieceBuffer`].
//!
//! The editing model addresses text by rune position; the piece table speaks
//! bytes. This adapter keeps a single forward cursor `(byte_off, rune_pos)`
//! so monotonically increasing reads cost amortized O(1) per rune. Reads
//! behind the cursor reset it to the start and rescan.

use crate::{Content, PieceBuffer, TextError};

pub struct RuneView {
    buf: PieceBuffer,
    byte_off: usize,
    rune_pos: usize,
}

/// Decode the first rune of `bytes`. Invalid sequences decode to
/// `U+FFFD` and consume the offending bytes so scans always make progress.
fn decode_prefix(bytes: &[u8]) -> (char, usize) {
    fn first_char(s: &str) -> (char, usize) {
        let c = s.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
        (c, c.len_utf8())
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => first_char(s),
        Err(e) if e.valid_up_to() > 0 => {
            first_char(std::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or_default())
        }
        Err(e) => (
            char::REPLACEMENT_CHARACTER,
            e.error_len().unwrap_or(bytes.len()).max(1),
        ),
    }
}

impl RuneView {
    pub fn new(buf: PieceBuffer) -> Self {
        Self {
            buf,
            byte_off: 0,
            rune_pos: 0,
        }
    }

    pub fn from_content(content: Content) -> Self {
        Self::new(PieceBuffer::new(content))
    }

    pub fn buffer(&self) -> &PieceBuffer {
        &self.buf
    }

    pub fn buffer_mut(&mut self) -> &mut PieceBuffer {
        &mut self.buf
    }

    fn reset(&mut self) {
        self.byte_off = 0;
        self.rune_pos = 0;
    }

    fn rune_at_byte(&self, off: usize) -> Option<(char, usize)> {
        let mut b = [0u8; 4];
        let n = self.buf.read_at(&mut b, off).ok()?;
        if n == 0 {
            return None;
        }
        Some(decode_prefix(&b[..n]))
    }

    /// The rune at rune position `pos` and its encoded byte length, or
    /// `None` at (or past) the end of the buffer.
    pub fn read_rune_at(&mut self, pos: usize) -> Option<(char, usize)> {
        if pos < self.rune_pos {
            self.reset();
        }
        loop {
            let (c, s) = self.rune_at_byte(self.byte_off)?;
            self.byte_off += s;
            self.rune_pos += 1;
            if pos == self.rune_pos - 1 {
                return Some((c, s));
            }
        }
    }

    /// `read_rune_at` without the byte length.
    pub fn rune_at(&mut self, pos: usize) -> Option<char> {
        self.read_rune_at(pos).map(|(c, _)| c)
    }

    /// Move the cursor to rune position `pos` (clamped to the end) and
    /// return the corresponding byte offset.
    fn seek(&mut self, pos: usize) -> usize {
        if pos < self.rune_pos {
            self.reset();
        }
        while self.rune_pos < pos {
            match self.rune_at_byte(self.byte_off) {
                Some((_, s)) => {
                    self.byte_off += s;
                    self.rune_pos += 1;
                }
                None => break,
            }
        }
        self.byte_off
    }

    /// Insert `s` before rune position `q` (clamped to the end).
    pub fn insert(&mut self, q: usize, s: &str) -> Result<(), TextError> {
        let off = self.seek(q);
        self.buf.insert(off, s.as_bytes())
    }

    /// Delete the rune range `[q0, q1)`, clamped to the end of the buffer.
    pub fn delete(&mut self, q0: usize, q1: usize) -> Result<(), TextError> {
        if q1 <= q0 {
            return Ok(());
        }
        let off = self.seek(q0);
        let mut size = 0;
        let mut q = q0;
        while q < q1 {
            match self.rune_at_byte(off + size) {
                Some((_, s)) => {
                    size += s;
                    q += 1;
                }
                None => break,
            }
        }
        if size == 0 {
            return Ok(());
        }
        let res = self.buf.delete(off, size);
        self.byte_off = off;
        self.rune_pos = q0;
        res
    }

    /// Total number of runes in the buffer.
    pub fn end(&mut self) -> usize {
        loop {
            match self.rune_at_byte(self.byte_off) {
                Some((_, s)) => {
                    self.byte_off += s;
                    self.rune_pos += 1;
                }
                None => return self.rune_pos,
            }
        }
    }

    /// Map a byte range back into rune positions. Used to translate change
    /// offsets from undo/redo into a selection.
    pub fn find_range(&mut self, byte_off: usize, byte_len: usize) -> (usize, usize) {
        self.reset();
        let mut q0 = None;
        while self.byte_off < byte_off + byte_len {
            if self.byte_off >= byte_off && q0.is_none() {
                q0 = Some(self.rune_pos);
            }
            match self.rune_at_byte(self.byte_off) {
                Some((_, s)) => {
                    self.byte_off += s;
                    self.rune_pos += 1;
                }
                None => break,
            }
        }
        (q0.unwrap_or(self.rune_pos), self.rune_pos)
    }

    /// Undo the most recent action, returning the affected rune range.
    pub fn undo(&mut self) -> Option<(usize, usize)> {
        let (off, len) = self.buf.undo()?;
        self.reset();
        Some(self.find_range(off, len))
    }

    /// Redo the most recently undone action, returning the affected rune
    /// range.
    pub fn redo(&mut self) -> Option<(usize, usize)> {
        let (off, len) = self.buf.redo()?;
        self.reset();
        Some(self.find_range(off, len))
    }

    pub fn commit_changes(&mut self) {
        self.buf.commit_changes();
    }

    pub fn dirty(&self) -> bool {
        self.buf.dirty()
    }

    pub fn mark_saved(&mut self) {
        self.buf.save();
    }

    pub fn size_bytes(&self) -> usize {
        self.buf.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn view(s: &str) -> RuneView {
        RuneView::from_content(Content::from(s))
    }

    fn content(v: &RuneView) -> String {
        String::from_utf8(v.buffer().to_vec()).unwrap()
    }

    #[test]
    fn sequential_and_backward_reads() {
        let mut v = view("héllo wörld");
        assert_eq!(v.rune_at(0), Some('h'));
        assert_eq!(v.rune_at(1), Some('é'));
        assert_eq!(v.rune_at(10), Some('d'));
        // Going backwards resets the cursor and rescans.
        assert_eq!(v.rune_at(7), Some('ö'));
        assert_eq!(v.rune_at(11), None);
    }

    #[test]
    fn rune_positions_match_chars() {
        let text = "añ\t漢字x\nzületzt";
        let mut v = view(text);
        for (i, c) in text.chars().enumerate() {
            assert_eq!(v.rune_at(i), Some(c), "rune {}", i);
        }
        assert_eq!(v.end(), text.chars().count());
    }

    #[test]
    fn byte_lengths_are_reported() {
        let mut v = view("aé漢");
        assert_eq!(v.read_rune_at(0), Some(('a', 1)));
        assert_eq!(v.read_rune_at(1), Some(('é', 2)));
        assert_eq!(v.read_rune_at(2), Some(('漢', 3)));
    }

    #[test]
    fn insert_and_delete_by_rune() {
        let mut v = view("übermut");
        v.insert(4, "ße").unwrap();
        assert_eq!(content(&v), "überßemut");
        v.delete(1, 5).unwrap();
        assert_eq!(content(&v), "ümut");
        // Deleting past the end clamps.
        v.delete(2, 100).unwrap();
        assert_eq!(content(&v), "üm");
    }

    #[test]
    fn insert_past_end_appends() {
        let mut v = view("ab");
        v.insert(99, "c").unwrap();
        assert_eq!(content(&v), "abc");
    }

    #[test]
    fn undo_redo_report_rune_ranges() {
        let mut v = view("aaa");
        v.buffer_mut().commit_changes();
        v.insert(1, "ééé").unwrap();
        assert_eq!(content(&v), "aéééaa");
        // Undo of an insertion collapses at the insertion point.
        assert_eq!(v.undo(), Some((1, 1)));
        assert_eq!(content(&v), "aaa");
        // Redo re-inserts; the range spans the three runes.
        assert_eq!(v.redo(), Some((1, 4)));
        assert_eq!(content(&v), "aéééaa");
    }

    #[test]
    fn find_range_maps_bytes_to_runes() {
        let mut v = view("é漢a");
        // "é" = 2 bytes, "漢" = 3 bytes.
        assert_eq!(v.find_range(0, 2), (0, 1));
        assert_eq!(v.find_range(2, 3), (1, 2));
        assert_eq!(v.find_range(5, 1), (2, 3));
        assert_eq!(v.find_range(2, 0), (1, 1));
    }

    #[test]
    fn invalid_utf8_reads_as_replacement() {
        let mut v = RuneView::from_content(Content::from(vec![0xff, b'a']));
        assert_eq!(v.rune_at(0), Some(char::REPLACEMENT_CHARACTER));
        assert_eq!(v.rune_at(1), Some('a'));
        assert_eq!(v.end(), 2);
    }

    #[test]
    fn delete_collapses_cursor_correctly() {
        let mut v = view("one two three");
        v.delete(4, 8).unwrap();
        assert_eq!(content(&v), "one three");
        // Reads right after a delete must not see stale cursor state.
        assert_eq!(v.rune_at(4), Some('t'));
        assert_eq!(v.rune_at(8), Some('e'));
    }
}
