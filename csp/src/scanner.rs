use std::ops::Range;

/// Marker that opens an embedded block.
pub const BLOCK_OPEN: &[u8] = b"<?";
/// Marker that closes an embedded block's body.
pub const BLOCK_CLOSE: &[u8] = b"<?>";

/// One embedded snippet extracted from a document.
#[derive(Debug, Clone)]
pub struct Block {
    /// The language tag, e.g. `c` or `py`.
    pub tag: String,
    /// Mode identifiers in the order they appeared in the header.
    /// Empty tokens (from doubled spaces) are kept; unrecognized modes are
    /// no-ops downstream.
    pub modes: Vec<String>,
    /// Byte span of the tag in the source, for diagnostics.
    pub tag_span: Range<usize>,
    /// Byte range of the raw body between the header terminator and the
    /// close marker (or end of input).
    pub body: Range<usize>,
    /// False when the body was truncated by end of input instead of a
    /// close marker.
    pub closed: bool,
}

/// A scanner event: either a run of literal bytes to copy through, or an
/// extracted block.
#[derive(Debug)]
pub enum Event<'a> {
    Literal(&'a [u8]),
    Block(Block),
}

/// How a header token ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    /// A space: more header tokens follow.
    Space,
    /// `>`: the header is done, the body starts here.
    Close,
    /// End of input inside the header.
    Eof,
}

/// Scans a document left to right, yielding literal runs and blocks.
///
/// Literal bytes are returned untouched. On `"<?"` the scanner consumes the
/// marker, parses the tag/mode header, and captures the body up to `"<?>"`
/// or end of input. End of input is never a scan error.
pub struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Scanner { src, pos: 0 }
    }

    /// The next event, or `None` at end of input.
    pub fn next_event(&mut self) -> Option<Event<'a>> {
        if self.pos >= self.src.len() {
            return None;
        }

        if self.match_literal(BLOCK_OPEN) {
            return Some(Event::Block(self.read_block()));
        }

        let start = self.pos;
        self.pos += 1;
        while self.pos < self.src.len() && !self.at_marker(BLOCK_OPEN) {
            self.pos += 1;
        }
        Some(Event::Literal(&self.src[start..self.pos]))
    }

    /// Parse the header and body immediately after a consumed open marker.
    fn read_block(&mut self) -> Block {
        let (tag, tag_span, terminator) = self.read_token();

        let mut modes = Vec::new();
        if terminator == Terminator::Space {
            loop {
                let (mode, _, terminator) = self.read_token();
                modes.push(mode);
                if terminator != Terminator::Space {
                    break;
                }
            }
        }

        let body_start = self.pos;
        let mut closed = false;
        while self.pos < self.src.len() {
            if self.at_marker(BLOCK_CLOSE) {
                closed = true;
                break;
            }
            self.pos += 1;
        }
        let body = body_start..self.pos;
        if closed {
            self.pos += BLOCK_CLOSE.len();
        }

        Block {
            tag,
            modes,
            tag_span,
            body,
            closed,
        }
    }

    /// Read a header token up to a space, `>` or end of input, consuming
    /// the terminator.
    fn read_token(&mut self) -> (String, Range<usize>, Terminator) {
        let start = self.pos;
        let terminator = loop {
            match self.src.get(self.pos) {
                None => break Terminator::Eof,
                Some(b' ') => break Terminator::Space,
                Some(b'>') => break Terminator::Close,
                Some(_) => self.pos += 1,
            }
        };
        let span = start..self.pos;
        let token = String::from_utf8_lossy(&self.src[span.clone()]).into_owned();
        if terminator != Terminator::Eof {
            self.pos += 1;
        }
        (token, span, terminator)
    }

    /// True if `lit` is next in the input, without consuming it.
    fn at_marker(&self, lit: &[u8]) -> bool {
        self.src[self.pos..].starts_with(lit)
    }

    /// Consume `lit` if it is next in the input.
    fn match_literal(&mut self, lit: &[u8]) -> bool {
        if self.at_marker(lit) {
            self.pos += lit.len();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(src: &[u8]) -> Vec<Event<'_>> {
        let mut scanner = Scanner::new(src);
        let mut out = Vec::new();
        while let Some(ev) = scanner.next_event() {
            out.push(ev);
        }
        out
    }

    fn single_block(src: &[u8]) -> Block {
        let mut evs = events(src);
        assert_eq!(evs.len(), 1, "expected exactly one event");
        match evs.pop() {
            Some(Event::Block(b)) => b,
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn plain_text_is_one_literal() {
        let evs = events(b"hello world");
        assert_eq!(evs.len(), 1);
        match &evs[0] {
            Event::Literal(bytes) => assert_eq!(*bytes, b"hello world"),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn lone_angle_bracket_is_literal() {
        let evs = events(b"a < b <");
        assert_eq!(evs.len(), 1);
        match &evs[0] {
            Event::Literal(bytes) => assert_eq!(*bytes, b"a < b <"),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn block_header_without_modes() {
        let block = single_block(b"<?py>print(1)<?>");
        assert_eq!(block.tag, "py");
        assert!(block.modes.is_empty());
        assert!(block.closed);
    }

    #[test]
    fn block_header_with_modes_in_order() {
        let block = single_block(b"<?c main extra>x<?>");
        assert_eq!(block.tag, "c");
        assert_eq!(block.modes, vec!["main", "extra"]);
    }

    #[test]
    fn doubled_space_keeps_empty_mode_token() {
        let block = single_block(b"<?c  main>x<?>");
        assert_eq!(block.modes, vec!["", "main"]);
    }

    #[test]
    fn body_span_covers_raw_bytes() {
        let src = b"<?py>print(1)<?>";
        let block = single_block(src);
        assert_eq!(&src[block.body], b"print(1)");
    }

    #[test]
    fn unclosed_body_truncates_at_eof() {
        let src = b"<?py>print(1)";
        let block = single_block(src);
        assert!(!block.closed);
        assert_eq!(&src[block.body], b"print(1)");
    }

    #[test]
    fn header_cut_by_eof_ends_header() {
        let block = single_block(b"<?py");
        assert_eq!(block.tag, "py");
        assert!(block.body.is_empty());
        assert!(!block.closed);
    }

    #[test]
    fn literal_block_literal_sequence() {
        let evs = events(b"a<?sh>x<?>b");
        assert_eq!(evs.len(), 3);
        assert!(matches!(&evs[0], Event::Literal(bytes) if *bytes == b"a"));
        assert!(matches!(&evs[1], Event::Block(b) if b.tag == "sh"));
        assert!(matches!(&evs[2], Event::Literal(bytes) if *bytes == b"b"));
    }

    #[test]
    fn tag_span_points_at_tag() {
        let src = b"ab<?ruby>x<?>";
        let block = single_block(&src[2..]);
        assert_eq!(&src[2..][block.tag_span.clone()], b"ruby");
    }
}
