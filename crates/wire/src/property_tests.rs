//! Property tests for the framing layer: however a byte stream is chopped
//! into read chunks, the reassembled lines are identical.

use crate::frame::FrameBuffer;
use proptest::prelude::*;

fn arbitrary_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z{}\":,0-9 ]{0,40}", 0..8)
}

proptest! {
    #[test]
    fn chunking_never_changes_the_line_stream(
        lines in arbitrary_lines(),
        cuts in prop::collection::vec(0usize..64, 0..16),
    ) {
        let mut stream = Vec::new();
        for line in &lines {
            stream.extend_from_slice(line.as_bytes());
            stream.push(b'\n');
        }

        // Chop the stream at pseudo-random offsets.
        let mut buf = FrameBuffer::new();
        let mut out = Vec::new();
        let mut rest = stream.as_slice();
        for cut in cuts {
            if rest.is_empty() {
                break;
            }
            let n = cut.min(rest.len());
            let (head, tail) = rest.split_at(n);
            out.extend(buf.push(head));
            rest = tail;
        }
        out.extend(buf.push(rest));

        prop_assert_eq!(out, lines);
        prop_assert!(buf.pending().is_empty());
    }
}
