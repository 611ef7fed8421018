//! Property tests for DataPath parsing and prefix algebra

use proptest::prelude::*;
use structura_core::DataPath;

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ .-]{1,12}"
}

proptest! {
    #[test]
    fn display_then_parse_is_identity(segments in prop::collection::vec(segment(), 1..6)) {
        let path = DataPath::from_segments(segments.clone()).unwrap();
        let reparsed = DataPath::parse(&path.to_string()).unwrap();
        prop_assert_eq!(reparsed.segments(), &segments[..]);
    }

    #[test]
    fn every_parent_is_a_prefix(segments in prop::collection::vec(segment(), 1..6)) {
        let path = DataPath::from_segments(segments).unwrap();
        let mut cursor = path.parent();
        while let Some(ancestor) = cursor {
            prop_assert!(path.starts_with(&ancestor));
            prop_assert!(path.is_descendant_of(&ancestor));
            cursor = ancestor.parent();
        }
    }

    #[test]
    fn replace_prefix_keeps_tail(
        head in prop::collection::vec(segment(), 1..4),
        tail in prop::collection::vec(segment(), 0..4),
        new_head in prop::collection::vec(segment(), 0..4),
    ) {
        let old = DataPath::from_segments(head.clone()).unwrap();
        let full = DataPath::from_segments(head.iter().chain(tail.iter()).cloned()).unwrap();
        let new = DataPath::from_segments(new_head.clone()).unwrap();
        let moved = full.replace_prefix(&old, &new).unwrap();
        prop_assert_eq!(moved.len(), new_head.len() + tail.len());
        prop_assert!(moved.starts_with(&new));
    }
}
