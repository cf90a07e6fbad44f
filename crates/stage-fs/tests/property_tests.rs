use proptest::prelude::*;
use stage_fs::RelPath;

proptest! {
    #[test]
    fn normalized_paths_have_no_empty_segments(s in "\\PC*") {
        let path = RelPath::new(&s);
        let as_str = path.as_str();

        if cfg!(windows) {
            prop_assert!(!as_str.contains('\\'));
        }
        prop_assert!(!as_str.contains("//"));
        prop_assert!(!as_str.starts_with('/'));
        prop_assert!(!as_str.ends_with('/'));

        // Normalizing twice changes nothing
        prop_assert_eq!(RelPath::new(as_str), path.clone());
    }

    #[test]
    fn flattened_is_a_single_segment(s in "[a-z]{1,4}(/[a-z]{1,4}){0,4}") {
        let flattened = RelPath::new(&s).flattened();
        prop_assert!(!flattened.contains('/'));
        prop_assert_eq!(flattened.len(), s.len());
    }
}
