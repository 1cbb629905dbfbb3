//! Reading-order comparison of CFIs

use std::cmp::Ordering;

use super::parser;
use super::types::{CfiPath, StepType};

/// Order two paths the way their positions appear in the text.
///
/// Steps compare by index, an indirection sorting before any element step
/// at the same depth; a path that is a prefix of another comes first.
/// Equal steps fall through to the character offset.
pub fn reading_order(a: &CfiPath, b: &CfiPath) -> Ordering {
    for (step_a, step_b) in a.steps.iter().zip(b.steps.iter()) {
        let cmp = match (step_a.step_type, step_b.step_type) {
            (StepType::Indirection, StepType::Indirection) => Ordering::Equal,
            (StepType::Element(x), StepType::Element(y)) => x.cmp(&y),
            (StepType::Indirection, StepType::Element(_)) => Ordering::Less,
            (StepType::Element(_), StepType::Indirection) => Ordering::Greater,
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    a.steps.len().cmp(&b.steps.len()).then_with(|| {
        let offset = |path: &CfiPath| path.character_offset.as_ref().map(|c| c.offset);
        offset(a).cmp(&offset(b))
    })
}

/// Compare two CFI strings. `None` if either does not parse.
///
/// Content-document fragments with a leading `!` compare on their steps.
pub fn compare_cfi_strings(a: &str, b: &str) -> Option<Ordering> {
    let parse = |s: &str| parser::parse(s.trim_start_matches('!')).ok();
    Some(reading_order(&parse(a)?.path, &parse(b)?.path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets_in_same_text() {
        assert_eq!(
            compare_cfi_strings("/4/2/1:10", "/4/2/1:20"),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_cfi_strings("!/4/2/1:42", "epubcfi(/4/2/1:42)"),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_text_run_between_elements() {
        // text after the first element precedes the second element
        assert_eq!(compare_cfi_strings("/4/3:99", "/4/4"), Some(Ordering::Less));
        assert_eq!(compare_cfi_strings("/4/2", "/4/2/1"), Some(Ordering::Less));
    }

    #[test]
    fn test_chapters_order_first() {
        assert_eq!(
            compare_cfi_strings("epubcfi(/6/8!/4/2/1:5)", "epubcfi(/6/4!/4/2/1:500)"),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(compare_cfi_strings("invalid", "/4/2"), None);
    }
}
