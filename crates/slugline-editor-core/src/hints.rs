//! Auto-complete suggestions for the element under the cursor.

use smol_str::SmolStr;

use crate::element::ElementType;

/// Standard transition phrases.
pub const TRANSITIONS: [&str; 16] = [
    "CUT TO",
    "DISSOLVE TO",
    "FADE IN",
    "FADE OUT",
    "FADE TO",
    "FLASH CUT TO",
    "FREEZE FRAME",
    "IRIS IN",
    "IRIS OUT",
    "JUMP CUT TO",
    "MATCH CUT TO",
    "MATCH DISSOLVE TO",
    "SMASH CUT TO",
    "STOCK SHOT",
    "TIME CUT",
    "WIPE TO",
];

/// Standard shot and angle descriptors.
pub const SHOTS: [&str; 15] = [
    "AIR",
    "CLOSE ON",
    "CLOSER ON",
    "CLOSEUP",
    "ESTABLISHING",
    "EXTREME CLOSEUP",
    "INSERT",
    "POV",
    "SURFACE",
    "THREE SHOT",
    "TWO SHOT",
    "UNDERWATER",
    "WIDE",
    "WIDE ON",
    "WIDER ANGLE",
];

/// Suggestions for an element of `element_type`; `None` means no current element.
pub fn hints_for(
    element_type: Option<ElementType>,
    character_names: &[SmolStr],
) -> Vec<SmolStr> {
    let vocabulary: &[&'static str] = match element_type {
        Some(ElementType::Character) => return character_names.to_vec(),
        Some(ElementType::Transition) => &TRANSITIONS,
        Some(ElementType::Shot) => &SHOTS,
        _ => &[],
    };
    vocabulary.iter().copied().map(SmolStr::new_static).collect()
}

/// The prefix a completer should filter by: the whole block text, but only
/// while there is something to complete.
pub fn completion_prefix(hints: &[SmolStr], block_text: &str) -> Option<SmolStr> {
    (!hints.is_empty()).then(|| SmolStr::new(block_text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_by_type() {
        let names = vec![SmolStr::new("ALICE"), SmolStr::new("BOB")];
        assert_eq!(hints_for(Some(ElementType::Character), &names), names);
        assert_eq!(hints_for(Some(ElementType::Transition), &names).len(), 16);
        assert_eq!(hints_for(Some(ElementType::Shot), &names).len(), 15);
        assert!(hints_for(Some(ElementType::Dialogue), &names).is_empty());
        assert!(hints_for(None, &names).is_empty());
    }

    #[test]
    fn test_completion_prefix_only_with_hints() {
        let hints = hints_for(Some(ElementType::Shot), &[]);
        assert_eq!(completion_prefix(&hints, "CLO"), Some(SmolStr::new("CLO")));
        assert_eq!(completion_prefix(&[], "CLO"), None);
    }

    #[test]
    fn test_shot_vocabulary_snapshot() {
        insta::assert_debug_snapshot!(SHOTS, @r#"
        [
            "AIR",
            "CLOSE ON",
            "CLOSER ON",
            "CLOSEUP",
            "ESTABLISHING",
            "EXTREME CLOSEUP",
            "INSERT",
            "POV",
            "SURFACE",
            "THREE SHOT",
            "TWO SHOT",
            "UNDERWATER",
            "WIDE",
            "WIDE ON",
            "WIDER ANGLE",
        ]
        "#);
    }
}
