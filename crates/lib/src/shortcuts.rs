//! Instructional shortcuts shown in the sidebar.
//!
//! Each shortcut maps a short label to one fixed instruction that prefills the input box.

/// One sidebar button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub label: &'static str,
    pub instruction: &'static str,
}

/// A titled, collapsible group of shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutGroup {
    pub title: &'static str,
    pub shortcuts: &'static [Shortcut],
}

const fn sc(label: &'static str, instruction: &'static str) -> Shortcut {
    Shortcut { label, instruction }
}

pub const NAVIGATION: ShortcutGroup = ShortcutGroup {
    title: "Navigation",
    shortcuts: &[
        sc("Next Concept", "Move to the next learning concept or topic in the current subject area:"),
        sc("Previous Concept", "Return to the previous learning concept or topic we covered:"),
        sc("Concept History", "List all the concepts and topics we have navigated through in our learning session:"),
    ],
};

pub const TEACHING_METHODS: ShortcutGroup = ShortcutGroup {
    title: "Teaching Methods",
    shortcuts: &[
        sc("Syllabus", "Provide a Table of Content based on relevancy for the current Concept:"),
        sc("Analogy", "Compare new concepts to familiar things the student already knows to make complex ideas easier to understand:"),
        sc("Chunk", "Break large amounts of information into smaller, manageable pieces that are easier to process and remember:"),
        sc("Big Picture", "Start with the overall concept or framework before diving into details, helping students see how pieces fit together:"),
        sc("Jargon", "Identify and clearly explain specialized terminology, replacing complex language with simpler alternatives when possible:"),
        sc("Memory", "Use memory aids like acronyms, rhymes, or visual associations to help students remember key information:"),
        sc("Visual", "Encourage visualization and mental imagery to help students create vivid mental representations of concepts:"),
        sc("Rephrase", "Express the same information in different ways to reinforce understanding and accommodate different learning preferences:"),
    ],
};

pub const ASSESSMENT_METHODS: ShortcutGroup = ShortcutGroup {
    title: "Assessment Methods",
    shortcuts: &[
        sc("Multiple Choice", "Present questions with several answer options to test recognition and understanding:"),
        sc("True/False", "Create simple binary questions that test basic comprehension of facts or concepts:"),
        sc("Matching", "Connect related items, terms, or concepts to test understanding of relationships:"),
        sc("Fill-in Blanks", "Test recall by having students complete sentences or phrases with missing key terms:"),
        sc("Short Response", "Brief written answers that require students to explain concepts in their own words:"),
        sc("Error Spotting", "Present incorrect information for students to identify and correct, testing critical thinking:"),
        sc("Deep Thinking", "Open-ended questions that require analysis, synthesis, or evaluation of complex concepts:"),
        sc("Tutor Mode", "I will now act as the teacher, you should act like a student and help me understand:"),
    ],
};

/// Sidebar groups in display order.
pub static GROUPS: [ShortcutGroup; 3] = [NAVIGATION, TEACHING_METHODS, ASSESSMENT_METHODS];

/// All shortcuts, group by group.
pub fn all() -> impl Iterator<Item = &'static Shortcut> {
    GROUPS.iter().flat_map(|g| g.shortcuts.iter())
}

/// Look a shortcut up by label, ignoring case and surrounding whitespace.
pub fn find(label: &str) -> Option<&'static Shortcut> {
    let label = label.trim();
    all().find(|s| s.label.eq_ignore_ascii_case(label))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_have_expected_sizes() {
        assert_eq!(NAVIGATION.shortcuts.len(), 3);
        assert_eq!(TEACHING_METHODS.shortcuts.len(), 8);
        assert_eq!(ASSESSMENT_METHODS.shortcuts.len(), 8);
        assert_eq!(all().count(), 19);
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<String> = all().map(|s| s.label.to_lowercase()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 19);
    }

    #[test]
    fn find_is_case_insensitive() {
        let s = find("  tutor mode ").unwrap();
        assert!(s.instruction.starts_with("I will now act as the teacher"));
        assert_eq!(find("true/false").unwrap().label, "True/False");
        assert!(find("Lecture").is_none());
    }

    #[test]
    fn every_instruction_ends_with_colon() {
        assert!(all().all(|s| s.instruction.ends_with(':')));
    }
}
