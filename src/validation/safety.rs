//! Content-safety screen run ahead of every section validator.

use crate::validation::{IssueCollector, IssueType, SectionContent};

const BLOCKED_PHRASES: &[&str] = &[
    "kill yourself",
    "self-harm instructions",
    "how to make a bomb",
    "build a bomb",
    "buy illegal drugs",
    "explicit sexual",
    "pornographic",
    "white supremacy is",
    "racial slur",
];

/// Records a non-recoverable issue for every blocked phrase found.
pub fn screen(content: &SectionContent, issues: &mut IssueCollector) {
    let text = content.all_text().join("\n").to_lowercase();
    for phrase in BLOCKED_PHRASES {
        if text.contains(phrase) {
            issues.fatal(
                IssueType::ContentSafety,
                format!("Section contains unsafe content (\"{}\")", phrase),
                "Choose different source material",
            );
        }
    }
}
