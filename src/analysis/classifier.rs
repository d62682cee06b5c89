//! User agent classification.
//!
//! Maps a free-text user agent onto the fixed category taxonomy using an
//! ordered rule list; the first rule that matches wins and anything left
//! over is `Other`.

use super::types::Category;

/// A case-sensitive test against a user agent string.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    Contains(&'static str),
    Prefix(&'static str),
}

impl Pattern {
    fn matches(self, user_agent: &str) -> bool {
        match self {
            Pattern::Contains(needle) => user_agent.contains(needle),
            Pattern::Prefix(prefix) => user_agent.starts_with(prefix),
        }
    }
}

/// Matches when every pattern matches.
struct Rule {
    category: Category,
    all_of: &'static [Pattern],
}

/// Evaluated top to bottom.
const RULES: &[Rule] = &[
    Rule {
        category: Category::UasfBip110,
        all_of: &[Pattern::Contains("Knots"), Pattern::Contains("UASF-BIP110")],
    },
    Rule {
        category: Category::Knots,
        all_of: &[Pattern::Contains("Knots")],
    },
    Rule {
        category: Category::Core30,
        all_of: &[Pattern::Prefix("/Satoshi:30.")],
    },
    Rule {
        category: Category::Core28To29,
        all_of: &[Pattern::Prefix("/Satoshi:29.")],
    },
    Rule {
        category: Category::Core28To29,
        all_of: &[Pattern::Prefix("/Satoshi:28.")],
    },
    Rule {
        category: Category::OlderCore,
        all_of: &[Pattern::Prefix("/Satoshi:")],
    },
];

/// Classify a user agent. Total: every string maps to one taxonomy label.
pub fn classify(user_agent: &str) -> Category {
    RULES
        .iter()
        .find(|rule| rule.all_of.iter().all(|p| p.matches(user_agent)))
        .map(|rule| rule.category)
        .unwrap_or(Category::Other)
}
