//! decorate.rs — keyword → emoji annotations prepended to relayed posts.
//!
//! Matching is case-insensitive substring search. Every hit adds one line,
//! in table order, above the original message.

const CROSS: &str = "\u{274C}";
const RED: &str = "\u{1F534}";
const ORANGE: &str = "\u{1F7E0}";
const YELLOW: &str = "\u{1F7E1}";
const GREEN: &str = "\u{1F7E2}";
const BLUE: &str = "\u{1F535}";
const QUESTION: &str = "\u{2753}";

/// `(keyword, emoji, repeat)`.
const KEYWORDS: &[(&str, &str, usize)] = &[
    ("ruled out", CROSS, 5),
    ("doubtful", RED, 5),
    ("questionable", ORANGE, 3),
    ("probable", YELLOW, 3),
    ("expected to play", YELLOW, 3),
    ("available to play", GREEN, 3),
    ("will play", GREEN, 3),
    ("will start", GREEN, 3),
    ("a game-time decision", BLUE, 3),
    ("bench", QUESTION, 1),
    ("limit", QUESTION, 2),
    ("expects", ORANGE, 3),
    ("likely to play", YELLOW, 3),
    ("unlikely to play", ORANGE, 3),
    ("listed out", CROSS, 5),
];

fn annotation(keyword: &str, emoji: &str, repeat: usize) -> String {
    format!("{} \"{}\"", emoji.repeat(repeat), keyword)
}

pub fn add_emoticons(post: &str) -> String {
    let lowered = post.to_lowercase();
    let mut out = String::new();
    for (keyword, emoji, repeat) in KEYWORDS {
        if lowered.contains(keyword) {
            out.push_str(&annotation(keyword, emoji, *repeat));
            out.push('\n');
        }
    }
    out.push_str(post);
    out
}
