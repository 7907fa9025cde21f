use std::collections::BTreeSet;

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "an", "and", "are", "as", "at", "be", "been", "but", "by",
    "can", "do", "for", "from", "has", "have", "how", "i", "if", "in", "into", "is", "it",
    "its", "just", "more", "new", "not", "of", "on", "or", "our", "out", "over", "so", "than",
    "that", "the", "their", "this", "to", "up", "us", "was", "we", "what", "when", "which",
    "who", "why", "will", "with", "you", "your",
];

/// Lower-cased word tokens of a title, stop words removed.
pub fn title_tokens(title: &str) -> BTreeSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Jaccard index of two token sets; two empty sets share nothing.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}
