//! Near-duplicate text detection
//!
//! Pairwise comparison is quadratic, so candidates go through progressively
//! more expensive filters: length difference, shingle Jaccard, a multiset
//! ratio and finally a longest-common-subsequence ratio. Only comparisons
//! that survive the Jaccard filter count against the pair budget.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Texts shorter than this never take part
pub const MIN_TEXT_CHARS: usize = 300;
/// Largest allowed length difference, as a share of the longer text
const MAX_LENGTH_DIFF: f64 = 0.25;
/// Characters used to build the shingle signature
const SIGNATURE_CHARS: usize = 1200;
const MIN_JACCARD: f64 = 0.18;
/// Characters compared by the ratio filters
const RATIO_CHARS: usize = 2000;
const MIN_QUICK_RATIO: f64 = 0.85;
pub const NEAR_DUPLICATE_RATIO: f64 = 0.90;

static SHINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]{4,}").expect("shingle regex should be valid"));

/// Clusters of near-duplicate pages and the work it took to find them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimilarityOutcome {
    /// Each cluster holds two or more URLs, sorted
    pub clusters: Vec<Vec<String>>,
    /// Comparisons that passed the Jaccard filter
    pub comparisons: usize,
}

struct Candidate<'a> {
    url: &'a str,
    chars: usize,
    signature: HashSet<String>,
    tokens: Vec<String>,
}

impl<'a> Candidate<'a> {
    fn new(url: &'a str, text: &str, chars: usize) -> Self {
        let head: String = text.chars().take(SIGNATURE_CHARS).collect::<String>().to_lowercase();
        let signature = SHINGLE_RE
            .find_iter(&head)
            .map(|m| m.as_str().to_string())
            .collect();
        let tokens = text
            .chars()
            .take(RATIO_CHARS)
            .collect::<String>()
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self {
            url,
            chars,
            signature,
            tokens,
        }
    }
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Upper bound of [`sequence_ratio`]: shared tokens ignoring order
pub fn quick_ratio(a: &[String], b: &[String]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for token in a {
        *counts.entry(token.as_str()).or_default() += 1;
    }
    let mut shared = 0;
    for token in b {
        if let Some(n) = counts.get_mut(token.as_str()) {
            if *n > 0 {
                *n -= 1;
                shared += 1;
            }
        }
    }
    2.0 * shared as f64 / total as f64
}

/// `2 * LCS / (len(a) + len(b))` over token sequences
pub fn sequence_ratio(a: &[String], b: &[String]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for token in a {
        for (j, other) in b.iter().enumerate() {
            current[j + 1] = if token == other {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    2.0 * previous[b.len()] as f64 / total as f64
}

/// Finds groups of pages whose text is nearly identical
///
/// # Arguments
///
/// * `pages` - `(url, collapsed text)` pairs
/// * `max_pairs` - Comparison budget; detection stops once it is spent
pub fn near_duplicate_clusters(pages: &[(&str, &str)], max_pairs: usize) -> SimilarityOutcome {
    let mut candidates: Vec<Candidate> = pages
        .iter()
        .filter_map(|(url, text)| {
            let chars = text.chars().count();
            (chars >= MIN_TEXT_CHARS).then(|| Candidate::new(url, text, chars))
        })
        .collect();
    candidates.sort_by(|a, b| b.chars.cmp(&a.chars));

    let mut comparisons = 0;
    let mut edges: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    'outer: for (i, first) in candidates.iter().enumerate() {
        for second in &candidates[i + 1..] {
            if comparisons >= max_pairs {
                break 'outer;
            }
            let longest = first.chars.max(second.chars) as f64;
            if first.chars.abs_diff(second.chars) as f64 > longest * MAX_LENGTH_DIFF {
                continue;
            }
            if !first.signature.is_empty()
                && !second.signature.is_empty()
                && jaccard(&first.signature, &second.signature) < MIN_JACCARD
            {
                continue;
            }
            comparisons += 1;

            if quick_ratio(&first.tokens, &second.tokens) < MIN_QUICK_RATIO {
                continue;
            }
            if sequence_ratio(&first.tokens, &second.tokens) >= NEAR_DUPLICATE_RATIO {
                edges.entry(first.url).or_default().insert(second.url);
                edges.entry(second.url).or_default().insert(first.url);
            }
        }
    }

    SimilarityOutcome {
        clusters: connected_components(&edges),
        comparisons,
    }
}

fn connected_components(edges: &BTreeMap<&str, BTreeSet<&str>>) -> Vec<Vec<String>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut clusters = Vec::new();
    for &start in edges.keys() {
        if !seen.insert(start) {
            continue;
        }
        let mut component = vec![start.to_string()];
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &next in edges.get(node).into_iter().flatten() {
                if seen.insert(next) {
                    component.push(next.to_string());
                    stack.push(next);
                }
            }
        }
        if component.len() > 1 {
            component.sort();
            clusters.push(component);
        }
    }
    clusters
}
