use std::cmp::Ordering;

/// Access to the text fields a query is scored against.
pub trait TextFields {
    fn text_keys(&self) -> &'static [&'static str];
    fn text_field(&self, key: &str) -> Option<&str>;
}

/// An item that cleared the similarity threshold, with the keys that matched.
#[derive(Debug, Clone)]
pub struct FuzzyMatch<'a, T> {
    pub item: &'a T,
    pub score: f32,
    pub highlights: Vec<&'static str>,
}

/// Token similarities below this are treated as noise rather than near-misses.
const NEAR_MATCH_FLOOR: f64 = 0.85;

pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// Score `query` against every text key of every item and return the items
/// above `threshold`, best first. Ties keep input order. An empty or
/// whitespace-only query matches nothing.
pub fn fuzzy_search<'a, T: TextFields>(
    items: &'a [T],
    query: &str,
    threshold: f32,
) -> Vec<FuzzyMatch<'a, T>> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for item in items {
        let mut best = 0.0f32;
        let mut highlights = Vec::new();

        for key in item.text_keys() {
            let Some(text) = item.text_field(key) else {
                continue;
            };
            let score = score_text(&query, text);
            if score > threshold {
                highlights.push(*key);
            }
            if score > best {
                best = score;
            }
        }

        if best > threshold {
            matches.push(FuzzyMatch {
                item,
                score: best,
                highlights,
            });
        }
    }

    // Stable sort keeps input order for equal scores
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches
}

/// Similarity of a lowercased query against one text field, in [0, 1].
///
/// Whole-query containment is the strongest signal; otherwise each query
/// token is scored against the closest text token, tolerating near-miss
/// spellings via Jaro-Winkler above [`NEAR_MATCH_FLOOR`].
pub fn score_text(query: &str, text: &str) -> f32 {
    if query.is_empty() || text.is_empty() {
        return 0.0;
    }
    let text = text.to_lowercase();

    if text.contains(query) {
        let coverage = query.chars().count() as f32 / text.chars().count() as f32;
        return (0.6 + 0.4 * coverage).min(1.0);
    }

    let text_tokens: Vec<&str> = text.split_whitespace().collect();
    if text_tokens.is_empty() {
        return 0.0;
    }

    let mut total = 0.0f32;
    let mut count = 0usize;
    for query_token in query.split_whitespace() {
        let mut best = 0.0f32;
        for text_token in &text_tokens {
            let score = score_token(query_token, text_token);
            if score > best {
                best = score;
            }
            if best >= 1.0 {
                break;
            }
        }
        total += best;
        count += 1;
    }

    if count == 0 { 0.0 } else { total / count as f32 }
}

fn score_token(query_token: &str, text_token: &str) -> f32 {
    if text_token.contains(query_token) {
        let coverage = query_token.chars().count() as f32 / text_token.chars().count() as f32;
        return 0.5 + 0.5 * coverage;
    }

    let similarity = strsim::jaro_winkler(query_token, text_token);
    if similarity >= NEAR_MATCH_FLOOR {
        // Map [floor, 1.0] onto (0, 0.5]: a near-miss never outranks containment
        (((similarity - NEAR_MATCH_FLOOR) / (1.0 - NEAR_MATCH_FLOOR)) * 0.5) as f32
    } else {
        0.0
    }
}
