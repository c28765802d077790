//! Case-insensitive subsequence matching for the picker prompt.
//!
//! Whitespace in the query separates terms; every term has to match. Scores
//! favour contiguous runs and matches at word starts, which is enough to rank
//! a few hundred build rows.

/// Score `haystack` against `query`; `None` means filtered out.
pub fn score(query: &str, haystack: &str) -> Option<i64> {
    let hay: Vec<char> = haystack.to_lowercase().chars().collect();
    let mut total = 0i64;
    for term in query.split_whitespace() {
        total += score_term(&term.to_lowercase(), &hay)?;
    }
    Some(total)
}

fn score_term(term: &str, hay: &[char]) -> Option<i64> {
    let mut score = 0i64;
    let mut pos = 0usize;
    let mut prev: Option<usize> = None;
    for qc in term.chars() {
        let idx = pos + hay[pos..].iter().position(|c| *c == qc)?;
        score += 1;
        if prev.is_some_and(|p| p + 1 == idx) {
            score += 5;
        }
        if idx == 0 || is_boundary(hay[idx - 1]) {
            score += 3;
        }
        prev = Some(idx);
        pos = idx + 1;
    }
    Some(score)
}

fn is_boundary(c: char) -> bool {
    c.is_whitespace() || matches!(c, '/' | '-' | '_' | '.' | ':')
}

/// Indices of `items` that match, best first; ties keep input order.
pub fn rank<T, F>(query: &str, items: &[T], haystack: F) -> Vec<usize>
where
    F: Fn(&T) -> String,
{
    if query.trim().is_empty() {
        return (0..items.len()).collect();
    }
    let mut scored: Vec<(i64, usize)> = items
        .iter()
        .enumerate()
        .filter_map(|(i, it)| score(query, &haystack(it)).map(|s| (s, i)))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::{rank, score};

    #[test]
    fn subsequence_matches_case_insensitively() {
        assert!(score("SHDP", "shop/deploy").is_some());
        assert!(score("xyz", "shop/deploy").is_none());
    }

    #[test]
    fn all_terms_must_match() {
        assert!(score("shop error", "abc shop/deploy error").is_some());
        assert!(score("shop running", "abc shop/deploy error").is_none());
    }

    #[test]
    fn contiguous_and_word_start_rank_higher() {
        let items = vec!["d-e-p-l-o-y-x", "shop/deploy", "xdeployx"];
        let got = rank("deploy", &items, |s| s.to_string());
        assert_eq!(got[0], 1);
    }

    #[test]
    fn empty_query_keeps_everything_in_order() {
        let items = vec!["b", "a", "c"];
        assert_eq!(rank("  ", &items, |s| s.to_string()), vec![0, 1, 2]);
    }
}
