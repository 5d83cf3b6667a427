//! Keyword Extractor
//!
//! Heuristic, frequency-based extraction of the two most representative
//! title keywords of a news article, plus composite key construction and
//! article scoring. Everything here is pure and never fails: degenerate
//! input simply yields fewer keywords.

use trend_core::{KeywordScore, COMPOSITE_DELIMITER};

/// Base score every analyzed article starts with
pub const BASE_SCORE: u32 = 10;

/// Upper bound on the body-frequency bonus
pub const FREQUENCY_CAP: u32 = 5;

/// Extra weight a composite keyword gets over its constituents
pub const COMPOSITE_BOOST: u32 = 5;

/// Number of keywords taken from each title
const TOP_KEYWORDS: usize = 2;

/// Characters removed from tokens wherever they appear
const STRIP_CHARS: &[char] = &[
    '"', '\'', '`', '“', '”', '‘', '’', '「', '」', '『', '』', '《', '》', '〈', '〉', '【', '】',
    '〔', '〕', ',', '.', ';', ':', '!', '?', '-', '_', '=', '+', '[', ']', '{', '}', '(', ')',
];

/// Single-character particles dropped from the end of a token
const TRAILING_PARTICLES: &[char] = &[
    '은', '는', '이', '가', '을', '를', '의', '에', '로', '와', '과', '도',
];

/// Bylines, connectives, places and other tokens that never make a trend
const STOP_WORDS: &[&str] = &[
    "기자", "보도", "관련", "이번", "대한", "통해", "에서", "으로", "했다", "한다", "있는",
    "그리고", "하지만", "등", "있다", "연합뉴스", "뉴스", "사진", "제공", "가능성", "상황",
    "문제", "이슈", "내용", "기술", "오늘", "기업", "감독", "배우", "대표", "수사", "사업",
    "판매", "지원", "속보", "사진아이덴티티", "포토", "사설", "AI", "2026", "대한민국",
    "퍼스트브랜드", "포토+", "서울", "제주", "경찰",
];

/// Result of analyzing one article
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleAnalysis {
    /// Up to two keywords, most frequent first
    pub keywords: Vec<String>,
    /// Sorted `A:B` key, empty when fewer than two keywords were found
    pub composite_key: String,
    /// `BASE_SCORE + min(body matches, FREQUENCY_CAP)`
    pub score: u32,
}

impl ArticleAnalysis {
    /// Weights to persist for this article.
    ///
    /// Single keywords score `score - rank_index`; a non-empty composite key
    /// is added with `score + COMPOSITE_BOOST` so the issue outranks its
    /// constituents from the same article.
    pub fn keyword_scores(&self) -> Vec<KeywordScore> {
        let score = f64::from(self.score);
        let mut scores: Vec<KeywordScore> = self
            .keywords
            .iter()
            .enumerate()
            .map(|(idx, keyword)| KeywordScore::new(keyword.clone(), score - idx as f64))
            .collect();

        if !self.composite_key.is_empty() {
            scores.push(KeywordScore::new(
                self.composite_key.clone(),
                score + f64::from(COMPOSITE_BOOST),
            ));
        }

        scores
    }
}

/// Analyze a title/body pair
pub fn analyze(title: &str, content_body: &str) -> ArticleAnalysis {
    let title_tokens = tokenize(title);
    let body_tokens = tokenize(content_body);

    let keywords = rank_title_tokens(&title_tokens, &body_tokens);

    ArticleAnalysis {
        composite_key: composite_key(&keywords),
        score: calculate_score(&keywords, &body_tokens),
        keywords,
    }
}

/// Build the canonical composite key for a keyword list
///
/// The two keywords are sorted before joining so `[A, B]` and `[B, A]`
/// collapse to the same key.
pub fn composite_key(keywords: &[String]) -> String {
    if keywords.len() < TOP_KEYWORDS {
        return String::new();
    }

    let mut pair: Vec<&str> = keywords[..TOP_KEYWORDS].iter().map(String::as_str).collect();
    pair.sort_unstable();
    pair.join(&COMPOSITE_DELIMITER.to_string())
}

/// Score an article from its extracted keywords and tokenized body
pub fn calculate_score(keywords: &[String], body_tokens: &[String]) -> u32 {
    let matches: u32 = keywords
        .iter()
        .map(|kw| count_in_body(kw, body_tokens))
        .sum();
    BASE_SCORE + matches.min(FREQUENCY_CAP)
}

/// Split text into cleaned, filtered tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(strip_special_chars)
        .map(|t| strip_trailing_particle(&t).to_string())
        .filter(|t| t.chars().count() > 1 && !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Number of body tokens that contain the keyword or are contained by it
pub fn count_in_body(keyword: &str, body_tokens: &[String]) -> u32 {
    body_tokens
        .iter()
        .filter(|t| t.contains(keyword) || keyword.contains(t.as_str()))
        .count() as u32
}

/// Title tokens ordered by `(match count desc, position asc)`, top two kept
fn rank_title_tokens(title_tokens: &[String], body_tokens: &[String]) -> Vec<String> {
    let mut scored: Vec<(usize, &String, u32)> = title_tokens
        .iter()
        .enumerate()
        .map(|(position, kw)| (position, kw, count_in_body(kw, body_tokens)))
        .collect();

    scored.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    scored
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(_, kw, _)| kw.clone())
        .collect()
}

fn strip_special_chars(token: &str) -> String {
    token
        .chars()
        .filter(|c| !STRIP_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

fn strip_trailing_particle(token: &str) -> &str {
    match token.chars().last() {
        Some(last) if TRAILING_PARTICLES.contains(&last) => &token[..token.len() - last.len_utf8()],
        _ => token,
    }
}
