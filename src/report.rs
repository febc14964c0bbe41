//! Ranking: score every article, keep those that hit a target keyword, and
//! order them by score.
//!
//! Inclusion is decided per article by the keywords it matched: an article
//! is kept when some target keyword (case-insensitive) is a substring of the
//! name of one of its matched keywords. The weight list and the target list
//! are independent, so an article can carry a positive score from weighted
//! keywords alone and still be left out.
//!
//! Rows are sorted by score, highest first. The sort is stable, so equal
//! scores keep their fetch order and identical inputs always produce the same
//! table.

use crate::config::{KeywordWeights, TargetKeywords};
use crate::models::{ArticleRecord, ReportRow};
use crate::scoring::{Score, score_article};
use std::cmp::Ordering;
use tracing::debug;

/// Whether any matched keyword satisfies a target keyword.
pub fn matches_target(score: &Score, targets: &TargetKeywords) -> bool {
    let matched: Vec<String> = score.matches.iter().map(|m| m.keyword.to_lowercase()).collect();
    targets.iter().any(|target| {
        let target = target.to_lowercase();
        matched.iter().any(|keyword| keyword.contains(&target))
    })
}

/// Sort rows by score, highest first, keeping the relative order of ties.
pub fn sort_by_score(rows: &mut [ReportRow]) {
    rows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}

/// Build the ranked table for one batch of articles.
pub fn build_report(
    articles: &[ArticleRecord],
    weights: &KeywordWeights,
    targets: &TargetKeywords,
) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = articles
        .iter()
        .filter_map(|article| {
            let score = score_article(&article.text(), weights);
            if matches_target(&score, targets) {
                Some(ReportRow::from_scored(article, &score))
            } else {
                debug!(id = article.identifier(), score = score.value, "Article excluded: no target keyword");
                None
            }
        })
        .collect();
    sort_by_score(&mut rows);
    rows
}
