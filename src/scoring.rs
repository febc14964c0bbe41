//! Keyword-weighted relevance scoring.
//!
//! For every `(keyword, weight)` pair, in configuration order, three match
//! locations are tested independently with a case-insensitive substring
//! check:
//!
//! | Location | Tag | Multiplier |
//! |----------|-----|------------|
//! | API keyword list | `kw` | 1.0 |
//! | Title | `title` | 0.8 |
//! | Abstract | `abstract` | 0.5 |
//!
//! Every matching location adds `weight × multiplier`. The total is rounded
//! with [`round_score`].
//!
//! `assets/script.js` carries a second implementation of this exact algorithm
//! (`scoreArticle` / `roundScore`) so report pages can re-rank after a weight
//! edit. Both accumulate in the same order and round the same way, so they
//! produce bit-identical scores; the conformance tests below run the script
//! and compare.

use crate::config::KeywordWeights;
use serde::Serialize;
use std::fmt;

/// Where a keyword matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MatchLocation {
    KeywordList,
    Title,
    Abstract,
}

impl MatchLocation {
    /// Test order, which is also the order tags are written in.
    pub const ALL: [MatchLocation; 3] = [
        MatchLocation::KeywordList,
        MatchLocation::Title,
        MatchLocation::Abstract,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            MatchLocation::KeywordList => "kw",
            MatchLocation::Title => "title",
            MatchLocation::Abstract => "abstract",
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            MatchLocation::KeywordList => 1.0,
            MatchLocation::Title => 0.8,
            MatchLocation::Abstract => 0.5,
        }
    }
}

/// The text of one article as seen by the scorer.
#[derive(Debug, Clone, Default)]
pub struct ArticleText<'a> {
    pub title: &'a str,
    pub abstract_text: &'a str,
    pub keywords: Vec<&'a str>,
}

/// One configured keyword and every location it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordMatch {
    pub keyword: String,
    pub locations: Vec<MatchLocation>,
}

impl fmt::Display for KeywordMatch {
    /// `keyword(kw,title,abstract)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.keyword)?;
        for (i, loc) in self.locations.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(loc.tag())?;
        }
        f.write_str(")")
    }
}

/// Result of scoring one article.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Score {
    /// Rounded to two decimals with [`round_score`].
    pub value: f64,
    pub matches: Vec<KeywordMatch>,
}

impl Score {
    /// Match tags, `"; "`-joined.
    pub fn matched_keywords(&self) -> String {
        self.tags().join(crate::models::LIST_SEPARATOR)
    }

    pub fn tags(&self) -> Vec<String> {
        self.matches.iter().map(ToString::to_string).collect()
    }
}

/// Round to two decimals, halves toward +∞.
///
/// The rule is applied to `value × 100` in binary floating point, so
/// `0.125` becomes `0.13` while `1.005` (whose product is 100.49999…)
/// becomes `1.0`.
/// `roundScore` in `assets/script.js` performs the same operations.
pub fn round_score(value: f64) -> f64 {
    let scaled = value * 100.0;
    let floor = scaled.floor();
    let rounded = if scaled - floor >= 0.5 { floor + 1.0 } else { floor };
    rounded / 100.0
}

/// Score one article against the weight configuration.
pub fn score_article(text: &ArticleText<'_>, weights: &KeywordWeights) -> Score {
    let title = text.title.to_lowercase();
    let abstract_text = text.abstract_text.to_lowercase();
    let keywords: Vec<String> = text.keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut total = 0.0_f64;
    let mut matches = Vec::new();

    for (keyword, weight) in weights.iter() {
        let needle = keyword.to_lowercase();
        let mut locations = Vec::new();

        for location in MatchLocation::ALL {
            let hit = match location {
                MatchLocation::KeywordList => keywords.iter().any(|k| k.contains(&needle)),
                MatchLocation::Title => title.contains(&needle),
                MatchLocation::Abstract => abstract_text.contains(&needle),
            };
            if hit {
                total += weight * location.multiplier();
                locations.push(location);
            }
        }

        if !locations.is_empty() {
            matches.push(KeywordMatch {
                keyword: keyword.to_string(),
                locations,
            });
        }
    }

    Score {
        value: round_score(total),
        matches,
    }
}


/// Runs `assets/script.js` in an embedded JavaScript engine and checks it
/// against [`score_article`].
#[cfg(test)]
mod conformance {
    use super::*;
    use crate::config::KeywordWeights;
    use boa_engine::{Context, Source};
    use proptest::prelude::*;
    use crate::models::{ArticleRecord, KeywordList, ReportRow};
    use serde::Deserialize;

    const SCRIPT: &str = include_str!("../assets/script.js");

    #[derive(Debug, Deserialize)]
    struct ClientScore {
        score: f64,
        matched: Vec<String>,
    }

    fn client_context() -> Context {
        let mut context = Context::default();
        context
            .eval(Source::from_bytes(SCRIPT))
            .expect("script.js evaluates without a DOM");
        context
    }

    /// Score `articles` with the browser implementation.
    fn client_scores(
        context: &mut Context,
        articles: &[serde_json::Value],
        weights: &KeywordWeights,
    ) -> Vec<ClientScore> {
        let call = format!(
            "JSON.stringify({}.map(a => scoreArticle(a, {})))",
            serde_json::to_string(articles).unwrap(),
            serde_json::to_string(&weights.entries()).unwrap(),
        );
        let value = context.eval(Source::from_bytes(&call)).expect("scoreArticle runs");
        let out = value
            .to_string(context)
            .expect("string result")
            .to_std_string_escaped();
        serde_json::from_str(&out).unwrap()
    }

    /// The article as the page embeds it: a ranked row serialized to JSON.
    fn client_article(title: &str, abstract_text: &str, keywords: &[String]) -> serde_json::Value {
        let record = ArticleRecord {
            title: Some(title.to_string()),
            abstract_text: Some(abstract_text.to_string()),
            keyword_list: Some(KeywordList {
                keyword: keywords.iter().cloned().map(Some).collect(),
            }),
            ..ArticleRecord::default()
        };
        serde_json::to_value(ReportRow::from_scored(&record, &Score::default())).unwrap()
    }

    #[test]
    fn test_client_matches_worked_examples() {
        let mut context = client_context();
        let weights = KeywordWeights::new(vec![("dashboard".to_string(), 10.0)]);
        let articles = vec![
            client_article("A clinical dashboard for ICU monitoring", "", &[]),
            client_article("ICU monitoring", "A dashboard study.", &[]),
            client_article("Dashboards", "dashboard", &["dashboard".to_string()]),
        ];
        let scores = client_scores(&mut context, &articles, &weights);
        assert_eq!(scores[0].score, 8.0);
        assert_eq!(scores[0].matched, vec!["dashboard(title)"]);
        assert_eq!(scores[1].score, 5.0);
        assert_eq!(scores[1].matched, vec!["dashboard(abstract)"]);
        assert_eq!(scores[2].score, 23.0);
        assert_eq!(scores[2].matched, vec!["dashboard(kw,title,abstract)"]);
    }

    #[test]
    fn test_client_rounding_matches() {
        let mut context = client_context();
        for value in [0.125, -0.125, 2.675, 1.005, 0.0, 12.3449999, 7.77777] {
            let js = context
                .eval(Source::from_bytes(&format!("String(roundScore({value:?}))")))
                .unwrap()
                .to_string(&mut context)
                .unwrap()
                .to_std_string_escaped();
            let parsed: f64 = js.parse().unwrap();
            assert_eq!(parsed.to_bits(), round_score(value).to_bits(), "value {value}");
        }
    }

    #[test]
    fn test_client_keeps_keywords_containing_the_separator() {
        let mut context = client_context();
        let weights = KeywordWeights::new(vec![("dash; board".to_string(), 10.0)]);
        let articles = vec![client_article("", "", &["dash; board".to_string()])];
        let scores = client_scores(&mut context, &articles, &weights);
        assert_eq!(scores[0].score, 10.0);
        assert_eq!(scores[0].matched, vec!["dash; board(kw)"]);
    }

    #[test]
    fn test_integer_like_keywords_keep_configured_order() {
        let mut context = client_context();
        let weights = KeywordWeights::new(vec![
            ("covid".to_string(), 1.0),
            ("2019".to_string(), 1.0),
        ]);
        let articles = vec![client_article("covid 2019", "", &[])];
        let scores = client_scores(&mut context, &articles, &weights);
        assert_eq!(scores[0].matched, vec!["covid(title)", "2019(title)"]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn client_and_server_scores_are_identical(
            articles in proptest::collection::vec(
                (
                    "[a-eA-E é;]{0,20}",
                    "[a-eA-E é;]{0,40}",
                    proptest::collection::vec("[a-eA-E é;]{1,8}", 0..4),
                ),
                1..8,
            ),
            entries in proptest::collection::vec(("[a-eA-E ;]{0,3}", -50i32..200), 1..8),
        ) {
            let weights = KeywordWeights::new(
                entries.iter().map(|(k, w)| (k.clone(), f64::from(*w) / 7.0)).collect(),
            );
            let embedded: Vec<serde_json::Value> = articles
                .iter()
                .map(|(t, a, k)| client_article(t, a, k))
                .collect();

            let mut context = client_context();
            let client = client_scores(&mut context, &embedded, &weights);

            for ((title, abstract_text, keywords), client) in articles.iter().zip(&client) {
                let server = score_article(
                    &ArticleText {
                        title,
                        abstract_text,
                        keywords: keywords.iter().map(String::as_str).collect(),
                    },
                    &weights,
                );
                prop_assert_eq!(server.value.to_bits(), client.score.to_bits());
                prop_assert_eq!(server.tags(), client.matched.clone());
            }
        }
    }
}
