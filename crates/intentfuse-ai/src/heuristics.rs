//! Auxiliary heuristic features appended to the sentence embedding.
//!
//! Cheap lexical cues that separate the intent categories better than the
//! embedding alone: aggregation and time vocabulary, summary and reasoning
//! cue words, question structure, and multi-part markers.
//!
//! | Index | Feature                                   |
//! |-------|-------------------------------------------|
//! | 0     | aggregation term count                    |
//! | 1     | time-window term count                    |
//! | 2     | summary term count                        |
//! | 3     | reasoning term count                      |
//! | 4     | question word count                       |
//! | 5     | `?` count                                 |
//! | 6     | conjunction count                         |
//! | 7     | `,` and `;` count                         |
//! | 8     | contains a digit (0/1)                    |
//! | 9     | contains a year 1900–2099 (0/1)           |
//! | 10    | `ln(1 + token count)`                     |
//! | 11    | starts with a question word (0/1)         |

/// Width of the auxiliary feature vector.
pub const AUX_DIM: usize = 12;

const AGGREGATION_TERMS: &[&str] = &[
    "average",
    "avg",
    "total",
    "sum",
    "count",
    "how many",
    "how much",
    "mean",
    "median",
    "maximum",
    "minimum",
    "max",
    "min",
    "percentage",
    "percent",
    "number of",
    "rate",
];

const TIME_TERMS: &[&str] = &[
    "per year",
    "per month",
    "per week",
    "per day",
    "over time",
    "trend",
    "since",
    "between",
    "last",
    "during",
    "annually",
    "monthly",
    "weekly",
    "daily",
    "yearly",
    "quarter",
    "quarterly",
    "growth",
    "year over year",
];

const SUMMARY_TERMS: &[&str] = &[
    "summarize",
    "summarise",
    "summary",
    "overview",
    "overall",
    "main themes",
    "key themes",
    "key points",
    "in general",
    "describe",
    "highlight",
    "highlights",
    "gist",
];

const REASONING_TERMS: &[&str] = &[
    "why",
    "explain",
    "reason",
    "reasons",
    "cause",
    "caused",
    "because",
    "impact",
    "effect",
    "implication",
    "implications",
    "infer",
    "likely",
    "should",
    "compare",
];

const QUESTION_WORDS: &[&str] = &[
    "what", "who", "when", "where", "which", "how", "why", "whom", "whose",
];

const CONJUNCTIONS: &[&str] = &["and", "also", "as well as", "then", "plus", "additionally"];

/// Heuristic feature extractor. Stateless and deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuxFeatures;

impl AuxFeatures {
    pub fn extract(text: &str) -> [f32; AUX_DIM] {
        let lower = text.to_lowercase();
        let words = tokenize(&lower);

        let starts_with_question = words
            .first()
            .is_some_and(|w| QUESTION_WORDS.contains(&w.as_str()));

        [
            count_terms(&words, AGGREGATION_TERMS),
            count_terms(&words, TIME_TERMS),
            count_terms(&words, SUMMARY_TERMS),
            count_terms(&words, REASONING_TERMS),
            count_terms(&words, QUESTION_WORDS),
            lower.matches('?').count() as f32,
            count_terms(&words, CONJUNCTIONS),
            lower.chars().filter(|c| matches!(c, ',' | ';')).count() as f32,
            flag(lower.chars().any(|c| c.is_ascii_digit())),
            flag(words.iter().any(|w| is_year(w))),
            (words.len() as f32).ln_1p(),
            flag(starts_with_question),
        ]
    }
}

fn flag(b: bool) -> f32 {
    if b { 1.0 } else { 0.0 }
}

/// Split into lowercase alphanumeric words.
fn tokenize(lower: &str) -> Vec<String> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Count occurrences of single- or multi-word terms on word boundaries.
fn count_terms(words: &[String], terms: &[&str]) -> f32 {
    let mut count = 0usize;
    for term in terms {
        let parts: Vec<&str> = term.split(' ').collect();
        if parts.len() > words.len() {
            continue;
        }
        count += words
            .windows(parts.len())
            .filter(|window| window.iter().zip(&parts).all(|(w, p)| w == p))
            .count();
    }
    count as f32
}

fn is_year(word: &str) -> bool {
    word.len() == 4
        && word
            .parse::<u32>()
            .is_ok_and(|y| (1900..=2099).contains(&y))
}
