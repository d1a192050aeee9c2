//! Sentiment analyzer tool: lexicon-based polarity and subjectivity.
//!
//! Each known word carries a polarity in [-1, 1] and a subjectivity in
//! [0, 1]. A preceding intensifier scales the word, a preceding negation
//! flips and halves its polarity. Scores are averaged over the sentiment
//! words found; text without any scores `(0.0, 0.0)`.

use async_trait::async_trait;
use capstone_core::error::ToolError;
use capstone_core::tool::Tool;

pub struct SentimentAnalyzerTool;

#[async_trait]
impl Tool for SentimentAnalyzerTool {
    fn name(&self) -> &str {
        "sentiment_analyzer"
    }

    fn description(&self) -> &str {
        "Analyze the sentiment of an English text. Returns polarity (-1 negative to 1 positive) \
         and subjectivity (0 objective to 1 subjective). Scoring uses a fixed word lexicon; \
         words outside it, sarcasm and idioms do not contribute."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to analyze"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ToolError> {
        let text = arguments["text"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;

        let sentiment = analyze(text);
        Ok(format!(
            "Sentiment(polarity={:?}, subjectivity={:?})",
            sentiment.polarity, sentiment.subjectivity
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    pub polarity: f64,
    pub subjectivity: f64,
}

const NEGATIONS: &[&str] = &["not", "no", "never", "nothing", "hardly", "isn't", "wasn't", "don't", "doesn't", "didn't", "can't", "won't", "aren't"];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("so", 1.2),
    ("quite", 1.1),
    ("too", 1.1),
    ("somewhat", 0.7),
    ("slightly", 0.5),
    ("barely", 0.4),
];

// (word, polarity, subjectivity)
const LEXICON: &[(&str, f64, f64)] = &[
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("excellent", 1.0, 1.0),
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("wonderful", 1.0, 1.0),
    ("fantastic", 0.4, 0.9),
    ("love", 0.5, 0.6),
    ("loved", 0.7, 0.8),
    ("like", 0.2, 0.4),
    ("happy", 0.8, 1.0),
    ("glad", 0.5, 1.0),
    ("nice", 0.6, 1.0),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("beautiful", 0.85, 1.0),
    ("pleasant", 0.73, 0.97),
    ("impressive", 1.0, 1.0),
    ("helpful", 0.5, 0.5),
    ("perfect", 1.0, 1.0),
    ("enjoy", 0.4, 0.5),
    ("enjoyed", 0.4, 0.5),
    ("fun", 0.3, 0.2),
    ("positive", 0.23, 0.55),
    ("success", 0.3, 0.4),
    ("successful", 0.75, 0.95),
    ("easy", 0.43, 0.83),
    ("fast", 0.2, 0.6),
    ("bad", -0.7, 0.67),
    ("terrible", -1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("horrible", -1.0, 1.0),
    ("worst", -1.0, 1.0),
    ("worse", -0.4, 0.6),
    ("poor", -0.4, 0.6),
    ("hate", -0.8, 0.9),
    ("hated", -0.9, 0.7),
    ("sad", -0.5, 1.0),
    ("angry", -0.5, 1.0),
    ("ugly", -0.7, 1.0),
    ("boring", -1.0, 1.0),
    ("disappointing", -0.6, 0.7),
    ("disappointed", -0.75, 0.75),
    ("annoying", -0.8, 0.9),
    ("broken", -0.4, 0.4),
    ("slow", -0.3, 0.39),
    ("difficult", -0.5, 1.0),
    ("hard", -0.29, 0.54),
    ("wrong", -0.5, 0.9),
    ("negative", -0.3, 0.4),
    ("failure", -0.32, 0.3),
    ("failed", -0.5, 0.3),
    ("problem", -0.2, 0.3),
    ("unfortunately", -0.5, 1.0),
    // Praise and approval
    ("brilliant", 0.9, 1.0),
    ("superb", 1.0, 1.0),
    ("outstanding", 0.5, 0.5),
    ("exceptional", 0.67, 0.67),
    ("incredible", 0.9, 0.9),
    ("stunning", 0.5, 1.0),
    ("lovely", 0.5, 0.75),
    ("delightful", 1.0, 1.0),
    ("delicious", 1.0, 1.0),
    ("charming", 0.5, 1.0),
    ("elegant", 0.6, 0.8),
    ("friendly", 0.38, 0.5),
    ("kind", 0.6, 0.9),
    ("generous", 0.5, 0.75),
    ("polite", 0.5, 0.6),
    ("welcoming", 0.5, 0.6),
    ("comfortable", 0.4, 0.7),
    ("clean", 0.37, 0.69),
    ("fresh", 0.3, 0.5),
    ("tasty", 0.7, 0.9),
    ("cool", 0.35, 0.65),
    ("fine", 0.42, 0.5),
    ("decent", 0.17, 0.67),
    ("solid", 0.3, 0.5),
    ("reliable", 0.5, 0.6),
    ("useful", 0.3, 0.1),
    ("valuable", 0.5, 0.6),
    ("effective", 0.6, 0.8),
    ("efficient", 0.5, 0.6),
    ("smooth", 0.4, 0.6),
    ("quick", 0.33, 0.5),
    ("simple", 0.1, 0.36),
    ("intuitive", 0.5, 0.7),
    ("recommend", 0.5, 0.6),
    ("recommended", 0.5, 0.6),
    ("worth", 0.3, 0.1),
    ("satisfied", 0.5, 1.0),
    ("pleased", 0.5, 1.0),
    ("excited", 0.38, 0.75),
    ("exciting", 0.3, 0.8),
    ("thrilled", 0.75, 0.9),
    ("grateful", 0.5, 0.9),
    ("thankful", 0.5, 0.9),
    ("proud", 0.8, 1.0),
    ("calm", 0.3, 0.75),
    ("safe", 0.5, 0.5),
    ("strong", 0.43, 0.73),
    ("improved", 0.4, 0.5),
    ("improvement", 0.3, 0.4),
    ("win", 0.8, 0.4),
    ("won", 0.6, 0.4),
    ("gain", 0.3, 0.3),
    ("growth", 0.2, 0.2),
    ("profit", 0.3, 0.2),
    ("favorite", 0.5, 1.0),
    ("favourite", 0.5, 1.0),
    ("loves", 0.5, 0.6),
    ("likes", 0.2, 0.4),
    ("enjoyable", 0.5, 0.6),
    ("wow", 0.1, 1.0),
    // Criticism and distress
    ("dreadful", -1.0, 1.0),
    ("disgusting", -1.0, 1.0),
    ("pathetic", -1.0, 1.0),
    ("useless", -0.5, 0.2),
    ("worthless", -0.8, 0.8),
    ("mediocre", -0.5, 0.6),
    ("bland", -0.4, 0.6),
    ("stale", -0.5, 0.6),
    ("dirty", -0.6, 0.8),
    ("rude", -0.3, 0.6),
    ("unfriendly", -0.38, 0.5),
    ("unhelpful", -0.5, 0.5),
    ("uncomfortable", -0.5, 0.7),
    ("expensive", -0.5, 0.7),
    ("overpriced", -0.6, 0.8),
    ("cheap", -0.1, 0.6),
    ("noisy", -0.3, 0.6),
    ("crowded", -0.2, 0.5),
    ("confusing", -0.3, 0.7),
    ("complicated", -0.3, 0.6),
    ("frustrating", -0.4, 0.8),
    ("frustrated", -0.6, 0.8),
    ("upset", -0.5, 0.9),
    ("unhappy", -0.6, 0.9),
    ("miserable", -1.0, 1.0),
    ("depressed", -0.7, 0.9),
    ("lonely", -0.5, 0.8),
    ("scared", -0.5, 0.9),
    ("afraid", -0.6, 0.9),
    ("worried", -0.5, 0.9),
    ("anxious", -0.5, 0.9),
    ("stressful", -0.5, 0.8),
    ("painful", -0.7, 0.9),
    ("dangerous", -0.6, 0.9),
    ("weak", -0.38, 0.63),
    ("buggy", -0.5, 0.6),
    ("crash", -0.4, 0.4),
    ("crashed", -0.4, 0.4),
    ("error", -0.3, 0.3),
    ("mistake", -0.4, 0.4),
    ("late", -0.3, 0.6),
    ("delayed", -0.3, 0.4),
    ("loss", -0.3, 0.3),
    ("lost", -0.2, 0.3),
    ("decline", -0.3, 0.3),
    ("fail", -0.5, 0.3),
    ("fails", -0.5, 0.3),
    ("hates", -0.8, 0.9),
    ("dislike", -0.5, 0.6),
    ("regret", -0.6, 0.8),
    ("waste", -0.5, 0.5),
    ("sorry", -0.5, 1.0),
];

pub fn analyze(text: &str) -> Sentiment {
    let words: Vec<String> = text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut polarity_sum = 0.0;
    let mut subjectivity_sum = 0.0;
    let mut scored = 0usize;

    for (i, word) in words.iter().enumerate() {
        let Some(&(_, polarity, subjectivity)) = LEXICON.iter().find(|(w, _, _)| w == word) else {
            continue;
        };

        let mut polarity = polarity;
        let mut subjectivity = subjectivity;
        let previous = i.checked_sub(1).map(|p| words[p].as_str());
        let before_previous = i.checked_sub(2).map(|p| words[p].as_str());

        if let Some(scale) = previous.and_then(intensity) {
            polarity = (polarity * scale).clamp(-1.0, 1.0);
            subjectivity = (subjectivity * scale).clamp(0.0, 1.0);
        }
        if previous.is_some_and(is_negation) || (previous.and_then(intensity).is_some() && before_previous.is_some_and(is_negation)) {
            polarity *= -0.5;
        }

        polarity_sum += polarity;
        subjectivity_sum += subjectivity;
        scored += 1;
    }

    if scored == 0 {
        return Sentiment {
            polarity: 0.0,
            subjectivity: 0.0,
        };
    }
    Sentiment {
        polarity: polarity_sum / scored as f64,
        subjectivity: subjectivity_sum / scored as f64,
    }
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

fn intensity(word: &str) -> Option<f64> {
    INTENSIFIERS.iter().find(|(w, _)| *w == word).map(|(_, s)| *s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_text() {
        let s = analyze("This is a great product.");
        assert_eq!(s.polarity, 0.8);
        assert_eq!(s.subjectivity, 0.75);
    }

    #[test]
    fn negative_text() {
        assert!(analyze("What a terrible, boring film").polarity < -0.9);
    }

    #[test]
    fn neutral_text_scores_zero() {
        let s = analyze("The meeting is on Tuesday at noon.");
        assert_eq!(s, Sentiment { polarity: 0.0, subjectivity: 0.0 });
    }

    #[test]
    fn negation_flips_and_dampens() {
        let s = analyze("not good");
        assert!((s.polarity + 0.35).abs() < 1e-9);
    }

    #[test]
    fn intensifier_scales_and_clamps() {
        assert!((analyze("very good").polarity - 0.91).abs() < 1e-9);
        assert_eq!(analyze("extremely excellent").polarity, 1.0);
    }

    #[test]
    fn negated_intensifier() {
        assert!(analyze("not very good").polarity < 0.0);
    }

    #[test]
    fn everyday_review_vocabulary_is_scored() {
        let review = analyze("The staff were friendly and the breakfast was delicious, but the room was dirty and noisy.");
        assert_ne!(review.polarity, 0.0);
        assert!(review.subjectivity > 0.5);

        assert!(analyze("Support was useless and the app is buggy and frustrating.").polarity < 0.0);
        assert!(analyze("Reliable, intuitive and well worth it. Highly recommend.").polarity > 0.0);
        assert!(analyze("I'm worried and anxious about the delayed launch.").polarity < 0.0);
    }

    #[test]
    fn lexicon_has_no_duplicate_words() {
        let mut words: Vec<&str> = LEXICON.iter().map(|(w, _, _)| *w).collect();
        words.sort_unstable();
        let total = words.len();
        words.dedup();
        assert_eq!(words.len(), total);
        assert!(LEXICON.iter().all(|(_, p, s)| (-1.0..=1.0).contains(p) && (0.0..=1.0).contains(s)));
    }

    #[tokio::test]
    async fn tool_output_format() {
        let out = SentimentAnalyzerTool
            .execute(serde_json::json!({"text": "I love this"}))
            .await
            .unwrap();
        assert_eq!(out, "Sentiment(polarity=0.5, subjectivity=0.6)");

        let neutral = SentimentAnalyzerTool
            .execute(serde_json::json!({"text": "table"}))
            .await
            .unwrap();
        assert_eq!(neutral, "Sentiment(polarity=0.0, subjectivity=0.0)");
    }
}
