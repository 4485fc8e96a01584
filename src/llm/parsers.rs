//! Answer extraction from raw model text
//!
//! A parser turns free text into a normalised answer label. Returning `None`
//! marks the turn unparseable; it never aborts a debate.

/// Task-specific answer extraction
pub trait AnswerParser: Send + Sync {
    /// Extract a normalised answer label from model output
    fn parse(&self, text: &str) -> Option<String>;
}

/// Yes/no answers normalised to `"true"` / `"false"`
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolAnswerParser;

impl BoolAnswerParser {
    fn normalise(word: &str) -> Option<&'static str> {
        match word.to_ascii_lowercase().as_str() {
            "true" | "yes" => Some("true"),
            "false" | "no" => Some("false"),
            _ => None,
        }
    }

    /// `{"answer": ...}` in a JSON object, possibly wrapped in prose or a code fence
    fn from_json(text: &str) -> Option<&'static str> {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        let value: serde_json::Value = serde_json::from_str(&text[start..=end]).ok()?;
        match value.get("answer")? {
            serde_json::Value::Bool(true) => Some("true"),
            serde_json::Value::Bool(false) => Some("false"),
            serde_json::Value::String(s) => Self::last_word(s),
            _ => None,
        }
    }

    /// The last `Final Answer:` line
    fn from_final_answer_line(text: &str) -> Option<&'static str> {
        text.lines().rev().find_map(|line| {
            let lower = line.to_ascii_lowercase();
            let pos = lower.find("final answer")?;
            Self::first_word(&line[pos + "final answer".len()..])
        })
    }

    fn words(text: &str) -> impl DoubleEndedIterator<Item = &str> {
        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|w| !w.is_empty())
    }

    fn first_word(text: &str) -> Option<&'static str> {
        Self::words(text).find_map(Self::normalise)
    }

    /// Last whole-word yes/no/true/false wins
    fn last_word(text: &str) -> Option<&'static str> {
        Self::words(text).rev().find_map(Self::normalise)
    }
}

impl AnswerParser for BoolAnswerParser {
    fn parse(&self, text: &str) -> Option<String> {
        Self::from_json(text)
            .or_else(|| Self::from_final_answer_line(text))
            .or_else(|| Self::last_word(text))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Option<String> {
        BoolAnswerParser.parse(text)
    }

    #[test]
    fn test_json_answer() {
        assert_eq!(
            parse(r#"{"reasoning": "the passage says no", "answer": "true"}"#).as_deref(),
            Some("true")
        );
        assert_eq!(parse(r#"{"answer": false}"#).as_deref(), Some("false"));
        assert_eq!(
            parse("```json\n{\"reasoning\": {\"step_1\": \"x\"}, \"answer\": \"Yes\"}\n```").as_deref(),
            Some("true")
        );
    }

    #[test]
    fn test_final_answer_line() {
        let text = "Reasoning: the passage says yes, sort of.\nFinal Answer: false";
        assert_eq!(parse(text).as_deref(), Some("false"));
    }

    #[test]
    fn test_last_occurrence_wins() {
        assert_eq!(parse("At first I thought yes, but no.").as_deref(), Some("false"));
        assert_eq!(parse("No doubt about it: Yes").as_deref(), Some("true"));
    }

    #[test]
    fn test_whole_words_only() {
        // "know" and "nothing" must not count as "no"
        assert_eq!(parse("I know nothing, so: true").as_deref(), Some("true"));
        assert_eq!(parse("I do not know").as_deref(), None);
    }

    #[test]
    fn test_unrecognised() {
        assert_eq!(parse("The passage is unclear."), None);
        assert_eq!(parse(""), None);
    }
}
