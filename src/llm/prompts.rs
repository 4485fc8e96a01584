//! Prompt construction for debate rounds

use crate::core::{PeerView, Question};

const BOOL_JSON_FORMAT: &str = r#"{
    "reasoning": "your reasoning based on the passage",
    "answer": "true/false"
}"#;

const BOOL_JSON_FORMAT_COT: &str = r#"{
    "reasoning": {
        "step_1": "first step of your reasoning",
        "step_2": "second step of your reasoning",
        "step_3": "third step of your reasoning",
        "...": "continue with as many steps as needed"
    },
    "answer": "true/false"
}"#;

const BOOL_TEXT_FORMAT: &str = "Reasoning: your reasoning based on the passage
Final Answer: true/false";

const BOOL_TEXT_FORMAT_COT: &str = "Reasoning:
Step 1: first step of your reasoning
Step 2: second step of your reasoning
Step 3: third step of your reasoning
...
Final Answer: true/false";

/// Builds the prompt each agent receives in a round
pub trait PromptBuilder: Send + Sync {
    /// Opening round: the question alone
    fn round_zero(&self, question: &Question) -> String;

    /// Later rounds: the question plus what peers said last round
    fn round_n(&self, question: &Question, peers: &[&PeerView]) -> String;
}

/// True/false questions over a passage (BoolQ)
#[derive(Debug, Clone, Copy)]
pub struct BoolQPromptBuilder {
    pub use_cot: bool,
    pub json_mode: bool,
}

impl Default for BoolQPromptBuilder {
    fn default() -> Self {
        Self {
            use_cot: true,
            json_mode: false,
        }
    }
}

impl BoolQPromptBuilder {
    pub fn new(use_cot: bool, json_mode: bool) -> Self {
        Self { use_cot, json_mode }
    }

    fn answer_format(&self) -> String {
        let (intro, format) = match (self.json_mode, self.use_cot) {
            (true, true) => ("Answer in the following JSON format:", BOOL_JSON_FORMAT_COT),
            (true, false) => ("Answer in the following JSON format:", BOOL_JSON_FORMAT),
            (false, true) => ("Answer in the following format:", BOOL_TEXT_FORMAT_COT),
            (false, false) => ("Answer in the following format:", BOOL_TEXT_FORMAT),
        };
        format!("{}\n{}\n", intro, format)
    }

    fn question_block(question: &Question) -> String {
        let mut block = format!("Question: {}", question.text);
        if let Some(ref passage) = question.passage {
            block.push_str("\nPassage: ");
            block.push_str(passage);
        }
        block
    }
}

impl PromptBuilder for BoolQPromptBuilder {
    fn round_zero(&self, question: &Question) -> String {
        let mut prompt =
            String::from("You will be given a true or false question which is based on a passage. ");
        prompt.push_str(&self.answer_format());
        prompt.push_str(&Self::question_block(question));
        prompt
    }

    fn round_n(&self, question: &Question, peers: &[&PeerView]) -> String {
        let mut prompt = String::from(
            "Several other models have provided responses to a true or false question, below are their responses:\n",
        );
        for (i, peer) in peers.iter().enumerate() {
            prompt.push_str(&format!("Model {}: {}\n", i + 1, peer.content));
        }
        prompt.push_str("\nConsider these responses when answering the following true or false question.\n");
        prompt.push_str(&self.answer_format());
        prompt.push_str(&Self::question_block(question));
        prompt
    }
}

/// Prompt for the judge model in judge aggregation mode
pub fn judge_prompt(question: &Question, answers: &[(usize, &str, &str)]) -> String {
    let mut prompt = String::from(
        "You are judging a debate between several models on a true or false question. \
         Each model's final answer and reasoning is listed below.\n",
    );
    for (index, answer, text) in answers {
        prompt.push_str(&format!("Model {} answered {}: {}\n", index + 1, answer, text));
    }
    prompt.push_str("\nDecide which answer is best supported by the passage.\n");
    prompt.push_str("Final Answer: true/false\n");
    prompt.push_str(&BoolQPromptBuilder::question_block(question));
    prompt
}
