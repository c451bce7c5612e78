// libs/conversation-cell/src/script.rs
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use contact_cell::{ConversationResponse, QuestionId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Disqualified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    Ask(QuestionId),
    Finish(Outcome),
}

/// Ordered questions plus a branch table keyed by
/// `(question, normalized answer)`. Answers without a branch entry follow
/// the script order; the last question finishes the flow.
#[derive(Debug, Clone)]
pub struct QuestionScript {
    order: Vec<QuestionId>,
    branches: HashMap<(QuestionId, String), NextStep>,
}

impl Default for QuestionScript {
    fn default() -> Self {
        Self::standard()
    }
}

impl QuestionScript {
    /// The intake script. Clients outside Georgia are disqualified at the
    /// first question.
    pub fn standard() -> Self {
        Self::new(QuestionId::ALL.to_vec())
            .with_branch(QuestionId::GeorgiaLocation, "no", NextStep::Finish(Outcome::Disqualified))
    }

    pub fn new(order: Vec<QuestionId>) -> Self {
        Self {
            order,
            branches: HashMap::new(),
        }
    }

    pub fn with_branch(mut self, question: QuestionId, value: &str, next: NextStep) -> Self {
        self.branches.insert((question, normalize_response(value)), next);
        self
    }

    /// Questions in script order.
    pub fn questions(&self) -> &[QuestionId] {
        &self.order
    }

    pub fn contains(&self, question: QuestionId) -> bool {
        self.order.contains(&question)
    }

    pub fn first(&self) -> NextStep {
        self.order
            .first()
            .map(|q| NextStep::Ask(*q))
            .unwrap_or(NextStep::Finish(Outcome::Completed))
    }

    pub fn prompt(&self, question: QuestionId) -> &'static str {
        match question {
            QuestionId::GeorgiaLocation => "Are you currently located in Georgia? (Yes/No)",
            QuestionId::FitOrFreeOffer => {
                "Would you like to start with a free 15-minute consultation to see if we're a good fit? (Yes/No)"
            }
            QuestionId::PrivatePayRate => {
                "Our sessions are private pay at $150 per session. Does that work for you? (Yes/No)"
            }
            QuestionId::MainFocus => "What would you most like to focus on in therapy?",
            QuestionId::PullForwardOffer => {
                "If an earlier appointment opens up, would you like us to offer it to you? (Yes/No)"
            }
        }
    }

    pub fn default_successor(&self, question: QuestionId) -> NextStep {
        let position = self.order.iter().position(|q| *q == question);
        match position.and_then(|i| self.order.get(i + 1)) {
            Some(next) => NextStep::Ask(*next),
            None => NextStep::Finish(Outcome::Completed),
        }
    }

    pub fn next_after(&self, question: QuestionId, response_value: &str) -> NextStep {
        self.branches
            .get(&(question, normalize_response(response_value)))
            .copied()
            .unwrap_or_else(|| self.default_successor(question))
    }

    /// Walks the branch path from the first question through the recorded
    /// answers. Returns the questions on that path, in order, and the step
    /// the contact is at. Answers off the path are ignored.
    pub fn walk(&self, responses: &BTreeMap<QuestionId, ConversationResponse>) -> (Vec<QuestionId>, NextStep) {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut step = self.first();

        while let NextStep::Ask(question) = step {
            let Some(answer) = responses.get(&question) else {
                break;
            };
            if !visited.insert(question) {
                warn!("Branch table loops back to {}; treating flow as complete", question);
                return (path, NextStep::Finish(Outcome::Completed));
            }
            path.push(question);
            step = self.next_after(question, &answer.response_value);
        }

        (path, step)
    }
}

const YES_WORDS: &[&str] = &[
    "y", "yes", "yeah", "yea", "yep", "yup", "sure", "ok", "okay", "absolutely", "definitely", "of course",
    "correct",
];
const NO_WORDS: &[&str] = &["n", "no", "nope", "nah", "not really", "no thanks", "no thank you"];

/// Lowercases, trims, drops trailing punctuation and folds yes/no synonyms.
pub fn normalize_response(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim()
        .to_lowercase();

    if YES_WORDS.contains(&cleaned.as_str()) {
        "yes".to_string()
    } else if NO_WORDS.contains(&cleaned.as_str()) {
        "no".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn answer(value: &str) -> ConversationResponse {
        ConversationResponse {
            question: String::new(),
            response: value.to_string(),
            response_value: value.to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_synonyms() {
        assert_eq!(normalize_response(" Yep! "), "yes");
        assert_eq!(normalize_response("NOPE"), "no");
        assert_eq!(normalize_response("Anxiety and stress."), "anxiety and stress");
    }

    #[test]
    fn test_default_successor_follows_order() {
        let script = QuestionScript::standard();
        assert_eq!(
            script.next_after(QuestionId::GeorgiaLocation, "yes"),
            NextStep::Ask(QuestionId::FitOrFreeOffer)
        );
        assert_eq!(
            script.next_after(QuestionId::PullForwardOffer, "yes"),
            NextStep::Finish(Outcome::Completed)
        );
    }

    #[test]
    fn test_georgia_no_disqualifies() {
        let script = QuestionScript::standard();
        assert_eq!(
            script.next_after(QuestionId::GeorgiaLocation, "Nope"),
            NextStep::Finish(Outcome::Disqualified)
        );
    }

    #[test]
    fn test_walk_ignores_answers_off_the_path() {
        let script = QuestionScript::standard();
        let mut responses = BTreeMap::new();
        responses.insert(QuestionId::MainFocus, answer("grief"));

        let (path, step) = script.walk(&responses);
        assert!(path.is_empty());
        assert_eq!(step, NextStep::Ask(QuestionId::GeorgiaLocation));

        responses.insert(QuestionId::GeorgiaLocation, answer("yes"));
        responses.insert(QuestionId::FitOrFreeOffer, answer("yes"));
        let (path, step) = script.walk(&responses);
        assert_eq!(path, vec![QuestionId::GeorgiaLocation, QuestionId::FitOrFreeOffer]);
        assert_eq!(step, NextStep::Ask(QuestionId::PrivatePayRate));
    }

    #[test]
    fn test_custom_branch_can_skip_ahead() {
        let script = QuestionScript::standard().with_branch(
            QuestionId::FitOrFreeOffer,
            "no",
            NextStep::Ask(QuestionId::MainFocus),
        );
        assert_eq!(
            script.next_after(QuestionId::FitOrFreeOffer, "no"),
            NextStep::Ask(QuestionId::MainFocus)
        );
    }

    #[test]
    fn test_looping_branch_terminates() {
        let script = QuestionScript::standard().with_branch(
            QuestionId::FitOrFreeOffer,
            "maybe",
            NextStep::Ask(QuestionId::GeorgiaLocation),
        );
        let mut responses = BTreeMap::new();
        responses.insert(QuestionId::GeorgiaLocation, answer("yes"));
        responses.insert(QuestionId::FitOrFreeOffer, answer("maybe"));

        let (_, step) = script.walk(&responses);
        assert_eq!(step, NextStep::Finish(Outcome::Completed));
    }
}
