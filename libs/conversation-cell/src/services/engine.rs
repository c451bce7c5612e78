// libs/conversation-cell/src/services/engine.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use contact_cell::{
    append_line, Contact, ContactIdentifier, ContactStatus, ContactStore, ContactUpdate, ConversationResponse,
    QuestionId,
};
use shared_utils::format_phone;

use crate::models::{
    AnsweredItem, ConversationError, ConversationState, NextQuestion, ResponseInput, SmsReply,
};
use crate::script::{normalize_response, NextStep, Outcome, QuestionScript};

pub const COMPLETED_MESSAGE: &str =
    "Thank you! That's everything we need. We'll be in touch shortly to schedule your consultation.";
pub const DISQUALIFIED_MESSAGE: &str =
    "Thank you for your interest. We can currently only see clients located in Georgia, \
     but we're happy to share referrals if you reply REFERRAL.";
pub const UNKNOWN_SENDER_MESSAGE: &str =
    "Sorry, we couldn't match this number to a request. Please reach us through our website.";

/// Drives the intake questionnaire. Progress is derived from the stored
/// answers on every call, so the engine keeps no state between requests.
pub struct ConversationEngine {
    store: Arc<dyn ContactStore>,
    script: QuestionScript,
}

impl ConversationEngine {
    pub fn new(store: Arc<dyn ContactStore>, script: QuestionScript) -> Self {
        Self { store, script }
    }

    pub fn script(&self) -> &QuestionScript {
        &self.script
    }

    pub async fn get_state(&self, identifier: &ContactIdentifier) -> Result<ConversationState, ConversationError> {
        let contact = self.store.get(identifier).await?;
        Ok(self.state_for(&contact))
    }

    /// `answered` holds every stored answer, script order first, so answers
    /// off the current branch path are still reported. Only `next` follows
    /// the branch walk.
    pub fn state_for(&self, contact: &Contact) -> ConversationState {
        let responses = &contact.custom_fields.conversation_responses;
        let (_, step) = self.script.walk(responses);

        let unscripted = responses.keys().copied().filter(|q| !self.script.contains(*q));
        let answered = self
            .script
            .questions()
            .iter()
            .copied()
            .chain(unscripted)
            .filter_map(|question_id| {
                responses.get(&question_id).map(|r| AnsweredItem {
                    question_id,
                    question: r.question.clone(),
                    response: r.response.clone(),
                    response_value: r.response_value.clone(),
                    timestamp: r.timestamp,
                })
            })
            .collect();

        match step {
            NextStep::Ask(question) => ConversationState {
                answered,
                next: NextQuestion::Ask(question),
                prompt: Some(self.script.prompt(question).to_string()),
                complete: false,
                outcome: None,
            },
            NextStep::Finish(outcome) => ConversationState {
                answered,
                next: NextQuestion::Complete,
                prompt: None,
                complete: true,
                outcome: Some(outcome),
            },
        }
    }

    /// Merges one answer into the full stored map (sibling answers are kept,
    /// a repeated question overwrites) and persists it with a single update.
    pub async fn record_response(
        &self,
        identifier: &ContactIdentifier,
        input: ResponseInput,
        now: DateTime<Utc>,
    ) -> Result<ConversationState, ConversationError> {
        let question_id: QuestionId = input
            .question_id
            .parse()
            .map_err(|_| ConversationError::InvalidInput(format!("Unknown question id '{}'", input.question_id)))?;
        if !self.script.contains(question_id) {
            return Err(ConversationError::InvalidInput(format!(
                "Question '{}' is not part of this conversation",
                question_id
            )));
        }

        let response = input.response.trim().to_string();
        if response.is_empty() {
            return Err(ConversationError::InvalidInput("Response is required".to_string()));
        }

        let response_value = input
            .response_value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(normalize_response)
            .unwrap_or_else(|| normalize_response(&response));
        let question = input
            .question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .unwrap_or_else(|| self.script.prompt(question_id).to_string());

        let contact = self.store.get(identifier).await?;

        let mut custom_fields = contact.custom_fields.clone();
        let first_answer = custom_fields.conversation_responses.is_empty();
        custom_fields.conversation_responses.insert(
            question_id,
            ConversationResponse {
                question: question.clone(),
                response: response.clone(),
                response_value,
                timestamp: now,
            },
        );

        let (_, step) = self.script.walk(&custom_fields.conversation_responses);
        let target = match step {
            NextStep::Finish(Outcome::Disqualified) => ContactStatus::Lost,
            NextStep::Finish(Outcome::Completed) => ContactStatus::Qualified,
            NextStep::Ask(_) => ContactStatus::Contacted,
        };
        let contact_status = contact.contact_status.advanced_to(target);

        let summary = format!(
            "[{}] Conversation - {}: {}",
            now.format("%Y-%m-%d %H:%M UTC"),
            question,
            response
        );

        let update = ContactUpdate {
            custom_fields: Some(custom_fields),
            notes: Some(Some(append_line(contact.notes.as_deref(), &summary))),
            contact_status: (contact_status != contact.contact_status).then_some(contact_status),
            ..Default::default()
        };

        let updated = self.store.update(&contact.identifier(), update).await?;
        if first_answer {
            info!("Contact {} started the questionnaire", updated.id);
        }
        debug!("Recorded {} for contact {}", question_id, updated.id);

        Ok(self.state_for(&updated))
    }

    /// Treats an inbound SMS as the answer to the sender's current question
    /// and returns the text to reply with.
    pub async fn handle_inbound_sms(
        &self,
        from: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<SmsReply, ConversationError> {
        let phone = match format_phone(from) {
            Ok(phone) => phone,
            Err(e) => {
                warn!("Inbound SMS from unsupported number {}: {}", from, e);
                return Ok(SmsReply { contact_id: None, message: UNKNOWN_SENDER_MESSAGE.to_string() });
            }
        };

        let Some(contact) = self.store.find_by_phone(&phone).await? else {
            warn!("Inbound SMS from unknown number {}", phone);
            return Ok(SmsReply { contact_id: None, message: UNKNOWN_SENDER_MESSAGE.to_string() });
        };

        let state = self.state_for(&contact);
        let NextQuestion::Ask(question) = state.next else {
            debug!("Contact {} replied after finishing the questionnaire", contact.id);
            return Ok(SmsReply {
                contact_id: Some(contact.id),
                message: closing_message(state.outcome),
            });
        };

        if body.trim().is_empty() {
            return Ok(SmsReply {
                contact_id: Some(contact.id),
                message: self.script.prompt(question).to_string(),
            });
        }

        let input = ResponseInput {
            question_id: question.as_str().to_string(),
            question: None,
            response: body.to_string(),
            response_value: None,
        };
        let state = self.record_response(&contact.identifier(), input, now).await?;

        let message = match state.prompt {
            Some(prompt) => prompt,
            None => closing_message(state.outcome),
        };

        Ok(SmsReply { contact_id: Some(contact.id), message })
    }
}

fn closing_message(outcome: Option<Outcome>) -> String {
    match outcome {
        Some(Outcome::Disqualified) => DISQUALIFIED_MESSAGE.to_string(),
        _ => COMPLETED_MESSAGE.to_string(),
    }
}
