// libs/workflow-cell/src/services/sweep.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};

use contact_cell::{
    append_line, AppointmentStatus, Contact, ContactId, ContactIdentifier, ContactQuery, ContactStore, ContactUpdate, StoreError,
};
use conversation_cell::ConversationEngine;
use notification_cell::templates::{
    appointment_reminder, format_appointment_time, missed_appointment, questionnaire_nudge, Notice,
};
use notification_cell::{DeliveryReceipt, NotificationError, NotificationSender};
use shared_utils::to_e164;

use crate::models::{
    RuleChannel, SweepFailure, SweepReport, WorkflowConfig, WorkflowRule, WorkflowTrigger,
};

pub const NO_SHOW_NOTE: &str = "Marked NO_SHOW automatically after the grace period";

type ActionResult = Result<WorkflowTrigger, SweepFailure>;

/// Cron-driven pass over contacts. Each matched rule sends one notification
/// and then records its bookkeeping in one update, so a repeated sweep finds
/// nothing left to do. A failed send leaves the contact untouched for the
/// next sweep.
pub struct WorkflowSweepService {
    store: Arc<dyn ContactStore>,
    notifier: Arc<dyn NotificationSender>,
    conversations: Arc<ConversationEngine>,
    config: WorkflowConfig,
}

impl WorkflowSweepService {
    pub fn new(
        store: Arc<dyn ContactStore>,
        notifier: Arc<dyn NotificationSender>,
        conversations: Arc<ConversationEngine>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            conversations,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let started = Instant::now();
        let mut errors = Vec::new();

        // Rules for the same contact run in order on one task so their
        // updates never race each other.
        let mut planned: BTreeMap<ContactId, (Contact, Vec<WorkflowRule>)> = BTreeMap::new();
        for rule in self.config.rules() {
            match self.candidates(&rule, now).await {
                Ok(contacts) => {
                    for contact in contacts {
                        planned
                            .entry(contact.id.clone())
                            .or_insert_with(|| (contact, Vec::new()))
                            .1
                            .push(rule.clone());
                    }
                }
                Err(e) => {
                    error!("Candidate query for {} failed: {}", rule.marker_key(), e);
                    errors.push(SweepFailure {
                        contact_id: None,
                        trigger: rule.trigger,
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!("Sweep planned actions for {} contacts", planned.len());

        let results: Vec<Vec<ActionResult>> = stream::iter(planned.into_values())
            .map(|(contact, rules)| self.process_contact(contact, rules, now))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut breakdown: BTreeMap<WorkflowTrigger, usize> =
            WorkflowTrigger::ALL.iter().map(|t| (*t, 0)).collect();
        let mut total_processed = 0;

        for result in results.into_iter().flatten() {
            total_processed += 1;
            match result {
                Ok(trigger) => *breakdown.entry(trigger).or_insert(0) += 1,
                Err(failure) => errors.push(failure),
            }
        }

        let report = SweepReport {
            total_processed,
            breakdown,
            errors,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            "Workflow sweep processed {} actions with {} errors in {}ms",
            report.total_processed,
            report.errors.len(),
            report.processing_time_ms
        );
        report
    }

    /// Contacts `rule` applies to, at most `batch_limit` of them. The store
    /// query only narrows rows, so pages are read until enough applicable rows
    /// turn up or the rows run out.
    async fn candidates(&self, rule: &WorkflowRule, now: DateTime<Utc>) -> Result<Vec<Contact>, StoreError> {
        let page_size = self.config.batch_limit.max(1);
        let mut query = match rule.trigger {
            WorkflowTrigger::AppointmentReminder => {
                let widest = self.config.sorted_windows().last().copied().unwrap_or(rule.offset);
                ContactQuery {
                    appointment_status: Some(AppointmentStatus::Scheduled),
                    scheduled_from: Some(now),
                    scheduled_to: Some(now + widest),
                    ..Default::default()
                }
            }
            WorkflowTrigger::MissedAppointment => ContactQuery {
                appointment_status: Some(AppointmentStatus::Scheduled),
                scheduled_to: Some(now - rule.offset),
                ..Default::default()
            },
            WorkflowTrigger::QuestionnaireFollowup => ContactQuery {
                has_conversation_responses: true,
                ..Default::default()
            },
        };
        query.limit = Some(page_size);

        let mut applicable = Vec::new();
        let mut offset = 0;
        loop {
            query.offset = Some(offset);
            let page = self.store.query(&query).await?;
            let fetched = page.len();
            applicable.extend(page.into_iter().filter(|c| self.rule_applies(rule, c, now)));

            if fetched < page_size || applicable.len() >= page_size {
                break;
            }
            offset += fetched;
        }

        applicable.truncate(page_size);
        Ok(applicable)
    }

    /// Whether `rule` should fire for `contact` at `now`.
    pub fn rule_applies(&self, rule: &WorkflowRule, contact: &Contact, now: DateTime<Utc>) -> bool {
        match rule.trigger {
            WorkflowTrigger::AppointmentReminder => self.due_reminder(contact, now).as_ref() == Some(rule),
            WorkflowTrigger::MissedAppointment => {
                contact.appointment_status == Some(AppointmentStatus::Scheduled)
                    && contact.scheduled_appointment_at.is_some_and(|at| at <= now - rule.offset)
            }
            WorkflowTrigger::QuestionnaireFollowup => self.needs_questionnaire_nudge(rule, contact, now),
        }
    }

    /// The reminder rule due for this contact, if any. The narrowest window
    /// containing the appointment applies, and it fires only when no reminder
    /// has gone out since that window opened.
    pub fn due_reminder(&self, contact: &Contact, now: DateTime<Utc>) -> Option<WorkflowRule> {
        if contact.appointment_status != Some(AppointmentStatus::Scheduled) {
            return None;
        }
        let at = contact.scheduled_appointment_at.filter(|at| *at > now)?;

        let window = self.config.sorted_windows().into_iter().find(|w| at - now <= *w)?;
        let window_opened = at - window;
        if contact.last_auto_reminder_sent.is_some_and(|sent| sent >= window_opened) {
            return None;
        }

        Some(WorkflowRule {
            trigger: WorkflowTrigger::AppointmentReminder,
            offset: window,
            channel: RuleChannel::PreferSms,
        })
    }

    fn needs_questionnaire_nudge(&self, rule: &WorkflowRule, contact: &Contact, now: DateTime<Utc>) -> bool {
        let Some(last_answer) = contact.custom_fields.last_response_at() else {
            return false;
        };
        if last_answer > now - rule.offset {
            return false;
        }
        if contact
            .custom_fields
            .workflow_marks
            .get(&rule.marker_key())
            .is_some_and(|marked| *marked >= last_answer)
        {
            return false;
        }
        !self.conversations.state_for(contact).complete
    }

    async fn process_contact(&self, contact: Contact, rules: Vec<WorkflowRule>, now: DateTime<Utc>) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(rules.len());
        let identifier = contact.identifier();

        for rule in rules {
            match self.execute(&identifier, &rule, now).await {
                Ok(true) => results.push(Ok(rule.trigger)),
                Ok(false) => {}
                Err(error) => {
                    warn!("{} failed for contact {}: {}", rule.marker_key(), contact.id, error);
                    results.push(Err(SweepFailure {
                        contact_id: Some(contact.id.clone()),
                        trigger: rule.trigger,
                        error,
                    }));
                }
            }
        }

        results
    }

    /// Runs one rule against the stored contact. Returns `false` when the rule
    /// no longer applies. The contact is read again after sending so answers
    /// or appointment changes made meanwhile survive the bookkeeping write.
    async fn execute(&self, identifier: &ContactIdentifier, rule: &WorkflowRule, now: DateTime<Utc>) -> Result<bool, String> {
        let contact = self
            .store
            .get(identifier)
            .await
            .map_err(|e| format!("reload failed: {}", e))?;
        if !self.rule_applies(rule, &contact, now) {
            debug!("{} no longer applies to contact {}", rule.marker_key(), contact.id);
            return Ok(false);
        }

        let notice = self.notice_for(&contact, rule)?;

        let receipt = self
            .deliver(&contact, rule.channel, &notice)
            .await
            .map_err(|e| format!("notification failed: {}", e))?;
        debug!("Sent {} to contact {} ({})", rule.marker_key(), contact.id, receipt.id);

        let latest = self
            .store
            .get(identifier)
            .await
            .map_err(|e| format!("notification sent but bookkeeping failed: {}", e))?;

        let mut custom_fields = latest.custom_fields.clone();
        custom_fields.workflow_marks.insert(rule.marker_key(), now);

        let mut update = ContactUpdate {
            auto_reminder_count: Some(latest.auto_reminder_count + 1),
            custom_fields: Some(custom_fields),
            ..Default::default()
        };

        match rule.trigger {
            WorkflowTrigger::AppointmentReminder => {
                update.last_auto_reminder_sent = Some(Some(now));
            }
            WorkflowTrigger::MissedAppointment => {
                let unchanged = latest.appointment_status == Some(AppointmentStatus::Scheduled)
                    && latest.scheduled_appointment_at == contact.scheduled_appointment_at;
                if unchanged {
                    update.appointment_status = Some(Some(AppointmentStatus::NoShow));
                    update.appointment_notes =
                        Some(Some(append_line(latest.appointment_notes.as_deref(), NO_SHOW_NOTE)));
                    update.last_appointment_update = Some(now);
                } else {
                    info!("Appointment for contact {} changed while sending, status left as is", latest.id);
                }
            }
            WorkflowTrigger::QuestionnaireFollowup => {}
        }

        self.store
            .update(identifier, update)
            .await
            .map_err(|e| format!("notification sent but bookkeeping failed: {}", e))?;
        Ok(true)
    }

    fn notice_for(&self, contact: &Contact, rule: &WorkflowRule) -> Result<Notice, String> {
        let practice = &self.config.practice_name;
        let first_name = contact.first_name();

        match rule.trigger {
            WorkflowTrigger::AppointmentReminder => {
                let at = contact
                    .scheduled_appointment_at
                    .ok_or_else(|| "appointment time missing".to_string())?;
                let when = format_appointment_time(at, contact.appointment_time_zone.as_deref());
                let cancel_url = format!("{}/appointments/cancel?id={}", self.config.site_url, contact.uuid);
                Ok(appointment_reminder(practice, first_name, &when, rule.offset.num_hours(), &cancel_url))
            }
            WorkflowTrigger::MissedAppointment => {
                let rebook_url = format!("{}/book", self.config.site_url);
                Ok(missed_appointment(practice, first_name, &rebook_url))
            }
            WorkflowTrigger::QuestionnaireFollowup => {
                let prompt = self
                    .conversations
                    .state_for(contact)
                    .prompt
                    .ok_or_else(|| "questionnaire already complete".to_string())?;
                Ok(questionnaire_nudge(practice, first_name, &prompt))
            }
        }
    }

    async fn deliver(
        &self,
        contact: &Contact,
        channel: RuleChannel,
        notice: &Notice,
    ) -> Result<DeliveryReceipt, NotificationError> {
        let sms_number = contact.phone.as_deref().filter(|p| to_e164(p).is_ok());

        match (channel, sms_number) {
            (RuleChannel::Sms | RuleChannel::PreferSms, Some(phone)) => self.notifier.send_sms(phone, &notice.text).await,
            (RuleChannel::Sms, None) => Err(NotificationError::InvalidRecipient(format!(
                "contact {} has no usable phone number",
                contact.id
            ))),
            (RuleChannel::Email | RuleChannel::PreferSms, _) => {
                self.notifier.send_email(&contact.email, &notice.subject, &notice.html).await
            }
        }
    }
}
