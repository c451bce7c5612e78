// libs/workflow-cell/src/models.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use contact_cell::ContactId;
use shared_config::AppConfig;

pub const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowTrigger {
    AppointmentReminder,
    MissedAppointment,
    QuestionnaireFollowup,
}

impl WorkflowTrigger {
    pub const ALL: [WorkflowTrigger; 3] = [
        WorkflowTrigger::AppointmentReminder,
        WorkflowTrigger::MissedAppointment,
        WorkflowTrigger::QuestionnaireFollowup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowTrigger::AppointmentReminder => "appointment_reminder",
            WorkflowTrigger::MissedAppointment => "missed_appointment",
            WorkflowTrigger::QuestionnaireFollowup => "questionnaire_followup",
        }
    }
}

impl fmt::Display for WorkflowTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleChannel {
    Sms,
    Email,
    /// SMS when the contact has a usable phone number, email otherwise.
    PreferSms,
}

/// One automation rule. `offset` is relative to the rule's anchor:
/// before the appointment for reminders, after it for missed appointments,
/// after the last answer for questionnaire nudges.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRule {
    pub trigger: WorkflowTrigger,
    pub offset: Duration,
    pub channel: RuleChannel,
}

impl WorkflowRule {
    /// Key of the dedupe marker kept in `custom_fields.workflow_marks`.
    pub fn marker_key(&self) -> String {
        match self.trigger {
            WorkflowTrigger::AppointmentReminder => {
                format!("{}_{}h", self.trigger, self.offset.num_hours())
            }
            _ => self.trigger.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub reminder_windows: Vec<Duration>,
    pub no_show_grace: Duration,
    pub questionnaire_stale_after: Duration,
    pub batch_limit: usize,
    pub concurrency: usize,
    pub practice_name: String,
    pub site_url: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            reminder_windows: vec![Duration::hours(24), Duration::hours(2)],
            no_show_grace: Duration::minutes(30),
            questionnaire_stale_after: Duration::hours(24),
            batch_limit: 100,
            concurrency: DEFAULT_CONCURRENCY,
            practice_name: "Therapy Practice".to_string(),
            site_url: "http://localhost:3000".to_string(),
        }
    }
}

impl WorkflowConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            reminder_windows: config.reminder_windows_hours.iter().map(|h| Duration::hours(*h)).collect(),
            no_show_grace: Duration::minutes(config.no_show_grace_minutes),
            questionnaire_stale_after: Duration::hours(config.questionnaire_stale_hours),
            batch_limit: config.sweep_batch_limit.max(1),
            concurrency: DEFAULT_CONCURRENCY,
            practice_name: config.practice_name.clone(),
            site_url: config.site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reminder windows narrowest first.
    pub fn sorted_windows(&self) -> Vec<Duration> {
        let mut windows: Vec<Duration> = self
            .reminder_windows
            .iter()
            .copied()
            .filter(|w| *w > Duration::zero())
            .collect();
        windows.sort();
        windows.dedup();
        windows
    }

    pub fn rules(&self) -> Vec<WorkflowRule> {
        let mut rules: Vec<WorkflowRule> = self
            .sorted_windows()
            .into_iter()
            .map(|offset| WorkflowRule {
                trigger: WorkflowTrigger::AppointmentReminder,
                offset,
                channel: RuleChannel::PreferSms,
            })
            .collect();

        rules.push(WorkflowRule {
            trigger: WorkflowTrigger::MissedAppointment,
            offset: self.no_show_grace,
            channel: RuleChannel::PreferSms,
        });
        rules.push(WorkflowRule {
            trigger: WorkflowTrigger::QuestionnaireFollowup,
            offset: self.questionnaire_stale_after,
            channel: RuleChannel::PreferSms,
        });
        rules
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SweepFailure {
    /// Absent when a whole candidate query failed.
    pub contact_id: Option<ContactId>,
    pub trigger: WorkflowTrigger,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub total_processed: usize,
    /// Notifications delivered per trigger.
    pub breakdown: BTreeMap<WorkflowTrigger, usize>,
    pub errors: Vec<SweepFailure>,
    pub processing_time_ms: u64,
}

impl SweepReport {
    pub fn sent(&self, trigger: WorkflowTrigger) -> usize {
        self.breakdown.get(&trigger).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum WorkflowError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}
