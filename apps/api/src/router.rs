use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::appointment_routes;
use appointment_cell::services::{booking::AppointmentBookingService, lifecycle::AppointmentLifecycleService};
use contact_cell::router::contact_routes;
use contact_cell::{ContactService, ContactStore, InMemoryContactStore, SupabaseContactStore};
use conversation_cell::router::conversation_routes;
use conversation_cell::{ConversationEngine, QuestionScript};
use notification_cell::{HttpNotificationSender, NotificationSender, RecordingNotificationSender};
use shared_config::{AppConfig, StoreBackend};
use shared_database::supabase::SupabaseClient;
use workflow_cell::router::workflow_routes;
use workflow_cell::{WorkflowConfig, WorkflowState, WorkflowSweepService};

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let (store, notifier): (Arc<dyn ContactStore>, Arc<dyn NotificationSender>) = match config.store_backend {
        StoreBackend::Supabase => (
            Arc::new(SupabaseContactStore::new(Arc::new(SupabaseClient::new(&config)))),
            Arc::new(HttpNotificationSender::from_config(&config)),
        ),
        StoreBackend::Memory => (
            Arc::new(InMemoryContactStore::new()),
            Arc::new(RecordingNotificationSender::new()),
        ),
    };

    let contacts = Arc::new(ContactService::new(store.clone()));
    let lifecycle = Arc::new(AppointmentLifecycleService::new(
        store.clone(),
        config.default_time_zone.clone(),
    ));
    let booking = Arc::new(AppointmentBookingService::new(
        &config,
        contacts.clone(),
        lifecycle.clone(),
        notifier.clone(),
    ));
    let engine = Arc::new(ConversationEngine::new(store.clone(), QuestionScript::standard()));
    let sweep = Arc::new(WorkflowSweepService::new(
        store,
        notifier,
        engine.clone(),
        WorkflowConfig::from_app_config(&config),
    ));

    Router::new()
        .route("/", get(|| async { "Practice CRM API is running!" }))
        .nest("/contacts", contact_routes(config.clone(), contacts))
        .nest(
            "/appointments",
            appointment_routes(config.clone(), AppointmentState { lifecycle, booking }),
        )
        .nest("/conversation", conversation_routes(engine))
        .nest(
            "/workflows",
            workflow_routes(WorkflowState {
                sweep,
                cron_secret: config.cron_secret.clone(),
            }),
        )
}
