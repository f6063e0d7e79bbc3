use db::DBService;
use services::services::{
    activity::ActivityRecorder,
    auth::JwtService,
    config::ServerConfig,
    events::EventBroker,
    notify::Notifier,
    presence::PresenceTracker,
};

pub mod error;
pub mod file_logging;
pub mod middleware;
pub mod routes;
pub mod ws_util;

/// Shared handle threaded through every route as axum state.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    config: ServerConfig,
    jwt: JwtService,
    events: EventBroker,
    presence: PresenceTracker,
    notifier: Notifier,
    activity: ActivityRecorder,
}

impl AppState {
    pub fn new(db: DBService, config: ServerConfig) -> Self {
        let jwt = JwtService::new(&config.jwt_secret, config.token_ttl);
        let events = EventBroker::new();
        let presence = PresenceTracker::new();
        let notifier = Notifier::new(db.pool.clone(), events.clone());
        let activity = ActivityRecorder::new(db.pool.clone(), events.clone());

        Self {
            db,
            config,
            jwt,
            events,
            presence,
            notifier,
            activity,
        }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn events(&self) -> &EventBroker {
        &self.events
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn activity(&self) -> &ActivityRecorder {
        &self.activity
    }
}
