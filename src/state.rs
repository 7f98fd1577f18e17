use crate::config::Settings;
use crate::prefs::PrefsStore;
use crate::status::StatusStore;
use crate::worker::WorkerRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub prefs: PrefsStore,
    pub statuses: StatusStore,
    pub workers: WorkerRegistry,
}
