//! Application state and composition.

use std::sync::Arc;

use crate::infrastructure::{
    clock::SystemClock,
    failure_escalation::FailureEscalation,
    ports::{CharacterCatalog, ClockPort, LlmPort, SaveStore, StoryGraphRepo},
    save_store::FsSaveStore,
    settings::EngineSettings,
    theme_store::FsThemeStore,
};
use crate::use_cases::{
    agents::CharacterWorker,
    director::Director,
    saves::{InitializeSave, ManageSaves},
    turn::ProcessInstruction,
    SaveUseCases, TurnUseCases,
};

/// Main application state.
///
/// Passed to HTTP handlers via Axum state.
pub struct App {
    pub use_cases: UseCases,
    pub themes: Arc<dyn StoryGraphRepo>,
    /// Shared with the Oracle wrapper so HTTP can report and resolve it.
    pub escalation: Arc<FailureEscalation>,
}

/// Container for all use cases.
pub struct UseCases {
    pub turn: TurnUseCases,
    pub saves: SaveUseCases,
}

/// Port implementations the use cases are built from.
pub struct AppPorts {
    pub graphs: Arc<dyn StoryGraphRepo>,
    pub catalog: Arc<dyn CharacterCatalog>,
    pub saves: Arc<dyn SaveStore>,
    /// Already wrapped for retries and failure escalation.
    pub llm: Arc<dyn LlmPort>,
    pub clock: Arc<dyn ClockPort>,
}

impl AppPorts {
    /// Filesystem themes and saves from `settings`, the given Oracle.
    pub fn filesystem(settings: &EngineSettings, llm: Arc<dyn LlmPort>) -> Self {
        let themes = Arc::new(FsThemeStore::new(&settings.themes_dir));
        Self {
            graphs: themes.clone(),
            catalog: themes,
            saves: Arc::new(FsSaveStore::new(&settings.save_dir)),
            llm,
            clock: Arc::new(SystemClock::new()),
        }
    }
}

impl App {
    pub fn new(ports: AppPorts, escalation: Arc<FailureEscalation>, settings: &EngineSettings) -> Self {
        let initialize = Arc::new(InitializeSave::new(
            ports.graphs.clone(),
            ports.catalog.clone(),
            ports.saves.clone(),
        ));
        let manage = Arc::new(ManageSaves::new(ports.saves.clone()));

        let worker = Arc::new(CharacterWorker::new(ports.llm.clone()));
        let director = Arc::new(Director::new(ports.llm.clone(), settings.default_elapsed_minutes));
        let process = Arc::new(ProcessInstruction::new(
            ports.graphs.clone(),
            ports.saves.clone(),
            initialize.clone(),
            worker,
            director,
            ports.clock.clone(),
            settings.history_limit,
            settings.default_elapsed_minutes,
        ));

        Self {
            use_cases: UseCases {
                turn: TurnUseCases::new(process),
                saves: SaveUseCases::new(initialize, manage),
            },
            themes: ports.graphs,
            escalation,
        }
    }
}
