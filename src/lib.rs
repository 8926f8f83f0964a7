pub mod artifacts;
pub mod audiobook;
pub mod config;
pub mod doc_processor;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod pptx;
pub mod retrieval;
pub mod session;
pub mod slides;
pub mod sources;
pub mod study;
pub mod summarize;

#[cfg(feature = "desktop")]
mod commands;

use tracing_subscriber::EnvFilter;

/// Log to stderr. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    // A second call (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("study_box_lib=info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use artifacts::ArtifactStore;
    use commands::AppState;
    use config::Settings;
    use session::SessionStore;
    use tauri::Manager;

    init_tracing();
    let settings = Settings::from_env();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .setup(move |app| {
            let session = SessionStore::new()?;
            let artifacts = ArtifactStore::from_setting(settings.artifact_dir.as_deref())?;
            tracing::info!(artifacts = %artifacts.dir().display(), "study box started");
            app.manage(AppState {
                settings,
                session,
                artifacts,
            });
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::files::pick_documents,
            commands::files::preview_document,
            commands::files::open_artifact,
            commands::files::save_artifact,
            commands::files::artifact_data_uri,
            commands::settings::get_settings,
            commands::settings::list_model_presets,
            commands::chat::process_documents,
            commands::chat::ask_question,
            commands::chat::get_history,
            commands::chat::get_document_text,
            commands::chat::reset_session,
            commands::summary::load_summary_source,
            commands::summary::summarize,
            commands::study::generate_quiz,
            commands::study::generate_flashcards,
            commands::slides::generate_presentation,
            commands::audiobook::generate_audiobook,
            commands::audiobook::generate_cover_art,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
