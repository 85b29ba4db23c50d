mod config;
mod error;
mod events;
mod file_utils;
mod image_cache;
mod image_loader;
mod services;
mod startup;
mod state;
mod ui;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(debug_assertions)]
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();
    #[cfg(not(debug_assertions))]
    env_logger::init();

    let config = config::ConfigStore::load_default();
    let (dispatcher, ui_loop) = ui::ui_channel();
    let app_state = state::AppState::new(dispatcher, config);
    let services = services::Services::install(&app_state);

    // Setup all event printers before anything can publish
    ui::setup_handlers(&app_state);
    startup::configure_startup_opening(&services.loading, &app_state.config);

    ui::ConsoleFrontEnd::new(app_state, services).run(&ui_loop);

    Ok(())
}
