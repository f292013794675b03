pub mod aggregator;
pub mod audit_log;
pub mod commands;
pub mod config;
pub mod controller;
pub mod models;
pub mod view;

use tauri::Manager;

/// Managed state behind every command.
pub type Dashboard = controller::DashboardController<view::TauriView>;

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let config = config::DashboardConfig::load()?;
            let dashboard = Dashboard::new(&config, view::TauriView::new(app.handle().clone()))?;
            app.manage(dashboard);
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::dashboard::dashboard_snapshot,
            commands::dashboard::login,
            commands::dashboard::logout,
            commands::dashboard::load_clusters,
            commands::dashboard::select_cluster,
            commands::dashboard::select_namespace,
            commands::dashboard::select_deployment,
            commands::dashboard::restart_deployment,
            commands::audit::get_audit_log,
            commands::audit::render_audit_log,
            commands::audit::download_audit_log,
            commands::audit::print_audit_log,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
