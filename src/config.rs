use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Labport";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the application data directory
/// ~/Labport/ on all platforms (user-visible, per design requirement)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Labport")
}

/// Get the directory where the persisted upload task set lives
pub fn uploads_dir() -> PathBuf {
    app_data_dir().join("uploads")
}

/// Default path of the persisted upload task set
pub fn task_set_path() -> PathBuf {
    uploads_dir().join("upload_tasks.json")
}

/// Default tracing filter when RUST_LOG is not set
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}
