#![deny(warnings)]
pub mod gesture;
pub mod history;
pub mod model;

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "bluff-engine"
    }

    pub const fn codename() -> &'static str {
        "Tells"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
