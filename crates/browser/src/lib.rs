//! Browser automation for the Tasy web UI.
//!
//! [`WebController`] drives a real browser over WebDriver. The workflow only
//! sees the [`Browser`] and [`BrowserLauncher`] traits so the UI steps can be
//! exercised against fakes.

pub mod controller;
pub mod driver;
pub mod error;
pub mod selector;

pub use controller::{LaunchOptions, WebController};
pub use driver::{BrowserKind, DriverService};
pub use error::{BrowserError, BrowserResult};
pub use selector::Selector;

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// UI operations the workflow relies on.
#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> BrowserResult<()>;

    /// Wait until the element is displayed. `Ok(false)` on timeout.
    async fn wait_visible(&self, selector: &Selector, timeout: Duration) -> BrowserResult<bool>;

    async fn click(&self, selector: &Selector, timeout: Duration) -> BrowserResult<()>;

    /// Clear an input and type `text` into it.
    async fn set_value(
        &self,
        selector: &Selector,
        text: &str,
        timeout: Duration,
    ) -> BrowserResult<()>;

    /// Visible text of the element.
    async fn text(&self, selector: &Selector, timeout: Duration) -> BrowserResult<String>;

    /// Current value of an input element.
    async fn input_value(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> BrowserResult<Option<String>>;

    async fn execute_js(&self, script: &str) -> BrowserResult<serde_json::Value>;

    async fn screenshot(&self, path: &Path) -> BrowserResult<()>;

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// End the session and release the driver.
    async fn close(&mut self) -> BrowserResult<()>;
}

/// Creates browser sessions on demand.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>>;
}
