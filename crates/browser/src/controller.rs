//! WebDriver-backed browser controller.

use crate::driver::{resolve_driver_path, BrowserKind, DriverService};
use crate::error::{BrowserError, BrowserResult};
use crate::selector::{Selector, Strategy};
use crate::{Browser, BrowserLauncher};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// Interval between polls while waiting for elements, tabs and alerts.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// How to obtain a WebDriver session.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub kind: BrowserKind,
    /// Existing WebDriver endpoint. When unset, a driver is spawned.
    pub webdriver_url: Option<String>,
    /// Explicit driver executable.
    pub driver_path: Option<PathBuf>,
    /// Directory searched for a bundled driver executable.
    pub search_dir: PathBuf,
}

/// Browser controller wrapping a WebDriver session.
pub struct WebController {
    client: Option<Client>,
    driver: Option<DriverService>,
}

fn locator(strategy: Strategy, query: &str) -> Locator<'_> {
    match strategy {
        Strategy::Id => Locator::Id(query),
        Strategy::XPath => Locator::XPath(query),
        Strategy::Css => Locator::Css(query),
    }
}

impl WebController {
    /// Start a browser session.
    ///
    /// # Arguments
    /// * `options` - Browser kind and where the WebDriver endpoint comes from
    pub async fn launch(options: &LaunchOptions) -> BrowserResult<Self> {
        let (url, driver) = match &options.webdriver_url {
            Some(url) => (url.clone(), None),
            None => {
                let executable = resolve_driver_path(
                    options.kind,
                    options.driver_path.as_deref(),
                    &options.search_dir,
                )?;
                let service = DriverService::start(&executable).await?;
                (service.url(), Some(service))
            }
        };

        let mut builder = ClientBuilder::native();
        builder.capabilities(options.kind.capabilities());
        let client = builder
            .connect(&url)
            .await
            .map_err(|e| {
                error!("Failed to start browser session at {}: {}", url, e);
                BrowserError::from(e)
            })?;

        info!("Browser session started ({:?}) via {}", options.kind, url);
        Ok(Self {
            client: Some(client),
            driver,
        })
    }

    fn client(&self) -> BrowserResult<&Client> {
        self.client.as_ref().ok_or(BrowserError::Closed)
    }

    /// Navigate to a URL (including the scheme).
    pub async fn navigate(&self, url: &str) -> BrowserResult<()> {
        self.client()?.goto(url).await.map_err(|e| {
            error!("Failed to navigate to {}: {}", url, e);
            BrowserError::from(e)
        })?;
        info!("Navigated to {}", url);
        Ok(())
    }

    pub async fn back(&self) -> BrowserResult<()> {
        Ok(self.client()?.back().await?)
    }

    pub async fn forward(&self) -> BrowserResult<()> {
        Ok(self.client()?.forward().await?)
    }

    pub async fn refresh(&self) -> BrowserResult<()> {
        Ok(self.client()?.refresh().await?)
    }

    /// End the session and stop the driver if this controller spawned it.
    pub async fn close(&mut self) -> BrowserResult<()> {
        if let Some(client) = self.client.take() {
            client.close().await?;
            info!("Browser session closed");
        }
        if let Some(driver) = self.driver.take() {
            driver.stop().await?;
        }
        Ok(())
    }

    /// Open a new tab, focus it and optionally navigate.
    pub async fn open_tab(&self, url: Option<&str>) -> BrowserResult<()> {
        let client = self.client()?;
        let window = client.new_window(true).await?;
        client.switch_to_window(window.handle).await?;
        if let Some(url) = url {
            self.navigate(url).await?;
        }
        Ok(())
    }

    /// Focus the tab at `index` in window handle order.
    pub async fn switch_tab(&self, index: usize) -> BrowserResult<()> {
        let client = self.client()?;
        let handle = client
            .windows()
            .await?
            .into_iter()
            .nth(index)
            .ok_or(BrowserError::NoSuchTab(index))?;
        client.switch_to_window(handle).await?;
        Ok(())
    }

    /// Close the current tab and focus the last remaining one.
    pub async fn close_tab(&self) -> BrowserResult<()> {
        let client = self.client()?;
        client.close_window().await?;
        if let Some(last) = client.windows().await?.pop() {
            client.switch_to_window(last).await?;
        }
        Ok(())
    }

    /// Focus the first tab whose title or URL contains the given text.
    ///
    /// # Returns
    /// `true` if a matching tab was found within `timeout`
    pub async fn find_tab(
        &self,
        title_contains: Option<&str>,
        url_contains: Option<&str>,
        timeout: Duration,
    ) -> BrowserResult<bool> {
        let client = self.client()?;
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            for handle in client.windows().await? {
                client.switch_to_window(handle).await?;
                let title_match = match title_contains {
                    Some(text) => client.title().await?.contains(text),
                    None => false,
                };
                let url_match = match url_contains {
                    Some(text) => client.current_url().await?.as_str().contains(text),
                    None => false,
                };
                if title_match || url_match {
                    return Ok(true);
                }
            }
            sleep(Duration::from_millis(500)).await;
        }
        Ok(false)
    }

    /// Wait until the element is present in the DOM and return it.
    async fn find_element(&self, selector: &Selector, timeout: Duration) -> BrowserResult<Element> {
        let (strategy, query) = selector.query();
        let result = self
            .client()?
            .wait()
            .at_most(timeout)
            .every(POLL_INTERVAL)
            .for_element(locator(strategy, &query))
            .await;
        match result {
            Ok(element) => Ok(element),
            Err(CmdError::WaitTimeout) => {
                error!("Element not found: {}", selector);
                Err(BrowserError::ElementNotFound(selector.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Click an element, natively or through `element.click()` in JavaScript.
    pub async fn click_element(
        &self,
        selector: &Selector,
        timeout: Duration,
        via_js: bool,
    ) -> BrowserResult<()> {
        let element = self.find_element(selector, timeout).await?;
        if via_js {
            let arg = serde_json::to_value(&element)?;
            self.client()?
                .execute("arguments[0].click();", vec![arg])
                .await?;
        } else {
            element.click().await?;
        }
        debug!("Clicked {}", selector);
        Ok(())
    }

    /// Clear an input and type `text` into it.
    pub async fn set_value(
        &self,
        selector: &Selector,
        text: &str,
        timeout: Duration,
    ) -> BrowserResult<()> {
        let element = self.find_element(selector, timeout).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    pub async fn text(&self, selector: &Selector, timeout: Duration) -> BrowserResult<String> {
        let element = self.find_element(selector, timeout).await?;
        Ok(element.text().await?)
    }

    /// Current `value` property of an input.
    pub async fn input_value(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> BrowserResult<Option<String>> {
        let element = self.find_element(selector, timeout).await?;
        Ok(element.prop("value").await?)
    }

    pub async fn attribute(
        &self,
        selector: &Selector,
        name: &str,
        timeout: Duration,
    ) -> BrowserResult<Option<String>> {
        let element = self.find_element(selector, timeout).await?;
        Ok(element.attr(name).await?)
    }

    /// Wait until the element is displayed.
    ///
    /// # Returns
    /// `true` if the element became visible within `timeout`
    pub async fn wait_visible(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> BrowserResult<bool> {
        let client = self.client()?;
        let (strategy, query) = selector.query();
        let deadline = Instant::now() + timeout;
        loop {
            match client.find(locator(strategy, &query)).await {
                // Stale or detached elements count as not visible yet.
                Ok(element) => {
                    if element.is_displayed().await.unwrap_or(false) {
                        return Ok(true);
                    }
                }
                Err(e) if e.is_no_such_element() => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                debug!("Element not visible after {:?}: {}", timeout, selector);
                return Ok(false);
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Whether the element is present in the DOM within `timeout`.
    pub async fn exists(&self, selector: &Selector, timeout: Duration) -> BrowserResult<bool> {
        match self.find_element(selector, timeout).await {
            Ok(_) => Ok(true),
            Err(BrowserError::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Select an `<option>` of a `<select>` by its visible text.
    pub async fn select_option(
        &self,
        selector: &Selector,
        label: &str,
        timeout: Duration,
    ) -> BrowserResult<()> {
        let element = self.find_element(selector, timeout).await?;
        element.select_by_label(label).await?;
        Ok(())
    }

    pub async fn scroll_to(&self, selector: &Selector, timeout: Duration) -> BrowserResult<()> {
        let element = self.find_element(selector, timeout).await?;
        let arg = serde_json::to_value(&element)?;
        self.client()?
            .execute("arguments[0].scrollIntoView(true);", vec![arg])
            .await?;
        Ok(())
    }

    /// Send a local file path to an `<input type="file">`.
    pub async fn upload_file(
        &self,
        selector: &Selector,
        file: &Path,
        timeout: Duration,
    ) -> BrowserResult<()> {
        if !file.is_file() {
            return Err(BrowserError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", file.display()),
            )));
        }
        let element = self.find_element(selector, timeout).await?;
        element.send_keys(&file.display().to_string()).await?;
        Ok(())
    }

    pub async fn html(&self) -> BrowserResult<String> {
        Ok(self.client()?.source().await?)
    }

    pub async fn title(&self) -> BrowserResult<String> {
        Ok(self.client()?.title().await?)
    }

    pub async fn url(&self) -> BrowserResult<String> {
        Ok(self.client()?.current_url().await?.to_string())
    }

    pub async fn execute_js(&self, script: &str) -> BrowserResult<Value> {
        Ok(self.client()?.execute(script, vec![]).await?)
    }

    /// Switch into the frame element.
    pub async fn enter_frame(&self, selector: &Selector, timeout: Duration) -> BrowserResult<()> {
        let element = self.find_element(selector, timeout).await?;
        element.enter_frame().await?;
        Ok(())
    }

    /// Return to the top-level document.
    pub async fn leave_frame(&self) -> BrowserResult<()> {
        Ok(self.client()?.enter_frame(None).await?)
    }

    /// Save a PNG screenshot of the current page.
    pub async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        let png = self.client()?.screenshot().await?;
        tokio::fs::write(path, png).await?;
        info!("Saved screenshot to {:?}", path);
        Ok(())
    }

    /// Accept or dismiss an alert if one shows up within `timeout`.
    ///
    /// # Returns
    /// The alert text, or `None` when no alert appeared
    pub async fn handle_alert(
        &self,
        accept: bool,
        timeout: Duration,
    ) -> BrowserResult<Option<String>> {
        let client = self.client()?;
        let deadline = Instant::now() + timeout;
        loop {
            match client.get_alert_text().await {
                Ok(text) => {
                    if accept {
                        client.accept_alert().await?;
                    } else {
                        client.dismiss_alert().await?;
                    }
                    return Ok(Some(text));
                }
                Err(e) => debug!("No alert yet: {}", e),
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

impl Drop for WebController {
    fn drop(&mut self) {
        if self.client.is_some() {
            warn!("Browser session dropped without close()");
        }
    }
}

#[async_trait]
impl Browser for WebController {
    async fn navigate(&self, url: &str) -> BrowserResult<()> {
        WebController::navigate(self, url).await
    }

    async fn wait_visible(&self, selector: &Selector, timeout: Duration) -> BrowserResult<bool> {
        WebController::wait_visible(self, selector, timeout).await
    }

    async fn click(&self, selector: &Selector, timeout: Duration) -> BrowserResult<()> {
        self.click_element(selector, timeout, false).await
    }

    async fn set_value(
        &self,
        selector: &Selector,
        text: &str,
        timeout: Duration,
    ) -> BrowserResult<()> {
        WebController::set_value(self, selector, text, timeout).await
    }

    async fn text(&self, selector: &Selector, timeout: Duration) -> BrowserResult<String> {
        WebController::text(self, selector, timeout).await
    }

    async fn input_value(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> BrowserResult<Option<String>> {
        WebController::input_value(self, selector, timeout).await
    }

    async fn execute_js(&self, script: &str) -> BrowserResult<Value> {
        WebController::execute_js(self, script).await
    }

    async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
        WebController::screenshot(self, path).await
    }

    async fn close(&mut self) -> BrowserResult<()> {
        WebController::close(self).await
    }
}

#[async_trait]
impl BrowserLauncher for LaunchOptions {
    async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
        Ok(Box::new(WebController::launch(self).await?))
    }
}
