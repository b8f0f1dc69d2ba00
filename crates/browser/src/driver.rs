//! WebDriver executables: which browser, where the driver lives, and the
//! child process serving the session.

use crate::error::{BrowserError, BrowserResult};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::process::{Child, Command};
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// How long a freshly spawned driver gets to open its port.
const DRIVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Supported browsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
    Edge,
}

impl BrowserKind {
    /// Driver executable names, in lookup order.
    pub fn driver_names(&self) -> &'static [&'static str] {
        match self {
            BrowserKind::Chrome => &["chromedriver.exe", "chromedriver"],
            BrowserKind::Firefox => &["geckodriver.exe", "geckodriver"],
            BrowserKind::Edge => &["msedgedriver.exe", "msedgedriver"],
        }
    }

    /// Session capabilities: maximized window, no popup blocking, no
    /// notifications, no GPU, and Chromium automation logging switched off.
    pub fn capabilities(&self) -> Map<String, Value> {
        let chromium_options = json!({
            "args": [
                "--start-maximized",
                "--disable-popup-blocking",
                "--disable-notifications",
                "--disable-gpu",
            ],
            "excludeSwitches": ["enable-logging"],
            "useAutomationExtension": false,
        });

        let mut caps = Map::new();
        match self {
            BrowserKind::Chrome => {
                caps.insert("browserName".into(), json!("chrome"));
                caps.insert("goog:chromeOptions".into(), chromium_options);
            }
            BrowserKind::Edge => {
                caps.insert("browserName".into(), json!("MicrosoftEdge"));
                caps.insert("ms:edgeOptions".into(), chromium_options);
            }
            BrowserKind::Firefox => {
                caps.insert("browserName".into(), json!("firefox"));
            }
        }
        caps
    }
}

impl FromStr for BrowserKind {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chrome" => Ok(BrowserKind::Chrome),
            "firefox" => Ok(BrowserKind::Firefox),
            "edge" => Ok(BrowserKind::Edge),
            other => Err(BrowserError::UnsupportedBrowser(other.to_string())),
        }
    }
}

/// Locate the driver executable.
///
/// An explicit path wins; then the driver names are looked up in
/// `search_dir`, then on `PATH`.
pub fn resolve_driver_path(
    kind: BrowserKind,
    explicit: Option<&Path>,
    search_dir: &Path,
) -> BrowserResult<PathBuf> {
    if let Some(path) = explicit {
        return if path.is_file() {
            Ok(path.to_path_buf())
        } else {
            Err(BrowserError::DriverNotFound(path.display().to_string()))
        };
    }

    let names = kind.driver_names();
    if let Some(local) = find_in_dirs(names, std::iter::once(search_dir.to_path_buf())) {
        return Ok(local);
    }

    let path_dirs = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();
    find_in_dirs(names, path_dirs.into_iter())
        .ok_or_else(|| BrowserError::DriverNotFound(names.join(" / ")))
}

fn find_in_dirs(names: &[&str], dirs: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    for dir in dirs {
        for name in names {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

/// A driver process owned by this run. The process is killed on drop.
pub struct DriverService {
    child: Child,
    port: u16,
}

impl DriverService {
    /// Spawn the driver on a free local port and wait until it listens.
    pub async fn start(executable: &Path) -> BrowserResult<Self> {
        let port = free_port().await?;
        let child = Command::new(executable)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        info!("Started {:?} on port {}", executable, port);

        let service = Self { child, port };
        service.wait_ready().await?;
        Ok(service)
    }

    /// WebDriver endpoint served by this process.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    async fn wait_ready(&self) -> BrowserResult<()> {
        let deadline = Instant::now() + DRIVER_STARTUP_TIMEOUT;
        while Instant::now() < deadline {
            if TcpStream::connect(("127.0.0.1", self.port)).await.is_ok() {
                debug!("Driver ready on port {}", self.port);
                return Ok(());
            }
            sleep(Duration::from_millis(200)).await;
        }
        Err(BrowserError::DriverNotReady(self.port))
    }

    /// Kill the driver process now.
    pub async fn stop(mut self) -> BrowserResult<()> {
        self.child.kill().await?;
        info!("Stopped driver on port {}", self.port);
        Ok(())
    }
}

async fn free_port() -> BrowserResult<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    Ok(listener.local_addr()?.port())
}
