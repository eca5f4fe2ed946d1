//! Fetch stage: make sure every configured resource is staged locally.

use async_trait::async_trait;
use reqwest::Client;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::{EtlError, EtlResult};
use crate::report::{ItemReport, Reporter, StageKind, StageReport};

/// Retrieves one resource into a local file.
#[async_trait]
pub trait Fetcher: std::fmt::Debug + Send + Sync {
    /// Download `url` into `dest`, returning the number of bytes written.
    ///
    /// On error `dest` must not exist afterwards.
    async fn fetch(&self, url: &str, dest: &Path) -> EtlResult<u64>;
}

/// Downloads resources over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose downloads give up after `timeout`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> EtlResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("cinedata/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http })
    }

    async fn download(&self, url: &str, part: &Path) -> EtlResult<u64> {
        let mut response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| EtlError::io(part, e))?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .await
                .map_err(|e| EtlError::io(part, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| EtlError::io(part, e))?;

        Ok(written)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> EtlResult<u64> {
        let part = part_path(dest);
        match self.download(url, &part).await {
            Ok(written) => {
                tokio::fs::rename(&part, dest)
                    .await
                    .map_err(|e| EtlError::io(dest, e))?;
                Ok(written)
            }
            Err(e) => {
                if part.exists() {
                    if let Err(rm) = tokio::fs::remove_file(&part).await {
                        log::warn!("Failed to remove {}: {}", part.display(), rm);
                    }
                }
                Err(e)
            }
        }
    }
}

/// Sibling path used while a file is still being written.
pub(crate) fn part_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".part");
    PathBuf::from(name)
}

/// The Fetch stage: download each resource unless it is already staged.
#[derive(Debug)]
pub struct FetchStage {
    config: Config,
}

impl FetchStage {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Stage every resource, continuing past failures.
    ///
    /// # Errors
    /// Returns an error only if the staging directory cannot be created.
    pub async fn run(
        &self,
        fetcher: &dyn Fetcher,
        reporter: &dyn Reporter,
    ) -> EtlResult<StageReport> {
        let config = &self.config;
        reporter.stage_started(StageKind::Fetch);
        tokio::fs::create_dir_all(&config.staging_dir)
            .await
            .map_err(|e| EtlError::io(&config.staging_dir, e))?;
        let mut report = StageReport::new(StageKind::Fetch);

        for resource in &config.resources {
            let dest = config.staging_dir.join(resource);
            if dest.exists() {
                log::debug!("{} already exists, skipping download", dest.display());
                report.record(reporter, ItemReport::skipped(resource, "already staged"));
                continue;
            }

            let url = config.resource_url(resource);
            log::info!("Downloading {}...", url);
            let item = match fetcher.fetch(&url, &dest).await {
                Ok(bytes) => ItemReport::succeeded(resource, format!("{bytes} bytes")),
                Err(e) => ItemReport::failed(resource, e),
            };
            report.record(reporter, item);
        }

        reporter.stage_finished(&report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ItemStatus, LogReporter};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves fixed bodies by URL suffix and counts requests.
    #[derive(Debug, Default)]
    struct FakeFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn serving(resources: &[&str]) -> Self {
            Self {
                bodies: resources
                    .iter()
                    .map(|r| ((*r).to_string(), format!("body of {r}").into_bytes()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, url: &str, dest: &Path) -> EtlResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let body = self
                .bodies
                .iter()
                .find(|(name, _)| url.ends_with(name.as_str()))
                .map(|(_, body)| body)
                .ok_or_else(|| EtlError::Status {
                    url: url.to_string(),
                    status: 404,
                })?;
            std::fs::write(dest, body).map_err(|e| EtlError::io(dest, e))?;
            Ok(body.len() as u64)
        }
    }

    fn config(temp_dir: &TempDir, resources: &[&str]) -> Config {
        let mut config = Config::default().with_data_dir(temp_dir.path().to_path_buf());
        config.base_url = String::from("http://example.invalid/");
        config.resources = resources.iter().map(|r| (*r).to_string()).collect();
        config
    }

    #[tokio::test]
    async fn test_fetch_downloads_missing_resources() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir, &["a.tsv.gz", "b.tsv.gz"]);
        let fetcher = FakeFetcher::serving(&["a.tsv.gz", "b.tsv.gz"]);

        let report = FetchStage::new(&config)
            .run(&fetcher, &LogReporter)
            .await
            .unwrap();

        assert_eq!(report.succeeded(), 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            std::fs::read(temp_dir.path().join("a.tsv.gz")).unwrap(),
            b"body of a.tsv.gz"
        );
    }

    #[tokio::test]
    async fn test_fetch_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir, &["a.tsv.gz", "b.tsv.gz"]);
        let fetcher = FakeFetcher::serving(&["a.tsv.gz", "b.tsv.gz"]);
        let stage = FetchStage::new(&config);

        stage.run(&fetcher, &LogReporter).await.unwrap();
        let before = std::fs::read(temp_dir.path().join("b.tsv.gz")).unwrap();

        let second = stage.run(&fetcher, &LogReporter).await.unwrap();

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(second.skipped(), 2);
        assert!(second
            .items
            .iter()
            .all(|i| i.status == ItemStatus::Skipped && i.detail == "already staged"));
        assert_eq!(std::fs::read(temp_dir.path().join("b.tsv.gz")).unwrap(), before);
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_stop_batch() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir, &["missing.tsv.gz", "b.tsv.gz"]);
        let fetcher = FakeFetcher::serving(&["b.tsv.gz"]);

        let report = FetchStage::new(&config)
            .run(&fetcher, &LogReporter)
            .await
            .unwrap();

        let missing = report.item("missing.tsv.gz").unwrap();
        assert_eq!(missing.status, ItemStatus::Failed);
        assert!(missing.detail.contains("404"));
        assert_eq!(report.item("b.tsv.gz").unwrap().status, ItemStatus::Succeeded);
        assert!(!temp_dir.path().join("missing.tsv.gz").exists());
    }

    #[tokio::test]
    async fn test_http_fetch_failure_leaves_nothing_staged() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("a.tsv.gz");
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();

        // Nothing listens on port 9 of the loopback interface.
        let result = fetcher.fetch("http://127.0.0.1:9/a.tsv.gz", &dest).await;

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    /// Answer one HTTP request on a loopback port with a canned response.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/title.ratings.tsv.gz")
    }

    #[tokio::test]
    async fn test_http_fetch_streams_body_into_dest() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("title.ratings.tsv.gz");
        let url = serve_once("HTTP/1.1 200 OK", "hello").await;
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();

        let written = fetcher.fetch(&url, &dest).await.unwrap();

        assert_eq!(written, 5);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hello");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_http_error_status_is_a_failure() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("title.ratings.tsv.gz");
        let url = serve_once("HTTP/1.1 404 Not Found", "no such file").await;
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();

        let result = fetcher.fetch(&url, &dest).await;

        match result {
            Err(EtlError::Status { url: failed, status }) => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("expected status error, got {other:?}"),
        }
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn test_part_path() {
        assert_eq!(
            part_path(Path::new("data/title.basics.tsv.gz")),
            PathBuf::from("data/title.basics.tsv.gz.part")
        );
    }
}
