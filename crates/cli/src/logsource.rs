//! File and stdin log sources for the CLI driver.

use async_trait::async_trait;
use logbard_core::collaborator::LogSource;
use logbard_core::error::ProviderError;
use std::io::Read;
use std::path::PathBuf;

/// Reads event lines from a file, or stdin when no path is given.
///
/// Lines are trimmed and blank lines dropped; anything beyond that
/// (control-character stripping, length caps) is the log producer's job.
pub struct FileLogSource {
    path: Option<PathBuf>,
}

impl FileLogSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl LogSource for FileLogSource {
    async fn fetch(&self, _owner_key: &str) -> Result<Vec<String>, ProviderError> {
        let content = match &self.path {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ProviderError::Io(format!("{}: {e}", path.display())))?,
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .map_err(|e| ProviderError::Io(format!("stdin: {e}")))?;
                buffer
            }
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}
