use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::kernel::Pid;

/// One outstanding blocking read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadTokenRequest {
    pub process_id: Pid,
    pub token_number: usize,
    pub target_variable: String,
    pub file_name: String,
    /// Filled in by the disk. Still `None` after completion means end-of-file.
    pub token: Option<String>,
}

impl ReadTokenRequest {
    pub fn new(file_name: &str, token_number: usize, process_id: Pid, target_variable: &str) -> ReadTokenRequest {
        ReadTokenRequest {
            process_id,
            token_number,
            target_variable: target_variable.to_string(),
            file_name: file_name.to_string(),
            token: None,
        }
    }
}

/// Serves token reads one at a time, each taking a fixed number of ticks.
pub struct Disk {
    pub active_request: Option<ReadTokenRequest>,
    input_dir: PathBuf,
    latency: u64,
    elapsed: u64,
    files: HashMap<String, Vec<String>>,
}

impl Disk {
    pub fn new(input_dir: impl Into<PathBuf>, latency: u64) -> Disk {
        Disk {
            active_request: None,
            input_dir: input_dir.into(),
            latency: latency.max(1),
            elapsed: 0,
            files: HashMap::new(),
        }
    }

    /// Registers file contents directly instead of reading them from the input directory.
    #[cfg(test)]
    pub fn with_file(mut self, file_name: &str, contents: &str) -> Disk {
        self.files.insert(file_name.to_string(), tokenize(contents));
        self
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.active_request.is_some()
    }

    /// Advances the active read by one tick and hands it back once it has finished.
    pub fn tick(&mut self) -> Option<ReadTokenRequest> {
        self.active_request.as_ref()?;

        self.elapsed += 1;
        if self.elapsed < self.latency {
            return None;
        }

        self.elapsed = 0;
        let mut request = self.active_request.take()?;
        request.token = self.read_token(&request.file_name, request.token_number);
        debug!(pid = %request.process_id, file = %request.file_name, token = ?request.token, "read completed");
        Some(request)
    }

    fn read_token(&mut self, file_name: &str, token_number: usize) -> Option<String> {
        if !self.files.contains_key(file_name) {
            let path = self.input_dir.join(file_name);
            let tokens = match fs::read_to_string(&path) {
                Ok(contents) => tokenize(&contents),
                Err(err) => {
                    warn!(file = %path.display(), %err, "input file unreadable, treating as empty");
                    Vec::new()
                }
            };
            self.files.insert(file_name.to_string(), tokens);
        }

        self.files.get(file_name)?.get(token_number).cloned()
    }
}

fn tokenize(contents: &str) -> Vec<String> {
    contents.split_whitespace().map(str::to_string).collect()
}
