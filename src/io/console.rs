use tracing::warn;

/// Output sink of a single process.
#[derive(Debug)]
pub struct Console {
    owner: String,
    lines: Vec<String>,
    closed: bool,
}

impl Console {
    pub fn new(owner: &str) -> Console {
        Console {
            owner: owner.to_string(),
            lines: Vec::new(),
            closed: false,
        }
    }

    pub fn write_line(&mut self, line: &str) {
        if self.closed {
            warn!(owner = %self.owner, line, "write to closed console dropped");
            return;
        }

        println!("[{}] {}", self.owner, line);
        self.lines.push(line.to_string());
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    #[cfg(test)]
    pub fn get_lines(&self) -> &[String] {
        &self.lines
    }
}
