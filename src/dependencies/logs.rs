//! Install summary

use std::fmt;

/// What one installer run did, grouped for the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Logs {
    pub file_system_actions: Vec<String>,
    pub state_updates: Vec<String>,
    pub issues: Vec<String>,
}

impl Logs {
    pub fn is_empty(&self) -> bool {
        self.file_system_actions.is_empty() && self.state_updates.is_empty() && self.issues.is_empty()
    }

    pub fn file_system_action(&mut self, message: impl Into<String>) {
        self.file_system_actions.push(message.into());
    }

    pub fn state_update(&mut self, message: impl Into<String>) {
        self.state_updates.push(message.into());
    }

    pub fn issue(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.issues.push(message);
    }
}

impl fmt::Display for Logs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sections = [
            ("📁 File System Actions:", "✅", &self.file_system_actions),
            ("💾 State Updates:", "✅", &self.state_updates),
            ("⚠️  Issues:", "⚠️ ", &self.issues),
        ];
        let mut first = true;
        for (title, marker, entries) in sections {
            if entries.is_empty() {
                continue;
            }
            if !first {
                writeln!(f)?;
            }
            first = false;
            writeln!(f, "{}", title)?;
            for entry in entries {
                writeln!(f, "  {} {}", marker, entry)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sections_are_omitted() {
        let mut logs = Logs::default();
        assert!(logs.is_empty());
        logs.state_update("Hello added to flow.json");
        let text = logs.to_string();
        assert!(text.starts_with("💾 State Updates:"));
        assert!(!text.contains("File System"));
        assert!(!text.contains("Issues"));
    }

    #[test]
    fn test_sections_keep_order() {
        let mut logs = Logs::default();
        logs.issue("conflict");
        logs.file_system_action("Foo installed");
        let text = logs.to_string();
        let fs = text.find("📁").unwrap();
        let issues = text.find("Issues").unwrap();
        assert!(fs < issues);
    }
}
