//! Default values and functions for configuration

pub(crate) const DEFAULT_SIGNAL_QUEUE_SIZE: usize = 1024;

pub(crate) fn default_ignore_patterns() -> Vec<String> {
    vec![
        // Editor temporary files
        "*.tmp".to_string(),
        "*.tmp.*".to_string(), // VS Code: file.rs.tmp.12345.67890
        ".*.sw?".to_string(),  // Vim swap files
        "*~".to_string(),
        "#*#".to_string(), // Emacs auto-save
        ".#*".to_string(), // Emacs lock files
        "4913".to_string(),
        // OS-specific files
        ".DS_Store".to_string(),
        "Thumbs.db".to_string(),
    ]
}

pub(crate) fn default_include_hidden() -> bool {
    true
}

pub(crate) fn default_signal_queue_size() -> usize {
    DEFAULT_SIGNAL_QUEUE_SIZE
}
