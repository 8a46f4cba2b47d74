use serde::{Deserialize, Serialize};

/// Settings for the greeting handler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GreetingConfig {
    /// Relation read (and created on demand).
    /// TOML: `greeting.table`. Default: `messages`.
    #[serde(default = "default_table")]
    pub table: String,

    /// Text of the row seeded into an empty relation.
    /// TOML: `greeting.default_text`. Default: `Hello User`.
    #[serde(default = "default_text")]
    pub default_text: String,

    /// Treat a rejected creation statement as terminal.
    ///
    /// When `false` the creation result is only logged and the following read decides.
    /// TOML: `greeting.verify_creation`. Default: `false`.
    #[serde(default = "default_verify_creation")]
    pub verify_creation: bool,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            default_text: default_text(),
            verify_creation: default_verify_creation(),
        }
    }
}

fn default_table() -> String {
    "messages".to_string()
}

fn default_text() -> String {
    "Hello User".to_string()
}

fn default_verify_creation() -> bool {
    false
}
