use std::collections::HashMap;
use tracing::Level;

#[derive(Debug, Clone)]
pub struct LogConfig {
    global_level: Level,
    scope_levels: HashMap<String, Level>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self {
            global_level: Level::WARN,
            scope_levels: HashMap::new(),
        }
    }

    pub fn from_env(env_var_name: &str) -> Self {
        let mut config = Self::new();

        if let Ok(log_config) = std::env::var(env_var_name) {
            config.parse_config_string(&log_config);
        }

        config
    }

    fn parse_config_string(&mut self, config_str: &str) {
        let parts: Vec<&str> = config_str.split(',').collect();

        for part in parts {
            let part = part.trim();

            if part.contains('=') {
                // Scope-specific level: scope=level
                let scope_parts: Vec<&str> = part.splitn(2, '=').collect();
                if scope_parts.len() == 2 {
                    let scope = scope_parts[0].trim();
                    if let Ok(level) = parse_level(scope_parts[1].trim()) {
                        self.scope_levels.insert(scope.to_string(), level);
                    }
                }
            } else {
                // Global level
                if let Ok(level) = parse_level(part) {
                    self.global_level = level;
                }
            }
        }
    }

    pub fn should_log(&self, scope: &str, level: Level) -> bool {
        let target_level = self.scope_levels.get(scope).unwrap_or(&self.global_level);
        level <= *target_level
    }

    pub fn set_global_level(&mut self, level: Level) {
        self.global_level = level;
    }

    pub fn set_scope_level(&mut self, scope: String, level: Level) {
        self.scope_levels.insert(scope, level);
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_level(level_str: &str) -> Result<Level, ()> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(()),
    }
}

/// Initialize logging with the specified environment variable name.
/// Example: `init_logging("XRKIT_LOG")` with
/// `XRKIT_LOG=warn,input=debug,locomotion=trace`
pub fn init_logging(env_var_name: &str) -> LogConfig {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let config = LogConfig::from_env(env_var_name);
    super::set_log_config(config.clone());
    config
}
