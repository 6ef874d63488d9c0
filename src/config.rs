pub const APP_NAME: &str = "SlideChat";
pub const DATA_DIR_NAME: &str = "slidechat";

/// Environment variable consulted when no `--api-key` is given.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
