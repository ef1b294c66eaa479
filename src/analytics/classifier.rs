//! Coarse user-agent classification
//!
//! Keyword heuristics only. Results feed analytics breakdowns and are not
//! meant to identify bots or exact browser versions.

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;

use crate::analytics::models::{ClientInfo, UNKNOWN_CLIENT};

static MOBILE: LazyLock<Regex> = LazyLock::new(|| keyword_set("Mobile|Android|iPhone|iPad"));
static BROWSER: LazyLock<Regex> = LazyLock::new(|| keyword_set("Chrome|Safari|Firefox|Edge"));
static OS: LazyLock<Regex> = LazyLock::new(|| keyword_set("Windows|Mac|Linux|Android|iOS"));

fn keyword_set(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("keyword pattern is a valid regex")
}

/// Turns a raw user-agent into device, browser and OS labels
pub trait ClientClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> ClientInfo;
}

/// Keyword classifier. For browser and OS the leftmost keyword found in the
/// user-agent wins, and the label is the text exactly as it appears there.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl ClientClassifier for KeywordClassifier {
    fn classify(&self, user_agent: &str) -> ClientInfo {
        let device_type = if MOBILE.is_match(user_agent) {
            "mobile"
        } else {
            "desktop"
        };

        ClientInfo {
            device_type: device_type.to_string(),
            browser: first_keyword(&BROWSER, user_agent),
            os: first_keyword(&OS, user_agent),
        }
    }
}

fn first_keyword(set: &Regex, user_agent: &str) -> String {
    set.find(user_agent)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
