//! Test fixtures and canned tool output

use std::collections::HashMap;

pub struct TestFixtures;

impl TestFixtures {
    pub const PROJECT: &'static str = "demo";
    pub const API_VERSION: &'static str = "1.43";

    pub const WEB: &'static str = "web";
    pub const DB: &'static str = "db";
    pub const CACHE: &'static str = "cache";

    /// Services in declaration order
    pub fn services() -> Vec<String> {
        vec![Self::WEB.to_string(), Self::DB.to_string(), Self::CACHE.to_string()]
    }

    /// Only the database declares a health check
    pub fn declared_health_checks() -> HashMap<String, bool> {
        HashMap::from([(Self::DB.to_string(), true)])
    }

    pub fn container_id(service: &str) -> String {
        format!("{service}-0123456789abcdef")
    }

    pub fn container_name(service: &str) -> String {
        format!("{}-{}-1", Self::PROJECT, service)
    }

    /// Combined compose log as streamed by `logs --no-color -f -t`
    pub fn combined_log() -> String {
        [
            "Attaching to demo-web-1, demo-db-1",
            "demo-web-1  | 2024-05-01T10:00:00.000000000Z listening on :8080",
            "demo-db-1  | 2024-05-01T10:00:00.100000000Z ready to accept connections",
            "demo-web-1  | 2024-05-01T10:00:01.000000000Z GET /health | 200",
            "",
        ]
        .join("\n")
    }

    /// Raw `docker stats` samples, including the clear-screen prefix and placeholders
    pub fn stats_samples() -> String {
        [
            "\u{1b}[2J\u{1b}[H{\"name\": \"demo-web-1\", \"cpu\": \"10.00%\", \"ram\": \"10MiB / 1GiB\", \"net\": \"1KiB / 2KiB\", \"block\": \"0B / 0B\"}",
            "{\"name\": \"demo-db-1\", \"cpu\": \"--\", \"ram\": \"-- / --\", \"net\": \"--\", \"block\": \"--\"}",
            "\u{1b}[2J\u{1b}[H{\"name\": \"demo-web-1\", \"cpu\": \"30.00%\", \"ram\": \"30MiB / 1GiB\", \"net\": \"3KiB / 2KiB\", \"block\": \"4KiB / 0B\"}",
            "{\"name\": \"demo-db-1\", \"cpu\": \"5.00%\", \"ram\": \"100MiB / 1GiB\", \"net\": \"0B / 0B\", \"block\": \"1MiB / 0B\"}",
            "",
        ]
        .join("\n")
    }
}
