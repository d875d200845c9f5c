//! Canned stub mappings and request journals

use serde_json::{json, Value};

pub struct TestFixtures;

impl TestFixtures {
    pub const PROJECT: &'static str = "demo";
    pub const SERVICE: &'static str = "api";

    pub fn mapping(url: &str) -> Value {
        json!({
            "request": {"method": "GET", "url": url},
            "response": {"status": 200, "body": "ok"}
        })
    }

    /// Journal with one matched and one unmatched request
    pub fn request_journal() -> Value {
        json!({
            "requests": [
                {
                    "id": "req-1",
                    "request": {"url": "/orders", "method": "GET"},
                    "wasMatched": true,
                    "stubMapping": {"uuid": "stub-orders"}
                },
                {
                    "id": "req-2",
                    "request": {"url": "/users", "method": "GET"},
                    "wasMatched": false
                },
                {
                    "id": "req-3",
                    "request": {"url": "/orders", "method": "GET"},
                    "wasMatched": true,
                    "stubMapping": {"uuid": "stub-other"}
                }
            ],
            "meta": {"total": 3}
        })
    }
}
