use crate::digest::transport::{HttpRequest, Transport, TransportError};
use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub username: String,
    pub karma: i64,
    pub created_epoch_secs: Option<i64>,
    pub about: Option<String>,
}

impl UserProfile {
    pub fn created_date(&self) -> Option<String> {
        let secs = self.created_epoch_secs?;
        DateTime::from_timestamp(secs, 0).map(|dt| dt.format("%Y-%m-%d").to_string())
    }
}

/// Per-username profile lookups, memoized for the life of the value. Unknown
/// users are memoized too.
pub struct UserDirectory<'a> {
    transport: &'a dyn Transport,
    base_url: String,
    memo: HashMap<String, Option<UserProfile>>,
}

fn parse_profile(username: &str, json: &Value) -> Option<UserProfile> {
    if json.is_null() {
        return None;
    }
    Some(UserProfile {
        username: json
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(username)
            .to_string(),
        karma: json.get("karma").and_then(Value::as_i64).unwrap_or(0),
        created_epoch_secs: json.get("created").and_then(Value::as_i64),
        about: json
            .get("about")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string),
    })
}

impl<'a> UserDirectory<'a> {
    pub fn new(transport: &'a dyn Transport, base_url: &str) -> Self {
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            memo: HashMap::new(),
        }
    }

    pub fn lookup(&mut self, username: &str) -> Result<Option<UserProfile>, TransportError> {
        let key = username.trim().to_string();
        if let Some(cached) = self.memo.get(&key) {
            return Ok(cached.clone());
        }
        let request = HttpRequest::get(format!("{}/user/{key}.json", self.base_url)).expect_404();
        let profile = self
            .transport
            .send_json(&request)?
            .and_then(|json| parse_profile(&key, &json));
        self.memo.insert(key, profile.clone());
        Ok(profile)
    }

    pub fn memoized(&self) -> usize {
        self.memo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::UserDirectory;
    use crate::digest::transport::HttpTransport;
    use mockito::Server;

    #[test]
    fn repeated_lookups_hit_the_network_once() {
        let mut server = Server::new();
        let m = server
            .mock("GET", "/user/pg.json")
            .with_body(r#"{"id": "pg", "karma": 157236, "created": 1160418092, "about": "Bug fixer."}"#)
            .expect(1)
            .create();
        let transport = HttpTransport::new().expect("transport");
        let mut users = UserDirectory::new(&transport, &server.url());

        let first = users.lookup("pg").expect("lookup").expect("profile");
        let second = users.lookup("pg").expect("lookup").expect("profile");
        m.assert();
        assert_eq!(first, second);
        assert_eq!(first.karma, 157236);
        assert_eq!(first.created_date().as_deref(), Some("2006-10-09"));
        assert_eq!(users.memoized(), 1);
    }

    #[test]
    fn unknown_user_is_none_and_memoized() {
        let mut server = Server::new();
        let m = server
            .mock("GET", "/user/ghost.json")
            .with_status(200)
            .with_body("null")
            .expect(1)
            .create();
        let transport = HttpTransport::new().expect("transport");
        let mut users = UserDirectory::new(&transport, &server.url());
        assert!(users.lookup("ghost").expect("lookup").is_none());
        assert!(users.lookup("ghost").expect("lookup").is_none());
        m.assert();
    }
}
