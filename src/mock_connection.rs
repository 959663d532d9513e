//! Scripted [`Connection`] used by the unit tests in place of a real instrument.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::protocol::Connection;

pub struct MockConnection {
    /// Reply returned for every query; `None` makes each query fail.
    reply: Option<String>,
    /// Every command received, in order
    sent: Vec<String>,
}

impl MockConnection {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            sent: Vec::new(),
        }
    }

    /// Fails every query with a protocol error, as a dropped link would.
    pub fn failing() -> Self {
        Self {
            reply: None,
            sent: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[String] {
        &self.sent
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&mut self, command: &str) -> Result<String> {
        self.sent.push(command.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Protocol("simulated missing reply".to_string()))
    }
}
