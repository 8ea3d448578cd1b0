//! One virtual user's iteration: chat, think, summary, think.
use crate::config::TargetConfig;
use buddyload::core::RunStatistics;
use buddyload::prelude::*;
use buddyload::Scenario;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

pub const SCENARIO_NAME: &str = "sciencebuddy";

pub const CHAT_PATH: &str = "chat";
pub const SUMMARY_PATH: &str = "summary";

pub const CHAT_MESSAGE: &str = "体積は大きくなる";
pub const SUMMARY_CLASS: u32 = 5;
pub const SUMMARY_NUMBER: u32 = 1;
pub const SUMMARY_UNIT: &str = "空気の温度と体積";

pub const CHAT_CHECK: &str = "chat status 2xx";
pub const SUMMARY_CHECK: &str = "summary status ok";

/// Think time after a chat request.
pub const CHAT_THINK_TIME: Pause =
    Pause::uniform(Duration::from_millis(500), Duration::from_millis(1500));
/// Think time after a summary request.
pub const SUMMARY_THINK_TIME: Pause = Pause::fixed(Duration::from_secs(1));

/// Statuses the summary endpoint may answer with while still counting as healthy. `400` is what
/// the service returns when the conversation is too short to summarize.
const SUMMARY_ACCEPTED: [u16; 5] = [200, 201, 202, 302, 400];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPayload {
    pub message: String,
}

impl Default for ChatPayload {
    fn default() -> Self {
        Self {
            message: CHAT_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryQuery {
    pub class: u32,
    pub number: u32,
    pub unit: String,
}

impl Default for SummaryQuery {
    fn default() -> Self {
        Self {
            class: SUMMARY_CLASS,
            number: SUMMARY_NUMBER,
            unit: SUMMARY_UNIT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub chat: String,
    pub summary: String,
}

impl Endpoints {
    pub fn new(target: &TargetConfig) -> Self {
        Self {
            chat: target.endpoint(CHAT_PATH),
            summary: target.endpoint(SUMMARY_PATH),
        }
    }
}

/// Chat passes on any 2xx.
pub fn chat_status_ok(status: StatusCode) -> bool {
    status.is_success()
}

pub fn summary_status_ok(status: StatusCode) -> bool {
    SUMMARY_ACCEPTED.contains(&status.as_u16())
}

#[derive(Debug, Clone)]
pub struct ScienceBuddy {
    endpoints: Endpoints,
    chat: ChatPayload,
    summary: SummaryQuery,
    chat_pause: Pause,
    summary_pause: Pause,
}

impl ScienceBuddy {
    pub fn new(target: &TargetConfig) -> Self {
        Self {
            endpoints: Endpoints::new(target),
            chat: ChatPayload::default(),
            summary: SummaryQuery::default(),
            chat_pause: CHAT_THINK_TIME,
            summary_pause: SUMMARY_THINK_TIME,
        }
    }

    pub fn with_pauses(mut self, chat: Pause, summary: Pause) -> Self {
        self.chat_pause = chat;
        self.summary_pause = summary;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Run one iteration on the current virtual user's client.
    pub async fn iteration(&self) {
        let client = buddyload::vu::client();

        let chat_result = chat(&client, &self.endpoints.chat, &self.chat).await;
        if !check(CHAT_CHECK, matches!(chat_result, Ok(status) if chat_status_ok(status))) {
            debug!(vu = ?buddyload::vu::id(), "Chat check failed: {chat_result:?}");
        }
        self.chat_pause.wait().await;

        let summary_result = summary(&client, &self.endpoints.summary, &self.summary).await;
        if !check(
            SUMMARY_CHECK,
            matches!(summary_result, Ok(status) if summary_status_ok(status)),
        ) {
            debug!(vu = ?buddyload::vu::id(), "Summary check failed: {summary_result:?}");
        }
        self.summary_pause.wait().await;
    }

    /// Turn the driver into a scenario running [`Self::iteration`] on every virtual user.
    pub fn scenario(self) -> impl ConfigurableScenario<RunStatistics> {
        let driver = Arc::new(self);
        Scenario::new(SCENARIO_NAME, move || {
            let driver = driver.clone();
            async move { driver.iteration().await }
        })
    }
}

#[transaction]
async fn chat(
    client: &Client,
    url: &str,
    payload: &ChatPayload,
) -> Result<StatusCode, reqwest::Error> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .json(payload)
        .send()
        .await?;
    let status = response.status();
    response.bytes().await?;
    Ok(status)
}

/// Summary sends no body, only the query string and the JSON content type.
#[transaction]
async fn summary(
    client: &Client,
    url: &str,
    query: &SummaryQuery,
) -> Result<StatusCode, reqwest::Error> {
    let response = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .query(query)
        .send()
        .await?;
    let status = response.status();
    response.bytes().await?;
    Ok(status)
}
