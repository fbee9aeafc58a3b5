use crate::scripts;
use async_trait::async_trait;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use mender_common::protocol::ActionKind;
use mender_engine::driver::{DomDriver, DriverError, ElementHandle, ElementInfo};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Upper bound on one script evaluation. A blocking dialog would otherwise
/// hang the call.
const EVAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between visibility polls.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// `DomDriver` over an already open page. The driver never launches or
/// navigates the browser.
pub struct CdpDriver {
    page: Page,
    session: Option<Session>,
}

struct Session {
    _browser: Browser,
    handler_task: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

/// Attach to a running browser over its DevTools websocket and drive its
/// first page (a new blank page when it has none).
pub async fn connect(ws_url: &str) -> Result<CdpDriver, DriverError> {
    let (browser, mut handler) = Browser::connect(ws_url)
        .await
        .map_err(|e| DriverError::Other(format!("Failed to connect to {}: {}", ws_url, e)))?;

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if let Err(e) = h {
                tracing::error!("Browser handler error (ignoring): {}", e);
            }
        }
        tracing::info!("Browser handler task ended");
    });

    let existing = browser
        .pages()
        .await
        .map_err(|e| DriverError::Other(format!("Failed to list pages: {}", e)))?;
    let page = match existing.into_iter().next() {
        Some(page) => page,
        None => browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Other(format!("Failed to create page: {}", e)))?,
    };

    tracing::info!("Attached to browser at {}", ws_url);
    Ok(CdpDriver {
        page,
        session: Some(Session {
            _browser: browser,
            handler_task,
        }),
    })
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueryReply {
    Handles(Vec<u32>),
    Failure { error: String },
}

#[derive(Debug, Deserialize)]
struct ActReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    tag: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
    #[serde(default)]
    text: String,
    parent: Option<u32>,
    nth_of_type: usize,
}

impl CdpDriver {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            session: None,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Drop the browser connection, if this driver opened one.
    pub fn disconnect(&mut self) {
        self.session.take();
    }

    async fn eval(&self, expression: String) -> Result<serde_json::Value, DriverError> {
        let result = tokio::time::timeout(EVAL_TIMEOUT, self.page.evaluate(expression))
            .await
            .map_err(|_| DriverError::Timeout(EVAL_TIMEOUT.as_millis() as u64))?
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl DomDriver for CdpDriver {
    async fn query(&mut self, selector: &str) -> Result<Vec<ElementHandle>, DriverError> {
        let value = self.eval(scripts::query(selector)).await?;
        match serde_json::from_value::<QueryReply>(value)? {
            QueryReply::Handles(ids) => Ok(ids.into_iter().map(ElementHandle).collect()),
            QueryReply::Failure { error } => Err(DriverError::InvalidSelector(error)),
        }
    }

    async fn is_visible(
        &mut self,
        element: ElementHandle,
        timeout: Duration,
    ) -> Result<bool, DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.eval(scripts::visibility(element.0)).await? {
                serde_json::Value::Null => return Err(DriverError::StaleElement(element.0)),
                serde_json::Value::Bool(true) => return Ok(true),
                _ if Instant::now() >= deadline => return Ok(false),
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
    }

    async fn act(
        &mut self,
        element: ElementHandle,
        kind: ActionKind,
        value: Option<&str>,
    ) -> Result<(), DriverError> {
        let reply: ActReply =
            serde_json::from_value(self.eval(scripts::act(element.0, kind, value)).await?)?;
        match (reply.ok, reply.error) {
            (_, Some(e)) if e == "stale" => Err(DriverError::StaleElement(element.0)),
            (_, Some(e)) => Err(DriverError::ActionFailed(e)),
            (true, None) => Ok(()),
            (false, None) => Err(DriverError::ActionFailed(format!("{} had no effect", kind))),
        }
    }

    async fn describe(&mut self, element: ElementHandle) -> Result<ElementInfo, DriverError> {
        let value = self.eval(scripts::describe(element.0)).await?;
        if value.is_null() {
            return Err(DriverError::StaleElement(element.0));
        }
        let raw: RawElement = serde_json::from_value(value)?;
        Ok(ElementInfo {
            handle: element,
            tag: raw.tag,
            attributes: raw.attributes,
            text: raw.text,
            parent: raw.parent.map(ElementHandle),
            nth_of_type: raw.nth_of_type,
        })
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| DriverError::Other(e.to_string()))
    }

    async fn evaluate(&mut self, script: &str) -> Result<serde_json::Value, DriverError> {
        self.eval(script.to_string()).await
    }
}
