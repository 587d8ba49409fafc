//! HTTP against the institution server: page fetch and the submission relay.

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::types::FormSpec;

/// Outcome of relaying one submission.
///
/// A failed relay is not an error: the fallback page delivers the same
/// submission as a plain form post, so the user never sees an exception.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// The server accepted the post; the body is the page the user should
    /// now be looking at.
    Replaced(String),

    /// The relayed request failed; the submission goes out as a direct
    /// form post instead.
    FellBackToFormPost,
}

pub struct Upstream {
    client: Client,
    page_url: Url,
}

impl Upstream {
    /// Build a client against the homework page URL. Cookies are kept so
    /// the server keeps seeing one session.
    pub fn new(page_url: &str) -> Result<Self> {
        let page_url = Url::parse(page_url).context("invalid homework page URL")?;
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, page_url })
    }

    /// Fetch the homework page
    pub async fn fetch_page(&self) -> Result<String> {
        let response = self
            .client
            .get(self.page_url.clone())
            .send()
            .await
            .context("failed to fetch the homework page")?;

        if !response.status().is_success() {
            anyhow::bail!("homework page returned status {}", response.status());
        }

        response
            .text()
            .await
            .context("failed to read the homework page")
    }

    /// Resolve the scraped form action against the page URL
    pub fn resolve_action(&self, form: &FormSpec) -> Result<Url> {
        self.page_url
            .join(&form.action)
            .context("form action is not a valid URL")
    }

    /// Relay one submission. Issues at most one request per call.
    pub async fn submit(&self, form: &FormSpec, assignment_id: &str) -> SubmitOutcome {
        let action = match self.resolve_action(form) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "cannot resolve the form action, falling back");
                return SubmitOutcome::FellBackToFormPost;
            }
        };

        let fields = [
            (form.exercise_field.as_str(), assignment_id),
            (form.student_field.as_str(), form.student_id.as_str()),
            (form.submit_field.as_str(), form.trigger_value.as_str()),
        ];

        match self.client.post(action).form(&fields).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => {
                    info!(assignment = assignment_id, "submission accepted");
                    SubmitOutcome::Replaced(body)
                }
                Err(e) => {
                    warn!(error = %e, "could not read the submission response, falling back");
                    SubmitOutcome::FellBackToFormPost
                }
            },
            Ok(response) => {
                warn!(
                    status = %response.status(),
                    "submission rejected, falling back to a direct form post"
                );
                SubmitOutcome::FellBackToFormPost
            }
            Err(e) => {
                warn!(error = %e, "submission request failed, falling back to a direct form post");
                SubmitOutcome::FellBackToFormPost
            }
        }
    }
}
