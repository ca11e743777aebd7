//! Text-generation flows: contribution guidance for the community goal and
//! fraud-pattern summaries for administrators.
//!
//! The model itself sits behind [`TextGenerator`]; this module owns the prompt
//! templates and the validation of what comes back.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::time::Duration as StdDuration;
use utoipa::ToSchema;

use crate::ledger::{FundingRequest, Transaction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidanceError {
    /// No generator credentials were configured.
    NotConfigured,
    InvalidInput(String),
    Transport(String),
    InvalidOutput(String),
}

impl fmt::Display for GuidanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuidanceError::NotConfigured => write!(f, "Text generation is not configured"),
            GuidanceError::InvalidInput(msg) => write!(f, "Invalid guidance input: {}", msg),
            GuidanceError::Transport(msg) => write!(f, "Text generation request failed: {}", msg),
            GuidanceError::InvalidOutput(msg) => write!(f, "Unusable text generation output: {}", msg),
        }
    }
}

impl std::error::Error for GuidanceError {}

impl From<reqwest::Error> for GuidanceError {
    fn from(err: reqwest::Error) -> Self {
        GuidanceError::Transport(err.to_string())
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GuidanceError>;
}

#[derive(Deserialize, Debug)]
struct OpenAIResponse {
    output: String,
}

/// Azure OpenAI "responses" endpoint client.
pub struct AzureOpenAiGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AzureOpenAiGenerator {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Result<Self, GuidanceError> {
        if endpoint.is_empty() || api_key.is_empty() {
            return Err(GuidanceError::NotConfigured);
        }
        let client = Client::builder()
            .timeout(StdDuration::from_secs(90)) // LLM calls are slow
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl TextGenerator for AzureOpenAiGenerator {
    #[tracing::instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, GuidanceError> {
        let full_url = format!("{}/openai/responses?api-version=2025-03-01-preview", self.endpoint);
        let request_body = json!({
            "model": self.model,
            "input": prompt,
        });

        let response = self
            .client
            .post(&full_url)
            .header("api-key", &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            tracing::error!("OpenAI API error: Status {}, Body: {}", status, error_text);
            return Err(GuidanceError::Transport(format!("status {}", status)));
        }

        let parsed: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| GuidanceError::InvalidOutput(e.to_string()))?;
        Ok(parsed.output)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GuidanceInput {
    pub goal_description: String,
    /// Progress towards the goal, 0-100
    pub progress_percentage: f64,
    pub recent_activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GuidanceOutput {
    pub guidance: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FraudAnalysisInput {
    pub user_actions: String,
    pub funding_requests: String,
    pub transactions: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FraudAnalysisOutput {
    /// Empty when nothing looked suspicious
    pub flagged_activities: String,
}

pub fn guidance_prompt(input: &GuidanceInput) -> String {
    let mut activities = String::new();
    for activity in &input.recent_activities {
        activities.push_str("- ");
        activities.push_str(activity);
        activities.push('\n');
    }
    format!(
        "You are a community engagement expert. Provide suggestions on how users can contribute \
effectively to the community goal described below, given the current progress and recent activities.\n\n\
Goal Description: {}\nProgress: {:.0}%\nRecent Activities:\n{}\nSuggestions:\n",
        input.goal_description, input.progress_percentage, activities
    )
}

pub fn fraud_prompt(input: &FraudAnalysisInput) -> String {
    format!(
        "You are an AI-powered fraud detection system for the Barakah Ledger platform.\n\n\
You will receive logs of user actions, funding requests, and transactions.\n\
Your task is to analyze these logs and identify potentially fraudulent activities based on predefined heuristics.\n\n\
User Actions: {}\nFunding Requests: {}\nTransactions: {}\n\n\
Provide a summary of potentially fraudulent activities identified, with clear reasons for flagging them. \
Focus on suspicious patterns, anomalies, and deviations from normal behavior. \
Return an empty summary if no fraud detected.\n",
        input.user_actions, input.funding_requests, input.transactions
    )
}

pub async fn contribution_guidance(
    generator: &dyn TextGenerator,
    input: &GuidanceInput,
) -> Result<GuidanceOutput, GuidanceError> {
    if input.goal_description.trim().is_empty() {
        return Err(GuidanceError::InvalidInput("goal description is empty".to_string()));
    }
    if !input.progress_percentage.is_finite() {
        return Err(GuidanceError::InvalidInput("progress must be a number".to_string()));
    }
    let input = GuidanceInput {
        progress_percentage: input.progress_percentage.clamp(0.0, 100.0),
        ..input.clone()
    };

    let text = generator.generate(&guidance_prompt(&input)).await?;
    let guidance = text.trim().to_string();
    if guidance.is_empty() {
        return Err(GuidanceError::InvalidOutput("empty guidance".to_string()));
    }
    Ok(GuidanceOutput { guidance })
}

pub async fn fraud_analysis(
    generator: &dyn TextGenerator,
    input: &FraudAnalysisInput,
) -> Result<FraudAnalysisOutput, GuidanceError> {
    let text = generator.generate(&fraud_prompt(input)).await?;
    Ok(FraudAnalysisOutput { flagged_activities: text.trim().to_string() })
}

/// One line per transaction, for feeding the fraud prompt.
pub fn summarize_transactions(transactions: &[Transaction]) -> String {
    transactions
        .iter()
        .map(|tx| {
            format!(
                "{} {} ${:.2} request={} contributor={} borrower={} status={}",
                tx.created_at.to_rfc3339(),
                tx.kind,
                tx.amount,
                tx.funding_request_id,
                tx.contributor_id.as_deref().unwrap_or("-"),
                tx.borrower_id.as_deref().unwrap_or("-"),
                tx.status
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn summarize_requests(requests: &[FundingRequest]) -> String {
    requests
        .iter()
        .map(|r| {
            format!(
                "{} \"{}\" owner={} goal=${:.2} raised=${:.2} status={} created={}",
                r.id,
                r.display_name,
                r.owner_id,
                r.funding_goal,
                r.raised,
                r.status,
                r.created_at.to_rfc3339()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, prompt: &str) -> Result<String, GuidanceError> {
            self.seen.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    fn canned(reply: &str) -> Canned {
        Canned { reply: reply.to_string(), seen: Mutex::new(Vec::new()) }
    }

    #[tokio::test]
    async fn guidance_prompt_lists_activities_and_clamps_progress() {
        let generator = canned("  Share the campaign with your mosque.  ");
        let input = GuidanceInput {
            goal_description: "Launch 5 Businesses This Month!".to_string(),
            progress_percentage: 140.0,
            recent_activities: vec!["Samira A. contributed $150.00 to Yusuf's Eid Bakery.".to_string()],
        };
        let out = contribution_guidance(&generator, &input).await.unwrap();
        assert_eq!(out.guidance, "Share the campaign with your mosque.");

        let prompt = generator.seen.lock().unwrap()[0].clone();
        assert!(prompt.contains("Progress: 100%"));
        assert!(prompt.contains("- Samira A. contributed $150.00 to Yusuf's Eid Bakery.\n"));
    }

    #[tokio::test]
    async fn empty_guidance_is_rejected() {
        let generator = canned("   ");
        let input = GuidanceInput {
            goal_description: "Goal".to_string(),
            progress_percentage: 10.0,
            recent_activities: vec![],
        };
        let err = contribution_guidance(&generator, &input).await.unwrap_err();
        assert!(matches!(err, GuidanceError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn empty_fraud_summary_means_nothing_flagged() {
        let generator = canned("");
        let out = fraud_analysis(
            &generator,
            &FraudAnalysisInput {
                user_actions: "login u4".to_string(),
                funding_requests: String::new(),
                transactions: String::new(),
            },
        )
        .await
        .unwrap();
        assert!(out.flagged_activities.is_empty());
    }

    #[test]
    fn missing_credentials_are_not_configured() {
        assert!(matches!(
            AzureOpenAiGenerator::new("", "key", "gpt-4o"),
            Err(GuidanceError::NotConfigured)
        ));
    }
}
