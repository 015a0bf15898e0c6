use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;
use crate::{
    negotiation::CompatibilityOutcome,
    poll_response::{ErrorMessage, PollResponse},
    response_status::ServiceError,
    retrieval::ContentDescriptor,
    version_registry::Negotiation,
};

/// Renders results for the command line in various formats
pub struct Reporter {
    output_format: ReportFormat,
}

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Yaml,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Error as reported by the command line, with the HTTP status it maps to
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport<'a> {
    status: u16,
    error_message: &'a ErrorMessage,
}

impl Reporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn format_poll_response(&self, response: &PollResponse) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(self.console_poll_response(response)),
            _ => self.serialize(response),
        }
    }

    pub fn format_negotiation(&self, negotiation: &Negotiation) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(self.console_negotiation(negotiation)),
            _ => self.serialize(negotiation),
        }
    }

    pub fn format_content(&self, content: &ContentDescriptor) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => {
                let mut output = String::new();
                output.push_str("=== Metadata Content ===\n");
                output.push_str(&format!("  Location: {}\n", content.location));
                output.push_str(&format!("  Content-Type: {}\n", content.content_type));
                match content.content_length {
                    Some(length) => output.push_str(&format!("  Content-Length: {}\n", length)),
                    None => output.push_str("  Content-Length: unknown\n"),
                }
                Ok(output)
            }
            _ => self.serialize(content),
        }
    }

    pub fn format_error(&self, error: &ServiceError) -> Result<String, ReportError> {
        let status = error.status_code();
        let error_message = error.error_message();
        match self.output_format {
            ReportFormat::Console => {
                let mut output = format!("❌ {}: {}\n", status, error);
                for detail in &error_message.details {
                    output.push_str(&format!("   - {}\n", detail));
                }
                Ok(output)
            }
            _ => self.serialize(&ErrorReport {
                status: status.as_u16(),
                error_message: &error_message,
            }),
        }
    }

    fn serialize<T: Serialize>(&self, value: &T) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            _ => Ok(serde_json::to_string_pretty(value)?),
        }
    }

    fn console_poll_response(&self, response: &PollResponse) -> String {
        let mut output = String::new();

        output.push_str("=== Transformation Status ===\n\n");
        output.push_str(&format!("Status: {:?}\n", response.status));

        if response.metadata_informations.is_empty() {
            output.push_str("Metadata: none\n");
        } else {
            output.push_str("\nMetadata:\n");
            for info in &response.metadata_informations {
                output.push_str(&format!("  - {} [{:?}]\n", info.metadata_type, info.status));
                if let Some(timestamp) = &info.transformed_timestamp {
                    output.push_str(&format!("      transformed: {}\n", timestamp.to_rfc3339()));
                }
                if let Some(location) = &info.location {
                    output.push_str(&format!("      location: {}\n", location));
                }
                if let Some(error) = &info.error_message {
                    output.push_str(&format!(
                        "      error: {} ({})\n",
                        error.message,
                        error.details.join(", ")
                    ));
                }
            }
        }

        if let Some(error) = &response.error_message {
            output.push_str(&format!("\n{}\n", error.message));
            for detail in &error.details {
                output.push_str(&format!("  - {}\n", detail));
            }
        }

        output
    }

    fn console_negotiation(&self, negotiation: &Negotiation) -> String {
        let mut output = String::new();

        output.push_str("=== Version Negotiation ===\n");
        output.push_str(&format!("  Operation: {}\n", negotiation.operation));
        match &negotiation.content_version {
            Some(version) => output.push_str(&format!("  Content-Version: {}\n", version)),
            None => output.push_str("  ℹ No server version registered, negotiation skipped\n"),
        }

        match &negotiation.outcome {
            CompatibilityOutcome::Compatible => output.push_str("  ✓ Compatible\n"),
            CompatibilityOutcome::Incompatible {
                failure,
                client_version,
                server_version,
            } => output.push_str(&format!(
                "  ❌ Client {} cannot be served by server {}: {}\n",
                client_version, server_version, failure
            )),
        }

        output
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}
