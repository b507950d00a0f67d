use pairdesk_types::api::{ApiResponse, PairResponse};

use crate::api::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Destructive,
}

/// A short user-facing notification for the result of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    fn info(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    fn destructive(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }
}

/// Returns true when a pairing error means the number is banned.
///
/// The bot service has no structured error kind, so this is a
/// case-insensitive search for `ban` anywhere in the message
/// (`"user is banned"`, `"Number BANNED"`).
pub fn is_ban_error(message: &str) -> bool {
    message.to_ascii_lowercase().contains("ban")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    Banned { number: String, message: String },
    Failed { number: String, message: String },
    CodeIssued { number: String, code: String },
    AlreadyPaired { number: String },
    /// None of `error`, `code` or `status` was present.
    Unrecognized { number: String },
}

/// Precedence: `error`, then `code`, then `status`.
pub fn classify_pair(resp: &PairResponse) -> PairOutcome {
    let number = resp.number.clone();
    if let Some(message) = &resp.error {
        return if is_ban_error(message) {
            PairOutcome::Banned {
                number,
                message: message.clone(),
            }
        } else {
            PairOutcome::Failed {
                number,
                message: message.clone(),
            }
        };
    }
    if let Some(code) = &resp.code {
        return PairOutcome::CodeIssued {
            number,
            code: code.clone(),
        };
    }
    if resp.status.is_some() {
        return PairOutcome::AlreadyPaired { number };
    }
    PairOutcome::Unrecognized { number }
}

impl PairOutcome {
    /// The generated code, only for `CodeIssued`.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::CodeIssued { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    pub fn notice(&self) -> Option<Notice> {
        let notice = match self {
            Self::Banned { number, .. } => Notice::destructive(
                "Account Banned",
                format!("User {number} is banned from using this service"),
            ),
            Self::Failed { message, .. } => Notice::destructive("Pairing Failed", message.clone()),
            Self::CodeIssued { code, .. } => Notice::info(
                "Pairing Code Generated!",
                format!("Your pairing code is: {code}"),
            ),
            Self::AlreadyPaired { number } => Notice::info(
                "Already Registered",
                format!("Number {number} is already paired and registered"),
            ),
            Self::Unrecognized { .. } => return None,
        };
        Some(notice)
    }
}

/// Admin actions that take a number and return an [`ApiResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Block,
    Unblock,
    DeleteSession,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done { number: String },
    Rejected { number: String, message: String },
}

impl AdminAction {
    pub fn outcome(self, number: &str, resp: &ApiResponse) -> ActionOutcome {
        match &resp.error {
            Some(message) => ActionOutcome::Rejected {
                number: number.into(),
                message: message.clone(),
            },
            None => ActionOutcome::Done {
                number: number.into(),
            },
        }
    }

    pub fn notice(self, outcome: &ActionOutcome) -> Notice {
        match (self, outcome) {
            (Self::Block, ActionOutcome::Done { number }) => {
                Notice::destructive("User Blocked", format!("{number} has been blocked"))
            }
            (Self::Unblock, ActionOutcome::Done { number }) => {
                Notice::info("User Unblocked", format!("{number} has been unblocked"))
            }
            (Self::DeleteSession, ActionOutcome::Done { number }) => Notice::info(
                "Session Deleted",
                format!("Session for {number} has been removed"),
            ),
            (action, ActionOutcome::Rejected { message, .. }) => {
                Notice::destructive(action.failure_title(), message.clone())
            }
        }
    }

    /// Notice for a request that never produced a response.
    pub fn failure_notice(self, _error: &ClientError) -> Notice {
        let description = match self {
            Self::Block => "Failed to block user. Please try again.",
            Self::Unblock => "Failed to unblock user. Please try again.",
            Self::DeleteSession => "Failed to delete session. Please try again.",
        };
        Notice::destructive(self.failure_title(), description)
    }

    fn failure_title(self) -> &'static str {
        match self {
            Self::Block => "Block Failed",
            Self::Unblock => "Unblock Failed",
            Self::DeleteSession => "Delete Failed",
        }
    }
}

/// Notice for a pairing request that never produced a response.
pub fn pair_failure_notice(_error: &ClientError) -> Notice {
    Notice::destructive(
        "Connection Error",
        "Failed to connect to pairing service. Please try again.",
    )
}
