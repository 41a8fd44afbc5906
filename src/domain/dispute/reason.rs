//! Dispute reasons and resolutions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

use super::DisputeError;

/// Why a mentee disputes a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeReason {
    NoShow,
    QualityIssue,
    TechnicalIssue,
    EarlyTermination,
    /// Needs a description.
    Other,
}

impl DisputeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeReason::NoShow => "no_show",
            DisputeReason::QualityIssue => "quality_issue",
            DisputeReason::TechnicalIssue => "technical_issue",
            DisputeReason::EarlyTermination => "early_termination",
            DisputeReason::Other => "other",
        }
    }

    pub fn requires_description(&self) -> bool {
        matches!(self, DisputeReason::Other)
    }
}

impl fmt::Display for DisputeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisputeReason {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_show" => Ok(DisputeReason::NoShow),
            "quality_issue" => Ok(DisputeReason::QualityIssue),
            "technical_issue" => Ok(DisputeReason::TechnicalIssue),
            "early_termination" => Ok(DisputeReason::EarlyTermination),
            "other" => Ok(DisputeReason::Other),
            other => Err(ValidationError::invalid_format(
                "reason",
                format!("unknown dispute reason '{}'", other),
            )),
        }
    }
}

/// Administrator decision on a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    NoRefund,
    PartialRefund,
    FullRefund,
}

impl DisputeResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeResolution::NoRefund => "no_refund",
            DisputeResolution::PartialRefund => "partial_refund",
            DisputeResolution::FullRefund => "full_refund",
        }
    }

    /// Settles the refund amount for this resolution against the session price.
    ///
    /// Both refund resolutions need an explicit amount; `FullRefund` must
    /// name the whole price.
    pub fn refund_amount(
        &self,
        requested: Option<i64>,
        session_price: i64,
    ) -> Result<Option<i64>, DisputeError> {
        match self {
            DisputeResolution::NoRefund => match requested {
                None | Some(0) => Ok(None),
                Some(amount) => Err(DisputeError::validation(
                    "refund_amount",
                    format!("no_refund cannot carry a refund amount, got {}", amount),
                )),
            },
            DisputeResolution::PartialRefund => {
                let amount = requested.ok_or_else(|| {
                    DisputeError::validation("refund_amount", "partial_refund needs a refund amount")
                })?;
                check_refund(amount, session_price)?;
                Ok(Some(amount))
            }
            DisputeResolution::FullRefund => {
                let amount = requested.ok_or_else(|| {
                    DisputeError::validation("refund_amount", "full_refund needs a refund amount")
                })?;
                check_refund(amount, session_price)?;
                if amount != session_price {
                    return Err(DisputeError::validation(
                        "refund_amount",
                        format!(
                            "full_refund must refund the session price {}, got {}",
                            session_price, amount
                        ),
                    ));
                }
                Ok(Some(amount))
            }
        }
    }
}

fn check_refund(amount: i64, session_price: i64) -> Result<(), DisputeError> {
    if amount <= 0 {
        return Err(DisputeError::validation(
            "refund_amount",
            format!("refund amount must be positive, got {}", amount),
        ));
    }
    if amount > session_price {
        return Err(DisputeError::RefundExceedsPrice {
            amount,
            price: session_price,
        });
    }
    Ok(())
}

impl fmt::Display for DisputeResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisputeResolution {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_refund" => Ok(DisputeResolution::NoRefund),
            "partial_refund" => Ok(DisputeResolution::PartialRefund),
            "full_refund" => Ok(DisputeResolution::FullRefund),
            other => Err(ValidationError::invalid_format(
                "resolution",
                format!("unknown resolution '{}'", other),
            )),
        }
    }
}
