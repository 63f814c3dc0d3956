use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::populate::DocumentPopulator;
use crate::{tp1, tp2, tp3, tp4};

/// The four audit working papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Tp1,
    Tp2,
    Tp3,
    Tp4,
}

impl ReportType {
    pub const ALL: [ReportType; 4] = [Self::Tp1, Self::Tp2, Self::Tp3, Self::Tp4];

    /// Config key (`[templates]` table, `markers[].report`).
    pub fn key(self) -> &'static str {
        match self {
            Self::Tp1 => "tp1",
            Self::Tp2 => "tp2",
            Self::Tp3 => "tp3",
            Self::Tp4 => "tp4",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Tp1 => "Compliance and Existence Testing",
            Self::Tp2 => "Employment Verification Testing",
            Self::Tp3 => "Payment Verification",
            Self::Tp4 => "Confirmation of UIF Contributions",
        }
    }

    /// `"TP.3_Payment Verification"`; names both the output file and its
    /// folder.
    pub fn folder_name(self) -> String {
        let number = match self {
            Self::Tp1 => 1,
            Self::Tp2 => 2,
            Self::Tp3 => 3,
            Self::Tp4 => 4,
        };
        format!("TP.{number}_{}", self.title())
    }

    pub fn populator(self) -> Box<dyn DocumentPopulator> {
        match self {
            Self::Tp1 => Box::new(tp1::ComplianceTesting),
            Self::Tp2 => Box::new(tp2::EmploymentVerification),
            Self::Tp3 => Box::new(tp3::PaymentVerification),
            Self::Tp4 => Box::new(tp4::ContributionConfirmation),
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key().to_ascii_uppercase())
    }
}

impl FromStr for ReportType {
    type Err = String;

    /// Accepts `tp3`, `TP3`, `tp.3` and `3`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '.' && *c != '_')
            .collect();
        let digit = normalized.strip_prefix("tp").unwrap_or(&normalized);
        match digit {
            "1" => Ok(Self::Tp1),
            "2" => Ok(Self::Tp2),
            "3" => Ok(Self::Tp3),
            "4" => Ok(Self::Tp4),
            _ => Err(format!("unknown report '{s}' (expected tp1, tp2, tp3 or tp4)")),
        }
    }
}
