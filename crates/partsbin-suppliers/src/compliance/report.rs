use std::collections::BTreeMap;

use serde::Serialize;

/// One behavioral check run against an order-import adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    ColumnMapping,
    DataMapping,
    ErrorHandling,
    DefensiveParsing,
    AdditionalProperties,
}

impl Check {
    pub const ALL: [Check; 5] = [
        Check::ColumnMapping,
        Check::DataMapping,
        Check::ErrorHandling,
        Check::DefensiveParsing,
        Check::AdditionalProperties,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Check::ColumnMapping => "column_mapping",
            Check::DataMapping => "data_mapping",
            Check::ErrorHandling => "error_handling",
            Check::DefensiveParsing => "defensive_parsing",
            Check::AdditionalProperties => "additional_properties",
        }
    }

    /// Minimum score for the check to pass.
    #[must_use]
    pub const fn threshold(self) -> f64 {
        match self {
            Check::ColumnMapping => 1.0,
            Check::DataMapping => 0.8,
            Check::ErrorHandling | Check::DefensiveParsing => 0.7,
            // Above 2/3, so every one of the three sections must be present.
            Check::AdditionalProperties => 0.67,
        }
    }

    /// Remediation advice when the check fails.
    #[must_use]
    pub const fn recommendation(self) -> &'static str {
        match self {
            Check::ColumnMapping => {
                "map every essential column (part number, manufacturer part number, description, quantity)"
            }
            Check::DataMapping => "route rows through the shared DataMapper so golden rows map field for field",
            Check::ErrorHandling => {
                "return success=false with an error message for empty, unreadable and header-only files"
            }
            Check::DefensiveParsing => {
                "trim cell values and skip rows with empty descriptions or bad quantities with a warning"
            }
            Check::AdditionalProperties => {
                "start build_additional_properties from standard_additional_properties"
            }
        }
    }
}

impl std::fmt::Display for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl Grade {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            Grade::Excellent
        } else if score >= 0.7 {
            Grade::Good
        } else if score >= 0.5 {
            Grade::Moderate
        } else {
            Grade::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub check: Check,
    /// In `[0.0, 1.0]`: the share of sub-assertions that held.
    pub score: f64,
    pub passed: bool,
    pub issues: Vec<String>,
}

impl CheckResult {
    /// Scores `passed_count` of `total` sub-assertions; zero assertions score 0.
    #[must_use]
    pub fn from_counts(check: Check, passed_count: usize, total: usize, issues: Vec<String>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let score = if total == 0 {
            0.0
        } else {
            passed_count as f64 / total as f64
        };
        Self {
            check,
            score,
            passed: score >= check.threshold(),
            issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterReport {
    pub supplier: String,
    pub display_name: String,
    pub checks: Vec<CheckResult>,
    pub overall_score: f64,
    pub grade: Grade,
}

impl AdapterReport {
    #[must_use]
    pub fn new(supplier: &str, display_name: &str, checks: Vec<CheckResult>) -> Self {
        let overall_score = mean(checks.iter().map(|c| c.score));
        Self {
            supplier: supplier.to_owned(),
            display_name: display_name.to_owned(),
            checks,
            overall_score,
            grade: Grade::from_score(overall_score),
        }
    }

    #[must_use]
    pub fn check(&self, check: Check) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.check == check)
    }

    pub fn failed_checks(&self) -> impl Iterator<Item = Check> + '_ {
        self.checks.iter().filter(|c| !c.passed).map(|c| c.check)
    }
}

/// A check failed by more than one adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommonIssue {
    pub check: Check,
    pub suppliers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameworkReport {
    pub adapters: Vec<AdapterReport>,
    /// Registered suppliers without order import.
    pub skipped: Vec<String>,
    pub average_score: f64,
    pub common_issues: Vec<CommonIssue>,
    pub recommendations: Vec<String>,
}

impl FrameworkReport {
    #[must_use]
    pub fn new(adapters: Vec<AdapterReport>, skipped: Vec<String>) -> Self {
        let average_score = mean(adapters.iter().map(|a| a.overall_score));

        let mut failures: BTreeMap<Check, Vec<String>> = BTreeMap::new();
        for report in &adapters {
            for check in report.failed_checks() {
                failures.entry(check).or_default().push(report.supplier.clone());
            }
        }
        let common_issues: Vec<CommonIssue> = failures
            .iter()
            .filter(|(_, suppliers)| suppliers.len() >= 2)
            .map(|(check, suppliers)| CommonIssue {
                check: *check,
                suppliers: suppliers.clone(),
            })
            .collect();

        let mut recommendations: Vec<String> = common_issues
            .iter()
            .map(|issue| {
                format!(
                    "{} fails in {} adapters: {}",
                    issue.check,
                    issue.suppliers.len(),
                    issue.check.recommendation()
                )
            })
            .collect();
        for (check, suppliers) in failures.iter().filter(|(_, s)| s.len() == 1) {
            recommendations.push(format!("{}: {} ({check})", suppliers[0], check.recommendation()));
        }
        for report in adapters.iter().filter(|a| a.grade == Grade::Poor) {
            recommendations.push(format!(
                "{} scores {:.2}; review its import path end to end",
                report.supplier, report.overall_score
            ));
        }

        Self {
            adapters,
            skipped,
            average_score,
            common_issues,
            recommendations,
        }
    }
}

fn mean(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0usize), |(sum, n), s| (sum + s, n + 1));
    #[allow(clippy::cast_precision_loss)]
    let mean = if count == 0 { 0.0 } else { sum / count as f64 };
    mean
}
