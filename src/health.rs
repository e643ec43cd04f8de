/*!
Coarse device-health judgment derived from diagnostic output.

This module defines:
- `HealthStatus` / `HealthSummary`: the fixed small label set plus the issues
  that led to it.
- `HealthRule`: an injectable heuristic inspecting one command's output.

Rules are deliberately tolerant: real `show` output varies between platforms
and software trains, so anything a rule cannot parse makes that rule
inconclusive instead of failing the whole check.
*/

use std::fmt::Display;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::report::DiagnosticReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Healthy,
    IssuesFound,
    Unknown,
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::IssuesFound => write!(f, "issues-found"),
            HealthStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Derived view over a diagnostic run. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

/// What a single rule concluded from one command's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Issue(String),
    /// Output missing, error-marked or unparseable; neither pass nor fail.
    Inconclusive,
}

/// One health heuristic. Each rule names the command output it inspects so a
/// reduced diagnostic pass can fetch exactly what its rules need.
#[derive(Debug, Clone)]
pub enum HealthRule {
    /// Five-minute CPU average above the given percentage.
    CpuFiveMinuteAbove { percent: u32 },
    /// Free processor-pool memory below the given floor.
    ProcessorMemoryFloor { min_free_bytes: u64 },
    /// Any interface reported down, administratively or otherwise.
    InterfacesDown,
    /// Error-level markers present in the logging buffer.
    LogMarkers { patterns: Vec<String> },
}

static DEFAULT_RULES: Lazy<Vec<HealthRule>> = Lazy::new(|| {
    vec![
        HealthRule::CpuFiveMinuteAbove { percent: 80 },
        HealthRule::ProcessorMemoryFloor {
            min_free_bytes: 10_000_000,
        },
        HealthRule::InterfacesDown,
        HealthRule::LogMarkers {
            // IOS syslog severities 0-3 (emergencies through errors),
            // e.g. "%LINEPROTO-3-UPDOWN".
            patterns: vec![
                "-0-".to_string(),
                "-1-".to_string(),
                "-2-".to_string(),
                "-3-".to_string(),
            ],
        },
    ]
});

pub fn default_rules() -> &'static [HealthRule] {
    &DEFAULT_RULES
}

impl HealthRule {
    /// The command whose output this rule inspects.
    pub fn command(&self) -> &'static str {
        match self {
            HealthRule::CpuFiveMinuteAbove { .. } => "show processes cpu",
            HealthRule::ProcessorMemoryFloor { .. } => "show memory statistics",
            HealthRule::InterfacesDown => "show ip interface brief",
            HealthRule::LogMarkers { .. } => "show logging",
        }
    }

    pub fn evaluate(&self, output: &str) -> RuleOutcome {
        match self {
            HealthRule::CpuFiveMinuteAbove { percent } => {
                match parse_five_minute_cpu(output) {
                    Some(cpu) if cpu > *percent => {
                        RuleOutcome::Issue(format!("High CPU usage: {}%", cpu))
                    }
                    Some(_) => RuleOutcome::Pass,
                    None => RuleOutcome::Inconclusive,
                }
            }
            HealthRule::ProcessorMemoryFloor { min_free_bytes } => {
                match parse_processor_free_bytes(output) {
                    Some(free) if free < *min_free_bytes => RuleOutcome::Issue(format!(
                        "Low memory: {} bytes free in processor pool",
                        free
                    )),
                    Some(_) => RuleOutcome::Pass,
                    None => RuleOutcome::Inconclusive,
                }
            }
            HealthRule::InterfacesDown => {
                let down = count_down_interfaces(output);
                if down > 0 {
                    RuleOutcome::Issue(format!("{} interfaces down", down))
                } else {
                    RuleOutcome::Pass
                }
            }
            HealthRule::LogMarkers { patterns } => {
                let hits = output
                    .lines()
                    .filter(|line| patterns.iter().any(|p| line.contains(p.as_str())))
                    .count();
                if hits > 0 {
                    RuleOutcome::Issue(format!("error-level log messages present ({} lines)", hits))
                } else {
                    RuleOutcome::Pass
                }
            }
        }
    }
}

/// Pulls the five-minute average out of a line like
/// `CPU utilization for five seconds: 5%/0%; one minute: 3%; five minutes: 2%`.
fn parse_five_minute_cpu(output: &str) -> Option<u32> {
    for line in output.lines() {
        if let Some(rest) = line.split("five minutes:").nth(1) {
            let digits: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(cpu) = digits.parse() {
                return Some(cpu);
            }
        }
    }
    None
}

/// Free bytes from the `Processor` row of `show memory statistics`:
/// `Processor  <head>  <total>  <used>  <free>  <lowest>  <largest>`.
fn parse_processor_free_bytes(output: &str) -> Option<u64> {
    for line in output.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() == Some(&"Processor") && tokens.len() >= 5 {
            return tokens[4].parse().ok();
        }
    }
    None
}

/// Counts data lines of `show ip interface brief` carrying a `down` token.
/// The header line and blank lines are ignored.
fn count_down_interfaces(output: &str) -> usize {
    output
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.starts_with("Interface"))
        .filter(|line| {
            line.split_whitespace()
                .any(|token| token.eq_ignore_ascii_case("down"))
        })
        .count()
}

/// Apply a rule set to a completed run. Missing or error-marked output makes
/// the affected rule inconclusive; the summary degrades to `Unknown` rather
/// than erroring.
pub fn evaluate_report(report: &DiagnosticReport, rules: &[HealthRule]) -> HealthSummary {
    let mut issues = Vec::new();
    let mut inconclusive = 0usize;

    for rule in rules {
        let outcome = match report.get(rule.command()) {
            Some(_) if report.is_error(rule.command()) => RuleOutcome::Inconclusive,
            Some(output) => rule.evaluate(output),
            None => RuleOutcome::Inconclusive,
        };
        match outcome {
            RuleOutcome::Pass => {}
            RuleOutcome::Issue(issue) => issues.push(issue),
            RuleOutcome::Inconclusive => inconclusive += 1,
        }
    }

    let status = if !issues.is_empty() {
        HealthStatus::IssuesFound
    } else if inconclusive > 0 {
        HealthStatus::Unknown
    } else {
        HealthStatus::Healthy
    };

    HealthSummary { status, issues }
}
