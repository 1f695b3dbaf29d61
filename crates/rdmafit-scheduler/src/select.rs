use crate::error::{Result, SchedulerError};
use crate::types::{NodeOutcome, Selection, REASON_NOT_TIGHTEST_FIT, REASON_UNREACHABLE};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Selection policy trait
///
/// Turns the complete outcome set of one request into the nodes offered to
/// the scheduler and the nodes rejected with a reason. Every outcome must end
/// up in exactly one of the two lists.
pub trait SelectionPolicy: Send + Sync {
    /// Partition `outcomes` into schedulable and rejected
    fn select(&self, outcomes: &[NodeOutcome]) -> Selection;

    /// Name of the policy
    fn name(&self) -> &str;
}

fn rejection_reason(outcome: &NodeOutcome) -> String {
    outcome
        .reason
        .clone()
        .unwrap_or_else(|| REASON_UNREACHABLE.to_string())
}

/// Best-fit selection: keep only the feasible nodes that would be left with
/// the least free bandwidth
///
/// All nodes tied at the minimum are kept. Residuals of infeasible nodes are
/// never looked at.
pub struct TightestFit;

impl SelectionPolicy for TightestFit {
    fn select(&self, outcomes: &[NodeOutcome]) -> Selection {
        let min_residual = outcomes
            .iter()
            .filter(|o| o.schedulable)
            .map(|o| o.residual)
            .min();

        debug!("Tightest feasible residual: {:?}", min_residual);

        let mut selection = Selection::default();
        for (i, outcome) in outcomes.iter().enumerate() {
            if !outcome.schedulable {
                selection.rejected.push((i, rejection_reason(outcome)));
            } else if Some(outcome.residual) == min_residual {
                selection.schedulable.push(i);
            } else {
                selection
                    .rejected
                    .push((i, REASON_NOT_TIGHTEST_FIT.to_string()));
            }
        }

        selection
    }

    fn name(&self) -> &str {
        "TightestFit"
    }
}

/// Filter-only selection: every feasible node is offered and ranking is left
/// to the scheduler's prioritize step
pub struct AllFeasible;

impl SelectionPolicy for AllFeasible {
    fn select(&self, outcomes: &[NodeOutcome]) -> Selection {
        let mut selection = Selection::default();
        for (i, outcome) in outcomes.iter().enumerate() {
            if outcome.schedulable {
                selection.schedulable.push(i);
            } else {
                selection.rejected.push((i, rejection_reason(outcome)));
            }
        }
        selection
    }

    fn name(&self) -> &str {
        "AllFeasible"
    }
}

/// Configurable choice of selection policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionKind {
    #[default]
    TightestFit,
    AllFeasible,
}

impl SelectionKind {
    /// Build the policy
    pub fn policy(self) -> Box<dyn SelectionPolicy> {
        match self {
            SelectionKind::TightestFit => Box::new(TightestFit),
            SelectionKind::AllFeasible => Box::new(AllFeasible),
        }
    }
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKind::TightestFit => write!(f, "tightest-fit"),
            SelectionKind::AllFeasible => write!(f, "all-feasible"),
        }
    }
}

impl FromStr for SelectionKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tightest-fit" => Ok(SelectionKind::TightestFit),
            "all-feasible" => Ok(SelectionKind::AllFeasible),
            other => Err(SchedulerError::invalid_config(
                format!("unknown selection policy '{}'", other),
                "Use 'tightest-fit' or 'all-feasible'",
            )),
        }
    }
}
