//! Fallback strategies in escalation order

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named fallback strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Single play attempt right away
    Immediate,
    /// Retries after each configured delay
    Delayed,
    /// Visible prompt that plays on user activation
    GesturePrompt,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::Immediate => "immediate",
            StrategyKind::Delayed => "delayed",
            StrategyKind::GesturePrompt => "gesture_prompt",
        }
    }

    /// The gesture prompt never reports success to the escalation itself
    pub fn is_terminal(&self) -> bool {
        matches!(self, StrategyKind::GesturePrompt)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered, immutable list of strategies, least to most intrusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyList {
    strategies: [StrategyKind; 3],
}

impl StrategyList {
    pub fn new() -> Self {
        Self {
            strategies: [
                StrategyKind::Immediate,
                StrategyKind::Delayed,
                StrategyKind::GesturePrompt,
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        self.strategies.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for StrategyList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_order() {
        let order: Vec<_> = StrategyList::new().iter().collect();
        assert_eq!(
            order,
            vec![
                StrategyKind::Immediate,
                StrategyKind::Delayed,
                StrategyKind::GesturePrompt
            ]
        );
    }

    #[test]
    fn test_only_prompt_is_terminal() {
        let terminal: Vec<_> = StrategyList::new().iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![StrategyKind::GesturePrompt]);
    }
}
