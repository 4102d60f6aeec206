// ABOUTME: Static human-agent roster loaded from configuration
// ABOUTME: Maps agent phone numbers to display names for handoff notices

use serde::{Deserialize, Serialize};

/// Roster entry for one human agent. The roster is fixed for the process
/// lifetime; availability is tracked separately in the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub number: String,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    agents: Vec<AgentRecord>,
}

impl AgentRoster {
    pub fn new(agents: Vec<AgentRecord>) -> Self {
        Self { agents }
    }

    /// Display name for an agent number, falling back to the number itself
    /// so user-facing notices never show an empty name.
    pub fn display_name<'a>(&'a self, number: &'a str) -> &'a str {
        self.agents
            .iter()
            .find(|a| a.number == number)
            .map(|a| a.name.as_str())
            .unwrap_or(number)
    }

    pub fn numbers(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.number.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> AgentRoster {
        AgentRoster::new(vec![
            AgentRecord {
                number: "628111".to_string(),
                name: "Ana".to_string(),
            },
            AgentRecord {
                number: "628222".to_string(),
                name: "Budi".to_string(),
            },
        ])
    }

    #[test]
    fn test_display_name_known_agent() {
        assert_eq!(roster().display_name("628111"), "Ana");
    }

    #[test]
    fn test_display_name_unknown_falls_back_to_number() {
        assert_eq!(roster().display_name("999"), "999");
    }

    #[test]
    fn test_numbers_preserve_roster_order() {
        assert_eq!(roster().numbers(), vec!["628111", "628222"]);
    }
}
