//! Agent roster
//!
//! The remote side of a support call is a small, closed set of named
//! conversational agents. Exactly one is primary at any time; calls always
//! begin with the default (first) agent.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ClientError;

/// Named remote agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgentName {
    /// First-line support, entry point of every call
    #[default]
    Ram,
    /// Second-line specialist
    Sam,
}

/// Presentation details of an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentProfile {
    pub name: AgentName,
    pub role: &'static str,
    pub description: &'static str,
    /// Display color as a CSS hex string
    pub color: &'static str,
}

const ROSTER: [AgentProfile; 2] = [
    AgentProfile {
        name: AgentName::Ram,
        role: "L1 Support",
        description: "Basic IT support & triage",
        color: "#FF4F1F",
    },
    AgentProfile {
        name: AgentName::Sam,
        role: "L2 Specialist",
        description: "Advanced technical support",
        color: "#FF7D5C",
    },
];

impl AgentName {
    /// All agents, in roster order
    pub const ALL: [AgentName; 2] = [AgentName::Ram, AgentName::Sam];

    /// The agent every call starts with
    pub fn default_agent() -> Self {
        Self::ALL[0]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentName::Ram => "Ram",
            AgentName::Sam => "Sam",
        }
    }

    /// Presentation profile of this agent
    pub fn profile(&self) -> &'static AgentProfile {
        match self {
            AgentName::Ram => &ROSTER[0],
            AgentName::Sam => &ROSTER[1],
        }
    }
}

/// Full roster, in order
pub fn roster() -> &'static [AgentProfile] {
    &ROSTER
}

impl std::fmt::Display for AgentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ram" => Ok(AgentName::Ram),
            "sam" => Ok(AgentName::Sam),
            other => Err(ClientError::invalid_request(format!("unknown agent '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_agent_is_first_in_roster() {
        assert_eq!(AgentName::default_agent(), AgentName::Ram);
        assert_eq!(AgentName::default(), AgentName::Ram);
        assert_eq!(roster()[0].name, AgentName::default_agent());
    }

    #[test]
    fn profiles_match_names() {
        for name in AgentName::ALL {
            assert_eq!(name.profile().name, name);
        }
        assert_eq!(AgentName::Sam.profile().role, "L2 Specialist");
        assert_eq!(AgentName::Ram.profile().color, "#FF4F1F");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("sam".parse::<AgentName>().unwrap(), AgentName::Sam);
        assert_eq!(" Ram ".parse::<AgentName>().unwrap(), AgentName::Ram);
        assert!("sita".parse::<AgentName>().is_err());
    }
}
