//! Multi-agent squad payload
//!
//! A squad groups the assistants that can take part in one call. The first
//! member is the entry point and greets the caller.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

pub const FIRST_MESSAGE_MODE: &str = "assistant-speaks-first";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantOverrides {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadMember {
    pub assistant_id: String,
    pub assistant_overrides: AssistantOverrides,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberOverrides {
    pub first_message_mode: String,
}

/// Squad definition sent to the voice-AI platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadConfig {
    pub members: Vec<SquadMember>,
    pub member_overrides: MemberOverrides,
}

impl SquadConfig {
    /// Build the support squad: Ram (entry point), Sam, Sita
    ///
    /// ```rust
    /// use helpdesk_client_core::squad::SquadConfig;
    ///
    /// let squad = SquadConfig::support_squad("a1", "a2", "a3").unwrap();
    /// let json = serde_json::to_value(&squad).unwrap();
    /// assert_eq!(json["members"][0]["assistantOverrides"]["name"], "Ram");
    /// assert_eq!(json["memberOverrides"]["firstMessageMode"], "assistant-speaks-first");
    /// ```
    pub fn support_squad(ram_id: &str, sam_id: &str, sita_id: &str) -> ClientResult<Self> {
        let ids = [("Ram", ram_id), ("Sam", sam_id), ("Sita", sita_id)];
        if let Some((name, _)) = ids.iter().find(|(_, id)| id.trim().is_empty()) {
            return Err(ClientError::invalid_request(format!(
                "missing assistant id for {}",
                name
            )));
        }
        let members = ids
            .iter()
            .map(|(name, id)| SquadMember {
                assistant_id: id.trim().to_string(),
                assistant_overrides: AssistantOverrides { name: name.to_string() },
            })
            .collect();
        Ok(Self {
            members,
            member_overrides: MemberOverrides {
                first_message_mode: FIRST_MESSAGE_MODE.to_string(),
            },
        })
    }

    /// Member every call enters through
    pub fn entry_point(&self) -> Option<&SquadMember> {
        self.members.first()
    }
}
