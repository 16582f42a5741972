// ─── Game Account ───
// Authentication happens elsewhere; the launch only needs the resulting
// identity to fill the `auth_*` argument placeholders.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_USERNAME: &str = "Player";
const OFFLINE_ACCESS_TOKEN: &str = "0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    Offline,
    Microsoft,
    Mojang,
}

impl AccountMode {
    fn user_type(&self) -> &'static str {
        match self {
            AccountMode::Offline => "legacy",
            AccountMode::Microsoft => "msa",
            AccountMode::Mojang => "mojang",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameAccount {
    pub mode: AccountMode,
    pub username: String,
    /// Undashed profile id.
    pub uuid: String,
    pub access_token: String,
    pub user_type: String,
}

impl Default for GameAccount {
    fn default() -> Self {
        Self::offline(DEFAULT_USERNAME)
    }
}

impl GameAccount {
    pub fn offline(username: &str) -> Self {
        Self {
            mode: AccountMode::Offline,
            username: username.trim().to_string(),
            uuid: Uuid::new_v4().simple().to_string(),
            access_token: OFFLINE_ACCESS_TOKEN.into(),
            user_type: AccountMode::Offline.user_type().into(),
        }
        .sanitized()
    }

    /// An identity produced by an external authenticator.
    pub fn authenticated(mode: AccountMode, username: &str, uuid: &str, access_token: &str) -> Self {
        Self {
            user_type: mode.user_type().into(),
            mode,
            username: username.trim().to_string(),
            uuid: uuid.replace('-', ""),
            access_token: access_token.to_string(),
        }
        .sanitized()
    }

    /// Fill blank fields so no placeholder ever resolves to an empty argument.
    pub fn sanitized(mut self) -> Self {
        if self.username.trim().is_empty() {
            self.username = DEFAULT_USERNAME.into();
        }
        if self.uuid.trim().is_empty() {
            self.uuid = Uuid::nil().simple().to_string();
        }
        if self.access_token.trim().is_empty() {
            self.access_token = OFFLINE_ACCESS_TOKEN.into();
        }
        if self.user_type.trim().is_empty() {
            self.user_type = self.mode.user_type().into();
        }
        self
    }

    /// Values for the `auth_*` and `user_type` placeholders.
    pub fn placeholders(&self) -> [(&'static str, &str); 5] {
        [
            ("auth_player_name", self.username.as_str()),
            ("auth_uuid", self.uuid.as_str()),
            ("auth_access_token", self.access_token.as_str()),
            ("auth_session", self.access_token.as_str()),
            ("user_type", self.user_type.as_str()),
        ]
    }
}
