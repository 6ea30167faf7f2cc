use crate::storage;
use crate::types::{Category, ChannelId, GuildId, Result, RoleId};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub windows: bool,
    #[serde(default)]
    pub linux: bool,
    #[serde(default, deserialize_with = "deserialize_roles")]
    pub roles: BTreeMap<Category, Vec<RoleId>>,
}

impl ServerConfig {
    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Windows => self.windows,
            Category::Linux => self.linux,
        }
    }

    pub fn set_enabled(&mut self, category: Category, enabled: bool) {
        match category {
            Category::Windows => self.windows = enabled,
            Category::Linux => self.linux = enabled,
        }
    }

    /// Enabled categories in processing order.
    pub fn enabled_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.is_enabled(*c))
            .collect()
    }

    pub fn roles_for(&self, category: Category) -> &[RoleId] {
        self.roles.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Older snapshots stored a single role id instead of a list.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRoles {
    One(RoleId),
    Many(Vec<RoleId>),
}

fn deserialize_roles<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<Category, Vec<RoleId>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<Category, StoredRoles> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(category, roles)| match roles {
            StoredRoles::One(role) => (category, vec![role]),
            StoredRoles::Many(roles) => (category, roles),
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Added,
    AlreadyPresent,
    Removed,
    NotConfigured,
}

pub struct ConfigStore {
    path: PathBuf,
    servers: BTreeMap<GuildId, ServerConfig>,
}

impl ConfigStore {
    /// Load the store from `path`. Missing or corrupt files start empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let servers: BTreeMap<GuildId, ServerConfig> = storage::load_or_default(&path);
        info!("Loaded {} server configs from {}", servers.len(), path.display());
        Self { path, servers }
    }

    pub fn get(&self, guild: GuildId) -> Option<&ServerConfig> {
        self.servers.get(&guild)
    }

    /// Stable copy of all configs, ordered by server id.
    pub fn snapshot(&self) -> Vec<(GuildId, ServerConfig)> {
        self.servers
            .iter()
            .map(|(guild, config)| (*guild, config.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bind the destination channel and enable every category.
    pub fn set_channel(&mut self, guild: GuildId, channel: ChannelId) -> Result<()> {
        let mut next = self.servers.clone();
        let config = next.entry(guild).or_default();
        config.channel_id = Some(channel);
        for category in Category::ALL {
            config.set_enabled(category, true);
        }
        self.commit(next)?;
        info!("Server {} now announces in channel {}", guild, channel);
        Ok(())
    }

    /// Returns `false` when the server has no channel bound yet.
    pub fn enable_category(&mut self, guild: GuildId, category: Category) -> Result<bool> {
        self.toggle_category(guild, category, true)
    }

    /// Returns `false` when the server has no channel bound yet.
    pub fn disable_category(&mut self, guild: GuildId, category: Category) -> Result<bool> {
        self.toggle_category(guild, category, false)
    }

    fn toggle_category(&mut self, guild: GuildId, category: Category, enabled: bool) -> Result<bool> {
        let Some(config) = self.servers.get(&guild) else {
            return Ok(false);
        };
        if config.channel_id.is_none() {
            return Ok(false);
        }
        if config.is_enabled(category) != enabled {
            let mut next = self.servers.clone();
            if let Some(config) = next.get_mut(&guild) {
                config.set_enabled(category, enabled);
            }
            self.commit(next)?;
        }
        Ok(true)
    }

    pub fn add_role(&mut self, guild: GuildId, category: Category, role: RoleId) -> Result<RoleChange> {
        if self
            .get(guild)
            .is_some_and(|config| config.roles_for(category).contains(&role))
        {
            return Ok(RoleChange::AlreadyPresent);
        }

        let mut next = self.servers.clone();
        next.entry(guild)
            .or_default()
            .roles
            .entry(category)
            .or_default()
            .push(role);
        self.commit(next)?;
        Ok(RoleChange::Added)
    }

    pub fn remove_role(&mut self, guild: GuildId, category: Category, role: RoleId) -> Result<RoleChange> {
        let Some(position) = self
            .get(guild)
            .and_then(|config| config.roles_for(category).iter().position(|r| *r == role))
        else {
            return Ok(RoleChange::NotConfigured);
        };

        let mut next = self.servers.clone();
        if let Some(roles) = next
            .get_mut(&guild)
            .and_then(|config| config.roles.get_mut(&category))
        {
            roles.remove(position);
        }
        self.commit(next)?;
        Ok(RoleChange::Removed)
    }

    /// Returns `false` when the server is unknown.
    pub fn clear_roles(&mut self, guild: GuildId, category: Category) -> Result<bool> {
        let mut next = self.servers.clone();
        let Some(config) = next.get_mut(&guild) else {
            return Ok(false);
        };
        config.roles.insert(category, Vec::new());
        self.commit(next)?;
        Ok(true)
    }

    /// Drop the server entirely. Returns `false` when it was not configured.
    pub fn remove_server(&mut self, guild: GuildId) -> Result<bool> {
        let mut next = self.servers.clone();
        if next.remove(&guild).is_none() {
            return Ok(false);
        }
        self.commit(next)?;
        info!("Removed configuration for server {}", guild);
        Ok(true)
    }

    // The new map only replaces the live one once it is on disk.
    fn commit(&mut self, next: BTreeMap<GuildId, ServerConfig>) -> Result<()> {
        debug!("Persisting {} server configs", next.len());
        storage::write_snapshot(&self.path, &next)?;
        self.servers = next;
        Ok(())
    }
}
