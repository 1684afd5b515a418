//! Authenticated principal and its persistence.
//!
//! The principal lives in `<home>/session.json` with restricted permissions
//! (0600). [`Session`] is the in-memory handle every component shares; it is
//! hydrated from the store once at startup and torn down on logout or when a
//! token refresh fails. Tokens are never logged or displayed in full.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::paths;

/// Access level of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    SupportAgent,
    ClientAdmin,
    ClientUser,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::SuperAdmin,
        Role::SupportAgent,
        Role::ClientAdmin,
        Role::ClientUser,
    ];

    /// Parses a wire role. Unknown values get the least-privileged role.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "super_admin" => Role::SuperAdmin,
            "support_agent" => Role::SupportAgent,
            "client_admin" => Role::ClientAdmin,
            "client_user" => Role::ClientUser,
            other => {
                tracing::warn!(role = other, "unknown role, treating as client_user");
                Role::ClientUser
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::SupportAgent => "support_agent",
            Role::ClientAdmin => "client_admin",
            Role::ClientUser => "client_user",
        }
    }

    /// Label shown in the sidebar footer.
    pub fn label(self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Admin",
            Role::SupportAgent => "Agente de Suporte",
            Role::ClientAdmin => "Admin do Cliente",
            Role::ClientUser => "Usuário",
        }
    }

    /// Roles that see every tenant rather than only their own company.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::SupportAgent)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::parse(&raw))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// The authenticated user's identity and credential bundle.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Tenant the user belongs to. Staff roles usually have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<u64>,
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Token lifetime in seconds, as reported by the backend.
    #[serde(default)]
    pub expires_in: u64,
    /// When the token was obtained locally.
    #[serde(default = "Utc::now")]
    pub issued_at: DateTime<Utc>,
}

impl Principal {
    /// Value for the `Authorization` header, e.g. `Bearer t1`.
    pub fn authorization_header(&self) -> String {
        let token_type = self.token_type.trim();
        let token_type = if token_type.is_empty() {
            "Bearer"
        } else {
            token_type
        };
        format!("{token_type} {}", self.access_token)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        i64::try_from(self.expires_in)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| self.issued_at.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// True once the reported lifetime has elapsed. Requests still go out;
    /// the backend decides and a 401 triggers a refresh.
    pub fn is_expired(&self) -> bool {
        self.expires_in > 0 && Utc::now() >= self.expires_at()
    }

    /// Whether the principal belongs to `company_id`.
    pub fn belongs_to(&self, company_id: u64) -> bool {
        self.company_id == Some(company_id)
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("company_id", &self.company_id)
            .field("agent_id", &self.agent_id)
            .field("access_token", &mask_token(&self.access_token))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Masks a token for display (shows first 12 chars only).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 16 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(12).collect();
    format!("{prefix}...")
}

/// Session file filename.
const SESSION_FILE: &str = "session.json";

/// Durable storage for a single principal.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$SDESK_HOME/session.json`.
    pub fn default_location() -> Self {
        Self::new(paths::session_path())
    }

    /// Store at `<home>/session.json`.
    pub fn in_home(home: &Path) -> Self {
        Self::new(home.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored principal.
    ///
    /// A missing file is no session. A corrupt file is also treated as no
    /// session (and logged) so startup falls back to login.
    pub fn load(&self) -> Result<Option<Principal>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session from {}", self.path.display()))?;

        match serde_json::from_str(&contents) {
            Ok(principal) => Ok(Some(principal)),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "ignoring corrupt session file"
                );
                Ok(None)
            }
        }
    }

    /// Saves the principal with restricted permissions (0600).
    /// Writes to a temp file and renames it into place.
    pub fn save(&self, principal: &Principal) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(principal).context("Failed to serialize session")?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&tmp_path)
            .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Removes the stored principal. Missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}

/// Shared handle to the current principal.
///
/// Cloning is cheap; all clones see the same principal. Only the auth flow
/// and the API client write to it.
#[derive(Debug, Clone)]
pub struct Session {
    store: SessionStore,
    current: Arc<RwLock<Option<Principal>>>,
}

impl Session {
    /// Creates an empty session backed by `store`. Call [`Session::hydrate`]
    /// to restore a persisted principal.
    pub fn new(store: SessionStore) -> Self {
        Self {
            store,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Creates a session and hydrates it from `store`.
    pub fn open(store: SessionStore) -> Result<Self> {
        let session = Self::new(store);
        session.hydrate()?;
        Ok(session)
    }

    /// Loads the persisted principal into memory.
    pub fn hydrate(&self) -> Result<Option<Principal>> {
        let loaded = self.store.load()?;
        if let Some(principal) = &loaded {
            tracing::debug!(user_id = principal.id, role = %principal.role, "session restored");
        }
        *self.write() = loaded.clone();
        Ok(loaded)
    }

    pub fn current(&self) -> Option<Principal> {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// The `Authorization` header value for the current principal.
    pub fn authorization(&self) -> Option<String> {
        self.read().as_ref().map(Principal::authorization_header)
    }

    /// Makes `principal` current, then persists it.
    ///
    /// The in-memory principal is updated even if persisting fails.
    pub fn replace(&self, principal: Principal) -> Result<()> {
        *self.write() = Some(principal.clone());
        self.store.save(&principal)
    }

    /// Clears memory and storage.
    pub fn teardown(&self) -> Result<()> {
        *self.write() = None;
        self.store.clear()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Principal>> {
        self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Principal>> {
        self.current.write().unwrap_or_else(PoisonError::into_inner)
    }
}
