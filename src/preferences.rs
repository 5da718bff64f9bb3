use std::sync::{Arc, Mutex, MutexGuard};

use crate::token_store::{KeyValueStore, TokenStore};

/// Storage key for the avatar URL.
pub const AVATAR_KEY: &str = "aura.avatar";

/// Storage key for the accent color.
pub const AURA_COLOR_KEY: &str = "aura.auraColor";

/// Avatar used until the user picks one.
pub const DEFAULT_AVATAR: &str = "assets/user/default-avatar.png";

/// Accent color used until the user picks one.
pub const DEFAULT_AURA_COLOR: &str = "#6f9dff";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Values {
    avatar: String,
    aura_color: String,
}

/// Cosmetic per-user settings.  Read once at construction, written through
/// on every change.
pub struct UserPreferences {
    storage: TokenStore,
    values: Mutex<Values>,
}

impl UserPreferences {
    /// Loads preferences from `backend`, falling back to the defaults.
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        let storage = TokenStore::new(backend);
        let values = Values {
            avatar: storage
                .read(AVATAR_KEY)
                .unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            aura_color: storage
                .read(AURA_COLOR_KEY)
                .unwrap_or_else(|| DEFAULT_AURA_COLOR.to_string()),
        };
        Self {
            storage,
            values: Mutex::new(values),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Values> {
        match self.values.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// The avatar URL.
    pub fn avatar(&self) -> String {
        self.lock().avatar.clone()
    }

    /// The accent color.
    pub fn aura_color(&self) -> String {
        self.lock().aura_color.clone()
    }

    /// Changes the avatar and persists it.
    pub fn set_avatar(&self, url: &str) {
        self.lock().avatar = url.to_string();
        self.storage.write(AVATAR_KEY, Some(url));
    }

    /// Changes the accent color and persists it.
    pub fn set_aura_color(&self, color: &str) {
        self.lock().aura_color = color.to_string();
        self.storage.write(AURA_COLOR_KEY, Some(color));
    }
}
