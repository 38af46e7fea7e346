//! Process-wide session context

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::db::keys::{APP_THEME, SYNC_QUEUE, USER_DATA};
use crate::db::{load_json, save_json, RecordStore};
use crate::models::{Uid, UserData};
use crate::Result;

/// Current signed-in user, read-only to the sync core.
///
/// The value only changes through [`SessionContext::sign_in`] and
/// [`SessionContext::sign_out`]; subscribers observe every change.
#[derive(Clone)]
pub struct SessionContext {
    store: Arc<dyn RecordStore>,
    current: Arc<watch::Sender<Option<UserData>>>,
}

impl SessionContext {
    /// Build the session from the persisted `UserData` record
    pub async fn load(store: Arc<dyn RecordStore>) -> Result<Self> {
        let user = read_user(store.as_ref()).await?;
        if let Some(user) = &user {
            tracing::debug!("Restored session for {}", user.uid);
        }
        let (current, _) = watch::channel(user);
        Ok(Self {
            store,
            current: Arc::new(current),
        })
    }

    pub fn current_user(&self) -> Option<UserData> {
        self.current.borrow().clone()
    }

    /// Owner of newly created reports; the guest when signed out
    pub fn uid(&self) -> Uid {
        self.current
            .borrow()
            .as_ref()
            .map_or(Uid::Guest, |user| user.uid.clone())
    }

    /// Uid usable for remote sync, absent for guests and signed-out sessions
    pub fn sync_uid(&self) -> Option<String> {
        self.uid().sync_uid().map(str::to_string)
    }

    pub async fn sign_in(&self, user: UserData) -> Result<()> {
        save_json(self.store.as_ref(), USER_DATA, &user).await?;
        tracing::info!("Signed in as {}", user.uid);
        self.current.send_replace(Some(user));
        Ok(())
    }

    /// Forget the user and the theme; reports stay on the device.
    ///
    /// Returns how many sync tasks are still queued. They are kept and run
    /// under whichever user is signed in when the queue next drains.
    pub async fn sign_out(&self) -> Result<usize> {
        let pending = queued_task_count(self.store.as_ref()).await?;
        self.store.remove(USER_DATA).await?;
        self.store.remove(APP_THEME).await?;
        if let Some(previous) = self.current.send_replace(None) {
            tracing::info!("Signed out {}", previous.uid);
            if pending > 0 {
                tracing::warn!(
                    "{} sync task(s) queued by {} remain and will sync under the next signed-in user",
                    pending,
                    previous.uid
                );
            }
        }
        Ok(pending)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UserData>> {
        self.current.subscribe()
    }
}

async fn queued_task_count(store: &dyn RecordStore) -> Result<usize> {
    Ok(match store.get(SYNC_QUEUE).await? {
        Some(Value::Array(tasks)) => tasks.len(),
        _ => 0,
    })
}

async fn read_user(store: &dyn RecordStore) -> Result<Option<UserData>> {
    match load_json::<UserData>(store, USER_DATA).await {
        Ok(user) => Ok(user),
        Err(crate::Error::Serialization(error)) => {
            tracing::warn!("Ignoring unreadable UserData record: {}", error);
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
