use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    db::{DocumentKey, LocalKeyValueStore, RemoteDocumentStore, LOCAL_LISTS_KEY},
    error::AppResult,
    models::{ContentId, Document, ListField, ListState, Notice, SessionIdentity},
    services::notifications::NotificationSink,
};

/// Produces the calendar date used to stamp watched entries
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Lifecycle of the lists for the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Uninitialized,
    Loading,
    Ready,
}

struct Session {
    identity: Option<SessionIdentity>,
    status: SyncStatus,
    degraded: bool,
    lists: ListState,
    /// Bumped on every identity change; a load only applies if it still matches
    generation: u64,
}

/// What is kept under the device key: the lists and the session they belong to
#[derive(Debug, Serialize, Deserialize)]
struct DeviceCopy {
    /// `guest` or `user:<id>`. Untagged copies count as the guest's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    #[serde(flatten)]
    lists: ListState,
}

impl DeviceCopy {
    fn belongs_to(&self, identity: &SessionIdentity) -> bool {
        match &self.owner {
            Some(owner) => *owner == identity.to_string(),
            None => identity.is_guest(),
        }
    }
}

impl Session {
    fn empty() -> Self {
        Self {
            identity: None,
            status: SyncStatus::Uninitialized,
            degraded: false,
            lists: ListState::default(),
            generation: 0,
        }
    }
}

/// Single source of truth for the session's watchlist, watched and favorites.
///
/// Signed-in users are backed by a remote document; guests by the on-device
/// store. Mutations are optimistic: the in-memory lists change right away and
/// persistence follows. When the remote store cannot be reached the change is
/// kept on the device instead and nothing is rolled back.
///
/// No error crosses this boundary. Every path ends in a valid `ListState`,
/// with failures surfaced as notices.
pub struct ListSyncStore {
    remote: Arc<dyn RemoteDocumentStore>,
    local: Arc<dyn LocalKeyValueStore>,
    notifications: Arc<dyn NotificationSink>,
    clock: Clock,
    session: RwLock<Session>,
}

impl ListSyncStore {
    pub fn new(
        remote: Arc<dyn RemoteDocumentStore>,
        local: Arc<dyn LocalKeyValueStore>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            remote,
            local,
            notifications,
            clock: Arc::new(|| Local::now().date_naive()),
            session: RwLock::new(Session::empty()),
        }
    }

    /// Replaces the clock used for `date_watched`
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Loads the lists for `identity`, discarding whatever the previous
    /// identity had.
    ///
    /// If the identity changes again before this load finishes, its result is
    /// dropped and the newer session's state is returned untouched.
    pub async fn load(&self, identity: SessionIdentity) -> ListState {
        let generation = {
            let mut session = self.write();
            session.generation += 1;
            session.identity = Some(identity.clone());
            session.status = SyncStatus::Loading;
            session.degraded = false;
            session.lists = ListState::default();
            session.generation
        };

        tracing::info!(identity = %identity, generation, "Loading lists");

        let (lists, degraded) = match &identity {
            SessionIdentity::Guest => (self.read_local(&identity), false),
            SessionIdentity::Authenticated(user_id) => match self.fetch_remote(user_id).await {
                Ok(lists) => (lists, false),
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        error = %e,
                        "Remote lists unavailable, falling back to device copy"
                    );
                    (self.read_local(&identity), true)
                }
            },
        };

        {
            let mut session = self.write();
            if session.generation != generation {
                tracing::debug!(
                    identity = %identity,
                    stale = generation,
                    current = session.generation,
                    "Discarding stale load"
                );
                return session.lists.clone();
            }

            session.lists = lists.clone();
            session.status = SyncStatus::Ready;
            session.degraded = degraded;
        }

        tracing::info!(
            identity = %identity,
            watchlist = lists.watchlist().len(),
            watched = lists.watched().len(),
            favorites = lists.favorites().len(),
            degraded,
            "Lists ready"
        );

        if degraded {
            self.notifications.notify(Notice::warning(
                "Offline mode",
                "Couldn't reach your account. Showing the lists saved on this device.",
            ));
        }

        lists
    }

    /// Forgets the current session; any load still in flight is abandoned
    pub fn reset(&self) {
        let mut session = self.write();
        let generation = session.generation + 1;
        *session = Session::empty();
        session.generation = generation;
        tracing::info!(generation, "Session reset");
    }

    pub fn status(&self) -> SyncStatus {
        self.read().status
    }

    pub fn is_loading(&self) -> bool {
        self.status() == SyncStatus::Loading
    }

    /// Whether the lists came from the device copy because the remote failed
    pub fn is_degraded(&self) -> bool {
        self.read().degraded
    }

    pub fn identity(&self) -> Option<SessionIdentity> {
        self.read().identity.clone()
    }

    /// Current lists as a read-only value
    pub fn snapshot(&self) -> ListState {
        self.read().lists.clone()
    }

    pub fn is_in_watchlist(&self, id: &ContentId) -> bool {
        self.read().lists.is_in_watchlist(id)
    }

    pub fn is_in_watched(&self, id: &ContentId) -> bool {
        self.read().lists.is_in_watched(id)
    }

    pub fn is_favorite(&self, id: &ContentId) -> bool {
        self.read().lists.is_favorite(id)
    }

    pub async fn add_to_watchlist(&self, id: impl Into<ContentId>) -> ListState {
        let id = id.into();
        let notice = Notice::success("Added to watchlist", format!("{} is on your watchlist.", id));
        self.mutate(ListField::Watchlist, notice, |lists| {
            Some(lists.with_watchlist_added(id))
        })
        .await
    }

    pub async fn remove_from_watchlist(&self, id: impl Into<ContentId>) -> ListState {
        let id = id.into();
        let notice = Notice::success(
            "Removed from watchlist",
            format!("{} was removed from your watchlist.", id),
        );
        self.mutate(ListField::Watchlist, notice, |lists| {
            Some(lists.with_watchlist_removed(&id))
        })
        .await
    }

    /// Marks `id` as watched today. A missing rating is stored as 0 (unrated).
    pub async fn add_to_watched(&self, id: impl Into<ContentId>, rating: Option<i32>) -> ListState {
        let id = id.into();
        let today = (self.clock)();
        let notice = Notice::success("Marked as watched", format!("{} was added to your watched list.", id));
        self.mutate(ListField::Watched, notice, |lists| {
            Some(lists.with_watched_added(id, rating.unwrap_or(0), today))
        })
        .await
    }

    pub async fn remove_from_watched(&self, id: impl Into<ContentId>) -> ListState {
        let id = id.into();
        let notice = Notice::success(
            "Removed from watched",
            format!("{} was removed from your watched list.", id),
        );
        self.mutate(ListField::Watched, notice, |lists| {
            Some(lists.with_watched_removed(&id))
        })
        .await
    }

    /// Changes the rating of a watched entry without touching its date.
    ///
    /// Does nothing when `id` is not on the watched list.
    pub async fn update_watched_rating(&self, id: impl Into<ContentId>, rating: i32) -> ListState {
        let id = id.into();
        let notice = Notice::success("Rating updated", format!("You rated {} {}/10.", id, rating));
        self.mutate(ListField::Watched, notice, |lists| {
            lists.with_watched_rating(&id, rating)
        })
        .await
    }

    pub async fn add_to_favorites(&self, id: impl Into<ContentId>) -> ListState {
        let id = id.into();
        let notice = Notice::success("Added to favorites", format!("{} is one of your favorites.", id));
        self.mutate(ListField::Favorites, notice, |lists| {
            Some(lists.with_favorite_added(id))
        })
        .await
    }

    pub async fn remove_from_favorites(&self, id: impl Into<ContentId>) -> ListState {
        let id = id.into();
        let notice = Notice::success(
            "Removed from favorites",
            format!("{} was removed from your favorites.", id),
        );
        self.mutate(ListField::Favorites, notice, |lists| {
            Some(lists.with_favorite_removed(&id))
        })
        .await
    }

    /// Applies `transition` to the in-memory lists, then persists the result.
    ///
    /// The new value is visible to readers before persistence starts. A
    /// transition returning `None` leaves everything as it was.
    async fn mutate<F>(&self, field: ListField, notice: Notice, transition: F) -> ListState
    where
        F: FnOnce(&ListState) -> Option<ListState>,
    {
        let (identity, generation, next) = {
            let mut session = self.write();
            let ready = match (&session.identity, session.status) {
                (Some(identity), SyncStatus::Ready) => Some(identity.clone()),
                _ => None,
            };
            let Some(identity) = ready else {
                let current = session.lists.clone();
                drop(session);
                tracing::warn!(field = %field, "List change ignored, session not ready");
                self.notifications.notify(Notice::warning(
                    "Lists are still loading",
                    "Try again in a moment.",
                ));
                return current;
            };

            let Some(next) = transition(&session.lists) else {
                tracing::debug!(field = %field, "List change had no effect");
                return session.lists.clone();
            };

            session.lists = next.clone();
            (identity, session.generation, next)
        };

        self.persist(&identity, generation, field, &next, notice).await;
        next
    }

    /// Writes `lists` for `identity`. Once the session has moved on to another
    /// generation, the outcome of a remote write is only logged: neither the
    /// device copy nor the notices belong to the old session anymore.
    async fn persist(
        &self,
        identity: &SessionIdentity,
        generation: u64,
        field: ListField,
        lists: &ListState,
        notice: Notice,
    ) {
        match identity {
            SessionIdentity::Guest => {
                self.write_local(identity, lists);
                self.notifications.notify(notice);
            }
            SessionIdentity::Authenticated(user_id) => {
                let result = self.write_remote(user_id, field, lists).await;

                let current = self.read().generation;
                if current != generation {
                    tracing::debug!(
                        user_id = %user_id,
                        field = %field,
                        stale = generation,
                        current,
                        succeeded = result.is_ok(),
                        "Session changed during remote write, skipping follow-up"
                    );
                    return;
                }

                match result {
                    Ok(()) => {
                        tracing::debug!(user_id = %user_id, field = %field, "List change synced");
                        self.notifications.notify(notice);
                    }
                    Err(e) => {
                        tracing::warn!(
                            user_id = %user_id,
                            field = %field,
                            error = %e,
                            "Remote write failed, keeping change on device"
                        );
                        self.write_local(identity, lists);
                        self.notifications.notify(Notice::warning(
                            "Saved locally",
                            "Your change was saved on this device and will sync later.",
                        ));
                    }
                }
            }
        }
    }

    /// Fetches the user's document, creating it first if it does not exist
    async fn fetch_remote(&self, user_id: &str) -> AppResult<ListState> {
        let key = DocumentKey::Lists(user_id.to_string()).to_string();

        if let Some(document) = self.remote.get_document(&key).await? {
            return Ok(ListState::from_document(&document));
        }

        tracing::info!(user_id = %user_id, "No list document yet, creating one");
        self.remote
            .create_document(&key, ListState::default().to_document()?)
            .await?;

        // A concurrent create may have filled fields in between
        let lists = self
            .remote
            .get_document(&key)
            .await?
            .map(|document| ListState::from_document(&document))
            .unwrap_or_default();

        Ok(lists)
    }

    async fn write_remote(&self, user_id: &str, field: ListField, lists: &ListState) -> AppResult<()> {
        let key = DocumentKey::Lists(user_id.to_string()).to_string();
        let mut fields = Document::new();
        fields.insert(field.as_str().to_string(), lists.field_value(field)?);
        self.remote.update_fields(&key, fields).await
    }

    /// Reads the device copy kept for `identity`. A copy that is missing,
    /// unreadable or owned by another session becomes empty lists.
    fn read_local(&self, identity: &SessionIdentity) -> ListState {
        let json = match self.local.read(LOCAL_LISTS_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return ListState::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read device copy of lists");
                return ListState::default();
            }
        };

        match serde_json::from_str::<DeviceCopy>(&json) {
            Ok(copy) if copy.belongs_to(identity) => copy.lists,
            Ok(copy) => {
                tracing::debug!(
                    identity = %identity,
                    owner = ?copy.owner,
                    "Device copy belongs to another session, starting empty"
                );
                ListState::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Device copy of lists is corrupt, starting empty");
                ListState::default()
            }
        }
    }

    /// Best-effort write of the full lists to the device, tagged with `identity`
    fn write_local(&self, identity: &SessionIdentity, lists: &ListState) {
        let copy = DeviceCopy {
            owner: Some(identity.to_string()),
            lists: lists.clone(),
        };
        let result = serde_json::to_string(&copy)
            .map_err(Into::into)
            .and_then(|json| self.local.write(LOCAL_LISTS_KEY, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to save lists on device");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}
