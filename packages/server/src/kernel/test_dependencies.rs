// TestDependencies - in-memory implementations for testing
//
// Provides in-memory collaborators that can be injected into ModerationDeps
// for tests: a full relational-store stand-in, a role map, a recording
// security event sink and a recording notifier.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use crate::common::Role;
use crate::domains::moderation::models::{
    ModerationAction, NewAction, NewRestriction, Restriction, ReversalFilters, RevocationUpdate,
};
use crate::domains::reports::models::{NewReport, Report, ReportReason, ReportStatus, TargetType};
use crate::kernel::deps::ModerationDeps;
use crate::kernel::traits::{
    AlbumContext, BaseModerationStore, BaseNotificationDispatcher, BaseRoleStore,
    BaseSecurityEventSink, SecurityEvent,
};

// =============================================================================
// In-memory moderation store
// =============================================================================

#[derive(Default)]
struct StoreState {
    reports: Vec<Report>,
    actions: Vec<ModerationAction>,
    restrictions: Vec<Restriction>,
    users: HashSet<Uuid>,
    posts: HashSet<Uuid>,
    comments: HashSet<Uuid>,
    tracks: HashSet<Uuid>,
    albums: HashMap<Uuid, AlbumContext>,
}

pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn with_user(self, id: Uuid) -> Self {
        self.state.lock().unwrap().users.insert(id);
        self
    }

    pub fn with_post(self, id: Uuid) -> Self {
        self.state.lock().unwrap().posts.insert(id);
        self
    }

    /// Register an album along with its owner and child tracks.
    pub fn with_album(self, album: AlbumContext) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.users.insert(album.owner_id);
            for track_id in &album.track_ids {
                state.tracks.insert(*track_id);
            }
            state.albums.insert(album.album_id, album);
        }
        self
    }

    /// Insert a fully-formed action record, bypassing the executor. Tests use
    /// this to seed history with specific timestamps.
    pub fn seed_action(&self, action: ModerationAction) {
        self.state.lock().unwrap().actions.push(action);
    }

    pub fn track_exists(&self, id: Uuid) -> bool {
        self.state.lock().unwrap().tracks.contains(&id)
    }

    pub fn album_exists(&self, id: Uuid) -> bool {
        self.state.lock().unwrap().albums.contains_key(&id)
    }
}

#[async_trait]
impl BaseModerationStore for InMemoryStore {
    async fn insert_report(&self, new: NewReport) -> Result<Report> {
        let report = Report {
            id: Uuid::new_v4(),
            reporter_id: new.reporter_id,
            target_type: new.target_type,
            target_id: new.target_id,
            reason: new.reason,
            description: new.description,
            priority: new.priority,
            status: new.status,
            moderator_flagged: new.moderator_flagged,
            resolved_at: None,
            resolved_by: None,
            created_at: Utc::now(),
        };
        self.state.lock().unwrap().reports.push(report.clone());
        Ok(report)
    }

    async fn find_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn count_reports_since(&self, reporter_id: Uuid, since: DateTime<Utc>) -> Result<i64> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .reports
            .iter()
            .filter(|r| r.reporter_id == reporter_id && r.created_at >= since)
            .count() as i64)
    }

    async fn duplicate_report_exists(
        &self,
        reporter_id: Uuid,
        target_type: TargetType,
        target_id: Uuid,
        reason: ReportReason,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        Ok(self.state.lock().unwrap().reports.iter().any(|r| {
            r.reporter_id == reporter_id
                && r.target_type == target_type
                && r.target_id == target_id
                && r.reason == reason
                && r.created_at >= since
        }))
    }

    async fn resolve_report(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> Result<Option<Report>> {
        let mut state = self.state.lock().unwrap();
        let Some(report) = state.reports.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        if report.status == ReportStatus::Resolved {
            return Ok(None);
        }
        report.status = ReportStatus::Resolved;
        report.resolved_by = Some(resolved_by);
        report.resolved_at = Some(resolved_at);
        Ok(Some(report.clone()))
    }

    async fn open_reports(&self) -> Result<Vec<Report>> {
        let mut open: Vec<Report> = self
            .state
            .lock()
            .unwrap()
            .reports
            .iter()
            .filter(|r| r.status != ReportStatus::Resolved)
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(b.moderator_flagged.cmp(&a.moderator_flagged))
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(open)
    }

    async fn insert_actions(&self, actions: Vec<NewAction>) -> Result<Vec<ModerationAction>> {
        let now = Utc::now();
        let mut inserted = Vec::with_capacity(actions.len());
        let mut state = self.state.lock().unwrap();
        for new in actions {
            let action = ModerationAction {
                id: new.id,
                moderator_id: new.moderator_id,
                target_user_id: new.target_user_id,
                action_type: new.action_type,
                target_type: new.target_type,
                target_id: new.target_id,
                reason: new.reason,
                internal_notes: new.internal_notes,
                metadata: Json(new.metadata),
                notification_sent: new.notification_sent,
                created_at: now,
                revoked_at: None,
                revoked_by: None,
            };
            state.actions.push(action.clone());
            inserted.push(action);
        }
        Ok(inserted)
    }

    async fn find_action(&self, id: Uuid) -> Result<Option<ModerationAction>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .actions
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }

    async fn mark_revoked(
        &self,
        id: Uuid,
        update: RevocationUpdate,
    ) -> Result<Option<ModerationAction>> {
        let mut state = self.state.lock().unwrap();
        let Some(action) = state.actions.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        if action.revoked_at.is_some() {
            return Ok(None);
        }
        action.revoked_at = Some(update.revoked_at);
        action.revoked_by = Some(update.revoked_by);
        action.metadata = Json(update.metadata);
        Ok(Some(action.clone()))
    }

    async fn overwrite_revocation(&self, id: Uuid, update: RevocationUpdate) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(action) = state.actions.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };
        if action.revoked_at.is_some() {
            return Ok(false);
        }
        action.revoked_at = Some(update.revoked_at);
        action.revoked_by = Some(update.revoked_by);
        action.metadata = Json(update.metadata);
        Ok(true)
    }

    async fn set_notification_sent(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(action) = state.actions.iter_mut().find(|a| a.id == id) {
            action.notification_sent = true;
        }
        Ok(())
    }

    async fn actions_targeting(
        &self,
        target_user_id: Uuid,
        include_revoked: bool,
    ) -> Result<Vec<ModerationAction>> {
        let mut actions: Vec<ModerationAction> = self
            .state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter(|a| {
                a.target_user_id == target_user_id && (include_revoked || a.revoked_at.is_none())
            })
            .cloned()
            .collect();
        actions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(actions)
    }

    async fn actions_targeting_since(
        &self,
        target_user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ModerationAction>> {
        let mut actions: Vec<ModerationAction> = self
            .state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter(|a| a.target_user_id == target_user_id && a.created_at >= since)
            .cloned()
            .collect();
        actions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(actions)
    }

    async fn actions_in_range(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<ModerationAction>> {
        let mut actions: Vec<ModerationAction> = self
            .state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter(|a| {
                start.map_or(true, |s| a.created_at >= s) && end.map_or(true, |e| a.created_at <= e)
            })
            .cloned()
            .collect();
        actions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(actions)
    }

    async fn revoked_actions(&self, filters: ReversalFilters) -> Result<Vec<ModerationAction>> {
        let mut actions: Vec<ModerationAction> = self
            .state
            .lock()
            .unwrap()
            .actions
            .iter()
            .filter(|a| {
                let Some(revoked_at) = a.revoked_at else {
                    return false;
                };
                filters.start_date.map_or(true, |s| revoked_at >= s)
                    && filters.end_date.map_or(true, |e| revoked_at <= e)
                    && filters.moderator_id.map_or(true, |m| a.moderator_id == m)
                    && filters.action_type.map_or(true, |t| a.action_type == t)
                    && filters.reversal_reason.as_deref().map_or(true, |r| {
                        a.metadata
                            .reversal
                            .as_ref()
                            .map_or(false, |rev| rev.reversal_reason == r)
                    })
                    && filters
                        .target_user_id
                        .map_or(true, |u| a.target_user_id == u)
                    && filters.revoked_by.map_or(true, |u| a.revoked_by == Some(u))
            })
            .cloned()
            .collect();
        actions.sort_by(|a, b| b.revoked_at.cmp(&a.revoked_at));
        Ok(actions)
    }

    async fn insert_restriction(&self, new: NewRestriction) -> Result<Restriction> {
        let restriction = Restriction {
            id: Uuid::new_v4(),
            action_id: new.action_id,
            user_id: new.user_id,
            kind: new.kind,
            active: true,
            expires_at: new.expires_at,
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .unwrap()
            .restrictions
            .push(restriction.clone());
        Ok(restriction)
    }

    async fn find_restriction_by_action(&self, action_id: Uuid) -> Result<Option<Restriction>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .restrictions
            .iter()
            .find(|r| r.action_id == action_id)
            .cloned())
    }

    async fn deactivate_restriction(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(restriction) = state.restrictions.iter_mut().find(|r| r.id == id) {
            restriction.active = false;
        }
        Ok(())
    }

    async fn target_exists(&self, target_type: TargetType, target_id: Uuid) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(match target_type {
            TargetType::Post => state.posts.contains(&target_id),
            TargetType::Comment => state.comments.contains(&target_id),
            TargetType::Track => state.tracks.contains(&target_id),
            TargetType::User => state.users.contains(&target_id),
            TargetType::Album => state.albums.contains_key(&target_id),
        })
    }

    async fn find_album(&self, album_id: Uuid) -> Result<Option<AlbumContext>> {
        Ok(self.state.lock().unwrap().albums.get(&album_id).cloned())
    }

    async fn remove_content(&self, target_type: TargetType, target_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        match target_type {
            TargetType::Post => {
                state.posts.remove(&target_id);
            }
            TargetType::Comment => {
                state.comments.remove(&target_id);
            }
            TargetType::Track => {
                state.tracks.remove(&target_id);
            }
            TargetType::Album => {
                state.albums.remove(&target_id);
            }
            TargetType::User => {
                anyhow::bail!("user profiles are never deleted by moderation");
            }
        }
        Ok(())
    }

    async fn remove_album(&self, album_id: Uuid, remove_tracks: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(album) = state.albums.remove(&album_id) {
            if remove_tracks {
                for track_id in album.track_ids {
                    state.tracks.remove(&track_id);
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Mock role store
// =============================================================================

#[derive(Default)]
pub struct MockRoleStore {
    roles: Mutex<HashMap<Uuid, HashSet<Role>>>,
}

impl MockRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user_id: Uuid, role: Role) {
        self.roles
            .lock()
            .unwrap()
            .entry(user_id)
            .or_default()
            .insert(role);
    }
}

#[async_trait]
impl BaseRoleStore for MockRoleStore {
    async fn has_role(&self, user_id: Uuid, role: Role) -> Result<bool> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&user_id)
            .map_or(false, |roles| roles.contains(&role)))
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<Uuid>> {
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, roles)| roles.contains(&role))
            .map(|(id, _)| *id)
            .collect())
    }
}

// =============================================================================
// Recording security event sink
// =============================================================================

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<SecurityEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn recorded_of_type(&self, event_type: &str) -> Vec<SecurityEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BaseSecurityEventSink for RecordingEventSink {
    async fn record(&self, event: SecurityEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn events_since(
        &self,
        user_id: Option<Uuid>,
        since: DateTime<Utc>,
    ) -> Result<Vec<SecurityEvent>> {
        let mut events: Vec<SecurityEvent> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.created_at >= since && user_id.map_or(true, |u| e.user_id == Some(u)))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(events)
    }
}

// =============================================================================
// Recording notifier
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub data: serde_json::Value,
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseNotificationDispatcher for RecordingNotifier {
    async fn send(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        self.sent.lock().unwrap().push(SentNotification {
            user_id,
            title: title.to_string(),
            message: message.to_string(),
            data,
        });
        Ok(())
    }
}

// =============================================================================
// Bundle
// =============================================================================

/// All in-memory collaborators, with handles kept for assertions.
pub struct TestDependencies {
    pub store: Arc<InMemoryStore>,
    pub roles: Arc<MockRoleStore>,
    pub events: Arc<RecordingEventSink>,
    pub notifications: Arc<RecordingNotifier>,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            roles: Arc::new(MockRoleStore::new()),
            events: Arc::new(RecordingEventSink::new()),
            notifications: Arc::new(RecordingNotifier::new()),
        }
    }

    pub fn with_store(store: InMemoryStore) -> Self {
        Self {
            store: Arc::new(store),
            ..Self::new()
        }
    }

    pub fn deps(&self) -> ModerationDeps {
        ModerationDeps {
            store: self.store.clone(),
            roles: self.roles.clone(),
            security_events: self.events.clone(),
            notifications: self.notifications.clone(),
        }
    }
}
