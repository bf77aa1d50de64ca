use super::messages;
use crate::commit_engine::{AtomicCommitEngine, EntryChange};
use picpost_core::clock::Clock;
use picpost_core::content::AttachmentFetcher;
use picpost_core::entry::{Entry, EntryField, EntryPatch};
use picpost_core::error::{PicpostError, Result, ValidationError};
use picpost_core::event::{ActionId, Attachment, EventKind, InboundEvent};
use picpost_core::notify::{Destination, Notifier, OutboundMessage};
use picpost_core::session::{PendingImage, Session, SessionState, SessionStore, SessionTtl};
use picpost_core::validation::{
    CalendarDate, normalize_title, validate_date, validate_image_media_type, validate_link,
};
use std::sync::Arc;

/// Drives one conversation thread through the upload, edit and delete wizard.
///
/// `FlowController` owns the transition table. It loads the session for the event's thread,
/// applies the event to the current state, persists the resulting state with the TTL of its
/// bucket, and sends exactly one outbound message per transition.
///
/// # Error handling
///
/// - Validation failures are answered inline and leave the session unchanged.
/// - Content host failures are reported to the thread; the session keeps its state so the
///   user can retry.
/// - Anything else is returned to the caller, which reports it and still acknowledges the
///   transport.
///
/// A data change is never rolled back because the confirmation message failed.
pub struct FlowController {
    sessions: Arc<dyn SessionStore>,
    engine: Arc<AtomicCommitEngine>,
    fetcher: Arc<dyn AttachmentFetcher>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    ttl: SessionTtl,
}

impl FlowController {
    /// Creates a new `FlowController`.
    ///
    /// # Arguments
    ///
    /// * `sessions` - TTL-bearing store for wizard state
    /// * `engine` - Commit engine writing to the content repository
    /// * `fetcher` - Downloads chat attachments
    /// * `notifier` - Sends replies into the conversation thread
    /// * `clock` - Time source for session timestamps and the "today" shortcut
    /// * `ttl` - Expiry per state bucket
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        engine: Arc<AtomicCommitEngine>,
        fetcher: Arc<dyn AttachmentFetcher>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        ttl: SessionTtl,
    ) -> Self {
        Self {
            sessions,
            engine,
            fetcher,
            notifier,
            clock,
            ttl,
        }
    }

    /// Applies one inbound event.
    ///
    /// Fails with `SessionNotFound` when the event belongs to no live session and cannot
    /// start or rebuild one.
    pub async fn handle(&self, event: &InboundEvent) -> Result<()> {
        let Some(session) = self.sessions.get(&event.session_id).await? else {
            return self.handle_without_session(event).await;
        };

        match &event.kind {
            EventKind::Message => self.on_message(session, event).await,
            EventKind::Action { action, .. } => self.on_action(session, *action).await,
        }
    }

    /// Tells the thread that handling `event` failed unexpectedly.
    pub async fn report_failure(&self, event: &InboundEvent, error: &PicpostError) {
        let to = Destination::new(&event.channel, &event.session_id);
        self.notify(&to, &messages::unexpected_failure(error)).await;
    }

    async fn handle_without_session(&self, event: &InboundEvent) -> Result<()> {
        match (&event.kind, &event.attachment) {
            (EventKind::Message, Some(attachment)) => self.start(event, attachment).await,
            (EventKind::Action { action, .. }, _) if action.targets_entry() => {
                let Some(entry_id) = event.payload_entry_id() else {
                    return Err(PicpostError::session_not_found(&event.session_id));
                };
                tracing::warn!(
                    session_id = %event.session_id,
                    entry_id,
                    "[FlowController] session expired, rebuilding from button payload"
                );
                let session =
                    Session::degraded(&event.session_id, &event.channel, self.clock.now(), entry_id);
                self.on_action(session, *action).await
            }
            _ => Err(PicpostError::session_not_found(&event.session_id)),
        }
    }

    async fn start(&self, event: &InboundEvent, attachment: &Attachment) -> Result<()> {
        let to = Destination::new(&event.channel, &event.session_id);
        if let Err(e) = validate_image_media_type(&attachment.media_type) {
            tracing::info!(
                session_id = %event.session_id,
                media_type = %attachment.media_type,
                "[FlowController] rejected non-image attachment"
            );
            self.notify(&to, &messages::unsupported_attachment(&e)).await;
            return Ok(());
        }

        let session = Session::start(
            &event.session_id,
            &event.channel,
            self.clock.now(),
            PendingImage {
                source_ref: attachment.source_ref.clone(),
                display_name: attachment.display_name.clone(),
                media_type: attachment.media_type.clone(),
            },
        );
        self.save(&session).await?;
        self.notify(&to, &messages::ask_date()).await;
        Ok(())
    }

    async fn on_message(&self, session: Session, event: &InboundEvent) -> Result<()> {
        let text = event.text.trim();
        if event.attachment.is_some() && text.is_empty() {
            tracing::debug!(
                session_id = %session.id,
                "[FlowController] attachment in an active session, ignoring"
            );
            return Ok(());
        }

        match session.state.clone() {
            SessionState::WaitingDate { pending } => {
                match validate_date(text, self.clock.today()) {
                    Ok(date) => self.accept_date(session, pending, date).await,
                    Err(e) => self.reject(&session, &e).await,
                }
            }
            SessionState::WaitingTitle { pending, date } => {
                self.accept_title(session, pending, date, normalize_title(text))
                    .await
            }
            SessionState::WaitingLink {
                pending,
                date,
                title,
            } => match validate_link(text) {
                Ok(link) => self.post(session, pending, date, title, link).await,
                Err(e) => self.reject(&session, &e).await,
            },
            SessionState::Editing { entry_id, field } => match self.parse_field(field, text) {
                Ok(value) => self.apply_edit(session, entry_id, field, value).await,
                Err(e) => self.reject(&session, &e).await,
            },
            SessionState::Completed { .. } => {
                tracing::debug!(
                    session_id = %session.id,
                    "[FlowController] message after completion, ignoring"
                );
                Ok(())
            }
        }
    }

    async fn on_action(&self, session: Session, action: ActionId) -> Result<()> {
        let to = destination(&session);
        tracing::debug!(
            session_id = %session.id,
            state = session.state.name(),
            action = %action,
            "[FlowController] action"
        );

        match (session.state.clone(), action) {
            (state, ActionId::Cancel) if state.is_waiting() => {
                self.sessions.delete(&session.id).await?;
                tracing::info!(session_id = %session.id, "[FlowController] upload cancelled");
                self.notify(&to, &messages::upload_cancelled()).await;
                Ok(())
            }
            (SessionState::WaitingDate { pending }, ActionId::Today) => {
                let today = CalendarDate::from_naive(self.clock.today());
                self.accept_date(session, pending, today).await
            }
            (SessionState::WaitingTitle { pending, date }, ActionId::SkipTitle) => {
                self.accept_title(session, pending, date, String::new()).await
            }
            (
                SessionState::WaitingLink {
                    pending,
                    date,
                    title,
                },
                ActionId::PostNow | ActionId::SkipLink,
            ) => self.post(session, pending, date, title, None).await,

            (
                SessionState::Editing {
                    entry_id,
                    field: EntryField::Date,
                },
                ActionId::Today,
            ) => {
                let today = CalendarDate::from_naive(self.clock.today());
                self.apply_edit(session, entry_id, EntryField::Date, today.to_entry_format())
                    .await
            }
            (
                SessionState::Editing {
                    entry_id,
                    field: EntryField::Title,
                },
                ActionId::SkipTitle,
            ) => {
                self.apply_edit(session, entry_id, EntryField::Title, String::new())
                    .await
            }
            (
                SessionState::Editing {
                    entry_id,
                    field: EntryField::Link,
                },
                ActionId::SkipLink,
            ) => {
                self.apply_edit(session, entry_id, EntryField::Link, String::new())
                    .await
            }

            (
                SessionState::Completed { entry_id } | SessionState::Editing { entry_id, .. },
                action,
            ) => self.on_entry_action(session, entry_id, action).await,

            (state, action) => {
                tracing::debug!(
                    session_id = %session.id,
                    state = state.name(),
                    action = %action,
                    "[FlowController] action not applicable in this state, ignoring"
                );
                Ok(())
            }
        }
    }

    /// Actions against a posted entry. Any of them abandons an edit in progress.
    async fn on_entry_action(&self, session: Session, entry_id: u64, action: ActionId) -> Result<()> {
        let to = destination(&session);
        let completed = session.with_state(SessionState::Completed { entry_id });

        let reply = match action {
            ActionId::Edit => messages::choose_field(entry_id),
            ActionId::EditField(field) => {
                let editing = completed.with_state(SessionState::Editing { entry_id, field });
                self.save(&editing).await?;
                tracing::info!(
                    session_id = %editing.id,
                    entry_id,
                    field = %field,
                    "[FlowController] editing"
                );
                self.notify(&to, &messages::ask_field(field, entry_id)).await;
                return Ok(());
            }
            ActionId::Cancel => messages::edit_cancelled(entry_id),
            ActionId::Delete => messages::confirm_delete(entry_id),
            ActionId::CancelDelete => messages::delete_cancelled(entry_id),
            ActionId::ConfirmDelete => return self.delete(completed, entry_id).await,
            other => {
                tracing::debug!(
                    session_id = %completed.id,
                    action = %other,
                    "[FlowController] wizard action on a posted entry, ignoring"
                );
                return Ok(());
            }
        };

        self.save(&completed).await?;
        self.notify(&to, &reply).await;
        Ok(())
    }

    async fn accept_date(
        &self,
        session: Session,
        pending: PendingImage,
        date: CalendarDate,
    ) -> Result<()> {
        let session = session.with_state(SessionState::WaitingTitle { pending, date });
        self.save(&session).await?;
        self.notify(&destination(&session), &messages::ask_title(&date))
            .await;
        Ok(())
    }

    async fn accept_title(
        &self,
        session: Session,
        pending: PendingImage,
        date: CalendarDate,
        title: String,
    ) -> Result<()> {
        let reply = messages::ask_link(&title);
        let session = session.with_state(SessionState::WaitingLink {
            pending,
            date,
            title,
        });
        self.save(&session).await?;
        self.notify(&destination(&session), &reply).await;
        Ok(())
    }

    /// Downloads the image and commits it with its new entry.
    async fn post(
        &self,
        session: Session,
        pending: PendingImage,
        date: CalendarDate,
        title: String,
        link: Option<String>,
    ) -> Result<()> {
        let to = destination(&session);
        let bytes = match self.fetcher.fetch(&pending.source_ref).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    session_id = %session.id,
                    error = %e,
                    "[FlowController] attachment download failed"
                );
                self.notify(&to, &messages::download_failed()).await;
                return Ok(());
            }
        };

        let image = self.engine.layout().image_path_for(
            session.created_at,
            &session.id,
            &pending.display_name,
            &pending.media_type,
        );
        let change = EntryChange::Create {
            image,
            bytes,
            date: date.to_entry_format(),
            title,
            link: link.unwrap_or_default(),
        };

        let outcome = match self.engine.apply(&change).await {
            Ok(outcome) => outcome,
            Err(PicpostError::RemoteHost(e)) => {
                tracing::error!(session_id = %session.id, step = %e.step, error = %e, "[FlowController] upload failed");
                self.notify(&to, &messages::commit_failed(&e)).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let committed = outcome.is_committed();
        let Some(entry) = outcome.entry else {
            return Err(PicpostError::internal("create produced no entry"));
        };

        tracing::info!(
            session_id = %session.id,
            entry_id = entry.id,
            committed,
            "[FlowController] posted"
        );
        let headline = if committed {
            "Posted."
        } else {
            "Already posted."
        };
        let session = session.with_state(SessionState::Completed { entry_id: entry.id });
        self.finish(&session, &entry, headline).await
    }

    async fn apply_edit(
        &self,
        session: Session,
        entry_id: u64,
        field: EntryField,
        value: String,
    ) -> Result<()> {
        let to = destination(&session);
        let change = EntryChange::Update {
            id: entry_id,
            patch: EntryPatch::new(field, value),
        };

        let outcome = match self.engine.apply(&change).await {
            Ok(outcome) => outcome,
            Err(PicpostError::RemoteHost(e)) => {
                tracing::error!(session_id = %session.id, entry_id, step = %e.step, error = %e, "[FlowController] edit failed");
                self.notify(&to, &messages::commit_failed(&e)).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let Some(entry) = outcome.entry else {
            tracing::warn!(session_id = %session.id, entry_id, "[FlowController] edited entry no longer exists");
            self.sessions.delete(&session.id).await?;
            self.notify(&to, &messages::entry_missing(entry_id)).await;
            return Ok(());
        };

        tracing::info!(session_id = %session.id, entry_id, field = %field, "[FlowController] entry updated");
        let session = session.with_state(SessionState::Completed { entry_id });
        self.finish(&session, &entry, &format!("Updated {field}.")).await
    }

    async fn delete(&self, session: Session, entry_id: u64) -> Result<()> {
        let to = destination(&session);
        let outcome = match self.engine.apply(&EntryChange::Delete { id: entry_id }).await {
            Ok(outcome) => outcome,
            Err(PicpostError::RemoteHost(e)) => {
                tracing::error!(session_id = %session.id, entry_id, step = %e.step, error = %e, "[FlowController] delete failed");
                self.notify(&to, &messages::commit_failed(&e)).await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.sessions.delete(&session.id).await {
            tracing::warn!(session_id = %session.id, error = %e, "[FlowController] failed to drop session after delete");
        }
        tracing::info!(session_id = %session.id, entry_id, "[FlowController] entry deleted");
        self.notify(&to, &messages::deleted(entry_id, outcome.is_committed()))
            .await;
        Ok(())
    }

    /// Persists the COMPLETED session and sends the summary.
    ///
    /// The data change already happened, so a store failure only degrades the reply.
    async fn finish(&self, session: &Session, entry: &Entry, headline: &str) -> Result<()> {
        let reply = match self.save(session).await {
            Ok(()) => messages::summary(headline, entry),
            Err(e) => {
                tracing::error!(
                    session_id = %session.id,
                    entry_id = entry.id,
                    error = %e,
                    "[FlowController] change committed but session could not be saved"
                );
                messages::saved_without_session(entry)
            }
        };
        self.notify(&destination(session), &reply).await;
        Ok(())
    }

    async fn reject(&self, session: &Session, error: &ValidationError) -> Result<()> {
        tracing::info!(
            session_id = %session.id,
            state = session.state.name(),
            error = %error,
            "[FlowController] invalid input"
        );
        self.notify(&destination(session), &messages::invalid_input(error))
            .await;
        Ok(())
    }

    fn parse_field(&self, field: EntryField, text: &str) -> std::result::Result<String, ValidationError> {
        match field {
            EntryField::Date => validate_date(text, self.clock.today()).map(|d| d.to_entry_format()),
            EntryField::Title => Ok(normalize_title(text)),
            EntryField::Link => validate_link(text).map(Option::unwrap_or_default),
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let ttl = self.ttl.for_state(&session.state);
        self.sessions.put(session, ttl).await?;
        tracing::debug!(
            session_id = %session.id,
            state = session.state.name(),
            ttl_secs = ttl.as_secs(),
            "[FlowController] session saved"
        );
        Ok(())
    }

    /// Sends `message`, with one plain-text fallback. Delivery failures are never propagated.
    async fn notify(&self, to: &Destination, message: &OutboundMessage) {
        let Err(e) = self.notifier.send(to, message).await else {
            return;
        };
        tracing::warn!(thread = %to.thread, error = %e, "[FlowController] message failed, trying plain text");

        let fallback = OutboundMessage::text(message.plain_text());
        if let Err(e) = self.notifier.send(to, &fallback).await {
            tracing::error!(thread = %to.thread, error = %e, "[FlowController] plain-text fallback failed, giving up");
        }
    }
}

fn destination(session: &Session) -> Destination {
    Destination::new(&session.channel, &session.id)
}
