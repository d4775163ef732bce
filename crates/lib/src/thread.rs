//! Message thread controller: history, live arrivals and older pages for one open session.
//!
//! Every `open` starts a new scope. The channel of that scope tags its events with the
//! scope id; events from a previous scope are dropped in `apply`. History and live
//! arrivals are merged by `documentId`, so a message seen through both paths appears once.

use crate::api::{ApiError, MessagesApi};
use crate::identity::AuthContext;
use crate::models::{Message, Pagination, SessionId};
use crate::notify::Notifier;
use crate::realtime::{ChannelError, ChannelEvent, RealtimeChannel, ScopeId, ScopedEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Outcome of merging one live arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    Prepended,
    /// Already listed; replaced in place at this index.
    Replaced(usize),
}

/// Newest-first message list with merge-by-id semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageList {
    items: Vec<Message>,
}

impl MessageList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.position(document_id).is_some()
    }

    fn position(&self, document_id: &str) -> Option<usize> {
        self.items.iter().position(|m| m.document_id == document_id)
    }

    /// Install the first history page. Arrivals already listed and absent from the page stay in front.
    pub fn replace_with_history(&mut self, page: Vec<Message>) {
        let mut merged: Vec<Message> = self
            .items
            .drain(..)
            .filter(|m| !page.iter().any(|p| p.document_id == m.document_id))
            .collect();
        merged.extend(page);
        self.items = merged;
    }

    /// Append an older page, skipping records already listed. Returns how many were added.
    pub fn append_older(&mut self, page: Vec<Message>) -> usize {
        let before = self.items.len();
        for m in page {
            if !self.contains(&m.document_id) {
                self.items.push(m);
            }
        }
        self.items.len() - before
    }

    pub fn apply_arrival(&mut self, message: Message) -> Arrival {
        match self.position(&message.document_id) {
            Some(i) => {
                self.items[i] = message;
                Arrival::Replaced(i)
            }
            None => {
                self.items.insert(0, message);
                Arrival::Prepended
            }
        }
    }
}

/// What changed after applying a channel event.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadUpdate {
    Arrived(Message),
    Replaced(Message),
    ChannelClosed(String),
}

pub struct ThreadView {
    messages: MessagesApi,
    auth: Arc<AuthContext>,
    notifier: Notifier,
    realtime_url: String,
    page_size: u32,
    session_id: Option<SessionId>,
    scope: ScopeId,
    list: MessageList,
    pagination: Option<Pagination>,
    loading: watch::Sender<bool>,
    channel: Option<RealtimeChannel>,
    events_tx: mpsc::Sender<ScopedEvent>,
    events_rx: mpsc::Receiver<ScopedEvent>,
}

impl ThreadView {
    pub fn new(
        messages: MessagesApi,
        auth: Arc<AuthContext>,
        notifier: Notifier,
        realtime_url: impl Into<String>,
        page_size: u32,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            messages,
            auth,
            notifier,
            realtime_url: realtime_url.into(),
            page_size: page_size.max(1),
            session_id: None,
            scope: 0,
            list: MessageList::new(),
            pagination: None,
            loading: watch::channel(false).0,
            channel: None,
            events_tx,
            events_rx,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn messages(&self) -> &[Message] {
        self.list.as_slice()
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Loading flag as a stream: true while a history fetch is in flight.
    pub fn loading_updates(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    /// True while the channel of the current scope is connected.
    pub fn is_live(&self) -> bool {
        self.channel.as_ref().is_some_and(RealtimeChannel::is_open)
    }

    pub fn has_older(&self) -> bool {
        self.pagination.is_some_and(|p| p.has_next())
    }

    /// Switch to `session_id`: release the previous scope, then load page 1 and open the channel concurrently.
    /// History failures emit an error notice and leave the list empty; channel failures are logged.
    pub async fn open(&mut self, session_id: &str) {
        self.release().await;
        self.scope += 1;
        let scope = self.scope;
        self.session_id = Some(session_id.to_string());
        log::debug!("opening thread {} (scope {})", session_id, scope);

        self.loading.send_replace(true);
        let token = self.auth.token();
        let (history, channel) = tokio::join!(
            self.messages
                .list_by_session(session_id, crate::api::DEFAULT_PAGE, self.page_size),
            RealtimeChannel::open(
                &self.realtime_url,
                token.as_deref(),
                session_id,
                scope,
                self.events_tx.clone(),
            ),
        );
        self.loading.send_replace(false);

        match history {
            Ok(page) => {
                self.pagination = page.pagination;
                self.list.replace_with_history(page.items);
            }
            Err(e) => self.report(&e),
        }
        match channel {
            Ok(ch) => self.channel = Some(ch),
            Err(e) => log::warn!("real-time channel for session {} unavailable: {}", session_id, e),
        }
    }

    /// Next event from any channel this view opened. Stale events are returned too; pass them to `apply`.
    pub async fn next_event(&mut self) -> Option<ScopedEvent> {
        self.events_rx.recv().await
    }

    /// Merge one channel event into the thread. Returns None for events of a closed scope.
    pub fn apply(&mut self, event: ScopedEvent) -> Option<ThreadUpdate> {
        if event.scope != self.scope {
            log::debug!(
                "discarding event of scope {} (current {})",
                event.scope,
                self.scope
            );
            return None;
        }
        match event.event {
            ChannelEvent::Received(message) => {
                if let (Some(msg_session), Some(current)) =
                    (message.session_id(), self.session_id.as_deref())
                {
                    if msg_session != current {
                        log::debug!("discarding message for session {}", msg_session);
                        return None;
                    }
                }
                match self.list.apply_arrival(message.clone()) {
                    Arrival::Prepended => Some(ThreadUpdate::Arrived(message)),
                    Arrival::Replaced(_) => Some(ThreadUpdate::Replaced(message)),
                }
            }
            ChannelEvent::Closed { reason } => {
                self.channel = None;
                Some(ThreadUpdate::ChannelClosed(reason))
            }
        }
    }

    /// Post `text` to the open session. Blank input is ignored. The message is listed once the server rebroadcasts it.
    pub async fn send(&self, text: &str) -> Result<(), ChannelError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }
        match &self.channel {
            Some(ch) => ch.send_message(text).await,
            None => Err(ChannelError::Closed),
        }
    }

    /// Fetch the next older page and append unseen records. Returns how many were added.
    pub async fn load_older(&mut self) -> Result<usize, ApiError> {
        let (Some(session_id), Some(p)) = (self.session_id.clone(), self.pagination) else {
            return Ok(0);
        };
        if !p.has_next() {
            return Ok(0);
        }
        self.loading.send_replace(true);
        let res = self
            .messages
            .list_by_session(&session_id, p.page + 1, self.page_size)
            .await;
        self.loading.send_replace(false);
        match res {
            Ok(page) => {
                if page.pagination.is_some() {
                    self.pagination = page.pagination;
                }
                Ok(self.list.append_older(page.items))
            }
            Err(e) => {
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Leave the current session: close its channel and forget its messages.
    pub async fn close(&mut self) {
        self.release().await;
        self.scope += 1;
        self.session_id = None;
    }

    async fn release(&mut self) {
        if let Some(ch) = self.channel.take() {
            ch.close().await;
        }
        let mut stale = 0;
        while self.events_rx.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            log::debug!("dropped {} undelivered events of scope {}", stale, self.scope);
        }
        self.list.clear();
        self.pagination = None;
    }

    fn report(&self, e: &ApiError) {
        self.notifier.error(e.message.clone());
    }
}
