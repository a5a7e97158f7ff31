use std::collections::HashSet;

use crate::domain::{ResultPage, SearchFilters, VideoItem};

/// How a result stream is sourced from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamMode {
    Trending,
    Search,
}

/// The `(mode, query, filters)` tuple that scopes one cache/pagination
/// lifecycle. Any field change is a new identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamIdentity {
    pub mode: StreamMode,
    pub query: String,
    pub filters: SearchFilters,
}

impl StreamIdentity {
    pub fn trending(region: impl Into<String>) -> Self {
        Self {
            mode: StreamMode::Trending,
            query: String::new(),
            filters: SearchFilters::new(region),
        }
    }

    pub fn search(query: impl Into<String>, filters: SearchFilters) -> Self {
        Self {
            mode: StreamMode::Search,
            query: query.into(),
            filters,
        }
    }
}

/// Tagged stream phase; one canonical state machine instead of a bag of
/// booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StreamPhase {
    Empty,
    Loading { seq: u64 },
    Ready { cursor: String },
    Exhausted,
}

/// Handle for one in-flight fetch. Carries enough identity to decide, at
/// commit time, whether the response still belongs to the current stream.
#[derive(Debug, Clone)]
pub struct FetchTicket {
    generation: u64,
    seq: u64,
    identity: StreamIdentity,
    cursor: Option<String>,
}

impl FetchTicket {
    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    /// Cursor to pass to the provider; `None` for the first page.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }
}

/// Outcome of committing a response against the current stream state.
#[derive(Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Results merged; `appended` is the number of new unique items.
    Committed { appended: usize },
    /// The response belonged to a superseded identity or an out-of-order
    /// request and was discarded. Never surfaced to the user.
    Stale,
}

/// Ordered, append-only result cache for one stream identity.
///
/// Responses are committed through the ticket protocol: `start`/`request_more`
/// hand out a [`FetchTicket`], the caller performs the network fetch, and
/// `commit`/`fail` resolve it. Tickets from an older generation (identity or
/// credential change) or an older sequence number are discarded at commit.
#[derive(Debug)]
pub struct ResultStream {
    identity: Option<StreamIdentity>,
    phase: StreamPhase,
    items: Vec<VideoItem>,
    seen: HashSet<String>,
    generation: u64,
    next_seq: u64,
}

impl ResultStream {
    pub fn new() -> Self {
        Self {
            identity: None,
            phase: StreamPhase::Empty,
            items: Vec::new(),
            seen: HashSet::new(),
            generation: 0,
            next_seq: 0,
        }
    }

    /// Begin a fresh stream for `identity`, discarding the current cache.
    /// Always a replace, never a merge; re-running the same identity is a
    /// refresh.
    pub fn start(&mut self, identity: StreamIdentity) -> FetchTicket {
        self.generation += 1;
        self.next_seq = 0;
        self.items.clear();
        self.seen.clear();
        self.identity = Some(identity.clone());

        let seq = self.take_seq();
        self.phase = StreamPhase::Loading { seq };

        FetchTicket {
            generation: self.generation,
            seq,
            identity,
            cursor: None,
        }
    }

    /// Ticket for the next page, or `None` when a fetch is already in
    /// flight, the stream is exhausted, or nothing has been started.
    pub fn request_more(&mut self) -> Option<FetchTicket> {
        let identity = self.identity.clone()?;
        let cursor = match &self.phase {
            StreamPhase::Ready { cursor } => cursor.clone(),
            StreamPhase::Loading { .. } | StreamPhase::Exhausted | StreamPhase::Empty => {
                return None
            }
        };

        let seq = self.take_seq();
        self.phase = StreamPhase::Loading { seq };

        Some(FetchTicket {
            generation: self.generation,
            seq,
            identity,
            cursor: Some(cursor),
        })
    }

    /// Merge a provider response. Items are appended in provider order,
    /// de-duplicated by id with first-seen position kept.
    pub fn commit(&mut self, ticket: &FetchTicket, page: ResultPage) -> CommitOutcome {
        if !self.ticket_is_current(ticket) {
            tracing::debug!(
                ticket_generation = ticket.generation,
                current_generation = self.generation,
                seq = ticket.seq,
                "Discarding stale result page"
            );
            return CommitOutcome::Stale;
        }

        let mut appended = 0;
        for item in page.items {
            if self.seen.insert(item.id.clone()) {
                self.items.push(item);
                appended += 1;
            }
        }

        self.phase = match page.next_cursor {
            Some(cursor) => StreamPhase::Ready { cursor },
            None => StreamPhase::Exhausted,
        };

        CommitOutcome::Committed { appended }
    }

    /// Resolve a failed fetch: prior cache stays intact and the stream
    /// returns to where it was before the ticket was issued. Stale tickets
    /// are ignored.
    pub fn fail(&mut self, ticket: &FetchTicket) {
        if !self.ticket_is_current(ticket) {
            return;
        }

        self.phase = match &ticket.cursor {
            Some(cursor) => StreamPhase::Ready {
                cursor: cursor.clone(),
            },
            None => StreamPhase::Empty,
        };
    }

    /// Drop everything, including the identity. Used for credential-epoch
    /// invalidation and explicit clears; outstanding tickets go stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.next_seq = 0;
        self.identity = None;
        self.phase = StreamPhase::Empty;
        self.items.clear();
        self.seen.clear();
    }

    pub fn items(&self) -> &[VideoItem] {
        &self.items
    }

    pub fn identity(&self) -> Option<&StreamIdentity> {
        self.identity.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, StreamPhase::Loading { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.phase, StreamPhase::Exhausted)
    }

    /// Cursor for the next page, when one is known.
    pub fn cursor(&self) -> Option<&str> {
        match &self.phase {
            StreamPhase::Ready { cursor } => Some(cursor),
            _ => None,
        }
    }

    fn ticket_is_current(&self, ticket: &FetchTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        // Pages must land in request order; anything but the in-flight
        // sequence number is out of order.
        matches!(self.phase, StreamPhase::Loading { seq } if seq == ticket.seq)
    }

    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl Default for ResultStream {
    fn default() -> Self {
        Self::new()
    }
}
