//! Render queue implementation
//!
//! Drives one batch of candidate pages at a time. A newer batch replaces the
//! pending remainder of the older one; renders the older batch already started
//! keep running and are simply left alone by the newer batch.

use crate::priority::{Candidate, RenderPriority};
use crate::renderable::Renderable;
use std::collections::VecDeque;
use viewer_core::RenderState;

/// Render queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Batches scheduled
    pub batches: u64,

    /// Batches replaced before all their candidates were processed
    pub batches_superseded: u64,

    /// Renders started
    pub renders_started: u64,

    /// Paused renders resumed
    pub renders_resumed: u64,

    /// Candidates skipped because they were already finished
    pub skipped: u64,

    /// Candidates whose transition failed
    pub failures: u64,
}

/// Something the queue did while advancing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent<E> {
    /// Render started; the queue now waits for it to settle
    Started { page: u32, priority: RenderPriority },

    /// Paused render continued
    Resumed { page: u32 },

    /// Page already rendering, left alone
    InFlight { page: u32 },

    /// Page already finished
    Skipped { page: u32 },

    /// The render the queue was waiting on settled
    Settled { page: u32 },

    /// Candidate refers to a page that does not exist
    Missing { page: u32 },

    /// Transition refused; processing continued with the next candidate
    Failed { page: u32, error: E },
}

/// Sequential render queue
///
/// Holds the pending candidates of the latest batch, the render it is waiting
/// on and the advisory "highest priority page". Priority is bookkeeping only:
/// an in-flight render is never preempted.
pub struct RenderQueue<P: Renderable> {
    pending: VecDeque<Candidate>,
    waiting: Option<(u32, P::Ticket)>,
    highest_priority_page: Option<u32>,
    stats: SchedulerStats,
}

impl<P: Renderable> RenderQueue<P> {
    /// Create an idle queue
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            waiting: None,
            highest_priority_page: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Replace the pending batch with `visible` followed by `pre_render`
    ///
    /// The queue stops waiting on any render from the previous batch; that
    /// render keeps running.
    pub fn schedule(&mut self, visible: &[u32], pre_render: &[u32]) {
        if !self.is_idle() {
            self.stats.batches_superseded += 1;
        }
        self.stats.batches += 1;

        self.waiting = None;
        self.pending = visible
            .iter()
            .copied()
            .map(Candidate::visible)
            .chain(pre_render.iter().copied().map(Candidate::pre_render))
            .collect();

        tracing::debug!(?visible, ?pre_render, "scheduled render batch");
    }

    /// Process candidates until one starts rendering or the batch is exhausted
    ///
    /// Call again whenever page renders make progress. Errors are reported
    /// per candidate and never stop the batch.
    pub fn advance(&mut self, pages: &mut [P]) -> Vec<QueueEvent<P::Error>> {
        let mut events = Vec::new();

        loop {
            if let Some((id, ticket)) = self.waiting {
                match find_page(pages, id) {
                    Some(page) if !page.is_settled(ticket) => {
                        if page.render_state() == RenderState::Paused {
                            self.resume_page(page, &mut events);
                        }
                        return events;
                    }
                    _ => {
                        self.waiting = None;
                        events.push(QueueEvent::Settled { page: id });
                    }
                }
            }

            let Some(candidate) = self.pending.pop_front() else {
                return events;
            };

            let Some(page) = find_page(pages, candidate.page) else {
                tracing::warn!(page = candidate.page, "render candidate does not exist");
                events.push(QueueEvent::Missing { page: candidate.page });
                continue;
            };

            match page.render_state() {
                RenderState::Finished => {
                    self.stats.skipped += 1;
                    events.push(QueueEvent::Skipped { page: candidate.page });
                }
                RenderState::Paused => {
                    self.resume_page(page, &mut events);
                }
                RenderState::Rendering => {
                    self.highest_priority_page = Some(candidate.page);
                    events.push(QueueEvent::InFlight { page: candidate.page });
                }
                RenderState::Initial => {
                    self.highest_priority_page = Some(candidate.page);

                    match page.start_render() {
                        Ok(ticket) => {
                            self.stats.renders_started += 1;
                            self.waiting = Some((candidate.page, ticket));
                            tracing::debug!(
                                page = candidate.page,
                                priority = ?candidate.priority,
                                ?ticket,
                                "render started"
                            );
                            events.push(QueueEvent::Started {
                                page: candidate.page,
                                priority: candidate.priority,
                            });
                        }
                        Err(error) => {
                            self.stats.failures += 1;
                            tracing::warn!(page = candidate.page, %error, "render could not start");
                            events.push(QueueEvent::Failed { page: candidate.page, error });
                        }
                    }
                }
            }
        }
    }

    fn resume_page(&mut self, page: &mut P, events: &mut Vec<QueueEvent<P::Error>>) {
        let id = page.id();
        self.highest_priority_page = Some(id);

        match page.resume() {
            Ok(()) => {
                self.stats.renders_resumed += 1;
                events.push(QueueEvent::Resumed { page: id });
            }
            Err(error) => {
                self.stats.failures += 1;
                tracing::warn!(page = id, %error, "paused render could not resume");
                events.push(QueueEvent::Failed { page: id, error });
            }
        }
    }

    /// Whether `page` was the last page resumed or started
    pub fn is_highest_priority(&self, page: u32) -> bool {
        self.highest_priority_page == Some(page)
    }

    pub fn highest_priority_page(&self) -> Option<u32> {
        self.highest_priority_page
    }

    /// Page whose render the queue is waiting on
    pub fn waiting_on(&self) -> Option<u32> {
        self.waiting.map(|(page, _)| page)
    }

    /// Candidates not yet processed, in order
    pub fn pending(&self) -> Vec<Candidate> {
        self.pending.iter().copied().collect()
    }

    /// No pending candidates and nothing awaited
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.waiting.is_none()
    }

    /// Drop the pending batch and forget the priority page
    pub fn clear(&mut self) {
        self.pending.clear();
        self.waiting = None;
        self.highest_priority_page = None;
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }
}

impl<P: Renderable> Default for RenderQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Pages are normally stored in page order, so try the direct slot first.
fn find_page<P: Renderable>(pages: &mut [P], id: u32) -> Option<&mut P> {
    let slot = (id as usize).checked_sub(1).filter(|index| *index < pages.len());

    match slot {
        Some(index) if pages[index].id() == id => pages.get_mut(index),
        _ => pages.iter_mut().find(|page| page.id() == id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakePage {
        id: u32,
        state: RenderState,
        generation: u64,
        active: Option<u64>,
        refuse_start: bool,
        starts: u32,
        resumes: u32,
    }

    impl FakePage {
        fn new(id: u32) -> Self {
            Self {
                id,
                state: RenderState::Initial,
                generation: 0,
                active: None,
                refuse_start: false,
                starts: 0,
                resumes: 0,
            }
        }

        fn with_state(id: u32, state: RenderState) -> Self {
            Self { state, ..Self::new(id) }
        }

        fn finish(&mut self) {
            self.state = RenderState::Finished;
            self.active = None;
        }
    }

    impl Renderable for FakePage {
        type Ticket = u64;
        type Error = String;

        fn id(&self) -> u32 {
            self.id
        }

        fn render_state(&self) -> RenderState {
            self.state
        }

        fn start_render(&mut self) -> Result<u64, String> {
            if self.refuse_start {
                return Err(format!("page {} has no source", self.id));
            }
            self.starts += 1;
            self.generation += 1;
            self.active = Some(self.generation);
            self.state = RenderState::Rendering;
            Ok(self.generation)
        }

        fn resume(&mut self) -> Result<(), String> {
            if self.state != RenderState::Paused {
                return Err("not paused".to_owned());
            }
            self.resumes += 1;
            self.state = RenderState::Rendering;
            Ok(())
        }

        fn is_settled(&self, ticket: u64) -> bool {
            self.active != Some(ticket) || !self.state.is_in_flight()
        }
    }

    fn pages(count: u32) -> Vec<FakePage> {
        (1..=count).map(FakePage::new).collect()
    }

    #[test]
    fn test_waits_for_each_render_before_advancing() {
        let mut pages = pages(3);
        let mut queue = RenderQueue::new();
        queue.schedule(&[2, 3], &[1]);

        let events = queue.advance(&mut pages);
        assert_eq!(
            events,
            vec![QueueEvent::Started { page: 2, priority: RenderPriority::Visible }]
        );
        assert_eq!(queue.waiting_on(), Some(2));
        assert!(queue.advance(&mut pages).is_empty());
        assert_eq!(pages[2].state, RenderState::Initial);

        pages[1].finish();
        let events = queue.advance(&mut pages);
        assert_eq!(
            events,
            vec![
                QueueEvent::Settled { page: 2 },
                QueueEvent::Started { page: 3, priority: RenderPriority::Visible },
            ]
        );

        pages[2].finish();
        let events = queue.advance(&mut pages);
        assert_eq!(
            events,
            vec![
                QueueEvent::Settled { page: 3 },
                QueueEvent::Started { page: 1, priority: RenderPriority::PreRender },
            ]
        );

        pages[0].finish();
        queue.advance(&mut pages);
        assert!(queue.is_idle());
        assert_eq!(queue.stats().renders_started, 3);
    }

    #[test]
    fn test_finished_pages_are_skipped() {
        let mut pages = vec![
            FakePage::with_state(1, RenderState::Finished),
            FakePage::new(2),
        ];
        let mut queue = RenderQueue::new();
        queue.schedule(&[1, 2], &[]);

        let events = queue.advance(&mut pages);
        assert_eq!(
            events,
            vec![
                QueueEvent::Skipped { page: 1 },
                QueueEvent::Started { page: 2, priority: RenderPriority::Visible },
            ]
        );
        assert_eq!(pages[0].starts, 0);
    }

    #[test]
    fn test_paused_pages_resume_without_waiting() {
        let mut pages = vec![FakePage::with_state(1, RenderState::Paused), FakePage::new(2)];
        let mut queue = RenderQueue::new();
        queue.schedule(&[1, 2], &[]);

        let events = queue.advance(&mut pages);
        assert_eq!(events[0], QueueEvent::Resumed { page: 1 });
        assert_eq!(events[1], QueueEvent::Started { page: 2, priority: RenderPriority::Visible });
        assert_eq!(pages[0].state, RenderState::Rendering);
        assert_eq!(pages[0].resumes, 1);
    }

    #[test]
    fn test_rendering_pages_are_left_alone() {
        let mut pages = vec![FakePage::with_state(1, RenderState::Rendering), FakePage::new(2)];
        let mut queue = RenderQueue::new();
        queue.schedule(&[1], &[2]);

        let events = queue.advance(&mut pages);
        assert_eq!(events[0], QueueEvent::InFlight { page: 1 });
        assert_eq!(events[1], QueueEvent::Started { page: 2, priority: RenderPriority::PreRender });
        assert_eq!(pages[0].starts, 0);
    }

    #[test]
    fn test_failed_candidate_does_not_halt_batch() {
        let mut pages = pages(2);
        pages[0].refuse_start = true;
        let mut queue = RenderQueue::new();
        queue.schedule(&[1, 2], &[]);

        let events = queue.advance(&mut pages);
        assert_eq!(
            events,
            vec![
                QueueEvent::Failed { page: 1, error: "page 1 has no source".to_owned() },
                QueueEvent::Started { page: 2, priority: RenderPriority::Visible },
            ]
        );
        assert_eq!(queue.stats().failures, 1);
    }

    #[test]
    fn test_missing_candidates_are_reported() {
        let mut pages = pages(1);
        let mut queue = RenderQueue::new();
        queue.schedule(&[7], &[1]);

        let events = queue.advance(&mut pages);
        assert_eq!(events[0], QueueEvent::Missing { page: 7 });
        assert_eq!(events[1], QueueEvent::Started { page: 1, priority: RenderPriority::PreRender });
    }

    #[test]
    fn test_newer_batch_supersedes_older() {
        let mut pages = pages(4);
        let mut queue = RenderQueue::new();
        queue.schedule(&[1], &[2]);
        queue.advance(&mut pages);
        assert_eq!(queue.waiting_on(), Some(1));

        queue.schedule(&[3], &[4]);
        assert_eq!(queue.stats().batches_superseded, 1);

        let events = queue.advance(&mut pages);
        assert_eq!(
            events,
            vec![QueueEvent::Started { page: 3, priority: RenderPriority::Visible }]
        );

        // The older render is still in flight and left alone by the new batch.
        assert_eq!(pages[0].state, RenderState::Rendering);
        assert_eq!(pages[1].starts, 0);
    }

    #[test]
    fn test_superseded_ticket_counts_as_settled() {
        let mut pages = pages(2);
        let mut queue = RenderQueue::new();
        queue.schedule(&[1], &[2]);
        queue.advance(&mut pages);

        // Someone cancelled and restarted page 1 outside the queue.
        pages[0].start_render().expect("restart should succeed");

        let events = queue.advance(&mut pages);
        assert_eq!(events[0], QueueEvent::Settled { page: 1 });
        assert_eq!(events[1], QueueEvent::Started { page: 2, priority: RenderPriority::PreRender });
    }

    #[test]
    fn test_awaited_page_that_paused_is_resumed() {
        let mut pages = pages(1);
        let mut queue = RenderQueue::new();
        queue.schedule(&[1], &[]);
        queue.advance(&mut pages);

        pages[0].state = RenderState::Paused;
        let events = queue.advance(&mut pages);
        assert_eq!(events, vec![QueueEvent::Resumed { page: 1 }]);
        assert_eq!(queue.waiting_on(), Some(1));
    }

    #[test]
    fn test_highest_priority_tracks_latest_activation() {
        let mut pages = vec![FakePage::with_state(1, RenderState::Rendering), FakePage::new(2)];
        let mut queue = RenderQueue::new();
        assert_eq!(queue.highest_priority_page(), None);

        queue.schedule(&[1, 2], &[]);
        queue.advance(&mut pages);
        assert!(queue.is_highest_priority(2));
        assert!(!queue.is_highest_priority(1));

        queue.clear();
        assert!(queue.is_idle());
        assert_eq!(queue.highest_priority_page(), None);
    }

    #[test]
    fn test_lookup_falls_back_when_pages_are_not_dense() {
        let mut pages = vec![FakePage::new(5), FakePage::new(9)];
        let mut queue = RenderQueue::new();
        queue.schedule(&[9], &[]);

        let events = queue.advance(&mut pages);
        assert_eq!(
            events,
            vec![QueueEvent::Started { page: 9, priority: RenderPriority::Visible }]
        );
    }
}
