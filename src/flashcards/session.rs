//! The interactive card queue.
//!
//! [`SessionEngine`] is a synchronous state machine. Gestures go in as
//! [`SessionEvent`]s, and what the host should render or persist comes back
//! as [`SessionEffect`]s. Resolving a card is split in two: the engine first
//! asks for an exit animation, and only mutates the queue once the host
//! reports [`SessionEvent::AnimationSettled`]. Nothing else can start while
//! a card is in flight.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use super::card::{FlashcardItem, FlashcardsSessionSummary};
use super::clock::{Clock, SystemClock};
use super::shuffle::{advance_shuffle_seed, shuffle, SeedSource};

pub const TRANSITION_MS: u64 = 320;
pub const POST_TRANSITION_LOCK_MS: u64 = 220;
pub const MOUNT_LOCK_MS: u64 = 200;
pub const RESTART_LOCK_MS: u64 = 260;

pub const SWIPE_THRESHOLD: f64 = 88.0;
pub const SWIPE_MAX: f64 = 180.0;
pub const EXIT_X: f64 = 420.0;

const DRAG_VELOCITY_FACTOR: f64 = 0.08;
const TOUCH_VELOCITY_FACTOR: f64 = 36.0;
const TOUCH_DIRECTION_SLOP: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTransition {
    #[default]
    Idle,
    Discard,
    Correct,
}

impl CardTransition {
    /// -1 for a discard (left), 1 for a confirm (right), 0 at rest.
    pub fn direction(&self) -> i8 {
        match self {
            CardTransition::Idle => 0,
            CardTransition::Discard => -1,
            CardTransition::Correct => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    Flip,
    Discard,
    Confirm,
}

impl SessionKey {
    /// Maps a DOM-style key name; unrelated keys are `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            " " | "Enter" => Some(SessionKey::Flip),
            "ArrowLeft" => Some(SessionKey::Discard),
            "ArrowRight" => Some(SessionKey::Confirm),
            _ => None,
        }
    }
}

/// A single touch point. `timestamp` is in milliseconds on any monotonic
/// scale; only differences are used.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: i64,
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DragStart,
    DragUpdate { offset: f64 },
    DragEnd { offset: f64, velocity: f64 },
    TouchStart(TouchPoint),
    TouchMove(TouchPoint),
    TouchEnd(TouchPoint),
    TouchCancel,
    KeyPress(SessionKey),
    Tap,
    /// the discard button
    Pass,
    /// the confirm button
    Confirm,
    AnimationSettled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEffect {
    Flipped { flipped: bool },
    Offset { x: f64 },
    SpringBack,
    #[serde(rename_all = "camelCase")]
    ExitAnimation {
        card_id: String,
        transition: CardTransition,
        x: f64,
        duration_ms: u64,
    },
    #[serde(rename_all = "camelCase")]
    Committed {
        card_id: String,
        transition: CardTransition,
    },
    Completed { summary: FlashcardsSessionSummary },
}

/// What a released swipe amounts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    Discard,
    Confirm,
    /// a confirming swipe on a card whose answer is still hidden
    Reveal,
    Rest,
}

pub fn interpret_swipe(projected: f64, flipped: bool) -> SwipeOutcome {
    if projected <= -SWIPE_THRESHOLD {
        SwipeOutcome::Discard
    } else if projected >= SWIPE_THRESHOLD {
        if flipped {
            SwipeOutcome::Confirm
        } else {
            SwipeOutcome::Reveal
        }
    } else {
        SwipeOutcome::Rest
    }
}

#[derive(Debug, Clone, Copy)]
struct TouchTracking {
    id: i64,
    start_x: f64,
    start_y: f64,
    last_x: f64,
    last_ts: f64,
    horizontal: bool,
}

#[derive(Debug, Clone)]
struct PendingTransition {
    card_id: String,
    transition: CardTransition,
}

pub struct SessionEngine<C: Clock = SystemClock> {
    clock: C,
    cards: Vec<FlashcardItem>,
    index_by_id: HashMap<String, usize>,
    seed: u32,
    queue: VecDeque<String>,
    confirm_ids: Vec<String>,
    pass_ids: Vec<String>,
    flipped: bool,
    offset: f64,
    dragging: bool,
    touch: Option<TouchTracking>,
    pending: Option<PendingTransition>,
    locked_until: u64,
    completion_reported: bool,
}

impl<C: Clock> SessionEngine<C> {
    /// Shuffles `cards` with a seed from `seeds` and locks input briefly.
    pub fn new(cards: Vec<FlashcardItem>, clock: C, seeds: &dyn SeedSource) -> Self {
        let index_by_id = cards
            .iter()
            .enumerate()
            .map(|(index, card)| (card.id.clone(), index))
            .collect();
        let ids: Vec<String> = cards.iter().map(|card| card.id.clone()).collect();
        let seed = seeds.seed_for(&ids);

        let mut engine = Self {
            clock,
            cards,
            index_by_id,
            seed,
            queue: VecDeque::new(),
            confirm_ids: Vec::new(),
            pass_ids: Vec::new(),
            flipped: false,
            offset: 0.0,
            dragging: false,
            touch: None,
            pending: None,
            locked_until: 0,
            completion_reported: false,
        };
        engine.reset(MOUNT_LOCK_MS);
        log::debug!("session started with {} cards, seed {}", engine.total(), seed);
        engine
    }

    fn reset(&mut self, lock_ms: u64) {
        let ids: Vec<String> = self.cards.iter().map(|card| card.id.clone()).collect();
        self.queue = shuffle(&ids, self.seed).into();
        self.confirm_ids.clear();
        self.pass_ids.clear();
        self.flipped = false;
        self.offset = 0.0;
        self.dragging = false;
        self.touch = None;
        self.pending = None;
        self.completion_reported = false;
        self.lock_interaction(lock_ms);
    }

    /// Reshuffles with the next seed and starts over.
    pub fn restart(&mut self) {
        self.seed = advance_shuffle_seed(self.seed);
        self.reset(RESTART_LOCK_MS);
        log::debug!("session restarted, seed {}", self.seed);
    }

    /// The results so far. The session is left untouched.
    pub fn view_report(&self) -> FlashcardsSessionSummary {
        self.summary()
    }

    pub fn summary(&self) -> FlashcardsSessionSummary {
        FlashcardsSessionSummary::new(self.confirm_ids.clone(), self.pass_ids.clone())
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn total(&self) -> usize {
        self.cards.len()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirm_ids.len()
    }

    pub fn passed_count(&self) -> usize {
        self.pass_ids.len()
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn transition(&self) -> CardTransition {
        self.pending
            .as_ref()
            .map(|pending| pending.transition)
            .unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        self.total() > 0 && self.queue.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.clock.now_ms() < self.locked_until
    }

    pub fn queue(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(String::as_str)
    }

    fn card(&self, id: &str) -> Option<&FlashcardItem> {
        self.index_by_id.get(id).map(|&index| &self.cards[index])
    }

    pub fn current_card(&self) -> Option<&FlashcardItem> {
        self.queue.front().and_then(|id| self.card(id))
    }

    /// The two cards stacked behind the current one.
    pub fn previews(&self) -> Vec<&FlashcardItem> {
        self.queue
            .iter()
            .skip(1)
            .take(2)
            .filter_map(|id| self.card(id))
            .collect()
    }

    fn lock_interaction(&mut self, duration_ms: u64) {
        self.locked_until = self.clock.now_ms() + duration_ms;
    }

    fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        let mut effects = Vec::new();

        match event {
            SessionEvent::DragStart => {
                if !self.in_flight() {
                    self.dragging = true;
                }
            }
            SessionEvent::DragUpdate { offset } => {
                if self.current_card().is_some() && !self.in_flight() {
                    self.offset = offset.clamp(-SWIPE_MAX, SWIPE_MAX);
                    effects.push(SessionEffect::Offset { x: self.offset });
                }
            }
            SessionEvent::DragEnd { offset, velocity } => {
                let touch_locked = self.touch.is_some_and(|touch| touch.horizontal);
                if !touch_locked && self.current_card().is_some() && !self.in_flight() {
                    self.dragging = false;
                    self.release(offset + velocity * DRAG_VELOCITY_FACTOR, &mut effects);
                }
            }
            SessionEvent::TouchStart(point) => self.touch_start(point),
            SessionEvent::TouchMove(point) => self.touch_move(point, &mut effects),
            SessionEvent::TouchEnd(point) => self.touch_end(point, &mut effects),
            SessionEvent::TouchCancel => {
                if self.touch.take().is_some() {
                    self.dragging = false;
                    self.spring_back(&mut effects);
                }
            }
            SessionEvent::KeyPress(key) => self.key_press(key, &mut effects),
            SessionEvent::Tap => {
                let touch_locked = self.touch.is_some_and(|touch| touch.horizontal);
                if !self.dragging && !touch_locked && self.accepts_input() {
                    self.set_flipped(!self.flipped, &mut effects);
                }
            }
            SessionEvent::Pass => self.start_transition(CardTransition::Discard, false, &mut effects),
            SessionEvent::Confirm => self.start_transition(CardTransition::Correct, false, &mut effects),
            SessionEvent::AnimationSettled => self.commit(&mut effects),
        }

        effects
    }

    /// Keys, taps and buttons need a card, no transition in flight and no
    /// interaction lock.
    fn accepts_input(&self) -> bool {
        self.current_card().is_some() && !self.in_flight() && !self.is_locked()
    }

    fn key_press(&mut self, key: SessionKey, effects: &mut Vec<SessionEffect>) {
        if !self.accepts_input() {
            return;
        }

        match key {
            SessionKey::Flip => self.set_flipped(!self.flipped, effects),
            SessionKey::Discard => self.start_transition(CardTransition::Discard, false, effects),
            SessionKey::Confirm => self.start_transition(CardTransition::Correct, false, effects),
        }
    }

    fn set_flipped(&mut self, flipped: bool, effects: &mut Vec<SessionEffect>) {
        self.flipped = flipped;
        effects.push(SessionEffect::Flipped { flipped });
    }

    fn spring_back(&mut self, effects: &mut Vec<SessionEffect>) {
        self.offset = 0.0;
        effects.push(SessionEffect::SpringBack);
    }

    fn release(&mut self, projected: f64, effects: &mut Vec<SessionEffect>) {
        match interpret_swipe(projected, self.flipped) {
            SwipeOutcome::Discard => self.start_transition(CardTransition::Discard, true, effects),
            SwipeOutcome::Confirm => self.start_transition(CardTransition::Correct, true, effects),
            SwipeOutcome::Reveal => {
                self.spring_back(effects);
                self.set_flipped(true, effects);
            }
            SwipeOutcome::Rest => self.spring_back(effects),
        }
    }

    fn start_transition(
        &mut self,
        transition: CardTransition,
        ignore_lock: bool,
        effects: &mut Vec<SessionEffect>,
    ) {
        if self.in_flight() || (!ignore_lock && self.is_locked()) {
            return;
        }
        let Some(card_id) = self.queue.front().cloned() else {
            return;
        };
        if transition == CardTransition::Idle || (transition == CardTransition::Correct && !self.flipped) {
            return;
        }

        self.dragging = false;
        self.pending = Some(PendingTransition {
            card_id: card_id.clone(),
            transition,
        });
        effects.push(SessionEffect::ExitAnimation {
            card_id,
            transition,
            x: f64::from(transition.direction()) * EXIT_X,
            duration_ms: TRANSITION_MS,
        });
    }

    fn commit(&mut self, effects: &mut Vec<SessionEffect>) {
        let Some(PendingTransition { card_id, transition }) = self.pending.take() else {
            return;
        };

        match transition {
            CardTransition::Discard => self.pass_ids.push(card_id.clone()),
            CardTransition::Correct => self.confirm_ids.push(card_id.clone()),
            CardTransition::Idle => {}
        }
        if self.queue.front() == Some(&card_id) {
            self.queue.pop_front();
        }

        self.flipped = false;
        self.offset = 0.0;
        self.dragging = false;
        self.lock_interaction(POST_TRANSITION_LOCK_MS);
        effects.push(SessionEffect::Committed { card_id, transition });

        if !self.completion_reported
            && self.is_complete()
            && self.confirm_ids.len() + self.pass_ids.len() >= self.total()
        {
            self.completion_reported = true;
            log::debug!(
                "session complete: {} confirmed, {} passed",
                self.confirm_ids.len(),
                self.pass_ids.len()
            );
            effects.push(SessionEffect::Completed {
                summary: self.summary(),
            });
        }
    }

    fn touch_start(&mut self, point: TouchPoint) {
        if self.current_card().is_none() || self.in_flight() {
            return;
        }

        self.touch = Some(TouchTracking {
            id: point.id,
            start_x: point.x,
            start_y: point.y,
            last_x: point.x,
            last_ts: point.timestamp,
            horizontal: false,
        });
    }

    fn touch_move(&mut self, point: TouchPoint, effects: &mut Vec<SessionEffect>) {
        if self.in_flight() {
            return;
        }
        let Some(touch) = self.touch.as_mut().filter(|touch| touch.id == point.id) else {
            return;
        };

        let dx = point.x - touch.start_x;
        let dy = point.y - touch.start_y;
        if !touch.horizontal {
            if dx.abs() < TOUCH_DIRECTION_SLOP {
                return;
            }
            if dy.abs() > dx.abs() {
                // vertical scroll, let it through
                self.touch = None;
                return;
            }
            touch.horizontal = true;
        }

        touch.last_x = point.x;
        touch.last_ts = point.timestamp;
        self.dragging = true;
        self.offset = dx.clamp(-SWIPE_MAX, SWIPE_MAX);
        effects.push(SessionEffect::Offset { x: self.offset });
    }

    fn touch_end(&mut self, point: TouchPoint, effects: &mut Vec<SessionEffect>) {
        let Some(touch) = self.touch.take() else {
            return;
        };
        if touch.id != point.id || !touch.horizontal {
            return;
        }

        self.dragging = false;
        let dx = point.x - touch.start_x;
        let dt = (point.timestamp - touch.last_ts).max(1.0);
        let velocity = (point.x - touch.last_x) / dt;
        self.release(dx + velocity * TOUCH_VELOCITY_FACTOR, effects);
    }
}
