//! Host session
//!
//! The host session owns the [`Game`] for the lifetime of the process. Every
//! accepted event publishes a fresh snapshot. The two animation gates,
//! `boardAnimation` and `showQuestion.doubleAnimation`, are closed either by
//! the display signalling completion or by an alarm the session arms when
//! the gate opens; whichever comes first wins and the other becomes a no-op.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use enum_map::{Enum, EnumMap};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, instrument};

use crate::{
    Snapshot,
    constants::animation::{BOARD_REVEAL, DOUBLE_REVEAL},
    game::{Event, Game, QuestionState, State},
    publisher::Publisher,
};

/// A state that waits for the display to finish an animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum Gate {
    /// The board reveal
    Board,
    /// The wager reveal
    Double,
}

impl Gate {
    /// The gate held open by a state, if any
    pub fn of(state: State) -> Option<Self> {
        match state {
            State::BoardAnimation => Some(Self::Board),
            State::ShowQuestion(QuestionState::DoubleAnimation) => Some(Self::Double),
            _ => None,
        }
    }

    /// The event that closes the gate
    pub fn event(self) -> Event {
        match self {
            Self::Board => Event::AnimationComplete,
            Self::Double => Event::DoubleAnimDone,
        }
    }
}

/// Alarm durations of the animation gates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How long the board reveal lasts
    pub board_animation: Duration,
    /// How long the wager reveal lasts
    pub double_animation: Duration,
    /// Whether the session closes gates itself when the alarm rings
    pub auto_advance: bool,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            board_animation: BOARD_REVEAL,
            double_animation: DOUBLE_REVEAL,
            auto_advance: true,
        }
    }
}

impl Timings {
    fn of(&self, gate: Gate) -> Duration {
        match gate {
            Gate::Board => self.board_animation,
            Gate::Double => self.double_animation,
        }
    }
}

/// Result of sending an event to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the game accepted the event
    pub accepted: bool,
    /// The state after the event
    pub state: State,
}

#[derive(Debug)]
struct Inner {
    game: Game,
    alarms: EnumMap<Gate, Option<JoinHandle<()>>>,
}

/// The single game of the process and its publisher
#[derive(Debug)]
pub struct Host {
    inner: Mutex<Inner>,
    publisher: Arc<Publisher>,
    timings: Timings,
}

impl Host {
    /// Starts a session and publishes its first snapshot
    ///
    /// # Arguments
    ///
    /// * `game` - The game to drive
    /// * `publisher` - Where snapshots go
    /// * `timings` - Alarm durations of the animation gates
    pub fn new(game: Game, publisher: Arc<Publisher>, timings: Timings) -> Arc<Self> {
        publisher.set_state(game.snapshot());
        info!(state = %game.state(), "host session started");

        Arc::new(Self {
            inner: Mutex::new(Inner {
                game,
                alarms: EnumMap::default(),
            }),
            publisher,
            timings,
        })
    }

    /// The publisher snapshots are sent to
    pub fn publisher(&self) -> &Arc<Publisher> {
        &self.publisher
    }

    /// Sends an event to the game
    ///
    /// Accepted events publish the new snapshot before this returns.
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn send(self: &Arc<Self>, event: Event) -> Outcome {
        let mut inner = self.inner.lock().await;
        self.apply(&mut inner, event)
    }

    /// Closes whichever animation gate is open
    ///
    /// Does nothing outside the two animation states.
    pub async fn animation_complete(self: &Arc<Self>) -> Outcome {
        let mut inner = self.inner.lock().await;
        match Gate::of(inner.game.state()) {
            Some(gate) => self.apply(&mut inner, gate.event()),
            None => Outcome {
                accepted: false,
                state: inner.game.state(),
            },
        }
    }

    /// The current snapshot of the game
    pub async fn snapshot(&self) -> Snapshot {
        self.inner.lock().await.game.snapshot()
    }

    /// The current state of the game
    pub async fn state(&self) -> State {
        self.inner.lock().await.game.state()
    }

    fn apply(self: &Arc<Self>, inner: &mut Inner, event: Event) -> Outcome {
        let accepted = inner.game.send(event);
        let state = inner.game.state();

        if accepted {
            self.publisher.set_state(inner.game.snapshot());
            self.arm_alarms(inner);
        }

        Outcome { accepted, state }
    }

    /// Arms the alarm of the open gate and disarms the others
    fn arm_alarms(self: &Arc<Self>, inner: &mut Inner) {
        let open = Gate::of(inner.game.state());

        for (gate, alarm) in &mut inner.alarms {
            if open != Some(gate) {
                if let Some(handle) = alarm.take() {
                    handle.abort();
                    debug!(?gate, "alarm disarmed");
                }
            } else if alarm.is_none() && self.timings.auto_advance {
                let delay = self.timings.of(gate);
                let host = Arc::downgrade(self);
                *alarm = Some(tokio::spawn(ring(host, gate, delay)));
                debug!(?gate, delay_ms = delay.as_millis() as u64, "alarm armed");
            }
        }
    }

    async fn fire(self: &Arc<Self>, gate: Gate) {
        let mut inner = self.inner.lock().await;
        inner.alarms[gate] = None;

        if Gate::of(inner.game.state()) == Some(gate) {
            debug!(?gate, "alarm closing gate");
            self.apply(&mut inner, gate.event());
        }
    }
}

async fn ring(host: Weak<Host>, gate: Gate, delay: Duration) {
    tokio::time::sleep(delay).await;
    if let Some(host) = host.upgrade() {
        host.fire(gate).await;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::{
        Mutex as StdMutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::{
        board::ClueRef,
        player::Player,
        publisher::SinkError,
        question::{CategoryId, Question, QuestionCategory},
    };

    const IDS: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

    fn bank() -> Vec<QuestionCategory> {
        IDS.into_iter()
            .map(|id| QuestionCategory {
                id: CategoryId::new(id),
                name: id.to_uppercase(),
                types: vec![],
                questions: (1..=5)
                    .map(|i| Question::new(format!("{id}{i}"), "answer", 200 * i))
                    .collect(),
            })
            .collect()
    }

    fn host(timings: Timings) -> (Arc<Host>, Arc<Publisher>) {
        let publisher = Arc::new(Publisher::new());
        let game = Game::with_rng(bank(), fastrand::Rng::with_seed(42));
        (Host::new(game, Arc::clone(&publisher), timings), publisher)
    }

    async fn open_board_gate(host: &Arc<Host>) {
        host.send(Event::Start).await;
        host.send(Event::PlayersConfirmed {
            players: vec![Player::new("p1", "Ada"), Player::new("p2", "Grace")],
        })
        .await;
        let outcome = host
            .send(Event::CategoriesConfirmed {
                category_ids: IDS.into_iter().map(CategoryId::new).collect(),
            })
            .await;
        assert_eq!(outcome.state, State::BoardAnimation);
    }

    async fn settle(delay: Duration) {
        tokio::time::sleep(delay + Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
    }

    fn count_deliveries(publisher: &Arc<Publisher>) -> (Arc<AtomicUsize>, crate::publisher::Subscription) {
        let count = Arc::new(AtomicUsize::new(0));
        let subscription = {
            let count = Arc::clone(&count);
            publisher.subscribe(move |_: &Arc<Snapshot>| -> Result<(), SinkError> {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };
        (count, subscription)
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_publishes_idle() {
        let (_host, publisher) = host(Timings::default());
        let latest = publisher.latest().unwrap();

        assert_eq!(latest.state, State::Idle);
        assert_eq!(latest.context.all_questions, bank());
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_events_publish() {
        let (host, publisher) = host(Timings::default());
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let _subscription = {
            let seen = Arc::clone(&seen);
            publisher.subscribe(move |s: &Arc<Snapshot>| -> Result<(), SinkError> {
                seen.lock().unwrap().push(s.state);
                Ok(())
            })
        };

        let outcome = host.send(Event::Start).await;
        assert_eq!(
            outcome,
            Outcome {
                accepted: true,
                state: State::SelectPlayers
            }
        );

        let outcome = host.send(Event::RevealAnswer).await;
        assert!(!outcome.accepted);

        assert_eq!(*seen.lock().unwrap(), vec![State::Idle, State::SelectPlayers]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_board_alarm_closes_gate() {
        let (host, publisher) = host(Timings::default());
        open_board_gate(&host).await;

        settle(BOARD_REVEAL).await;

        assert_eq!(host.state().await, State::ShowBoard);
        assert_eq!(publisher.latest().unwrap().state, State::ShowBoard);
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_signal_disarms_alarm() {
        let (host, publisher) = host(Timings::default());
        open_board_gate(&host).await;
        let (count, _subscription) = count_deliveries(&publisher);

        let outcome = host.animation_complete().await;
        assert!(outcome.accepted);
        assert_eq!(outcome.state, State::ShowBoard);

        settle(BOARD_REVEAL).await;
        assert_eq!(host.state().await, State::ShowBoard);
        // catch-up delivery plus the one accepted event
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_alarm_closes_gate() {
        let (host, _publisher) = host(Timings::default());
        open_board_gate(&host).await;
        host.animation_complete().await;

        let snapshot = host.snapshot().await;
        let clue: ClueRef = snapshot.context.board.doubles()[0];
        let outcome = host.send(Event::SelectClue(clue)).await;
        assert_eq!(
            outcome.state,
            State::ShowQuestion(QuestionState::DoubleAnimation)
        );

        settle(DOUBLE_REVEAL).await;
        assert_eq!(
            host.state().await,
            State::ShowQuestion(QuestionState::QuestionRevealed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gates_wait_without_auto_advance() {
        let (host, _publisher) = host(Timings {
            auto_advance: false,
            ..Timings::default()
        });
        open_board_gate(&host).await;

        settle(Duration::from_secs(60)).await;
        assert_eq!(host.state().await, State::BoardAnimation);

        assert!(host.animation_complete().await.accepted);
        assert_eq!(host.state().await, State::ShowBoard);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_complete_outside_gates() {
        let (host, _publisher) = host(Timings::default());
        let outcome = host.animation_complete().await;

        assert_eq!(
            outcome,
            Outcome {
                accepted: false,
                state: State::Idle
            }
        );
    }

    #[test]
    fn test_gate_of_state() {
        assert_eq!(Gate::of(State::BoardAnimation), Some(Gate::Board));
        assert_eq!(
            Gate::of(State::ShowQuestion(QuestionState::DoubleAnimation)),
            Some(Gate::Double)
        );
        assert_eq!(Gate::of(State::ShowBoard), None);
        assert_eq!(Gate::Double.event(), Event::DoubleAnimDone);
    }
}
