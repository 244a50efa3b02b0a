//! Game state machine
//!
//! This module owns the whole flow of a trivia game: player and category
//! setup, the board reveal, the lifecycle of every clue (including wager
//! clues), scoring, and the transition to game over.
//!
//! The machine is hierarchical. Clue play happens inside `showQuestion`,
//! whose children are listed in [`QuestionState`]. Three states are
//! automatic: `showQuestion.checkDouble`, `showQuestion.scoreUpdate` and
//! `checkBoard` are left as soon as they are entered. [`Game::send`] applies
//! an event and then settles through automatic states before returning, so
//! callers never observe them.

use std::{fmt::Display, str::FromStr};

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, de};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;
use tracing::debug;

use crate::{
    Snapshot,
    board::{Board, BoardCell, ClueRef},
    constants::board::{COLUMNS, WAGER_MULTIPLIER},
    player::{Player, PlayerId, Roster},
    question::{CategoryId, QuestionCategory},
};

/// Phases of a single clue inside `showQuestion`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionState {
    /// Automatic: routes to the wager animation or straight to the clue
    CheckDouble,
    /// The display is playing the wager animation
    DoubleAnimation,
    /// The clue is shown, the answer is hidden
    QuestionRevealed,
    /// The answer is shown, the host is entering results
    AnswerRevealed,
    /// Automatic: applies the results and leaves `showQuestion`
    ScoreUpdate,
}

impl QuestionState {
    /// Name of the state on the wire
    pub fn name(self) -> &'static str {
        match self {
            Self::CheckDouble => "checkDouble",
            Self::DoubleAnimation => "doubleAnimation",
            Self::QuestionRevealed => "questionRevealed",
            Self::AnswerRevealed => "answerRevealed",
            Self::ScoreUpdate => "scoreUpdate",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "checkDouble" => Self::CheckDouble,
            "doubleAnimation" => Self::DoubleAnimation,
            "questionRevealed" => Self::QuestionRevealed,
            "answerRevealed" => Self::AnswerRevealed,
            "scoreUpdate" => Self::ScoreUpdate,
            _ => return None,
        })
    }
}

/// Current state of the game
///
/// On the wire a state is flattened to a dot-joined path, for example
/// `showQuestion.checkDouble`. Inside the crate it is always compared as a
/// value of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, SerializeDisplay, DeserializeFromStr)]
pub enum State {
    /// Waiting for the host to start a session
    #[default]
    Idle,
    /// The host is entering players
    SelectPlayers,
    /// The host is picking six categories
    SelectCategories,
    /// The display is revealing the new board
    BoardAnimation,
    /// The board is shown and the host picks a clue
    ShowBoard,
    /// A clue is being played
    ShowQuestion(QuestionState),
    /// Automatic: routes back to the board or to game over
    CheckBoard,
    /// Every clue has been played
    GameOver,
}

impl State {
    /// Name of the top-level state on the wire
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SelectPlayers => "selectPlayers",
            Self::SelectCategories => "selectCategories",
            Self::BoardAnimation => "boardAnimation",
            Self::ShowBoard => "showBoard",
            Self::ShowQuestion(_) => "showQuestion",
            Self::CheckBoard => "checkBoard",
            Self::GameOver => "gameOver",
        }
    }

    /// The path from the root to this state, one segment per level
    pub fn path(self) -> Vec<&'static str> {
        match self {
            Self::ShowQuestion(child) => vec![self.name(), child.name()],
            _ => vec![self.name()],
        }
    }

    /// Returns `true` for states that are left as soon as they are entered
    pub fn is_automatic(self) -> bool {
        matches!(
            self,
            Self::CheckBoard
                | Self::ShowQuestion(QuestionState::CheckDouble | QuestionState::ScoreUpdate)
        )
    }
}

impl Display for State {
    /// Formats the state as its dot-joined path
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path().join("."))
    }
}

/// Error returned when a state path does not name a known state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown game state `{0}`")]
pub struct ParseStateError(String);

impl FromStr for State {
    type Err = ParseStateError;

    /// Parses a dot-joined state path
    ///
    /// A bare `showQuestion` resolves to its initial child, `checkDouble`.
    ///
    /// # Errors
    ///
    /// Returns a `ParseStateError` if the path does not name a state.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ParseStateError(s.to_owned());
        let (head, child) = match s.split_once('.') {
            Some((head, child)) => (head, Some(child)),
            None => (s, None),
        };

        let state = match (head, child) {
            ("showQuestion", None) => Self::ShowQuestion(QuestionState::CheckDouble),
            ("showQuestion", Some(child)) => {
                Self::ShowQuestion(QuestionState::from_name(child).ok_or_else(unknown)?)
            }
            (_, Some(_)) => return Err(unknown()),
            ("idle", None) => Self::Idle,
            ("selectPlayers", None) => Self::SelectPlayers,
            ("selectCategories", None) => Self::SelectCategories,
            ("boardAnimation", None) => Self::BoardAnimation,
            ("showBoard", None) => Self::ShowBoard,
            ("checkBoard", None) => Self::CheckBoard,
            ("gameOver", None) => Self::GameOver,
            _ => return Err(unknown()),
        };

        Ok(state)
    }
}

/// Outcome of a wager clue for the player who wagered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WagerOutcome {
    /// The player answered correctly and wins double the value
    Correct,
    /// The player answered incorrectly and loses double the value
    Incorrect,
}

/// Results entered by the host after the answer is revealed
///
/// The two shapes are mutually exclusive: a normal clue takes
/// `{correct, incorrect}`, a wager clue takes `{result, playerId}`. A payload
/// that mixes the two, misses half of a wager or carries unknown keys does
/// not deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Results {
    /// Result of a wager clue
    #[serde(rename_all = "camelCase")]
    Wager {
        /// Whether the wager was won
        result: WagerOutcome,
        /// The player who wagered
        player_id: PlayerId,
    },
    /// Result of a normal clue
    Normal {
        /// The player who answered correctly, if anyone
        correct: Option<PlayerId>,
        /// Players who answered incorrectly
        incorrect: Vec<PlayerId>,
    },
}

/// Every key either shape of [`Results`] may carry
#[derive(Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct ResultsPayload {
    result: Option<WagerOutcome>,
    player_id: Option<PlayerId>,
    correct: Option<PlayerId>,
    incorrect: Option<Vec<PlayerId>>,
}

impl<'de> Deserialize<'de> for Results {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = ResultsPayload::deserialize(deserializer)?;
        match payload {
            ResultsPayload {
                result: Some(result),
                player_id: Some(player_id),
                correct: None,
                incorrect: None,
            } => Ok(Self::Wager { result, player_id }),
            ResultsPayload {
                result: None,
                player_id: None,
                correct,
                incorrect,
            } => Ok(Self::Normal {
                correct,
                incorrect: incorrect.unwrap_or_default(),
            }),
            _ => Err(de::Error::custom(
                "expected either `result` and `playerId`, or `correct` and `incorrect`",
            )),
        }
    }
}

impl Results {
    /// Results of a normal clue nobody answered
    pub fn nobody() -> Self {
        Self::Normal {
            correct: None,
            incorrect: vec![],
        }
    }

    fn is_wager(&self) -> bool {
        matches!(self, Self::Wager { .. })
    }
}

/// Events sent by the host (and by the display for animation gates)
///
/// Events are tagged by `type` on the wire, for example
/// `{"type": "SELECT_CLUE", "col": 2, "row": 4}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// Begins a session
    Start,
    /// Sets the players, in seating order
    PlayersConfirmed {
        /// The confirmed players
        players: Vec<Player>,
    },
    /// Picks the six categories of the board
    #[serde(rename_all = "camelCase")]
    CategoriesConfirmed {
        /// Ids of the selected categories, in column order
        category_ids: Vec<CategoryId>,
    },
    /// The display finished revealing the board
    AnimationComplete,
    /// Selects the clue to play
    SelectClue(ClueRef),
    /// The display finished the wager animation
    DoubleAnimDone,
    /// Reveals the answer of the current clue
    RevealAnswer,
    /// Submits the results of the current clue
    SubmitResults(Results),
    /// Throws the current game away and goes back to player setup
    NewGame,
}

impl Event {
    /// Name of the event on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::PlayersConfirmed { .. } => "PLAYERS_CONFIRMED",
            Self::CategoriesConfirmed { .. } => "CATEGORIES_CONFIRMED",
            Self::AnimationComplete => "ANIMATION_COMPLETE",
            Self::SelectClue(_) => "SELECT_CLUE",
            Self::DoubleAnimDone => "DOUBLE_ANIM_DONE",
            Self::RevealAnswer => "REVEAL_ANSWER",
            Self::SubmitResults(_) => "SUBMIT_RESULTS",
            Self::NewGame => "NEW_GAME",
        }
    }
}

/// Everything the machine knows about the current game
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameContext {
    /// Players, in seating order
    pub players: Vec<Player>,
    /// Categories on the board, in column order
    pub categories: Vec<QuestionCategory>,
    /// The scoring grid
    pub board: Board,
    /// The clue being played, if any
    pub current_clue: Option<ClueRef>,
    /// The whole question bank; survives new games
    pub all_questions: Vec<QuestionCategory>,
    /// Category ids exactly as the host sent them
    pub selected_category_ids: Vec<CategoryId>,
}

impl GameContext {
    /// Creates an empty context over a question bank
    pub fn with_questions(all_questions: Vec<QuestionCategory>) -> Self {
        Self {
            all_questions,
            ..Self::default()
        }
    }

    /// Clears everything but the question bank
    fn reset(&mut self) {
        *self = Self::with_questions(std::mem::take(&mut self.all_questions));
    }

    /// The cell of the clue being played
    pub fn current_cell(&self) -> Option<&BoardCell> {
        self.board.cell(self.current_clue?)
    }

    /// Returns `true` if the clue being played is a wager clue
    pub fn is_double_clue(&self) -> bool {
        self.current_cell().is_some_and(|cell| cell.is_double)
    }

    /// Looks up categories of the bank by id, dropping unknown ids
    pub fn resolve_categories(&self, ids: &[CategoryId]) -> Vec<QuestionCategory> {
        ids.iter()
            .filter_map(|id| self.all_questions.iter().find(|category| &category.id == id))
            .cloned()
            .collect_vec()
    }

    /// Players ordered from lowest to highest score
    ///
    /// This is the order in which the final standings are revealed. Ties
    /// keep seating order.
    pub fn standings(&self) -> Vec<&Player> {
        self.players
            .iter()
            .sorted_by_key(|player| player.score)
            .collect_vec()
    }

    /// The players sharing the highest score
    pub fn leaders(&self) -> Vec<&Player> {
        self.players.iter().max_set_by_key(|player| player.score)
    }
}

/// Where `checkBoard` goes for a given board
///
/// Pure in the board: asking twice without a reveal in between gives the
/// same answer.
pub fn check_board(board: &Board) -> State {
    if board.is_complete() {
        State::GameOver
    } else {
        State::ShowBoard
    }
}

/// Applies the results of a clue to the players
///
/// Normal clue: the correct player gains the value, every incorrect player
/// loses it, everyone else is untouched. Wager clue: the named player gains
/// or loses twice the value. Results whose shape does not match the clue
/// change nothing.
///
/// # Arguments
///
/// * `players` - The players to update
/// * `cell` - The clue being scored
/// * `results` - The results entered by the host
pub fn apply_results(players: &mut [Player], cell: &BoardCell, results: &Results) {
    match (cell.is_double, results) {
        (false, Results::Normal { correct, incorrect }) => {
            for player in players.iter_mut() {
                if correct.as_ref() == Some(&player.id) {
                    player.award(cell.value);
                } else if incorrect.contains(&player.id) {
                    player.award(cell.value.saturating_neg());
                }
            }
        }
        (true, Results::Wager { result, player_id }) => {
            let stake = cell.value.saturating_mul(WAGER_MULTIPLIER);
            let delta = match result {
                WagerOutcome::Correct => stake,
                WagerOutcome::Incorrect => stake.saturating_neg(),
            };
            for player in players.iter_mut().filter(|p| &p.id == player_id) {
                player.award(delta);
            }
        }
        _ => {}
    }
}

/// A trivia game driven by host events
///
/// The game is the only writer of its context. Events that are not valid in
/// the current state, or that carry a malformed payload, are ignored and
/// leave both the state and the context untouched.
#[derive(Debug)]
pub struct Game {
    /// Current state; never an automatic one between calls
    state: State,
    /// Game data
    context: GameContext,
    /// Source of randomness for wager placement
    rng: fastrand::Rng,
}

impl Game {
    /// Creates a game in the `idle` state over a question bank
    ///
    /// # Arguments
    ///
    /// * `all_questions` - Every category the host may choose from
    pub fn new(all_questions: Vec<QuestionCategory>) -> Self {
        Self::with_rng(all_questions, fastrand::Rng::new())
    }

    /// Creates a game with a caller-supplied random number generator
    ///
    /// Seeding the generator makes wager placement reproducible.
    pub fn with_rng(all_questions: Vec<QuestionCategory>, rng: fastrand::Rng) -> Self {
        Self {
            state: State::Idle,
            context: GameContext::with_questions(all_questions),
            rng,
        }
    }

    /// The current state
    pub fn state(&self) -> State {
        self.state
    }

    /// The current context
    pub fn context(&self) -> &GameContext {
        &self.context
    }

    /// Replaces the question bank
    ///
    /// A board that has already been built keeps its clues.
    pub fn load_questions(&mut self, all_questions: Vec<QuestionCategory>) {
        self.context.all_questions = all_questions;
    }

    /// The `{state, context}` record published to viewers
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            context: self.context.clone(),
        }
    }

    /// Applies an event and settles through automatic states
    ///
    /// Runs to completion: when this returns, the game rests in a state that
    /// waits for an event.
    ///
    /// # Arguments
    ///
    /// * `event` - The event to apply
    ///
    /// # Returns
    ///
    /// `true` if the event was accepted, `false` if it was ignored
    pub fn send(&mut self, event: Event) -> bool {
        let Some(next) = self.transition(&event) else {
            debug!(state = %self.state, event = event.name(), "ignoring event");
            return false;
        };

        self.state = next;
        while let Some(next) = self.automatic(&event) {
            self.state = next;
        }

        debug!(state = %self.state, event = event.name(), "event applied");
        true
    }

    /// Computes the target of an event-driven transition and runs its action
    ///
    /// Guards are checked before anything is modified, so a `None` leaves the
    /// context untouched.
    fn transition(&mut self, event: &Event) -> Option<State> {
        match (self.state, event) {
            (State::Idle, Event::Start) => Some(State::SelectPlayers),
            (State::SelectPlayers, Event::PlayersConfirmed { players }) => {
                let roster = Roster::new(players.clone());
                roster.validate().ok()?;
                self.context.players = roster.into_players();
                Some(State::SelectCategories)
            }
            (State::SelectCategories, Event::CategoriesConfirmed { category_ids }) => {
                if category_ids.len() != COLUMNS {
                    return None;
                }
                let categories = self.context.resolve_categories(category_ids);
                if categories.len() < COLUMNS {
                    debug!(
                        resolved = categories.len(),
                        "some selected categories are not in the question bank"
                    );
                }
                self.context.board = Board::build(&categories).with_daily_doubles(&mut self.rng);
                self.context.categories = categories;
                self.context.selected_category_ids = category_ids.clone();
                Some(State::BoardAnimation)
            }
            (State::BoardAnimation, Event::AnimationComplete) => Some(State::ShowBoard),
            (State::ShowBoard, Event::SelectClue(clue)) => {
                let cell = self.context.board.cell(*clue)?;
                if cell.revealed {
                    return None;
                }
                self.context.current_clue = Some(*clue);
                Some(State::ShowQuestion(QuestionState::CheckDouble))
            }
            (State::ShowQuestion(QuestionState::DoubleAnimation), Event::DoubleAnimDone) => {
                Some(State::ShowQuestion(QuestionState::QuestionRevealed))
            }
            (State::ShowQuestion(QuestionState::QuestionRevealed), Event::RevealAnswer) => {
                Some(State::ShowQuestion(QuestionState::AnswerRevealed))
            }
            (State::ShowQuestion(QuestionState::AnswerRevealed), Event::SubmitResults(results)) => {
                if results.is_wager() != self.context.is_double_clue() {
                    return None;
                }
                Some(State::ShowQuestion(QuestionState::ScoreUpdate))
            }
            (State::ShowBoard | State::GameOver, Event::NewGame) => {
                self.context.reset();
                Some(State::SelectPlayers)
            }
            _ => None,
        }
    }

    /// Computes the target of the automatic transition of the current state
    ///
    /// `event` is the event that started the current cascade; `scoreUpdate`
    /// reads the results from it.
    fn automatic(&mut self, event: &Event) -> Option<State> {
        match self.state {
            State::ShowQuestion(QuestionState::CheckDouble) => {
                Some(State::ShowQuestion(if self.context.is_double_clue() {
                    QuestionState::DoubleAnimation
                } else {
                    QuestionState::QuestionRevealed
                }))
            }
            State::ShowQuestion(QuestionState::ScoreUpdate) => {
                if let Event::SubmitResults(results) = event {
                    self.score_current_clue(results);
                }
                Some(State::CheckBoard)
            }
            State::CheckBoard => Some(check_board(&self.context.board)),
            _ => None,
        }
    }

    /// Scores the current clue, reveals it and clears the current clue
    fn score_current_clue(&mut self, results: &Results) {
        let Some(clue) = self.context.current_clue.take() else {
            return;
        };
        let Some(cell) = self.context.board.cell(clue).cloned() else {
            return;
        };

        apply_results(&mut self.context.players, &cell, results);
        self.context.board.reveal(clue);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::question::Question;

    fn bank() -> Vec<QuestionCategory> {
        ["art", "books", "cities", "dogs", "eels", "films", "games"]
            .into_iter()
            .map(|id| QuestionCategory {
                id: CategoryId::new(id),
                name: id.to_uppercase(),
                types: vec!["general".to_string()],
                questions: (1..=5)
                    .map(|i| Question::new(format!("{id} {i}"), format!("{id} answer {i}"), 200 * i))
                    .collect(),
            })
            .collect()
    }

    fn ids(names: &[&str]) -> Vec<CategoryId> {
        names.iter().map(|id| CategoryId::new(*id)).collect()
    }

    fn six() -> Vec<CategoryId> {
        ids(&["art", "books", "cities", "dogs", "eels", "films"])
    }

    fn two_players() -> Vec<Player> {
        vec![Player::new("p1", "Ada"), Player::new("p2", "Grace")]
    }

    fn game_on_board(seed: u64) -> Game {
        let mut game = Game::with_rng(bank(), fastrand::Rng::with_seed(seed));
        assert!(game.send(Event::Start));
        assert!(game.send(Event::PlayersConfirmed {
            players: two_players()
        }));
        assert!(game.send(Event::CategoriesConfirmed { category_ids: six() }));
        assert!(game.send(Event::AnimationComplete));
        assert_eq!(game.state(), State::ShowBoard);
        game
    }

    fn first_clue(game: &Game, double: bool) -> ClueRef {
        game.context()
            .board
            .positions()
            .find(|clue| {
                let cell = game.context().board.cell(*clue).unwrap();
                cell.is_double == double && !cell.revealed
            })
            .unwrap()
    }

    fn score(game: &Game, id: &str) -> i64 {
        game.context()
            .players
            .iter()
            .find(|p| p.id.as_str() == id)
            .unwrap()
            .score
    }

    fn play(game: &mut Game, clue: ClueRef, results: Results) {
        assert!(game.send(Event::SelectClue(clue)));
        if game.state() == State::ShowQuestion(QuestionState::DoubleAnimation) {
            assert!(game.send(Event::DoubleAnimDone));
        }
        assert!(game.send(Event::RevealAnswer));
        assert!(game.send(Event::SubmitResults(results)));
    }

    #[test]
    fn test_state_paths() {
        assert_eq!(State::Idle.to_string(), "idle");
        assert_eq!(
            State::ShowQuestion(QuestionState::CheckDouble).to_string(),
            "showQuestion.checkDouble"
        );
        assert_eq!(
            "showQuestion.answerRevealed".parse::<State>(),
            Ok(State::ShowQuestion(QuestionState::AnswerRevealed))
        );
        assert_eq!(
            "showQuestion".parse::<State>(),
            Ok(State::ShowQuestion(QuestionState::CheckDouble))
        );
        assert!("showBoard.checkDouble".parse::<State>().is_err());
        assert!("showQuestion.nope".parse::<State>().is_err());
        assert!("".parse::<State>().is_err());
    }

    #[test]
    fn test_every_state_round_trips_through_its_path() {
        let states = [
            State::Idle,
            State::SelectPlayers,
            State::SelectCategories,
            State::BoardAnimation,
            State::ShowBoard,
            State::ShowQuestion(QuestionState::CheckDouble),
            State::ShowQuestion(QuestionState::DoubleAnimation),
            State::ShowQuestion(QuestionState::QuestionRevealed),
            State::ShowQuestion(QuestionState::AnswerRevealed),
            State::ShowQuestion(QuestionState::ScoreUpdate),
            State::CheckBoard,
            State::GameOver,
        ];
        for state in states {
            assert_eq!(state.to_string().parse::<State>(), Ok(state));
        }
    }

    #[test]
    fn test_event_wire_format() {
        let event: Event =
            serde_json::from_str(r#"{"type":"SELECT_CLUE","col":2,"row":4}"#).unwrap();
        assert_eq!(event, Event::SelectClue(ClueRef::new(2, 4)));

        let event: Event = serde_json::from_str(
            r#"{"type":"CATEGORIES_CONFIRMED","categoryIds":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Event::CategoriesConfirmed {
                category_ids: ids(&["a", "b"])
            }
        );

        let event: Event = serde_json::from_str(r#"{"type":"NEW_GAME"}"#).unwrap();
        assert_eq!(event, Event::NewGame);
    }

    #[test]
    fn test_submit_results_shapes() {
        let normal: Event = serde_json::from_str(
            r#"{"type":"SUBMIT_RESULTS","correct":"p1","incorrect":["p2"]}"#,
        )
        .unwrap();
        assert_eq!(
            normal,
            Event::SubmitResults(Results::Normal {
                correct: Some(PlayerId::new("p1")),
                incorrect: vec![PlayerId::new("p2")],
            })
        );

        let nobody: Event =
            serde_json::from_str(r#"{"type":"SUBMIT_RESULTS","correct":null}"#).unwrap();
        assert_eq!(nobody, Event::SubmitResults(Results::nobody()));

        let wager: Event = serde_json::from_str(
            r#"{"type":"SUBMIT_RESULTS","result":"incorrect","playerId":"p2"}"#,
        )
        .unwrap();
        assert_eq!(
            wager,
            Event::SubmitResults(Results::Wager {
                result: WagerOutcome::Incorrect,
                player_id: PlayerId::new("p2"),
            })
        );
    }

    #[test]
    fn test_malformed_results_do_not_parse() {
        for json in [
            r#"{"type":"SUBMIT_RESULTS","result":"corect","playerId":"p1"}"#,
            r#"{"type":"SUBMIT_RESULTS","result":"correct"}"#,
            r#"{"type":"SUBMIT_RESULTS","playerId":"p1"}"#,
            r#"{"type":"SUBMIT_RESULTS","result":"correct","playerId":"p1","correct":"p2"}"#,
            r#"{"type":"SUBMIT_RESULTS","correkt":"p1"}"#,
        ] {
            assert!(serde_json::from_str::<Event>(json).is_err(), "{json}");
        }

        let empty: Event = serde_json::from_str(r#"{"type":"SUBMIT_RESULTS"}"#).unwrap();
        assert_eq!(empty, Event::SubmitResults(Results::nobody()));
    }

    #[test]
    fn test_misspelled_wager_leaves_normal_clue_open() {
        let mut game = game_on_board(4);
        let clue = first_clue(&game, false);
        game.send(Event::SelectClue(clue));
        game.send(Event::RevealAnswer);
        let before = game.context().clone();

        let parsed = serde_json::from_str::<Event>(
            r#"{"type":"SUBMIT_RESULTS","result":"corect","playerId":"p1"}"#,
        );
        assert!(parsed.is_err());
        assert!(!game.send(Event::SubmitResults(Results::Wager {
            result: WagerOutcome::Correct,
            player_id: PlayerId::new("p1"),
        })));

        assert_eq!(
            game.state(),
            State::ShowQuestion(QuestionState::AnswerRevealed)
        );
        assert_eq!(game.context(), &before);
        assert!(!game.context().board.cell(clue).unwrap().revealed);
    }

    #[test]
    fn test_setup_flow() {
        let mut game = Game::with_rng(bank(), fastrand::Rng::with_seed(1));
        assert_eq!(game.state(), State::Idle);

        assert!(game.send(Event::Start));
        assert_eq!(game.state(), State::SelectPlayers);

        assert!(game.send(Event::PlayersConfirmed {
            players: two_players()
        }));
        assert_eq!(game.state(), State::SelectCategories);
        assert_eq!(game.context().players, two_players());

        assert!(game.send(Event::CategoriesConfirmed { category_ids: six() }));
        assert_eq!(game.state(), State::BoardAnimation);
        assert_eq!(game.context().selected_category_ids, six());
        assert_eq!(
            game.context()
                .categories
                .iter()
                .map(|c| c.id.clone())
                .collect_vec(),
            six()
        );

        assert!(game.send(Event::AnimationComplete));
        assert_eq!(game.state(), State::ShowBoard);
    }

    #[test]
    fn test_categories_confirmed_builds_full_board() {
        let game = game_on_board(11);
        let board = &game.context().board;

        assert_eq!(board.len(), 30);
        assert_eq!(board.doubles().len(), 2);
        assert!(board.cells().all(|cell| !cell.revealed));
    }

    #[test]
    fn test_unknown_category_ids_are_dropped() {
        let mut game = Game::with_rng(bank(), fastrand::Rng::with_seed(2));
        game.send(Event::Start);
        game.send(Event::PlayersConfirmed {
            players: two_players(),
        });
        let selected = ids(&["art", "nope", "cities", "dogs", "eels", "films"]);
        assert!(game.send(Event::CategoriesConfirmed {
            category_ids: selected.clone()
        }));

        assert_eq!(game.context().categories.len(), 5);
        assert_eq!(game.context().selected_category_ids, selected);
        assert_eq!(game.context().board.len(), 25);
        assert!(game.context().board.columns()[5].is_empty());
    }

    #[test]
    fn test_wrong_category_count_is_ignored() {
        let mut game = Game::with_rng(bank(), fastrand::Rng::with_seed(2));
        game.send(Event::Start);
        game.send(Event::PlayersConfirmed {
            players: two_players(),
        });

        assert!(!game.send(Event::CategoriesConfirmed {
            category_ids: ids(&["art", "books"])
        }));
        assert_eq!(game.state(), State::SelectCategories);
        assert!(game.context().board.is_empty());
    }

    #[test]
    fn test_invalid_rosters_are_ignored() {
        let mut game = Game::new(bank());
        game.send(Event::Start);

        assert!(!game.send(Event::PlayersConfirmed {
            players: vec![Player::new("p1", "Solo")]
        }));
        assert!(!game.send(Event::PlayersConfirmed {
            players: vec![Player::new("p1", "Ada"), Player::new("p1", "Grace")]
        }));
        assert_eq!(game.state(), State::SelectPlayers);
        assert!(game.context().players.is_empty());
    }

    #[test]
    fn test_players_are_kept_verbatim() {
        let mut game = Game::new(bank());
        game.send(Event::Start);
        let mut players = two_players();
        players[1].score = 300;

        assert!(game.send(Event::PlayersConfirmed {
            players: players.clone()
        }));
        assert_eq!(game.context().players, players);
    }

    #[test]
    fn test_events_outside_their_state_are_ignored() {
        let mut game = Game::new(bank());

        for event in [
            Event::AnimationComplete,
            Event::SelectClue(ClueRef::new(0, 0)),
            Event::DoubleAnimDone,
            Event::RevealAnswer,
            Event::SubmitResults(Results::nobody()),
            Event::NewGame,
            Event::PlayersConfirmed {
                players: two_players(),
            },
        ] {
            assert!(!game.send(event));
            assert_eq!(game.state(), State::Idle);
        }
        assert_eq!(game.context(), &GameContext::with_questions(bank()));
    }

    #[test]
    fn test_scenario_a_normal_clue() {
        let mut game = game_on_board(5);
        let clue = game
            .context()
            .board
            .positions()
            .find(|c| {
                let cell = game.context().board.cell(*c).unwrap();
                cell.value == 200 && !cell.is_double
            })
            .unwrap();

        assert!(game.send(Event::SelectClue(clue)));
        assert_eq!(
            game.state(),
            State::ShowQuestion(QuestionState::QuestionRevealed)
        );
        assert_eq!(game.context().current_clue, Some(clue));

        assert!(game.send(Event::RevealAnswer));
        assert!(game.send(Event::SubmitResults(Results::Normal {
            correct: Some(PlayerId::new("p1")),
            incorrect: vec![PlayerId::new("p2")],
        })));

        assert_eq!(score(&game, "p1"), 200);
        assert_eq!(score(&game, "p2"), -200);
        assert!(game.context().board.cell(clue).unwrap().revealed);
        assert_eq!(game.context().current_clue, None);
        assert_eq!(game.state(), State::ShowBoard);
    }

    #[test]
    fn test_scenario_b_wager_clue() {
        let mut game = game_on_board(9);
        let clue = first_clue(&game, true);
        let value = game.context().board.cell(clue).unwrap().value;

        assert!(game.send(Event::SelectClue(clue)));
        assert_eq!(
            game.state(),
            State::ShowQuestion(QuestionState::DoubleAnimation)
        );
        assert!(!game.send(Event::RevealAnswer));

        assert!(game.send(Event::DoubleAnimDone));
        assert!(game.send(Event::RevealAnswer));
        assert!(game.send(Event::SubmitResults(Results::Wager {
            result: WagerOutcome::Incorrect,
            player_id: PlayerId::new("p2"),
        })));

        assert_eq!(score(&game, "p1"), 0);
        assert_eq!(score(&game, "p2"), -2 * value);
        assert!(game.context().board.cell(clue).unwrap().revealed);
        assert_eq!(game.state(), State::ShowBoard);
    }

    #[test]
    fn test_wager_win() {
        let mut game = game_on_board(9);
        let clue = first_clue(&game, true);
        let value = game.context().board.cell(clue).unwrap().value;

        play(
            &mut game,
            clue,
            Results::Wager {
                result: WagerOutcome::Correct,
                player_id: PlayerId::new("p1"),
            },
        );
        assert_eq!(score(&game, "p1"), 2 * value);
        assert_eq!(score(&game, "p2"), 0);
    }

    #[test]
    fn test_mismatched_result_shape_is_ignored() {
        let mut game = game_on_board(4);
        let clue = first_clue(&game, false);
        game.send(Event::SelectClue(clue));
        game.send(Event::RevealAnswer);

        assert!(!game.send(Event::SubmitResults(Results::Wager {
            result: WagerOutcome::Correct,
            player_id: PlayerId::new("p1"),
        })));
        assert_eq!(
            game.state(),
            State::ShowQuestion(QuestionState::AnswerRevealed)
        );
        assert_eq!(score(&game, "p1"), 0);
        assert!(!game.context().board.cell(clue).unwrap().revealed);
    }

    #[test]
    fn test_nobody_answered() {
        let mut game = game_on_board(4);
        let clue = first_clue(&game, false);
        play(&mut game, clue, Results::nobody());

        assert_eq!(score(&game, "p1"), 0);
        assert_eq!(score(&game, "p2"), 0);
        assert!(game.context().board.cell(clue).unwrap().revealed);
    }

    #[test]
    fn test_revealed_and_missing_cells_cannot_be_selected() {
        let mut game = game_on_board(4);
        let clue = first_clue(&game, false);
        play(&mut game, clue, Results::nobody());

        assert!(!game.send(Event::SelectClue(clue)));
        assert!(!game.send(Event::SelectClue(ClueRef::new(6, 0))));
        assert!(!game.send(Event::SelectClue(ClueRef::new(0, 5))));
        assert_eq!(game.state(), State::ShowBoard);
        assert_eq!(game.context().current_clue, None);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let results = Results::Normal {
            correct: Some(PlayerId::new("p2")),
            incorrect: vec![PlayerId::new("p1")],
        };
        let mut first = game_on_board(21);
        let mut second = game_on_board(21);
        let clue = first_clue(&first, false);

        play(&mut first, clue, results.clone());
        play(&mut second, clue, results);
        assert_eq!(first.context(), second.context());
    }

    #[test]
    fn test_apply_results_ignores_mismatched_shape() {
        let mut players = two_players();
        let cell = BoardCell {
            question: "q".to_string(),
            answer: "a".to_string(),
            value: 400,
            revealed: false,
            is_double: true,
        };

        apply_results(&mut players, &cell, &Results::nobody());
        assert_eq!(players, two_players());
    }

    #[test]
    fn test_extreme_values_saturate() {
        let mut players = two_players();
        let normal = BoardCell {
            question: "q".to_string(),
            answer: "a".to_string(),
            value: i64::MIN,
            revealed: false,
            is_double: false,
        };
        apply_results(
            &mut players,
            &normal,
            &Results::Normal {
                correct: None,
                incorrect: vec![PlayerId::new("p1")],
            },
        );
        assert_eq!(players[0].score, i64::MAX);

        let wager = BoardCell {
            is_double: true,
            ..normal
        };
        apply_results(
            &mut players,
            &wager,
            &Results::Wager {
                result: WagerOutcome::Incorrect,
                player_id: PlayerId::new("p2"),
            },
        );
        assert_eq!(players[1].score, i64::MAX);
    }

    #[test]
    fn test_scenario_e_game_over() {
        let mut game = game_on_board(13);
        let positions = game.context().board.positions().collect_vec();

        for (i, clue) in positions.iter().enumerate() {
            let double = game.context().board.cell(*clue).unwrap().is_double;
            let results = if double {
                Results::Wager {
                    result: WagerOutcome::Correct,
                    player_id: PlayerId::new("p1"),
                }
            } else {
                Results::Normal {
                    correct: Some(PlayerId::new("p2")),
                    incorrect: vec![],
                }
            };
            play(&mut game, *clue, results);

            let expected = if i + 1 == positions.len() {
                State::GameOver
            } else {
                State::ShowBoard
            };
            assert_eq!(game.state(), expected);
        }

        assert!(game.context().board.is_complete());
        for event in [
            Event::SelectClue(ClueRef::new(0, 0)),
            Event::RevealAnswer,
            Event::AnimationComplete,
            Event::Start,
        ] {
            assert!(!game.send(event));
            assert_eq!(game.state(), State::GameOver);
        }
    }

    #[test]
    fn test_new_game_resets_context_but_keeps_bank() {
        let mut game = game_on_board(8);
        let clue = first_clue(&game, false);
        play(&mut game, clue, Results::nobody());

        assert!(game.send(Event::NewGame));
        assert_eq!(game.state(), State::SelectPlayers);
        assert_eq!(game.context(), &GameContext::with_questions(bank()));
    }

    #[test]
    fn test_new_game_from_game_over() {
        let mut game = game_on_board(8);
        for clue in game.context().board.positions().collect_vec() {
            let results = if game.context().board.cell(clue).unwrap().is_double {
                Results::Wager {
                    result: WagerOutcome::Incorrect,
                    player_id: PlayerId::new("p1"),
                }
            } else {
                Results::nobody()
            };
            play(&mut game, clue, results);
        }
        assert_eq!(game.state(), State::GameOver);

        assert!(game.send(Event::NewGame));
        assert_eq!(game.state(), State::SelectPlayers);
        assert!(game.context().players.is_empty());
        assert!(game.context().categories.is_empty());
        assert!(game.context().board.is_empty());
        assert_eq!(game.context().current_clue, None);
        assert!(game.context().selected_category_ids.is_empty());
        assert_eq!(game.context().all_questions, bank());
    }

    #[test]
    fn test_new_game_is_ignored_mid_clue() {
        let mut game = game_on_board(8);
        let clue = first_clue(&game, false);
        game.send(Event::SelectClue(clue));

        assert!(!game.send(Event::NewGame));
        assert_eq!(
            game.state(),
            State::ShowQuestion(QuestionState::QuestionRevealed)
        );
    }

    #[test]
    fn test_empty_board_ends_immediately() {
        let mut game = Game::new(bank());
        game.send(Event::Start);
        game.send(Event::PlayersConfirmed {
            players: two_players(),
        });
        assert!(game.send(Event::CategoriesConfirmed {
            category_ids: ids(&["u", "v", "w", "x", "y", "z"])
        }));
        game.send(Event::AnimationComplete);

        assert!(game.context().board.is_empty());
        assert_eq!(check_board(&game.context().board), State::GameOver);
    }

    #[test]
    fn test_check_board_is_idempotent() {
        let game = game_on_board(3);
        let board = &game.context().board;
        assert_eq!(check_board(board), check_board(board));
        assert_eq!(check_board(board), State::ShowBoard);
    }

    #[test]
    fn test_automatic_states_are_never_observed() {
        let mut game = game_on_board(17);
        for clue in game.context().board.positions().collect_vec() {
            assert!(game.send(Event::SelectClue(clue)));
            assert!(!game.state().is_automatic());
            if game.state() == State::ShowQuestion(QuestionState::DoubleAnimation) {
                game.send(Event::DoubleAnimDone);
            }
            game.send(Event::RevealAnswer);
            let results = if game.context().is_double_clue() {
                Results::Wager {
                    result: WagerOutcome::Correct,
                    player_id: PlayerId::new("p2"),
                }
            } else {
                Results::nobody()
            };
            assert!(game.send(Event::SubmitResults(results)));
            assert!(!game.state().is_automatic());
        }
    }

    #[test]
    fn test_standings_and_leaders() {
        let mut context = GameContext::default();
        context.players = vec![
            Player::new("p1", "Ada"),
            Player::new("p2", "Grace"),
            Player::new("p3", "Linus"),
        ];
        context.players[0].score = 400;
        context.players[1].score = -200;
        context.players[2].score = 400;

        let order = context
            .standings()
            .into_iter()
            .map(|p| p.id.as_str())
            .collect_vec();
        assert_eq!(order, vec!["p2", "p1", "p3"]);

        let leaders = context
            .leaders()
            .into_iter()
            .map(|p| p.id.as_str())
            .collect_vec();
        assert_eq!(leaders, vec!["p1", "p3"]);
    }

    #[test]
    fn test_snapshot_wire_format() {
        let mut game = game_on_board(6);
        let clue = first_clue(&game, false);
        game.send(Event::SelectClue(clue));

        let json = serde_json::to_value(game.snapshot()).unwrap();
        assert_eq!(json["state"], "showQuestion.questionRevealed");
        assert_eq!(json["context"]["currentClue"]["col"], clue.col);
        assert!(json["context"]["allQuestions"].is_array());
        assert!(json["context"]["selectedCategoryIds"].is_array());
        assert!(json["context"]["board"][0][0]["isDouble"].is_boolean());
    }
}
