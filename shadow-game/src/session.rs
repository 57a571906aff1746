//! The companion session: one owner for all app state and the only place
//! it is mutated from.
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::SnapshotStore;
use crate::catalog::{CosmeticCatalog, CosmeticKind};
use crate::constants::{
    DAILY_VISIT_XP, GUEST_NAME_PREFIX, GUEST_NAME_SPACE, STORAGE_KEY, TAP_REWARD_INTERVAL,
    TAP_REWARD_XP,
};
use crate::diary::{DiaryEntry, DiaryLog};
use crate::history::{GameHistory, GameScoreRecord, ProfileSummary};
use crate::minigames::puzzle::Board;
use crate::minigames::{
    MemoryCandle, MemoryTap, Minigame, MinigameId, MoveOutcome, PuzzleError, RewardSink,
    RoundResult, SlidingPuzzle, TapTheGhost,
};
use crate::progression::{LevelUpReport, Mood, ProgressionEngine, mood_for_interactions};
use crate::rng::RngBundle;
use crate::snapshot::{Settings, Snapshot, SnapshotError, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Route {
    #[default]
    Splash,
    Auth,
    Home,
    Games,
    Diary,
    Profile,
    Settings,
}

impl Route {
    pub const ALL: [Self; 7] = [
        Self::Splash,
        Self::Auth,
        Self::Home,
        Self::Games,
        Self::Diary,
        Self::Profile,
        Self::Settings,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Splash => "splash",
            Self::Auth => "auth",
            Self::Home => "home",
            Self::Games => "games",
            Self::Diary => "diary",
            Self::Profile => "profile",
            Self::Settings => "settings",
        }
    }

    /// Routes behind the sign-in screen.
    #[must_use]
    pub const fn requires_user(self) -> bool {
        !matches!(self, Self::Splash | Self::Auth)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|route| route.as_str() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("email address {0:?} is not valid")]
    InvalidEmail(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RoundStartError {
    #[error("sign in before starting a round")]
    SignedOut,
    #[error(transparent)]
    Board(#[from] PuzzleError),
}

/// Handle to one started round. Stale once another round starts or the
/// round is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundTicket {
    game: MinigameId,
    generation: u64,
}

impl RoundTicket {
    #[must_use]
    pub const fn game(self) -> MinigameId {
        self.game
    }

    #[must_use]
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

/// The minigame currently on screen.
#[derive(Debug, Clone)]
pub enum ActiveRound {
    Puzzle(SlidingPuzzle<ChaCha20Rng>),
    Memory(MemoryCandle<ChaCha20Rng>),
    Ghost(TapTheGhost<ChaCha20Rng>),
}

impl ActiveRound {
    #[must_use]
    pub fn as_minigame(&self) -> &dyn Minigame {
        match self {
            Self::Puzzle(game) => game,
            Self::Memory(game) => game,
            Self::Ghost(game) => game,
        }
    }

    fn as_minigame_mut(&mut self) -> &mut dyn Minigame {
        match self {
            Self::Puzzle(game) => game,
            Self::Memory(game) => game,
            Self::Ghost(game) => game,
        }
    }

    #[must_use]
    pub const fn as_puzzle(&self) -> Option<&SlidingPuzzle<ChaCha20Rng>> {
        match self {
            Self::Puzzle(game) => Some(game),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_memory(&self) -> Option<&MemoryCandle<ChaCha20Rng>> {
        match self {
            Self::Memory(game) => Some(game),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_ghost(&self) -> Option<&TapTheGhost<ChaCha20Rng>> {
        match self {
            Self::Ghost(game) => Some(game),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct RoundSlot {
    ticket: RoundTicket,
    round: ActiveRound,
    settled: bool,
}

/// What a single companion tap did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapOutcome {
    pub taps: u32,
    pub mood: Mood,
    pub reward: Option<LevelUpReport>,
}

#[derive(Debug)]
pub struct CompanionSession<S: SnapshotStore> {
    store: S,
    engine: ProgressionEngine,
    diary: DiaryLog,
    history: GameHistory,
    settings: Settings,
    user: Option<UserProfile>,
    last_daily_visit: Option<NaiveDate>,
    taps: u32,
    rng: RngBundle,
    route: Route,
    round: Option<RoundSlot>,
    round_generation: u64,
    last_result: Option<RoundResult>,
}

impl<S: SnapshotStore> CompanionSession<S> {
    /// Fresh session that ignores anything already in `store`.
    #[must_use]
    pub fn new(store: S, seed: u64, now: DateTime<Utc>) -> Self {
        let engine = ProgressionEngine::new(CosmeticCatalog::default(), now);
        Self::assemble(store, seed, engine, Snapshot::default())
    }

    /// Load the saved snapshot, falling back to a fresh companion if it is
    /// missing or unreadable.
    #[must_use]
    pub fn open(store: S, seed: u64) -> Self {
        let payload = store.read(STORAGE_KEY).unwrap_or_else(|err| {
            log::warn!("could not read saved snapshot: {err}");
            None
        });
        let mut snapshot = Snapshot::decode_or_default(payload.as_deref());
        let companion = std::mem::take(&mut snapshot.companion);
        let engine = ProgressionEngine::from_state(CosmeticCatalog::default(), companion);
        Self::assemble(store, seed, engine, snapshot)
    }

    fn assemble(store: S, seed: u64, engine: ProgressionEngine, snapshot: Snapshot) -> Self {
        Self {
            store,
            engine,
            diary: snapshot.diary,
            history: snapshot.history,
            settings: snapshot.settings,
            user: snapshot.user,
            last_daily_visit: snapshot.last_daily_visit,
            taps: 0,
            rng: RngBundle::from_user_seed(seed),
            route: Route::Splash,
            round: None,
            round_generation: 0,
            last_result: None,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            companion: self.engine.state().clone(),
            diary: self.diary.clone(),
            history: self.history.clone(),
            settings: self.settings,
            user: self.user.clone(),
            last_daily_visit: self.last_daily_visit,
        }
    }

    /// Persist everything under the storage key.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the store write fails.
    pub fn save(&self) -> Result<(), SnapshotError> {
        let payload = self.snapshot().to_json()?;
        self.store
            .write(STORAGE_KEY, &payload)
            .map_err(|err| SnapshotError::Store(err.to_string()))
    }

    /// Wipe progress, diary, history, settings and the signed-in user, and
    /// delete the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot delete the snapshot. In-memory
    /// state is reset either way.
    pub fn reset_all(&mut self, now: DateTime<Utc>) -> Result<(), SnapshotError> {
        self.discard_round();
        self.engine = ProgressionEngine::new(self.engine.catalog().clone(), now);
        self.diary.clear();
        self.history.clear();
        self.settings = Settings::default();
        self.user = None;
        self.last_daily_visit = None;
        self.taps = 0;
        self.route = Route::Auth;
        log::info!("all companion data reset");
        self.store
            .delete(STORAGE_KEY)
            .map_err(|err| SnapshotError::Store(err.to_string()))
    }

    // Navigation ------------------------------------------------------------

    #[must_use]
    pub const fn route(&self) -> Route {
        self.route
    }

    /// Where the splash screen hands off to.
    #[must_use]
    pub const fn landing_route(&self) -> Route {
        if self.user.is_some() {
            Route::Home
        } else {
            Route::Auth
        }
    }

    pub fn finish_splash(&mut self, now: DateTime<Utc>) -> Route {
        let landing = self.landing_route();
        self.navigate(landing, now)
    }

    /// Switch screens. Leaving the games screen discards any running round;
    /// signed-out users are sent to the auth screen. Home and diary visits
    /// use the UTC calendar day of `now`.
    pub fn navigate(&mut self, route: Route, now: DateTime<Utc>) -> Route {
        let route = if route.requires_user() && self.user.is_none() {
            Route::Auth
        } else {
            route
        };
        if route != Route::Games {
            self.discard_round();
        }
        self.route = route;
        match route {
            Route::Home => {
                self.visit_home(now);
            }
            Route::Diary => {
                self.open_diary(now.date_naive());
            }
            _ => {}
        }
        route
    }

    // Accounts --------------------------------------------------------------

    #[must_use]
    pub const fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn login_as_guest(&mut self, now: DateTime<Utc>) -> &UserProfile {
        let suffix = self.rng.account().gen_range(0..=GUEST_NAME_SPACE);
        let profile = UserProfile {
            id: format!("guest_{}", now.timestamp_millis()),
            username: format!("{GUEST_NAME_PREFIX}{suffix}"),
            email: None,
            is_guest: true,
            joined_at: now,
        };
        log::info!("guest {} signed in", profile.username);
        self.sign_in_profile(profile, now)
    }

    /// Store a non-guest profile. Nothing is authenticated.
    ///
    /// # Errors
    ///
    /// Rejects a blank username or an email without `@`.
    pub fn sign_in(
        &mut self,
        username: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<&UserProfile, AccountError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AccountError::EmptyUsername);
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(AccountError::InvalidEmail(email.to_string()));
        }
        let profile = UserProfile {
            id: format!("user_{}", now.timestamp_millis()),
            username: username.to_string(),
            email: Some(email.to_string()),
            is_guest: false,
            joined_at: now,
        };
        log::info!("{username} signed in");
        Ok(self.sign_in_profile(profile, now))
    }

    fn sign_in_profile(&mut self, profile: UserProfile, now: DateTime<Utc>) -> &UserProfile {
        self.discard_round();
        self.route = Route::Home;
        self.visit_home(now);
        self.user.insert(profile)
    }

    /// Sign out. Progress stays on the device.
    pub fn logout(&mut self) {
        self.discard_round();
        self.user = None;
        self.taps = 0;
        self.route = Route::Auth;
    }

    // Home ------------------------------------------------------------------

    /// Award the daily visit bonus the first time home is shown each day.
    /// Returns the report when the bonus was paid.
    ///
    /// Days roll over at UTC midnight. Callers that want a local day pass
    /// a `now` shifted by their UTC offset.
    pub fn visit_home(&mut self, now: DateTime<Utc>) -> Option<LevelUpReport> {
        self.taps = 0;
        let today = now.date_naive();
        if self.last_daily_visit == Some(today) {
            return None;
        }
        self.last_daily_visit = Some(today);
        log::debug!("daily visit bonus for {today}");
        Some(self.engine.apply_xp(DAILY_VISIT_XP))
    }

    /// Calendar day the daily bonus was last paid.
    #[must_use]
    pub const fn last_daily_visit(&self) -> Option<NaiveDate> {
        self.last_daily_visit
    }

    /// Poke the companion.
    pub fn tap_companion(&mut self, now: DateTime<Utc>) -> TapOutcome {
        self.taps = self.taps.saturating_add(1);
        self.engine.record_interaction(now);
        if let Some(mood) = mood_for_interactions(self.taps) {
            self.engine.update_mood(mood);
        }
        let reward = (self.taps % TAP_REWARD_INTERVAL == 0)
            .then(|| self.engine.apply_xp(TAP_REWARD_XP));
        TapOutcome {
            taps: self.taps,
            mood: self.engine.state().mood(),
            reward,
        }
    }

    pub fn set_mood(&mut self, mood: Mood) {
        self.engine.update_mood(mood);
    }

    /// Equip an unlocked cosmetic; locked ids are ignored.
    pub fn equip(&mut self, kind: CosmeticKind, id: &str) -> bool {
        self.engine.equip(kind, id)
    }

    #[must_use]
    pub const fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    // Diary -----------------------------------------------------------------

    pub fn open_diary(&mut self, today: NaiveDate) -> &DiaryEntry {
        self.diary.open_today(today, self.rng.diary())
    }

    #[must_use]
    pub fn today_line(&self, today: NaiveDate) -> Option<&str> {
        self.diary.today_line(today)
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        self.diary.toggle_favorite(id)
    }

    pub fn favorites(&self) -> impl Iterator<Item = &DiaryEntry> + '_ {
        self.diary.favorites()
    }

    #[must_use]
    pub const fn diary(&self) -> &DiaryLog {
        &self.diary
    }

    // Profile and settings --------------------------------------------------

    #[must_use]
    pub const fn history(&self) -> &GameHistory {
        &self.history
    }

    #[must_use]
    pub fn profile_summary(&self) -> ProfileSummary {
        self.history.summary()
    }

    #[must_use]
    pub const fn settings(&self) -> Settings {
        self.settings
    }

    pub fn toggle_sound(&mut self) -> bool {
        self.settings.sound_enabled = !self.settings.sound_enabled;
        self.settings.sound_enabled
    }

    pub fn set_festival_mode(&mut self, enabled: bool) {
        self.settings.festival_mode = enabled;
    }

    // Rounds ----------------------------------------------------------------

    /// Start a round of `game`, discarding whatever was running.
    ///
    /// # Errors
    ///
    /// Refuses to start while signed out; nothing changes in that case.
    pub fn start_round(
        &mut self,
        game: MinigameId,
        now: DateTime<Utc>,
    ) -> Result<RoundTicket, RoundStartError> {
        let rng = self.prepare_round(game)?;
        let round = match game {
            MinigameId::ShadowPuzzle => {
                let mut puzzle = SlidingPuzzle::new(rng);
                puzzle.start();
                ActiveRound::Puzzle(puzzle)
            }
            MinigameId::MemoryCandle => {
                let mut memory = MemoryCandle::new(rng);
                memory.start();
                ActiveRound::Memory(memory)
            }
            MinigameId::TapGhost => {
                let mut ghost = TapTheGhost::new(rng);
                ghost.start();
                ActiveRound::Ghost(ghost)
            }
        };
        Ok(self.install_round(game, round, now))
    }

    /// Start a puzzle round from a given board.
    ///
    /// # Errors
    ///
    /// Refuses to start while signed out. Rejects boards that are not
    /// solvable permutations; the previous round is still discarded.
    pub fn start_puzzle_with_board(
        &mut self,
        board: Board,
        now: DateTime<Utc>,
    ) -> Result<RoundTicket, RoundStartError> {
        let rng = self.prepare_round(MinigameId::ShadowPuzzle)?;
        let mut puzzle = SlidingPuzzle::new(rng);
        puzzle.start_with_board(board)?;
        Ok(self.install_round(MinigameId::ShadowPuzzle, ActiveRound::Puzzle(puzzle), now))
    }

    /// Start a memory round at a later level.
    ///
    /// # Errors
    ///
    /// Refuses to start while signed out.
    pub fn start_memory_at_level(
        &mut self,
        level: u32,
        now: DateTime<Utc>,
    ) -> Result<RoundTicket, RoundStartError> {
        let rng = self.prepare_round(MinigameId::MemoryCandle)?;
        let mut memory = MemoryCandle::new(rng);
        memory.start_at_level(level);
        Ok(self.install_round(MinigameId::MemoryCandle, ActiveRound::Memory(memory), now))
    }

    fn prepare_round(&mut self, game: MinigameId) -> Result<ChaCha20Rng, RoundStartError> {
        if self.user.is_none() {
            log::debug!("refusing {game} round while signed out");
            return Err(RoundStartError::SignedOut);
        }
        self.discard_round();
        Ok(self.rng.fork_round(game))
    }

    fn install_round(
        &mut self,
        game: MinigameId,
        round: ActiveRound,
        now: DateTime<Utc>,
    ) -> RoundTicket {
        self.round_generation = self.round_generation.wrapping_add(1);
        let ticket = RoundTicket {
            game,
            generation: self.round_generation,
        };
        log::debug!("started {game} round {}", ticket.generation);
        self.route = Route::Games;
        self.round = Some(RoundSlot {
            ticket,
            round,
            settled: false,
        });
        self.settle_finished(now);
        ticket
    }

    /// Drop the running round without XP or a history record.
    pub fn discard_round(&mut self) {
        if let Some(slot) = self.round.take()
            && !slot.settled
        {
            log::debug!(
                "discarded unfinished {} round {}",
                slot.ticket.game,
                slot.ticket.generation
            );
        }
    }

    #[must_use]
    pub fn active_round(&self) -> Option<&ActiveRound> {
        self.round.as_ref().map(|slot| &slot.round)
    }

    #[must_use]
    pub fn active_ticket(&self) -> Option<RoundTicket> {
        self.round.as_ref().map(|slot| slot.ticket)
    }

    /// Result of the most recently settled round.
    #[must_use]
    pub const fn last_result(&self) -> Option<RoundResult> {
        self.last_result
    }

    fn live_round(&mut self, ticket: RoundTicket) -> Option<&mut ActiveRound> {
        match self.round.as_mut() {
            Some(slot) if slot.ticket == ticket => Some(&mut slot.round),
            _ => {
                log::debug!(
                    "ignoring stale {} ticket {}",
                    ticket.game,
                    ticket.generation
                );
                None
            }
        }
    }

    pub fn puzzle_move(
        &mut self,
        ticket: RoundTicket,
        index: usize,
        now: DateTime<Utc>,
    ) -> MoveOutcome {
        let outcome = match self.live_round(ticket) {
            Some(ActiveRound::Puzzle(puzzle)) => puzzle.try_move(index),
            _ => MoveOutcome::Ignored,
        };
        self.settle_finished(now);
        outcome
    }

    pub fn memory_tap(&mut self, ticket: RoundTicket, candle: u8, now: DateTime<Utc>) -> MemoryTap {
        let outcome = match self.live_round(ticket) {
            Some(ActiveRound::Memory(memory)) => memory.tap(candle),
            _ => MemoryTap::Ignored,
        };
        self.settle_finished(now);
        outcome
    }

    pub fn ghost_tap(&mut self, ticket: RoundTicket, ghost: u64, now: DateTime<Utc>) -> Option<u8> {
        let points = match self.live_round(ticket) {
            Some(ActiveRound::Ghost(game)) => game.tap(ghost),
            _ => None,
        };
        self.settle_finished(now);
        points
    }

    /// Run the round clock forward. Returns the result if the round ended
    /// during this call.
    pub fn advance(
        &mut self,
        ticket: RoundTicket,
        elapsed_ms: u64,
        now: DateTime<Utc>,
    ) -> Option<RoundResult> {
        self.live_round(ticket)?
            .as_minigame_mut()
            .advance(elapsed_ms);
        self.settle_finished(now)
    }

    fn settle_finished(&mut self, now: DateTime<Utc>) -> Option<RoundResult> {
        let slot = self.round.as_mut()?;
        if slot.settled {
            return None;
        }
        let result = slot.round.as_minigame().result()?;
        slot.settled = true;
        result.settle(self, now);
        self.last_result = Some(result);
        Some(result)
    }
}

impl<S: SnapshotStore> RewardSink for CompanionSession<S> {
    fn award_xp(&mut self, amount: u32) {
        self.engine.apply_xp(u64::from(amount));
    }

    fn record_game_result(&mut self, record: GameScoreRecord) {
        self.history.record(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PUZZLE_SOLVED;
    use crate::snapshot::MemoryStore;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0).unwrap()
    }

    fn signed_in() -> CompanionSession<MemoryStore> {
        let mut session = CompanionSession::new(MemoryStore::new(), 7, at(1, 9));
        session.login_as_guest(at(1, 9));
        session
    }

    #[test]
    fn splash_lands_on_auth_until_signed_in() {
        let mut session = CompanionSession::new(MemoryStore::new(), 1, at(1, 9));
        assert_eq!(session.route(), Route::Splash);
        assert_eq!(session.finish_splash(at(1, 9)), Route::Auth);
        assert_eq!(session.navigate(Route::Games, at(1, 9)), Route::Auth);

        let guest = session.login_as_guest(at(1, 9)).clone();
        assert!(guest.is_guest);
        assert!(guest.id.starts_with("guest_"));
        assert!(guest.username.starts_with("Shadow"));
        assert_eq!(session.route(), Route::Home);
        assert_eq!(session.landing_route(), Route::Home);

        session.logout();
        assert_eq!(session.route(), Route::Auth);
        assert!(session.user().is_none());
    }

    #[test]
    fn sign_in_validates_fields() {
        let mut session = CompanionSession::new(MemoryStore::new(), 1, at(1, 9));
        assert_eq!(
            session.sign_in("  ", "a@b", at(1, 9)).unwrap_err(),
            AccountError::EmptyUsername
        );
        assert!(matches!(
            session.sign_in("wisp", "nope", at(1, 9)),
            Err(AccountError::InvalidEmail(_))
        ));
        let user = session.sign_in("wisp", "wisp@night.example", at(1, 9)).unwrap();
        assert!(!user.is_guest);
        assert_eq!(user.username, "wisp");
    }

    #[test]
    fn daily_bonus_once_per_day() {
        let mut session = signed_in();
        // Signing in landed on home, paying today's bonus.
        assert_eq!(session.engine().state().xp(), 5);
        assert!(session.visit_home(at(1, 20)).is_none());
        assert_eq!(session.engine().state().xp(), 5);
        assert!(session.visit_home(at(2, 8)).is_some());
        assert_eq!(session.engine().state().xp(), 10);
    }

    #[test]
    fn daily_bonus_rolls_over_at_utc_midnight() {
        let mut session = signed_in();
        let before_midnight = Utc.with_ymd_and_hms(2025, 10, 1, 23, 59, 59).unwrap();
        let after_midnight = Utc.with_ymd_and_hms(2025, 10, 2, 0, 0, 1).unwrap();

        assert!(session.visit_home(before_midnight).is_none());
        assert!(session.visit_home(after_midnight).is_some());
        assert_eq!(session.last_daily_visit(), Some(after_midnight.date_naive()));

        session.navigate(Route::Diary, after_midnight);
        assert_eq!(session.diary().entries()[0].date, after_midnight.date_naive());
    }

    #[test]
    fn taps_shift_mood_and_pay_every_tenth() {
        let mut session = signed_in();
        let xp_before = session.engine().state().xp();
        let outcomes: Vec<_> = (0..11).map(|_| session.tap_companion(at(1, 10))).collect();
        assert_eq!(outcomes[4].mood, Mood::Happy);
        assert_eq!(outcomes[5].mood, Mood::Playful);
        assert!(outcomes[8].reward.is_none());
        assert!(outcomes[9].reward.is_some());
        assert_eq!(outcomes[10].mood, Mood::Excited);
        assert_eq!(session.engine().state().xp(), xp_before + 2);
        assert_eq!(session.engine().state().last_interaction(), at(1, 10));
    }

    #[test]
    fn solved_board_settles_once() {
        let mut session = signed_in();
        let xp_before = session.engine().state().xp();
        let ticket = session
            .start_puzzle_with_board(PUZZLE_SOLVED, at(1, 11))
            .unwrap();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.engine().state().xp(), xp_before + 10);
        assert_eq!(session.last_result().unwrap().xp, 10);

        // Later calls against the finished round do not pay again.
        assert!(session.advance(ticket, 5_000, at(1, 11)).is_none());
        assert_eq!(session.puzzle_move(ticket, 5, at(1, 11)), MoveOutcome::Ignored);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn signed_out_sessions_cannot_start_rounds() {
        let mut session = CompanionSession::new(MemoryStore::new(), 3, at(1, 9));
        for game in MinigameId::ALL {
            assert_eq!(
                session.start_round(game, at(1, 9)),
                Err(RoundStartError::SignedOut)
            );
        }
        assert_eq!(
            session.start_puzzle_with_board(PUZZLE_SOLVED, at(1, 9)),
            Err(RoundStartError::SignedOut)
        );
        assert_eq!(
            session.start_memory_at_level(5, at(1, 9)),
            Err(RoundStartError::SignedOut)
        );
        assert_eq!(session.route(), Route::Splash);
        assert!(session.active_round().is_none());
        assert!(session.history().is_empty());
        assert_eq!(session.engine().state().xp(), 0);

        session.login_as_guest(at(1, 9));
        session.logout();
        assert_eq!(
            session.start_round(MinigameId::TapGhost, at(1, 9)),
            Err(RoundStartError::SignedOut)
        );
        assert_eq!(session.route(), Route::Auth);
    }

    #[test]
    fn bad_boards_are_reported_as_board_errors() {
        let mut session = signed_in();
        let mut board = PUZZLE_SOLVED;
        board.swap(0, 1);
        assert_eq!(
            session.start_puzzle_with_board(board, at(1, 10)),
            Err(RoundStartError::Board(PuzzleError::Unsolvable))
        );
        assert!(session.active_round().is_none());
    }

    #[test]
    fn stale_tickets_are_ignored() {
        let mut session = signed_in();
        let old = session.start_round(MinigameId::TapGhost, at(1, 12)).unwrap();
        session.advance(old, 800, at(1, 12));
        let fresh = session.start_round(MinigameId::TapGhost, at(1, 12)).unwrap();
        assert_ne!(old, fresh);
        assert!(session.advance(old, 60_000, at(1, 12)).is_none());
        assert_eq!(session.ghost_tap(old, 0, at(1, 12)), None);
        let ghost = session.active_round().unwrap().as_ghost().unwrap();
        assert_eq!(ghost.time_left(), 30);
        assert!(session.history().is_empty());
    }

    #[test]
    fn leaving_games_discards_round_without_reward() {
        let mut session = signed_in();
        let xp_before = session.engine().state().xp();
        let ticket = session.start_round(MinigameId::MemoryCandle, at(1, 13)).unwrap();
        session.advance(ticket, 1_000, at(1, 13));
        session.navigate(Route::Profile, at(1, 13));
        assert!(session.active_round().is_none());
        assert!(session.advance(ticket, 60_000, at(1, 13)).is_none());
        assert_eq!(session.engine().state().xp(), xp_before);
        assert!(session.history().is_empty());
    }

    #[test]
    fn save_and_open_round_trip() {
        let store = MemoryStore::new();
        let mut session = CompanionSession::new(store.clone(), 3, at(1, 9));
        session.login_as_guest(at(1, 9));
        let entry_id = session.open_diary(at(1, 9).date_naive()).id.clone();
        session.toggle_favorite(&entry_id);
        session.set_festival_mode(true);
        session.save().unwrap();

        let reopened = CompanionSession::open(store.clone(), 3);
        assert_eq!(reopened.snapshot(), session.snapshot());
        assert_eq!(reopened.landing_route(), Route::Home);
        assert_eq!(reopened.favorites().count(), 1);

        store.put_raw(STORAGE_KEY, "{\"companion\": 12");
        let recovered = CompanionSession::open(store, 3);
        assert_eq!(recovered.engine().state().level(), 1);
        assert!(recovered.user().is_none());
    }

    #[test]
    fn reset_all_wipes_everything() {
        let store = MemoryStore::new();
        let mut session = CompanionSession::new(store.clone(), 5, at(1, 9));
        session.login_as_guest(at(1, 9));
        session.start_puzzle_with_board(PUZZLE_SOLVED, at(1, 9)).unwrap();
        session.toggle_sound();
        session.save().unwrap();

        session.reset_all(at(2, 9)).unwrap();
        assert!(store.raw(STORAGE_KEY).is_none());
        assert_eq!(session.engine().state().xp(), 0);
        assert!(session.history().is_empty());
        assert!(session.settings().sound_enabled);
        assert_eq!(session.route(), Route::Auth);
    }
}
