// Casino games - slots and roulette played against the shared coin balance.
//
// Every round is decided first and then settled through
// `EconomyService::settle_wager`, so the stake and the winnings land in one
// conditional write. A short per-game cooldown keeps channels readable.

use crate::core::cooldowns::{CooldownKind, CooldownTracker};
use crate::core::economy::{EconomyError, EconomyService, UserStore};
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// SLOTS
// ============================================================================

pub const SLOT_SYMBOLS: [&str; 7] = ["🍒", "🍋", "🍊", "🍇", "🍉", "⭐", "💎"];

/// Payout multiplier for three reels. Zero means the bet is lost.
pub fn slots_multiplier(reels: &[&str; 3]) -> i64 {
    let [a, b, c] = *reels;
    if a == b && b == c {
        match a {
            "💎" => 20,
            "⭐" => 15,
            "🍒" => 10,
            _ => 5,
        }
    } else if a == b || b == c || a == c {
        2
    } else {
        0
    }
}

// ============================================================================
// ROULETTE
// ============================================================================

/// Reds on a single-zero wheel.
const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouletteColor {
    Red,
    Black,
    Green,
}

impl RouletteColor {
    pub fn of(number: u8) -> Self {
        if number == 0 {
            Self::Green
        } else if RED_NUMBERS.contains(&number) {
            Self::Red
        } else {
            Self::Black
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Self::Red => "🔴",
            Self::Black => "⚫",
            Self::Green => "🟢",
        }
    }
}

/// Where the chips go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouletteBet {
    Color(RouletteColor),
    Number(u8),
}

impl RouletteBet {
    pub fn multiplier(self, landed: u8) -> i64 {
        match self {
            Self::Number(n) if n == landed => 36,
            Self::Color(RouletteColor::Green) if landed == 0 => 14,
            Self::Color(color) if color != RouletteColor::Green && RouletteColor::of(landed) == color => 2,
            _ => 0,
        }
    }
}

impl FromStr for RouletteBet {
    type Err = CasinoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let choice = s.trim().to_lowercase();
        match choice.as_str() {
            "red" => Ok(Self::Color(RouletteColor::Red)),
            "black" => Ok(Self::Color(RouletteColor::Black)),
            "green" => Ok(Self::Color(RouletteColor::Green)),
            other => match other.parse::<u8>() {
                Ok(n) if n <= 36 => Ok(Self::Number(n)),
                _ => Err(CasinoError::InvalidChoice(s.to_string())),
            },
        }
    }
}

impl fmt::Display for RouletteBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(RouletteColor::Red) => write!(f, "red"),
            Self::Color(RouletteColor::Black) => write!(f, "black"),
            Self::Color(RouletteColor::Green) => write!(f, "green"),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

// ============================================================================
// DOMAIN MODELS
// ============================================================================

#[derive(Debug, Clone)]
pub struct SlotsOutcome {
    pub reels: [&'static str; 3],
    pub multiplier: i64,
    pub bet: i64,
    pub payout: i64,
    pub new_balance: i64,
}

#[derive(Debug, Clone)]
pub struct RouletteOutcome {
    pub bet_on: RouletteBet,
    pub landed: u8,
    pub color: RouletteColor,
    pub multiplier: i64,
    pub bet: i64,
    pub payout: i64,
    pub new_balance: i64,
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum CasinoError {
    #[error("The minimum bet is {0} coins")]
    BetTooSmall(i64),

    #[error("Pick `red`, `black`, `green` or a number from 0 to 36 (got `{0}`)")]
    InvalidChoice(String),

    #[error("On cooldown for another {0:?}")]
    OnCooldown(Duration),

    #[error(transparent)]
    Economy(#[from] EconomyError),
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CasinoConfig {
    pub min_bet: i64,
    pub slots_cooldown: Duration,
    pub roulette_cooldown: Duration,
}

impl Default for CasinoConfig {
    fn default() -> Self {
        Self {
            min_bet: 10,
            slots_cooldown: Duration::from_secs(10),
            roulette_cooldown: Duration::from_secs(15),
        }
    }
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct CasinoService<S: UserStore> {
    economy: Arc<EconomyService<S>>,
    config: CasinoConfig,
    cooldowns: CooldownTracker,
}

impl<S: UserStore> CasinoService<S> {
    pub fn new(economy: Arc<EconomyService<S>>) -> Self {
        Self::new_with_config(economy, CasinoConfig::default())
    }

    pub fn new_with_config(economy: Arc<EconomyService<S>>, config: CasinoConfig) -> Self {
        Self {
            economy,
            config,
            cooldowns: CooldownTracker::new(),
        }
    }

    pub fn config(&self) -> &CasinoConfig {
        &self.config
    }

    pub async fn slots(&self, user_id: u64, bet: i64) -> Result<SlotsOutcome, CasinoError> {
        let reels = {
            let mut rng = rand::thread_rng();
            let mut spin = || *SLOT_SYMBOLS.choose(&mut rng).unwrap_or(&SLOT_SYMBOLS[0]);
            [spin(), spin(), spin()]
        };
        self.play_slots(user_id, bet, reels).await
    }

    async fn play_slots(
        &self,
        user_id: u64,
        bet: i64,
        reels: [&'static str; 3],
    ) -> Result<SlotsOutcome, CasinoError> {
        let multiplier = slots_multiplier(&reels);
        let payout = bet * multiplier;
        let new_balance = self
            .play(CooldownKind::Slots, self.config.slots_cooldown, user_id, bet, payout)
            .await?;

        tracing::info!(user_id, bet, payout, "Slots played");
        Ok(SlotsOutcome {
            reels,
            multiplier,
            bet,
            payout,
            new_balance,
        })
    }

    pub async fn roulette(
        &self,
        user_id: u64,
        bet: i64,
        bet_on: RouletteBet,
    ) -> Result<RouletteOutcome, CasinoError> {
        let landed = rand::thread_rng().gen_range(0..=36);
        self.play_roulette(user_id, bet, bet_on, landed).await
    }

    async fn play_roulette(
        &self,
        user_id: u64,
        bet: i64,
        bet_on: RouletteBet,
        landed: u8,
    ) -> Result<RouletteOutcome, CasinoError> {
        let multiplier = bet_on.multiplier(landed);
        let payout = bet * multiplier;
        let new_balance = self
            .play(CooldownKind::Roulette, self.config.roulette_cooldown, user_id, bet, payout)
            .await?;

        tracing::info!(user_id, bet, %bet_on, landed, payout, "Roulette played");
        Ok(RouletteOutcome {
            bet_on,
            landed,
            color: RouletteColor::of(landed),
            multiplier,
            bet,
            payout,
            new_balance,
        })
    }

    async fn play(
        &self,
        kind: CooldownKind,
        cooldown: Duration,
        user_id: u64,
        bet: i64,
        payout: i64,
    ) -> Result<i64, CasinoError> {
        if bet < self.config.min_bet {
            return Err(CasinoError::BetTooSmall(self.config.min_bet));
        }
        self.cooldowns
            .try_start(kind, user_id, cooldown)
            .map_err(CasinoError::OnCooldown)?;

        match self.economy.settle_wager(user_id, bet, payout).await {
            Ok(balance) => Ok(balance),
            Err(e) => {
                // A round that never settled shouldn't cost a cooldown.
                self.cooldowns.reset(kind, user_id);
                Err(e.into())
            }
        }
    }

    /// Forget expired slots and roulette cooldowns.
    pub fn prune_cooldowns(&self) -> usize {
        self.cooldowns
            .prune(CooldownKind::Slots, self.config.slots_cooldown)
            + self
                .cooldowns
                .prune(CooldownKind::Roulette, self.config.roulette_cooldown)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::economy::InMemoryUserStore;

    async fn casino_with(coins: i64) -> CasinoService<InMemoryUserStore> {
        let economy = Arc::new(EconomyService::new(InMemoryUserStore::new()));
        if coins > 0 {
            economy.award_coins(1, coins).await.unwrap();
        }
        CasinoService::new(economy)
    }

    #[test]
    fn slot_payouts() {
        assert_eq!(slots_multiplier(&["💎", "💎", "💎"]), 20);
        assert_eq!(slots_multiplier(&["⭐", "⭐", "⭐"]), 15);
        assert_eq!(slots_multiplier(&["🍒", "🍒", "🍒"]), 10);
        assert_eq!(slots_multiplier(&["🍇", "🍇", "🍇"]), 5);
        assert_eq!(slots_multiplier(&["🍇", "🍋", "🍇"]), 2);
        assert_eq!(slots_multiplier(&["🍇", "🍋", "🍉"]), 0);
    }

    #[test]
    fn roulette_payouts() {
        let red = RouletteBet::Color(RouletteColor::Red);
        let green = RouletteBet::Color(RouletteColor::Green);
        assert_eq!(red.multiplier(1), 2);
        assert_eq!(red.multiplier(2), 0);
        assert_eq!(red.multiplier(0), 0);
        assert_eq!(green.multiplier(0), 14);
        assert_eq!(RouletteBet::Number(17).multiplier(17), 36);
        assert_eq!(RouletteBet::Number(17).multiplier(18), 0);
        assert_eq!(RouletteColor::of(2), RouletteColor::Black);
    }

    #[test]
    fn roulette_choices_parse() {
        assert_eq!(
            "Red".parse::<RouletteBet>().unwrap(),
            RouletteBet::Color(RouletteColor::Red)
        );
        assert_eq!("0".parse::<RouletteBet>().unwrap(), RouletteBet::Number(0));
        assert_eq!("36".parse::<RouletteBet>().unwrap(), RouletteBet::Number(36));
        assert!(matches!(
            "37".parse::<RouletteBet>(),
            Err(CasinoError::InvalidChoice(_))
        ));
        assert!("purple".parse::<RouletteBet>().is_err());
    }

    #[tokio::test]
    async fn slots_jackpot_and_loss_settle_once() {
        let casino = casino_with(100).await;

        let win = casino.play_slots(1, 10, ["💎", "💎", "💎"]).await.unwrap();
        assert_eq!(win.payout, 200);
        assert_eq!(win.new_balance, 290);

        casino.cooldowns.reset(CooldownKind::Slots, 1);
        let loss = casino.play_slots(1, 90, ["🍇", "🍋", "🍉"]).await.unwrap();
        assert_eq!(loss.payout, 0);
        assert_eq!(loss.new_balance, 200);
    }

    #[tokio::test]
    async fn roulette_number_hit_pays_36x() {
        let casino = casino_with(50).await;
        let outcome = casino
            .play_roulette(1, 10, RouletteBet::Number(7), 7)
            .await
            .unwrap();
        assert_eq!(outcome.payout, 360);
        assert_eq!(outcome.new_balance, 400);
        assert_eq!(outcome.color, RouletteColor::Red);
    }

    #[tokio::test]
    async fn short_balance_loses_nothing_and_keeps_no_cooldown() {
        let casino = casino_with(30).await;

        let err = casino
            .play_roulette(1, 40, RouletteBet::Number(7), 7)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CasinoError::Economy(EconomyError::InsufficientFunds { .. })
        ));
        // No cooldown was left behind, so a covered bet goes straight through.
        let outcome = casino
            .play_roulette(1, 30, RouletteBet::Color(RouletteColor::Red), 2)
            .await
            .unwrap();
        assert_eq!(outcome.new_balance, 0);
    }

    #[tokio::test]
    async fn small_bets_and_spam_are_refused() {
        let casino = casino_with(500).await;
        assert!(matches!(
            casino.slots(1, 5).await,
            Err(CasinoError::BetTooSmall(10))
        ));

        casino.slots(1, 10).await.unwrap();
        assert!(matches!(
            casino.slots(1, 10).await,
            Err(CasinoError::OnCooldown(_))
        ));
        // Roulette has its own clock.
        assert!(casino
            .roulette(1, 10, RouletteBet::Color(RouletteColor::Black))
            .await
            .is_ok());
    }
}
