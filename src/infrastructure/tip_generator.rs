use crate::domain::models::{BlockedSite, FocusTip, TimerPhase, TipKind};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;

const WORK_QUOTES: [&str; 10] = [
    "Focus on the process, not the outcome.",
    "You can do anything, but not everything. Focus.",
    "Distractions are the enemy of greatness.",
    "One tomato at a time.",
    "Deep work creates value.",
    "Your future self is watching.",
    "Stay on target.",
    "Discipline is choosing what you want most over what you want now.",
    "The only way to do great work is to love what you do.",
    "Don't watch the clock; do what it does. Keep going.",
];

const BREAK_QUOTES: [&str; 8] = [
    "Rest is productive.",
    "Step away from the screen.",
    "Hydrate and stretch.",
    "Give your eyes a break.",
    "Breathe deeply.",
    "A tired mind makes mistakes. Rest up.",
    "Go look at something green.",
    "Stand up and move around.",
];

const SCOLDING_QUOTES: [&str; 5] = [
    "You said you wanted to work. Prove it.",
    "Close that tab. You have goals.",
    "Is scrolling paying your bills?",
    "That site isn't going anywhere. Your time is.",
    "Focus. You can browse later.",
];

const DEFAULT_SCOLDING_PROBABILITY: f64 = 0.3;

#[async_trait]
pub trait TipGenerator: Send + Sync {
    async fn get_tip(
        &self,
        blocked_sites: &[BlockedSite],
        phase: TimerPhase,
    ) -> Result<FocusTip, InfraError>;
}

/// Picks from local quote pools; scolds now and then when distractions are listed.
#[derive(Debug, Clone)]
pub struct CannedTipGenerator {
    scolding_probability: f64,
}

impl Default for CannedTipGenerator {
    fn default() -> Self {
        Self {
            scolding_probability: DEFAULT_SCOLDING_PROBABILITY,
        }
    }
}

impl CannedTipGenerator {
    #[cfg(test)]
    pub fn with_scolding_probability(mut self, probability: f64) -> Self {
        self.scolding_probability = probability.clamp(0.0, 1.0);
        self
    }

    fn pick(pool: &[&str], kind: TipKind) -> Result<FocusTip, InfraError> {
        let text = pool
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| InfraError::Tip("tip pool is empty".to_string()))?;
        Ok(FocusTip {
            text: (*text).to_string(),
            kind,
        })
    }
}

#[async_trait]
impl TipGenerator for CannedTipGenerator {
    async fn get_tip(
        &self,
        blocked_sites: &[BlockedSite],
        phase: TimerPhase,
    ) -> Result<FocusTip, InfraError> {
        if phase.is_break() {
            return Self::pick(&BREAK_QUOTES, TipKind::Strategy);
        }
        let scold = !blocked_sites.is_empty()
            && rand::thread_rng().gen_bool(self.scolding_probability);
        if scold {
            Self::pick(&SCOLDING_QUOTES, TipKind::Scolding)
        } else {
            Self::pick(&WORK_QUOTES, TipKind::Motivation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites() -> Vec<BlockedSite> {
        vec![BlockedSite {
            id: "1".to_string(),
            url: "reddit.com".to_string(),
            favicon: None,
        }]
    }

    #[tokio::test]
    async fn breaks_get_strategy_tips() {
        let generator = CannedTipGenerator::default();
        for phase in [TimerPhase::ShortBreak, TimerPhase::LongBreak] {
            let tip = generator.get_tip(&sites(), phase).await.expect("tip");
            assert_eq!(tip.kind, TipKind::Strategy);
            assert!(BREAK_QUOTES.contains(&tip.text.as_str()));
        }
    }

    #[tokio::test]
    async fn work_without_blocked_sites_never_scolds() {
        let generator = CannedTipGenerator::default().with_scolding_probability(1.0);
        let tip = generator.get_tip(&[], TimerPhase::Work).await.expect("tip");
        assert_eq!(tip.kind, TipKind::Motivation);
        assert!(WORK_QUOTES.contains(&tip.text.as_str()));
    }

    #[tokio::test]
    async fn work_with_blocked_sites_can_scold() {
        let generator = CannedTipGenerator::default().with_scolding_probability(1.0);
        let tip = generator.get_tip(&sites(), TimerPhase::Work).await.expect("tip");
        assert_eq!(tip.kind, TipKind::Scolding);
        assert!(SCOLDING_QUOTES.contains(&tip.text.as_str()));

        let generator = CannedTipGenerator::default().with_scolding_probability(0.0);
        let tip = generator.get_tip(&sites(), TimerPhase::Work).await.expect("tip");
        assert_eq!(tip.kind, TipKind::Motivation);
    }
}
