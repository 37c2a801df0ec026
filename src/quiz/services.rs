use std::collections::{BTreeMap, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::quiz::{
    dto::{CardType, QuizStats, RecentAttempt},
    repo::{self, AttemptWithCard, QuizCard},
};
use crate::state::AppState;

/// Attempts whose cards are held back from the next draw.
pub const RECENT_EXCLUSION: i64 = 20;
pub const MAX_STREAK: u32 = 365;
const RECENT_IN_STATS: usize = 10;

pub fn pick_card<'a, R: Rng + ?Sized>(cards: &'a [QuizCard], rng: &mut R) -> Option<&'a QuizCard> {
    cards.choose(rng)
}

/// Consecutive days ending `today` that have at least one entry in `days`.
pub fn compute_streak(today: Date, days: impl IntoIterator<Item = Date>) -> u32 {
    let days: HashSet<Date> = days.into_iter().collect();
    let mut streak = 0;
    let mut day = Some(today);
    while let Some(d) = day {
        if streak >= MAX_STREAK || !days.contains(&d) {
            break;
        }
        streak += 1;
        day = d.previous_day();
    }
    streak
}

/// `attempts` must be newest first.
pub fn build_stats(attempts: &[AttemptWithCard], now: OffsetDateTime) -> QuizStats {
    let count = |t: CardType| attempts.iter().filter(|a| a.card_type == t.as_str()).count();

    let mut category_stats = BTreeMap::new();
    for a in attempts {
        *category_stats.entry(a.category.clone()).or_insert(0) += 1;
    }

    let today = now.to_offset(time::UtcOffset::UTC).date();
    let streak = compute_streak(
        today,
        attempts
            .iter()
            .map(|a| a.completed_at.to_offset(time::UtcOffset::UTC).date()),
    );

    QuizStats {
        total_completed: attempts.len(),
        truths_completed: count(CardType::Truth),
        dares_completed: count(CardType::Dare),
        streak,
        last_played: attempts.first().map(|a| a.completed_at),
        category_stats,
        recent_attempts: attempts
            .iter()
            .take(RECENT_IN_STATS)
            .map(|a| RecentAttempt {
                id: a.id,
                card_type: a.card_type.clone(),
                category: a.category.clone(),
                completed_at: a.completed_at,
            })
            .collect(),
    }
}

/// Random active card, avoiding the user's recent ones when possible.
pub async fn draw_card(
    st: &AppState,
    user_id: Uuid,
    card_type: Option<CardType>,
) -> anyhow::Result<Option<QuizCard>> {
    let type_str = card_type.map(CardType::as_str);
    let recent = repo::recent_card_ids(&st.db, user_id, RECENT_EXCLUSION).await?;

    let mut cards = repo::active_cards(&st.db, type_str, &recent).await?;
    if cards.is_empty() && !recent.is_empty() {
        cards = repo::active_cards(&st.db, type_str, &[]).await?;
    }

    Ok(pick_card(&cards, &mut rand::thread_rng()).cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use time::macros::{date, datetime};

    fn attempt(card_type: &str, category: &str, at: OffsetDateTime) -> AttemptWithCard {
        AttemptWithCard {
            id: Uuid::new_v4(),
            card_type: card_type.into(),
            category: category.into(),
            completed_at: at,
        }
    }

    fn card(question: &str) -> QuizCard {
        QuizCard {
            id: Uuid::new_v4(),
            card_type: "truth".into(),
            question: question.into(),
            difficulty: "easy".into(),
            category: "food_facts".into(),
            is_active: true,
            created_at: datetime!(2025-01-01 0:00 UTC),
        }
    }

    #[test]
    fn streak_counts_back_from_today_until_a_gap() {
        let today = date!(2025 - 03 - 10);
        let days = [
            date!(2025 - 03 - 10),
            date!(2025 - 03 - 10),
            date!(2025 - 03 - 09),
            date!(2025 - 03 - 08),
            date!(2025 - 03 - 06),
        ];
        assert_eq!(compute_streak(today, days), 3);
    }

    #[test]
    fn streak_is_zero_without_a_completion_today() {
        let today = date!(2025 - 03 - 10);
        assert_eq!(compute_streak(today, [date!(2025 - 03 - 09)]), 0);
        assert_eq!(compute_streak(today, []), 0);
    }

    #[test]
    fn streak_is_capped() {
        let today = date!(2025 - 12 - 31);
        let mut days = Vec::new();
        let mut d = today;
        for _ in 0..400 {
            days.push(d);
            d = d.previous_day().unwrap();
        }
        assert_eq!(compute_streak(today, days), MAX_STREAK);
    }

    #[test]
    fn stats_aggregate_types_categories_and_recency() {
        let now = datetime!(2025-03-10 18:00 UTC);
        let mut attempts = vec![
            attempt("dare", "hydration", datetime!(2025-03-10 09:00 UTC)),
            attempt("truth", "food_facts", datetime!(2025-03-09 23:30 UTC)),
            attempt("truth", "food_facts", datetime!(2025-03-07 12:00 UTC)),
        ];
        for i in 0..10 {
            attempts.push(attempt("truth", "portion_control", datetime!(2025-02-01 12:00 UTC) - time::Duration::days(i)));
        }

        let stats = build_stats(&attempts, now);
        assert_eq!(stats.total_completed, 13);
        assert_eq!(stats.truths_completed, 12);
        assert_eq!(stats.dares_completed, 1);
        assert_eq!(stats.streak, 2);
        assert_eq!(stats.last_played, Some(datetime!(2025-03-10 09:00 UTC)));
        assert_eq!(stats.category_stats["food_facts"], 2);
        assert_eq!(stats.category_stats["portion_control"], 10);
        assert_eq!(stats.recent_attempts.len(), 10);
        assert_eq!(stats.recent_attempts[0].card_type, "dare");
    }

    #[test]
    fn empty_stats() {
        let stats = build_stats(&[], datetime!(2025-03-10 18:00 UTC));
        assert_eq!(stats.total_completed, 0);
        assert_eq!(stats.streak, 0);
        assert!(stats.last_played.is_none());
        assert!(stats.category_stats.is_empty());
    }

    #[test]
    fn stats_serialize_with_rfc3339_times() {
        let stats = build_stats(
            &[attempt("truth", "food_facts", datetime!(2025-03-10 09:00 UTC))],
            datetime!(2025-03-10 18:00 UTC),
        );
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["last_played"], "2025-03-10T09:00:00Z");
        assert_eq!(json["category_stats"]["food_facts"], 1);
    }

    #[test]
    fn pick_card_is_none_for_empty_bank_and_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(pick_card(&[], &mut rng).is_none());

        let cards = vec![card("a"), card("b"), card("c")];
        for _ in 0..20 {
            let picked = pick_card(&cards, &mut rng).unwrap();
            assert!(cards.iter().any(|c| c.id == picked.id));
        }
    }
}
