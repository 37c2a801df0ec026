//! Built-in truth and dare cards, inserted when the bank is empty.

use anyhow::Context;
use sqlx::PgPool;
use tracing::info;

use crate::quiz::{dto::CardType, repo};

/// `(question, difficulty, category)`
type SeedCard = (&'static str, &'static str, &'static str);

const TRUTH_CARDS: &[SeedCard] = &[
    ("How many servings of vegetables should adults eat daily? (Answer: 3-5 servings)", "easy", "nutrition_basics"),
    ("True or False: Drinking water helps boost your metabolism.", "easy", "nutrition_basics"),
    ("What percentage of your plate should be filled with fruits and vegetables? (Answer: About 50%)", "easy", "nutrition_basics"),
    ("How many grams of protein per kg of body weight do adults need daily? (Answer: 0.8-1g)", "medium", "nutrition_basics"),
    ("True or False: All fats are bad for your health.", "easy", "nutrition_basics"),
    ("Which has more vitamin C: an orange or a red bell pepper? (Answer: Red bell pepper)", "medium", "food_facts"),
    ("True or False: Brown eggs are more nutritious than white eggs.", "easy", "food_facts"),
    ("What nutrient is spinach particularly rich in? (Answer: Iron and folate)", "easy", "food_facts"),
    ("How many calories are in one gram of fat? (Answer: 9 calories)", "medium", "food_facts"),
    ("True or False: Eating carrots can improve your night vision.", "easy", "food_facts"),
    ("How many hours before bed should you stop eating for better sleep? (Answer: 2-3 hours)", "medium", "healthy_habits"),
    ("True or False: Skipping breakfast slows down your metabolism.", "medium", "healthy_habits"),
    ("What is the recommended daily water intake for adults? (Answer: 8-10 glasses or 2-3 liters)", "easy", "healthy_habits"),
    ("How many times should you chew each bite of food for optimal digestion? (Answer: 20-30 times)", "hard", "healthy_habits"),
    ("True or False: Eating slowly helps you eat less and feel fuller.", "easy", "healthy_habits"),
    ("How many teaspoons of sugar are in a typical can of soda? (Answer: 8-10 teaspoons)", "medium", "sugar_awareness"),
    ("True or False: Natural sugars in fruit are the same as added sugars in candy.", "medium", "sugar_awareness"),
    ("What is the WHO recommended daily limit for added sugar? (Answer: 25g or 6 teaspoons)", "hard", "sugar_awareness"),
    ("True or False: \"Sugar-free\" products are always healthier.", "easy", "sugar_awareness"),
    ("Which has more sugar: a banana or a chocolate chip cookie? (Answer: Usually the cookie)", "easy", "sugar_awareness"),
    ("What vitamin does your body produce when exposed to sunlight? (Answer: Vitamin D)", "easy", "vitamins_minerals"),
    ("True or False: You can get all your calcium from non-dairy sources.", "medium", "vitamins_minerals"),
    ("Which mineral is essential for healthy blood and prevents anemia? (Answer: Iron)", "easy", "vitamins_minerals"),
    ("What vitamin is crucial for blood clotting? (Answer: Vitamin K)", "hard", "vitamins_minerals"),
    ("True or False: Taking too many vitamin supplements can be harmful.", "medium", "vitamins_minerals"),
    ("What is a healthy portion size for cooked rice or pasta? (Answer: About 1/2 cup or size of your fist)", "medium", "portion_control"),
    ("True or False: Using smaller plates can help you eat less.", "easy", "portion_control"),
    ("How much protein should fit on your plate? (Answer: About 1/4 or palm-sized portion)", "medium", "portion_control"),
    ("True or False: Restaurant portions are typically 2-3 times larger than recommended servings.", "easy", "portion_control"),
    ("What is a healthy snack portion of nuts? (Answer: About 1/4 cup or a small handful)", "medium", "portion_control"),
];

const DARE_CARDS: &[SeedCard] = &[
    ("Drink a full glass of water right now! 💧", "easy", "hydration"),
    ("Set a timer to drink water every hour for the rest of today.", "medium", "hydration"),
    ("Replace your next sugary drink with water or herbal tea.", "easy", "hydration"),
    ("Add lemon or cucumber slices to your water for extra flavor today.", "easy", "hydration"),
    ("Drink a glass of water before each meal today.", "medium", "hydration"),
    ("Swap your usual snack for a piece of fruit today. 🍎", "easy", "healthy_swaps"),
    ("Replace white bread with whole grain for your next meal.", "easy", "healthy_swaps"),
    ("Choose baked or grilled instead of fried for your next protein.", "medium", "healthy_swaps"),
    ("Swap soda for sparkling water with a splash of juice.", "easy", "healthy_swaps"),
    ("Use Greek yogurt instead of sour cream in your next recipe.", "medium", "healthy_swaps"),
    ("Eat your next meal without any screens or distractions. 🧘", "medium", "mindful_eating"),
    ("Chew each bite 20 times during your next meal.", "hard", "mindful_eating"),
    ("Put your fork down between bites during your next meal.", "medium", "mindful_eating"),
    ("Take 3 deep breaths before starting your next meal.", "easy", "mindful_eating"),
    ("Eat with your non-dominant hand for one meal to slow down.", "hard", "mindful_eating"),
    ("Add an extra serving of vegetables to your next meal. 🥦", "easy", "vegetables"),
    ("Try a new vegetable you've never eaten before this week.", "medium", "vegetables"),
    ("Make vegetables the star of your next meal (not just a side).", "medium", "vegetables"),
    ("Eat a rainbow! Include 3 different colored vegetables today.", "medium", "vegetables"),
    ("Start your day with vegetables (add spinach to your eggs or smoothie).", "hard", "vegetables"),
    ("Use a smaller plate for your next meal. 🍽️", "easy", "portion_control"),
    ("Measure your portions for one full day to learn proper serving sizes.", "hard", "portion_control"),
    ("Fill half your plate with vegetables at your next meal.", "easy", "portion_control"),
    ("Stop eating when you're 80% full at your next meal.", "medium", "portion_control"),
    ("Pack your lunch in a bento box to control portions tomorrow.", "medium", "portion_control"),
    ("Do 10 jumping jacks right now! 🏃", "easy", "movement"),
    ("Take a 10-minute walk after your next meal.", "medium", "movement"),
    ("Stand up and stretch for 2 minutes right now.", "easy", "movement"),
    ("Take the stairs instead of the elevator today.", "easy", "movement"),
    ("Do 20 squats before your next meal.", "medium", "movement"),
];

fn bank() -> impl Iterator<Item = (CardType, &'static SeedCard)> {
    TRUTH_CARDS
        .iter()
        .map(|c| (CardType::Truth, c))
        .chain(DARE_CARDS.iter().map(|c| (CardType::Dare, c)))
}

/// Inserts the built-in cards unless some cards already exist.
/// Returns how many were inserted.
pub async fn seed_if_empty(db: &PgPool) -> anyhow::Result<usize> {
    if repo::count_cards(db).await? > 0 {
        return Ok(0);
    }

    let mut tx = db.begin().await.context("begin seed tx")?;
    let mut inserted = 0;
    for (card_type, (question, difficulty, category)) in bank() {
        sqlx::query(
            r#"
            INSERT INTO quiz_cards (card_type, question, difficulty, category)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(card_type.as_str())
        .bind(*question)
        .bind(*difficulty)
        .bind(*category)
        .execute(&mut *tx)
        .await
        .context("insert quiz card")?;
        inserted += 1;
    }
    tx.commit().await.context("commit seed tx")?;

    info!(
        truths = TRUTH_CARDS.len(),
        dares = DARE_CARDS.len(),
        "quiz card bank seeded"
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn bank_has_thirty_of_each_type() {
        assert_eq!(TRUTH_CARDS.len(), 30);
        assert_eq!(DARE_CARDS.len(), 30);
        assert_eq!(bank().count(), 60);
    }

    #[test]
    fn difficulties_are_known_and_questions_unique() {
        let mut seen = HashSet::new();
        for (_, (question, difficulty, category)) in bank() {
            assert!(matches!(*difficulty, "easy" | "medium" | "hard"), "{difficulty}");
            assert!(!category.is_empty());
            assert!(seen.insert(*question), "duplicate card: {question}");
        }
    }
}
