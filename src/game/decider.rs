//! Outcome decision rule.
//!
//! Pure function of the recorded choices and an explicitly supplied fair
//! token, so every path is deterministically testable. Callers draw the
//! token with [`draw_token`].

use crate::game::types::{Choice, Outcome};
use rand::Rng;

/// Decide a duel.
///
/// Either choice missing forces a draw (the refund path). Otherwise the
/// player whose choice equals the token wins; both or neither matching is
/// a draw.
pub fn decide(choice_a: Option<Choice>, choice_b: Option<Choice>, token: Choice) -> Outcome {
    let (Some(a), Some(b)) = (choice_a, choice_b) else {
        return Outcome::Draw;
    };

    match (a == token, b == token) {
        (true, false) => Outcome::PlayerOne,
        (false, true) => Outcome::PlayerTwo,
        _ => Outcome::Draw,
    }
}

/// Draw a fair outcome token from a uniform two-valued distribution.
pub fn draw_token<R: Rng + ?Sized>(rng: &mut R) -> Choice {
    if rng.gen::<bool>() {
        Choice::Front
    } else {
        Choice::Back
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_choices_token_decides() {
        // front/back with token front => player one wins
        assert_eq!(
            decide(Some(Choice::Front), Some(Choice::Back), Choice::Front),
            Outcome::PlayerOne
        );
        assert_eq!(
            decide(Some(Choice::Front), Some(Choice::Back), Choice::Back),
            Outcome::PlayerTwo
        );
    }

    #[test]
    fn matching_choices_always_draw() {
        for token in [Choice::Front, Choice::Back] {
            assert_eq!(
                decide(Some(Choice::Front), Some(Choice::Front), token),
                Outcome::Draw
            );
            assert_eq!(
                decide(Some(Choice::Back), Some(Choice::Back), token),
                Outcome::Draw
            );
        }
    }

    #[test]
    fn missing_choice_forces_draw() {
        for token in [Choice::Front, Choice::Back] {
            assert_eq!(decide(None, Some(Choice::Back), token), Outcome::Draw);
            assert_eq!(decide(Some(Choice::Front), None, token), Outcome::Draw);
            assert_eq!(decide(None, None, token), Outcome::Draw);
        }
    }

    #[test]
    fn decide_is_deterministic_over_all_inputs() {
        let choices = [None, Some(Choice::Front), Some(Choice::Back)];
        for a in choices {
            for b in choices {
                for token in [Choice::Front, Choice::Back] {
                    assert_eq!(decide(a, b, token), decide(a, b, token));
                }
            }
        }
    }
}
