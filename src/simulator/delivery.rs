//! Ball-by-ball score mutation

use rand::Rng;

use crate::state::ScoreCard;

/// Runs that can come off a scoring ball
const RUN_OUTCOMES: [u32; 6] = [0, 1, 2, 3, 4, 6];

/// Chance that a ball takes a wicket
const WICKET_PROBABILITY: f64 = 0.4;

/// Balls in an over
const BALLS_PER_OVER: u32 = 6;

/// Wickets that end an innings
pub const ALL_OUT: u32 = 10;

/// Compute the score after one more delivery
pub fn next_delivery<R: Rng + ?Sized>(prev: &ScoreCard, rng: &mut R) -> ScoreCard {
    let mut score = prev.score.clone();
    let delta_runs = RUN_OUTCOMES[rng.gen_range(0..RUN_OUTCOMES.len())];

    let completed_overs = score.overs.floor();
    score.balls_delivered += 1;
    if score.balls_delivered == BALLS_PER_OVER {
        score.overs = completed_overs + 1.0;
        score.balls_delivered = 0;
    } else {
        score.overs = completed_overs + f64::from(score.balls_delivered) / 10.0;
    }

    let wicket_taken = score.wickets < ALL_OUT && rng.gen_bool(WICKET_PROBABILITY);
    if wicket_taken {
        score.wickets += 1;
    } else {
        score.runs += delta_runs;
    }

    let commentary = if score.wickets >= ALL_OUT {
        "Innings over".to_string()
    } else if wicket_taken {
        "Wicket!".to_string()
    } else if delta_runs == 0 {
        "Dot ball".to_string()
    } else {
        format!("Scored {}!", delta_runs)
    };

    ScoreCard { score, commentary }
}
