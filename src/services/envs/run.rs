use std::fmt::Display;
use kdam::tqdm;
use tracing::info;
use crate::algorithms::model_free::q_learning::learner::{ValueFunction, ValueLearner};
use crate::config::TrainingParams;
use crate::environments::env::CategoricalEnv;
use crate::error::Result;
use crate::services::exports::base_logger::TrainingLogger;

/// Linear decay from `start_epsilon` at episode 0 towards `final_epsilon`.
pub fn epsilon_at(episode: usize, params: &TrainingParams) -> f64 {
    if params.num_episodes == 0 {
        return params.start_epsilon;
    }
    let progress = episode as f64 / params.num_episodes as f64;
    (1.0 - progress) * params.start_epsilon + progress * params.final_epsilon
}

/// Plays one episode, feeding every reward back to the learner.
/// Returns the environment's final score.
pub fn run_episode<V: ValueFunction, Env: CategoricalEnv>(
    learner: &mut ValueLearner<V>,
    env: &mut Env,
    max_steps: usize,
) -> Result<f64> {
    env.reset();
    let mut state = env.observe();
    let mut action = learner.update_value(&state, None, 0.0)?;

    for _ in 0..max_steps {
        let reward = env.step(action);
        if env.is_game_over() {
            learner.finish_episode(&state, action, reward)?;
            break;
        }
        let next = env.observe();
        let next_action = learner.update_value(&next, Some((&state, action)), reward)?;
        state = next;
        action = next_action;
    }
    Ok(env.score())
}

/// Episodic training loop with a linearly decaying exploration rate.
///
/// Every `episode_stop` episodes the mean score of the interval is reported
/// and, when a logger is given, appended to its csv. Returns every episode's
/// score.
pub fn train_episodes<V: ValueFunction, Env: CategoricalEnv>(
    learner: &mut ValueLearner<V>,
    env: &mut Env,
    params: &TrainingParams,
    mut logger: Option<&mut TrainingLogger>,
) -> Result<Vec<f64>> {
    let mut scores = Vec::with_capacity(params.num_episodes);
    let mut interval_score = 0.0;
    let mut interval_len = 0usize;

    for ep in tqdm!(0..params.num_episodes) {
        if ep > 0 && params.episode_stop > 0 && ep % params.episode_stop == 0 {
            report(ep, interval_score / interval_len as f64, learner.exploration_rate(), logger.as_deref_mut())?;
            interval_score = 0.0;
            interval_len = 0;
        }
        learner.set_exploration_rate(epsilon_at(ep, params));

        let score = run_episode(learner, env, params.max_steps)?;
        interval_score += score;
        interval_len += 1;
        scores.push(score);
    }
    if interval_len > 0 {
        report(params.num_episodes, interval_score / interval_len as f64, learner.exploration_rate(), logger)?;
    }
    Ok(scores)
}

fn report(episode: usize, mean_score: f64, epsilon: f64, logger: Option<&mut TrainingLogger>) -> Result<()> {
    info!(episode, mean_score, epsilon, "training interval");
    if let Some(logger) = logger {
        logger.log(episode, mean_score, epsilon)?;
    }
    Ok(())
}

/// Greedy rollout without learning; returns the final score.
pub fn evaluate_greedy<V: ValueFunction, Env: CategoricalEnv>(
    learner: &mut ValueLearner<V>,
    env: &mut Env,
    max_steps: usize,
) -> Result<f64> {
    env.reset();
    for _ in 0..max_steps {
        if env.is_game_over() {
            break;
        }
        let action = learner.greedy_action(&env.observe())?;
        env.step(action);
    }
    Ok(env.score())
}

/// Same as [`evaluate_greedy`], printing the board after every move.
pub fn watch_greedy<V: ValueFunction, Env: CategoricalEnv + Display>(
    learner: &mut ValueLearner<V>,
    env: &mut Env,
    max_steps: usize,
) -> Result<f64> {
    env.reset();
    println!("{}", env);
    for _ in 0..max_steps {
        if env.is_game_over() {
            break;
        }
        let action = learner.greedy_action(&env.observe())?;
        env.step(action);
        println!("{}", env);
    }
    Ok(env.score())
}
