use rl_value_engine::config::{LearnerParams, NetworkParams, TrainingParams};
use rl_value_engine::environments::grid_world::GridWorld;
use rl_value_engine::gui::cli::common::{end_of_run, reset_screen, user_choice};
use rl_value_engine::services::envs::run::{train_episodes, watch_greedy};
use rl_value_engine::services::exports::base_logger::TrainingLogger;
use rl_value_engine::{CategoricalEnv, NeuralLearner, Result, TabularLearner};
use tracing::info;
use tracing_subscriber::EnvFilter;

const OUTPUT_DIR: &str = "./output";
const FIT_EPOCHS: usize = 200;

fn grid_learner_params() -> LearnerParams {
    LearnerParams { learning_rate: 0.2, discount: 0.9, ..LearnerParams::default() }
}

fn train_tabular(env: &mut GridWorld, params: &TrainingParams) -> Result<TabularLearner> {
    let mut learner = TabularLearner::tabular(env.space().clone(), grid_learner_params());
    let mut logger = TrainingLogger::new(format!("{OUTPUT_DIR}/grid_world_tabular"))?;
    train_episodes(&mut learner, env, params, Some(&mut logger))?;
    learner.function().save(logger.run_dir().join("lookup_table.txt"))?;
    Ok(learner)
}

fn run_tabular(params: &TrainingParams) -> Result<()> {
    let mut env = GridWorld::standard()?;
    let mut learner = train_tabular(&mut env, params)?;
    let score = watch_greedy(&mut learner, &mut env, params.max_steps)?;
    println!("Greedy score : {:.3}", score);
    Ok(())
}

fn run_neural(params: &TrainingParams) -> Result<()> {
    let mut env = GridWorld::standard()?;
    let mut learner = NeuralLearner::neural(env.space().clone(), grid_learner_params(), &NetworkParams::default())?;
    let mut logger = TrainingLogger::new(format!("{OUTPUT_DIR}/grid_world_neural"))?;
    train_episodes(&mut learner, &mut env, params, Some(&mut logger))?;
    learner.function().save(logger.run_dir().join("network.txt"))?;

    let score = watch_greedy(&mut learner, &mut env, params.max_steps)?;
    println!("Greedy score : {:.3}", score);
    Ok(())
}

fn run_pretrained(params: &TrainingParams) -> Result<()> {
    let mut env = GridWorld::standard()?;
    let tabular = train_tabular(&mut env, params)?;

    let mut learner = NeuralLearner::neural(env.space().clone(), grid_learner_params(), &NetworkParams::default())?;
    let errors = learner.function_mut().fit_table(tabular.function(), FIT_EPOCHS)?;
    info!(epochs = FIT_EPOCHS, final_error = errors.last().copied().unwrap_or_default(), "pre-training done");

    let score = watch_greedy(&mut learner, &mut env, params.max_steps)?;
    println!("Greedy score : {:.3}", score);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let params = TrainingParams::default();
    loop {
        let options = [
            "Grid World - Tabular Q Learning",
            "Grid World - Neural Q Learning",
            "Grid World - Network pre-trained from a table",
            "Quit",
        ];

        let selected_index = user_choice(&options, "")?;
        reset_screen(options[selected_index])?;

        match selected_index {
            0 => { run_tabular(&params)?; },
            1 => { run_neural(&params)?; },
            2 => { run_pretrained(&params)?; },
            _ => { break; }
        }
        end_of_run()?;
    }
    Ok(())
}
