use rl_value_engine::config::robot_arena_space;
use rl_value_engine::services::algo_helper::encoder::StateActionEncoder;
use rl_value_engine::{Action, Result, State};

fn print_one_hot_chunks(encoder: &StateActionEncoder, features: &[f64]) {
    println!("=== ONE-HOT FEATURES (chunked by category) ===");
    let mut offset = 0;
    for category in encoder.space().categories() {
        let chunk = &features[offset..offset + category.cardinality];
        println!("{:>14}: {:?}", category.name, chunk);
        offset += category.cardinality;
    }
    println!("{:>14}: {:?}", "Action", &features[offset..]);
}

fn main() -> Result<()> {
    let encoder = StateActionEncoder::new(robot_arena_space()?);
    let space = encoder.space();

    println!("=== LAYOUT ===");
    for category in space.categories() {
        println!("{:>14}: {} buckets", category.name, category.cardinality);
    }
    println!("{:>14}: {}", "Actions", space.action_count());
    println!("States: {}, table cells: {}, one-hot width: {}", space.state_count(), space.cell_count(), encoder.width());

    let state = State::from([2, 1, 1, 0, 1]);
    let action = Action::new(3, space.action_count())?;
    println!("\n=== SAMPLE {state} / {action} ===");
    println!("Table offset: {}", encoder.flat_offset(&state)?);
    let features = encoder.encode_one_hot(&state, action)?;
    print_one_hot_chunks(&encoder, &features);

    let (decoded_state, decoded_action) = encoder.decode_one_hot(&features)?;
    if decoded_state == state && decoded_action == action {
        println!("\nDecoding matches the sample");
    } else {
        println!("\nMismatch! Decoded {decoded_state} / {decoded_action}");
    }
    Ok(())
}
