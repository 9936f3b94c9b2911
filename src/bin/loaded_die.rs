use std::error::Error;

use viterbi_hmm::{
    generate_labeled, Decoder, HiddenMarkovModel, LabelSpace, ProbabilityMode, TrainingConfig,
    ViterbiTrainer,
};

const LINE_WIDTH: usize = 60;

fn print_matrix(name: &str, rows: ndarray::ArrayView2<'_, f64>, states: &LabelSpace<char>) {
    println!("{}:", name);
    for (state, row) in states.iter().zip(rows.rows()) {
        let cells: Vec<String> = row.iter().map(|p| format!("{:.4}", p)).collect();
        println!("  {} | {}", state, cells.join(" "));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // A casino occasionally swaps a fair die for one that favours six.
    let truth = HiddenMarkovModel::new(
        vec![0.9999, 0.0001],
        vec![vec![0.95, 0.05], vec![0.10, 0.90]],
        vec![vec![1.0 / 6.0; 6], vec![0.1, 0.1, 0.1, 0.1, 0.1, 0.5]],
    )?;
    let states = LabelSpace::new(vec!['F', 'L'])?;
    let symbols = LabelSpace::new(vec!['1', '2', '3', '4', '5', '6'])?;

    let (actual, rolls) = generate_labeled(&truth, &states, &symbols, 300, 515)?;
    let (decoded, log_probability) =
        Decoder::new(&truth, ProbabilityMode::Log).decode_labeled(&states, &symbols, &rolls)?;

    for start in (0..rolls.len()).step_by(LINE_WIDTH) {
        let end = (start + LINE_WIDTH).min(rolls.len());
        println!("{:9}: {}", "Observed", rolls[start..end].iter().collect::<String>());
        println!("{:9}: {}", "Actual", actual[start..end].iter().collect::<String>());
        println!("{:9}: {}", "Viterbi", decoded[start..end].iter().collect::<String>());
        println!();
    }
    let correct = actual.iter().zip(&decoded).filter(|(a, d)| a == d).count();
    println!(
        "log-probability {:.4}, {}/{} states recovered",
        log_probability,
        correct,
        rolls.len()
    );

    // Re-fit the model above to rolls from a casino whose die stays loaded
    // longer and rolls six far more often.
    let casino = HiddenMarkovModel::new(
        vec![0.9999, 0.0001],
        vec![vec![0.95, 0.05], vec![0.05, 0.95]],
        vec![vec![1.0 / 6.0; 6], vec![0.04, 0.04, 0.04, 0.04, 0.04, 0.8]],
    )?;
    let (_, training_rolls) = generate_labeled(&casino, &states, &symbols, 100_000, 515)?;
    let estimate = truth;
    let trainer = ViterbiTrainer::new(TrainingConfig::default().with_max_iterations(15));
    let result = trainer.train_labeled(&estimate, &states, &symbols, &training_rolls)?;

    println!();
    println!(
        "training {} after {} iterations",
        if result.converged { "converged" } else { "stopped" },
        result.iterations
    );
    print_matrix("Generating transitions", casino.transition(), &states);
    print_matrix("Generating emissions", casino.emission(), &states);
    print_matrix("Transitions", result.model.transition(), &states);
    print_matrix("Emissions", result.model.emission(), &states);
    Ok(())
}
