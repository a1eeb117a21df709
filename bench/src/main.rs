use automata_acceptance::prelude::*;

fn main() {
    let inputs = [
        "Rabin 4",
        "Streett 3",
        "parity max odd 8",
        "parity min even 7",
        "generalized-Rabin 3 2 1 3",
        "Inf(4) | (Fin(3)&Inf(2)) | (Fin(3)&Fin(1)&Inf(0))",
        "(Fin(0) | Inf(1)) & (Fin(2) | Inf(3)) & Inf(4)",
    ];
    let conditions: Vec<AcceptanceCondition> = inputs
        .iter()
        .map(|text| text.parse().expect("benchmark inputs are well formed"))
        .collect();

    let mut oracle = BddOracle::new();
    let mut rng = fastrand::Rng::with_seed(0);
    let mut size: usize = 0;
    let mut recognized: usize = 0;
    for i in 0..2000 {
        let random = AcceptanceFormula::random(6, 0.2, &mut rng);
        for cond in conditions
            .iter()
            .chain(std::iter::once(&AcceptanceCondition::from_formula(random)))
        {
            let dnf = cond.formula().to_dnf(&mut oracle).expect("enough variables");
            size += dnf.len();
            if cond.is_parity_equiv(&mut oracle).expect("enough variables").is_some() {
                recognized += 1;
            }
            size += cond
                .formula()
                .complement()
                .strip(MarkSet::from_indices([i % 4]), false)
                .len();
        }
    }
    println!("total size after 2000 iterations: {size}, recognized {recognized} parity conditions");
}
