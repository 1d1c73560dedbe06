pub fn stoich_examples(task: usize) {
    //
    use crate::Stoichiometry::engine::BalancingEngine;
    use crate::Stoichiometry::request::{Algorithm, CalcMode, Request};
    let engine = BalancingEngine::new();
    match task {
        0 => {
            // FORMULA: composition, molar mass, mass and atomic percents
            use crate::Stoichiometry::formula_parser::ChemicalFormula;
            for formula in ["H2O", "NaCl", "C6H8O6", "Ca(NO3)2", "CuSO4(H2O)5"] {
                let parsed = ChemicalFormula::parse(formula).unwrap();
                println!(
                    "{}: {:?}, molar mass {:.3} g/mol",
                    formula,
                    parsed.composition(),
                    parsed.molar_mass()
                );
            }
            let mut request = Request::new("H2SO4").with_mode(CalcMode::Formula);
            request.output_precision = 3;
            let result = engine.solve(&request);
            println!("{}", result.details);
        }
        1 => {
            // balancing with every algorithm
            let reactions = [
                "H2 + O2 = H2O",
                "Fe + Cl2 = FeCl3",
                "C3H8 + O2 -> CO2 + H2O",
                "KMnO4 + HCl = KCl + MnCl2 + H2O + Cl2",
                "Ca(OH)2 + H3PO4 = Ca3(PO4)2 + H2O",
            ];
            let algorithms = [
                Algorithm::Auto,
                Algorithm::Inv,
                Algorithm::GPinv,
                Algorithm::PPinv,
                Algorithm::Comb,
            ];
            for reaction in reactions {
                for algorithm in algorithms {
                    let request = Request::new(reaction)
                        .with_mode(CalcMode::Balance)
                        .with_algorithm(algorithm);
                    let result = engine.solve(&request);
                    if result.success {
                        println!("{:?}: {}", algorithm, result.details.replace('\n', "; "));
                    } else {
                        println!("{:?} failed on {}: {}", algorithm, reaction, result.message);
                    }
                }
            }
        }
        2 => {
            // masses of reagents for 10 g of product
            let request = Request::new("Fe2O3 + CO = Fe + CO2").with_target(2, 10.0);
            let result = engine.solve(&request);
            println!("{}", result.details);
            for row in &result.tabular {
                println!("{}: {:.4} g", row.formula, row.masses);
            }
        }
        3 => {
            // cancelling a long combinatorial search from another thread
            use std::sync::Arc;
            use std::time::Duration;
            let engine = Arc::new(engine);
            let worker = {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let request = Request::new("H2O2 + H2O2 = H2O + H2O")
                        .with_mode(CalcMode::Balance)
                        .with_algorithm(Algorithm::Comb)
                        .with_combinatorial_bound(5000);
                    engine.solve(&request)
                })
            };
            std::thread::sleep(Duration::from_millis(200));
            println!("running: {}", engine.is_running());
            engine.cancel();
            let result = worker.join().unwrap();
            println!("cancelled: {}, message: {}", result.cancelled, result.message);
        }
        4 => {
            // result as JSON, as written by the command line front end
            let result = engine.solve(&Request::new("CH4 + 2O2 = CO2 + 2H2O").with_target(0, 16.0));
            println!("{}", result.to_json().unwrap());
        }
        _ => {
            println!("Wrong task number");
        }
    }
}
