use clap::Parser;
use colored::Colorize;
use std::process;

use xcdiff::functionals;

#[derive(Parser)]
#[command(name = "xcdiff")]
#[command(about = "Evaluate derivatives of exchange-correlation functionals")]
#[command(version)]
struct Args {
    /// Functional name (see --list)
    functional: Option<String>,

    /// Evaluation point, one value per functional variable
    #[arg(short, long, value_delimiter = ',', allow_negative_numbers = true)]
    point: Vec<f64>,

    /// Derivative order per variable (defaults to all zeros)
    #[arg(short, long, value_delimiter = ',')]
    order: Vec<usize>,

    /// List the available functionals and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.list {
        for name in functionals::names() {
            let fun = functionals::by_name(name).expect("registry is complete");
            println!(
                "{:24} {}",
                name.cyan(),
                fun.sorted_variables().join(" ")
            );
        }
        return;
    }

    let Some(name) = args.functional.as_deref() else {
        eprintln!("Error: no functional given (try --list)");
        process::exit(1);
    };

    match evaluate(name, &args.point, &args.order) {
        Ok(value) => {
            println!("{value:.15e}");
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn evaluate(name: &str, point: &[f64], order: &[usize]) -> Result<f64, Box<dyn std::error::Error>> {
    let fun = functionals::by_name(name)
        .ok_or_else(|| format!("unknown functional '{name}' (try --list)"))?;

    let orders: Vec<usize> = if order.is_empty() {
        vec![0; fun.arity()]
    } else {
        order.to_vec()
    };

    Ok(fun.derv(point, &orders)?)
}
