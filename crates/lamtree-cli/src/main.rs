// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! lamtree - reconstruct closure trees from a dumped JSON artifact.

use std::env;
use std::path::Path;
use std::process;

use colored::Colorize;
use lamtree_eval::{evaluate, Value};
use lamtree_expr::{ClosureDescriptor, LambdaTree};
use lamtree_resolve::{DumpHost, Resolver};

fn main() {
    // colored honors NO_COLOR on its own; add FORCE_COLOR for piped runs.
    if env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        if args.len() < 2 {
            process::exit(1);
        }
        return;
    }
    if args[1] == "--version" || args[1] == "-V" {
        println!("lamtree 0.1.0");
        return;
    }

    let (cmd_args, eval_args) = split_eval(&args[1..]);

    let artifact = match cmd_args.first() {
        Some(a) => a,
        None => {
            print_usage();
            process::exit(1);
        }
    };
    let name = cmd_args.get(1).map(|s| s.as_str());

    let host = match DumpHost::from_file(Path::new(artifact)) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{}: reading {}: {}", "error".red().bold(), artifact, e);
            process::exit(1);
        }
    };

    let desc = match pick_closure(&host, name) {
        Ok(d) => d,
        Err(msg) => {
            eprintln!("{}: {}", "error".red().bold(), msg);
            process::exit(1);
        }
    };

    let resolver = Resolver::new(&host);
    let tree = match resolver.reconstruct_descriptor(&desc) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    println!("{}", tree);

    if let Some(raw) = eval_args {
        match run_eval(&tree, raw) {
            Ok(v) => println!("{} {}", "=>".green().bold(), v),
            Err(msg) => {
                eprintln!("{}: {}", "error".red().bold(), msg);
                process::exit(1);
            }
        }
    }
}

/// Split the argument list at `--eval`; everything after it is an
/// argument value for evaluation. `--eval` first leaves the command
/// part empty, which main treats as a missing artifact path.
fn split_eval(args: &[String]) -> (&[String], Option<&[String]>) {
    match args.iter().position(|a| a == "--eval") {
        Some(i) => (&args[..i], Some(&args[i + 1..])),
        None => (args, None),
    }
}

fn print_usage() {
    println!("lamtree 0.1.0 - closure tree reconstruction");
    println!();
    println!("Usage: lamtree <artifact.json> [closure-name] [--eval <arg>...]");
    println!();
    println!("Loads a dumped artifact, reconstructs the named closure (or the");
    println!("first one in the artifact), and prints its expression tree.");
    println!("With --eval, applies the tree to the given arguments and prints");
    println!("the result. Arguments parse as int, float, bool, null, or string.");
}

fn pick_closure(host: &DumpHost, name: Option<&str>) -> Result<ClosureDescriptor, String> {
    match name {
        Some(n) => host
            .closure(n)
            .cloned()
            .ok_or_else(|| format!("no closure named {:?} in the artifact", n)),
        None => host
            .closures()
            .next()
            .map(|c| c.descriptor.clone())
            .ok_or_else(|| "the artifact contains no closures".to_string()),
    }
}

fn run_eval(tree: &LambdaTree, raw: &[String]) -> Result<Value, String> {
    let args: Vec<Value> = raw.iter().map(|s| parse_value(s)).collect();
    evaluate(tree, &args).map_err(|e| e.to_string())
}

fn parse_value(s: &str) -> Value {
    if s == "null" {
        return Value::Null;
    }
    if let Ok(b) = s.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Str(s.to_string())
}
