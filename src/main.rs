use resolveplan::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code().as_str(), e);
        std::process::exit(1);
    }
}
