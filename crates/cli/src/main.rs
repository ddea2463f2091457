fn main() {
    if let Err(e) = jarforge_cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
